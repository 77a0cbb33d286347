//! Shared application state: the three remote collaborators behind
//! their traits, the sender→extractor router, and a per-process cache
//! of message ids already handled this lifetime.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use centavo_clients::{
    GmailMailbox, GoogleAuth, Ledger, Mailbox, Notifier, SheetsLedger, SlackNotifier,
};
use centavo_extract::Router;

use crate::config::Config;

pub struct AppState {
    pub mailbox: Arc<dyn Mailbox>,
    pub notifier: Arc<dyn Notifier>,
    pub ledger: Arc<dyn Ledger>,
    pub router: Router,
    /// Concrete Gmail handle, kept only for watch renewal.
    pub gmail: Option<Arc<GmailMailbox>>,
    pub pubsub_topic: Option<String>,
    /// Message ids already handled by this process. Push deliveries
    /// overlap; this keeps a redelivered id from being re-fetched
    /// before the mark-read has propagated.
    pub handled: Mutex<HashSet<String>>,
    pub dedup_window_rows: usize,
    pub reconcile_batch: usize,
}

impl AppState {
    pub fn from_config(cfg: &Config) -> Self {
        let http = reqwest::Client::new();
        let auth = Arc::new(GoogleAuth::new(
            http.clone(),
            cfg.google.client_id.clone(),
            cfg.google.client_secret.clone(),
            cfg.google.refresh_token.clone(),
        ));

        let router = Router::new();
        let senders = router
            .known_senders()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let gmail = Arc::new(GmailMailbox::new(http.clone(), auth.clone(), senders));

        let notifier = SlackNotifier::new(
            http.clone(),
            cfg.slack.bot_token.clone(),
            cfg.slack.channel_id.clone(),
        );

        let ledger = SheetsLedger::new(
            http,
            auth,
            cfg.google.spreadsheet_id.clone(),
            cfg.google.sheet_name.clone(),
            cfg.ledger.usd_to_crc_rate,
            cfg.ledger.category_table.clone(),
        );

        Self {
            mailbox: gmail.clone(),
            notifier: Arc::new(notifier),
            ledger: Arc::new(ledger),
            router,
            gmail: Some(gmail),
            pubsub_topic: cfg.google.pubsub_topic.clone(),
            handled: Mutex::new(HashSet::new()),
            dedup_window_rows: cfg.ledger.dedup_window_rows,
            reconcile_batch: cfg.pipeline.reconcile_batch,
        }
    }

    #[cfg(test)]
    pub fn for_tests(
        mailbox: Arc<dyn Mailbox>,
        notifier: Arc<dyn Notifier>,
        ledger: Arc<dyn Ledger>,
    ) -> Self {
        Self {
            mailbox,
            notifier,
            ledger,
            router: Router::new(),
            gmail: None,
            pubsub_topic: None,
            handled: Mutex::new(HashSet::new()),
            dedup_window_rows: 200,
            reconcile_batch: 5,
        }
    }
}
