//! Server configuration: a TOML file for the stable knobs, with
//! environment variables overriding the secret-bearing fields so the
//! file itself can stay credential-free.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSection,
    pub google: GoogleSection,
    #[serde(default)]
    pub slack: SlackSection,
    #[serde(default)]
    pub ledger: LedgerSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleSection {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub refresh_token: String,
    pub spreadsheet_id: String,
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    /// Full Pub/Sub topic name for Gmail watch renewal, e.g.
    /// "projects/my-project/topics/gmail-push". Optional; without it
    /// the /renew-watch endpoint reports itself unavailable.
    pub pubsub_topic: Option<String>,
}

fn default_sheet_name() -> String {
    "Transacciones".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackSection {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub channel_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSection {
    /// Fallback USD→CRC rate used in the converted-amount formula.
    #[serde(default = "default_rate")]
    pub usd_to_crc_rate: f64,
    /// Sheet holding the merchant → category lookup table.
    #[serde(default = "default_category_table")]
    pub category_table: String,
    /// How many trailing ledger rows feed the duplicate index.
    #[serde(default = "default_dedup_window")]
    pub dedup_window_rows: usize,
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            usd_to_crc_rate: default_rate(),
            category_table: default_category_table(),
            dedup_window_rows: default_dedup_window(),
        }
    }
}

fn default_rate() -> f64 {
    515.0
}

fn default_category_table() -> String {
    "Base de Comercios".to_string()
}

fn default_dedup_window() -> usize {
    200
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineSection {
    /// Rows per description-reconciliation pass; small on purpose to
    /// stay under the Slack conversations.replies rate limit.
    #[serde(default = "default_reconcile_batch")]
    pub reconcile_batch: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self { reconcile_batch: default_reconcile_batch() }
    }
}

fn default_reconcile_batch() -> usize {
    5
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut cfg: Config = toml::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.apply_env();
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        override_from_env(&mut self.google.client_id, "GOOGLE_CLIENT_ID");
        override_from_env(&mut self.google.client_secret, "GOOGLE_CLIENT_SECRET");
        override_from_env(&mut self.google.refresh_token, "GOOGLE_REFRESH_TOKEN");
        override_from_env(&mut self.google.spreadsheet_id, "GOOGLE_SPREADSHEET_ID");
        override_from_env(&mut self.slack.bot_token, "SLACK_BOT_TOKEN");
        override_from_env(&mut self.slack.channel_id, "SLACK_CHANNEL_ID");
    }
}

fn override_from_env(field: &mut String, var: &str) {
    if let Ok(value) = std::env::var(var) {
        if !value.is_empty() {
            *field = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [google]
            spreadsheet_id = "sheet-123"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
        assert_eq!(cfg.google.sheet_name, "Transacciones");
        assert!(cfg.google.pubsub_topic.is_none());
        assert_eq!(cfg.ledger.usd_to_crc_rate, 515.0);
        assert_eq!(cfg.ledger.category_table, "Base de Comercios");
        assert_eq!(cfg.ledger.dedup_window_rows, 200);
        assert_eq!(cfg.pipeline.reconcile_batch, 5);
    }

    #[test]
    fn full_config_round_trips() {
        let cfg: Config = toml::from_str(
            r#"
            [server]
            bind = "127.0.0.1:9090"

            [google]
            client_id = "id"
            client_secret = "secret"
            refresh_token = "refresh"
            spreadsheet_id = "sheet-123"
            sheet_name = "Gastos"
            pubsub_topic = "projects/p/topics/gmail-push"

            [slack]
            bot_token = "xoxb-test"
            channel_id = "C12345"

            [ledger]
            usd_to_crc_rate = 520.5
            category_table = "Comercios"
            dedup_window_rows = 50

            [pipeline]
            reconcile_batch = 3
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:9090");
        assert_eq!(cfg.google.sheet_name, "Gastos");
        assert_eq!(
            cfg.google.pubsub_topic.as_deref(),
            Some("projects/p/topics/gmail-push")
        );
        assert_eq!(cfg.slack.channel_id, "C12345");
        assert_eq!(cfg.ledger.usd_to_crc_rate, 520.5);
        assert_eq!(cfg.ledger.dedup_window_rows, 50);
        assert_eq!(cfg.pipeline.reconcile_batch, 3);
    }
}
