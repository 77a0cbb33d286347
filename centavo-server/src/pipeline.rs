//! One webhook-triggered pass over the unread transactional mail:
//! fetch, extract, gate on the duplicate index, notify, append to the
//! ledger, then mark the message read.
//!
//! Ordering is the whole safety story. The notification goes out
//! before the ledger write because the ledger row needs the thread
//! handle; the mark-read happens last so any earlier failure leaves
//! the message unread and a later pass retries it. A mark-read failure
//! after the append is the one case that cannot be retried cleanly,
//! so the row stays (the duplicate index absorbs the redelivery) and
//! the failure is only reported.

use centavo_core::DedupIndex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::state::AppState;

#[derive(Debug, Default, Serialize)]
pub struct PipelineReport {
    pub processed: usize,
    pub skipped_no_match: usize,
    pub skipped_duplicate: usize,
    pub errors: Vec<String>,
}

enum MessageOutcome {
    Recorded { ack_error: Option<String> },
    SkippedNoMatch,
    SkippedDuplicate,
    Failed(String),
}

pub async fn run(state: &AppState) -> PipelineReport {
    let mut report = PipelineReport::default();

    let ids = match state.mailbox.list_unread_transactional().await {
        Ok(ids) => ids,
        Err(err) => {
            report.errors.push(format!("listing unread mail: {err:#}"));
            return report;
        }
    };
    if ids.is_empty() {
        info!("no unread transactional mail");
        return report;
    }

    // Without the index every redelivered message would double-post
    // and double-append, so an index failure aborts the pass with the
    // mail untouched.
    let mut index = match state.ledger.recent_keys(state.dedup_window_rows).await {
        Ok(index) => index,
        Err(err) => {
            report.errors.push(format!("building duplicate index: {err:#}"));
            return report;
        }
    };

    info!(messages = ids.len(), index_keys = index.len(), "processing unread mail");

    for id in ids {
        if state.handled.lock().expect("handled cache lock").contains(&id) {
            debug!(%id, "already handled by this process");
            continue;
        }
        match process_message(state, &mut index, &id).await {
            MessageOutcome::Recorded { ack_error } => {
                report.processed += 1;
                remember(state, &id);
                if let Some(err) = ack_error {
                    report.errors.push(format!("message {id}: {err}"));
                }
            }
            MessageOutcome::SkippedNoMatch => {
                report.skipped_no_match += 1;
                remember(state, &id);
            }
            MessageOutcome::SkippedDuplicate => {
                report.skipped_duplicate += 1;
                remember(state, &id);
            }
            MessageOutcome::Failed(err) => {
                warn!(%id, error = %err, "message left unread for retry");
                report.errors.push(format!("message {id}: {err}"));
            }
        }
    }

    info!(
        processed = report.processed,
        skipped_no_match = report.skipped_no_match,
        skipped_duplicate = report.skipped_duplicate,
        errors = report.errors.len(),
        "pipeline pass complete"
    );
    report
}

async fn process_message(
    state: &AppState,
    index: &mut DedupIndex,
    id: &str,
) -> MessageOutcome {
    let email = match state.mailbox.fetch(id).await {
        Ok(Some(email)) => email,
        Ok(None) => return MessageOutcome::Failed("no usable html payload".into()),
        Err(err) => return MessageOutcome::Failed(format!("fetching message: {err:#}")),
    };

    let Some(record) = state.router.extract(&email.from, &email.html_body) else {
        // Promotions and statement notices from the same senders land
        // here; they are consumed so they stop re-triggering passes.
        debug!(%id, from = %email.from, "no transaction in message, marking read");
        if let Err(err) = state.mailbox.mark_read(id).await {
            return MessageOutcome::Failed(format!("marking non-transactional mail read: {err:#}"));
        }
        return MessageOutcome::SkippedNoMatch;
    };

    if index.contains(&record) {
        info!(%id, key = %record.natural_key(), "duplicate transaction, marking read");
        if let Err(err) = state.mailbox.mark_read(id).await {
            return MessageOutcome::Failed(format!("marking duplicate read: {err:#}"));
        }
        return MessageOutcome::SkippedDuplicate;
    }

    let outcome = match state
        .notifier
        .notify(&record.merchant, record.amount, record.bank, record.currency)
        .await
    {
        Ok(outcome) => outcome,
        Err(err) => return MessageOutcome::Failed(format!("notifying: {err:#}")),
    };
    let thread_ts = match outcome.thread_ts {
        Some(ts) if outcome.accepted => ts,
        _ => return MessageOutcome::Failed("notification not accepted".into()),
    };

    let row = match state.ledger.append(&record, &thread_ts).await {
        Ok(row) => row,
        Err(err) => return MessageOutcome::Failed(format!("appending to ledger: {err:#}")),
    };
    // Gate later messages in this same pass against the fresh row.
    index.insert(&record);

    match state.mailbox.mark_read(id).await {
        Ok(()) => MessageOutcome::Recorded { ack_error: None },
        Err(err) => {
            warn!(%id, row, error = %err, "recorded but could not mark read");
            MessageOutcome::Recorded {
                ack_error: Some(format!("recorded at row {row} but not marked read: {err:#}")),
            }
        }
    }
}

fn remember(state: &AppState, id: &str) {
    state
        .handled
        .lock()
        .expect("handled cache lock")
        .insert(id.to_string());
}
