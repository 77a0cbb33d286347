//! Description backfill. Ledger rows with a thread reference but no
//! description get the first human reply from their notification
//! thread. Runs on a schedule, not on the webhook path, so Slack's
//! tight conversations.replies rate limit only ever delays
//! descriptions, never transactions.

use anyhow::Result;
use centavo_clients::ThreadReplies;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::state::AppState;

#[derive(Debug, Default, Serialize)]
pub struct ReconcileReport {
    pub updated: usize,
    /// Rows still awaiting a description after this pass.
    pub pending: usize,
    pub rate_limited: bool,
}

pub async fn run(state: &AppState) -> Result<ReconcileReport> {
    let pending = state
        .ledger
        .pending_descriptions(state.reconcile_batch)
        .await?;
    let mut report = ReconcileReport::default();
    if pending.is_empty() {
        info!("no rows awaiting description");
        return Ok(report);
    }

    for entry in &pending {
        match state.notifier.thread_replies(&entry.thread_ts).await {
            Ok(ThreadReplies::RateLimited) => {
                // The rest of the batch would hit the same limit; the
                // next scheduled pass picks these rows up again.
                warn!(row = entry.row, "reply fetch rate limited, stopping batch");
                report.rate_limited = true;
                break;
            }
            Ok(ThreadReplies::Replies(messages)) => {
                // Index 0 is the notification itself.
                match messages.get(1) {
                    Some(reply) => match state.ledger.set_description(entry.row, reply).await {
                        Ok(()) => {
                            info!(row = entry.row, "description backfilled");
                            report.updated += 1;
                        }
                        Err(err) => {
                            warn!(row = entry.row, error = %err, "could not write description");
                        }
                    },
                    None => debug!(row = entry.row, "no reply yet"),
                }
            }
            Err(err) => {
                warn!(row = entry.row, error = %err, "could not fetch thread replies");
            }
        }
    }

    report.pending = pending.len() - report.updated;
    info!(
        updated = report.updated,
        pending = report.pending,
        rate_limited = report.rate_limited,
        "reconcile pass complete"
    );
    Ok(report)
}
