//! HTTP surface. The webhook and sync endpoints answer POST for the
//! real triggers (Pub/Sub push, Cloud Scheduler) and GET with a status
//! body so they can be probed from a browser.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router as HttpRouter;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::state::AppState;
use crate::{pipeline, reconcile};

pub fn app(state: Arc<AppState>) -> HttpRouter {
    HttpRouter::new()
        .route("/gmail-webhook", post(gmail_webhook).get(webhook_status))
        .route("/sync-replies", post(sync_replies).get(sync_status))
        .route("/mark-all-read", post(mark_all_read))
        .route("/renew-watch", post(renew_watch))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Pub/Sub push envelope. The payload inside `message.data` is only
/// validated, not consumed: discovery is a fresh unread search, so a
/// push with a stale history id still processes everything pending.
#[derive(Debug, Deserialize)]
pub struct PushEnvelope {
    pub message: PushMessage,
    #[serde(default)]
    pub subscription: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PushMessage {
    pub data: String,
    #[serde(default, rename = "messageId")]
    pub message_id: Option<String>,
}

pub fn decode_push_data(envelope: &PushEnvelope) -> Result<serde_json::Value> {
    let bytes = STANDARD
        .decode(&envelope.message.data)
        .context("push data is not valid base64")?;
    serde_json::from_slice(&bytes).context("push data is not valid json")
}

#[derive(Debug, Serialize)]
struct WebhookResponse {
    success: bool,
    processed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<String>>,
    message: String,
}

async fn gmail_webhook(
    State(state): State<Arc<AppState>>,
    Json(envelope): Json<PushEnvelope>,
) -> (StatusCode, Json<WebhookResponse>) {
    let payload = match decode_push_data(&envelope) {
        Ok(payload) => payload,
        Err(err) => {
            error!(error = %err, "rejecting malformed push envelope");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(WebhookResponse {
                    success: false,
                    processed: 0,
                    errors: Some(vec![format!("{err:#}")]),
                    message: "malformed push envelope".to_string(),
                }),
            );
        }
    };
    debug!(message_id = ?envelope.message.message_id, subscription = ?envelope.subscription, %payload, "push received");

    let report = pipeline::run(&state).await;
    let message = format!(
        "{} processed, {} without transaction, {} duplicates",
        report.processed, report.skipped_no_match, report.skipped_duplicate
    );
    // Per-message failures stay in the body; the push itself is acked
    // so Pub/Sub does not retry-storm while a provider is down.
    (
        StatusCode::OK,
        Json(WebhookResponse {
            success: true,
            processed: report.processed,
            errors: (!report.errors.is_empty()).then(|| report.errors.clone()),
            message,
        }),
    )
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
    message: &'static str,
    timestamp: String,
}

async fn webhook_status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        message: "gmail webhook endpoint is running",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
struct SyncResponse {
    success: bool,
    updated: usize,
    pending: usize,
    rate_limited: bool,
    message: String,
}

async fn sync_replies(State(state): State<Arc<AppState>>) -> (StatusCode, Json<SyncResponse>) {
    match reconcile::run(&state).await {
        Ok(report) => (
            StatusCode::OK,
            Json(SyncResponse {
                success: true,
                updated: report.updated,
                pending: report.pending,
                rate_limited: report.rate_limited,
                message: format!("{} descriptions backfilled", report.updated),
            }),
        ),
        Err(err) => {
            error!(error = %err, "reconcile pass failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SyncResponse {
                    success: false,
                    updated: 0,
                    pending: 0,
                    rate_limited: false,
                    message: format!("{err:#}"),
                }),
            )
        }
    }
}

async fn sync_status(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    match state.ledger.pending_descriptions(state.reconcile_batch).await {
        Ok(pending) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ok",
                "pending_count": pending.len(),
            })),
        ),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "status": "error", "message": format!("{err:#}") })),
        ),
    }
}

/// Maintenance hatch: consume every unread transactional email without
/// processing it. Used after a backlog of already-recorded mail piled
/// up, e.g. while the service was pointed at a test sheet.
async fn mark_all_read(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let ids = match state.mailbox.list_unread_transactional().await {
        Ok(ids) => ids,
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "success": false, "message": format!("{err:#}") })),
            );
        }
    };
    let mut marked = 0usize;
    let mut errors = Vec::new();
    for id in &ids {
        match state.mailbox.mark_read(id).await {
            Ok(()) => marked += 1,
            Err(err) => errors.push(format!("message {id}: {err:#}")),
        }
    }
    info!(marked, failed = errors.len(), "mark-all-read complete");
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "success": errors.is_empty(),
            "marked": marked,
            "errors": errors,
        })),
    )
}

/// Gmail watches expire after seven days; a scheduler hits this
/// endpoint daily to re-arm the push subscription.
async fn renew_watch(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let (Some(gmail), Some(topic)) = (state.gmail.as_ref(), state.pubsub_topic.as_deref()) else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "success": false,
                "message": "watch renewal not configured",
            })),
        );
    };
    match gmail.renew_watch(topic).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "message": "watch renewed" })),
        ),
        Err(err) => {
            error!(error = %err, "watch renewal failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "success": false, "message": format!("{err:#}") })),
            )
        }
    }
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(data: &str) -> PushEnvelope {
        PushEnvelope {
            message: PushMessage {
                data: data.to_string(),
                message_id: Some("123".to_string()),
            },
            subscription: Some("projects/p/subscriptions/s".to_string()),
        }
    }

    #[test]
    fn test_valid_push_data_decodes() {
        // {"emailAddress":"x@y.z","historyId":42}
        let data = STANDARD.encode(r#"{"emailAddress":"x@y.z","historyId":42}"#);
        let payload = decode_push_data(&envelope(&data)).unwrap();
        assert_eq!(payload["historyId"], 42);
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        assert!(decode_push_data(&envelope("not-base64!!!")).is_err());
    }

    #[test]
    fn test_non_json_payload_is_rejected() {
        let data = STANDARD.encode("plain text, not json");
        assert!(decode_push_data(&envelope(&data)).is_err());
    }

    #[test]
    fn test_envelope_deserializes_gmail_push_shape() {
        let raw = r#"{
            "message": {
                "data": "eyJoaXN0b3J5SWQiOjF9",
                "messageId": "m-1",
                "publishTime": "2025-01-05T12:00:00Z"
            },
            "subscription": "projects/p/subscriptions/s"
        }"#;
        let envelope: PushEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.message.message_id.as_deref(), Some("m-1"));
        let payload = decode_push_data(&envelope).unwrap();
        assert_eq!(payload["historyId"], 1);
    }
}
