//! Mail collaborator: discovery of unread transactional email, body
//! retrieval, and the read acknowledgement, over the Gmail REST API.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::google_auth::GoogleAuth;

const GMAIL_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// A retrieved email, reduced to what the pipeline needs.
#[derive(Debug, Clone)]
pub struct InboundEmail {
    pub id: String,
    pub from: String,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Ids of unread messages from known transactional senders.
    async fn list_unread_transactional(&self) -> Result<Vec<String>>;

    /// Retrieve one message; `None` when it has no usable payload.
    async fn fetch(&self, id: &str) -> Result<Option<InboundEmail>>;

    /// Remove the unread marker. Only called after the message's
    /// outcome has been made durable.
    async fn mark_read(&self, id: &str) -> Result<()>;
}

pub struct GmailMailbox {
    http: reqwest::Client,
    auth: Arc<GoogleAuth>,
    senders: Vec<String>,
    max_results: usize,
}

impl GmailMailbox {
    pub fn new(http: reqwest::Client, auth: Arc<GoogleAuth>, senders: Vec<String>) -> Self {
        Self {
            http,
            auth,
            senders,
            max_results: 50,
        }
    }

    fn unread_query(&self) -> String {
        let froms: Vec<String> = self.senders.iter().map(|s| format!("from:{s}")).collect();
        format!("is:unread in:inbox ({})", froms.join(" OR "))
    }

    /// Renew the Pub/Sub push watch; Gmail expires watches after seven
    /// days, so this is hit from a scheduled endpoint.
    pub async fn renew_watch(&self, topic: &str) -> Result<()> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Req<'a> {
            topic_name: &'a str,
            label_ids: [&'a str; 1],
        }

        let token = self.auth.access_token().await?;
        let resp = self
            .http
            .post(format!("{GMAIL_BASE}/watch"))
            .bearer_auth(token)
            .json(&Req {
                topic_name: topic,
                label_ids: ["INBOX"],
            })
            .send()
            .await
            .context("gmail watch request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("gmail watch error: {status} {txt}");
        }
        Ok(())
    }
}

#[async_trait]
impl Mailbox for GmailMailbox {
    async fn list_unread_transactional(&self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct IdRef {
            id: String,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            messages: Vec<IdRef>,
        }

        let token = self.auth.access_token().await?;
        let resp = self
            .http
            .get(format!("{GMAIL_BASE}/messages"))
            .bearer_auth(token)
            .query(&[
                ("q", self.unread_query().as_str()),
                ("maxResults", &self.max_results.to_string()),
            ])
            .send()
            .await
            .context("gmail list request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("gmail list error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse gmail list response")?;
        debug!(count = out.messages.len(), "unread transactional messages");
        Ok(out.messages.into_iter().map(|m| m.id).collect())
    }

    async fn fetch(&self, id: &str) -> Result<Option<InboundEmail>> {
        #[derive(Deserialize)]
        struct Resp {
            payload: Option<Payload>,
        }

        let token = self.auth.access_token().await?;
        let resp = self
            .http
            .get(format!("{GMAIL_BASE}/messages/{id}"))
            .bearer_auth(token)
            .query(&[("format", "full")])
            .send()
            .await
            .context("gmail get request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("gmail get error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse gmail message")?;
        let Some(payload) = out.payload else {
            return Ok(None);
        };

        let from = payload.header("from").unwrap_or_default();
        let subject = payload.header("subject").unwrap_or_default();
        let Some(html_body) = payload.html_body() else {
            return Ok(None);
        };

        Ok(Some(InboundEmail {
            id: id.to_string(),
            from,
            subject,
            html_body,
        }))
    }

    async fn mark_read(&self, id: &str) -> Result<()> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Req<'a> {
            remove_label_ids: [&'a str; 1],
        }

        let token = self.auth.access_token().await?;
        let resp = self
            .http
            .post(format!("{GMAIL_BASE}/messages/{id}/modify"))
            .bearer_auth(token)
            .json(&Req {
                remove_label_ids: ["UNREAD"],
            })
            .send()
            .await
            .context("gmail modify request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("gmail modify error: {status} {txt}");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
    body: Option<Body>,
    parts: Option<Vec<Payload>>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct Body {
    data: Option<String>,
}

impl Payload {
    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.clone())
    }

    /// The HTML body: either directly on a `text/html` payload or on
    /// the first `text/html` part, searching nested multiparts
    /// depth-first.
    fn html_body(&self) -> Option<String> {
        if matches!(self.mime_type.as_deref(), Some("text/html") | None) {
            if let Some(data) = self.body.as_ref().and_then(|b| b.data.as_deref()) {
                if let Some(decoded) = decode_base64url(data) {
                    return Some(decoded);
                }
            }
        }
        for part in self.parts.as_deref().unwrap_or_default() {
            if let Some(found) = part.html_body() {
                return Some(found);
            }
        }
        None
    }
}

/// Gmail body data is base64url, with padding present or not depending
/// on the producing server.
fn decode_base64url(data: &str) -> Option<String> {
    let bytes = URL_SAFE
        .decode(data)
        .or_else(|_| URL_SAFE_NO_PAD.decode(data))
        .ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}
