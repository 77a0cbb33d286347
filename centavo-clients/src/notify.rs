//! Notification collaborator: posts one formatted message per
//! transaction to a Slack channel and later reads the thread replies a
//! human leaves as the transaction's description.
//!
//! The two calls retry differently on purpose: posting retries 429s
//! (and every other failure) with backoff through exhaustion, while
//! the reply fetch short-circuits with `RateLimited` on the first 429
//! so a caller iterating many threads can abort the whole batch
//! instead of retry-storming.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use centavo_core::{Bank, Currency};
use num_format::{Locale, ToFormattedString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::retry::RetryPolicy;

const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";
const REPLIES_URL: &str = "https://slack.com/api/conversations.replies";

/// Result of a notification attempt. `thread_ts` is the provider's
/// thread handle, used as the ledger's correlation key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyOutcome {
    pub accepted: bool,
    pub thread_ts: Option<String>,
}

/// Thread reply fetch outcome. Message texts include the original
/// notification at index 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadReplies {
    Replies(Vec<String>),
    RateLimited,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        merchant: &str,
        amount: f64,
        bank: Bank,
        currency: Currency,
    ) -> Result<NotifyOutcome>;

    async fn thread_replies(&self, thread_ts: &str) -> Result<ThreadReplies>;
}

pub struct SlackNotifier {
    http: reqwest::Client,
    token: String,
    channel: String,
    retry: RetryPolicy,
}

enum PostAttempt {
    Sent(String),
    RateLimited,
    ApiError(String),
}

impl SlackNotifier {
    pub fn new(http: reqwest::Client, token: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            http,
            token: token.into(),
            channel: channel.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn try_post(&self, text: &str) -> Result<PostAttempt> {
        #[derive(Serialize)]
        struct Req<'a> {
            channel: &'a str,
            text: &'a str,
        }
        #[derive(Deserialize)]
        struct Resp {
            ok: bool,
            ts: Option<String>,
            error: Option<String>,
        }

        let resp = self
            .http
            .post(POST_MESSAGE_URL)
            .bearer_auth(&self.token)
            .json(&Req {
                channel: &self.channel,
                text,
            })
            .send()
            .await
            .context("slack post request")?;

        if resp.status().as_u16() == 429 {
            return Ok(PostAttempt::RateLimited);
        }

        let status = resp.status();
        let body: Resp = resp.json().await.context("parse slack response")?;
        if status.is_success() && body.ok {
            if let Some(ts) = body.ts {
                return Ok(PostAttempt::Sent(ts));
            }
        }
        Ok(PostAttempt::ApiError(
            body.error.unwrap_or_else(|| format!("status {status}")),
        ))
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(
        &self,
        merchant: &str,
        amount: f64,
        bank: Bank,
        currency: Currency,
    ) -> Result<NotifyOutcome> {
        let text = format_message(merchant, amount, bank, currency);

        let mut delay = self.retry.initial_delay;
        for attempt in 1..=self.retry.max_attempts {
            match self.try_post(&text).await {
                Ok(PostAttempt::Sent(ts)) => {
                    info!(attempt, ts = %ts, "slack notification sent");
                    return Ok(NotifyOutcome {
                        accepted: true,
                        thread_ts: Some(ts),
                    });
                }
                Ok(PostAttempt::RateLimited) => {
                    warn!(attempt, delay_ms = delay.as_millis() as u64, "slack rate limited");
                }
                Ok(PostAttempt::ApiError(err)) => {
                    warn!(attempt, error = %err, "slack api error");
                }
                Err(err) => {
                    warn!(attempt, error = %err, "slack transport error");
                }
            }
            if attempt < self.retry.max_attempts {
                tokio::time::sleep(delay).await;
                delay = self.retry.next_delay(delay);
            }
        }

        warn!(
            attempts = self.retry.max_attempts,
            "slack notification not sent, giving up"
        );
        Ok(NotifyOutcome {
            accepted: false,
            thread_ts: None,
        })
    }

    async fn thread_replies(&self, thread_ts: &str) -> Result<ThreadReplies> {
        #[derive(Deserialize)]
        struct Msg {
            text: Option<String>,
        }
        #[derive(Deserialize)]
        struct Resp {
            ok: bool,
            messages: Option<Vec<Msg>>,
            error: Option<String>,
        }

        let mut delay = self.retry.initial_delay;
        for attempt in 1..=self.retry.max_attempts {
            let result = self
                .http
                .get(REPLIES_URL)
                .bearer_auth(&self.token)
                .query(&[("channel", self.channel.as_str()), ("ts", thread_ts)])
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().as_u16() == 429 => {
                    // The whole reconciliation batch must stop, not
                    // just this thread.
                    warn!(attempt, "slack rate limited fetching replies");
                    return Ok(ThreadReplies::RateLimited);
                }
                Ok(resp) => {
                    let status = resp.status();
                    match resp.json::<Resp>().await {
                        Ok(body) if status.is_success() && body.ok => {
                            let texts = body
                                .messages
                                .unwrap_or_default()
                                .into_iter()
                                .map(|m| m.text.unwrap_or_default())
                                .collect();
                            return Ok(ThreadReplies::Replies(texts));
                        }
                        Ok(body) => {
                            warn!(attempt, error = ?body.error, "slack api error fetching replies");
                        }
                        Err(err) => {
                            warn!(attempt, error = %err, "parse slack replies response");
                        }
                    }
                }
                Err(err) => {
                    warn!(attempt, error = %err, "slack transport error");
                }
            }
            if attempt < self.retry.max_attempts {
                tokio::time::sleep(delay).await;
                delay = self.retry.next_delay(delay);
            }
        }

        bail!(
            "could not fetch thread replies after {} attempts",
            self.retry.max_attempts
        )
    }
}

/// Two-decimal amount with en-US thousands grouping.
fn format_amount(amount: f64) -> String {
    let total_cents = (amount * 100.0).round() as i64;
    let units = total_cents / 100;
    let cents = total_cents % 100;
    format!("{}.{:02}", units.to_formatted_string(&Locale::en), cents)
}

fn format_message(merchant: &str, amount: f64, bank: Bank, currency: Currency) -> String {
    format!(
        "*Nueva transacción:* {merchant}\n\
         *Monto:* {} {}\n\
         *Banco:* {}\n\n\
         :point_down: *Para añadir una descripción, responde a este mensaje en un hilo.*",
        currency.code(),
        format_amount(amount),
        bank.label()
    )
}
