//! Google OAuth2 refresh-token exchange with an expiry-aware cache.
//!
//! The cache is an instance field, not process state: handlers share
//! one `GoogleAuth` via the app state, and tests get fresh instances.

use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

struct CachedToken {
    token: String,
    expires_at: Instant,
}

pub struct GoogleAuth {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    cached: Mutex<Option<CachedToken>>,
}

impl GoogleAuth {
    pub fn new(
        http: reqwest::Client,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            cached: Mutex::new(None),
        }
    }

    /// Current access token, refreshed through the OAuth endpoint when
    /// the cached one is absent or about to expire.
    pub async fn access_token(&self) -> Result<String> {
        let mut guard = self.cached.lock().await;
        if let Some(cached) = guard.as_ref() {
            if Instant::now() < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }

        #[derive(Deserialize)]
        struct Resp {
            access_token: String,
            expires_in: u64,
        }

        let resp = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", self.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .context("google token request")?;

        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            bail!("google token error: {status} {txt}");
        }

        let out: Resp = resp.json().await.context("parse google token response")?;
        debug!(expires_in = out.expires_in, "google access token refreshed");

        // Renew a minute before the provider-reported expiry.
        let expires_at = Instant::now() + Duration::from_secs(out.expires_in.saturating_sub(60));
        *guard = Some(CachedToken {
            token: out.access_token.clone(),
            expires_at,
        });
        Ok(out.access_token)
    }
}
