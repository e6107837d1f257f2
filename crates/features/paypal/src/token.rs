use crate::error::PayPalError;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use std::fmt;
use tokio::sync::RwLock;
use tracing::debug;

const TOKEN_PATH: &str = "/v1/oauth2/token";
const DEFAULT_EXPIRES_IN: i64 = 3_600;
/// Tokens are refreshed this long before PayPal expires them.
const EXPIRY_MARGIN: i64 = 60;
/// PayPal issues tokens for hours; anything longer than a day is not trusted.
const MAX_LIFETIME: i64 = 86_400;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
}

/// OAuth client-credentials token, fetched on demand and reused until shortly before expiry.
pub struct TokenCache {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    cached: RwLock<Option<(String, DateTime<Utc>)>>,
}

impl fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCache")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl TokenCache {
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            cached: RwLock::new(None),
        }
    }

    /// Returns a valid access token, refreshing it when missing or about to expire.
    ///
    /// # Errors
    /// [`PayPalError::Auth`] when PayPal refuses the credentials or answers without a token.
    pub async fn access_token(&self) -> Result<String, PayPalError> {
        if let Some(token) = self.valid_token().await {
            return Ok(token);
        }

        let mut cached = self.cached.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some((token, expiry)) = cached.as_ref()
            && *expiry > Utc::now()
        {
            return Ok(token.clone());
        }

        let (token, expiry) = self.fetch().await?;
        *cached = Some((token.clone(), expiry));
        Ok(token)
    }

    /// Forgets the cached token, forcing a refresh on the next call.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    async fn valid_token(&self) -> Option<String> {
        let cached = self.cached.read().await;
        cached.as_ref().filter(|(_, expiry)| *expiry > Utc::now()).map(|(token, _)| token.clone())
    }

    async fn fetch(&self) -> Result<(String, DateTime<Utc>), PayPalError> {
        let url = format!("{}{TOKEN_PATH}", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| PayPalError::Auth { message: e.to_string().into(), context: Some(TOKEN_PATH.into()) })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PayPalError::Auth {
                message: format!("token request failed with {status}").into(),
                context: Some(TOKEN_PATH.into()),
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| PayPalError::Auth { message: e.to_string().into(), context: Some(TOKEN_PATH.into()) })?;
        let token = body.access_token.filter(|t| !t.is_empty()).ok_or_else(|| PayPalError::Auth {
            message: "response has no access_token".into(),
            context: Some(TOKEN_PATH.into()),
        })?;

        let expiry = expiry_from(Utc::now(), body.expires_in);
        debug!(expires_at = %expiry, "PayPal access token refreshed");

        Ok((token, expiry))
    }
}

/// When a token issued at `now` must be refreshed. Lifetimes are clamped to
/// `0..=MAX_LIFETIME` so a hostile `expires_in` cannot overflow the clock.
fn expiry_from(now: DateTime<Utc>, expires_in: Option<i64>) -> DateTime<Utc> {
    let lifetime =
        expires_in.unwrap_or(DEFAULT_EXPIRES_IN).saturating_sub(EXPIRY_MARGIN).clamp(0, MAX_LIFETIME);
    TimeDelta::try_seconds(lifetime)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(now)
}
