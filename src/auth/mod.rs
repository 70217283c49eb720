//! OAuth2 support: interactive authorization flow, token persistence, and
//! a self-refreshing token source for API clients.

mod flow;
mod token;

pub use flow::{Flow, OAuthConfig};
pub use token::{load_token, save_token, Token};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Google OAuth2 authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
/// Google OAuth2 token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Read-only Google Drive scope.
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
/// Read-only Gmail scope.
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// Supplies bearer tokens to API clients.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Return a currently-valid access token.
    async fn access_token(&self) -> Result<String>;
}

/// Token source backed by a persisted OAuth token, refreshing it at the
/// token endpoint when it nears expiry and writing the refreshed token
/// back to disk.
pub struct TokenSource {
    http: reqwest::Client,
    config: OAuthConfig,
    token_path: PathBuf,
    token: Mutex<Token>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
}

impl TokenSource {
    /// Create a token source from an already-loaded token.
    pub fn new(config: OAuthConfig, token_path: PathBuf, token: Token) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            token_path,
            token: Mutex::new(token),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Token> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
        ];

        let resp = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .context("token refresh request")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("token refresh failed with {status}: {body}");
        }

        let refreshed: RefreshResponse = resp.json().await.context("decode refresh response")?;
        Ok(Token {
            access_token: refreshed.access_token,
            token_type: refreshed.token_type.unwrap_or_else(|| "Bearer".to_string()),
            // Google omits the refresh token on refresh; keep the old one.
            refresh_token: refreshed
                .refresh_token
                .or_else(|| Some(refresh_token.to_string())),
            expiry: refreshed
                .expires_in
                .map(|secs| chrono::Utc::now() + chrono::Duration::seconds(secs)),
        })
    }
}

#[async_trait]
impl AccessTokenProvider for TokenSource {
    async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;

        if !token.is_expired() {
            return Ok(token.access_token.clone());
        }

        let Some(refresh_token) = token.refresh_token.clone() else {
            bail!("OAuth token expired and no refresh token available; run `pkb auth` again");
        };

        debug!("access token expired, refreshing");
        let refreshed = self.refresh(&refresh_token).await?;

        // A failed write only costs a refresh on the next run.
        if let Err(err) = save_token(&self.token_path, &refreshed) {
            warn!(error = %err, "failed to persist refreshed token");
        }

        *token = refreshed;
        Ok(token.access_token.clone())
    }
}
