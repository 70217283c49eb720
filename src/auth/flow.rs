//! Interactive OAuth2 authorization-code flow.
//!
//! Binds an ephemeral loopback listener for the provider's redirect, opens
//! the consent page in the user's browser, waits for the authorization code
//! and exchanges it for a token.

use super::token::Token;
use anyhow::{bail, Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use url::Url;

/// OAuth2 client configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Google config with the Drive and Gmail read-only scopes.
    pub fn google(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: super::GOOGLE_AUTH_URL.to_string(),
            token_url: super::GOOGLE_TOKEN_URL.to_string(),
            scopes: vec![
                super::DRIVE_READONLY_SCOPE.to_string(),
                super::GMAIL_READONLY_SCOPE.to_string(),
            ],
        }
    }
}

/// Opens a URL in the user's browser. Injected for testability.
pub type BrowserOpener = Box<dyn Fn(&str) -> Result<()> + Send + Sync>;

/// An interactive authorization-code flow.
pub struct Flow {
    pub config: OAuthConfig,
    pub open_url: BrowserOpener,
    /// Listen address for the callback server; defaults to an ephemeral
    /// loopback port.
    pub listen_addr: Option<SocketAddr>,
}

type CodeResult = std::result::Result<String, String>;

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

async fn callback(
    State(tx): State<mpsc::Sender<CodeResult>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Some(err) = params.error {
        let _ = tx.send(Err(format!("authorization denied: {err}"))).await;
        return (StatusCode::BAD_REQUEST, "Authorization failed.").into_response();
    }

    match params.code {
        Some(code) => {
            let _ = tx.send(Ok(code)).await;
            "Authorization successful! You can close this tab.".into_response()
        }
        None => {
            let _ = tx.send(Err("no code in callback".to_string())).await;
            (
                StatusCode::BAD_REQUEST,
                "Authorization failed: no code received",
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
}

impl Flow {
    /// Execute the flow. Blocks until the user completes authorization,
    /// the provider reports an error, or the future is dropped.
    pub async fn run(&self) -> Result<Token> {
        let addr = self
            .listen_addr
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 0)));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .context("start callback server")?;
        let local = listener.local_addr().context("callback server address")?;
        let redirect_url = format!("http://{local}/callback");

        let (tx, mut rx) = mpsc::channel::<CodeResult>(1);
        let app = Router::new().route("/callback", get(callback)).with_state(tx);
        let server = tokio::spawn(async move { axum::serve(listener, app).await });

        let auth_url = self.authorize_url(&redirect_url)?;
        (self.open_url)(&auth_url).context("open browser")?;

        let outcome = rx.recv().await;
        server.abort();

        let code = match outcome {
            Some(Ok(code)) => code,
            Some(Err(msg)) => bail!("{msg}"),
            None => bail!("callback server closed before receiving a code"),
        };

        self.exchange(&code, &redirect_url).await
    }

    /// Build the provider consent URL pointing back at our callback.
    fn authorize_url(&self, redirect_url: &str) -> Result<String> {
        let mut url = Url::parse(&self.config.auth_url).context("parse auth URL")?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");
        Ok(url.to_string())
    }

    async fn exchange(&self, code: &str, redirect_url: &str) -> Result<Token> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", &self.config.client_id),
            ("client_secret", &self.config.client_secret),
            ("redirect_uri", redirect_url),
        ];

        let resp = reqwest::Client::new()
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .context("exchange code")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("code exchange failed with {status}: {body}");
        }

        let granted: ExchangeResponse = resp.json().await.context("decode token response")?;
        Ok(Token {
            access_token: granted.access_token,
            token_type: granted.token_type.unwrap_or_else(|| "Bearer".to_string()),
            refresh_token: granted.refresh_token,
            expiry: granted
                .expires_in
                .map(|secs| chrono::Utc::now() + chrono::Duration::seconds(secs)),
        })
    }
}
