//! Gmail connector
//!
//! Searches mail via the Gmail API: one list call, then a metadata fetch
//! per message for the subject line and sender.

use super::traits::{Connector, SearchHit};
use crate::auth::AccessTokenProvider;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

/// Default Gmail API base URL
pub const GMAIL_API_URL: &str = "https://gmail.googleapis.com/gmail/v1";

/// Connector name, used for source filtering and error attribution
pub const SOURCE_NAME: &str = "gmail";

const MAX_RESULTS: u32 = 20;

/// An email message returned from the Gmail API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub subject: String,
    pub snippet: String,
    pub from: String,
}

/// Abstracts the Gmail API for testability.
#[async_trait]
pub trait GmailClient: Send + Sync {
    async fn search_messages(&self, query: &str) -> Result<Vec<Message>>;
}

/// Gmail connector.
pub struct GmailConnector {
    client: Box<dyn GmailClient>,
}

impl GmailConnector {
    pub fn new(client: impl GmailClient + 'static) -> Self {
        Self {
            client: Box::new(client),
        }
    }
}

#[async_trait]
impl Connector for GmailConnector {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let messages = self
            .client
            .search_messages(query)
            .await
            .context("gmail search")?;

        Ok(messages
            .into_iter()
            .map(|m| {
                SearchHit::new(m.subject, message_url(&m.id), SOURCE_NAME)
                    .with_snippet(m.snippet)
            })
            .collect())
    }
}

/// Deep link into the Gmail web UI for a message id.
fn message_url(id: &str) -> String {
    format!("https://mail.google.com/mail/u/0/#inbox/{id}")
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MessageList {
    messages: Vec<MessageRef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MessageMetadata {
    snippet: String,
    payload: MessagePayload,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MessagePayload {
    headers: Vec<MessageHeader>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MessageHeader {
    name: String,
    value: String,
}

/// Gmail client backed by the real HTTP API.
pub struct GmailApiClient {
    http: reqwest::Client,
    tokens: Arc<dyn AccessTokenProvider>,
    base_url: String,
}

impl GmailApiClient {
    pub fn new(tokens: Arc<dyn AccessTokenProvider>) -> Self {
        Self::with_base_url(tokens, GMAIL_API_URL)
    }

    /// Point the client at a different base URL (used in tests).
    pub fn with_base_url(tokens: Arc<dyn AccessTokenProvider>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            tokens,
            base_url: base_url.into(),
        }
    }

    async fn fetch_metadata(&self, token: &str, id: &str) -> Result<MessageMetadata> {
        let resp = self
            .http
            .get(format!("{}/users/me/messages/{id}", self.base_url))
            .bearer_auth(token)
            .query(&[
                ("format", "metadata"),
                ("metadataHeaders", "Subject"),
                ("metadataHeaders", "From"),
            ])
            .send()
            .await
            .context("gmail messages.get")?;

        if !resp.status().is_success() {
            bail!("gmail messages.get returned {}", resp.status());
        }

        resp.json().await.context("decode gmail messages.get")
    }
}

#[async_trait]
impl GmailClient for GmailApiClient {
    async fn search_messages(&self, query: &str) -> Result<Vec<Message>> {
        let token = self.tokens.access_token().await?;

        let max_results = MAX_RESULTS.to_string();
        let resp = self
            .http
            .get(format!("{}/users/me/messages", self.base_url))
            .bearer_auth(&token)
            .query(&[("q", query), ("maxResults", max_results.as_str())])
            .send()
            .await
            .context("gmail messages.list")?;

        if !resp.status().is_success() {
            bail!("gmail messages.list returned {}", resp.status());
        }

        let list: MessageList = resp.json().await.context("decode gmail messages.list")?;

        let mut messages = Vec::with_capacity(list.messages.len());
        for msg_ref in list.messages {
            // Individual metadata failures drop that message, not the batch.
            let metadata = match self.fetch_metadata(&token, &msg_ref.id).await {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!(message_id = %msg_ref.id, error = %err, "skipping message");
                    continue;
                }
            };

            let mut subject = String::new();
            let mut from = String::new();
            for header in metadata.payload.headers {
                match header.name.as_str() {
                    "Subject" => subject = header.value,
                    "From" => from = header.value,
                    _ => {}
                }
            }

            messages.push(Message {
                id: msg_ref.id,
                subject,
                snippet: metadata.snippet,
                from,
            });
        }

        Ok(messages)
    }
}
