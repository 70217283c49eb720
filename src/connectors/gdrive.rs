//! Google Drive connector
//!
//! Searches Drive file contents via the official v3 API.

use super::traits::{Connector, SearchHit};
use crate::auth::AccessTokenProvider;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// Default Drive API base URL
pub const DRIVE_API_URL: &str = "https://www.googleapis.com/drive/v3";

/// Connector name, used for source filtering and error attribution
pub const SOURCE_NAME: &str = "google-drive";

/// A file returned from the Google Drive API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub web_view_link: String,
}

/// Abstracts the Drive API for testability.
#[async_trait]
pub trait DriveClient: Send + Sync {
    async fn search_files(&self, query: &str) -> Result<Vec<DriveFile>>;
}

/// Google Drive connector.
pub struct DriveConnector {
    client: Box<dyn DriveClient>,
}

impl DriveConnector {
    pub fn new(client: impl DriveClient + 'static) -> Self {
        Self {
            client: Box::new(client),
        }
    }
}

#[async_trait]
impl Connector for DriveConnector {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let files = self
            .client
            .search_files(query)
            .await
            .context("google drive search")?;

        Ok(files
            .into_iter()
            .map(|f| SearchHit::new(f.name, f.web_view_link, SOURCE_NAME))
            .collect())
    }
}

/// Construct a Drive API query string, escaping user input so it cannot
/// break out of the quoted term.
fn build_search_query(query: &str) -> String {
    let escaped = query.replace('\\', "\\\\").replace('\'', "\\'");
    format!("fullText contains '{escaped}' and trashed = false")
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FileList {
    files: Vec<FileResource>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FileResource {
    id: String,
    name: String,
    mime_type: String,
    web_view_link: String,
}

/// Drive client backed by the real HTTP API.
pub struct DriveApiClient {
    http: reqwest::Client,
    tokens: Arc<dyn AccessTokenProvider>,
    base_url: String,
}

impl DriveApiClient {
    pub fn new(tokens: Arc<dyn AccessTokenProvider>) -> Self {
        Self::with_base_url(tokens, DRIVE_API_URL)
    }

    /// Point the client at a different base URL (used in tests).
    pub fn with_base_url(tokens: Arc<dyn AccessTokenProvider>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            tokens,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl DriveClient for DriveApiClient {
    async fn search_files(&self, query: &str) -> Result<Vec<DriveFile>> {
        let token = self.tokens.access_token().await?;
        let q = build_search_query(query);

        let resp = self
            .http
            .get(format!("{}/files", self.base_url))
            .bearer_auth(token)
            .query(&[
                ("q", q.as_str()),
                ("fields", "files(id, name, mimeType, webViewLink)"),
                ("pageSize", "50"),
            ])
            .send()
            .await
            .context("drive files.list")?;

        if !resp.status().is_success() {
            bail!("drive files.list returned {}", resp.status());
        }

        let list: FileList = resp.json().await.context("decode drive files.list")?;
        Ok(list
            .files
            .into_iter()
            .map(|f| DriveFile {
                id: f.id,
                name: f.name,
                mime_type: f.mime_type,
                web_view_link: f.web_view_link,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct StaticTokens(&'static str);

    #[async_trait]
    impl AccessTokenProvider for StaticTokens {
        async fn access_token(&self) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct StubDriveClient {
        outcome: Result<Vec<DriveFile>, &'static str>,
    }

    #[async_trait]
    impl DriveClient for StubDriveClient {
        async fn search_files(&self, _query: &str) -> Result<Vec<DriveFile>> {
            match &self.outcome {
                Ok(files) => Ok(files.clone()),
                Err(msg) => Err(anyhow::anyhow!(*msg)),
            }
        }
    }

    #[test]
    fn search_query_is_escaped() {
        assert_eq!(
            build_search_query("quarterly report"),
            "fullText contains 'quarterly report' and trashed = false"
        );
        assert_eq!(
            build_search_query("bob's notes"),
            "fullText contains 'bob\\'s notes' and trashed = false"
        );
        assert_eq!(
            build_search_query(r"path\to"),
            r"fullText contains 'path\\to' and trashed = false"
        );
    }

    #[tokio::test]
    async fn connector_maps_files_to_hits() {
        let connector = DriveConnector::new(StubDriveClient {
            outcome: Ok(vec![DriveFile {
                id: "f1".to_string(),
                name: "Notes".to_string(),
                mime_type: "application/vnd.google-apps.document".to_string(),
                web_view_link: "https://docs.google.com/f1".to_string(),
            }]),
        });

        let hits = connector.search("notes").await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Notes");
        assert_eq!(hits[0].url, "https://docs.google.com/f1");
        assert_eq!(hits[0].source, "google-drive");
        assert!(hits[0].snippet.is_empty());
    }

    #[tokio::test]
    async fn connector_annotates_client_errors() {
        let connector = DriveConnector::new(StubDriveClient {
            outcome: Err("quota exceeded"),
        });

        let err = connector.search("q").await.unwrap_err();
        assert!(format!("{err:#}").contains("google drive search"));
    }

    #[tokio::test]
    async fn api_client_searches_files() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .and(header("authorization", "Bearer test-token"))
            .and(query_param(
                "q",
                "fullText contains 'rust' and trashed = false",
            ))
            .and(query_param("pageSize", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "files": [
                    {
                        "id": "abc",
                        "name": "Rust Notes",
                        "mimeType": "text/plain",
                        "webViewLink": "https://drive.google.com/file/d/abc"
                    }
                ]
            })))
            .mount(&server)
            .await;

        let client =
            DriveApiClient::with_base_url(Arc::new(StaticTokens("test-token")), server.uri());
        let files = client.search_files("rust").await.unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "Rust Notes");
        assert_eq!(files[0].web_view_link, "https://drive.google.com/file/d/abc");
    }

    #[tokio::test]
    async fn api_client_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = DriveApiClient::with_base_url(Arc::new(StaticTokens("t")), server.uri());
        let err = client.search_files("q").await.unwrap_err();
        assert!(err.to_string().contains("403"));
    }
}
