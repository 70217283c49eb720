//! Client for the pkb HTTP API.
//!
//! The CLI and TUI go through this client rather than calling the engine
//! directly, so the single `/search` endpoint stays the one shared code
//! path for all frontends.

use crate::connectors::SearchHit;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use url::Url;

/// Calls the pkb search API.
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl ApiClient {
    /// Create a client targeting the given base URL.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref()).context("parse API base URL")?;
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    /// Query the `/search` endpoint.
    ///
    /// When `sources` is non-empty, only those connectors are queried.
    pub async fn search(
        &self,
        query: &str,
        sources: Option<&[String]>,
    ) -> Result<Vec<SearchHit>> {
        let mut url = self.base_url.join("/search").context("build search URL")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", query);
            if let Some(sources) = sources {
                if !sources.is_empty() {
                    pairs.append_pair("sources", &sources.join(","));
                }
            }
        }

        let resp = self.http.get(url).send().await.context("search request")?;
        let status = resp.status();

        if !status.is_success() {
            // The server reports failures as {"error": "..."}.
            if let Ok(body) = resp.json::<ErrorBody>().await {
                bail!("{}", body.error);
            }
            bail!("server returned {}", status.as_u16());
        }

        resp.json().await.context("decode search response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn search_decodes_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "notes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "title": "Meeting Notes",
                    "snippet": "agenda for friday",
                    "url": "https://docs.google.com/x",
                    "source": "google-drive"
                }
            ])))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let results = client.search("notes", None).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Meeting Notes");
        assert_eq!(results[0].source, "google-drive");
    }

    #[tokio::test]
    async fn search_passes_sources_as_csv() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "q"))
            .and(query_param("sources", "gmail,google-drive"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let sources = vec!["gmail".to_string(), "google-drive".to_string()];
        let results = client.search("q", Some(&sources)).await.unwrap();

        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn empty_sources_slice_is_omitted() {
        let server = MockServer::start().await;
        // Would not match if a sources parameter were sent.
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "q"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let empty: Vec<String> = Vec::new();
        assert!(client.search("q", Some(&empty)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn server_error_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": "all connectors failed: gmail: boom"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let err = client.search("q", None).await.unwrap_err();
        assert_eq!(err.to_string(), "all connectors failed: gmail: boom");
    }

    #[tokio::test]
    async fn undecodable_error_falls_back_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri()).unwrap();
        let err = client.search("q", None).await.unwrap_err();
        assert_eq!(err.to_string(), "server returned 502");
    }
}
