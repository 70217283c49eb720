//! Connector trait and shared result type

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single search result from any connector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Title of the matching item
    pub title: String,
    /// Optional excerpt/preview, may be empty
    #[serde(default)]
    pub snippet: String,
    /// Link to the item in its source service
    pub url: String,
    /// Name of the connector that produced this hit
    pub source: String,
}

impl SearchHit {
    /// Create a new hit without a snippet
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            snippet: String::new(),
            url: url.into(),
            source: source.into(),
        }
    }

    /// Attach a snippet
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }
}

/// Interface implemented by each data source.
///
/// Connectors are stateless from the engine's perspective: every `search`
/// call is independent, and `name` must be stable across calls because it is
/// used for both source filtering and error attribution.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Stable identifier for this connector (e.g. "google-drive")
    fn name(&self) -> &str;

    /// Run a search against the backing service
    async fn search(&self, query: &str) -> anyhow::Result<Vec<SearchHit>>;
}
