//! Search engine: fans one query out to every selected connector
//! concurrently and folds the outcomes back into a single result set.

use crate::connectors::{Connector, SearchHit};
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// A single connector's failure, tagged with the connector's name.
#[derive(Debug, Clone)]
pub struct ConnectorFailure {
    /// Name of the connector that failed
    pub connector: String,
    /// Underlying error message
    pub message: String,
}

impl fmt::Display for ConnectorFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.connector, self.message)
    }
}

/// Error returned by the engine.
///
/// Raised only when every selected connector fails; partial failures are
/// absorbed as long as at least one connector succeeds.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("all connectors failed: {}", format_failures(.0))]
    AllConnectorsFailed(Vec<ConnectorFailure>),
}

fn format_failures(failures: &[ConnectorFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Fans out search queries to multiple connectors concurrently.
///
/// The connector set is fixed at construction, so the engine is safe to
/// share across callers; each search call is independent.
pub struct SearchEngine {
    connectors: Vec<Arc<dyn Connector>>,
}

impl SearchEngine {
    /// Create a search engine over the given connectors.
    ///
    /// Zero connectors is valid; every search then succeeds with no hits.
    pub fn new(connectors: Vec<Arc<dyn Connector>>) -> Self {
        Self { connectors }
    }

    /// Names of all configured connectors, in registration order.
    pub fn connector_names(&self) -> Vec<&str> {
        self.connectors.iter().map(|c| c.name()).collect()
    }

    /// Query every connector concurrently and aggregate results.
    ///
    /// Results from healthy connectors are returned even when others fail;
    /// an error is returned only if all connectors fail.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        self.search_with_sources(query, None).await
    }

    /// Like [`search`](Self::search), restricted to the named sources.
    ///
    /// `None` or an empty slice means no restriction. Names that match no
    /// connector are ignored rather than rejected, so a stale or misspelled
    /// source name from a caller never fails the whole request; an unmatched
    /// filter simply selects zero connectors and yields an empty success.
    pub async fn search_with_sources(
        &self,
        query: &str,
        sources: Option<&[String]>,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let selected: Vec<&Arc<dyn Connector>> = match sources {
            Some(names) if !names.is_empty() => self
                .connectors
                .iter()
                .filter(|c| names.iter().any(|n| n == c.name()))
                .collect(),
            _ => self.connectors.iter().collect(),
        };

        if selected.is_empty() {
            return Ok(Vec::new());
        }

        debug!(query, connectors = selected.len(), "dispatching search");

        // All futures are created before any is awaited, so the connector
        // calls genuinely overlap; join_all blocks until every one of them
        // has completed or failed.
        let calls: Vec<_> = selected
            .iter()
            .map(|connector| {
                let connector = Arc::clone(connector);
                let query = query.to_string();
                async move {
                    let name = connector.name().to_string();
                    let outcome = connector.search(&query).await;
                    (name, outcome)
                }
            })
            .collect();

        let outcomes = join_all(calls).await;

        let mut hits = Vec::new();
        let mut failures = Vec::new();

        for (name, outcome) in outcomes {
            match outcome {
                Ok(mut batch) => {
                    debug!(connector = %name, count = batch.len(), "connector succeeded");
                    hits.append(&mut batch);
                }
                Err(err) => {
                    warn!(connector = %name, error = %err, "connector failed");
                    failures.push(ConnectorFailure {
                        connector: name,
                        message: format!("{err:#}"),
                    });
                }
            }
        }

        if failures.len() == selected.len() {
            return Err(SearchError::AllConnectorsFailed(failures));
        }

        Ok(hits)
    }
}
