//! PKB: search your personal knowledge base from one place.
//!
//! Fans a single query out to every connected service (Google Drive, Gmail)
//! concurrently and aggregates the results behind one interface, exposed as
//! a CLI, an HTTP API, and a terminal UI.

pub mod api;
pub mod auth;
pub mod config;
pub mod connectors;
pub mod search;
pub mod server;
pub mod tui;

pub use api::ApiClient;
pub use config::Settings;
pub use connectors::{Connector, SearchHit};
pub use search::{SearchEngine, SearchError};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
