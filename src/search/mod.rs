//! Concurrent fan-out search across connectors

mod engine;

pub use engine::{ConnectorFailure, SearchEngine, SearchError};
