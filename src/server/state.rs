//! Application state shared across handlers

use crate::search::SearchEngine;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Fan-out search engine
    pub engine: Arc<SearchEngine>,
}

impl AppState {
    pub fn new(engine: SearchEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}
