//! Connectors: one adapter per external data source.

pub mod gdrive;
pub mod gmail;
mod traits;

pub use gdrive::DriveConnector;
pub use gmail::GmailConnector;
pub use traits::{Connector, SearchHit};
