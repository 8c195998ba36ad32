//! Record store access
//!
//! The monitor only needs one query: the most recently inserted record of a
//! single collection. Connections are scoped to one check cycle.

pub mod http;
pub mod timestamp;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use http::HttpRecordStore;
pub use timestamp::parse_created_at;

/// The newest record in the watched collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestRecordSnapshot {
    pub created_at: DateTime<Utc>,
}

/// Opens per-cycle connections to the record store
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>, StoreError>;
}

/// An open store connection
#[async_trait]
pub trait StoreConnection: Send {
    /// Fetch the single most recently inserted record, if any
    async fn latest_record(&mut self) -> Result<Option<LatestRecordSnapshot>, StoreError>;

    /// Release the connection
    async fn close(&mut self);
}

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Malformed data: {0}")]
    MalformedData(String),
}
