use async_trait::async_trait;
use thiserror::Error;

use shopbot_core::domain::query_log::QueryLogEntry;

use crate::connection::DatabaseError;

pub mod memory;
pub mod query_log;

pub use memory::InMemoryQueryLogRepository;
pub use query_log::{SqlQueryLogRepository, StoredQueryLog};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Connection(#[from] DatabaseError),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("document `{0}` was not found after insert")]
    MissingAfterInsert(String),
}

#[async_trait]
pub trait QueryLogRepository: Send + Sync {
    /// Stores the entry and returns it as read back from the store, with its generated id.
    async fn insert(&self, entry: QueryLogEntry) -> Result<StoredQueryLog, RepositoryError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<StoredQueryLog>, RepositoryError>;
}
