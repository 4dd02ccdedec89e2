pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{collection_names, connect_with_settings, Database, DatabaseError, DbPool};
pub use repositories::{
    InMemoryQueryLogRepository, QueryLogRepository, RepositoryError, SqlQueryLogRepository,
    StoredQueryLog,
};
