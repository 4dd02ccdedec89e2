use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::Row;
use uuid::Uuid;

use shopbot_core::domain::query_log::QueryLogEntry;

use super::{QueryLogRepository, RepositoryError};
use crate::Database;

/// A query log document as persisted, including its generated identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StoredQueryLog {
    pub id: String,
    pub requester: String,
    pub query_text: String,
    pub created_at: DateTime<Utc>,
}

pub struct SqlQueryLogRepository {
    database: Arc<Database>,
}

impl SqlQueryLogRepository {
    pub fn new(database: Arc<Database>) -> Self {
        Self { database }
    }
}

fn row_to_query_log(row: &sqlx::sqlite::SqliteRow) -> Result<StoredQueryLog, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requester: String =
        row.try_get("requester").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let query_text: String =
        row.try_get("query_text").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid created_at: {e}")))?;

    Ok(StoredQueryLog { id, requester, query_text, created_at })
}

#[async_trait::async_trait]
impl QueryLogRepository for SqlQueryLogRepository {
    async fn insert(&self, entry: QueryLogEntry) -> Result<StoredQueryLog, RepositoryError> {
        let pool = self.database.pool().await?;
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO query_log (id, requester, query_text, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&entry.requester)
        .bind(&entry.query_text)
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;

        self.find_by_id(&id).await?.ok_or(RepositoryError::MissingAfterInsert(id))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<StoredQueryLog>, RepositoryError> {
        let pool = self.database.pool().await?;
        let row = sqlx::query(
            "SELECT id, requester, query_text, created_at FROM query_log WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        row.as_ref().map(row_to_query_log).transpose()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use shopbot_core::domain::query_log::QueryLogEntry;

    use super::SqlQueryLogRepository;
    use crate::repositories::QueryLogRepository;
    use crate::Database;

    fn repository() -> (Arc<Database>, SqlQueryLogRepository) {
        let database = Arc::new(Database::new("sqlite::memory:", 1, 5));
        (database.clone(), SqlQueryLogRepository::new(database))
    }

    #[tokio::test]
    async fn insert_reads_back_document_with_generated_id() {
        let (database, repository) = repository();
        assert!(!database.is_connected());

        let stored = repository
            .insert(QueryLogEntry::new("U024BE7LH", "query - 100-200 - 3"))
            .await
            .expect("insert");

        assert!(database.is_connected(), "first insert should open the store");
        assert_eq!(stored.id.len(), 36);
        assert_eq!(stored.requester, "U024BE7LH");
        assert_eq!(stored.query_text, "query - 100-200 - 3");

        let found = repository.find_by_id(&stored.id).await.expect("find").expect("present");
        assert_eq!(found, stored);

        let json = serde_json::to_value(&stored).expect("serialize");
        assert_eq!(json["id"], stored.id.as_str());
        database.close().await;
    }

    #[tokio::test]
    async fn each_insert_gets_a_distinct_id() {
        let (database, repository) = repository();

        let first = repository.insert(QueryLogEntry::new("U1", "query - 1-2 - 1")).await.expect("first");
        let second =
            repository.insert(QueryLogEntry::new("U1", "query - 3-4 - 1")).await.expect("second");

        assert_ne!(first.id, second.id);
        let stored = repository.find_by_id(&second.id).await.expect("find").expect("present");
        assert_eq!(stored.query_text, "query - 3-4 - 1");
        database.close().await;
    }

    #[tokio::test]
    async fn unknown_id_is_none() {
        let (database, repository) = repository();
        assert!(repository.find_by_id("missing").await.expect("query").is_none());
        database.close().await;
    }
}
