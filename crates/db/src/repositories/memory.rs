use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use shopbot_core::domain::query_log::QueryLogEntry;

use super::{QueryLogRepository, RepositoryError, StoredQueryLog};

#[derive(Default)]
pub struct InMemoryQueryLogRepository {
    logs: RwLock<Vec<StoredQueryLog>>,
}

impl InMemoryQueryLogRepository {
    pub async fn len(&self) -> usize {
        self.logs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.logs.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl QueryLogRepository for InMemoryQueryLogRepository {
    async fn insert(&self, entry: QueryLogEntry) -> Result<StoredQueryLog, RepositoryError> {
        let stored = StoredQueryLog {
            id: Uuid::new_v4().to_string(),
            requester: entry.requester,
            query_text: entry.query_text,
            created_at: Utc::now(),
        };
        self.logs.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<StoredQueryLog>, RepositoryError> {
        let logs = self.logs.read().await;
        Ok(logs.iter().find(|log| log.id == id).cloned())
    }
}
