use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use shopbot_db::{collection_names, Database};
use tracing::{info, warn};

#[derive(Clone)]
pub struct HealthState {
    database: Arc<Database>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub database: HealthCheck,
    pub collections: Vec<String>,
    pub checked_at: String,
}

pub fn router(database: Arc<Database>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { database })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let (database, collections) = database_check(&state.database).await;
    let ready = database.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "shopbot-server runtime initialized".to_string(),
        },
        database,
        collections,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(database: &Database) -> (HealthCheck, Vec<String>) {
    let pool = match database.pool().await {
        Ok(pool) => pool,
        Err(error) => {
            warn!(
                event_name = "system.health.database_unavailable",
                error = %error,
                "document store could not be opened"
            );
            return (
                HealthCheck { status: "degraded", detail: format!("{error}") },
                Vec::new(),
            );
        }
    };

    if let Err(error) = sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        return (
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") },
            Vec::new(),
        );
    }

    match collection_names(pool).await {
        Ok(names) => {
            info!(
                event_name = "system.health.collections",
                collections = ?names,
                "document store collections listed"
            );
            (
                HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
                names,
            )
        }
        Err(error) => (
            HealthCheck {
                status: "degraded",
                detail: format!("listing collections failed: {error}"),
            },
            Vec::new(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use shopbot_db::Database;

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_returns_ready_when_database_is_reachable() {
        let database = Arc::new(Database::new("sqlite::memory:", 1, 5));

        let (status, Json(payload)) =
            health(State(HealthState { database: database.clone() })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.database.status, "ready");
        assert_eq!(payload.service.status, "ready");
        assert_eq!(payload.collections, vec!["query_log".to_owned()]);

        database.close().await;
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_database_is_closed() {
        let database = Arc::new(Database::new("sqlite::memory:", 1, 5));
        database.pool().await.expect("pool should connect");
        database.close().await;

        let (status, Json(payload)) = health(State(HealthState { database })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.database.status, "degraded");
        assert_eq!(payload.service.status, "ready");
        assert!(payload.collections.is_empty());
    }

    #[tokio::test]
    async fn health_is_degraded_when_database_cannot_open() {
        let database = Arc::new(Database::new("sqlite:///nonexistent-dir/shopbot.db", 1, 1));

        let (status, Json(payload)) = health(State(HealthState { database })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.database.status, "degraded");
    }
}
