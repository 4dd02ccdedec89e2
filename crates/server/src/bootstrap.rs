use std::{sync::Arc, time::Duration};

use shopbot_core::config::{AppConfig, ConfigError};
use shopbot_core::{CatalogError, NotifyError};
use shopbot_db::{Database, SqlQueryLogRepository};
use shopbot_slack::{dispatcher_with_service, ChannelTransport, ListenerRunner, SlackWebClient};
use thiserror::Error;
use tracing::info;

use crate::{catalog::HttpCatalogClient, gateway::ProductGateway, routes::AppState};

const SLACK_TIMEOUT: Duration = Duration::from_secs(30);
const INGRESS_QUEUE_CAPACITY: usize = 64;

pub struct Application {
    pub config: AppConfig,
    pub database: Arc<Database>,
    pub state: AppState,
    pub listener: ListenerRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("catalog client setup failed: {0}")]
    Catalog(#[source] CatalogError),
    #[error("slack client setup failed: {0}")]
    Slack(#[source] NotifyError),
}

/// Wires collaborators without touching the network; the database opens on first use.
pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    config.validate()?;
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let database = Arc::new(Database::new(
        config.database.url.clone(),
        config.database.max_connections,
        config.database.timeout_secs,
    ));
    let catalog = HttpCatalogClient::new(
        config.products_url(),
        Duration::from_secs(config.catalog.timeout_secs),
    )
    .map_err(BootstrapError::Catalog)?;
    let slack = SlackWebClient::new(
        config.slack.api_base_url.clone(),
        config.slack.bot_token.clone(),
        SLACK_TIMEOUT,
    )
    .map_err(BootstrapError::Slack)?;

    let gateway = ProductGateway::new(
        Arc::new(catalog),
        Arc::new(slack.clone()),
        config.notifier.channel_id.clone(),
        Arc::new(SqlQueryLogRepository::new(database.clone())),
    );

    let (transport, ingress) = ChannelTransport::new(INGRESS_QUEUE_CAPACITY);
    let listener = ListenerRunner::new(
        transport,
        dispatcher_with_service(gateway.clone()),
        Arc::new(slack.clone()),
    );

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        catalog_url = %config.products_url(),
        notifier_enabled = config.notifier.channel_id.is_some(),
        "application wired"
    );

    Ok(Application { config, database, state: AppState { gateway, slack, ingress }, listener })
}

#[cfg(test)]
mod tests {
    use shopbot_core::config::{AppConfig, DatabaseConfig};

    use crate::bootstrap::bootstrap_with_config;

    fn config(bot_token: &str) -> AppConfig {
        let mut config = AppConfig {
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
                timeout_secs: 5,
            },
            ..AppConfig::default()
        };
        config.slack.bot_token = bot_token.to_string().into();
        config
    }

    #[test]
    fn bootstrap_fails_fast_with_app_level_token() {
        let result = bootstrap_with_config(config("xapp-not-a-bot-token"));

        let message = result.err().expect("error").to_string();
        assert!(message.contains("slack.bot_token"));
    }

    #[tokio::test]
    async fn bootstrap_wires_without_opening_database() {
        let app = bootstrap_with_config(config("xoxb-test")).expect("bootstrap should succeed");

        assert!(!app.database.is_connected());
        assert_eq!(app.config.database.url, "sqlite::memory:");

        app.database.pool().await.expect("database opens on first use");
        assert!(app.database.is_connected());
        app.database.close().await;
    }
}
