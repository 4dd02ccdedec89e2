use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use shopbot_core::catalog::summary::cheapest_summary;
use shopbot_core::catalog::CatalogSource;
use shopbot_core::{
    apply, ApplicationError, Cheapest, FilterConfig, Notifier, PriceRange, Product, QueryLogEntry,
};
use shopbot_db::QueryLogRepository;
use shopbot_slack::{CommandEnvelope, ProductQuery, ProductQueryService};

/// Fetch → filter → best-effort notify, shared by the HTTP routes and the chat listener.
#[derive(Clone)]
pub struct ProductGateway {
    catalog: Arc<dyn CatalogSource>,
    notifier: Arc<dyn Notifier>,
    notify_channel: Option<String>,
    query_log: Arc<dyn QueryLogRepository>,
}

impl ProductGateway {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        notifier: Arc<dyn Notifier>,
        notify_channel: Option<String>,
        query_log: Arc<dyn QueryLogRepository>,
    ) -> Self {
        Self { catalog, notifier, notify_channel, query_log }
    }

    pub async fn run(
        &self,
        config: &FilterConfig,
        correlation_id: &str,
    ) -> Result<Vec<Product>, ApplicationError> {
        let listing = self.catalog.fetch_all_products().await?;
        let output = apply(&listing, config);
        info!(
            event_name = "gateway.products.filtered",
            correlation_id,
            upstream_count = listing.len(),
            returned_count = output.products.len(),
            "product pipeline completed"
        );

        self.notify_cheapest(&output.cheapest, correlation_id).await;
        Ok(output.products)
    }

    async fn notify_cheapest(&self, cheapest: &Cheapest, correlation_id: &str) {
        let Some(channel_id) = self.notify_channel.as_deref() else {
            return;
        };
        let Cheapest::Found(product) = cheapest else {
            info!(
                event_name = "gateway.products.notify_skipped",
                correlation_id,
                "no product in range; skipping notification"
            );
            return;
        };

        if let Err(error) = self.notifier.notify(channel_id, &cheapest_summary(product)).await {
            warn!(
                event_name = "gateway.products.notify_failed",
                correlation_id,
                channel_id,
                error = %error,
                "cheapest product notification failed"
            );
        }
    }

    async fn record_query(&self, entry: QueryLogEntry, correlation_id: &str) {
        match self.query_log.insert(entry).await {
            Ok(stored) => info!(
                event_name = "gateway.query_log.stored",
                correlation_id,
                query_log_id = %stored.id,
                "query logged"
            ),
            Err(error) => warn!(
                event_name = "gateway.query_log.failed",
                correlation_id,
                error = %error,
                "failed to log query"
            ),
        }
    }
}

#[async_trait]
impl ProductQueryService for ProductGateway {
    async fn query_products(
        &self,
        query: &ProductQuery,
        envelope: &CommandEnvelope,
    ) -> Result<Vec<Product>, ApplicationError> {
        self.record_query(
            QueryLogEntry::new(&envelope.user_id, &query.raw_text),
            &envelope.request_id,
        )
        .await;

        let range = PriceRange::new(query.min_price as f64, query.max_price as f64)?;
        let config = FilterConfig::new().price_range(range).limit(query.limit as usize);
        self.run(&config, &envelope.request_id).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use shopbot_core::catalog::CatalogSource;
    use shopbot_core::{
        ApplicationError, CatalogError, FilterConfig, Notifier, NotifyError, PriceRange, Product,
        Rating, RatingSelection, StaticCatalog,
    };
    use shopbot_db::InMemoryQueryLogRepository;
    use shopbot_slack::{CommandEnvelope, ProductQuery, ProductQueryService};
    use tokio::sync::Mutex;

    use super::ProductGateway;

    #[derive(Default)]
    pub(crate) struct RecordingNotifier {
        pub(crate) sent: Mutex<Vec<(String, String)>>,
        pub(crate) fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, channel_id: &str, text: &str) -> Result<(), NotifyError> {
            self.sent.lock().await.push((channel_id.to_owned(), text.to_owned()));
            if self.fail {
                return Err(NotifyError::Rejected("channel_not_found".to_owned()));
            }
            Ok(())
        }
    }

    pub(crate) struct FailingCatalog {
        pub(crate) error: CatalogError,
    }

    #[async_trait]
    impl CatalogSource for FailingCatalog {
        async fn fetch_all_products(&self) -> Result<Vec<Product>, CatalogError> {
            Err(self.error.clone())
        }
    }

    pub(crate) fn product(name: &str, price: f64, rate: f64) -> Product {
        Product {
            name: name.to_owned(),
            price,
            description: format!("{name} description"),
            rating: Some(Rating { rate, count: 10 }),
        }
    }

    pub(crate) fn sample_listing() -> Vec<Product> {
        vec![product("A", 120.0, 4.0), product("B", 150.0, 3.0), product("C", 180.0, 5.0)]
    }

    fn envelope(text: &str) -> CommandEnvelope {
        CommandEnvelope {
            text: text.to_owned(),
            channel_id: "C1".to_owned(),
            user_id: "U7".to_owned(),
            thread_ts: None,
            request_id: "req-1".to_owned(),
        }
    }

    fn gateway(
        catalog: Arc<dyn CatalogSource>,
        notifier: Arc<RecordingNotifier>,
        query_log: Arc<InMemoryQueryLogRepository>,
    ) -> ProductGateway {
        ProductGateway::new(catalog, notifier, Some("C-alerts".to_owned()), query_log)
    }

    #[tokio::test]
    async fn rated_run_returns_top_rated_and_notifies_cheapest() {
        let notifier = Arc::new(RecordingNotifier::default());
        let gateway = gateway(
            Arc::new(StaticCatalog::new(sample_listing())),
            notifier.clone(),
            Arc::new(InMemoryQueryLogRepository::default()),
        );
        let config = FilterConfig::new()
            .price_range(PriceRange::new(100.0, 200.0).expect("range"))
            .limit(2)
            .rated(RatingSelection::new(1, true).expect("selection"));

        let products = gateway.run(&config, "req-1").await.expect("run");

        assert_eq!(products, vec![product("A", 120.0, 4.0)]);
        let sent = notifier.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "C-alerts");
        assert!(sent[0].1.contains("- Name: A"));
        assert!(sent[0].1.contains("This is the cheapest product within this price range"));
    }

    #[tokio::test]
    async fn empty_range_skips_notification() {
        let notifier = Arc::new(RecordingNotifier::default());
        let gateway = gateway(
            Arc::new(StaticCatalog::new(sample_listing())),
            notifier.clone(),
            Arc::new(InMemoryQueryLogRepository::default()),
        );
        let config = FilterConfig::new().price_range("500-600".parse().expect("range"));

        let products = gateway.run(&config, "req-1").await.expect("run");

        assert!(products.is_empty());
        assert!(notifier.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn notification_failure_does_not_fail_request() {
        let notifier = Arc::new(RecordingNotifier { fail: true, ..Default::default() });
        let gateway = gateway(
            Arc::new(StaticCatalog::new(sample_listing())),
            notifier.clone(),
            Arc::new(InMemoryQueryLogRepository::default()),
        );

        let products = gateway.run(&FilterConfig::new(), "req-1").await.expect("run");

        assert_eq!(products.len(), 3);
        assert_eq!(notifier.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn no_channel_means_no_notification() {
        let notifier = Arc::new(RecordingNotifier::default());
        let gateway = ProductGateway::new(
            Arc::new(StaticCatalog::new(sample_listing())),
            notifier.clone(),
            None,
            Arc::new(InMemoryQueryLogRepository::default()),
        );

        gateway.run(&FilterConfig::new(), "req-1").await.expect("run");

        assert!(notifier.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn chat_query_is_logged_even_when_catalog_fails() {
        let query_log = Arc::new(InMemoryQueryLogRepository::default());
        let gateway = gateway(
            Arc::new(FailingCatalog {
                error: CatalogError::Upstream {
                    status: 503,
                    message: "Service Unavailable".to_owned(),
                },
            }),
            Arc::new(RecordingNotifier::default()),
            query_log.clone(),
        );
        let query = ProductQuery {
            min_price: 100,
            max_price: 200,
            limit: 5,
            raw_text: "query - 100-200 - 5".to_owned(),
        };

        let error = gateway
            .query_products(&query, &envelope("query - 100-200 - 5"))
            .await
            .expect_err("catalog failure");

        assert!(matches!(error, ApplicationError::Catalog(CatalogError::Upstream { .. })));
        assert_eq!(query_log.len().await, 1);
    }

    #[tokio::test]
    async fn chat_query_with_inverted_range_is_a_filter_error() {
        let query_log = Arc::new(InMemoryQueryLogRepository::default());
        let gateway = gateway(
            Arc::new(StaticCatalog::new(sample_listing())),
            Arc::new(RecordingNotifier::default()),
            query_log.clone(),
        );
        let query = ProductQuery {
            min_price: 300,
            max_price: 100,
            limit: 5,
            raw_text: "query - 300-100 - 5".to_owned(),
        };

        let error = gateway
            .query_products(&query, &envelope("query - 300-100 - 5"))
            .await
            .expect_err("inverted range");

        assert!(matches!(error, ApplicationError::Filter(_)));
    }

    #[tokio::test]
    async fn chat_query_applies_price_range_and_limit() {
        let gateway = gateway(
            Arc::new(StaticCatalog::new(sample_listing())),
            Arc::new(RecordingNotifier::default()),
            Arc::new(InMemoryQueryLogRepository::default()),
        );
        let query = ProductQuery {
            min_price: 130,
            max_price: 200,
            limit: 1,
            raw_text: "query - 130-200 - 1".to_owned(),
        };

        let products = gateway
            .query_products(&query, &envelope("query - 130-200 - 1"))
            .await
            .expect("products");

        assert_eq!(products, vec![product("B", 150.0, 3.0)]);
    }
}
