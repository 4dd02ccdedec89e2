use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use shopbot_core::catalog::CatalogSource;
use shopbot_core::domain::product::map_raw_products;
use shopbot_core::{CatalogError, Product, RawProduct};

/// Unauthenticated client for the upstream `GET /products` listing.
#[derive(Clone)]
pub struct HttpCatalogClient {
    client: Client,
    products_url: String,
}

impl HttpCatalogClient {
    pub fn new(products_url: impl Into<String>, timeout: Duration) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| CatalogError::Transport(error.to_string()))?;
        Ok(Self { client, products_url: products_url.into() })
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogClient {
    async fn fetch_all_products(&self) -> Result<Vec<Product>, CatalogError> {
        let response = self.client.get(&self.products_url).send().await.map_err(|error| {
            warn!(
                event_name = "gateway.catalog.unreachable",
                url = %self.products_url,
                error = %error,
                "catalog request failed"
            );
            CatalogError::Transport(error.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("upstream error");
            warn!(
                event_name = "gateway.catalog.upstream_error",
                url = %self.products_url,
                status = status.as_u16(),
                "catalog responded with an error status"
            );
            return Err(CatalogError::Upstream {
                status: status.as_u16(),
                message: format!("{reason} for url `{}`", self.products_url),
            });
        }

        let body =
            response.bytes().await.map_err(|error| CatalogError::Transport(error.to_string()))?;
        let raw: Vec<RawProduct> = serde_json::from_slice(&body)
            .map_err(|error| CatalogError::Malformed(error.to_string()))?;
        let products =
            map_raw_products(raw).map_err(|error| CatalogError::Malformed(error.to_string()))?;
        debug!(
            event_name = "gateway.catalog.fetched",
            product_count = products.len(),
            "catalog listing fetched"
        );
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use shopbot_core::catalog::CatalogSource;
    use shopbot_core::CatalogError;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::HttpCatalogClient;

    fn client(server: &MockServer) -> HttpCatalogClient {
        HttpCatalogClient::new(format!("{}/products", server.uri()), Duration::from_secs(5))
            .expect("client")
    }

    #[tokio::test]
    async fn maps_title_to_name_and_keeps_rating() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": 1,
                    "title": "Backpack",
                    "price": 109.95,
                    "description": "Fits 15 inch laptops",
                    "category": "men's clothing",
                    "rating": {"rate": 3.9, "count": 120}
                },
                {"id": 2, "title": "Mug", "price": 7.5, "description": "Ceramic"}
            ])))
            .mount(&server)
            .await;

        let products = client(&server).fetch_all_products().await.expect("products");

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].name, "Backpack");
        assert_eq!(products[0].rating.as_ref().map(|rating| rating.count), Some(120));
        assert_eq!(products[1].rating, None);
    }

    #[tokio::test]
    async fn upstream_status_is_carried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let error = client(&server).fetch_all_products().await.expect_err("503");

        let CatalogError::Upstream { status, message } = error else {
            panic!("expected upstream error, got {error:?}");
        };
        assert_eq!(status, 503);
        assert!(message.contains("Service Unavailable"));
    }

    #[tokio::test]
    async fn invalid_json_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let error = client(&server).fetch_all_products().await.expect_err("malformed");

        assert!(matches!(error, CatalogError::Malformed(_)));
    }

    #[tokio::test]
    async fn out_of_range_rating_rejects_whole_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"title": "Odd", "price": 1.0, "description": "", "rating": {"rate": 9.0, "count": 1}}
            ])))
            .mount(&server)
            .await;

        let error = client(&server).fetch_all_products().await.expect_err("malformed");

        assert!(matches!(error, CatalogError::Malformed(_)));
    }

    #[tokio::test]
    async fn record_without_description_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"title": "Mug", "price": 7.5, "description": "Ceramic"},
                {"title": "NoDesc", "price": 1.0}
            ])))
            .mount(&server)
            .await;

        let error = client(&server).fetch_all_products().await.expect_err("malformed");

        let CatalogError::Malformed(message) = error else {
            panic!("expected malformed payload, got {error:?}");
        };
        assert!(message.contains("description"));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let client =
            HttpCatalogClient::new("http://127.0.0.1:9/products", Duration::from_secs(2))
                .expect("client");

        let error = client.fetch_all_products().await.expect_err("unreachable");

        assert!(matches!(error, CatalogError::Transport(_)));
    }
}
