use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use shopbot_core::{
    ApplicationError, FilterConfig, FilterError, InterfaceError, NotifyError, PriceRange, Product,
    RatingSelection,
};
use shopbot_db::Database;
use shopbot_slack::{
    parse_events_request, EnqueueError, EnvelopeSender, EventsApiRequest, OutgoingMessage,
    SlackWebClient,
};

use crate::{gateway::ProductGateway, health};

const SLACK_RETRY_HEADER: &str = "x-slack-retry-num";

#[derive(Clone)]
pub struct AppState {
    pub gateway: ProductGateway,
    pub slack: SlackWebClient,
    pub ingress: EnvelopeSender,
}

pub fn router(state: AppState, database: Arc<Database>) -> Router {
    Router::new()
        .route("/products", get(products))
        .route("/rated_products", get(rated_products))
        .route("/send_message", get(send_message))
        .route("/slack_users", get(slack_users))
        .route("/slack_channels", get(slack_channels))
        .route("/slack/events", post(slack_events))
        .with_state(state)
        .merge(health::router(database))
}

/// JSON `{"detail": ...}` error body with the status the failure maps to.
pub struct ApiError {
    status: StatusCode,
    detail: Value,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, detail: Value::String(detail.into()) }
    }
}

impl From<InterfaceError> for ApiError {
    fn from(error: InterfaceError) -> Self {
        let status =
            StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self { status, detail: Value::String(error.detail().to_owned()) }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

fn interface_error(error: ApplicationError, correlation_id: &str, route: &str) -> ApiError {
    let mapped = error.into_interface(correlation_id);
    warn!(
        event_name = "gateway.products.failed",
        correlation_id,
        route,
        status = mapped.status_code(),
        error = %mapped,
        "product request failed"
    );
    ApiError::from(mapped)
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductsParams {
    #[serde(default, alias = "priceRange")]
    pub price_range: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RatedProductsParams {
    #[serde(default, alias = "priceRange")]
    pub price_range: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default, alias = "ratingCount", alias = "ratingNumber")]
    pub rating_count: Option<usize>,
    #[serde(default, alias = "sortDescending")]
    pub sort_descending: Option<bool>,
}

fn base_config(
    price_range: Option<&str>,
    limit: Option<usize>,
) -> Result<FilterConfig, FilterError> {
    let mut config = FilterConfig::new();
    if let Some(raw) = price_range.map(str::trim).filter(|raw| !raw.is_empty()) {
        config = config.price_range(raw.parse::<PriceRange>()?);
    }
    if let Some(limit) = limit {
        config = config.limit(limit);
    }
    Ok(config)
}

impl ProductsParams {
    pub fn filter_config(&self) -> Result<FilterConfig, FilterError> {
        base_config(self.price_range.as_deref(), self.limit)
    }
}

impl RatedProductsParams {
    pub fn filter_config(&self) -> Result<FilterConfig, FilterError> {
        let selection = RatingSelection::new(
            self.rating_count.unwrap_or(1),
            self.sort_descending.unwrap_or(false),
        )?;
        Ok(base_config(self.price_range.as_deref(), self.limit)?.rated(selection))
    }
}

async fn run_products(
    state: &AppState,
    config: Result<FilterConfig, FilterError>,
    route: &str,
) -> Result<Json<Vec<Product>>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    info!(event_name = "gateway.products.request", correlation_id, route, "product request");

    let config = config.map_err(|error| interface_error(error.into(), &correlation_id, route))?;
    let products = state
        .gateway
        .run(&config, &correlation_id)
        .await
        .map_err(|error| interface_error(error, &correlation_id, route))?;
    Ok(Json(products))
}

pub async fn products(
    State(state): State<AppState>,
    params: Result<Query<ProductsParams>, QueryRejection>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let Query(params) = params.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let Json(products) = run_products(&state, params.filter_config(), "/products").await?;
    // The plain listing carries name, price and description only.
    Ok(Json(products.into_iter().map(|product| Product { rating: None, ..product }).collect()))
}

pub async fn rated_products(
    State(state): State<AppState>,
    params: Result<Query<RatedProductsParams>, QueryRejection>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let Query(params) = params.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    run_products(&state, params.filter_config(), "/rated_products").await
}

#[derive(Debug, Deserialize)]
pub struct SendMessageParams {
    pub channel_id: String,
    pub text: String,
}

pub async fn send_message(
    State(state): State<AppState>,
    params: Result<Query<SendMessageParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let message = OutgoingMessage::text(&params.channel_id, &params.text);

    match state.slack.post(&message).await {
        Ok(()) => Ok(Json(json!({ "ok": true, "message": "Message has been sent" }))),
        Err(NotifyError::Rejected(code)) => {
            warn!(
                event_name = "egress.slack.send_rejected",
                channel_id = %params.channel_id,
                error = %code,
                "slack rejected message"
            );
            Err(ApiError { status: StatusCode::BAD_REQUEST, detail: json!({ "error": code }) })
        }
        Err(error @ NotifyError::Unreachable(_)) => Err(ApiError {
            status: StatusCode::BAD_GATEWAY,
            detail: json!({ "error": error.to_string() }),
        }),
    }
}

fn slack_listing_failed(event_name: &'static str, error: NotifyError) -> ApiError {
    warn!(event_name = event_name, error = %error, "slack listing failed");
    ApiError { status: StatusCode::BAD_GATEWAY, detail: Value::String(error.to_string()) }
}

pub async fn slack_users(State(state): State<AppState>) -> Result<Response, ApiError> {
    let users = state
        .slack
        .list_users()
        .await
        .map_err(|error| slack_listing_failed("egress.slack.users_failed", error))?;
    Ok(Json(users).into_response())
}

pub async fn slack_channels(State(state): State<AppState>) -> Result<Response, ApiError> {
    let channels = state
        .slack
        .list_channels()
        .await
        .map_err(|error| slack_listing_failed("egress.slack.channels_failed", error))?;
    Ok(Json(channels).into_response())
}

/// Acknowledges within Slack's window; the listener answers from the queue.
pub async fn slack_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request =
        parse_events_request(&body).map_err(|error| ApiError::bad_request(error.to_string()))?;

    match request {
        EventsApiRequest::UrlVerification { challenge } => {
            Ok(Json(json!({ "challenge": challenge })).into_response())
        }
        EventsApiRequest::Event(envelope) => {
            if let Some(retry) = headers.get(SLACK_RETRY_HEADER) {
                info!(
                    event_name = "ingress.slack.retry_skipped",
                    envelope_id = %envelope.envelope_id,
                    retry = ?retry,
                    "ignoring slack redelivery"
                );
                return Ok(StatusCode::OK.into_response());
            }

            let envelope_id = envelope.envelope_id.clone();
            match state.ingress.try_push(envelope) {
                Ok(()) => Ok(StatusCode::OK.into_response()),
                Err(EnqueueError::Full) => {
                    warn!(
                        event_name = "ingress.slack.event_dropped",
                        envelope_id = %envelope_id,
                        "chat listener queue is full"
                    );
                    Ok(StatusCode::OK.into_response())
                }
                Err(error @ EnqueueError::Closed) => {
                    warn!(
                        event_name = "ingress.slack.enqueue_failed",
                        envelope_id = %envelope_id,
                        error = %error,
                        "chat listener is not accepting events"
                    );
                    Err(ApiError {
                        status: StatusCode::SERVICE_UNAVAILABLE,
                        detail: Value::String(error.to_string()),
                    })
                }
            }
        }
        EventsApiRequest::Ignored => Ok(StatusCode::OK.into_response()),
    }
}
