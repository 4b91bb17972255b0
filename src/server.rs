//! Quote server: axum router and the `/cotacao` handler.
//!
//! The handler runs three stages under one outer budget: fetch the rate from
//! the upstream API, append it to the store (best effort), answer with JSON.
//! Only the fetch stage can fail the request.

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::time::timeout;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::{AppConfig, TimeoutsConfig};
use crate::error::FetchError;
use crate::providers::awesome_api::AwesomeApiProvider;
use crate::rate_provider::RateProvider;
use crate::store::QuoteStore;

/// JSON envelope returned by `/cotacao`; the client decodes the same shape.
#[derive(Debug, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub bid: String,
}

/// Application state shared across request handlers.
#[derive(Clone)]
pub struct AppState {
    provider: Arc<dyn RateProvider>,
    store: QuoteStore,
    timeouts: TimeoutsConfig,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn RateProvider>,
        store: QuoteStore,
        timeouts: TimeoutsConfig,
    ) -> Self {
        AppState {
            provider,
            store,
            timeouts,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/cotacao", get(quote_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs the quote server until the process is terminated.
pub async fn run(config: AppConfig) -> Result<()> {
    let store = QuoteStore::open(&config.server.db_path).await?;
    let provider = Arc::new(AwesomeApiProvider::new(&config.upstream.base_url));
    let state = AppState::new(provider, store, config.timeouts.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Quote server listening on {addr}");

    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// GET /cotacao - fetch the rate, persist it best-effort, answer with JSON.
async fn quote_handler(State(state): State<AppState>) -> Response {
    match timeout(state.timeouts.request(), fetch_and_store(&state)).await {
        Ok(Ok(bid)) => (StatusCode::OK, Json(QuoteResponse { bid })).into_response(),
        Ok(Err(err)) => {
            error!(error = %err, "Failed to obtain quote");
            quote_error()
        }
        Err(_) => {
            error!(budget = ?state.timeouts.request(), "Quote request exceeded its budget");
            quote_error()
        }
    }
}

async fn fetch_and_store(state: &AppState) -> Result<String, FetchError> {
    let bid = state.provider.fetch_rate(state.timeouts.fetch()).await?;

    // Storage failure is not the requester's problem; log it and answer anyway.
    if let Err(err) = state.store.save(&bid, state.timeouts.persist()).await {
        warn!(error = %err, "Failed to persist quote");
    }

    Ok(bid)
}

fn quote_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Erro ao obter cotação").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const UPSTREAM_BODY: &str = r#"{
        "USDBRL": {
            "code": "USD",
            "codein": "BRL",
            "bid": "5.1269",
            "ask": "5.1279"
        }
    }"#;

    async fn mock_upstream(template: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/json/last/USD-BRL"))
            .respond_with(template)
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn test_timeouts() -> TimeoutsConfig {
        TimeoutsConfig {
            request_ms: 1000,
            fetch_ms: 500,
            persist_ms: 300,
            client_ms: 2000,
        }
    }

    async fn spawn_server(state: AppState) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_quote_is_returned_and_stored() {
        let upstream =
            mock_upstream(ResponseTemplate::new(200).set_body_string(UPSTREAM_BODY)).await;
        let store = QuoteStore::open_in_memory().await.unwrap();
        let state = AppState::new(
            Arc::new(AwesomeApiProvider::new(&upstream.uri())),
            store.clone(),
            test_timeouts(),
        );
        let base = spawn_server(state).await;

        let response = reqwest::get(format!("{base}/cotacao")).await.unwrap();
        assert_eq!(response.status().as_u16(), 200);
        assert_eq!(
            response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .unwrap(),
            "application/json"
        );

        let quote: QuoteResponse = response.json().await.unwrap();
        assert_eq!(quote.bid, "5.1269");

        // Exactly one row, matching the response.
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.latest().await.unwrap().unwrap().bid, "5.1269");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_a_500_and_stores_nothing() {
        let upstream = mock_upstream(ResponseTemplate::new(500)).await;
        let store = QuoteStore::open_in_memory().await.unwrap();
        let state = AppState::new(
            Arc::new(AwesomeApiProvider::new(&upstream.uri())),
            store.clone(),
            test_timeouts(),
        );
        let base = spawn_server(state).await;

        let response = reqwest::get(format!("{base}/cotacao")).await.unwrap();
        assert_eq!(response.status().as_u16(), 500);
        assert_eq!(response.text().await.unwrap(), "Erro ao obter cotação");

        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_upstream_body_is_a_500_and_stores_nothing() {
        let upstream =
            mock_upstream(ResponseTemplate::new(200).set_body_string("not json")).await;
        let store = QuoteStore::open_in_memory().await.unwrap();
        let state = AppState::new(
            Arc::new(AwesomeApiProvider::new(&upstream.uri())),
            store.clone(),
            test_timeouts(),
        );
        let base = spawn_server(state).await;

        let response = reqwest::get(format!("{base}/cotacao")).await.unwrap();
        assert_eq!(response.status().as_u16(), 500);
        assert_eq!(response.text().await.unwrap(), "Erro ao obter cotação");

        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_slow_upstream_is_a_500_and_stores_nothing() {
        let template = ResponseTemplate::new(200)
            .set_body_string(UPSTREAM_BODY)
            .set_delay(Duration::from_millis(500));
        let upstream = mock_upstream(template).await;

        let store = QuoteStore::open_in_memory().await.unwrap();
        let mut timeouts = test_timeouts();
        timeouts.fetch_ms = 50;
        let state = AppState::new(
            Arc::new(AwesomeApiProvider::new(&upstream.uri())),
            store.clone(),
            timeouts,
        );
        let base = spawn_server(state).await;

        let response = reqwest::get(format!("{base}/cotacao")).await.unwrap();
        assert_eq!(response.status().as_u16(), 500);

        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_outer_budget_bounds_a_slow_fetch() {
        let template = ResponseTemplate::new(200)
            .set_body_string(UPSTREAM_BODY)
            .set_delay(Duration::from_millis(500));
        let upstream = mock_upstream(template).await;

        let store = QuoteStore::open_in_memory().await.unwrap();
        // Fetch budget alone would let the upstream answer; the outer budget
        // is tighter and wins.
        let mut timeouts = test_timeouts();
        timeouts.request_ms = 50;
        timeouts.fetch_ms = 5000;
        let state = AppState::new(
            Arc::new(AwesomeApiProvider::new(&upstream.uri())),
            store.clone(),
            timeouts,
        );
        let base = spawn_server(state).await;

        let response = reqwest::get(format!("{base}/cotacao")).await.unwrap();
        assert_eq!(response.status().as_u16(), 500);
        assert_eq!(response.text().await.unwrap(), "Erro ao obter cotação");
    }

    #[tokio::test]
    async fn test_persist_failure_still_returns_the_quote() {
        let upstream =
            mock_upstream(ResponseTemplate::new(200).set_body_string(UPSTREAM_BODY)).await;
        let store = QuoteStore::open_in_memory().await.unwrap();
        store.close().await; // every save from now on fails

        let state = AppState::new(
            Arc::new(AwesomeApiProvider::new(&upstream.uri())),
            store,
            test_timeouts(),
        );
        let base = spawn_server(state).await;

        let response = reqwest::get(format!("{base}/cotacao")).await.unwrap();
        assert_eq!(response.status().as_u16(), 200);

        let quote: QuoteResponse = response.json().await.unwrap();
        assert_eq!(quote.bid, "5.1269");
    }
}
