use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use oracle_be::{AppState, routes, utils::env::EnvVars};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_SECRET: &str = "integration-secret";
pub const GOLDAPI_KEY: &str = "integration-goldapi-key";

/// Mock GoldAPI answering every XAU/USD request with `price`
pub async fn start_gold_feed(price: f64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/XAU/USD"))
        .and(header("x-access-token", GOLDAPI_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "metal": "XAU",
            "currency": "USD",
            "price": price
        })))
        .mount(&server)
        .await;
    server
}

/// Memory-ledger configuration pointed at `feed`, with fast retries and no timer
pub fn test_env(feed: &MockServer) -> EnvVars {
    let vars: HashMap<&str, String> = HashMap::from([
        ("GOLDAPI_KEY", GOLDAPI_KEY.to_string()),
        ("GOLDAPI_BASE_URL", format!("{}/api", feed.uri())),
        ("LEDGER_BACKEND", "memory".to_string()),
        ("API_SECRET", API_SECRET.to_string()),
        ("UPDATE_INTERVAL_MINUTES", "0".to_string()),
        ("MAX_RETRIES", "1".to_string()),
        ("RETRY_DELAY_MS", "10".to_string()),
    ]);
    EnvVars::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

pub fn create_app(feed: &MockServer) -> Router {
    let state = AppState::new(test_env(feed)).unwrap();
    routes::create_routes(Arc::new(state))
}

/// Sends `request` through the router and decodes the JSON body
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_update(api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/update-prices");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::empty()).unwrap()
}
