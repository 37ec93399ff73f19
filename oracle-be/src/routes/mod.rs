use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::{AppState, handlers};

pub fn create_routes(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health::health_check))
        // On-chain prices
        .route("/prices", get(handlers::prices::get_prices))
        // Live quote from the feed (cached)
        .route("/api/gold-price", get(handlers::prices::get_gold_price))
        // Manual update trigger (API key required)
        .route("/update-prices", post(handlers::update::update_prices))
        .with_state(state)
}
