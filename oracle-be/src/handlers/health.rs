use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use crate::{AppState, error::ApiResponse};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub ledger_backend: &'static str,
    pub signer: String,
    pub timestamp: String,
}

/// Liveness check; does not touch the quote source or the ledger
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthStatus>> {
    ApiResponse::ok_with_message(
        HealthStatus {
            status: "healthy",
            ledger_backend: state.ledger.backend_name(),
            signer: state.ledger.signer_address().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        },
        "Gold price oracle is running",
    )
}
