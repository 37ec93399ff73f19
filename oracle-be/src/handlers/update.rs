use axum::{Json, extract::State};
use std::sync::Arc;

use crate::{
    AppState,
    auth::ApiKey,
    error::{ApiError, ApiResponse},
    services::UpdateResult,
};

/// Runs one update cycle on demand
///
/// Requires the `x-api-key` header. Shares the cycle lock with the background
/// service, so a manual trigger waits for a cycle already in flight.
pub async fn update_prices(
    _: ApiKey,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<UpdateResult>>, ApiError> {
    log::info!("Manual price update requested");

    let result = state.orchestrator.run_cycle().await?;
    let message = if result.updated {
        "Prices updated"
    } else {
        "No update needed"
    };

    Ok(ApiResponse::ok_with_message(result, message))
}
