//! JSON envelope and API errors
//!
//! Every response body is `{success, data?, error?, message?}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::services::ledger::LedgerError;
use crate::services::orchestrator::CycleError;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        })
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
            message: Some(message.into()),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Price update failed: {0}")]
    Cycle(#[from] CycleError),
    #[error("Gold price lookup failed: {0}")]
    Quote(CycleError),
    #[error("Failed to read ledger: {0}")]
    Ledger(#[from] LedgerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log::error!("{}", self);

        let message = match &self {
            ApiError::Cycle(_) => "Failed to update prices",
            ApiError::Quote(_) => "Failed to fetch gold price",
            ApiError::Ledger(_) => "Failed to read prices from ledger",
        };

        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.to_string()),
            message: Some(message.to_string()),
        };

        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
