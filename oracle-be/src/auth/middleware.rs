use crate::AppState;
use crate::auth::AuthError;
use axum::{extract::FromRequestParts, http::request::Parts};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Header carrying the shared secret for protected routes
pub const API_KEY_HEADER: &str = "x-api-key";

/// Proof that the request carried the configured shared secret
#[derive(Debug, Clone, Copy)]
pub struct ApiKey;

impl FromRequestParts<Arc<AppState>> for ApiKey {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::MissingApiKey)?;

        // Digests, not raw values: timing must not reveal a matching prefix
        if Sha256::digest(provided.as_bytes()) != Sha256::digest(state.env_vars.api_secret.as_bytes())
        {
            log::warn!("Rejected request with invalid API key");
            return Err(AuthError::InvalidApiKey);
        }

        Ok(ApiKey)
    }
}
