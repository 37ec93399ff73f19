//! GoldAPI client for fetching the XAU/USD spot price
//!
//! This module provides a client for the goldapi.io REST API. One call
//! returns the latest spot quote for a troy ounce of gold in USD.

use async_trait::async_trait;
use reqwest::Client;

use super::quote_source::{FetchError, QuoteResponse, QuoteSource};

/// Default GoldAPI base URL
pub const DEFAULT_GOLDAPI_BASE: &str = "https://www.goldapi.io/api";

/// Metal symbol quoted by the feed
const METAL_SYMBOL: &str = "XAU";

/// Quote currency
const QUOTE_CURRENCY: &str = "USD";

/// GoldAPI client
pub struct GoldApiClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl GoldApiClient {
    /// Creates a new GoldAPI client with the default base URL
    ///
    /// # Arguments
    /// * `http_client` - Shared HTTP client for making requests
    /// * `api_key` - GoldAPI access token
    pub fn new(http_client: Client, api_key: String) -> Self {
        Self::with_base_url(http_client, api_key, DEFAULT_GOLDAPI_BASE.to_string())
    }

    /// Creates a new GoldAPI client with a custom base URL
    ///
    /// This is useful for testing with a mock server.
    pub fn with_base_url(http_client: Client, api_key: String, base_url: String) -> Self {
        Self {
            http_client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn quote_url(&self) -> String {
        format!("{}/{}/{}", self.base_url, METAL_SYMBOL, QUOTE_CURRENCY)
    }
}

#[async_trait]
impl QuoteSource for GoldApiClient {
    fn source_name(&self) -> &'static str {
        "goldapi"
    }

    async fn fetch(&self) -> Result<QuoteResponse, FetchError> {
        let url = self.quote_url();

        log::debug!("Fetching {}/{} quote from GoldAPI", METAL_SYMBOL, QUOTE_CURRENCY);

        let response = self
            .http_client
            .get(&url)
            .header("x-access-token", &self.api_key)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            log::warn!("GoldAPI error: {} - {}", status, error_text);
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FetchError::MalformedBody(e.to_string()))?;

        let quote = QuoteResponse::from_price_field(body.get("price"))?;

        log::debug!(
            "GoldAPI: {}/{} = {}",
            METAL_SYMBOL,
            QUOTE_CURRENCY,
            quote.spot_price_per_ounce
        );

        Ok(quote)
    }
}
