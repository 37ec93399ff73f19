//! Quote source trait for fetching the current spot price
//!
//! This module defines the interface for spot price feeds.
//! Implementations fetch a single XAU/USD quote per call and never retry
//! internally; retrying is the orchestrator's responsibility.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::str::FromStr;

/// A validated spot quote as returned by a quote source
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteResponse {
    /// Spot price of one troy ounce in USD
    pub spot_price_per_ounce: BigDecimal,
}

impl QuoteResponse {
    /// Builds a quote from the `price` field of an upstream JSON body
    ///
    /// serde_json holds the number as an `f64`; its shortest decimal form is
    /// what becomes the `BigDecimal`. Quotes with up to 15 significant digits
    /// come through unchanged, longer ones are rounded to `f64` precision.
    ///
    /// # Returns
    /// * `Ok(quote)` - If the field is present and holds a finite number
    /// * `Err(FetchError::MalformedBody)` - Otherwise
    pub fn from_price_field(price: Option<&serde_json::Value>) -> Result<Self, FetchError> {
        let number = match price {
            Some(serde_json::Value::Number(n)) => n,
            Some(other) => {
                return Err(FetchError::MalformedBody(format!(
                    "price field is not a number: {}",
                    other
                )));
            }
            None => {
                return Err(FetchError::MalformedBody(
                    "price field is missing".to_string(),
                ));
            }
        };

        if number.as_f64().is_none_or(|p| !p.is_finite()) {
            return Err(FetchError::MalformedBody(format!(
                "price is not a finite number: {}",
                number
            )));
        }

        let spot_price_per_ounce = BigDecimal::from_str(&number.to_string()).map_err(|e| {
            FetchError::MalformedBody(format!("price {} is not a decimal: {}", number, e))
        })?;

        Ok(Self {
            spot_price_per_ounce,
        })
    }
}

/// Failure to obtain a usable quote from the upstream feed
///
/// Every variant is treated as transient by the orchestrator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("quote source unreachable: {0}")]
    Network(String),
    #[error("quote source returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed quote response: {0}")]
    MalformedBody(String),
}

/// Trait for spot price feeds
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Returns the name of the quote source (e.g., "goldapi")
    fn source_name(&self) -> &'static str;

    /// Fetches the current spot price per troy ounce
    async fn fetch(&self) -> Result<QuoteResponse, FetchError>;
}
