use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    AppState,
    error::{ApiError, ApiResponse},
    services::price_calculator::{PriceSet, format_fixed},
    utils::cache::CacheKey,
};

/// Human-readable prices (USD, 8 decimals)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedPrices {
    pub price_per_gram: String,
    pub price_per_ounce: String,
    pub price_24k: String,
    pub price_22k: String,
    pub price_18k: String,
}

impl From<&PriceSet> for FormattedPrices {
    fn from(prices: &PriceSet) -> Self {
        Self {
            price_per_gram: format_fixed(prices.per_gram),
            price_per_ounce: format_fixed(prices.per_ounce),
            price_24k: format_fixed(prices.per_karat_24),
            price_22k: format_fixed(prices.per_karat_22),
            price_18k: format_fixed(prices.per_karat_18),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerPrices {
    #[serde(flatten)]
    pub prices: FormattedPrices,
    /// Fixed-point values as stored on-chain
    pub raw: PriceSet,
    pub last_updated: u64,
    pub last_updated_iso: Option<String>,
    pub is_stale: bool,
    pub owner: String,
}

/// Current on-chain prices
pub async fn get_prices(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<LedgerPrices>>, ApiError> {
    let record = state.ledger.read_record().await?;
    let is_stale = state.ledger.is_stale().await?;

    let last_updated_iso = (record.last_updated_at > 0)
        .then(|| DateTime::<Utc>::from_timestamp(record.last_updated_at as i64, 0))
        .flatten()
        .map(|dt| dt.to_rfc3339());

    Ok(ApiResponse::ok(LedgerPrices {
        prices: FormattedPrices::from(&record.prices),
        raw: record.prices,
        last_updated: record.last_updated_at,
        last_updated_iso,
        is_stale,
        owner: record.owner.to_string(),
    }))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoldPriceQuote {
    pub spot_price_per_ounce: String,
    #[serde(flatten)]
    pub prices: FormattedPrices,
    pub raw: PriceSet,
    pub source: String,
    pub fetched_at: String,
}

/// Live quote from the feed with derived prices; never touches the ledger
pub async fn get_gold_price(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<GoldPriceQuote>>, ApiError> {
    let source = state.quote_source.source_name();
    let cache_key = CacheKey::new("gold-price").with(source).build();

    let quote = state
        .cache
        .cached(cache_key, async {
            let (quote, prices) = state.orchestrator.preview().await.map_err(ApiError::Quote)?;
            Ok::<_, ApiError>(GoldPriceQuote {
                spot_price_per_ounce: quote.spot_price_per_ounce.to_string(),
                prices: FormattedPrices::from(&prices),
                raw: prices,
                source: source.to_string(),
                fetched_at: Utc::now().to_rfc3339(),
            })
        })
        .await?;

    Ok(ApiResponse::ok(quote))
}
