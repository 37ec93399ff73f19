//! One price update cycle: fetch, calculate, compare, submit
//!
//! Cycles are serialized: a cycle holds the orchestrator's lock from fetch to
//! confirmation, so a timer tick and a manual trigger that race can't both
//! observe the same stale record and submit duplicate writes.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::change_decision::should_update;
use super::ledger::{LedgerError, PriceLedger};
use super::price_calculator::{InvalidQuoteError, PriceSet, calculate};
use super::quote_source::{FetchError, QuoteResponse, QuoteSource};
use super::submitter::{LedgerSubmitter, SubmissionError};

/// Reason reported when the price moved less than the threshold
pub const NO_SIGNIFICANT_CHANGE: &str = "no significant price change";

/// Fixed-delay retry policy for quote fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_millis(5_000),
        }
    }
}

/// Outcome of one cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prices: Option<PriceSet>,
}

impl UpdateResult {
    pub fn skipped(reason: &str) -> Self {
        Self {
            updated: false,
            reason: Some(reason.to_string()),
            transaction_hash: None,
            block_number: None,
            gas_used: None,
            prices: None,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CycleError {
    #[error("failed to fetch quote: {0}")]
    Fetch(#[from] FetchError),
    #[error("invalid quote: {0}")]
    InvalidQuote(#[from] InvalidQuoteError),
    #[error("failed to read ledger: {0}")]
    Ledger(#[from] LedgerError),
    #[error("failed to submit update: {0}")]
    Submission(#[from] SubmissionError),
}

pub struct UpdateOrchestrator {
    quote_source: Arc<dyn QuoteSource>,
    ledger: Arc<dyn PriceLedger>,
    submitter: LedgerSubmitter,
    retry_policy: RetryPolicy,
    cycle_lock: Mutex<()>,
}

impl UpdateOrchestrator {
    pub fn new(
        quote_source: Arc<dyn QuoteSource>,
        ledger: Arc<dyn PriceLedger>,
        submitter: LedgerSubmitter,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            quote_source,
            ledger,
            submitter,
            retry_policy,
            cycle_lock: Mutex::new(()),
        }
    }

    /// Runs one update cycle
    ///
    /// This method performs the following steps:
    /// 1. Fetch a quote (with retry) and calculate the price set
    /// 2. Read the current record from the ledger
    /// 3. Skip if the per-gram price moved less than the threshold
    /// 4. Otherwise submit the write and wait for confirmation
    ///
    /// # Returns
    /// * `Ok(UpdateResult)` - Either skipped with a reason, or the confirmed write
    /// * `Err(CycleError)` - The stage that failed
    pub async fn run_cycle(&self) -> Result<UpdateResult, CycleError> {
        let _cycle = self.cycle_lock.lock().await;

        log::info!(
            "Starting price update cycle ({} -> {})",
            self.quote_source.source_name(),
            self.ledger.backend_name()
        );

        let (_, prices) = self.fetch_prices().await?;
        let current = self.ledger.read_record().await?;

        if !should_update(&current, &prices) {
            log::info!(
                "Skipping update: per-gram price {} vs recorded {}",
                prices.per_gram,
                current.prices.per_gram
            );
            return Ok(UpdateResult::skipped(NO_SIGNIFICANT_CHANGE));
        }

        log::info!(
            "Updating ledger: per-gram price {} -> {}",
            current.prices.per_gram,
            prices.per_gram
        );

        let receipt = self.submitter.submit(&prices).await?;

        Ok(UpdateResult {
            updated: true,
            reason: None,
            transaction_hash: Some(receipt.transaction_hash.to_string()),
            block_number: Some(receipt.block_number),
            gas_used: Some(receipt.gas_used),
            prices: Some(prices),
        })
    }

    /// Fetches and calculates prices without touching the ledger
    pub async fn preview(&self) -> Result<(QuoteResponse, PriceSet), CycleError> {
        self.fetch_prices().await
    }

    /// Fetch + calculate with fixed-delay retries on fetch failures
    ///
    /// An invalid (non-positive) quote is not retried.
    async fn fetch_prices(&self) -> Result<(QuoteResponse, PriceSet), CycleError> {
        let attempts = self.retry_policy.max_retries + 1;
        let mut attempt = 1;

        loop {
            match self.quote_source.fetch().await {
                Ok(quote) => {
                    let prices = calculate(&quote.spot_price_per_ounce)?;
                    log::info!(
                        "Fetched spot price {} (attempt {}/{})",
                        quote.spot_price_per_ounce,
                        attempt,
                        attempts
                    );
                    return Ok((quote, prices));
                }
                Err(e) if attempt < attempts => {
                    log::warn!(
                        "Quote fetch failed (attempt {}/{}), retrying in {:?}: {}",
                        attempt,
                        attempts,
                        self.retry_policy.delay,
                        e
                    );
                    tokio::time::sleep(self.retry_policy.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    log::error!("Quote fetch failed after {} attempts: {}", attempts, e);
                    return Err(e.into());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ledger::{InMemoryLedger, LedgerRecord};
    use alloy::primitives::Address;
    use async_trait::async_trait;
    use bigdecimal::BigDecimal;
    use std::collections::VecDeque;
    use std::str::FromStr;
    use std::sync::Mutex as StdMutex;
    use std::time::Instant;

    const OWNER: Address = Address::repeat_byte(0x11);

    /// Quote source that replays a fixed sequence of responses
    struct SequenceQuoteSource {
        responses: StdMutex<VecDeque<Result<&'static str, FetchError>>>,
        calls: StdMutex<u32>,
    }

    impl SequenceQuoteSource {
        fn new(responses: Vec<Result<&'static str, FetchError>>) -> Self {
            Self {
                responses: StdMutex::new(responses.into()),
                calls: StdMutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl QuoteSource for SequenceQuoteSource {
        fn source_name(&self) -> &'static str {
            "sequence"
        }

        async fn fetch(&self) -> Result<QuoteResponse, FetchError> {
            *self.calls.lock().unwrap() += 1;
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(FetchError::Network("no more responses".to_string())));
            next.map(|price| QuoteResponse {
                spot_price_per_ounce: BigDecimal::from_str(price).unwrap(),
            })
        }
    }

    fn network_error(n: u32) -> Result<&'static str, FetchError> {
        Err(FetchError::Network(format!("connection reset #{}", n)))
    }

    fn orchestrator(
        quote_source: Arc<SequenceQuoteSource>,
        ledger: Arc<InMemoryLedger>,
        retry_delay: Duration,
    ) -> UpdateOrchestrator {
        let submitter = LedgerSubmitter::new(ledger.clone(), Duration::from_secs(1))
            .with_poll_interval(Duration::from_millis(5));
        UpdateOrchestrator::new(
            quote_source,
            ledger,
            submitter,
            RetryPolicy {
                max_retries: 3,
                delay: retry_delay,
            },
        )
    }

    fn recorded_ledger(per_gram: u128) -> Arc<InMemoryLedger> {
        let record = LedgerRecord {
            prices: PriceSet {
                per_gram,
                per_ounce: 203_727_925_000,
                per_karat_24: per_gram,
                per_karat_22: per_gram * 22 / 24,
                per_karat_18: per_gram * 18 / 24,
            },
            last_updated_at: chrono::Utc::now().timestamp() as u64 - 600,
            owner: OWNER,
        };
        Arc::new(InMemoryLedger::with_record(record, OWNER))
    }

    #[tokio::test]
    async fn test_retry_succeeds_on_third_attempt_after_waiting() {
        let quotes = Arc::new(SequenceQuoteSource::new(vec![
            network_error(1),
            network_error(2),
            Ok("2037.50"),
        ]));
        let ledger = Arc::new(InMemoryLedger::new(OWNER));
        let delay = Duration::from_millis(30);

        let started = Instant::now();
        let (quote, prices) = orchestrator(quotes.clone(), ledger, delay)
            .preview()
            .await
            .unwrap();

        assert!(started.elapsed() >= delay * 2);
        assert_eq!(quotes.calls(), 3);
        assert_eq!(
            quote.spot_price_per_ounce,
            BigDecimal::from_str("2037.50").unwrap()
        );
        assert_eq!(prices.per_gram, 6_550_709_727);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_returns_last_error() {
        let quotes = Arc::new(SequenceQuoteSource::new(vec![
            network_error(1),
            network_error(2),
            network_error(3),
            network_error(4),
            Ok("2037.50"),
        ]));
        let ledger = Arc::new(InMemoryLedger::new(OWNER));

        let err = orchestrator(quotes.clone(), ledger.clone(), Duration::from_millis(1))
            .run_cycle()
            .await
            .unwrap_err();

        match err {
            CycleError::Fetch(FetchError::Network(msg)) => assert_eq!(msg, "connection reset #4"),
            other => panic!("expected last fetch error, got {:?}", other),
        }
        assert_eq!(quotes.calls(), 4);
        assert_eq!(ledger.transaction_count().await, 0);
    }

    #[tokio::test]
    async fn test_invalid_quote_is_not_retried() {
        let quotes = Arc::new(SequenceQuoteSource::new(vec![Ok("0"), Ok("2037.50")]));
        let ledger = Arc::new(InMemoryLedger::new(OWNER));

        let err = orchestrator(quotes.clone(), ledger, Duration::from_millis(1))
            .run_cycle()
            .await
            .unwrap_err();

        assert!(matches!(err, CycleError::InvalidQuote(_)));
        assert_eq!(quotes.calls(), 1);
    }

    #[tokio::test]
    async fn test_uninitialized_ledger_is_updated() {
        let quotes = Arc::new(SequenceQuoteSource::new(vec![Ok("2037.50")]));
        let ledger = Arc::new(InMemoryLedger::new(OWNER));

        let result = orchestrator(quotes, ledger.clone(), Duration::from_millis(1))
            .run_cycle()
            .await
            .unwrap();

        assert!(result.updated);
        assert!(result.transaction_hash.is_some());
        assert!(result.block_number.is_some());
        assert!(result.gas_used.is_some());
        let prices = result.prices.unwrap();
        assert_eq!(prices.per_gram, 6_550_709_727);

        let record = ledger.read_record().await.unwrap();
        assert_eq!(record.prices, prices);
        assert!(record.last_updated_at > 0);
    }

    #[tokio::test]
    async fn test_small_change_is_skipped() {
        // 2037.279374414 USD/oz -> 6550000400 per gram, 400 units above the record
        let quotes = Arc::new(SequenceQuoteSource::new(vec![Ok("2037.279374414")]));
        let ledger = recorded_ledger(6_550_000_000);

        let result = orchestrator(quotes, ledger.clone(), Duration::from_millis(1))
            .run_cycle()
            .await
            .unwrap();

        assert_eq!(result, UpdateResult::skipped(NO_SIGNIFICANT_CHANGE));
        assert_eq!(ledger.transaction_count().await, 0);
    }

    #[tokio::test]
    async fn test_significant_change_is_written() {
        let quotes = Arc::new(SequenceQuoteSource::new(vec![Ok("2040.42")]));
        let ledger = recorded_ledger(6_550_000_000);

        let result = orchestrator(quotes, ledger.clone(), Duration::from_millis(1))
            .run_cycle()
            .await
            .unwrap();

        assert!(result.updated);
        assert_eq!(
            ledger.read_record().await.unwrap().prices.per_gram,
            6_560_097_738
        );
    }

    #[tokio::test]
    async fn test_submission_failure_fails_cycle() {
        let quotes = Arc::new(SequenceQuoteSource::new(vec![Ok("2037.50")]));
        let stranger = Address::repeat_byte(0x22);
        let ledger = Arc::new(InMemoryLedger::with_record(
            LedgerRecord::uninitialized(OWNER),
            stranger,
        ));

        let err = orchestrator(quotes, ledger, Duration::from_millis(1))
            .run_cycle()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CycleError::Submission(SubmissionError::GasEstimation(LedgerError::Unauthorized { .. }))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_cycles_submit_once() {
        let quotes = Arc::new(SequenceQuoteSource::new(vec![Ok("2037.50"), Ok("2037.50")]));
        let ledger = Arc::new(InMemoryLedger::new(OWNER));
        let orchestrator = Arc::new(orchestrator(quotes, ledger.clone(), Duration::from_millis(1)));

        let (first, second) = tokio::join!(orchestrator.run_cycle(), orchestrator.run_cycle());
        let results = [first.unwrap(), second.unwrap()];

        assert_eq!(results.iter().filter(|r| r.updated).count(), 1);
        assert_eq!(ledger.transaction_count().await, 1);
    }

    #[test]
    fn test_update_result_serialization() {
        let skipped = serde_json::to_value(UpdateResult::skipped(NO_SIGNIFICANT_CHANGE)).unwrap();
        assert_eq!(
            skipped,
            serde_json::json!({ "updated": false, "reason": "no significant price change" })
        );
    }
}
