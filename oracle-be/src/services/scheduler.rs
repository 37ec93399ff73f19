//! Background price update service
//!
//! Runs one update cycle on every tick of a fixed interval. A failed cycle is
//! logged and the service waits for the next tick; it never stops the loop.

use std::sync::Arc;
use std::time::Duration;

use super::orchestrator::UpdateOrchestrator;

/// Delay before the first cycle so the HTTP server is up first
const STARTUP_DELAY: Duration = Duration::from_secs(5);

/// Run the background price update service
///
/// This function runs in a loop and never returns. The first cycle runs
/// shortly after startup, then once per `interval`.
pub async fn run_price_update_service(orchestrator: Arc<UpdateOrchestrator>, interval: Duration) {
    log::info!(
        "Starting background price update service (interval: {} minutes)",
        interval.as_secs() / 60
    );

    tokio::time::sleep(STARTUP_DELAY).await;

    let mut ticker = tokio::time::interval(interval);
    // A cycle that overruns (slow confirmation) shouldn't cause a burst of catch-up cycles
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        run_scheduled_cycle(&orchestrator).await;
    }
}

/// Runs one cycle and logs its outcome; errors never propagate
pub async fn run_scheduled_cycle(orchestrator: &UpdateOrchestrator) {
    match orchestrator.run_cycle().await {
        Ok(result) if result.updated => {
            log::info!(
                "Scheduled update written: tx {} in block {}",
                result.transaction_hash.as_deref().unwrap_or("-"),
                result.block_number.unwrap_or_default()
            );
        }
        Ok(result) => {
            log::info!(
                "Scheduled update skipped: {}",
                result.reason.as_deref().unwrap_or("-")
            );
        }
        Err(e) => {
            log::error!("Scheduled price update failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ledger::{InMemoryLedger, LedgerRecord, PriceLedger};
    use crate::services::orchestrator::RetryPolicy;
    use crate::services::quote_source::{FetchError, QuoteResponse, QuoteSource};
    use crate::services::submitter::LedgerSubmitter;
    use alloy::primitives::Address;
    use async_trait::async_trait;

    struct DownQuoteSource;

    #[async_trait]
    impl QuoteSource for DownQuoteSource {
        fn source_name(&self) -> &'static str {
            "down"
        }

        async fn fetch(&self) -> Result<QuoteResponse, FetchError> {
            Err(FetchError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_failed_cycle_is_swallowed() {
        let owner = Address::repeat_byte(0x11);
        let ledger = Arc::new(InMemoryLedger::new(owner));
        let orchestrator = UpdateOrchestrator::new(
            Arc::new(DownQuoteSource),
            ledger.clone(),
            LedgerSubmitter::new(ledger.clone(), Duration::from_secs(1)),
            RetryPolicy {
                max_retries: 1,
                delay: Duration::from_millis(1),
            },
        );

        run_scheduled_cycle(&orchestrator).await;

        assert_eq!(
            ledger.read_record().await.unwrap(),
            LedgerRecord::uninitialized(owner)
        );
    }
}
