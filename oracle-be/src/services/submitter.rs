//! Fee-aware submission of price writes
//!
//! A submission is: estimate gas, pick EIP-1559 fee parameters (falling back
//! to fixed floors when the network can't tell us), broadcast, then poll for
//! the receipt until it is mined or the confirmation window closes. Nothing
//! here retries; a failed submission fails the cycle.

use alloy::primitives::TxHash;
use std::sync::Arc;
use std::time::Duration;

use super::ledger::{FeeEstimate, LedgerError, PriceLedger, Receipt, TxParams};
use super::price_calculator::PriceSet;

/// Priority fee used when the network does not report one (2 gwei)
pub const DEFAULT_MAX_PRIORITY_FEE_PER_GAS: u128 = 2_000_000_000;

/// Max fee used when the network does not report one (50 gwei)
pub const DEFAULT_MAX_FEE_PER_GAS: u128 = 50_000_000_000;

/// Headroom added on top of the gas estimate
const GAS_LIMIT_BUFFER_PERCENT: u64 = 20;

/// Default time to wait for a receipt
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Interval between receipt lookups
pub const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, thiserror::Error)]
pub enum SubmissionError {
    #[error("gas estimation failed: {0}")]
    GasEstimation(LedgerError),
    #[error("failed to send transaction: {0}")]
    Send(LedgerError),
    #[error("failed to fetch receipt for {tx_hash}: {source}")]
    Confirmation {
        tx_hash: TxHash,
        source: LedgerError,
    },
    #[error("transaction {tx_hash} reverted in block {block_number}")]
    Reverted { tx_hash: TxHash, block_number: u64 },
    #[error("transaction {tx_hash} not confirmed within {timeout:?}")]
    ConfirmationTimeout { tx_hash: TxHash, timeout: Duration },
}

pub struct LedgerSubmitter {
    ledger: Arc<dyn PriceLedger>,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl LedgerSubmitter {
    pub fn new(ledger: Arc<dyn PriceLedger>, confirmation_timeout: Duration) -> Self {
        Self {
            ledger,
            confirmation_timeout,
            poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
        }
    }

    /// Overrides how often the receipt is polled
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Writes `prices` to the ledger and waits for one confirmation
    ///
    /// # Returns
    /// * `Ok(receipt)` - The mined, successful transaction
    /// * `Err(SubmissionError)` - Estimation, broadcast, revert or timeout
    pub async fn submit(&self, prices: &PriceSet) -> Result<Receipt, SubmissionError> {
        let gas_estimate = self
            .ledger
            .estimate_update_gas(prices)
            .await
            .map_err(SubmissionError::GasEstimation)?;

        let params = self.tx_params(gas_estimate).await;

        log::info!(
            "Submitting price update: gas limit {} (estimate {}), max fee {} wei, priority fee {} wei",
            params.gas_limit,
            gas_estimate,
            params.max_fee_per_gas,
            params.max_priority_fee_per_gas
        );

        let tx_hash = self
            .ledger
            .send_update(prices, &params)
            .await
            .map_err(SubmissionError::Send)?;

        log::info!("Price update sent: {}", tx_hash);

        let receipt = self.wait_for_receipt(tx_hash).await?;
        if !receipt.success {
            return Err(SubmissionError::Reverted {
                tx_hash,
                block_number: receipt.block_number,
            });
        }

        log::info!(
            "Price update {} confirmed in block {} (gas used {})",
            tx_hash,
            receipt.block_number,
            receipt.gas_used
        );

        Ok(receipt)
    }

    async fn tx_params(&self, gas_estimate: u64) -> TxParams {
        let fees = match self.ledger.fee_estimate().await {
            Ok(fees) => fees,
            Err(e) => {
                log::warn!("Fee estimate unavailable, using default fees: {}", e);
                FeeEstimate::default()
            }
        };

        let gas_limit = gas_estimate.saturating_add(gas_estimate * GAS_LIMIT_BUFFER_PERCENT / 100);
        let (max_fee_per_gas, max_priority_fee_per_gas) = select_fees(fees);

        TxParams {
            gas_limit,
            max_fee_per_gas,
            max_priority_fee_per_gas,
        }
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Receipt, SubmissionError> {
        let poll = async {
            loop {
                match self.ledger.transaction_receipt(&tx_hash).await {
                    Ok(Some(receipt)) => return Ok(receipt),
                    Ok(None) => {
                        log::debug!("Transaction {} still pending", tx_hash);
                    }
                    Err(source) => {
                        return Err(SubmissionError::Confirmation { tx_hash, source });
                    }
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        tokio::time::timeout(self.confirmation_timeout, poll)
            .await
            .map_err(|_| SubmissionError::ConfirmationTimeout {
                tx_hash,
                timeout: self.confirmation_timeout,
            })?
    }
}

/// Picks (max fee, priority fee), filling gaps with the default floors
///
/// The max fee is never below the priority fee, which nodes would reject.
fn select_fees(fees: FeeEstimate) -> (u128, u128) {
    let priority = fees
        .max_priority_fee_per_gas
        .unwrap_or(DEFAULT_MAX_PRIORITY_FEE_PER_GAS);
    let max_fee = fees.max_fee_per_gas.unwrap_or(DEFAULT_MAX_FEE_PER_GAS);
    (max_fee.max(priority), priority)
}
