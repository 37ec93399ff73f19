//! In-process price record with the contract's rules
//!
//! Writes are accepted only from the owner and only with positive values,
//! gas estimation fails for writes that would revert, and every accepted
//! write is mined immediately in its own block.

use alloy::primitives::{Address, TxHash, keccak256};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use tokio::sync::RwLock;

use super::{FeeEstimate, LedgerError, LedgerRecord, PriceLedger, Receipt, TxParams};
use crate::services::change_decision::is_stale;
use crate::services::price_calculator::PriceSet;

/// Gas charged for one `updatePrices` write
pub const UPDATE_GAS: u64 = 61_000;

/// Gas charged for one `transferOwnership` call
const TRANSFER_GAS: u64 = 28_000;

/// Receipts kept for lookup; older ones are dropped
pub const RECEIPT_HISTORY: usize = 256;

struct LedgerState {
    record: LedgerRecord,
    block_number: u64,
    nonce: u64,
    receipts: VecDeque<Receipt>,
}

pub struct InMemoryLedger {
    caller: Address,
    fee_estimate: FeeEstimate,
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    /// Fresh, uninitialized record owned by `owner`, written by `owner`
    pub fn new(owner: Address) -> Self {
        Self::with_record(LedgerRecord::uninitialized(owner), owner)
    }

    /// Starts from an existing record, sending writes as `caller`
    pub fn with_record(record: LedgerRecord, caller: Address) -> Self {
        Self {
            caller,
            fee_estimate: FeeEstimate {
                max_fee_per_gas: Some(30_000_000_000),
                max_priority_fee_per_gas: Some(1_500_000_000),
            },
            state: RwLock::new(LedgerState {
                record,
                block_number: 1,
                nonce: 0,
                receipts: VecDeque::new(),
            }),
        }
    }

    /// Overrides the fee levels reported by [`PriceLedger::fee_estimate`]
    pub fn with_fee_estimate(mut self, fee_estimate: FeeEstimate) -> Self {
        self.fee_estimate = fee_estimate;
        self
    }

    /// Number of transactions mined so far
    pub async fn transaction_count(&self) -> u64 {
        self.state.read().await.nonce
    }

    fn check_write(&self, record: &LedgerRecord, prices: &PriceSet) -> Result<(), LedgerError> {
        self.check_owner(record)?;
        if prices.has_zero_value() {
            return Err(LedgerError::NonPositiveValue);
        }
        Ok(())
    }

    fn check_owner(&self, record: &LedgerRecord) -> Result<(), LedgerError> {
        if self.caller != record.owner {
            return Err(LedgerError::Unauthorized {
                caller: self.caller,
                owner: record.owner,
            });
        }
        Ok(())
    }
}

impl LedgerState {
    fn mine(&mut self, gas_used: u64) -> TxHash {
        self.nonce += 1;
        self.block_number += 1;
        let tx_hash = keccak256(self.nonce.to_be_bytes());
        if self.receipts.len() == RECEIPT_HISTORY {
            self.receipts.pop_front();
        }
        self.receipts.push_back(Receipt {
            transaction_hash: tx_hash,
            block_number: self.block_number,
            gas_used,
            success: true,
        });
        tx_hash
    }
}

#[async_trait]
impl PriceLedger for InMemoryLedger {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn signer_address(&self) -> Address {
        self.caller
    }

    async fn read_record(&self) -> Result<LedgerRecord, LedgerError> {
        Ok(self.state.read().await.record.clone())
    }

    async fn is_stale(&self) -> Result<bool, LedgerError> {
        let last_updated_at = self.state.read().await.record.last_updated_at;
        Ok(is_stale(last_updated_at, Utc::now().timestamp()))
    }

    async fn estimate_update_gas(&self, prices: &PriceSet) -> Result<u64, LedgerError> {
        let state = self.state.read().await;
        self.check_write(&state.record, prices)?;
        Ok(UPDATE_GAS)
    }

    async fn fee_estimate(&self) -> Result<FeeEstimate, LedgerError> {
        Ok(self.fee_estimate)
    }

    async fn send_update(
        &self,
        prices: &PriceSet,
        params: &TxParams,
    ) -> Result<TxHash, LedgerError> {
        let mut state = self.state.write().await;
        self.check_write(&state.record, prices)?;
        if params.gas_limit < UPDATE_GAS {
            return Err(LedgerError::Rpc(format!(
                "gas limit {} below required {}",
                params.gas_limit, UPDATE_GAS
            )));
        }

        state.record.prices = *prices;
        state.record.last_updated_at = Utc::now().timestamp().max(1) as u64;
        Ok(state.mine(UPDATE_GAS))
    }

    async fn transaction_receipt(&self, tx_hash: &TxHash) -> Result<Option<Receipt>, LedgerError> {
        let state = self.state.read().await;
        Ok(state
            .receipts
            .iter()
            .rev()
            .find(|r| r.transaction_hash == *tx_hash)
            .copied())
    }

    async fn transfer_authority(&self, new_owner: Address) -> Result<TxHash, LedgerError> {
        let mut state = self.state.write().await;
        self.check_owner(&state.record)?;
        if new_owner == Address::ZERO {
            return Err(LedgerError::Rpc("new owner is the zero address".to_string()));
        }

        log::info!(
            "Transferring ledger authority from {} to {}",
            state.record.owner,
            new_owner
        );
        state.record.owner = new_owner;
        Ok(state.mine(TRANSFER_GAS))
    }
}
