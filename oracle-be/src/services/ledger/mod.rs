//! Ledger interface for the on-chain price record
//!
//! The price record lives in a contract that exposes a single authorized
//! write (`updatePrices`) and public reads. [`PriceLedger`] models exactly
//! that surface plus the fee/receipt plumbing the submitter needs, so the
//! pipeline can run against a real chain ([`EvmPriceLedger`]) or a local
//! record with the same rules ([`InMemoryLedger`]).

pub mod evm;
pub mod memory;

pub use evm::EvmPriceLedger;
pub use memory::InMemoryLedger;

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
use serde::Serialize;

use super::price_calculator::PriceSet;

/// On-chain price record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    pub prices: PriceSet,
    /// Unix seconds of the last accepted write, 0 if never written
    pub last_updated_at: u64,
    pub owner: Address,
}

impl LedgerRecord {
    /// Record as created at contract deployment
    pub fn uninitialized(owner: Address) -> Self {
        Self {
            prices: PriceSet::default(),
            last_updated_at: 0,
            owner,
        }
    }
}

/// Fee levels reported by the network; either may be unavailable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeEstimate {
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
}

/// Gas and fee parameters chosen for a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxParams {
    pub gas_limit: u64,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// A mined transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
    /// false when the transaction was mined but reverted
    pub success: bool,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger RPC error: {0}")]
    Rpc(String),
    #[error("caller {caller} is not the ledger owner {owner}")]
    Unauthorized { caller: Address, owner: Address },
    #[error("price values must be positive")]
    NonPositiveValue,
    #[error("malformed ledger record: {0}")]
    InvalidRecord(String),
}

/// Read/write interface of the price contract
#[async_trait]
pub trait PriceLedger: Send + Sync {
    /// Short name of the backend (e.g., "evm", "memory")
    fn backend_name(&self) -> &'static str;

    /// Address that signs writes
    fn signer_address(&self) -> Address;

    /// Reads the current record
    async fn read_record(&self) -> Result<LedgerRecord, LedgerError>;

    /// Asks the ledger whether its record is stale
    async fn is_stale(&self) -> Result<bool, LedgerError>;

    /// Estimates gas for writing `prices`; fails if the write would revert
    async fn estimate_update_gas(&self, prices: &PriceSet) -> Result<u64, LedgerError>;

    /// Current network fee levels
    async fn fee_estimate(&self) -> Result<FeeEstimate, LedgerError>;

    /// Broadcasts the write and returns its hash without waiting for inclusion
    async fn send_update(&self, prices: &PriceSet, params: &TxParams)
    -> Result<TxHash, LedgerError>;

    /// Receipt of a sent transaction, `None` while it is still pending
    async fn transaction_receipt(&self, tx_hash: &TxHash) -> Result<Option<Receipt>, LedgerError>;

    /// Hands write authority to `new_owner`
    async fn transfer_authority(&self, new_owner: Address) -> Result<TxHash, LedgerError>;
}
