//! EVM price contract client
//!
//! Talks JSON-RPC to an EVM node through an alloy provider that signs with a
//! local private key. Only the contract functions the oracle needs are bound.

use alloy::{
    network::{EthereumWallet, ReceiptResponse},
    primitives::{Address, TxHash, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
    sol,
};
use async_trait::async_trait;

use super::{FeeEstimate, LedgerError, LedgerRecord, PriceLedger, Receipt, TxParams};
use crate::services::price_calculator::PriceSet;
use crate::utils::env::ConfigError;

sol! {
    #[sol(rpc)]
    contract GoldPriceOracle {
        function updatePrices(
            uint256 pricePerGram,
            uint256 pricePerOunce,
            uint256 price24k,
            uint256 price22k,
            uint256 price18k
        ) external;

        function getAllPrices() external view returns (
            uint256 pricePerGram,
            uint256 pricePerOunce,
            uint256 price24k,
            uint256 price22k,
            uint256 price18k,
            uint256 lastUpdated
        );

        function isPriceStale() external view returns (bool);

        function owner() external view returns (address);

        function transferOwnership(address newOwner) external;
    }
}

type OracleContract = GoldPriceOracle::GoldPriceOracleInstance<DynProvider>;

pub struct EvmPriceLedger {
    provider: DynProvider,
    contract: OracleContract,
    signer_address: Address,
}

impl EvmPriceLedger {
    /// Connects to `rpc_url`, signing with `private_key` (hex, with or without 0x)
    ///
    /// No network call is made here; a bad endpoint surfaces on first use.
    pub fn connect(
        rpc_url: &str,
        private_key: &str,
        contract_address: Address,
    ) -> Result<Self, ConfigError> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .map_err(|e| ConfigError::Invalid("PRIVATE_KEY".to_string(), format!("{}", e)))?;
        let signer_address = signer.address();

        let url = reqwest::Url::parse(rpc_url)
            .map_err(|e| ConfigError::Invalid("RPC_URL".to_string(), e.to_string()))?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();
        let contract = GoldPriceOracle::new(contract_address, provider.clone());

        log::info!(
            "EVM ledger bound to contract {} (signer {})",
            contract_address,
            signer_address
        );

        Ok(Self {
            provider,
            contract,
            signer_address,
        })
    }

    fn update_call_args(prices: &PriceSet) -> [U256; 5] {
        [
            U256::from(prices.per_gram),
            U256::from(prices.per_ounce),
            U256::from(prices.per_karat_24),
            U256::from(prices.per_karat_22),
            U256::from(prices.per_karat_18),
        ]
    }
}

fn rpc_error(e: impl std::fmt::Display) -> LedgerError {
    LedgerError::Rpc(e.to_string())
}

fn to_u128(field: &str, value: U256) -> Result<u128, LedgerError> {
    u128::try_from(value)
        .map_err(|_| LedgerError::InvalidRecord(format!("{} out of range: {}", field, value)))
}

#[async_trait]
impl PriceLedger for EvmPriceLedger {
    fn backend_name(&self) -> &'static str {
        "evm"
    }

    fn signer_address(&self) -> Address {
        self.signer_address
    }

    async fn read_record(&self) -> Result<LedgerRecord, LedgerError> {
        let all = self.contract.getAllPrices().call().await.map_err(rpc_error)?;
        let owner = self.contract.owner().call().await.map_err(rpc_error)?;

        let last_updated_at = u64::try_from(all.lastUpdated).map_err(|_| {
            LedgerError::InvalidRecord(format!("lastUpdated out of range: {}", all.lastUpdated))
        })?;

        Ok(LedgerRecord {
            prices: PriceSet {
                per_gram: to_u128("pricePerGram", all.pricePerGram)?,
                per_ounce: to_u128("pricePerOunce", all.pricePerOunce)?,
                per_karat_24: to_u128("price24k", all.price24k)?,
                per_karat_22: to_u128("price22k", all.price22k)?,
                per_karat_18: to_u128("price18k", all.price18k)?,
            },
            last_updated_at,
            owner,
        })
    }

    async fn is_stale(&self) -> Result<bool, LedgerError> {
        self.contract.isPriceStale().call().await.map_err(rpc_error)
    }

    async fn estimate_update_gas(&self, prices: &PriceSet) -> Result<u64, LedgerError> {
        let [gram, ounce, k24, k22, k18] = Self::update_call_args(prices);
        self.contract
            .updatePrices(gram, ounce, k24, k22, k18)
            .from(self.signer_address)
            .estimate_gas()
            .await
            .map_err(rpc_error)
    }

    async fn fee_estimate(&self) -> Result<FeeEstimate, LedgerError> {
        let estimation = self
            .provider
            .estimate_eip1559_fees()
            .await
            .map_err(rpc_error)?;

        Ok(FeeEstimate {
            max_fee_per_gas: Some(estimation.max_fee_per_gas),
            max_priority_fee_per_gas: Some(estimation.max_priority_fee_per_gas),
        })
    }

    async fn send_update(
        &self,
        prices: &PriceSet,
        params: &TxParams,
    ) -> Result<TxHash, LedgerError> {
        let [gram, ounce, k24, k22, k18] = Self::update_call_args(prices);
        let pending = self
            .contract
            .updatePrices(gram, ounce, k24, k22, k18)
            .from(self.signer_address)
            .gas(params.gas_limit)
            .max_fee_per_gas(params.max_fee_per_gas)
            .max_priority_fee_per_gas(params.max_priority_fee_per_gas)
            .send()
            .await
            .map_err(rpc_error)?;

        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, tx_hash: &TxHash) -> Result<Option<Receipt>, LedgerError> {
        let receipt = self
            .provider
            .get_transaction_receipt(*tx_hash)
            .await
            .map_err(rpc_error)?;

        // A receipt without a block number is not mined yet
        Ok(receipt.and_then(|r| {
            Some(Receipt {
                transaction_hash: r.transaction_hash(),
                block_number: r.block_number()?,
                gas_used: r.gas_used(),
                success: r.status(),
            })
        }))
    }

    async fn transfer_authority(&self, new_owner: Address) -> Result<TxHash, LedgerError> {
        let pending = self
            .contract
            .transferOwnership(new_owner)
            .from(self.signer_address)
            .send()
            .await
            .map_err(rpc_error)?;

        log::info!(
            "Ledger authority transfer to {} sent: {}",
            new_owner,
            pending.tx_hash()
        );

        Ok(*pending.tx_hash())
    }
}
