use alloy::primitives::{Address, address};
use std::{sync::Arc, time::Duration};

use crate::{
    services::{
        EvmPriceLedger, GoldApiClient, InMemoryLedger, LedgerSubmitter, PriceLedger, QuoteSource,
        RetryPolicy, UpdateOrchestrator,
    },
    utils::{
        cache::Cache,
        env::{ConfigError, EnvVars, LedgerBackend},
    },
};

/// Owner and caller of the in-memory ledger
pub const LOCAL_OPERATOR: Address = address!("0x00000000000000000000000000000000000a11ce");

/// Request timeout for quote source calls
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub struct AppState {
    pub cache: Cache,
    pub env_vars: EnvVars,
    pub quote_source: Arc<dyn QuoteSource>,
    pub ledger: Arc<dyn PriceLedger>,
    pub orchestrator: Arc<UpdateOrchestrator>,
}

impl AppState {
    /// Build the application state from configuration
    ///
    /// Nothing here touches the network; an unreachable quote source or RPC
    /// endpoint surfaces on the first cycle.
    pub fn new(env_vars: EnvVars) -> Result<AppState, Box<dyn std::error::Error>> {
        let http_client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        log::info!("Using GoldAPI at {}", env_vars.goldapi_base_url);
        let quote_source: Arc<dyn QuoteSource> = Arc::new(GoldApiClient::with_base_url(
            http_client,
            env_vars.goldapi_key.clone(),
            env_vars.goldapi_base_url.clone(),
        ));

        let ledger: Arc<dyn PriceLedger> = match env_vars.ledger_backend {
            LedgerBackend::Evm => {
                let evm = env_vars
                    .evm
                    .as_ref()
                    .ok_or_else(|| ConfigError::Missing("RPC_URL".to_string()))?;
                Arc::new(EvmPriceLedger::connect(
                    &evm.rpc_url,
                    &evm.private_key,
                    evm.contract_address,
                )?)
            }
            LedgerBackend::Memory => {
                log::warn!(
                    "Using in-memory ledger (operator {}); prices are not persisted",
                    LOCAL_OPERATOR
                );
                Arc::new(InMemoryLedger::new(LOCAL_OPERATOR))
            }
        };

        Ok(Self::from_parts(env_vars, quote_source, ledger))
    }

    /// Wire the pipeline around an existing quote source and ledger
    pub fn from_parts(
        env_vars: EnvVars,
        quote_source: Arc<dyn QuoteSource>,
        ledger: Arc<dyn PriceLedger>,
    ) -> AppState {
        let submitter = LedgerSubmitter::new(ledger.clone(), env_vars.confirmation_timeout());
        let retry_policy = RetryPolicy {
            max_retries: env_vars.max_retries,
            delay: env_vars.retry_delay(),
        };
        let orchestrator = Arc::new(UpdateOrchestrator::new(
            quote_source.clone(),
            ledger.clone(),
            submitter,
            retry_policy,
        ));

        AppState {
            cache: Cache::new(),
            env_vars,
            quote_source,
            ledger,
            orchestrator,
        }
    }
}
