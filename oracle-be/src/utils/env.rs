use alloy::primitives::Address;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::services::goldapi::DEFAULT_GOLDAPI_BASE;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(String),
    #[error("{0} is invalid: {1}")]
    Invalid(String, String),
}

/// Where price writes go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    /// EVM contract over JSON-RPC
    Evm,
    /// Process-local record, for development without a chain
    Memory,
}

impl FromStr for LedgerBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "evm" => Ok(LedgerBackend::Evm),
            "memory" => Ok(LedgerBackend::Memory),
            other => Err(format!("unknown ledger backend '{}'", other)),
        }
    }
}

/// Settings needed to reach the EVM contract
#[derive(Clone)]
pub struct EvmSettings {
    pub rpc_url: String,
    pub private_key: String,
    pub contract_address: Address,
}

#[derive(Clone)]
pub struct EnvVars {
    pub goldapi_key: String,
    pub goldapi_base_url: String, // Override for testing
    pub ledger_backend: LedgerBackend,
    pub evm: Option<EvmSettings>, // Required when ledger_backend is Evm
    pub port: u16,
    pub api_secret: String,
    pub update_interval_minutes: u64, // 0 disables the background updater
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub confirmation_timeout_secs: u64,
}

const REDACTED: &str = "<redacted>";

impl fmt::Debug for EvmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmSettings")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &REDACTED)
            .field("contract_address", &self.contract_address)
            .finish()
    }
}

impl fmt::Debug for EnvVars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvVars")
            .field("goldapi_key", &REDACTED)
            .field("goldapi_base_url", &self.goldapi_base_url)
            .field("ledger_backend", &self.ledger_backend)
            .field("evm", &self.evm)
            .field("port", &self.port)
            .field("api_secret", &REDACTED)
            .field("update_interval_minutes", &self.update_interval_minutes)
            .field("max_retries", &self.max_retries)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("confirmation_timeout_secs", &self.confirmation_timeout_secs)
            .finish()
    }
}

impl EnvVars {
    /// Reads the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());
        let required = |key: &str| get(key).ok_or_else(|| ConfigError::Missing(key.to_string()));

        let ledger_backend = parse_or(&get, "LEDGER_BACKEND", LedgerBackend::Evm)?;

        let evm = match ledger_backend {
            LedgerBackend::Evm => Some(EvmSettings {
                rpc_url: required("RPC_URL")?,
                private_key: required("PRIVATE_KEY")?,
                contract_address: required("CONTRACT_ADDRESS")?
                    .trim()
                    .parse::<Address>()
                    .map_err(|e| {
                        ConfigError::Invalid("CONTRACT_ADDRESS".to_string(), e.to_string())
                    })?,
            }),
            LedgerBackend::Memory => None,
        };

        let update_interval_minutes: u64 = parse_or(&get, "UPDATE_INTERVAL_MINUTES", 15)?;
        if update_interval_minutes.checked_mul(60).is_none() {
            return Err(ConfigError::Invalid(
                "UPDATE_INTERVAL_MINUTES".to_string(),
                format!("{} minutes is out of range", update_interval_minutes),
            ));
        }

        Ok(Self {
            goldapi_key: required("GOLDAPI_KEY")?,
            goldapi_base_url: get("GOLDAPI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GOLDAPI_BASE.to_string()),
            ledger_backend,
            evm,
            port: parse_or(&get, "PORT", 3000)?,
            api_secret: required("API_SECRET")?,
            update_interval_minutes,
            max_retries: parse_or(&get, "MAX_RETRIES", 3)?,
            retry_delay_ms: parse_or(&get, "RETRY_DELAY_MS", 5_000)?,
            confirmation_timeout_secs: parse_or(&get, "CONFIRMATION_TIMEOUT_SECS", 120)?,
        })
    }

    pub fn update_interval(&self) -> Option<Duration> {
        (self.update_interval_minutes > 0)
            .then(|| Duration::from_secs(self.update_interval_minutes.saturating_mul(60)))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::Invalid(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
