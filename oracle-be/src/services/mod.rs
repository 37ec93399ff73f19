//! Services module for external integrations and business logic

pub mod change_decision;
pub mod goldapi;
pub mod ledger;
pub mod orchestrator;
pub mod price_calculator;
pub mod quote_source;
pub mod scheduler;
pub mod submitter;

pub use goldapi::GoldApiClient;
pub use ledger::{EvmPriceLedger, InMemoryLedger, PriceLedger};
pub use orchestrator::{RetryPolicy, UpdateOrchestrator, UpdateResult};
pub use price_calculator::PriceSet;
pub use quote_source::QuoteSource;
pub use submitter::LedgerSubmitter;
