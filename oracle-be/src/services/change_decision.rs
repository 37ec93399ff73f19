//! Update policy for the on-chain record

use super::ledger::LedgerRecord;
use super::price_calculator::PriceSet;

/// Minimum per-gram move (raw units, scale 10^8) that justifies a write
pub const PRICE_CHANGE_THRESHOLD: u128 = 10_000;

/// Age after which a record is considered stale (1 hour)
pub const STALENESS_THRESHOLD_SECS: i64 = 3_600;

/// Decides whether `candidate` should be written over `current`
///
/// An uninitialized record is always updated. Otherwise only the per-gram
/// price is compared: every other field is derived from the same spot price,
/// so they move together.
pub fn should_update(current: &LedgerRecord, candidate: &PriceSet) -> bool {
    if current.last_updated_at == 0 {
        return true;
    }

    current.prices.per_gram.abs_diff(candidate.per_gram) > PRICE_CHANGE_THRESHOLD
}

/// A record is stale when it was never written or is older than an hour
pub fn is_stale(last_updated_at: u64, now: i64) -> bool {
    if last_updated_at == 0 {
        return true;
    }
    now.saturating_sub(last_updated_at as i64) > STALENESS_THRESHOLD_SECS
}
