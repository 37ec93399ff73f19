//! Derived price calculation
//!
//! Converts one spot quote (USD per troy ounce) into the five fixed-point
//! fields stored on-chain. Values are scaled by 10^8 and truncated, never
//! rounded, so the stored value is never above the quoted one.

use bigdecimal::{BigDecimal, ToPrimitive};
use serde::{Deserialize, Serialize};

/// Fixed-point scale used by the ledger (8 decimals)
pub const PRICE_SCALE: u128 = 100_000_000;

/// Grams in one troy ounce (31.1035), as unscaled digits and decimal scale
const GRAMS_PER_TROY_OUNCE: (i64, i64) = (311_035, 4);

/// Five fixed-point prices (scale 10^8) derived from one spot quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSet {
    pub per_gram: u128,
    pub per_ounce: u128,
    pub per_karat_24: u128,
    pub per_karat_22: u128,
    pub per_karat_18: u128,
}

impl PriceSet {
    /// Returns true when any field is zero (the ledger rejects such writes)
    pub fn has_zero_value(&self) -> bool {
        [
            self.per_gram,
            self.per_ounce,
            self.per_karat_24,
            self.per_karat_22,
            self.per_karat_18,
        ]
        .contains(&0)
    }
}

/// The spot quote cannot be turned into a price set
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidQuoteError {
    #[error("spot price must be positive, got {0}")]
    NonPositive(BigDecimal),
    #[error("spot price {0} is out of range")]
    OutOfRange(BigDecimal),
}

/// Calculates the fixed-point price set for a spot price per troy ounce
///
/// # Arguments
/// * `spot_price_per_ounce` - USD per troy ounce as quoted by the feed
///
/// # Returns
/// * `Ok(prices)` - gram, ounce and 24k/22k/18k karat prices scaled by 10^8
/// * `Err(InvalidQuoteError)` - If the spot price is zero, negative or too large
pub fn calculate(spot_price_per_ounce: &BigDecimal) -> Result<PriceSet, InvalidQuoteError> {
    if *spot_price_per_ounce <= BigDecimal::from(0) {
        return Err(InvalidQuoteError::NonPositive(spot_price_per_ounce.clone()));
    }

    let scaled = spot_price_per_ounce.clone() * BigDecimal::from(PRICE_SCALE as u64);
    let (digits, scale) = GRAMS_PER_TROY_OUNCE;
    let grams_per_ounce = BigDecimal::new(digits.into(), scale);

    let per_ounce = truncate_to_u128(&scaled)
        .ok_or_else(|| InvalidQuoteError::OutOfRange(spot_price_per_ounce.clone()))?;
    let per_gram = truncate_to_u128(&(scaled / grams_per_ounce))
        .ok_or_else(|| InvalidQuoteError::OutOfRange(spot_price_per_ounce.clone()))?;

    // 24k is pure gold, lower purities are parts per 24
    let per_karat_24 = per_gram;
    let per_karat_22 = per_karat_24 * 22 / 24;
    let per_karat_18 = per_karat_24 * 18 / 24;

    Ok(PriceSet {
        per_gram,
        per_ounce,
        per_karat_24,
        per_karat_22,
        per_karat_18,
    })
}

fn truncate_to_u128(value: &BigDecimal) -> Option<u128> {
    value.with_scale(0).to_u128()
}

/// Renders a fixed-point value as a decimal string with 8 fractional digits
///
/// e.g. `6550709727` -> `"65.50709727"`
pub fn format_fixed(raw: u128) -> String {
    format!("{}.{:08}", raw / PRICE_SCALE, raw % PRICE_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_calculate_documented_example() {
        let prices = calculate(&dec("2037.50")).unwrap();

        assert_eq!(prices.per_ounce, 203_750_000_000);
        assert_eq!(prices.per_gram, 6_550_709_727);
        assert_eq!(prices.per_karat_24, 6_550_709_727);
        assert_eq!(prices.per_karat_22, 6_004_817_249);
        assert_eq!(prices.per_karat_18, 4_913_032_295);
        assert_eq!(format_fixed(prices.per_gram), "65.50709727");
    }

    #[test]
    fn test_calculate_truncates_instead_of_rounding() {
        // 2412.87 / 31.1035 * 1e8 = 7757551400.9677...
        let prices = calculate(&dec("2412.87")).unwrap();
        assert_eq!(prices.per_gram, 7_757_551_400);
        assert_eq!(prices.per_ounce, 241_287_000_000);

        let prices = calculate(&dec("2037.279374414")).unwrap();
        assert_eq!(prices.per_gram, 6_550_000_400);
        assert_eq!(prices.per_ounce, 203_727_937_441);
    }

    #[test]
    fn test_calculate_karat_ordering_holds() {
        for spot in ["0.5", "1", "31.1035", "1999.99", "2037.50", "2650.123456789", "100000"] {
            let prices = calculate(&dec(spot)).unwrap();
            assert_eq!(prices.per_karat_24, prices.per_gram, "spot {}", spot);
            assert!(prices.per_karat_22 < prices.per_karat_24, "spot {}", spot);
            assert!(prices.per_karat_18 < prices.per_karat_22, "spot {}", spot);
            assert_eq!(prices.per_karat_22, prices.per_karat_24 * 22 / 24);
            assert_eq!(prices.per_karat_18, prices.per_karat_24 * 18 / 24);
        }
    }

    #[test]
    fn test_calculate_is_deterministic() {
        let spot = dec("2412.87");
        assert_eq!(calculate(&spot).unwrap(), calculate(&spot).unwrap());
    }

    #[test]
    fn test_calculate_rejects_zero_and_negative() {
        assert_eq!(
            calculate(&dec("0")),
            Err(InvalidQuoteError::NonPositive(dec("0")))
        );
        assert!(matches!(
            calculate(&dec("-2037.50")),
            Err(InvalidQuoteError::NonPositive(_))
        ));
    }

    #[test]
    fn test_calculate_tiny_price_degenerates_to_zero() {
        let prices = calculate(&dec("0.00000001")).unwrap();
        assert_eq!(prices.per_ounce, 1);
        assert_eq!(prices.per_gram, 0);
        assert!(prices.has_zero_value());
    }

    #[test]
    fn test_calculate_rejects_out_of_range() {
        assert!(matches!(
            calculate(&dec("1e40")),
            Err(InvalidQuoteError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(0), "0.00000000");
        assert_eq!(format_fixed(1), "0.00000001");
        assert_eq!(format_fixed(203_750_000_000), "2037.50000000");
    }
}
