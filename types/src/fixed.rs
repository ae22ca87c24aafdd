//! Fixed-point arithmetic for reward accumulators.
//!
//! Token amounts are plain `u128` raw units. Accumulators (reward per unit of
//! principal) are scaled by [`SCALE`] = 10^18 and kept in 256 bits, since
//! `elapsed * rate * SCALE` routinely exceeds `u128` for 18-decimal tokens.

use crate::error::TypesError;

#[allow(clippy::assign_op_pattern, clippy::manual_div_ceil, clippy::ptr_offset_with_cast)]
mod wide {
    uint::construct_uint! {
        /// 256-bit unsigned integer.
        pub struct U256(4);
    }
}

pub use wide::U256;

/// Fixed-point scale for accumulators (10^18).
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// [`SCALE`] as a 256-bit value.
pub fn scale() -> U256 {
    U256::from(SCALE)
}

/// Narrow a 256-bit value back to `u128`, or `None` if it does not fit.
pub fn to_u128(value: U256) -> Option<u128> {
    if value > U256::from(u128::MAX) {
        None
    } else {
        Some(value.low_u128())
    }
}

/// Parse a token amount.
///
/// Accepts plain decimal (`"10000000000000000000000"`), `_` separators
/// (`"10_000"`) and a decimal exponent (`"10_000e18"`).
pub fn parse_amount(s: &str) -> Result<u128, TypesError> {
    let invalid = || TypesError::InvalidAmount(s.to_string());
    let cleaned: String = s.trim().chars().filter(|c| *c != '_').collect();
    let (mantissa, exponent) = match cleaned.split_once(['e', 'E']) {
        Some((m, e)) => (m, e.parse::<u32>().map_err(|_| invalid())?),
        None => (cleaned.as_str(), 0),
    };
    let base: u128 = mantissa.parse().map_err(|_| invalid())?;
    let factor = 10u128.checked_pow(exponent).ok_or_else(invalid)?;
    base.checked_mul(factor).ok_or_else(invalid)
}

/// Serde adapter storing a [`U256`] as its four little-endian limbs.
pub mod serde_u256 {
    use super::U256;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        value.0.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        <[u64; 4]>::deserialize(deserializer).map(U256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_is_ten_to_the_eighteen() {
        assert_eq!(scale(), U256::exp10(18));
    }

    #[test]
    fn narrowing_rejects_values_above_u128() {
        assert_eq!(to_u128(U256::from(42u64)), Some(42));
        assert_eq!(to_u128(U256::from(u128::MAX)), Some(u128::MAX));
        assert_eq!(to_u128(U256::from(u128::MAX) + U256::one()), None);
    }

    #[test]
    fn wide_product_does_not_overflow() {
        // 10_000e18 staked * 1e18 accumulator delta ~ 1e40, beyond u128.
        let product = U256::from(10_000 * SCALE)
            .checked_mul(scale())
            .unwrap();
        assert!(to_u128(product).is_none());
        assert_eq!(product / scale() / scale(), U256::from(10_000u64));
    }

    #[test]
    fn parse_amount_forms() {
        assert_eq!(parse_amount("123").unwrap(), 123);
        assert_eq!(parse_amount("10_000").unwrap(), 10_000);
        assert_eq!(parse_amount("10_000e18").unwrap(), 10_000 * SCALE);
        assert_eq!(parse_amount(" 5E2 ").unwrap(), 500);
    }

    #[test]
    fn parse_amount_rejects_garbage_and_overflow() {
        assert!(parse_amount("").is_err());
        assert!(parse_amount("-1").is_err());
        assert!(parse_amount("1.5").is_err());
        assert!(parse_amount("1e40").is_err());
    }
}
