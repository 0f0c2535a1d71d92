use primitive_types::U256;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// A token quantity in the mint's smallest units, as aggregators quote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount {
    pub raw: U256,
    pub decimals: u8,
}

impl Amount {
    /// Creates a new amount from raw units.
    #[must_use]
    pub fn new(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    /// Converts a human-readable quantity into raw units, truncating any
    /// precision beyond `decimals`.
    ///
    /// Returns `None` for negative quantities or on overflow.
    pub fn from_decimal(d: Decimal, decimals: u8) -> Option<Self> {
        if d.is_sign_negative() && !d.is_zero() {
            return None;
        }
        let multiplier = Decimal::from(10u64.checked_pow(u32::from(decimals))?);
        let raw = d.checked_mul(multiplier)?.trunc().to_u128()?;
        Some(Self {
            raw: U256::from(raw),
            decimals,
        })
    }

    /// Parses a raw unit string such as `"1500000"`.
    pub fn parse_raw(raw: &str, decimals: u8) -> Option<Self> {
        let raw = U256::from_dec_str(raw.trim()).ok()?;
        Some(Self { raw, decimals })
    }

    /// Converts back to a human-readable quantity.
    ///
    /// Returns `None` when the raw value does not fit a `Decimal`.
    pub fn to_decimal(&self) -> Option<Decimal> {
        if self.raw > U256::from(i128::MAX as u128) {
            return None;
        }
        let raw = i128::try_from(self.raw.as_u128()).ok()?;
        Decimal::try_from_i128_with_scale(raw, u32::from(self.decimals)).ok()
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_decimal_truncates() {
        let amount = Amount::from_decimal(dec!(1.2345678), 6).unwrap();
        assert_eq!(amount.raw, U256::from(1_234_567u64));
        assert_eq!(amount.to_string(), "1234567");
    }

    #[test]
    fn test_to_decimal() {
        let amount = Amount::new(U256::from(1_500_000_000u64), 9);
        assert_eq!(amount.to_decimal(), Some(dec!(1.5)));
    }

    #[test]
    fn test_rejects_negative() {
        assert!(Amount::from_decimal(dec!(-1), 6).is_none());
        assert!(Amount::from_decimal(Decimal::ZERO, 6).unwrap().is_zero());
    }

    #[test]
    fn test_parse_raw() {
        let amount = Amount::parse_raw("42000", 3).unwrap();
        assert_eq!(amount.to_decimal(), Some(dec!(42)));
        assert!(Amount::parse_raw("4x", 3).is_none());
    }

    #[test]
    fn test_huge_raw_does_not_fit() {
        assert!(Amount::new(U256::MAX, 0).to_decimal().is_none());
    }
}
