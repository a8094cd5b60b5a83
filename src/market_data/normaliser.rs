// Convert wire strings into decimal prices/sizes.
// Fixed precision per field: extra digits are truncated, never rounded up.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::engine::types::{PriceLevel, Venue};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LevelError {
    #[error("unparseable {field} {raw:?}")]
    Unparseable { field: &'static str, raw: String },
    #[error("price must be positive, got {0}")]
    NonPositivePrice(Decimal),
    #[error("size must not be negative, got {0}")]
    NegativeSize(Decimal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normaliser {
    pub price_decimals: u32, // e.g. 8 => 0.00000001 resolution
    pub size_decimals: u32,
}

impl Default for Normaliser {
    fn default() -> Self {
        Self { price_decimals: 8, size_decimals: 8 }
    }
}

impl Normaliser {
    pub fn new(price_decimals: u32, size_decimals: u32) -> Self {
        Self { price_decimals, size_decimals }
    }

    fn parse(field: &'static str, raw: &str, decimals: u32) -> Result<Decimal, LevelError> {
        let trimmed = raw.trim();
        let value = Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|_| LevelError::Unparseable { field, raw: raw.to_owned() })?;
        Ok(value.round_dp_with_strategy(decimals, RoundingStrategy::ToZero))
    }

    pub fn price(&self, raw: &str) -> Result<Decimal, LevelError> {
        let price = Self::parse("price", raw, self.price_decimals)?;
        if price <= Decimal::ZERO {
            return Err(LevelError::NonPositivePrice(price));
        }
        Ok(price)
    }

    pub fn size(&self, raw: &str) -> Result<Decimal, LevelError> {
        let size = Self::parse("size", raw, self.size_decimals)?;
        if size < Decimal::ZERO {
            return Err(LevelError::NegativeSize(size));
        }
        Ok(size)
    }

    pub fn level(&self, venue: Venue, price: &str, size: &str) -> Result<PriceLevel, LevelError> {
        Ok(PriceLevel::new(self.price(price)?, self.size(size)?, venue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_parsing() {
        let n = Normaliser::new(2, 8);
        assert_eq!(n.price("100").unwrap(), dec!(100));
        assert_eq!(n.price("101.5").unwrap(), dec!(101.5));
        assert_eq!(n.price(" 99.999 ").unwrap(), dec!(99.99));
        assert_eq!(n.price("1e2").unwrap(), dec!(100));
    }

    #[test]
    fn test_size_truncates() {
        let n = Normaliser::new(2, 3);
        assert_eq!(n.size("0.12345").unwrap(), dec!(0.123));
        assert_eq!(n.size("0").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_rejects_bad_values() {
        let n = Normaliser::default();
        assert_eq!(n.price("0"), Err(LevelError::NonPositivePrice(Decimal::ZERO)));
        assert!(matches!(n.price("-1"), Err(LevelError::NonPositivePrice(_))));
        assert!(matches!(n.size("-0.5"), Err(LevelError::NegativeSize(_))));
        assert_eq!(
            n.price("abc"),
            Err(LevelError::Unparseable { field: "price", raw: "abc".into() })
        );
    }

    #[test]
    fn test_level() {
        let lvl = Normaliser::default().level(Venue::Coinbase, "101.5", "2").unwrap();
        assert_eq!(lvl, PriceLevel::new(dec!(101.5), dec!(2), Venue::Coinbase));
    }
}
