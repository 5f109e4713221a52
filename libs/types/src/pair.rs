//! Trading pair configuration
//!
//! Static, process-lifetime config for each tradable pair: symbols,
//! price/amount precision, minimum order size, and the synthetic base
//! price used when seeding a cold start.

use crate::ids::PairId;
use crate::numeric::{Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Immutable configuration for one tradable pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingPair {
    pub id: PairId,
    pub base: String,
    pub quote: String,
    /// Price precision in decimal places.
    pub price_dp: u32,
    /// Amount precision in decimal places.
    pub amount_dp: u32,
    /// Minimum order amount (base currency).
    pub min_amount: Quantity,
    /// Synthetic base price used for seeding candles and the book.
    pub seed_price: Price,
}

impl TradingPair {
    pub fn new(
        id: impl Into<String>,
        price_dp: u32,
        amount_dp: u32,
        min_amount: Quantity,
        seed_price: Price,
    ) -> Self {
        let id = PairId::new(id);
        let (base, quote) = {
            let (b, q) = id.split();
            (b.to_string(), q.to_string())
        };
        Self {
            id,
            base,
            quote,
            price_dp,
            amount_dp,
            min_amount,
            seed_price,
        }
    }

    /// Round a raw decimal to this pair's price precision (half away
    /// from zero) and validate positivity.
    pub fn round_price(&self, raw: Decimal) -> Option<Price> {
        // A sub-precision price can quantize to zero; reject it.
        Price::try_new(raw)
            .map(|p| p.quantize(self.price_dp))
            .filter(|p| !p.is_zero())
    }

    /// Round a raw decimal to this pair's amount precision (toward zero)
    /// and validate non-negativity.
    pub fn round_amount(&self, raw: Decimal) -> Option<Quantity> {
        Quantity::try_new(raw).map(|q| q.quantize(self.amount_dp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn eth_usdc() -> TradingPair {
        TradingPair::new(
            "ETH/USDC",
            2,
            4,
            Quantity::from_str("0.001").unwrap(),
            Price::from_u64(3200),
        )
    }

    #[test]
    fn test_pair_symbols() {
        let pair = eth_usdc();
        assert_eq!(pair.base, "ETH");
        assert_eq!(pair.quote, "USDC");
        assert_eq!(pair.id.as_str(), "ETH/USDC");
    }

    #[test]
    fn test_round_price() {
        let pair = eth_usdc();
        let raw = Decimal::from_str("3200.128").unwrap();
        assert_eq!(
            pair.round_price(raw),
            Some(Price::from_str("3200.13").unwrap())
        );
        assert_eq!(pair.round_price(Decimal::ZERO), None);
        // Positive but below precision rounds to zero and is rejected.
        assert_eq!(pair.round_price(Decimal::from_str("0.001").unwrap()), None);
    }

    #[test]
    fn test_round_amount_truncates() {
        let pair = eth_usdc();
        let raw = Decimal::from_str("0.12349").unwrap();
        assert_eq!(
            pair.round_amount(raw),
            Some(Quantity::from_str("0.1234").unwrap())
        );
    }
}
