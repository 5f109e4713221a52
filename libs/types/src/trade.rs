//! Trade execution types
//!
//! A trade is the immutable record of one fill between a resting maker
//! order and an incoming taker order.

use crate::ids::{OrderId, PairId, TradeId};
use crate::numeric::{Price, Quantity};
use crate::order::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An executed trade. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub pair: PairId,
    /// Execution price (the maker's price).
    pub price: Price,
    /// Executed amount in base currency.
    pub amount: Quantity,
    /// Quote-equivalent amount (price × amount).
    pub quote_value: Decimal,
    /// The resting order that was hit.
    pub maker: OrderId,
    /// The incoming order that crossed.
    pub taker: OrderId,
    /// Side from the taker's perspective.
    pub taker_side: Side,
    /// Epoch milliseconds.
    pub executed_at: i64,
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: TradeId,
        pair: PairId,
        price: Price,
        amount: Quantity,
        maker: OrderId,
        taker: OrderId,
        taker_side: Side,
        executed_at: i64,
    ) -> Self {
        let quote_value = price.as_decimal() * amount.as_decimal();
        Self {
            id,
            pair,
            price,
            amount,
            quote_value,
            maker,
            taker,
            taker_side,
            executed_at,
        }
    }
}
