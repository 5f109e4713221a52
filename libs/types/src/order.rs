//! Order lifecycle types
//!
//! State machine: `Open → Partial → Filled` via repeated fills,
//! `Open/Partial → Cancelled` via explicit cancellation, or
//! `Open → Filled` on a single full fill. `Filled` and `Cancelled`
//! are terminal.

use crate::ids::{OrderId, OwnerId, PairId};
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order kind: priced limit order or immediate market order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderKind {
    Limit,
    Market,
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Accepted, nothing filled yet
    Open,
    /// Partially filled
    Partial,
    /// Completely filled (terminal)
    Filled,
    /// Cancelled by caller or engine (terminal)
    Cancelled,
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled)
    }
}

/// Complete order structure.
///
/// Fill state (`filled`/`remaining`/`status`) is mutated only through
/// [`Order::apply_fill`] and [`Order::cancel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub pair: PairId,
    pub side: Side,
    pub kind: OrderKind,
    /// Limit price; `Price::zero()` for market orders.
    pub price: Price,
    pub amount: Quantity,
    pub filled: Quantity,
    pub remaining: Quantity,
    pub status: OrderStatus,
    pub owner: OwnerId,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// True for market-maker orders, excluded from user-facing listings.
    pub synthetic: bool,
}

impl Order {
    /// Create a new open order. Price and amount must already be
    /// quantized to the pair's precision.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: OrderId,
        pair: PairId,
        side: Side,
        kind: OrderKind,
        price: Price,
        amount: Quantity,
        owner: OwnerId,
        created_at: i64,
        synthetic: bool,
    ) -> Self {
        Self {
            id,
            pair,
            side,
            kind,
            price,
            amount,
            filled: Quantity::zero(),
            remaining: amount,
            status: OrderStatus::Open,
            owner,
            created_at,
            synthetic,
        }
    }

    /// Check the fill-state invariant.
    ///
    /// Non-terminal and filled orders satisfy `remaining = amount − filled`;
    /// cancelled orders have remaining forced to zero.
    pub fn check_invariant(&self) -> bool {
        match self.status {
            OrderStatus::Cancelled => self.remaining.is_zero(),
            _ => {
                self.remaining.as_decimal() >= rust_decimal::Decimal::ZERO
                    && self.filled.as_decimal() + self.remaining.as_decimal()
                        == self.amount.as_decimal()
            }
        }
    }

    pub fn is_filled(&self) -> bool {
        self.filled == self.amount
    }

    pub fn has_fills(&self) -> bool {
        !self.filled.is_zero()
    }

    /// Whether the order can still participate in matching.
    pub fn is_active(&self) -> bool {
        matches!(self.status, OrderStatus::Open | OrderStatus::Partial)
    }

    /// Whether the order rests in the book: active limit orders only.
    /// Market orders never rest, even when left partial.
    pub fn is_resting(&self) -> bool {
        self.is_active() && self.kind == OrderKind::Limit
    }

    /// Apply a fill and adjust status.
    ///
    /// # Panics
    /// Panics if the fill would exceed the order's remaining amount or
    /// the order is terminal.
    pub fn apply_fill(&mut self, fill: Quantity) {
        assert!(!self.status.is_terminal(), "cannot fill terminal order");
        let new_filled = self.filled + fill;
        assert!(
            new_filled.as_decimal() <= self.amount.as_decimal(),
            "fill would exceed order amount"
        );

        self.filled = new_filled;
        self.remaining = self.amount.saturating_sub(new_filled);

        if self.is_filled() {
            self.status = OrderStatus::Filled;
        } else if self.has_fills() {
            self.status = OrderStatus::Partial;
        }

        debug_assert!(self.check_invariant());
    }

    /// Cancel the order, zeroing its remaining amount.
    ///
    /// Returns false if the order is already terminal.
    pub fn cancel(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = OrderStatus::Cancelled;
        self.remaining = Quantity::zero();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order(amount: &str) -> Order {
        Order::new(
            OrderId::from_raw(1),
            PairId::new("ETH/USDC"),
            Side::Buy,
            OrderKind::Limit,
            Price::from_u64(3200),
            Quantity::from_str(amount).unwrap(),
            OwnerId::new("0xalice"),
            1_700_000_000_000,
            false,
        )
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn test_order_creation() {
        let order = sample_order("1.0");
        assert_eq!(order.status, OrderStatus::Open);
        assert!(order.check_invariant());
        assert!(!order.has_fills());
        assert!(order.is_resting());
    }

    #[test]
    fn test_order_fill_transitions() {
        let mut order = sample_order("1.0");

        order.apply_fill(Quantity::from_str("0.3").unwrap());
        assert_eq!(order.status, OrderStatus::Partial);
        assert_eq!(order.remaining, Quantity::from_str("0.7").unwrap());
        assert!(order.check_invariant());

        order.apply_fill(Quantity::from_str("0.7").unwrap());
        assert_eq!(order.status, OrderStatus::Filled);
        assert!(order.is_filled());
        assert!(order.check_invariant());
    }

    #[test]
    fn test_single_full_fill() {
        let mut order = sample_order("2.0");
        order.apply_fill(Quantity::from_str("2.0").unwrap());
        assert_eq!(order.status, OrderStatus::Filled);
    }

    #[test]
    #[should_panic(expected = "fill would exceed order amount")]
    fn test_overfill_panics() {
        let mut order = sample_order("1.0");
        order.apply_fill(Quantity::from_str("1.5").unwrap());
    }

    #[test]
    fn test_cancel_zeroes_remaining() {
        let mut order = sample_order("1.0");
        order.apply_fill(Quantity::from_str("0.4").unwrap());

        assert!(order.cancel());
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert!(order.remaining.is_zero());
        assert_eq!(order.filled, Quantity::from_str("0.4").unwrap());
        assert!(order.check_invariant());
    }

    #[test]
    fn test_cancel_terminal_returns_false() {
        let mut order = sample_order("1.0");
        order.apply_fill(Quantity::from_str("1.0").unwrap());
        assert!(!order.cancel());
        assert_eq!(order.status, OrderStatus::Filled);
    }

    #[test]
    fn test_market_order_never_rests() {
        let mut order = Order::new(
            OrderId::from_raw(2),
            PairId::new("ETH/USDC"),
            Side::Buy,
            OrderKind::Market,
            Price::zero(),
            Quantity::from_str("1.0").unwrap(),
            OwnerId::new("0xbob"),
            1_700_000_000_000,
            false,
        );
        order.apply_fill(Quantity::from_str("0.5").unwrap());
        assert_eq!(order.status, OrderStatus::Partial);
        assert!(!order.is_resting());
    }

    #[test]
    fn test_order_serialization() {
        let order = sample_order("2.5");
        let json = serde_json::to_string(&order).unwrap();
        let deserialized: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, deserialized);
    }
}
