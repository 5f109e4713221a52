//! Derived order book depth view
//!
//! The book is not stored anywhere: it is recomputed on demand from the
//! resting limit orders in the store. Levels aggregate remaining amounts
//! at each price, bids sorted descending and asks ascending, each with a
//! running cumulative total for depth rendering.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

/// One price level: aggregate remaining amount and cumulative depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub amount: Quantity,
    /// Number of resting orders at this price.
    pub orders: u32,
    /// Cumulative amount from the top of this side down to this level.
    pub total: Quantity,
}

/// A point-in-time depth view of one pair's book.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookView {
    /// Descending by price.
    pub bids: Vec<BookLevel>,
    /// Ascending by price.
    pub asks: Vec<BookLevel>,
    pub last_price: Option<Price>,
}

impl BookView {
    /// Build a view from resting orders, truncated to `depth` levels per
    /// side (0 means unbounded).
    pub fn build<'a, I>(resting: I, last_price: Option<Price>, depth: usize) -> Self
    where
        I: IntoIterator<Item = &'a Order>,
    {
        let mut bid_levels: BTreeMap<Price, (Quantity, u32)> = BTreeMap::new();
        let mut ask_levels: BTreeMap<Price, (Quantity, u32)> = BTreeMap::new();

        for order in resting {
            debug_assert!(order.is_resting());
            let levels = match order.side {
                Side::Buy => &mut bid_levels,
                Side::Sell => &mut ask_levels,
            };
            let entry = levels
                .entry(order.price)
                .or_insert((Quantity::zero(), 0));
            entry.0 = entry.0 + order.remaining;
            entry.1 += 1;
        }

        let bids = accumulate(bid_levels.into_iter().rev(), depth);
        let asks = accumulate(ask_levels.into_iter(), depth);

        Self {
            bids,
            asks,
            last_price,
        }
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }

    /// Midpoint of best bid and ask, when both sides are populated.
    pub fn mid_price(&self) -> Option<Price> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        Price::try_new((bid.as_decimal() + ask.as_decimal()) / rust_decimal::Decimal::TWO)
    }

    pub fn spread(&self) -> Option<rust_decimal::Decimal> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        Some(ask.as_decimal() - bid.as_decimal())
    }
}

fn accumulate<I>(levels: I, depth: usize) -> Vec<BookLevel>
where
    I: Iterator<Item = (Price, (Quantity, u32))>,
{
    let mut out = Vec::new();
    let mut running = Quantity::zero();
    for (price, (amount, orders)) in levels {
        if depth > 0 && out.len() == depth {
            break;
        }
        running = running + amount;
        out.push(BookLevel {
            price,
            amount,
            orders,
            total: running,
        });
    }
    out
}
