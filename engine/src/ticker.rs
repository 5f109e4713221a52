//! Rolling 24h ticker statistics
//!
//! Derived per pair from the trade log and the current book, recomputed
//! after every trade and on demand. All arithmetic stays in `Decimal`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::ids::PairId;
use types::numeric::Price;
use types::pair::TradingPair;
use types::trade::Trade;

use crate::book::BookView;

const DAY_MS: i64 = 86_400_000;

/// Point-in-time per-pair summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub pair: PairId,
    pub last_price: Decimal,
    pub previous_price: Decimal,
    /// Absolute and percentage change against the first trade in the
    /// 24h window.
    pub change: Decimal,
    pub change_pct: Decimal,
    pub high_24h: Decimal,
    pub low_24h: Decimal,
    /// Base and quote volume over the window.
    pub volume_24h: Decimal,
    pub quote_volume_24h: Decimal,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub spread: Decimal,
    pub spread_pct: Decimal,
}

/// Compute the ticker for one pair.
///
/// `window` is the pair's trades from the last 24 hours, oldest-first;
/// `last_two` the two most recent trades regardless of window. Falls back
/// to the pair's seed price when there is no trade history at all.
pub fn compute(
    pair: &TradingPair,
    window: &[&Trade],
    last_two: (Option<&Trade>, Option<&Trade>),
    book: &BookView,
) -> Ticker {
    let seed = pair.seed_price.as_decimal();
    let (latest, previous) = last_two;
    let last_price = latest.map(|t| t.price.as_decimal()).unwrap_or(seed);
    let previous_price = previous.map(|t| t.price.as_decimal()).unwrap_or(last_price);

    let first_in_window = window.first().map(|t| t.price.as_decimal());
    let (change, change_pct) = match first_in_window {
        Some(first) if !first.is_zero() => {
            let change = last_price - first;
            (change, change / first * Decimal::ONE_HUNDRED)
        }
        Some(first) => (last_price - first, Decimal::ZERO),
        None => (Decimal::ZERO, Decimal::ZERO),
    };

    let mut high = last_price;
    let mut low = last_price;
    let mut volume = Decimal::ZERO;
    let mut quote_volume = Decimal::ZERO;
    for trade in window {
        let price = trade.price.as_decimal();
        if price > high {
            high = price;
        }
        if price < low {
            low = price;
        }
        volume += trade.amount.as_decimal();
        quote_volume += trade.quote_value;
    }

    let best_bid = book.best_bid();
    let best_ask = book.best_ask();
    let (spread, spread_pct) = match (best_bid, best_ask) {
        (Some(bid), Some(ask)) => {
            let spread = ask.as_decimal() - bid.as_decimal();
            let pct = if bid.as_decimal().is_zero() {
                Decimal::ZERO
            } else {
                spread / bid.as_decimal() * Decimal::ONE_HUNDRED
            };
            (spread, pct)
        }
        _ => (Decimal::ZERO, Decimal::ZERO),
    };

    Ticker {
        pair: pair.id.clone(),
        last_price,
        previous_price,
        change,
        change_pct,
        high_24h: high,
        low_24h: low,
        volume_24h: volume,
        quote_volume_24h: quote_volume,
        best_bid,
        best_ask,
        spread,
        spread_pct,
    }
}

/// Start of the 24h window relative to `now_ms`.
pub fn window_start(now_ms: i64) -> i64 {
    now_ms - DAY_MS
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::{OrderId, TradeId};
    use types::numeric::Quantity;
    use types::order::{Order, OrderKind, Side};

    fn pair() -> TradingPair {
        TradingPair::new(
            "ETH/USDC",
            2,
            4,
            Quantity::from_str("0.001").unwrap(),
            Price::from_u64(3200),
        )
    }

    fn make_trade(id: u64, price: u64, amount: &str, executed_at: i64) -> Trade {
        Trade::new(
            TradeId::from_raw(id),
            PairId::new("ETH/USDC"),
            Price::from_u64(price),
            Quantity::from_str(amount).unwrap(),
            OrderId::from_raw(1),
            OrderId::from_raw(2),
            Side::Buy,
            executed_at,
        )
    }

    fn resting(id: u64, side: Side, price: u64) -> Order {
        Order::new(
            OrderId::from_raw(id),
            PairId::new("ETH/USDC"),
            side,
            OrderKind::Limit,
            Price::from_u64(price),
            Quantity::from_str("1.0").unwrap(),
            types::ids::OwnerId::new("0xalice"),
            1_000,
            false,
        )
    }

    #[test]
    fn test_seed_price_fallback_without_trades() {
        let t = compute(&pair(), &[], (None, None), &BookView::default());
        assert_eq!(t.last_price, Decimal::from(3200));
        assert_eq!(t.previous_price, Decimal::from(3200));
        assert_eq!(t.change, Decimal::ZERO);
        assert_eq!(t.change_pct, Decimal::ZERO);
        assert_eq!(t.volume_24h, Decimal::ZERO);
        assert_eq!(t.spread, Decimal::ZERO);
    }

    #[test]
    fn test_change_against_first_in_window() {
        let t1 = make_trade(1, 3000, "1.0", 1_000);
        let t2 = make_trade(2, 3100, "2.0", 2_000);
        let t3 = make_trade(3, 3300, "0.5", 3_000);
        let window = vec![&t1, &t2, &t3];

        let t = compute(&pair(), &window, (Some(&t3), Some(&t2)), &BookView::default());
        assert_eq!(t.last_price, Decimal::from(3300));
        assert_eq!(t.previous_price, Decimal::from(3100));
        assert_eq!(t.change, Decimal::from(300));
        assert_eq!(t.change_pct, Decimal::from(10));
        assert_eq!(t.high_24h, Decimal::from(3300));
        assert_eq!(t.low_24h, Decimal::from(3000));
        assert_eq!(t.volume_24h, Decimal::new(35, 1));
        // 3000*1 + 3100*2 + 3300*0.5
        assert_eq!(t.quote_volume_24h, Decimal::from(10850));
    }

    #[test]
    fn test_spread_from_book_top() {
        let orders = vec![resting(1, Side::Buy, 3100), resting(2, Side::Sell, 3110)];
        let book = BookView::build(orders.iter(), None, 1);
        let t = compute(&pair(), &[], (None, None), &book);
        assert_eq!(t.best_bid, Some(Price::from_u64(3100)));
        assert_eq!(t.best_ask, Some(Price::from_u64(3110)));
        assert_eq!(t.spread, Decimal::from(10));
        // 10 / 3100 * 100
        assert_eq!(t.spread_pct.round_dp(4), Decimal::from_str_exact("0.3226").unwrap());
    }

    #[test]
    fn test_ticker_json_shape_for_ui() {
        let t = compute(&pair(), &[], (None, None), &BookView::default());
        let json = serde_json::to_string(&t).unwrap();
        let back: Ticker = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
        assert!(json.contains("last_price"));
    }

    #[test]
    fn test_one_sided_book_has_zero_spread() {
        let orders = vec![resting(1, Side::Buy, 3100)];
        let book = BookView::build(orders.iter(), None, 1);
        let t = compute(&pair(), &[], (None, None), &book);
        assert_eq!(t.best_bid, Some(Price::from_u64(3100)));
        assert_eq!(t.best_ask, None);
        assert_eq!(t.spread, Decimal::ZERO);
    }
}
