//! Continuous order matching
//!
//! Matches a newly placed order against the store's resting opposite-side
//! limit orders for the same pair. Price priority only, with store
//! insertion order as the tie-break at equal prices (stable sort), so
//! equal-priced makers fill first-in first-out. Trades always execute at
//! the maker's resting price, which gives market takers price
//! improvement.
//!
//! Self-matching is not prevented: an order can fill against another
//! order from the same owner.

use tracing::trace;
use types::ids::OrderId;
use types::order::{OrderKind, Side};
use types::pair::TradingPair;
use types::trade::Trade;

use crate::store::OrderStore;
use crate::trades::TradeLog;

/// Match `taker_id` against the book, recording trades in the log.
///
/// Returns the executed trades, oldest-first. The taker must already be
/// in the store; its fill state and every touched maker's fill state are
/// updated in place.
pub fn match_order(
    store: &mut OrderStore,
    pair: &TradingPair,
    taker_id: OrderId,
    log: &mut TradeLog,
    now_ms: i64,
) -> Vec<Trade> {
    let Some(taker) = store.get(taker_id) else {
        return Vec::new();
    };
    let taker_side = taker.side;
    let taker_kind = taker.kind;
    let taker_price = taker.price;
    let taker_owner = taker.owner.clone();

    // Candidate makers in insertion order, then a stable price sort:
    // ascending asks for a buy, descending bids for a sell.
    let mut candidates: Vec<(OrderId, types::numeric::Price)> = store
        .resting_orders(&pair.id)
        .iter()
        .filter(|o| o.id != taker_id && o.side == taker_side.opposite())
        .map(|o| (o.id, o.price))
        .collect();
    match taker_side {
        Side::Buy => candidates.sort_by(|a, b| a.1.cmp(&b.1)),
        Side::Sell => candidates.sort_by(|a, b| b.1.cmp(&a.1)),
    }

    let mut trades = Vec::new();
    for (maker_id, maker_price) in candidates {
        let Some(taker) = store.get(taker_id) else {
            break;
        };
        if taker.remaining.is_zero() {
            break;
        }
        // Limit-price guard ends the scan; the list is price-ordered so
        // no later maker can satisfy it either.
        if taker_kind == OrderKind::Limit {
            let crossed = match taker_side {
                Side::Buy => maker_price <= taker_price,
                Side::Sell => maker_price >= taker_price,
            };
            if !crossed {
                break;
            }
        }

        let taker_remaining = taker.remaining;
        let Some(maker) = store.get(maker_id) else {
            continue;
        };
        let fill = taker_remaining.min(maker.remaining).quantize(pair.amount_dp);
        if fill.is_zero() {
            // Maker's remainder is below amount precision; leave it.
            continue;
        }
        let maker_owner = maker.owner.clone();

        if let Some(maker) = store.get_mut(maker_id) {
            maker.apply_fill(fill);
        }
        if let Some(taker) = store.get_mut(taker_id) {
            taker.apply_fill(fill);
        }

        let trade = Trade::new(
            log.mint_id(),
            pair.id.clone(),
            maker_price,
            fill,
            maker_id,
            taker_id,
            taker_side,
            now_ms,
        );
        trace!(
            trade = %trade.id,
            maker = %maker_id,
            taker = %taker_id,
            price = %maker_price,
            amount = %fill,
            self_cross = maker_owner == taker_owner,
            "matched"
        );
        log.push(trade.clone());
        trades.push(trade);
    }

    // Market orders never rest: an untouched one is cancelled outright,
    // a partially filled one stays Partial but is excluded from the book
    // by its kind.
    if taker_kind == OrderKind::Market {
        if let Some(taker) = store.get_mut(taker_id) {
            if !taker.remaining.is_zero() && !taker.has_fills() {
                taker.cancel();
            }
        }
    }

    trades
}
