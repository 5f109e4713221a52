//! Synchronous typed event bus
//!
//! Observer registry notifying external consumers of book, trade, order,
//! ticker, and candle changes. Delivery is synchronous and in
//! subscription order. Each callback runs inside `catch_unwind`; a
//! panicking subscriber is logged and skipped so it can neither block
//! delivery to the others nor poison engine state.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;
use types::ids::PairId;
use types::order::Order;
use types::trade::Trade;

use crate::book::BookView;
use crate::candles::Candle;
use crate::ticker::Ticker;

/// Event categories a consumer can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Trade,
    OrderBook,
    Order,
    Ticker,
    Candle,
}

/// A published engine event.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Trade(Trade),
    OrderBook { pair: PairId, book: BookView },
    /// Order placed, filled, or cancelled; carries the new state.
    Order(Order),
    Ticker(Ticker),
    Candle {
        pair: PairId,
        timeframe: String,
        candle: Candle,
    },
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EngineEvent::Trade(_) => EventKind::Trade,
            EngineEvent::OrderBook { .. } => EventKind::OrderBook,
            EngineEvent::Order(_) => EventKind::Order,
            EngineEvent::Ticker(_) => EventKind::Ticker,
            EngineEvent::Candle { .. } => EventKind::Candle,
        }
    }
}

/// Handle returned by `subscribe`, consumed by `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn Fn(&EngineEvent)>;

struct Subscriber {
    id: SubscriptionId,
    kind: EventKind,
    callback: Callback,
}

/// Multi-subscriber synchronous fan-out.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 1,
        }
    }

    /// Register a callback for one event kind.
    pub fn subscribe<F>(&mut self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&EngineEvent) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            kind,
            callback: Box::new(callback),
        });
        id
    }

    /// Remove a subscription. Returns false if the id is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Deliver an event to all matching subscribers, in subscription
    /// order. A panicking subscriber is skipped.
    pub fn publish(&self, event: &EngineEvent) {
        let kind = event.kind();
        for sub in self.subscribers.iter().filter(|s| s.kind == kind) {
            let result = catch_unwind(AssertUnwindSafe(|| (sub.callback)(event)));
            if result.is_err() {
                warn!(subscription = sub.id.0, ?kind, "subscriber panicked, skipping");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use types::ids::{OrderId, TradeId};
    use types::numeric::{Price, Quantity};
    use types::order::Side;

    fn trade_event() -> EngineEvent {
        EngineEvent::Trade(Trade::new(
            TradeId::from_raw(1),
            PairId::new("ETH/USDC"),
            Price::from_u64(3200),
            Quantity::from_str("1.0").unwrap(),
            OrderId::from_raw(1),
            OrderId::from_raw(2),
            Side::Buy,
            1_000,
        ))
    }

    #[test]
    fn test_delivery_filtered_by_kind() {
        let mut bus = EventBus::new();
        let trades = Rc::new(RefCell::new(0));
        let tickers = Rc::new(RefCell::new(0));

        let t = Rc::clone(&trades);
        bus.subscribe(EventKind::Trade, move |_| *t.borrow_mut() += 1);
        let k = Rc::clone(&tickers);
        bus.subscribe(EventKind::Ticker, move |_| *k.borrow_mut() += 1);

        bus.publish(&trade_event());
        assert_eq!(*trades.borrow(), 1);
        assert_eq!(*tickers.borrow(), 0);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(0));
        let s = Rc::clone(&seen);
        let id = bus.subscribe(EventKind::Trade, move |_| *s.borrow_mut() += 1);

        bus.publish(&trade_event());
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&trade_event());

        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn test_panicking_subscriber_does_not_block_others() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(0));

        bus.subscribe(EventKind::Trade, |_| panic!("subscriber bug"));
        let s = Rc::clone(&seen);
        bus.subscribe(EventKind::Trade, move |_| *s.borrow_mut() += 1);

        bus.publish(&trade_event());
        assert_eq!(*seen.borrow(), 1);
    }

    #[test]
    fn test_delivery_in_subscription_order() {
        let mut bus = EventBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let o = Rc::clone(&order);
            bus.subscribe(EventKind::Trade, move |_| o.borrow_mut().push(tag));
        }
        bus.publish(&trade_event());
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }
}
