//! Engine facade
//!
//! `ExchangeEngine` owns every component and wires the control flow:
//! placement → store → matching → trade log → candles/ticker → event bus,
//! with the market maker and persistence hanging off the scheduler.
//! All operations run synchronously to completion; there is no internal
//! suspension point, so each call is atomic with respect to engine state.
//!
//! Time comes from an injected [`Clock`]. `Clock::Manual` plus
//! [`ExchangeEngine::drive`] gives tests full control over scheduling and
//! staleness behavior.

use chrono::Utc;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use types::errors::PlaceOrderError;
use types::ids::{OrderId, OwnerId, PairId};
use types::numeric::Price;
use types::order::{Order, OrderKind, Side};
use types::pair::TradingPair;
use types::trade::Trade;

use crate::book::BookView;
use crate::candles::{Candle, CandleAggregator};
use crate::config::EngineConfig;
use crate::events::{EngineEvent, EventBus, EventKind, SubscriptionId};
use crate::maker::{MakerAction, MakerScheduler, MarketMaker, PairView};
use crate::matching::match_order;
use crate::persist::{Snapshot, SnapshotState, SnapshotStore};
use crate::store::OrderStore;
use crate::ticker::{self, Ticker};
use crate::trades::TradeLog;

/// Time source for the engine.
#[derive(Debug, Clone, Copy)]
pub enum Clock {
    /// Wall clock, epoch milliseconds.
    System,
    /// Fixed time, advanced explicitly via [`ExchangeEngine::set_now`].
    Manual(i64),
}

impl Clock {
    fn now_ms(&self) -> i64 {
        match self {
            Clock::System => Utc::now().timestamp_millis(),
            Clock::Manual(ms) => *ms,
        }
    }
}

/// The in-process exchange simulation engine.
pub struct ExchangeEngine {
    config: EngineConfig,
    clock: Clock,
    store: OrderStore,
    trades: TradeLog,
    candles: CandleAggregator,
    bus: EventBus,
    maker: MarketMaker,
    scheduler: MakerScheduler,
    snapshots: SnapshotStore,
    rng: ChaCha8Rng,
}

impl ExchangeEngine {
    /// Build an engine: restore from snapshot if a fresh one exists,
    /// otherwise seed candle history, then arm the maker schedule.
    pub fn new(config: EngineConfig, clock: Clock) -> Self {
        let mut engine = Self {
            store: OrderStore::new(),
            trades: TradeLog::new(config.trade_cap, config.trade_floor),
            candles: CandleAggregator::new(config.candle_cap, config.candle_floor),
            bus: EventBus::new(),
            maker: MarketMaker::new(config.maker.clone()),
            scheduler: MakerScheduler::new(config.maker.tick_min_ms, config.maker.tick_max_ms),
            snapshots: SnapshotStore::new(config.snapshot_path.clone()),
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            config,
            clock,
        };

        let now = engine.now_ms();
        match engine.snapshots.load(now, engine.config.snapshot_max_age_ms) {
            Some(snapshot) => {
                engine.store.restore(snapshot.state.orders);
                engine.trades.restore(snapshot.state.trades);
                engine.candles.restore(snapshot.state.candles);
            }
            None => engine.seed_markets(now),
        }
        engine.scheduler.start(now, &mut engine.rng);
        info!(
            pairs = engine.config.pairs.len(),
            orders = engine.store.len(),
            "engine started"
        );
        engine
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Pin the clock to a manual time.
    pub fn set_now(&mut self, now_ms: i64) {
        self.clock = Clock::Manual(now_ms);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Orders ──────────────────────────────────────────────────────

    /// Validate and place an order, matching it immediately.
    ///
    /// `price` is ignored for market orders. Returns the order in its
    /// post-matching state.
    pub fn place_order(
        &mut self,
        pair: &PairId,
        side: Side,
        kind: OrderKind,
        price: Decimal,
        amount: Decimal,
        owner: OwnerId,
    ) -> Result<Order, PlaceOrderError> {
        self.submit(pair, side, kind, price, amount, owner, false)
    }

    /// Cancel an open/partial order. False for unknown or terminal ids.
    pub fn cancel_order(&mut self, id: OrderId) -> bool {
        let Some(pair) = self.store.get(id).map(|o| o.pair.clone()) else {
            return false;
        };
        if !self.store.cancel(id) {
            return false;
        }
        if let Some(order) = self.store.get(id) {
            self.bus.publish(&EngineEvent::Order(order.clone()));
        }
        self.publish_book(&pair);
        true
    }

    fn submit(
        &mut self,
        pair_id: &PairId,
        side: Side,
        kind: OrderKind,
        price: Decimal,
        amount: Decimal,
        owner: OwnerId,
        synthetic: bool,
    ) -> Result<Order, PlaceOrderError> {
        let pair = self
            .config
            .pair(pair_id)
            .ok_or_else(|| PlaceOrderError::InvalidPair(pair_id.to_string()))?
            .clone();

        let amount = pair
            .round_amount(amount)
            .filter(|a| *a >= pair.min_amount)
            .ok_or_else(|| PlaceOrderError::BelowMinimumAmount {
                amount: pair.round_amount(amount).unwrap_or_default(),
                min: pair.min_amount,
            })?;
        let price = match kind {
            OrderKind::Limit => pair
                .round_price(price)
                .ok_or(PlaceOrderError::InvalidPrice)?,
            OrderKind::Market => Price::zero(),
        };

        let now = self.now_ms();
        let id = self.store.mint_id();
        let order = Order::new(
            id,
            pair.id.clone(),
            side,
            kind,
            price,
            amount,
            owner,
            now,
            synthetic,
        );
        let fallback = order.clone();
        self.store.insert(order);

        let trades = match_order(&mut self.store, &pair, id, &mut self.trades, now);
        debug!(
            order = %id,
            pair = %pair.id,
            ?side,
            ?kind,
            fills = trades.len(),
            synthetic,
            "order placed"
        );
        self.after_match(&pair, id, &trades);

        Ok(self.store.get(id).cloned().unwrap_or(fallback))
    }

    /// Publish the fan-out for a completed matching pass.
    fn after_match(&mut self, pair: &TradingPair, taker_id: OrderId, trades: &[Trade]) {
        if let Some(taker) = self.store.get(taker_id) {
            self.bus.publish(&EngineEvent::Order(taker.clone()));
        }
        for trade in trades {
            if let Some(maker) = self.store.get(trade.maker) {
                self.bus.publish(&EngineEvent::Order(maker.clone()));
            }
            self.bus.publish(&EngineEvent::Trade(trade.clone()));
            let updated = self.candles.record(trade, &self.config.timeframes);
            for (timeframe, candle) in updated {
                self.bus.publish(&EngineEvent::Candle {
                    pair: pair.id.clone(),
                    timeframe,
                    candle,
                });
            }
        }
        self.publish_book(&pair.id);
        if !trades.is_empty() {
            if let Some(ticker) = self.ticker(&pair.id) {
                self.bus.publish(&EngineEvent::Ticker(ticker));
            }
        }
    }

    fn publish_book(&self, pair: &PairId) {
        self.bus.publish(&EngineEvent::OrderBook {
            pair: pair.clone(),
            book: self.order_book(pair, 20),
        });
    }

    // ── Read side ───────────────────────────────────────────────────

    /// Depth view of a pair's book. `depth` of 0 means unbounded.
    pub fn order_book(&self, pair: &PairId, depth: usize) -> BookView {
        BookView::build(
            self.store.resting_orders(pair),
            self.trades.last_price(pair),
            depth,
        )
    }

    /// Most recent trades, newest-first.
    pub fn trades(&self, pair: &PairId, limit: usize) -> Vec<Trade> {
        self.trades.recent(pair, limit)
    }

    /// Retained candles for a pair/timeframe, oldest-first.
    pub fn candles(&self, pair: &PairId, timeframe: &str) -> Vec<Candle> {
        self.candles.candles(pair, timeframe)
    }

    /// A caller's own (non-synthetic) orders, newest-first.
    pub fn user_orders(&self, owner: &OwnerId, pair: Option<&PairId>) -> Vec<Order> {
        self.store.orders_by_owner(owner, pair)
    }

    /// Rolling 24h statistics. None for an unknown pair.
    pub fn ticker(&self, pair_id: &PairId) -> Option<Ticker> {
        let pair = self.config.pair(pair_id)?;
        let now = self.now_ms();
        let window = self.trades.since(pair_id, ticker::window_start(now));
        let recent = self.trades.recent(pair_id, 2);
        let book = self.order_book(pair_id, 1);
        Some(ticker::compute(
            pair,
            &window,
            (recent.first(), recent.get(1)),
            &book,
        ))
    }

    // ── Events ──────────────────────────────────────────────────────

    pub fn subscribe<F>(&mut self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&EngineEvent) + 'static,
    {
        self.bus.subscribe(kind, callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    // ── Scheduling ──────────────────────────────────────────────────

    /// Pump the maker schedule: fire at most one due tick. Returns
    /// whether a tick ran.
    pub fn drive(&mut self) -> bool {
        let now = self.now_ms();
        if !self.scheduler.poll(now, &mut self.rng) {
            return false;
        }
        self.run_maker_tick(now);
        true
    }

    /// Stop the maker schedule. Idempotent.
    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    /// Re-arm the maker schedule.
    pub fn start(&mut self) {
        let now = self.now_ms();
        self.scheduler.start(now, &mut self.rng);
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Clear all state, delete the snapshot, reseed, restart the
    /// schedule.
    pub fn reset(&mut self) {
        let now = self.now_ms();
        self.store = OrderStore::new();
        self.trades = TradeLog::new(self.config.trade_cap, self.config.trade_floor);
        self.candles = CandleAggregator::new(self.config.candle_cap, self.config.candle_floor);
        self.snapshots.delete();
        self.rng = ChaCha8Rng::seed_from_u64(self.config.rng_seed);
        self.seed_markets(now);
        self.scheduler.start(now, &mut self.rng);
        info!("engine reset");
    }

    /// Synchronous best-effort snapshot. Failures are logged, never
    /// surfaced.
    pub fn force_save(&mut self) {
        let now = self.now_ms();
        let state = self.collect_snapshot(now);
        match Snapshot::new(state, now) {
            Ok(snapshot) => {
                if let Err(err) = self.snapshots.save(&snapshot) {
                    warn!(error = %err, "snapshot save failed");
                }
            }
            Err(err) => warn!(error = %err, "snapshot encode failed"),
        }
    }

    fn seed_markets(&mut self, now: i64) {
        let pairs = self.config.pairs.clone();
        for pair in &pairs {
            self.candles.seed_pair(
                pair,
                &self.config.timeframes,
                self.config.seed_history,
                now,
                &mut self.rng,
            );
        }
    }

    fn collect_snapshot(&self, now: i64) -> SnapshotState {
        let age_cutoff = now - self.config.snapshot_order_age_ms;
        let mut orders: Vec<Order> = self
            .store
            .iter()
            .filter(|o| o.is_active() || (!o.synthetic && o.created_at >= age_cutoff))
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.id);

        let mut trades = Vec::new();
        for pair in &self.config.pairs {
            let mut recent = self.trades.recent(&pair.id, self.config.snapshot_trade_limit);
            recent.reverse();
            trades.extend(recent);
        }
        trades.sort_by_key(|t| t.id);

        SnapshotState {
            orders,
            trades,
            candles: self.candles.export(self.config.snapshot_candle_limit),
        }
    }

    // ── Market maker execution ──────────────────────────────────────

    fn run_maker_tick(&mut self, now: i64) {
        let views = self.pair_views(now);
        let Some(plan) = self.maker.plan(&views, &mut self.rng) else {
            return;
        };
        let owner = self.config.maker.owner.clone();

        match plan.action {
            Some(MakerAction::Quote {
                side,
                price,
                amount,
            }) => {
                if let Err(err) = self.submit(
                    &plan.pair,
                    side,
                    OrderKind::Limit,
                    price.as_decimal(),
                    amount.as_decimal(),
                    owner,
                    true,
                ) {
                    debug!(pair = %plan.pair, error = %err, "maker quote rejected");
                }
            }
            Some(MakerAction::Take { side, amount }) => {
                if let Err(err) = self.submit(
                    &plan.pair,
                    side,
                    OrderKind::Market,
                    Decimal::ZERO,
                    amount.as_decimal(),
                    owner,
                    true,
                ) {
                    debug!(pair = %plan.pair, error = %err, "maker take rejected");
                }
            }
            Some(MakerAction::Cleanup) => self.run_cleanup(&plan.pair, now),
            Some(MakerAction::Replenish) => self.run_replenish(&plan.pair, now),
            None => {}
        }

        if plan.run_gc {
            self.store
                .gc_synthetic(now, self.config.maker.gc_retention_ms);
        }
        if plan.run_save {
            self.force_save();
        }
    }

    fn run_cleanup(&mut self, pair: &PairId, now: i64) {
        let cutoff = now - self.config.maker.stale_age_ms;
        let stale = self.store.stale_synthetic(pair, cutoff);
        let limit = self.config.maker.cancel_limit;
        for id in stale.into_iter().take(limit) {
            self.cancel_order(id);
        }
    }

    fn run_replenish(&mut self, pair: &PairId, now: i64) {
        let Some(view) = self.pair_view(pair, now) else {
            return;
        };
        let owner = self.config.maker.owner.clone();
        let rungs = self.maker.build_ladder(&view, &mut self.rng);
        for (side, price, amount) in rungs {
            if let Err(err) = self.submit(
                pair,
                side,
                OrderKind::Limit,
                price.as_decimal(),
                amount.as_decimal(),
                owner.clone(),
                true,
            ) {
                debug!(pair = %pair, error = %err, "ladder rung rejected");
            }
        }
    }

    fn pair_views(&self, now: i64) -> Vec<PairView> {
        self.config
            .pairs
            .iter()
            .filter_map(|p| self.pair_view(&p.id, now))
            .collect()
    }

    fn pair_view(&self, pair_id: &PairId, now: i64) -> Option<PairView> {
        let pair = self.config.pair(pair_id)?.clone();
        let book = self.order_book(pair_id, 0);
        let last_price = self
            .trades
            .last_price(pair_id)
            .unwrap_or(pair.seed_price);
        let cutoff = now - self.config.maker.stale_age_ms;
        Some(PairView {
            last_price,
            mid_price: book.mid_price(),
            bid_levels: book.bids.len(),
            ask_levels: book.asks.len(),
            stale_synthetic: self.store.stale_synthetic(pair_id, cutoff).len(),
            pair,
        })
    }
}
