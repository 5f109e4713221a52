//! Synthetic market maker
//!
//! A scheduled background actor that keeps the simulation alive: it
//! quotes resting limit orders around the last price, crosses the book
//! with market orders to generate trades, cancels its own stale quotes,
//! and replenishes thin book sides with a fresh ladder.
//!
//! The maker is split into a pure planner and the engine-side executor:
//! `plan` inspects read-only pair views and draws one weighted action
//! from a seeded RNG, and the engine applies the resulting [`MakerPlan`]
//! through its normal placement/cancellation path. This keeps every draw
//! deterministic under a fixed seed and lets tests step the maker
//! without timers.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::trace;
use types::ids::PairId;
use types::numeric::{Price, Quantity};
use types::order::Side;
use types::pair::TradingPair;

use crate::config::MakerConfig;

/// Read-only per-pair inputs to one planning step.
#[derive(Debug, Clone)]
pub struct PairView {
    pub pair: TradingPair,
    pub last_price: Price,
    pub mid_price: Option<Price>,
    pub bid_levels: usize,
    pub ask_levels: usize,
    /// Open synthetic orders older than the staleness age.
    pub stale_synthetic: usize,
}

/// The single action drawn for a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum MakerAction {
    /// Rest a synthetic limit order.
    Quote {
        side: Side,
        price: Price,
        amount: Quantity,
    },
    /// Cross the book with a synthetic market order.
    Take { side: Side, amount: Quantity },
    /// Cancel the oldest stale synthetic orders.
    Cleanup,
    /// Reseed a symmetric ladder around the mid price.
    Replenish,
}

/// What the engine should execute for one tick.
#[derive(Debug, Clone)]
pub struct MakerPlan {
    pub pair: PairId,
    /// None when the drawn action's precondition does not hold
    /// (e.g. cleanup with nothing stale).
    pub action: Option<MakerAction>,
    pub run_gc: bool,
    pub run_save: bool,
}

/// Weighted-action planner. Holds tunables only; all randomness comes
/// from the RNG handed in per call.
#[derive(Debug)]
pub struct MarketMaker {
    config: MakerConfig,
}

impl MarketMaker {
    pub fn new(config: MakerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MakerConfig {
        &self.config
    }

    /// Plan one tick: draw a pair uniformly and exactly one weighted
    /// action against its view.
    pub fn plan(&self, views: &[PairView], rng: &mut ChaCha8Rng) -> Option<MakerPlan> {
        if views.is_empty() {
            return None;
        }
        let view = &views[rng.gen_range(0..views.len())];
        let action = self.draw_action(view, rng);
        let run_gc = rng.gen_bool(self.config.gc_probability);
        let run_save = rng.gen_bool(self.config.save_probability);
        trace!(pair = %view.pair.id, ?action, run_gc, run_save, "maker tick planned");
        Some(MakerPlan {
            pair: view.pair.id.clone(),
            action,
            run_gc,
            run_save,
        })
    }

    fn draw_action(&self, view: &PairView, rng: &mut ChaCha8Rng) -> Option<MakerAction> {
        let c = &self.config;
        let total = c.quote_weight + c.take_weight + c.cleanup_weight + c.replenish_weight;
        if total <= 0.0 {
            return None;
        }
        let roll = rng.gen_range(0.0..total);

        if roll < c.quote_weight {
            self.plan_quote(view, rng)
        } else if roll < c.quote_weight + c.take_weight {
            self.plan_take(view, rng)
        } else if roll < c.quote_weight + c.take_weight + c.cleanup_weight {
            (view.stale_synthetic > c.stale_threshold).then_some(MakerAction::Cleanup)
        } else {
            let thin = view.bid_levels < c.min_levels || view.ask_levels < c.min_levels;
            thin.then_some(MakerAction::Replenish)
        }
    }

    fn plan_quote(&self, view: &PairView, rng: &mut ChaCha8Rng) -> Option<MakerAction> {
        let side = random_side(rng);
        let offset_pct = rng.gen_range(self.config.quote_offset_min_pct..self.config.quote_offset_max_pct);
        // Buys quote below the last price, sells above.
        let signed = match side {
            Side::Buy => -offset_pct,
            Side::Sell => offset_pct,
        };
        let price = offset_price(view.last_price, signed, &view.pair)?;
        let amount = random_size(&view.pair, self.config.quote_size_max_mult, rng)?;
        Some(MakerAction::Quote {
            side,
            price,
            amount,
        })
    }

    fn plan_take(&self, view: &PairView, rng: &mut ChaCha8Rng) -> Option<MakerAction> {
        let side = random_side(rng);
        let amount = random_size(&view.pair, self.config.take_size_max_mult, rng)?;
        Some(MakerAction::Take { side, amount })
    }

    /// Build the replenishment ladder: `ladder_levels` per side stepped
    /// away from the mid (or last price when the book is empty).
    pub fn build_ladder(
        &self,
        view: &PairView,
        rng: &mut ChaCha8Rng,
    ) -> Vec<(Side, Price, Quantity)> {
        let center = view.mid_price.unwrap_or(view.last_price);
        let mut rungs = Vec::with_capacity(self.config.ladder_levels * 2);
        for level in 1..=self.config.ladder_levels {
            let step = self.config.ladder_step_pct * level as f64;
            for side in [Side::Buy, Side::Sell] {
                let signed = match side {
                    Side::Buy => -step,
                    Side::Sell => step,
                };
                let Some(price) = offset_price(center, signed, &view.pair) else {
                    continue;
                };
                let Some(amount) = random_size(&view.pair, self.config.quote_size_max_mult, rng)
                else {
                    continue;
                };
                rungs.push((side, price, amount));
            }
        }
        rungs
    }
}

fn random_side(rng: &mut ChaCha8Rng) -> Side {
    if rng.gen_bool(0.5) {
        Side::Buy
    } else {
        Side::Sell
    }
}

/// Shift `base` by `pct` percent and round to the pair's price precision.
fn offset_price(base: Price, pct: f64, pair: &TradingPair) -> Option<Price> {
    let factor = Decimal::from_f64(1.0 + pct / 100.0)?;
    pair.round_price(base.as_decimal() * factor)
}

/// Size as `min_amount × U(1, mult)`, truncated to the pair's precision.
fn random_size(pair: &TradingPair, max_mult: f64, rng: &mut ChaCha8Rng) -> Option<Quantity> {
    let mult = Decimal::from_f64(rng.gen_range(1.0..max_mult))?;
    let amount = pair.round_amount(pair.min_amount.as_decimal() * mult)?;
    (!amount.is_zero()).then_some(amount)
}

/// Jittered-interval tick scheduler.
///
/// Owns only the next due time; firing is driven by `poll` from whoever
/// owns the engine, so at most one tick is ever in flight.
#[derive(Debug)]
pub struct MakerScheduler {
    tick_min_ms: u64,
    tick_max_ms: u64,
    next_due: Option<i64>,
}

impl MakerScheduler {
    pub fn new(tick_min_ms: u64, tick_max_ms: u64) -> Self {
        assert!(tick_min_ms <= tick_max_ms, "tick interval bounds inverted");
        Self {
            tick_min_ms,
            tick_max_ms,
            next_due: None,
        }
    }

    /// Arm the schedule. Restarting an armed scheduler re-draws the
    /// interval.
    pub fn start(&mut self, now_ms: i64, rng: &mut ChaCha8Rng) {
        self.next_due = Some(now_ms + self.jitter(rng));
    }

    /// Clear the pending tick. Idempotent.
    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Fire at most one due tick and re-arm. Returns whether a tick
    /// fired.
    pub fn poll(&mut self, now_ms: i64, rng: &mut ChaCha8Rng) -> bool {
        match self.next_due {
            Some(due) if now_ms >= due => {
                self.next_due = Some(now_ms + self.jitter(rng));
                true
            }
            _ => false,
        }
    }

    fn jitter(&self, rng: &mut ChaCha8Rng) -> i64 {
        rng.gen_range(self.tick_min_ms..=self.tick_max_ms) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn pair() -> TradingPair {
        TradingPair::new(
            "ETH/USDC",
            2,
            4,
            Quantity::from_str("0.001").unwrap(),
            Price::from_u64(3200),
        )
    }

    fn view(bid_levels: usize, ask_levels: usize, stale: usize) -> PairView {
        PairView {
            pair: pair(),
            last_price: Price::from_u64(3200),
            mid_price: Some(Price::from_u64(3200)),
            bid_levels,
            ask_levels,
            stale_synthetic: stale,
        }
    }

    #[test]
    fn test_plan_is_deterministic_under_seed() {
        let maker = MarketMaker::new(MakerConfig::default());
        let views = vec![view(10, 10, 0)];

        let mut a = ChaCha8Rng::seed_from_u64(42);
        let mut b = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..20 {
            let pa = maker.plan(&views, &mut a).unwrap();
            let pb = maker.plan(&views, &mut b).unwrap();
            assert_eq!(pa.action, pb.action);
            assert_eq!(pa.run_gc, pb.run_gc);
            assert_eq!(pa.run_save, pb.run_save);
        }
    }

    #[test]
    fn test_quote_prices_straddle_last() {
        let maker = MarketMaker::new(MakerConfig::default());
        let views = vec![view(10, 10, 0)];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let last = Price::from_u64(3200);

        let mut quotes = 0;
        for _ in 0..200 {
            if let Some(MakerAction::Quote { side, price, amount }) =
                maker.plan(&views, &mut rng).and_then(|p| p.action)
            {
                quotes += 1;
                match side {
                    Side::Buy => assert!(price < last),
                    Side::Sell => assert!(price > last),
                }
                assert!(amount >= pair().min_amount);
            }
        }
        assert!(quotes > 0);
    }

    #[test]
    fn test_cleanup_requires_stale_backlog() {
        let mut config = MakerConfig::default();
        // Force the cleanup branch.
        config.quote_weight = 0.0;
        config.take_weight = 0.0;
        config.replenish_weight = 0.0;
        config.cleanup_weight = 1.0;
        let maker = MarketMaker::new(config);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let plan = maker.plan(&[view(10, 10, 0)], &mut rng).unwrap();
        assert_eq!(plan.action, None);

        let plan = maker.plan(&[view(10, 10, 16)], &mut rng).unwrap();
        assert_eq!(plan.action, Some(MakerAction::Cleanup));
    }

    #[test]
    fn test_replenish_requires_thin_side() {
        let mut config = MakerConfig::default();
        config.quote_weight = 0.0;
        config.take_weight = 0.0;
        config.cleanup_weight = 0.0;
        config.replenish_weight = 1.0;
        let maker = MarketMaker::new(config);
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        let plan = maker.plan(&[view(8, 8, 0)], &mut rng).unwrap();
        assert_eq!(plan.action, None);

        let plan = maker.plan(&[view(8, 3, 0)], &mut rng).unwrap();
        assert_eq!(plan.action, Some(MakerAction::Replenish));
    }

    #[test]
    fn test_zero_weights_plan_without_panicking() {
        let mut config = MakerConfig::default();
        config.quote_weight = 0.0;
        config.take_weight = 0.0;
        config.cleanup_weight = 0.0;
        config.replenish_weight = 0.0;
        let maker = MarketMaker::new(config);
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        let plan = maker.plan(&[view(0, 0, 20)], &mut rng).unwrap();
        assert_eq!(plan.action, None);
    }

    #[test]
    fn test_ladder_shape() {
        let maker = MarketMaker::new(MakerConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let v = view(0, 0, 0);
        let rungs = maker.build_ladder(&v, &mut rng);

        let levels = maker.config().ladder_levels;
        assert_eq!(rungs.len(), levels * 2);
        let mid = Price::from_u64(3200);
        for (side, price, amount) in &rungs {
            match side {
                Side::Buy => assert!(*price < mid),
                Side::Sell => assert!(*price > mid),
            }
            assert!(!amount.is_zero());
        }
    }

    #[test]
    fn test_scheduler_fires_within_jitter_bounds() {
        let mut sched = MakerScheduler::new(1_500, 5_000);
        let mut rng = ChaCha8Rng::seed_from_u64(6);

        assert!(!sched.poll(0, &mut rng));
        sched.start(0, &mut rng);
        assert!(sched.is_running());

        // Never due before the minimum interval.
        assert!(!sched.poll(1_499, &mut rng));
        // Always due by the maximum.
        assert!(sched.poll(5_000, &mut rng));
        // One fire per due window.
        assert!(!sched.poll(5_000, &mut rng));
    }

    #[test]
    fn test_scheduler_stop_is_idempotent() {
        let mut sched = MakerScheduler::new(1_500, 5_000);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        sched.start(0, &mut rng);
        sched.stop();
        sched.stop();
        assert!(!sched.is_running());
        assert!(!sched.poll(100_000, &mut rng));
    }
}
