//! Engine configuration
//!
//! Everything the engine treats as tunable: the pair set, candle
//! timeframes, retention caps, snapshot staleness, and the market
//! maker's cadence and action weights. Constructed once and injected
//! into [`crate::ExchangeEngine::new`]; there is no ambient global
//! configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use types::ids::{OwnerId, PairId};
use types::numeric::{Price, Quantity};
use types::pair::TradingPair;

/// A candle timeframe: display label plus bucket duration in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeframe {
    pub label: String,
    pub secs: i64,
}

impl Timeframe {
    pub fn new(label: impl Into<String>, secs: i64) -> Self {
        assert!(secs > 0, "timeframe duration must be positive");
        Self {
            label: label.into(),
            secs,
        }
    }

    /// Align a millisecond timestamp to this timeframe's bucket start
    /// (epoch seconds, floored).
    pub fn bucket_start(&self, ts_ms: i64) -> i64 {
        (ts_ms / 1000).div_euclid(self.secs) * self.secs
    }
}

/// Market maker tunables: cadence, action weights, and sizing.
///
/// Weights need not sum to exactly 1.0; they are normalized when drawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MakerConfig {
    /// Owner identifier attached to all synthetic orders.
    pub owner: OwnerId,
    /// Jittered tick interval bounds (milliseconds).
    pub tick_min_ms: u64,
    pub tick_max_ms: u64,
    /// Action weights: resting quote / market take / cleanup / replenish.
    pub quote_weight: f64,
    pub take_weight: f64,
    pub cleanup_weight: f64,
    pub replenish_weight: f64,
    /// Quote price offset range from last price, in percent.
    pub quote_offset_min_pct: f64,
    pub quote_offset_max_pct: f64,
    /// Order sizes are `min_amount × U(1, mult)`.
    pub quote_size_max_mult: f64,
    pub take_size_max_mult: f64,
    /// Cleanup: cancel up to `cancel_limit` synthetic orders older than
    /// `stale_age_ms` once more than `stale_threshold` of them exist.
    pub stale_age_ms: i64,
    pub stale_threshold: usize,
    pub cancel_limit: usize,
    /// Replenish when a book side has fewer than `min_levels` levels;
    /// the reseeded ladder has `ladder_levels` per side spaced
    /// `ladder_step_pct` percent apart.
    pub min_levels: usize,
    pub ladder_levels: usize,
    pub ladder_step_pct: f64,
    /// Per-tick probability of a synthetic-order garbage-collection pass
    /// and its retention window.
    pub gc_probability: f64,
    pub gc_retention_ms: i64,
    /// Per-tick probability of an opportunistic snapshot save.
    pub save_probability: f64,
}

impl Default for MakerConfig {
    fn default() -> Self {
        Self {
            owner: OwnerId::new("market-maker"),
            tick_min_ms: 1_500,
            tick_max_ms: 5_000,
            quote_weight: 0.30,
            take_weight: 0.35,
            cleanup_weight: 0.15,
            replenish_weight: 0.20,
            quote_offset_min_pct: 0.05,
            quote_offset_max_pct: 0.55,
            quote_size_max_mult: 25.0,
            take_size_max_mult: 10.0,
            stale_age_ms: 120_000,
            stale_threshold: 15,
            cancel_limit: 5,
            min_levels: 8,
            ladder_levels: 8,
            ladder_step_pct: 0.1,
            gc_probability: 0.05,
            gc_retention_ms: 600_000,
            save_probability: 0.10,
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub pairs: Vec<TradingPair>,
    pub timeframes: Vec<Timeframe>,
    /// Candles seeded per (pair, timeframe) on a cold start.
    pub seed_history: usize,
    /// Trade log retention: prune to `trade_floor` once `trade_cap` is
    /// exceeded.
    pub trade_cap: usize,
    pub trade_floor: usize,
    /// Candle retention per (pair, timeframe).
    pub candle_cap: usize,
    pub candle_floor: usize,
    /// Snapshot file path (the fixed "storage key").
    pub snapshot_path: PathBuf,
    /// Snapshots older than this are discarded on load.
    pub snapshot_max_age_ms: i64,
    /// Bounds on what a snapshot carries.
    pub snapshot_trade_limit: usize,
    pub snapshot_candle_limit: usize,
    /// Terminal non-synthetic orders younger than this are persisted.
    pub snapshot_order_age_ms: i64,
    pub maker: MakerConfig,
    /// Seed for all engine randomness (candle seeding, maker draws,
    /// scheduler jitter). Same seed + same driven time ⇒ same activity.
    pub rng_seed: u64,
}

impl EngineConfig {
    /// Look up a pair's static config.
    pub fn pair(&self, id: &PairId) -> Option<&TradingPair> {
        self.pairs.iter().find(|p| &p.id == id)
    }

    /// Look up a timeframe by label.
    pub fn timeframe(&self, label: &str) -> Option<&Timeframe> {
        self.timeframes.iter().find(|tf| tf.label == label)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pairs: vec![
                TradingPair::new(
                    "ETH/USDC",
                    2,
                    4,
                    Quantity::from_str("0.001").unwrap(),
                    Price::from_u64(3200),
                ),
                TradingPair::new(
                    "BTC/USDC",
                    2,
                    5,
                    Quantity::from_str("0.0001").unwrap(),
                    Price::from_u64(64000),
                ),
                TradingPair::new(
                    "SOL/USDC",
                    3,
                    2,
                    Quantity::from_str("0.01").unwrap(),
                    Price::from_u64(145),
                ),
            ],
            timeframes: vec![
                Timeframe::new("1m", 60),
                Timeframe::new("5m", 300),
                Timeframe::new("15m", 900),
                Timeframe::new("1h", 3_600),
                Timeframe::new("4h", 14_400),
                Timeframe::new("1d", 86_400),
            ],
            seed_history: 120,
            trade_cap: 2_000,
            trade_floor: 1_500,
            candle_cap: 600,
            candle_floor: 500,
            snapshot_path: PathBuf::from("exchange-sim.snapshot"),
            snapshot_max_age_ms: 3_600_000,
            snapshot_trade_limit: 500,
            snapshot_candle_limit: 500,
            snapshot_order_age_ms: 86_400_000,
            maker: MakerConfig::default(),
            rng_seed: 0x5eed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_start_floors_to_boundary() {
        let tf = Timeframe::new("1m", 60);
        // 05:30 into the epoch minute grid
        assert_eq!(tf.bucket_start(330_000), 300);
        assert_eq!(tf.bucket_start(359_999), 300);
        assert_eq!(tf.bucket_start(360_000), 360);
    }

    #[test]
    fn test_default_config_lookups() {
        let config = EngineConfig::default();
        assert!(config.pair(&PairId::new("ETH/USDC")).is_some());
        assert!(config.pair(&PairId::new("FOO/BAR")).is_none());
        assert_eq!(config.timeframe("1m").unwrap().secs, 60);
        assert!(config.timeframe("7m").is_none());
    }

    #[test]
    #[should_panic(expected = "timeframe duration must be positive")]
    fn test_zero_duration_timeframe_panics() {
        Timeframe::new("bad", 0);
    }
}
