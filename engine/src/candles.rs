//! OHLCV candle aggregation
//!
//! Builds rolling OHLCV candles from executed trades across every
//! configured timeframe simultaneously. Bucket boundaries are aligned to
//! epoch seconds. Each timeframe aggregates trades independently; no
//! timeframe is derived from another.
//!
//! Cold starts are seeded with a deterministic random-walk history per
//! (pair, timeframe) so charts have depth before the first real trade.

use std::collections::BTreeMap;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::ids::PairId;
use types::pair::TradingPair;
use types::trade::Trade;

use crate::config::Timeframe;

/// A single OHLCV bucket. `bucket` is the start time in epoch seconds,
/// aligned to the timeframe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub bucket: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    /// Open a bucket from its first trade.
    fn open_at(bucket: i64, price: Decimal, amount: Decimal) -> Self {
        Self {
            bucket,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: amount,
        }
    }

    /// Fold another trade into this bucket.
    fn update(&mut self, price: Decimal, amount: Decimal) {
        if price > self.high {
            self.high = price;
        }
        if price < self.low {
            self.low = price;
        }
        self.close = price;
        self.volume += amount;
    }

    /// OHLC consistency: low ≤ open, close ≤ high.
    pub fn is_consistent(&self) -> bool {
        self.low <= self.open
            && self.low <= self.close
            && self.high >= self.open
            && self.high >= self.close
    }
}

/// Multi-timeframe candle store, one oldest-first series per
/// (pair, timeframe label).
#[derive(Debug)]
pub struct CandleAggregator {
    series: BTreeMap<(PairId, String), Vec<Candle>>,
    cap: usize,
    floor: usize,
}

impl CandleAggregator {
    pub fn new(cap: usize, floor: usize) -> Self {
        assert!(floor <= cap, "candle floor must not exceed cap");
        Self {
            series: BTreeMap::new(),
            cap,
            floor,
        }
    }

    /// Fold one executed trade into every timeframe's current bucket.
    /// Returns the updated candle per timeframe label, for publishing.
    pub fn record(&mut self, trade: &Trade, timeframes: &[Timeframe]) -> Vec<(String, Candle)> {
        let mut updated = Vec::with_capacity(timeframes.len());
        for tf in timeframes {
            let bucket = tf.bucket_start(trade.executed_at);
            let key = (trade.pair.clone(), tf.label.clone());
            let series = self.series.entry(key).or_default();

            let candle = match series.last_mut() {
                Some(last) if last.bucket == bucket => {
                    last.update(trade.price.as_decimal(), trade.amount.as_decimal());
                    last.clone()
                }
                _ => {
                    let fresh = Candle::open_at(
                        bucket,
                        trade.price.as_decimal(),
                        trade.amount.as_decimal(),
                    );
                    series.push(fresh.clone());
                    if series.len() > self.cap {
                        let excess = series.len() - self.floor;
                        series.drain(..excess);
                    }
                    fresh
                }
            };
            updated.push((tf.label.clone(), candle));
        }
        updated
    }

    /// Full retained series for a pair/timeframe, oldest-first.
    pub fn candles(&self, pair: &PairId, label: &str) -> Vec<Candle> {
        self.series
            .get(&(pair.clone(), label.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Last close for a pair on the finest timeframe that has data.
    pub fn last_close(&self, pair: &PairId, label: &str) -> Option<Decimal> {
        self.series
            .get(&(pair.clone(), label.to_string()))
            .and_then(|s| s.last())
            .map(|c| c.close)
    }

    /// Seed a deterministic random-walk history for one pair across all
    /// timeframes. Each timeframe walks independently, ending at the
    /// current bucket in the neighborhood of the pair's seed price.
    pub fn seed_pair(
        &mut self,
        pair: &TradingPair,
        timeframes: &[Timeframe],
        seed_len: usize,
        now_ms: i64,
        rng: &mut ChaCha8Rng,
    ) {
        if seed_len == 0 {
            return;
        }
        for tf in timeframes {
            let series = self.walk(pair, tf, seed_len, now_ms, rng);
            self.series
                .insert((pair.id.clone(), tf.label.clone()), series);
        }
        debug!(pair = %pair.id, buckets = seed_len, "seeded candle history");
    }

    fn walk(
        &self,
        pair: &TradingPair,
        tf: &Timeframe,
        seed_len: usize,
        now_ms: i64,
        rng: &mut ChaCha8Rng,
    ) -> Vec<Candle> {
        let end_bucket = tf.bucket_start(now_ms);
        let seed = pair.seed_price.as_decimal();
        let mut series = Vec::with_capacity(seed_len);
        // Walk forward from the oldest bucket toward now so the final
        // close lands near the seed price.
        let mut price = seed * drift_factor(rng, 0.05);
        for i in 0..seed_len {
            let bucket = end_bucket - ((seed_len - 1 - i) as i64) * tf.secs;
            let open = price;
            let close = open * drift_factor(rng, 0.004);
            let body_high = open.max(close);
            let body_low = open.min(close);
            let high = body_high * drift_up(rng, 0.002);
            let low = body_low * drift_down(rng, 0.002);
            let volume = Decimal::from_f64(rng.gen_range(0.5..50.0))
                .unwrap_or(Decimal::ONE)
                .round_dp(pair.amount_dp);
            series.push(Candle {
                bucket,
                open: open.round_dp(pair.price_dp),
                high: high.round_dp(pair.price_dp),
                low: low.round_dp(pair.price_dp),
                close: close.round_dp(pair.price_dp),
                volume,
            });
            price = close;
        }
        series
    }

    /// Drop all retained series.
    pub fn clear(&mut self) {
        self.series.clear();
    }

    /// Snapshot export: last `limit` candles per series.
    pub fn export(&self, limit: usize) -> Vec<((PairId, String), Vec<Candle>)> {
        self.series
            .iter()
            .map(|(key, series)| {
                let skip = series.len().saturating_sub(limit);
                (key.clone(), series[skip..].to_vec())
            })
            .collect()
    }

    /// Restore exported series, replacing whatever is held.
    pub fn restore(&mut self, entries: Vec<((PairId, String), Vec<Candle>)>) {
        self.series.clear();
        for (key, series) in entries {
            self.series.insert(key, series);
        }
    }
}

fn drift_factor(rng: &mut ChaCha8Rng, max_pct: f64) -> Decimal {
    let f = 1.0 + rng.gen_range(-max_pct..max_pct);
    Decimal::from_f64(f).unwrap_or(Decimal::ONE)
}

fn drift_up(rng: &mut ChaCha8Rng, max_pct: f64) -> Decimal {
    let f = 1.0 + rng.gen_range(0.0..max_pct);
    Decimal::from_f64(f).unwrap_or(Decimal::ONE)
}

fn drift_down(rng: &mut ChaCha8Rng, max_pct: f64) -> Decimal {
    let f = 1.0 - rng.gen_range(0.0..max_pct);
    Decimal::from_f64(f).unwrap_or(Decimal::ONE)
}
