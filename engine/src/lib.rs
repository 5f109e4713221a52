//! In-process exchange simulation engine
//!
//! Maintains a live order book, matches buy/sell orders, aggregates
//! executed trades into multi-timeframe candles, computes 24h ticker
//! statistics, and drives a synthetic market maker so a trading UI has
//! continuous, realistic activity without a real backend.
//!
//! The engine is single-threaded cooperative: every public operation runs
//! synchronously to completion, so each call is atomic with respect to
//! engine state. The market maker is driven by whoever owns the engine
//! via [`ExchangeEngine::drive`].
//!
//! # Modules
//! - `config`: trading pairs, timeframes, retention and maker tunables
//! - `store`: arena order store with monotonic integer ids
//! - `matching`: price-priority continuous matching
//! - `book`: derived depth view (bid/ask levels with cumulative totals)
//! - `trades`: bounded per-pair trade log
//! - `candles`: bucketed OHLCV aggregation with seeded history
//! - `ticker`: rolling 24h per-pair statistics
//! - `maker`: weighted-action synthetic market maker plus scheduler
//! - `events`: synchronous typed event bus with subscriber isolation
//! - `persist`: best-effort local snapshots with staleness rejection
//! - `engine`: the `ExchangeEngine` facade wiring everything together

pub mod book;
pub mod candles;
pub mod config;
pub mod engine;
pub mod events;
pub mod maker;
pub mod matching;
pub mod persist;
pub mod store;
pub mod ticker;
pub mod trades;

pub use engine::{Clock, ExchangeEngine};
