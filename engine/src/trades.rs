//! Bounded per-pair trade log
//!
//! Append-only record of executions, newest retained. Each pair keeps at
//! most `cap` trades; when the cap is exceeded the log prunes down to
//! `floor` in one pass rather than shifting one element per append.

use std::collections::{HashMap, VecDeque};

use tracing::trace;
use types::ids::{PairId, TradeId};
use types::trade::Trade;

/// Per-pair bounded trade history with monotonic trade ids.
#[derive(Debug)]
pub struct TradeLog {
    by_pair: HashMap<PairId, VecDeque<Trade>>,
    next_id: u64,
    cap: usize,
    floor: usize,
}

impl TradeLog {
    pub fn new(cap: usize, floor: usize) -> Self {
        assert!(floor <= cap, "trade floor must not exceed cap");
        Self {
            by_pair: HashMap::new(),
            next_id: 1,
            cap,
            floor,
        }
    }

    /// Mint the next trade id.
    pub fn mint_id(&mut self) -> TradeId {
        let id = TradeId::from_raw(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append an executed trade, pruning if the pair's log exceeds cap.
    pub fn push(&mut self, trade: Trade) {
        if trade.id.as_u64() >= self.next_id {
            self.next_id = trade.id.as_u64() + 1;
        }
        let log = self.by_pair.entry(trade.pair.clone()).or_default();
        log.push_back(trade);
        if log.len() > self.cap {
            let excess = log.len() - self.floor;
            log.drain(..excess);
            trace!(pruned = excess, "trade log pruned to floor");
        }
    }

    /// Most recent trades for a pair, newest-first, up to `limit`
    /// (0 means all retained).
    pub fn recent(&self, pair: &PairId, limit: usize) -> Vec<Trade> {
        let Some(log) = self.by_pair.get(pair) else {
            return Vec::new();
        };
        let take = if limit == 0 { log.len() } else { limit };
        log.iter().rev().take(take).cloned().collect()
    }

    /// Last execution price for a pair.
    pub fn last_price(&self, pair: &PairId) -> Option<types::numeric::Price> {
        self.by_pair
            .get(pair)
            .and_then(|log| log.back())
            .map(|t| t.price)
    }

    /// Trades for a pair executed at or after `since_ms`, oldest-first.
    /// The ticker's 24h window reads through this.
    pub fn since(&self, pair: &PairId, since_ms: i64) -> Vec<&Trade> {
        self.by_pair
            .get(pair)
            .map(|log| log.iter().filter(|t| t.executed_at >= since_ms).collect())
            .unwrap_or_default()
    }

    pub fn len(&self, pair: &PairId) -> usize {
        self.by_pair.get(pair).map_or(0, |log| log.len())
    }

    pub fn is_empty(&self) -> bool {
        self.by_pair.values().all(|log| log.is_empty())
    }

    /// Drop all retained trades. Id minting continues where it left off.
    pub fn clear(&mut self) {
        self.by_pair.clear();
    }

    /// Restore retained trades from a snapshot (oldest-first per pair).
    pub fn restore(&mut self, trades: Vec<Trade>) {
        let mut trades = trades;
        trades.sort_by_key(|t| t.id);
        for trade in trades {
            self.push(trade);
        }
    }
}
