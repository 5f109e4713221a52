//! Arena order store
//!
//! Authoritative owner of all orders. Storage is a dense slot table with
//! a free list; ids are minted monotonically and never reused, and a
//! per-pair index preserves insertion order. Matching relies on that
//! order as its FIFO tie-break among equal prices.

use std::collections::HashMap;

use tracing::debug;
use types::ids::{OrderId, OwnerId, PairId};
use types::order::Order;

/// Order store with arena slot storage and per-pair insertion indexes.
#[derive(Debug)]
pub struct OrderStore {
    slots: Vec<Option<Order>>,
    free: Vec<usize>,
    by_id: HashMap<OrderId, usize>,
    /// Order ids per pair, in insertion order.
    by_pair: HashMap<PairId, Vec<OrderId>>,
    next_id: u64,
}

impl OrderStore {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            by_id: HashMap::new(),
            by_pair: HashMap::new(),
            next_id: 1,
        }
    }

    /// Mint the next order id.
    pub fn mint_id(&mut self) -> OrderId {
        let id = OrderId::from_raw(self.next_id);
        self.next_id += 1;
        id
    }

    /// Insert a validated order. The id must be unused.
    pub fn insert(&mut self, order: Order) {
        assert!(
            !self.by_id.contains_key(&order.id),
            "duplicate order id {}",
            order.id
        );
        if order.id.as_u64() >= self.next_id {
            self.next_id = order.id.as_u64() + 1;
        }

        let id = order.id;
        let pair = order.pair.clone();
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(order);
                slot
            }
            None => {
                self.slots.push(Some(order));
                self.slots.len() - 1
            }
        };
        self.by_id.insert(id, slot);
        self.by_pair.entry(pair).or_default().push(id);
    }

    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.by_id
            .get(&id)
            .and_then(|&slot| self.slots[slot].as_ref())
    }

    /// Mutable access for the matching engine, the sole writer of fill
    /// state.
    pub(crate) fn get_mut(&mut self, id: OrderId) -> Option<&mut Order> {
        let slot = *self.by_id.get(&id)?;
        self.slots[slot].as_mut()
    }

    /// Cancel an open/partial order, zeroing remaining.
    ///
    /// Returns false (not an error) when the order is missing or already
    /// terminal.
    pub fn cancel(&mut self, id: OrderId) -> bool {
        match self.get_mut(id) {
            Some(order) => order.cancel(),
            None => false,
        }
    }

    /// All open/partial orders for a pair, in insertion order.
    pub fn open_orders(&self, pair: &PairId) -> Vec<&Order> {
        self.pair_orders(pair).filter(|o| o.is_active()).collect()
    }

    /// Resting limit orders for a pair (the book), in insertion order.
    pub fn resting_orders(&self, pair: &PairId) -> Vec<&Order> {
        self.pair_orders(pair).filter(|o| o.is_resting()).collect()
    }

    /// A caller's non-synthetic orders, newest-first.
    pub fn orders_by_owner(&self, owner: &OwnerId, pair: Option<&PairId>) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .iter()
            .filter(|o| !o.synthetic && &o.owner == owner)
            .filter(|o| pair.map_or(true, |p| &o.pair == p))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        orders
    }

    /// Iterate all live orders.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    /// Number of live orders.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Open synthetic orders for a pair created before `cutoff_ms`,
    /// oldest-first. Used by the market maker's cleanup action.
    pub fn stale_synthetic(&self, pair: &PairId, cutoff_ms: i64) -> Vec<OrderId> {
        let mut stale: Vec<&Order> = self
            .pair_orders(pair)
            .filter(|o| o.synthetic && o.is_active() && o.created_at < cutoff_ms)
            .collect();
        stale.sort_by_key(|o| (o.created_at, o.id));
        stale.iter().map(|o| o.id).collect()
    }

    /// Hard-delete terminal synthetic orders older than the retention
    /// window. Returns the number of orders collected.
    pub fn gc_synthetic(&mut self, now_ms: i64, retention_ms: i64) -> usize {
        let cutoff = now_ms - retention_ms;
        let doomed: Vec<OrderId> = self
            .iter()
            .filter(|o| o.synthetic && o.status.is_terminal() && o.created_at < cutoff)
            .map(|o| o.id)
            .collect();

        for id in &doomed {
            self.remove(*id);
        }
        if !doomed.is_empty() {
            debug!(count = doomed.len(), "collected terminal synthetic orders");
        }
        doomed.len()
    }

    /// Restore orders from a snapshot.
    pub fn restore(&mut self, orders: Vec<Order>) {
        let mut orders = orders;
        // Insertion order by id reproduces original placement order.
        orders.sort_by_key(|o| o.id);
        for order in orders {
            self.insert(order);
        }
    }

    fn pair_orders<'a>(&'a self, pair: &PairId) -> impl Iterator<Item = &'a Order> + 'a {
        self.by_pair
            .get(pair)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(|id| self.get(*id))
    }

    fn remove(&mut self, id: OrderId) {
        if let Some(slot) = self.by_id.remove(&id) {
            let order = self.slots[slot].take();
            self.free.push(slot);
            if let Some(order) = order {
                if let Some(ids) = self.by_pair.get_mut(&order.pair) {
                    ids.retain(|&other| other != id);
                }
            }
        }
    }
}
