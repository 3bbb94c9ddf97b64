//! Popularity Tracker (spec.md §4.4): a single sorted set, `token_counter`,
//! scored by cumulative read + admission count. This module only names the
//! operations; the scoring itself lives in `PriceStore::pop_incr` /
//! `pop_range_rev` since the set is globally shared store state, not
//! in-process state the engine owns.

use std::sync::Arc;

use crate::config::TOKEN_COUNTER_KEY;
use crate::error::Result;
use crate::store::PriceStore;

pub struct PopularityTracker {
    store: Arc<dyn PriceStore>,
}

impl PopularityTracker {
    pub fn new(store: Arc<dyn PriceStore>) -> Self {
        Self { store }
    }

    /// +1 for a read, an initialization, or a lazy admission — the three
    /// cases that ever touch the set (spec.md §3).
    pub async fn record(&self, key: &str) -> Result<()> {
        self.store.pop_incr(TOKEN_COUNTER_KEY, key, 1).await
    }

    /// Full membership in descending score order, consumed by the update
    /// scheduler.
    pub async fn ranked_tokens(&self) -> Result<Vec<String>> {
        self.store.pop_range_rev(TOKEN_COUNTER_KEY).await
    }
}
