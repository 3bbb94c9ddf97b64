//! Time-Series Store Adapter (spec.md §4.2): a thin semantic wrapper over
//! an external time-series + sorted-set store. `RedisPriceStore` is the
//! production implementation (RedisTimeSeries); `MemoryPriceStore` backs
//! unit tests so engine logic can be exercised without a live Redis.

pub mod memory;
pub mod redis_store;

pub use memory::MemoryPriceStore;
pub use redis_store::RedisPriceStore;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::Result;

/// Duplicate-key policy for series creation. The engine only ever uses
/// `Last` (spec.md §3), but the adapter names the full enum the way the
/// store's create API does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    Last,
}

/// A single `(timestamp_ms, price_usd)` sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp_ms: i64,
    pub value: Decimal,
}

/// One entry of a `multiAddPoints` batch.
#[derive(Debug, Clone)]
pub struct PointWrite {
    pub key: String,
    pub timestamp_ms: i64,
    pub value: Decimal,
}

#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Idempotent series creation; "already exists" is logged and
    /// swallowed by the implementation, never surfaced as an error.
    async fn create_series(
        &self,
        key: &str,
        retention_ms: i64,
        duplicate_policy: DuplicatePolicy,
        label: &str,
    ) -> Result<()>;

    async fn add_point(&self, key: &str, timestamp_ms: i64, value: Decimal) -> Result<()>;

    /// Atomic batch append. An empty `points` is a caller error
    /// (`PriceCacheError::NoPrices`), never a silent no-op.
    async fn multi_add_points(&self, points: &[PointWrite]) -> Result<()>;

    async fn get_latest(&self, key: &str) -> Result<Option<PricePoint>>;

    /// First point within the inclusive window `[from_ms, to_ms]`.
    async fn range_first(&self, key: &str, from_ms: i64, to_ms: i64) -> Result<Option<PricePoint>>;

    async fn pop_incr(&self, set_key: &str, member: &str, delta: i64) -> Result<()>;

    /// Full sorted-set membership in descending score order.
    async fn pop_range_rev(&self, set_key: &str) -> Result<Vec<String>>;

    /// Pipelined series-creation + popularity-increment for every token in
    /// one round trip (spec.md §4.2 `pipeline()`, used by `initPriceCache`).
    /// Per-token creation failures are logged and do not abort the batch.
    async fn bootstrap_tokens(&self, set_key: &str, label: &str, keys: &[String]) -> Result<()>;

    /// Sets the `price_cache_initialized` flag once `initPriceCache`
    /// completes. The engine never reads it back; it exists for the
    /// surrounding process to decide whether to run initialization.
    async fn mark_initialized(&self) -> Result<()>;
}
