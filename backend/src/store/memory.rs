use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use super::{DuplicatePolicy, PointWrite, PricePoint, PriceStore};
use crate::error::{PriceCacheError, Result};

/// In-memory `PriceStore` used by engine-level unit tests, the way
/// `mshafiee-chimera/operator/src/price_cache.rs` exercises its
/// decimal-precision cache with plain `#[test]` functions and no live
/// backing service.
#[derive(Default)]
pub struct MemoryPriceStore {
    series: Mutex<HashMap<String, Vec<PricePoint>>>,
    popularity: Mutex<HashMap<String, i64>>,
    initialized: AtomicBool,
}

impl MemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PriceStore for MemoryPriceStore {
    async fn create_series(
        &self,
        key: &str,
        _retention_ms: i64,
        _duplicate_policy: DuplicatePolicy,
        _label: &str,
    ) -> Result<()> {
        let mut series = self.series.lock().await;
        series.entry(key.to_string()).or_default();
        Ok(())
    }

    async fn add_point(&self, key: &str, timestamp_ms: i64, value: Decimal) -> Result<()> {
        let mut series = self.series.lock().await;
        let points = series.entry(key.to_string()).or_default();
        if let Some(existing) = points.iter_mut().find(|p| p.timestamp_ms == timestamp_ms) {
            existing.value = value; // duplicate policy LAST
        } else {
            points.push(PricePoint { timestamp_ms, value });
            points.sort_by_key(|p| p.timestamp_ms);
        }
        Ok(())
    }

    async fn multi_add_points(&self, points: &[PointWrite]) -> Result<()> {
        if points.is_empty() {
            return Err(PriceCacheError::NoPrices);
        }
        for point in points {
            self.add_point(&point.key, point.timestamp_ms, point.value)
                .await?;
        }
        Ok(())
    }

    async fn get_latest(&self, key: &str) -> Result<Option<PricePoint>> {
        let series = self.series.lock().await;
        Ok(series.get(key).and_then(|points| points.last().copied()))
    }

    async fn range_first(&self, key: &str, from_ms: i64, to_ms: i64) -> Result<Option<PricePoint>> {
        let series = self.series.lock().await;
        Ok(series.get(key).and_then(|points| {
            points
                .iter()
                .find(|p| p.timestamp_ms >= from_ms && p.timestamp_ms <= to_ms)
                .copied()
        }))
    }

    async fn pop_incr(&self, _set_key: &str, member: &str, delta: i64) -> Result<()> {
        let mut popularity = self.popularity.lock().await;
        *popularity.entry(member.to_string()).or_insert(0) += delta;
        Ok(())
    }

    async fn pop_range_rev(&self, _set_key: &str) -> Result<Vec<String>> {
        let popularity = self.popularity.lock().await;
        let mut entries: Vec<(String, i64)> =
            popularity.iter().map(|(k, v)| (k.clone(), *v)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(entries.into_iter().map(|(k, _)| k).collect())
    }

    async fn bootstrap_tokens(&self, set_key: &str, label: &str, keys: &[String]) -> Result<()> {
        for key in keys {
            self.create_series(key, crate::config::RETENTION_MS, DuplicatePolicy::Last, label)
                .await?;
            self.pop_incr(set_key, key, 1).await?;
        }
        Ok(())
    }

    async fn mark_initialized(&self) -> Result<()> {
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[tokio::test]
    async fn latest_reflects_last_duplicate_policy() {
        let store = MemoryPriceStore::new();
        store
            .add_point("XLM", 1_000, Decimal::from_str("0.10").unwrap())
            .await
            .unwrap();
        store
            .add_point("XLM", 1_000, Decimal::from_str("0.11").unwrap())
            .await
            .unwrap();

        let latest = store.get_latest("XLM").await.unwrap().unwrap();
        assert_eq!(latest.value, Decimal::from_str("0.11").unwrap());
    }

    #[tokio::test]
    async fn multi_add_points_rejects_empty_batch() {
        let store = MemoryPriceStore::new();
        let err = store.multi_add_points(&[]).await.unwrap_err();
        assert!(matches!(err, PriceCacheError::NoPrices));
    }

    #[tokio::test]
    async fn pop_range_rev_orders_by_descending_score() {
        let store = MemoryPriceStore::new();
        store.pop_incr("token_counter", "A", 1).await.unwrap();
        store.pop_incr("token_counter", "B", 1).await.unwrap();
        store.pop_incr("token_counter", "B", 1).await.unwrap();

        let ranked = store.pop_range_rev("token_counter").await.unwrap();
        assert_eq!(ranked, vec!["B".to_string(), "A".to_string()]);
    }
}
