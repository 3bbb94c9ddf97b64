//! Cache Engine (spec.md §4.5): orchestrates initialization, batched
//! periodic updates, lazy admission on miss, and the read path.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::catalog::CatalogFetcher;
use crate::config::{
    EngineConfig, ONE_DAY_MS, ONE_MINUTE_MS, PRICE_CACHE_LABEL, RETENTION_MS, TOKEN_COUNTER_KEY,
};
use crate::deriver::PriceDeriver;
use crate::error::{PriceCacheError, Result};
use crate::popularity::PopularityTracker;
use crate::stellar::horizon::ChainClient;
use crate::store::{DuplicatePolicy, PointWrite, PriceStore};
use crate::token::normalize;
use shared::dto::price::TokenPriceData;

pub struct CacheEngine {
    store: Arc<dyn PriceStore>,
    deriver: Arc<PriceDeriver>,
    catalog: CatalogFetcher,
    popularity: PopularityTracker,
    batch_size: usize,
    batch_delay_ms: u64,
}

impl CacheEngine {
    pub fn new(config: &EngineConfig, store: Arc<dyn PriceStore>, chain: Arc<dyn ChainClient>) -> Self {
        let deriver = Arc::new(PriceDeriver::new(chain, config.price_calculation_timeout_ms));
        let catalog = CatalogFetcher::new(config.catalog_url.clone(), config.initial_token_count);
        let popularity = PopularityTracker::new(store.clone());

        Self {
            store,
            deriver,
            catalog,
            popularity,
            batch_size: config.token_update_batch_size,
            batch_delay_ms: config.batch_update_delay_ms,
        }
    }

    /// `initPriceCache`: bootstrap every catalog token's series + one
    /// popularity point, in a single pipeline. Does not populate prices —
    /// the first `update_prices` pass does that (spec.md §4.5.1).
    pub async fn init_price_cache(&self) -> Result<()> {
        let tokens = self.catalog.fetch_all_tokens().await;
        let keys: Vec<String> = tokens.iter().map(|t| normalize(t)).collect();

        self.store
            .bootstrap_tokens(TOKEN_COUNTER_KEY, PRICE_CACHE_LABEL, &keys)
            .await?;

        self.store.mark_initialized().await?;

        info!(token_count = keys.len(), "price cache initialized");
        Ok(())
    }

    /// `updatePrices`: derive prices for every token in popularity order,
    /// in batches of `token_update_batch_size`, with a delay between
    /// batches. A batch producing zero successes halts the whole pass.
    pub async fn update_prices(&self) -> Result<()> {
        let tokens = self.popularity.ranked_tokens().await?;
        if tokens.is_empty() {
            return Err(PriceCacheError::EmptyCatalog);
        }

        let batches: Vec<&[String]> = tokens.chunks(self.batch_size).collect();
        let batch_count = batches.len();

        for (index, batch) in batches.into_iter().enumerate() {
            let tasks = batch.iter().cloned().map(|token| {
                let deriver = self.deriver.clone();
                tokio::spawn(async move {
                    let result = deriver.calculate_price_in_usd(&token).await;
                    (token, result)
                })
            });

            let outcomes = join_all(tasks).await;

            let mut points = Vec::new();
            for outcome in outcomes {
                match outcome {
                    Ok((token, Ok((timestamp_ms, value)))) => {
                        points.push(PointWrite { key: token, timestamp_ms, value });
                    }
                    Ok((token, Err(e))) => {
                        warn!(token, error = %e, "price derivation failed, skipping token");
                    }
                    Err(join_error) => {
                        error!(error = %join_error, "price derivation task panicked");
                    }
                }
            }

            if points.is_empty() {
                return Err(PriceCacheError::NoPrices);
            }
            self.store.multi_add_points(&points).await?;

            if index + 1 < batch_count {
                tokio::time::sleep(Duration::from_millis(self.batch_delay_ms)).await;
            }
        }

        Ok(())
    }

    /// `getPrice(token)`: never throws to the caller — internal errors are
    /// logged and collapsed to `None`.
    pub async fn get_price(&self, token: &str) -> Option<TokenPriceData> {
        match self.get_price_checked(token).await {
            Ok(result) => result,
            Err(e) => {
                error!(token, error = %e, "getPrice failed");
                None
            }
        }
    }

    async fn get_price_checked(&self, token: &str) -> Result<Option<TokenPriceData>> {
        let key = normalize(token);

        match self.store.get_latest(&key).await {
            Ok(Some(latest)) => {
                let day_ago = latest.timestamp_ms - ONE_DAY_MS;
                let old = self
                    .store
                    .range_first(&key, day_ago, day_ago + ONE_MINUTE_MS)
                    .await?;

                let delta = match old {
                    Some(old_point) if old_point.value != Decimal::ZERO => Some(
                        ((latest.value - old_point.value) / old_point.value) * Decimal::from(100),
                    ),
                    _ => None,
                };

                self.popularity.record(&key).await?;

                Ok(Some(TokenPriceData {
                    current_price: latest.value,
                    percentage_price_change_24h: delta,
                }))
            }
            Ok(None) => Ok(None),
            Err(_store_error) => self.lazy_admission(&key, token).await.map(Some),
        }
    }

    /// Lazy admission (spec.md §4.5.3): invoked on a read miss. Deriver
    /// failures propagate from here; callers reach this only through
    /// `get_price`, which catches them at the outer boundary.
    async fn lazy_admission(&self, key: &str, original_token: &str) -> Result<TokenPriceData> {
        let (timestamp_ms, price) = self.deriver.calculate_price_in_usd(original_token).await?;

        self.store
            .create_series(key, RETENTION_MS, DuplicatePolicy::Last, PRICE_CACHE_LABEL)
            .await?;
        self.popularity.record(key).await?;
        self.store.add_point(key, timestamp_ms, price).await?;

        Ok(TokenPriceData {
            current_price: price,
            percentage_price_change_24h: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stellar::types::PathRecord;
    use crate::store::MemoryPriceStore;
    use crate::token::Asset;
    use async_trait::async_trait;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct FakeChain {
        ledger_ms: i64,
        price_per_unit: Decimal,
        calls: AtomicI64,
    }

    #[async_trait]
    impl ChainClient for FakeChain {
        async fn latest_ledger_close_ms(&self) -> Result<i64> {
            Ok(self.ledger_ms)
        }

        async fn strict_receive_paths(
            &self,
            _sources: &[Asset],
            dest_amount: Decimal,
        ) -> Result<Vec<PathRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let source_amount = dest_amount / self.price_per_unit;
            Ok(vec![PathRecord {
                source_asset_type: "native".to_string(),
                source_asset_code: None,
                source_asset_issuer: None,
                source_amount: source_amount.to_string(),
            }])
        }
    }

    fn engine_with(chain: FakeChain) -> CacheEngine {
        let config = EngineConfig::default();
        let store = Arc::new(MemoryPriceStore::new());
        CacheEngine::new(&config, store, Arc::new(chain))
    }

    #[tokio::test]
    async fn cold_read_admits_unknown_token() {
        let engine = engine_with(FakeChain {
            ledger_ms: 1_700_000_000_000,
            price_per_unit: Decimal::from_str("4").unwrap(),
            calls: AtomicI64::new(0),
        });

        let result = engine.get_price("native").await.unwrap();
        assert_eq!(result.current_price, Decimal::from_str("4").unwrap());
        assert_eq!(result.percentage_price_change_24h, None);

        let ranked = engine.popularity.ranked_tokens().await.unwrap();
        assert_eq!(ranked, vec!["XLM".to_string()]);
    }

    #[tokio::test]
    async fn warm_read_with_24h_sample_computes_delta() {
        let engine = engine_with(FakeChain {
            ledger_ms: 0,
            price_per_unit: Decimal::ONE,
            calls: AtomicI64::new(0),
        });

        let now = 2 * ONE_DAY_MS;
        engine
            .store
            .add_point("XLM", now - ONE_DAY_MS, Decimal::from_str("0.10").unwrap())
            .await
            .unwrap();
        engine
            .store
            .add_point("XLM", now, Decimal::from_str("0.12").unwrap())
            .await
            .unwrap();

        let result = engine.get_price("native").await.unwrap();
        assert_eq!(result.current_price, Decimal::from_str("0.12").unwrap());
        assert_eq!(result.percentage_price_change_24h, Some(Decimal::from_str("20").unwrap()));
    }

    #[tokio::test]
    async fn zero_old_value_yields_no_delta() {
        let engine = engine_with(FakeChain {
            ledger_ms: 0,
            price_per_unit: Decimal::ONE,
            calls: AtomicI64::new(0),
        });

        let now = 2 * ONE_DAY_MS;
        engine
            .store
            .add_point("XLM", now - ONE_DAY_MS, Decimal::ZERO)
            .await
            .unwrap();
        engine
            .store
            .add_point("XLM", now, Decimal::from_str("0.12").unwrap())
            .await
            .unwrap();

        let result = engine.get_price("native").await.unwrap();
        assert_eq!(result.percentage_price_change_24h, None);
    }

    #[tokio::test]
    async fn update_prices_fails_on_empty_popularity_set() {
        let engine = engine_with(FakeChain {
            ledger_ms: 0,
            price_per_unit: Decimal::ONE,
            calls: AtomicI64::new(0),
        });

        let err = engine.update_prices().await.unwrap_err();
        assert!(matches!(err, PriceCacheError::EmptyCatalog));
    }
}
