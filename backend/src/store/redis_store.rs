use std::str::FromStr;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisResult, Value};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::{DuplicatePolicy, PointWrite, PricePoint, PriceStore};
use crate::error::{PriceCacheError, Result};

/// RedisTimeSeries-backed store adapter. `TS.*` commands aren't part of the
/// `redis` crate's typed API, so they're issued with raw `redis::cmd(...)`
/// the way `diegomig-MIG_SDK_EXPORT`'s `redis_manager.rs` reaches for
/// commands the typed surface doesn't cover; the popularity sorted set uses
/// the crate's typed `zincr`/`zrevrange`.
pub struct RedisPriceStore {
    conn: ConnectionManager,
}

impl RedisPriceStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| PriceCacheError::Store(format!("invalid redis url: {}", e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| PriceCacheError::Store(format!("failed to connect to redis: {}", e)))?;
        Ok(Self { conn })
    }

    fn parse_point(value: Value) -> Result<Option<PricePoint>> {
        match value {
            Value::Nil => Ok(None),
            Value::Array(items) if items.is_empty() => Ok(None),
            Value::Array(items) if items.len() == 2 => {
                let timestamp_ms: i64 = redis::from_redis_value(&items[0])
                    .map_err(|e| PriceCacheError::Store(format!("bad timestamp: {}", e)))?;
                let raw: String = redis::from_redis_value(&items[1])
                    .map_err(|e| PriceCacheError::Store(format!("bad value: {}", e)))?;
                let value = Decimal::from_str(&raw)
                    .map_err(|e| PriceCacheError::Store(format!("bad decimal: {}", e)))?;
                Ok(Some(PricePoint { timestamp_ms, value }))
            }
            other => Err(PriceCacheError::Store(format!(
                "unexpected TS reply shape: {:?}",
                other
            ))),
        }
    }

    /// `TS.RANGE` returns every point in the window; we only ever want the
    /// first one, so a single extra element check suffices without a
    /// `COUNT` round trip mismatch.
    fn parse_range_first(value: Value) -> Result<Option<PricePoint>> {
        match value {
            Value::Array(items) => match items.into_iter().next() {
                Some(Value::Array(pair)) if pair.len() == 2 => {
                    let timestamp_ms: i64 = redis::from_redis_value(&pair[0])
                        .map_err(|e| PriceCacheError::Store(format!("bad timestamp: {}", e)))?;
                    let raw: String = redis::from_redis_value(&pair[1])
                        .map_err(|e| PriceCacheError::Store(format!("bad value: {}", e)))?;
                    let value = Decimal::from_str(&raw)
                        .map_err(|e| PriceCacheError::Store(format!("bad decimal: {}", e)))?;
                    Ok(Some(PricePoint { timestamp_ms, value }))
                }
                _ => Ok(None),
            },
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl PriceStore for RedisPriceStore {
    async fn create_series(
        &self,
        key: &str,
        retention_ms: i64,
        duplicate_policy: DuplicatePolicy,
        label: &str,
    ) -> Result<()> {
        let policy = match duplicate_policy {
            DuplicatePolicy::Last => "LAST",
        };

        let mut conn = self.conn.clone();
        let result: RedisResult<Value> = redis::cmd("TS.CREATE")
            .arg(key)
            .arg("RETENTION")
            .arg(retention_ms)
            .arg("DUPLICATE_POLICY")
            .arg(policy)
            .arg("LABELS")
            .arg(label)
            .arg(key)
            .query_async(&mut conn)
            .await;

        if let Err(e) = result {
            // "key already exists" is the expected steady-state outcome.
            if e.to_string().contains("already exists") {
                debug!(key, "series already exists, skipping create");
            } else {
                warn!(key, error = %e, "createSeries failed");
            }
        }
        Ok(())
    }

    async fn add_point(&self, key: &str, timestamp_ms: i64, value: Decimal) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: Value = redis::cmd("TS.ADD")
            .arg(key)
            .arg(timestamp_ms)
            .arg(value.to_string())
            .arg("ON_DUPLICATE")
            .arg("LAST")
            .query_async(&mut conn)
            .await
            .map_err(|e| PriceCacheError::Store(format!("TS.ADD failed: {}", e)))?;
        Ok(())
    }

    async fn multi_add_points(&self, points: &[PointWrite]) -> Result<()> {
        if points.is_empty() {
            return Err(PriceCacheError::NoPrices);
        }

        let mut cmd = redis::cmd("TS.MADD");
        for point in points {
            cmd.arg(&point.key)
                .arg(point.timestamp_ms)
                .arg(point.value.to_string());
        }

        let mut conn = self.conn.clone();
        let _: Value = cmd
            .query_async(&mut conn)
            .await
            .map_err(|e| PriceCacheError::Store(format!("TS.MADD failed: {}", e)))?;
        Ok(())
    }

    async fn get_latest(&self, key: &str) -> Result<Option<PricePoint>> {
        let mut conn = self.conn.clone();
        let value: Value = redis::cmd("TS.GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| PriceCacheError::Store(format!("TS.GET failed: {}", e)))?;
        Self::parse_point(value)
    }

    async fn range_first(&self, key: &str, from_ms: i64, to_ms: i64) -> Result<Option<PricePoint>> {
        let mut conn = self.conn.clone();
        let value: Value = redis::cmd("TS.RANGE")
            .arg(key)
            .arg(from_ms)
            .arg(to_ms)
            .arg("COUNT")
            .arg(1)
            .query_async(&mut conn)
            .await
            .map_err(|e| PriceCacheError::Store(format!("TS.RANGE failed: {}", e)))?;
        Self::parse_range_first(value)
    }

    async fn pop_incr(&self, set_key: &str, member: &str, delta: i64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: f64 = conn
            .zincr(set_key, member, delta)
            .await
            .map_err(|e| PriceCacheError::Store(format!("ZINCRBY failed: {}", e)))?;
        Ok(())
    }

    async fn pop_range_rev(&self, set_key: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = conn
            .zrevrange(set_key, 0, -1)
            .await
            .map_err(|e| PriceCacheError::Store(format!("ZREVRANGE failed: {}", e)))?;
        Ok(members)
    }

    async fn bootstrap_tokens(&self, set_key: &str, label: &str, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();

        for key in keys {
            // TS.CREATE's reply is kept (not `.ignore()`d) so the per-key
            // "already exists" outcome can be logged below, the same as
            // `create_series` does for a single key.
            pipe.cmd("TS.CREATE")
                .arg(key)
                .arg("RETENTION")
                .arg(crate::config::RETENTION_MS)
                .arg("DUPLICATE_POLICY")
                .arg("LAST")
                .arg("LABELS")
                .arg(label)
                .arg(key);
            pipe.cmd("ZINCRBY").arg(set_key).arg(1).arg(key).ignore();
        }

        let mut conn = self.conn.clone();
        let replies: Vec<Value> = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| PriceCacheError::Store(format!("bootstrap pipeline failed: {}", e)))?;

        for (key, reply) in keys.iter().zip(replies.iter()) {
            if let Value::ServerError(err) = reply {
                let message = format!("{:?}", err);
                if message.contains("already exists") {
                    debug!(key, "series already exists, skipping create");
                } else {
                    warn!(key, error = %message, "createSeries failed during bootstrap");
                }
            }
        }

        Ok(())
    }

    async fn mark_initialized(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(crate::config::PRICE_CACHE_INITIALIZED_KEY)
            .arg("true")
            .query_async(&mut conn)
            .await
            .map_err(|e| PriceCacheError::Store(format!("SET failed: {}", e)))?;
        Ok(())
    }
}
