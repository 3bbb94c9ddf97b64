use std::env;

use crate::error::{PriceCacheError, Result};

/// Fixed constants from the price cache specification (spec.md §6).
pub const PRICE_CACHE_LABEL: &str = "ts:price";
pub const PRICE_CACHE_INITIALIZED_KEY: &str = "price_cache_initialized";
pub const TOKEN_COUNTER_KEY: &str = "token_counter";

pub const USDC_ASSET_CODE: &str = "USDC";
pub const USDC_ASSET_ISSUER: &str = "GA5ZSEJYB37JRC5AVCIA5MOP4RHTM335X2KGX3IHOJAPP5RE34K4KZVN";

pub const RETENTION_MS: i64 = 86_400_000;
pub const ONE_DAY_MS: i64 = 86_400_000;
pub const ONE_MINUTE_MS: i64 = 60_000;
pub const BATCH_UPDATE_DELAY_MS: u64 = 5_000;
pub const PRICE_CALCULATION_TIMEOUT_MS: u64 = 10_000;
pub const TOKEN_UPDATE_BATCH_SIZE: usize = 150;
pub const INITIAL_TOKEN_COUNT: usize = 1_000;
pub const USD_RECEIVE_VALUE: u32 = 500;

/// Engine configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Redis connection URL backing the time-series store and popularity set.
    pub redis_url: String,

    /// Horizon base URL for ledger and path-finding queries.
    pub horizon_url: String,

    /// Catalog base URL (asset explorer).
    pub catalog_url: String,

    pub token_update_batch_size: usize,
    pub batch_update_delay_ms: u64,
    pub price_calculation_timeout_ms: u64,
    pub initial_token_count: usize,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let horizon_url = env::var("HORIZON_URL")
            .unwrap_or_else(|_| "https://horizon.stellar.org".to_string());

        let catalog_url = env::var("CATALOG_URL")
            .unwrap_or_else(|_| "https://horizon.stellar.org".to_string());

        let token_update_batch_size = env::var("TOKEN_UPDATE_BATCH_SIZE")
            .ok()
            .map(|v| v.parse())
            .transpose()
            .map_err(|_| PriceCacheError::Config("TOKEN_UPDATE_BATCH_SIZE must be a number".into()))?
            .unwrap_or(TOKEN_UPDATE_BATCH_SIZE);

        let batch_update_delay_ms = env::var("BATCH_UPDATE_DELAY_MS")
            .ok()
            .map(|v| v.parse())
            .transpose()
            .map_err(|_| PriceCacheError::Config("BATCH_UPDATE_DELAY_MS must be a number".into()))?
            .unwrap_or(BATCH_UPDATE_DELAY_MS);

        let price_calculation_timeout_ms = env::var("PRICE_CALCULATION_TIMEOUT_MS")
            .ok()
            .map(|v| v.parse())
            .transpose()
            .map_err(|_| {
                PriceCacheError::Config("PRICE_CALCULATION_TIMEOUT_MS must be a number".into())
            })?
            .unwrap_or(PRICE_CALCULATION_TIMEOUT_MS);

        let initial_token_count = env::var("INITIAL_TOKEN_COUNT")
            .ok()
            .map(|v| v.parse())
            .transpose()
            .map_err(|_| PriceCacheError::Config("INITIAL_TOKEN_COUNT must be a number".into()))?
            .unwrap_or(INITIAL_TOKEN_COUNT);

        Ok(Self {
            redis_url,
            horizon_url,
            catalog_url,
            token_update_batch_size,
            batch_update_delay_ms,
            price_calculation_timeout_ms,
            initial_token_count,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.redis_url.is_empty() {
            return Err(PriceCacheError::Config("REDIS_URL cannot be empty".into()));
        }
        if self.token_update_batch_size == 0 {
            return Err(PriceCacheError::Config(
                "TOKEN_UPDATE_BATCH_SIZE must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            horizon_url: "https://horizon.stellar.org".to_string(),
            catalog_url: "https://horizon.stellar.org".to_string(),
            token_update_batch_size: TOKEN_UPDATE_BATCH_SIZE,
            batch_update_delay_ms: BATCH_UPDATE_DELAY_MS,
            price_calculation_timeout_ms: PRICE_CALCULATION_TIMEOUT_MS,
            initial_token_count: INITIAL_TOKEN_COUNT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_empty_redis_url() {
        let mut config = EngineConfig::default();
        config.redis_url.clear();
        assert!(config.validate().is_err());
    }
}
