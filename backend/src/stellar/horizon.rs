use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use tracing::{debug, error};

use super::types::{LedgersResponse, PathRecord, PathsResponse};
use crate::config::{USDC_ASSET_CODE, USDC_ASSET_ISSUER};
use crate::error::{PriceCacheError, Result};
use crate::token::Asset;

/// The on-chain collaborator the Price Deriver queries: latest ledger close
/// time and `strictReceivePaths` (spec.md §6). Fixed by the surrounding
/// service; this crate ships a Horizon-backed implementation.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn latest_ledger_close_ms(&self) -> Result<i64>;

    async fn strict_receive_paths(
        &self,
        sources: &[Asset],
        dest_amount: Decimal,
    ) -> Result<Vec<PathRecord>>;
}

pub struct HorizonClient {
    client: Client,
    base_url: String,
}

impl HorizonClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn source_query_param(asset: &Asset) -> String {
        match asset {
            Asset::Native => "native".to_string(),
            Asset::Issued { code, issuer } => format!("{}:{}", code, issuer),
        }
    }
}

#[async_trait]
impl ChainClient for HorizonClient {
    /// Fetch the latest ledger (order desc, limit 1) and return its close
    /// time in milliseconds since epoch.
    async fn latest_ledger_close_ms(&self) -> Result<i64> {
        let url = format!("{}/ledgers?order=desc&limit=1", self.base_url);
        debug!("Fetching latest ledger from: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PriceCacheError::Upstream(format!("ledgers request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PriceCacheError::Upstream(format!(
                "ledgers request returned {}",
                response.status()
            )));
        }

        let parsed: LedgersResponse = response
            .json()
            .await
            .map_err(|e| PriceCacheError::Upstream(format!("failed to parse ledgers: {}", e)))?;

        let record = parsed
            .embedded
            .records
            .into_iter()
            .next()
            .ok_or_else(|| PriceCacheError::Upstream("no ledgers returned".to_string()))?;

        let close_time = chrono::DateTime::parse_from_rfc3339(&record.closed_at)
            .map_err(|e| PriceCacheError::Upstream(format!("bad closed_at: {}", e)))?;

        Ok(close_time.timestamp_millis())
    }

    /// Query `strictReceivePaths(sources, USDC, destAmount)`.
    async fn strict_receive_paths(
        &self,
        sources: &[Asset],
        dest_amount: Decimal,
    ) -> Result<Vec<PathRecord>> {
        let source_assets: Vec<String> = sources.iter().map(Self::source_query_param).collect();

        let url = format!(
            "{}/paths/strict-receive?source_assets={}&destination_asset_type=credit_alphanum4&destination_asset_code={}&destination_asset_issuer={}&destination_amount={}",
            self.base_url,
            source_assets.join(","),
            USDC_ASSET_CODE,
            USDC_ASSET_ISSUER,
            dest_amount,
        );

        debug!("Querying strict-receive paths: {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            PriceCacheError::Upstream(format!("strict-receive-paths request failed: {}", e))
        })?;

        if !response.status().is_success() {
            error!("Horizon path query returned {}", response.status());
            return Err(PriceCacheError::Upstream(format!(
                "strict-receive-paths returned {}",
                response.status()
            )));
        }

        let parsed: PathsResponse = response.json().await.map_err(|e| {
            PriceCacheError::Upstream(format!("failed to parse strict-receive-paths: {}", e))
        })?;

        Ok(parsed.embedded.records)
    }
}
