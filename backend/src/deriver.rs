//! Price Deriver (spec.md §4.3): derives a token's USD price from the
//! chain's path-finding endpoint, wrapped in a hard timeout.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::debug;

use crate::config::USD_RECEIVE_VALUE;
use crate::error::{PriceCacheError, Result};
use crate::stellar::horizon::ChainClient;
use crate::stellar::types::PathRecord;
use crate::token::parse_sources;

pub struct PriceDeriver {
    chain: Arc<dyn ChainClient>,
    timeout: Duration,
}

impl PriceDeriver {
    pub fn new(chain: Arc<dyn ChainClient>, timeout_ms: u64) -> Self {
        Self {
            chain,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// `calculatePriceInUSD(token) -> (timestampMs, priceUSD)`. Races the
    /// core computation against the hard timeout; whichever completes
    /// first wins, the loser's in-flight work is abandoned.
    pub async fn calculate_price_in_usd(&self, token: &str) -> Result<(i64, Decimal)> {
        match tokio::time::timeout(self.timeout, self.derive(token)).await {
            Ok(result) => result,
            Err(_) => Err(PriceCacheError::Timeout),
        }
    }

    async fn derive(&self, token: &str) -> Result<(i64, Decimal)> {
        let sources = parse_sources(token)?;
        let primary_code = sources[0].code().to_string();

        let close_time_ms = self.chain.latest_ledger_close_ms().await?;

        let dest_amount = Decimal::from(USD_RECEIVE_VALUE);
        let records = self
            .chain
            .strict_receive_paths(&sources, dest_amount)
            .await?;

        if records.is_empty() {
            return Err(PriceCacheError::NoPaths);
        }

        let min_source_amount = Self::min_source_amount(&records, &primary_code)?;
        let price_usd = dest_amount / min_source_amount;

        debug!(token, price = %price_usd, "derived price");
        Ok((close_time_ms, price_usd))
    }

    /// Reproduce the reference fold exactly (spec.md §9): the initial
    /// accumulator is the first *overall* record's `source_amount`, folded
    /// over the records whose `source_asset_code` matches the primary
    /// source's code. When the filter is empty this leaves the minimum
    /// seeded from an unfiltered record — an intentional fallback, not a
    /// bug.
    fn min_source_amount(records: &[PathRecord], primary_code: &str) -> Result<Decimal> {
        let first = records
            .first()
            .ok_or(PriceCacheError::NoPaths)?
            .source_amount
            .parse::<Decimal>()
            .map_err(|e| PriceCacheError::Upstream(format!("bad source_amount: {}", e)))?;

        let filtered: Vec<&PathRecord> = records
            .iter()
            .filter(|r| Self::effective_code(r) == primary_code)
            .collect();

        let mut min = first;
        for record in filtered {
            let amount = record
                .source_amount
                .parse::<Decimal>()
                .map_err(|e| PriceCacheError::Upstream(format!("bad source_amount: {}", e)))?;
            if amount < min {
                min = amount;
            }
        }

        Ok(min)
    }

    fn effective_code(record: &PathRecord) -> &str {
        if record.source_asset_type == "native" {
            crate::token::NATIVE
        } else {
            record.source_asset_code.as_deref().unwrap_or("")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: &str, amount: &str) -> PathRecord {
        PathRecord {
            source_asset_type: if code == "XLM" {
                "native".to_string()
            } else {
                "credit_alphanum4".to_string()
            },
            source_asset_code: if code == "XLM" {
                None
            } else {
                Some(code.to_string())
            },
            source_asset_issuer: None,
            source_amount: amount.to_string(),
        }
    }

    #[test]
    fn picks_minimum_among_filtered_records() {
        let records = vec![
            record("FOO", "10.0"),
            record("FOO", "5.0"),
            record("XLM", "1.0"),
        ];
        let min = PriceDeriver::min_source_amount(&records, "FOO").unwrap();
        assert_eq!(min, Decimal::from_str_exact("5.0").unwrap());
    }

    #[test]
    fn falls_back_to_first_overall_record_when_filter_empty() {
        let records = vec![record("XLM", "2.0"), record("XLM", "1.5")];
        // filtering for "FOO" yields nothing; accumulator stays at the
        // first overall record's amount (2.0), not the true min (1.5).
        let min = PriceDeriver::min_source_amount(&records, "FOO").unwrap();
        assert_eq!(min, Decimal::from_str_exact("2.0").unwrap());
    }
}
