//! Catalog Fetcher (spec.md §4.1): walks the paginated asset catalog until
//! `INITIAL_TOKEN_COUNT` tokens are collected, the `next` link runs out, or
//! a request fails.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::token::{normalize, NATIVE};

const USDC_ASSET_LITERAL: &str = "USDC";
const PAGE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
struct CatalogPage {
    #[serde(rename = "_embedded")]
    embedded: EmbeddedRecords,
    #[serde(rename = "_links")]
    links: Links,
}

#[derive(Debug, Deserialize)]
struct EmbeddedRecords {
    records: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Links {
    next: Option<NextLink>,
}

#[derive(Debug, Deserialize)]
struct NextLink {
    href: String,
}

pub struct CatalogFetcher {
    client: Client,
    base_url: String,
    initial_token_count: usize,
}

impl CatalogFetcher {
    pub fn new(base_url: impl Into<String>, initial_token_count: usize) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            initial_token_count,
        }
    }

    /// Walk the catalog, starting from `[XLM]`, emitting a deduplicated
    /// token list capped at `initial_token_count`. Errors are logged and
    /// terminate the walk gracefully — partial results are acceptable.
    pub async fn fetch_all_tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = vec![NATIVE.to_string()];
        let mut url = format!("{}/explorer/public/asset?sort=volume7d&order=desc", self.base_url);

        loop {
            if tokens.len() >= self.initial_token_count {
                break;
            }

            let page = match self.fetch_page(&url).await {
                Ok(page) => page,
                Err(e) => {
                    error!(error = %e, "catalog page fetch failed, stopping walk");
                    break;
                }
            };

            for record in &page.embedded.records {
                if tokens.len() >= self.initial_token_count {
                    break;
                }
                if let Some(token) = Self::record_to_token(record) {
                    if !tokens.contains(&token) {
                        tokens.push(token);
                    }
                }
            }

            match page.links.next {
                Some(next) if tokens.len() < self.initial_token_count => {
                    url = if next.href.starts_with("http") {
                        next.href
                    } else {
                        format!("{}{}", self.base_url, next.href)
                    };
                }
                _ => break,
            }

            tokio::time::sleep(PAGE_DELAY).await;
        }

        info!(count = tokens.len(), "catalog walk complete");
        tokens
    }

    async fn fetch_page(&self, url: &str) -> Result<CatalogPage, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("network error: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("catalog returned {}", response.status()));
        }

        response
            .json::<CatalogPage>()
            .await
            .map_err(|e| format!("failed to parse catalog page: {}", e))
    }

    /// Skip `XLM`/`USDC` (the quote asset); prefer the structured
    /// `tomlInfo.code`/`issuer` pair, falling back to parsing
    /// `CODE-ISSUER[-type]` out of the `asset` field.
    fn record_to_token(record: &Value) -> Option<String> {
        let asset = record.get("asset").and_then(|v| v.as_str())?;
        if asset == NATIVE || asset == USDC_ASSET_LITERAL {
            return None;
        }

        if let Some(toml_info) = record.get("tomlInfo") {
            let code = toml_info.get("code").and_then(|v| v.as_str());
            let issuer = toml_info.get("issuer").and_then(|v| v.as_str());
            if let (Some(code), Some(issuer)) = (code, issuer) {
                return Some(normalize(&format!("{}:{}", code, issuer)));
            }
        }

        let mut parts = asset.splitn(3, '-');
        let code = parts.next()?;
        let issuer = parts.next();
        match issuer {
            Some(issuer) if !code.is_empty() && !issuer.is_empty() => {
                Some(normalize(&format!("{}:{}", code, issuer)))
            }
            _ => {
                warn!(asset, "unrecognized catalog asset shape, skipping");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn skips_native_and_usdc() {
        assert_eq!(CatalogFetcher::record_to_token(&json!({"asset": "XLM"})), None);
        assert_eq!(CatalogFetcher::record_to_token(&json!({"asset": "USDC"})), None);
    }

    #[test]
    fn prefers_structured_toml_info() {
        let record = json!({
            "asset": "FOO-GABC-1",
            "tomlInfo": {"code": "FOO", "issuer": "GABC"}
        });
        assert_eq!(
            CatalogFetcher::record_to_token(&record),
            Some("FOO:GABC".to_string())
        );
    }

    #[test]
    fn falls_back_to_parsing_asset_field() {
        let record = json!({"asset": "FOO-GABC-1"});
        assert_eq!(
            CatalogFetcher::record_to_token(&record),
            Some("FOO:GABC".to_string())
        );
    }
}
