use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerRecord {
    pub closed_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgersResponse {
    #[serde(rename = "_embedded")]
    pub embedded: EmbeddedLedgers,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedLedgers {
    pub records: Vec<LedgerRecord>,
}

/// A single candidate route returned by `strictReceivePaths`.
#[derive(Debug, Clone, Deserialize)]
pub struct PathRecord {
    pub source_asset_type: String,
    pub source_asset_code: Option<String>,
    pub source_asset_issuer: Option<String>,
    pub source_amount: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsResponse {
    #[serde(rename = "_embedded")]
    pub embedded: EmbeddedPaths,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedPaths {
    pub records: Vec<PathRecord>,
}
