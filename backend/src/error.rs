use thiserror::Error;

pub type Result<T> = std::result::Result<T, PriceCacheError>;

/// Error taxonomy for the token price cache engine.
#[derive(Debug, Error)]
pub enum PriceCacheError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("time-series store unavailable")]
    StoreUnavailable,

    #[error("store operation failed: {0}")]
    Store(String),

    #[error("price derivation timed out")]
    Timeout,

    #[error("no paths found for token")]
    NoPaths,

    #[error("malformed token identifier: {0}")]
    BadToken(String),

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("popularity set is empty")]
    EmptyCatalog,

    #[error("batch produced zero successful prices")]
    NoPrices,
}
