//! Token identifier normalization and parsing.
//!
//! A token identifier is either the literal `XLM` (native) or `CODE:ISSUER`.
//! `native` is accepted as an input alias for `XLM` and normalized exactly
//! once, at the key boundary (spec.md §3).

use crate::error::{PriceCacheError, Result};

pub const NATIVE: &str = "XLM";

/// Normalize a caller-supplied token identifier to its on-disk spelling.
/// `XLM` is the sole on-disk spelling; `native` (any case) maps to it.
pub fn normalize(token: &str) -> String {
    if token.eq_ignore_ascii_case("native") {
        NATIVE.to_string()
    } else {
        token.to_string()
    }
}

/// An on-chain asset: native XLM, or an issued asset identified by code and
/// issuer account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    Native,
    Issued { code: String, issuer: String },
}

impl Asset {
    pub fn code(&self) -> &str {
        match self {
            Asset::Native => NATIVE,
            Asset::Issued { code, .. } => code,
        }
    }
}

/// Split a normalized token identifier into the source asset set used for
/// path-finding: `[primary, NATIVE]`, with native de-duplicated when the
/// token itself is native (spec.md §4.3 step 1).
pub fn parse_sources(token: &str) -> Result<Vec<Asset>> {
    let normalized = normalize(token);

    if normalized == NATIVE {
        return Ok(vec![Asset::Native]);
    }

    let mut parts = normalized.splitn(2, ':');
    let code = parts.next().unwrap_or_default();
    let issuer = parts.next();

    let issuer = match issuer {
        Some(issuer) => issuer,
        None => return Err(PriceCacheError::BadToken(normalized)),
    };

    if code.is_empty() || issuer.is_empty() {
        return Err(PriceCacheError::BadToken(normalized));
    }

    Ok(vec![
        Asset::Issued {
            code: code.to_string(),
            issuer: issuer.to_string(),
        },
        Asset::Native,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_native_alias() {
        assert_eq!(normalize("native"), "XLM");
        assert_eq!(normalize("NATIVE"), "XLM");
        assert_eq!(normalize("XLM"), "XLM");
    }

    #[test]
    fn normalization_is_idempotent() {
        assert_eq!(normalize(&normalize("native")), normalize("native"));
    }

    #[test]
    fn leaves_issued_assets_untouched() {
        assert_eq!(normalize("USDC:GISSUER"), "USDC:GISSUER");
    }

    #[test]
    fn native_sources_is_single_element() {
        let sources = parse_sources("native").unwrap();
        assert_eq!(sources, vec![Asset::Native]);
    }

    #[test]
    fn issued_sources_include_native_fallback() {
        let sources = parse_sources("USDC:GISSUER").unwrap();
        assert_eq!(
            sources,
            vec![
                Asset::Issued {
                    code: "USDC".to_string(),
                    issuer: "GISSUER".to_string()
                },
                Asset::Native
            ]
        );
    }

    #[test]
    fn rejects_missing_issuer() {
        assert!(parse_sources("CODE").is_err());
    }

    #[test]
    fn rejects_empty_code() {
        assert!(parse_sources(":GISSUER").is_err());
    }

    #[test]
    fn rejects_empty_issuer() {
        assert!(parse_sources("CODE:").is_err());
    }
}
