use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Result of a `getPrice(token)` call: current USD price plus, when a
/// 24-hour-old sample exists, the percentage change since then.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPriceData {
    pub current_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage_price_change_24h: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn serializes_missing_delta_without_the_field() {
        let data = TokenPriceData {
            current_price: Decimal::from_str("0.12").unwrap(),
            percentage_price_change_24h: None,
        };
        let json = serde_json::to_string(&data).unwrap();
        assert!(!json.contains("percentage_price_change_24h"));
    }
}
