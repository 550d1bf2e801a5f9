//! Shared helpers for CLI commands.

use anyhow::Result;
use kinko_common::types::{Chain, TokenBalanceRow};

/// Parse a chain argument with a readable error.
pub fn parse_chain(s: &str) -> Result<Chain> {
    s.parse::<Chain>()
        .map_err(|_| anyhow::anyhow!("Unknown chain: {s}. Use one of: eth, pulse, base"))
}

/// `Some(price)` only for a known (positive) price.
pub fn known_price(row: &TokenBalanceRow) -> Option<f64> {
    row.has_price().then_some(row.unit_price_usd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinko_common::types::PriceSource;

    #[test]
    fn test_parse_chain_aliases() {
        assert_eq!(parse_chain("PLS").unwrap(), Chain::Pulse);
        assert!(parse_chain("sol").unwrap_err().to_string().contains("eth, pulse, base"));
    }

    #[test]
    fn test_known_price() {
        let row = TokenBalanceRow::native(Chain::Eth, 1.0);
        assert_eq!(known_price(&row), None);
        assert_eq!(known_price(&row.with_price(3000.0, PriceSource::Spot)), Some(3000.0));
    }
}
