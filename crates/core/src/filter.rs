//! Display filters: dust hiding and junk-token policy.

use kinko_common::constants::USD_EPSILON;
use kinko_common::types::TokenBalanceRow;
use kinko_types::config::PolicyConfig;

/// Keep row 0 (the native coin) unconditionally and every other row whose
/// value is strictly above `min_usd`. Order among kept rows is preserved.
pub fn filter_dust(rows: Vec<TokenBalanceRow>, min_usd: f64) -> Vec<TokenBalanceRow> {
    rows.into_iter()
        .enumerate()
        .filter(|(i, row)| *i == 0 || row.value_usd > min_usd + USD_EPSILON)
        .map(|(_, row)| row)
        .collect()
}

/// Heuristic junk-token filter applied before aggregation.
#[derive(Debug, Clone)]
pub struct JunkFilter {
    enabled: bool,
    denylist: Vec<String>,
    max_price: f64,
}

impl JunkFilter {
    pub fn from_policy(policy: &PolicyConfig) -> Self {
        Self {
            enabled: policy.hide_junk,
            denylist: policy.denylist.iter().map(|s| s.to_uppercase()).collect(),
            max_price: policy.max_plausible_price,
        }
    }

    /// Filter that keeps everything.
    pub fn disabled() -> Self {
        Self { enabled: false, denylist: Vec::new(), max_price: f64::INFINITY }
    }

    pub fn is_junk(&self, row: &TokenBalanceRow) -> bool {
        if !self.enabled {
            return false;
        }
        let symbol = row.symbol.to_uppercase();
        self.denylist.iter().any(|d| *d == symbol)
            || !row.unit_price_usd.is_finite()
            || row.unit_price_usd > self.max_price
            || !row.amount.is_finite()
            || row.amount < 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinko_common::types::{Chain, PriceSource};

    fn row(symbol: &str, value: f64) -> TokenBalanceRow {
        TokenBalanceRow::token(Chain::Pulse, "0xabc", symbol, "", 18, 1.0).with_price(value, PriceSource::Dex)
    }

    #[test]
    fn test_filter_dust_keeps_native_and_valuable() {
        let rows = vec![
            TokenBalanceRow::native(Chain::Pulse, 0.0),
            row("DUST", 0.005),
            row("REAL", 5.0),
        ];
        let kept = filter_dust(rows.clone(), 0.01);
        assert_eq!(kept, vec![rows[0].clone(), rows[2].clone()]);
    }

    #[test]
    fn test_filter_dust_threshold_is_strict() {
        let rows = vec![TokenBalanceRow::native(Chain::Eth, 1.0), row("EDGE", 0.01), row("ABOVE", 0.0101)];
        let kept = filter_dust(rows, 0.01);
        let symbols: Vec<_> = kept.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["ETH", "ABOVE"]);
        assert!(filter_dust(Vec::new(), 0.01).is_empty());
    }

    #[test]
    fn test_junk_filter() {
        let filter = JunkFilter::from_policy(&PolicyConfig::default());
        assert!(filter.is_junk(&row("ethg", 1.0)));
        assert!(filter.is_junk(&row("AICC", 1.0)));
        assert!(filter.is_junk(&row("SCAM", 250_000.0)));
        assert!(!filter.is_junk(&row("PLSX", 0.00003)));

        let mut negative = row("NEG", 1.0);
        negative.amount = -1.0;
        assert!(filter.is_junk(&negative));

        assert!(!JunkFilter::disabled().is_junk(&row("ETHG", 1.0)));
    }
}
