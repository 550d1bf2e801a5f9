//! Unified output rendering: JSON or human-readable table.
//!
//! Usage:
//! ```ignore
//! use kinko_utils::output::{OutputFormat, render};
//!
//! let data = PortfolioOutput { ... };
//! render(format, &data)?;
//! ```

use anyhow::Result;
use serde::Serialize;

use crate::format::{format_age, format_amount, format_price, format_timestamp_ms, format_usd, short_address};

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table (default).
    Table,
    /// Compact JSON (for piping to jq, scripts).
    Json,
    /// Pretty-printed JSON (for reading).
    JsonPretty,
}

/// Trait for types that can render as a human-readable table.
///
/// Implement this on each structured output type to define
/// how it looks in table mode.
pub trait TableDisplay {
    fn print_table(&self);
}

/// Render structured output as JSON or table depending on format.
///
/// For JSON formats, uses `serde_json` serialization.
/// For table format, calls `TableDisplay::print_table()`.
pub fn render<T: Serialize + TableDisplay>(format: OutputFormat, data: &T) -> Result<()> {
    match format {
        OutputFormat::Table => {
            data.print_table();
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string(data)?;
            println!("{json}");
            Ok(())
        }
        OutputFormat::JsonPretty => {
            let json = serde_json::to_string_pretty(data)?;
            println!("{json}");
            Ok(())
        }
    }
}

/// Render just the JSON formats (for types that handle their own table display).
/// Returns true if JSON was rendered, false if table mode was requested.
pub fn render_json_or<T: Serialize>(format: OutputFormat, data: &T) -> Result<bool> {
    match format {
        OutputFormat::Table => Ok(false),
        OutputFormat::Json => {
            let json = serde_json::to_string(data)?;
            println!("{json}");
            Ok(true)
        }
        OutputFormat::JsonPretty => {
            let json = serde_json::to_string_pretty(data)?;
            println!("{json}");
            Ok(true)
        }
    }
}

// ─── TableDisplay implementations for output types ──────────────────

use kinko_types::output::*;

impl TableDisplay for PortfolioOutput {
    fn print_table(&self) {
        println!("╔══════════════════════════════════════════════════════════════════════╗");
        println!("║  PORTFOLIO ({:<5}) {:>49} ║", self.scope, format!("{} wallet(s)", self.wallets.len()));
        println!("║  Total value : {:<54} ║", format_usd(self.total_usd));
        println!("╚══════════════════════════════════════════════════════════════════════╝");

        if self.tokens.is_empty() {
            println!("No holdings.");
            return;
        }

        println!("┌───────┬──────────┬──────────────────┬──────────────┬──────────────┐");
        println!("│ Chain │ Symbol   │ Amount           │ Price        │ Value        │");
        println!("├───────┼──────────┼──────────────────┼──────────────┼──────────────┤");
        for t in &self.tokens {
            println!(
                "│ {:<5} │ {:<8} │ {:>16} │ {:>12} │ {:>12} │",
                t.chain,
                truncate(&t.symbol, 8),
                format_amount(t.amount),
                format_price(t.price_usd),
                format_usd(t.value_usd),
            );
            if t.breakdown.len() > 1 {
                for share in &t.breakdown {
                    println!(
                        "│       │   ↳ {:<13} {:>12} │ {:>12} │ {:>12} │",
                        short_address(&share.wallet),
                        format_amount(share.amount),
                        "",
                        format_usd(share.value_usd),
                    );
                }
            }
        }
        println!("└───────┴──────────┴──────────────────┴──────────────┴──────────────┘");
    }
}

impl TableDisplay for TokensOutput {
    fn print_table(&self) {
        let origin = match (self.cached, self.age_secs) {
            (true, Some(age)) => format!("cached, {} old", format_age(age)),
            (true, None) => "cached".to_string(),
            _ => "live".to_string(),
        };
        println!("{} on {} ({origin})", self.address, self.chain);
        if self.tokens.is_empty() {
            println!("No token balances.");
            return;
        }

        println!("┌──────────┬────────────────┬──────────────────┬──────────────┬──────────────┬─────────┐");
        println!("│ Symbol   │ Contract       │ Amount           │ Price        │ Value        │ Source  │");
        println!("├──────────┼────────────────┼──────────────────┼──────────────┼──────────────┼─────────┤");
        for t in &self.tokens {
            println!(
                "│ {:<8} │ {:<14} │ {:>16} │ {:>12} │ {:>12} │ {:<7} │",
                truncate(&t.symbol, 8),
                short_address(&t.contract),
                format_amount(t.amount),
                format_price(t.price_usd),
                format_usd(t.value_usd),
                t.source,
            );
        }
        println!("└──────────┴────────────────┴──────────────────┴──────────────┴──────────────┴─────────┘");
        println!("Total: {}", format_usd(self.total_usd));
    }
}

impl TableDisplay for PriceOutput {
    fn print_table(&self) {
        match self.price_usd {
            Some(p) => println!("{} {} = {} ({})", self.chain, self.asset, format_usd(p), self.source),
            None => println!("{} {}: no usable price", self.chain, self.asset),
        }
    }
}

impl TableDisplay for WalletListOutput {
    fn print_table(&self) {
        if self.wallets.is_empty() {
            println!("No wallets. Add one with `kinko wallet add <address>`.");
            return;
        }
        println!("┌──────────────────────────────────────────────┬──────────────────┬───────┐");
        println!("│ Address                                      │ Name             │ Chain │");
        println!("├──────────────────────────────────────────────┼──────────────────┼───────┤");
        for w in &self.wallets {
            println!(
                "│ {:<44} │ {:<16} │ {:<5} │",
                w.address,
                truncate(w.name.as_deref().unwrap_or("—"), 16),
                w.chain.as_deref().unwrap_or("—"),
            );
        }
        println!("└──────────────────────────────────────────────┴──────────────────┴───────┘");
    }
}

impl TableDisplay for CacheListOutput {
    fn print_table(&self) {
        if self.entries.is_empty() {
            println!("Cache is empty.");
            return;
        }
        println!("┌──────────────────────────────────────────────────────────────┬─────────────────────┬────────┬──────────┐");
        println!("│ Key                                                          │ Stored (UTC)        │ Age    │ Bytes    │");
        println!("├──────────────────────────────────────────────────────────────┼─────────────────────┼────────┼──────────┤");
        for e in &self.entries {
            println!(
                "│ {:<60} │ {:<19} │ {:>6} │ {:>8} │",
                truncate(&e.key, 60),
                format_timestamp_ms(e.stored_at_ms),
                format_age(e.age_secs),
                e.bytes,
            );
        }
        println!("└──────────────────────────────────────────────────────────────┴─────────────────────┴────────┴──────────┘");
    }
}

impl TableDisplay for SyncOutput {
    fn print_table(&self) {
        println!(
            "✓ {} portfolio {} (version {}, {} backend, {} wallet(s))",
            self.action, self.slug, self.version, self.backend, self.wallets,
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn portfolio() -> PortfolioOutput {
        PortfolioOutput {
            scope: "auto".into(),
            wallets: vec!["0xaaa".into(), "0xbbb".into()],
            total_usd: 200.0,
            tokens: vec![PortfolioTokenRow {
                chain: "eth".into(),
                symbol: "USDC".into(),
                name: "USD Coin".into(),
                contract: "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".into(),
                amount: 200.0,
                price_usd: Some(1.0),
                value_usd: 200.0,
                breakdown: vec![
                    ShareRow { wallet: "0xaaa".into(), amount: 150.0, value_usd: 150.0 },
                    ShareRow { wallet: "0xbbb".into(), amount: 50.0, value_usd: 50.0 },
                ],
            }],
        }
    }

    #[test]
    fn test_render_json() {
        render(OutputFormat::Json, &portfolio()).unwrap();
    }

    #[test]
    fn test_render_json_pretty() {
        render(OutputFormat::JsonPretty, &WalletListOutput { wallets: vec![] }).unwrap();
    }

    #[test]
    fn test_render_table() {
        render(OutputFormat::Table, &portfolio()).unwrap();
        render(OutputFormat::Table, &CacheListOutput { entries: vec![] }).unwrap();
    }

    #[test]
    fn test_render_json_or_returns_false_for_table() {
        let was_json = render_json_or(OutputFormat::Table, &portfolio()).unwrap();
        assert!(!was_json);
    }

    #[test]
    fn test_render_json_or_returns_true_for_json() {
        let was_json = render_json_or(OutputFormat::Json, &portfolio()).unwrap();
        assert!(was_json);
    }

    #[test]
    fn test_portfolio_json_shape() {
        let json = serde_json::to_value(portfolio()).unwrap();
        assert_eq!(json["total_usd"], 200.0);
        assert_eq!(json["tokens"][0]["breakdown"][0]["wallet"], "0xaaa");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("USDC", 8), "USDC");
        assert_eq!(truncate("VERYLONGSYMBOL", 8), "VERYLON…");
    }
}
