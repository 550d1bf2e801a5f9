use anyhow::{bail, Result};
use kinko_common::types::Wallet;
use kinko_core::aggregator::{PortfolioOptions, PortfolioSession, PortfolioView, Scope};
use kinko_types::output::{PortfolioOutput, PortfolioTokenRow, ShareRow};
use kinko_utils::output::{render, OutputFormat};

use crate::factory::Runtime;

/// `kinko portfolio [--scope auto|eth|pulse|base] [--force]`
pub async fn run(scope: &str, force: bool, fmt: OutputFormat) -> Result<()> {
    let scope: Scope = scope.parse()?;
    let rt = Runtime::load()?;
    let wallets = rt.registry.list()?;
    if wallets.is_empty() {
        bail!("No wallets registered. Add one with: kinko wallet add <address>");
    }

    let session = PortfolioSession::new(rt.aggregator.clone());
    let Some(view) = session.request(&wallets, PortfolioOptions { scope, force }).await? else {
        bail!("portfolio request was superseded");
    };

    render(fmt, &to_output(scope, &wallets, &view))
}

fn to_output(scope: Scope, wallets: &[Wallet], view: &PortfolioView) -> PortfolioOutput {
    PortfolioOutput {
        scope: scope.to_string(),
        wallets: wallets.iter().map(|w| w.address.clone()).collect(),
        total_usd: view.total_usd,
        tokens: view
            .tokens
            .iter()
            .map(|t| PortfolioTokenRow {
                chain: t.chain.to_string(),
                symbol: t.symbol.clone(),
                name: t.name.clone(),
                contract: t.contract_address.clone(),
                amount: t.amount,
                price_usd: (t.unit_price_usd > 0.0).then_some(t.unit_price_usd),
                value_usd: t.value_usd,
                breakdown: t
                    .breakdown
                    .iter()
                    .map(|s| ShareRow { wallet: s.wallet_address.clone(), amount: s.amount, value_usd: s.value_usd })
                    .collect(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinko_common::types::{Chain, PriceSource, TokenBalanceRow};
    use kinko_core::aggregator::merge_rows;

    #[test]
    fn test_to_output_keeps_breakdown_and_unknown_prices() {
        let mut a = TokenBalanceRow::token(Chain::Eth, "0xusdc", "USDC", "USD Coin", 6, 150.0).with_price(1.0, PriceSource::Dex);
        a.wallet_address = "0xaaa".into();
        let mut b = a.clone();
        b.wallet_address = "0xbbb".into();
        b.set_amount(50.0);
        let mut junk = TokenBalanceRow::token(Chain::Pulse, "0xnew", "NEW", "", 18, 10.0);
        junk.wallet_address = "0xaaa".into();

        let tokens = merge_rows(vec![a, b, junk]);
        let view = PortfolioView { total_usd: tokens.iter().map(|t| t.value_usd).sum(), tokens };
        let out = to_output(Scope::Auto, &[Wallet::new("0xaaa"), Wallet::new("0xbbb")], &view);

        assert_eq!(out.scope, "auto");
        assert_eq!(out.total_usd, 200.0);
        assert_eq!(out.tokens[0].breakdown.len(), 2);
        assert_eq!(out.tokens[0].breakdown[0].wallet, "0xaaa");
        assert_eq!(out.tokens[1].price_usd, None);
    }
}
