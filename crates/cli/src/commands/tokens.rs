use anyhow::Result;
use kinko_types::output::{TokenRow, TokensOutput};
use kinko_utils::output::{render, OutputFormat};

use super::helpers::{known_price, parse_chain};
use crate::factory::Runtime;

/// `kinko tokens <chain> <address> [--force]`
pub async fn run(chain: &str, address: &str, force: bool, fmt: OutputFormat) -> Result<()> {
    let chain = parse_chain(chain)?;
    let rt = Runtime::load()?;
    let fetched = rt.fetcher(chain)?.fetch(address, force).await?;

    let tokens: Vec<TokenRow> = fetched
        .rows
        .iter()
        .map(|r| TokenRow {
            symbol: r.symbol.clone(),
            name: r.name.clone(),
            contract: r.contract_address.clone(),
            decimals: r.decimals,
            amount: r.amount,
            price_usd: known_price(r),
            value_usd: r.value_usd,
            source: r.price_source.to_string(),
        })
        .collect();

    let output = TokensOutput {
        chain: chain.to_string(),
        address: address.trim().to_string(),
        cached: fetched.cache_age_ms.is_some(),
        age_secs: fetched.cache_age_ms.map(|ms| ms / 1000),
        total_usd: fetched.rows.iter().map(|r| r.value_usd).sum(),
        tokens,
    };
    render(fmt, &output)
}
