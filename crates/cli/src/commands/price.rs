use anyhow::Result;
use kinko_common::types::NATIVE;
use kinko_types::output::PriceOutput;
use kinko_utils::output::{render, OutputFormat};

use super::helpers::parse_chain;
use crate::factory::Runtime;

/// `kinko price native <chain>`
pub async fn native(chain: &str, fmt: OutputFormat) -> Result<()> {
    let chain = parse_chain(chain)?;
    let rt = Runtime::load()?;
    let quote = rt.prices.native_price_usd(chain).await?;

    let output = PriceOutput {
        chain: chain.to_string(),
        asset: NATIVE.to_string(),
        price_usd: (quote.price_usd > 0.0).then_some(quote.price_usd),
        source: quote.source.to_string(),
    };
    render(fmt, &output)
}

/// `kinko price token <chain> <contract> [--hint <usd>]`
pub async fn token(chain: &str, contract: &str, hint: Option<f64>, fmt: OutputFormat) -> Result<()> {
    let chain = parse_chain(chain)?;
    let rt = Runtime::load()?;
    let price = rt.prices.token_price_usd(contract, chain, hint).await?;
    let hinted = hint.is_some_and(|h| h.is_finite() && h > 0.0);

    let output = PriceOutput {
        chain: chain.to_string(),
        asset: contract.trim().to_lowercase(),
        price_usd: (price > 0.0).then_some(price),
        source: match (price > 0.0, hinted) {
            (false, _) => "none",
            (true, true) => "hint",
            (true, false) => "dex",
        }
        .to_string(),
    };
    render(fmt, &output)
}
