//! Blockscout payloads → kinko universal types.

use serde_json::Value;
use tracing::debug;
use url::Url;

use kinko_common::numeric::{from_units, opt_str, parse_decimals, safe_number_opt, safe_str};
use kinko_common::types::{Chain, PriceSource, TokenBalanceRow, TokenMeta};

/// One `{ value, token { .. } }` entry (REST v2 and GraphQL share the shape).
///
/// Entries without a token address are dropped; they would otherwise merge
/// with the native coin. So are zero balances.
pub fn balance_row(chain: Chain, item: &Value) -> Option<TokenBalanceRow> {
    let token = item.get("token")?;
    let contract = opt_str(token.get("address")).or_else(|| opt_str(token.get("address_hash")));
    let Some(contract) = contract else {
        debug!(chain = %chain, "token balance without address skipped");
        return None;
    };

    let decimals = parse_decimals(token.get("decimals"));
    let amount = from_units(item.get("value"), decimals);
    if amount <= 0.0 {
        return None;
    }
    let mut row = TokenBalanceRow::token(
        chain,
        &contract,
        &safe_str(token.get("symbol")),
        &safe_str(token.get("name")),
        decimals,
        amount,
    );
    row.set_amount(amount);
    row.set_price(safe_number_opt(token.get("exchange_rate")), PriceSource::Indexer);
    row.icon_url = opt_str(token.get("icon_url"));
    Some(row)
}

/// Rows from a list that is either a bare array or `{ items: [...] }`.
pub fn balance_rows(chain: Chain, data: &Value) -> Vec<TokenBalanceRow> {
    let items = data
        .as_array()
        .or_else(|| data.get("items").and_then(Value::as_array));
    items
        .map(|items| items.iter().filter_map(|item| balance_row(chain, item)).collect())
        .unwrap_or_default()
}

/// `GET /tokens/{addr}` payload.
pub fn token_meta(data: &Value) -> TokenMeta {
    TokenMeta {
        exchange_rate: safe_number_opt(data.get("exchange_rate")),
        icon_url: opt_str(data.get("icon_url")),
    }
}

/// Legacy `?module=` API base from a REST v2 base:
/// `https://host/api/v2` → `https://host/api`.
pub fn legacy_api_base(v2_base: &str) -> String {
    let trimmed = v2_base.trim_end_matches('/');
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.trim_end_matches("/v2").to_string();
    };
    let segments: Vec<String> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).map(str::to_string).collect())
        .unwrap_or_default();
    let kept: Vec<&str> = match segments.split_last() {
        Some((last, rest)) if last == "v2" => rest.iter().map(String::as_str).collect(),
        _ => segments.iter().map(String::as_str).collect(),
    };
    url.set_path(&kept.join("/"));
    url.to_string().trim_end_matches('/').to_string()
}
