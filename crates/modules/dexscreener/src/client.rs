//! DEX Screener REST client.
//!
//! ```text
//! GET /tokens/{a,b,c}     → { pairs: [...] | null }
//! GET /search?q=<query>   → { pairs: [...] | null }
//! ```
//! Numeric fields arrive as strings; they are coerced here so core only
//! sees finite numbers.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use kinko_common::error::KinkoResult;
use kinko_common::http::{join_url, HttpClient};
use kinko_common::numeric::{safe_number_opt, safe_str};
use kinko_common::traits::PairSource;
use kinko_common::types::DexPair;

pub struct DexScreenerClient {
    http: HttpClient,
    base_url: String,
}

impl DexScreenerClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> KinkoResult<Self> {
        Ok(Self { http: HttpClient::new("dexscreener", timeout_secs)?, base_url: base_url.trim_end_matches('/').to_string() })
    }
}

/// Base/quote ratio: `priceNative`, else the older `price` field.
fn base_per_quote(p: &Value) -> f64 {
    match safe_number_opt(p.get("priceNative")) {
        n if n > 0.0 => n,
        _ => safe_number_opt(p.get("price")),
    }
}

fn parse_pair(p: &Value) -> DexPair {
    DexPair {
        chain_id: safe_str(p.get("chainId")),
        base_address: safe_str(p.pointer("/baseToken/address")),
        base_symbol: safe_str(p.pointer("/baseToken/symbol")),
        quote_address: safe_str(p.pointer("/quoteToken/address")),
        quote_symbol: safe_str(p.pointer("/quoteToken/symbol")),
        price_usd: safe_number_opt(p.get("priceUsd")),
        price_native: base_per_quote(p),
        liquidity_usd: safe_number_opt(p.pointer("/liquidity/usd")),
    }
}

/// `pairs` array of a response; `null` or missing means none.
pub fn parse_pairs(data: &Value) -> Vec<DexPair> {
    data.get("pairs")
        .and_then(Value::as_array)
        .map(|pairs| pairs.iter().map(parse_pair).collect())
        .unwrap_or_default()
}

#[async_trait]
impl PairSource for DexScreenerClient {
    async fn pairs_for_tokens(&self, addresses: &[String]) -> KinkoResult<Vec<DexPair>> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }
        let url = join_url(&self.base_url, &format!("tokens/{}", addresses.join(",")));
        let pairs = parse_pairs(&self.http.get_json(&url).await?);
        debug!(tokens = addresses.len(), pairs = pairs.len(), "dexscreener token pairs");
        Ok(pairs)
    }

    async fn search_pairs(&self, query: &str) -> KinkoResult<Vec<DexPair>> {
        let url = join_url(&self.base_url, "search");
        let data = self.http.send_json(self.http.get(&url).query(&[("q", query)])).await?;
        let pairs = parse_pairs(&data);
        debug!(query, pairs = pairs.len(), "dexscreener search");
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const PAIRS: &str = r#"{
        "schemaVersion": "1.0.0",
        "pairs": [
            {
                "chainId": "pulsechain",
                "dexId": "pulsex",
                "baseToken": { "address": "0xA1077a294dDE1B09bB078844df40758a5D0f9a27", "symbol": "WPLS" },
                "quoteToken": { "address": "0xefD766cCb38EaF1dfd701853BFCe31359239F305", "symbol": "DAI" },
                "priceNative": "0.0000342",
                "priceUsd": "0.0000341",
                "liquidity": { "usd": 1250000.5 }
            },
            { "chainId": "pulsechain", "priceUsd": "abc" }
        ]
    }"#;

    #[tokio::test]
    async fn test_pairs_for_tokens_joins_addresses() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/tokens/0xaaa,0xbbb")
            .with_status(200)
            .with_body(PAIRS)
            .create_async()
            .await;

        let client = DexScreenerClient::new(&server.url(), 5).unwrap();
        let pairs = client.pairs_for_tokens(&["0xaaa".into(), "0xbbb".into()]).await.unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].base_symbol, "WPLS");
        assert_eq!(pairs[0].price_usd, 0.0000341);
        assert_eq!(pairs[0].liquidity_usd, 1250000.5);
        assert_eq!(pairs[1].price_usd, 0.0);
        assert_eq!(pairs[1].liquidity_usd, 0.0);
        mock.assert_async().await;

        assert!(client.pairs_for_tokens(&[]).await.unwrap().is_empty());
    }

    #[test]
    fn test_ratio_from_price_field() {
        let data: Value = serde_json::from_str(
            r#"{"pairs":[
                {
                    "chainId": "pulsechain",
                    "baseToken": { "address": "0xbase", "symbol": "WPLS" },
                    "quoteToken": { "address": "0xquote", "symbol": "TOK" },
                    "priceUsd": "2.0",
                    "price": "4.0",
                    "liquidity": { "usd": 900 }
                },
                { "chainId": "pulsechain", "priceNative": "0.5", "price": "4.0" }
            ]}"#,
        )
        .unwrap();
        let pairs = parse_pairs(&data);
        assert_eq!(pairs[0].quote_address, "0xquote");
        assert_eq!(pairs[0].price_native, 4.0);
        assert_eq!(pairs[0].price_usd / pairs[0].price_native, 0.5);
        assert_eq!(pairs[1].price_native, 0.5);
    }

    #[tokio::test]
    async fn test_search_null_pairs() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search")
            .match_query(Matcher::UrlEncoded("q".into(), "WPLS chain:pulsechain".into()))
            .with_status(200)
            .with_body(r#"{"schemaVersion":"1.0.0","pairs":null}"#)
            .create_async()
            .await;

        let client = DexScreenerClient::new(&server.url(), 5).unwrap();
        assert!(client.search_pairs("WPLS chain:pulsechain").await.unwrap().is_empty());
        mock.assert_async().await;
    }
}
