//! Ethplorer `getAddressInfo` client.
//!
//! One call returns both the native ETH balance (already in ether) and the
//! ERC-20 holdings with raw balances. The optional `tokenInfo.price.rate`
//! snapshot is used as an indexer price.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use kinko_common::error::{KinkoError, KinkoResult};
use kinko_common::http::{join_url, HttpClient};
use kinko_common::numeric::{from_units, opt_str, parse_decimals, safe_number_opt, safe_str};
use kinko_common::traits::BalanceIndexer;
use kinko_common::types::{Chain, PriceSource, TokenBalanceRow};

pub struct EthplorerClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
}

impl EthplorerClient {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> KinkoResult<Self> {
        info!(base = base_url, "ethplorer indexer initialized");
        Ok(Self {
            http: HttpClient::new("ethplorer", timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn address_info(&self, address: &str) -> KinkoResult<Value> {
        let url = join_url(&self.base_url, &format!("getAddressInfo/{address}"));
        let data = self.http.send_json(self.http.get(&url).query(&[("apiKey", self.api_key.as_str())])).await?;
        if let Some(err) = data.get("error") {
            let message = err.get("message").and_then(Value::as_str).unwrap_or("unknown error");
            return Err(KinkoError::Http {
                status: err.get("code").and_then(Value::as_u64).and_then(|c| u16::try_from(c).ok()).unwrap_or(0),
                body: format!("ethplorer: {message}"),
            });
        }
        Ok(data)
    }
}

fn native_from(data: &Value) -> f64 {
    safe_number_opt(data.pointer("/ETH/balance")).max(0.0)
}

fn tokens_from(data: &Value) -> Vec<TokenBalanceRow> {
    data.get("tokens")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(token_row).collect())
        .unwrap_or_default()
}

/// One `tokens[]` entry.
fn token_row(item: &Value) -> Option<TokenBalanceRow> {
    let info = item.get("tokenInfo")?;
    let contract = opt_str(info.get("address"))?;
    let decimals = parse_decimals(info.get("decimals"));
    let amount = from_units(item.get("balance"), decimals);
    if amount <= 0.0 {
        return None;
    }

    let mut row = TokenBalanceRow::token(
        Chain::Eth,
        &contract,
        &safe_str(info.get("symbol")),
        &safe_str(info.get("name")),
        decimals,
        0.0,
    );
    row.set_amount(amount);
    // `price` is `false` when Ethplorer has no quote
    let hint = info.get("price").map(|p| safe_number_opt(p.get("rate"))).unwrap_or(0.0);
    row.set_price(hint, PriceSource::Indexer);
    if let Some(image) = opt_str(info.get("image")) {
        row.icon_url = Some(if image.starts_with("http") { image } else { format!("https://ethplorer.io{image}") });
    }
    Some(row)
}

#[async_trait]
impl BalanceIndexer for EthplorerClient {
    fn chain(&self) -> Chain {
        Chain::Eth
    }

    fn name(&self) -> &str {
        "ethplorer"
    }

    async fn native_balance(&self, address: &str) -> KinkoResult<f64> {
        Ok(native_from(&self.address_info(address).await?))
    }

    async fn token_balances(&self, address: &str) -> KinkoResult<Vec<TokenBalanceRow>> {
        let rows = tokens_from(&self.address_info(address).await?);
        debug!(address, tokens = rows.len(), "ethplorer token balances");
        Ok(rows)
    }

    async fn balances(&self, address: &str) -> (KinkoResult<f64>, KinkoResult<Vec<TokenBalanceRow>>) {
        match self.address_info(address).await {
            Ok(data) => {
                let rows = tokens_from(&data);
                debug!(address, tokens = rows.len(), "ethplorer balances");
                (Ok(native_from(&data)), Ok(rows))
            }
            Err(e) => (Err(e.clone()), Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const ADDR: &str = "0x3333333333333333333333333333333333333333";

    const BODY: &str = r#"{
        "address": "0x3333333333333333333333333333333333333333",
        "ETH": { "balance": 1.25, "price": { "rate": 3100.5 } },
        "tokens": [
            {
                "tokenInfo": { "address": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", "symbol": "USDC", "name": "USD Coin", "decimals": "6", "price": { "rate": 0.9998 }, "image": "/images/usdc.png" },
                "balance": 125000000
            },
            {
                "tokenInfo": { "address": "0xdead", "symbol": "SPAM", "name": "Spam", "decimals": "18", "price": false },
                "balance": "42000000000000000000"
            },
            {
                "tokenInfo": { "address": "0xempty", "symbol": "GONE", "name": "Sold", "decimals": "18" },
                "balance": 0
            },
            { "balance": 1 }
        ]
    }"#;

    async fn server_with(body: &str, status: usize) -> (mockito::ServerGuard, mockito::Mock) {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", format!("/getAddressInfo/{ADDR}").as_str())
            .match_query(Matcher::UrlEncoded("apiKey".into(), "freekey".into()))
            .with_status(status)
            .with_body(body)
            .create_async()
            .await;
        (server, mock)
    }

    #[tokio::test]
    async fn test_address_info_parsing() {
        let (server, _mock) = server_with(BODY, 200).await;
        let client = EthplorerClient::new(&server.url(), "freekey", 5).unwrap();

        assert_eq!(client.native_balance(ADDR).await.unwrap(), 1.25);

        let rows = client.token_balances(ADDR).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].amount, 125.0);
        assert_eq!(rows[0].unit_price_usd, 0.9998);
        assert_eq!(rows[0].price_source, PriceSource::Indexer);
        assert_eq!(rows[0].icon_url.as_deref(), Some("https://ethplorer.io/images/usdc.png"));
        assert_eq!(rows[1].amount, 42.0);
        assert!(!rows[1].has_price());
    }

    #[tokio::test]
    async fn test_balances_single_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", format!("/getAddressInfo/{ADDR}").as_str())
            .match_query(Matcher::UrlEncoded("apiKey".into(), "freekey".into()))
            .with_body(BODY)
            .expect(1)
            .create_async()
            .await;
        let client = EthplorerClient::new(&server.url(), "freekey", 5).unwrap();

        let (native, tokens) = client.balances(ADDR).await;
        assert_eq!(native.unwrap(), 1.25);
        assert_eq!(tokens.unwrap().len(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_code_out_of_range() {
        let (server, _mock) = server_with(r#"{"error":{"code":70000,"message":"odd"}}"#, 200).await;
        let client = EthplorerClient::new(&server.url(), "freekey", 5).unwrap();
        let (native, tokens) = client.balances(ADDR).await;
        assert!(matches!(native, Err(KinkoError::Http { status: 0, .. })));
        assert!(matches!(tokens, Err(KinkoError::Http { status: 0, .. })));
    }

    #[tokio::test]
    async fn test_error_payload() {
        let (server, _mock) = server_with(r#"{"error":{"code":104,"message":"Invalid address format"}}"#, 200).await;
        let client = EthplorerClient::new(&server.url(), "freekey", 5).unwrap();
        match client.token_balances(ADDR).await {
            Err(KinkoError::Http { status, body }) => {
                assert_eq!(status, 104);
                assert!(body.contains("Invalid address"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
