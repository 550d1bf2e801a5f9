//! Blockscout REST v2 client.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use kinko_common::error::{KinkoError, KinkoResult};
use kinko_common::http::{join_url, HttpClient};
use kinko_common::numeric::{from_units, DEFAULT_DECIMALS};
use kinko_common::traits::BalanceIndexer;
use kinko_common::types::{Chain, TokenBalanceRow, TokenMeta};

use crate::convert;

pub struct BlockscoutRest {
    http: HttpClient,
    chain: Chain,
    /// e.g. `https://api.scan.pulsechain.com/api/v2`
    v2_base: String,
    /// e.g. `https://api.scan.pulsechain.com/api`
    v1_base: String,
}

impl BlockscoutRest {
    pub fn new(chain: Chain, v2_base: &str, timeout_secs: u64) -> KinkoResult<Self> {
        let v2_base = v2_base.trim_end_matches('/').to_string();
        let v1_base = convert::legacy_api_base(&v2_base);
        info!(chain = %chain, base = %v2_base, "blockscout REST indexer initialized");
        Ok(Self { http: HttpClient::new("blockscout", timeout_secs)?, chain, v2_base, v1_base })
    }

    /// `GET {v2}/addresses/{a}` → `coin_balance` (wei).
    async fn native_v2(&self, address: &str) -> KinkoResult<f64> {
        let url = join_url(&self.v2_base, &format!("addresses/{address}"));
        let data = self.http.get_json(&url).await?;
        match data.get("coin_balance") {
            Some(v) if !v.is_null() => Ok(from_units(Some(v), DEFAULT_DECIMALS)),
            _ => Err(KinkoError::Parse("blockscout: coin_balance missing".into())),
        }
    }

    /// `GET {v1}?module=account&action=balance&address=` → `result` (wei).
    async fn native_v1(&self, address: &str) -> KinkoResult<f64> {
        let req = self
            .http
            .get(&self.v1_base)
            .query(&[("module", "account"), ("action", "balance"), ("address", address)]);
        let data = self.http.send_json(req).await?;
        match data.get("result") {
            Some(v) if !v.is_null() => Ok(from_units(Some(v), DEFAULT_DECIMALS)),
            _ => Err(KinkoError::Parse("blockscout: balance result missing".into())),
        }
    }
}

#[async_trait]
impl BalanceIndexer for BlockscoutRest {
    fn chain(&self) -> Chain {
        self.chain
    }

    fn name(&self) -> &str {
        "blockscout-rest"
    }

    async fn native_balance(&self, address: &str) -> KinkoResult<f64> {
        match self.native_v2(address).await {
            Ok(amount) => Ok(amount),
            Err(e) => {
                debug!(chain = %self.chain, error = %e, "v2 native balance failed, trying legacy API");
                self.native_v1(address).await
            }
        }
    }

    async fn token_balances(&self, address: &str) -> KinkoResult<Vec<TokenBalanceRow>> {
        let url = join_url(&self.v2_base, &format!("addresses/{address}/token-balances"));
        let data = self.http.send_json(self.http.get(&url).query(&[("type", "ERC-20")])).await?;
        if !data.is_array() && data.get("items").is_none() {
            return Err(KinkoError::Parse("blockscout: unexpected token-balances shape".into()));
        }
        let rows = convert::balance_rows(self.chain, &data);
        debug!(chain = %self.chain, address, tokens = rows.len(), "blockscout token balances");
        Ok(rows)
    }

    async fn token_meta(&self, contract: &str) -> KinkoResult<TokenMeta> {
        let url = join_url(&self.v2_base, &format!("tokens/{contract}"));
        let data: Value = self.http.get_json(&url).await?;
        Ok(convert::token_meta(&data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const ADDR: &str = "0x1111111111111111111111111111111111111111";

    #[tokio::test]
    async fn test_token_balances_and_meta() {
        let mut server = mockito::Server::new_async().await;
        let list = server
            .mock("GET", format!("/api/v2/addresses/{ADDR}/token-balances").as_str())
            .match_query(Matcher::UrlEncoded("type".into(), "ERC-20".into()))
            .with_status(200)
            .with_body(r#"[{"value":"5000000000000000000","token":{"address":"0xAbC","symbol":"HEX","name":"HEX","decimals":"18","exchange_rate":null}}]"#)
            .create_async()
            .await;
        let meta = server
            .mock("GET", "/api/v2/tokens/0xabc")
            .with_status(200)
            .with_body(r#"{"exchange_rate":"0.0042","icon_url":"https://icons/hex.png"}"#)
            .create_async()
            .await;

        let client = BlockscoutRest::new(Chain::Pulse, &format!("{}/api/v2", server.url()), 5).unwrap();
        let rows = client.token_balances(ADDR).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].contract_address, "0xabc");
        assert_eq!(rows[0].amount, 5.0);
        assert!(!rows[0].has_price());

        let m = client.token_meta(&rows[0].contract_address).await.unwrap();
        assert_eq!(m.exchange_rate, 0.0042);
        assert_eq!(m.icon_url.as_deref(), Some("https://icons/hex.png"));

        list.assert_async().await;
        meta.assert_async().await;
    }

    #[tokio::test]
    async fn test_native_balance_falls_back_to_legacy_api() {
        let mut server = mockito::Server::new_async().await;
        let _m1 = server
            .mock("GET", format!("/api/v2/addresses/{ADDR}").as_str())
            .with_status(500)
            .create_async()
            .await;
        let legacy = server
            .mock("GET", "/api")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("module".into(), "account".into()),
                Matcher::UrlEncoded("action".into(), "balance".into()),
                Matcher::UrlEncoded("address".into(), ADDR.into()),
            ]))
            .with_status(200)
            .with_body(r#"{"status":"1","result":"1500000000000000000000"}"#)
            .create_async()
            .await;

        let client = BlockscoutRest::new(Chain::Pulse, &format!("{}/api/v2", server.url()), 5).unwrap();
        assert_eq!(client.native_balance(ADDR).await.unwrap(), 1500.0);
        legacy.assert_async().await;
    }

    #[tokio::test]
    async fn test_native_balance_v2() {
        let mut server = mockito::Server::new_async().await;
        let _m2 = server
            .mock("GET", format!("/api/v2/addresses/{ADDR}").as_str())
            .with_status(200)
            .with_body(r#"{"hash":"0x1111111111111111111111111111111111111111","coin_balance":"250000000000000000"}"#)
            .create_async()
            .await;

        let client = BlockscoutRest::new(Chain::Base, &format!("{}/api/v2", server.url()), 5).unwrap();
        assert_eq!(client.native_balance(ADDR).await.unwrap(), 0.25);
    }

    #[tokio::test]
    async fn test_rate_limit_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _m3 = server
            .mock("GET", Matcher::Regex("token-balances".into()))
            .with_status(429)
            .create_async()
            .await;

        let client = BlockscoutRest::new(Chain::Base, &format!("{}/api/v2", server.url()), 5).unwrap();
        assert!(matches!(client.token_balances(ADDR).await, Err(KinkoError::RateLimited(_))));
    }
}
