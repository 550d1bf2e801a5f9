//! Blockscout GraphQL client, used as the token-list fallback.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use kinko_common::error::{KinkoError, KinkoResult};
use kinko_common::http::HttpClient;
use kinko_common::numeric::{from_units, DEFAULT_DECIMALS};
use kinko_common::traits::BalanceIndexer;
use kinko_common::types::{Chain, TokenBalanceRow};

use crate::convert;

const TOKEN_BALANCES_QUERY: &str = r#"
query ($hash: AddressHash!) {
  address(hash: $hash) {
    tokenBalances {
      value
      token { address name symbol decimals icon_url exchange_rate type }
    }
  }
}"#;

const COIN_BALANCE_QUERY: &str = r#"
query ($hash: AddressHash!) {
  address(hash: $hash) { fetchedCoinBalance }
}"#;

pub struct BlockscoutGraphql {
    http: HttpClient,
    chain: Chain,
    endpoint: String,
}

impl BlockscoutGraphql {
    pub fn new(chain: Chain, endpoint: &str, timeout_secs: u64) -> KinkoResult<Self> {
        info!(chain = %chain, endpoint, "blockscout GraphQL indexer initialized");
        Ok(Self { http: HttpClient::new("blockscout-graphql", timeout_secs)?, chain, endpoint: endpoint.to_string() })
    }

    /// POST `{ query, variables: { hash } }` and return `data.address`.
    async fn address_query(&self, query: &str, address: &str) -> KinkoResult<Value> {
        let body = json!({ "query": query, "variables": { "hash": address } });
        let data = self.http.send_json(self.http.post(&self.endpoint).json(&body)).await?;

        if let Some(errors) = data.get("errors").and_then(Value::as_array).filter(|e| !e.is_empty()) {
            let message = errors[0].get("message").and_then(Value::as_str).unwrap_or("unknown error");
            return Err(KinkoError::Parse(format!("blockscout-graphql: {message}")));
        }
        Ok(data.pointer("/data/address").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl BalanceIndexer for BlockscoutGraphql {
    fn chain(&self) -> Chain {
        self.chain
    }

    fn name(&self) -> &str {
        "blockscout-graphql"
    }

    async fn native_balance(&self, address: &str) -> KinkoResult<f64> {
        let data = self.address_query(COIN_BALANCE_QUERY, address).await?;
        match data.get("fetchedCoinBalance") {
            Some(v) if !v.is_null() => Ok(from_units(Some(v), DEFAULT_DECIMALS)),
            _ => Err(KinkoError::Parse("blockscout-graphql: fetchedCoinBalance missing".into())),
        }
    }

    async fn token_balances(&self, address: &str) -> KinkoResult<Vec<TokenBalanceRow>> {
        let data = self.address_query(TOKEN_BALANCES_QUERY, address).await?;
        let rows: Vec<TokenBalanceRow> = data
            .get("tokenBalances")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|item| convert::balance_row(self.chain, item)).collect())
            .unwrap_or_default();
        debug!(chain = %self.chain, address, tokens = rows.len(), "blockscout GraphQL token balances");
        Ok(rows)
    }
}
