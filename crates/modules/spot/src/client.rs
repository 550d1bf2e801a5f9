//! Coinbase and CoinGecko spot prices.

use async_trait::async_trait;

use kinko_common::error::{KinkoError, KinkoResult};
use kinko_common::http::{join_url, HttpClient};
use kinko_common::numeric::safe_number_opt;
use kinko_common::traits::SpotPriceSource;

/// `GET /v2/prices/{pair}/spot` → `data.amount`.
pub struct CoinbaseSpot {
    http: HttpClient,
    url: String,
    label: String,
}

impl CoinbaseSpot {
    /// `pair` such as `ETH-USD`.
    pub fn new(base_url: &str, pair: &str, timeout_secs: u64) -> KinkoResult<Self> {
        Ok(Self {
            http: HttpClient::new("coinbase", timeout_secs)?,
            url: join_url(base_url, &format!("v2/prices/{pair}/spot")),
            label: format!("coinbase:{pair}"),
        })
    }
}

#[async_trait]
impl SpotPriceSource for CoinbaseSpot {
    fn name(&self) -> &str {
        &self.label
    }

    async fn price_usd(&self) -> KinkoResult<f64> {
        let data = self.http.get_json(&self.url).await?;
        let price = safe_number_opt(data.pointer("/data/amount"));
        if price > 0.0 {
            Ok(price)
        } else {
            Err(KinkoError::Parse(format!("{}: no amount", self.label)))
        }
    }
}

/// `GET /simple/price?ids={id}&vs_currencies=usd` → `{id}.usd`.
pub struct CoinGeckoSimple {
    http: HttpClient,
    base_url: String,
    coin_id: String,
    label: String,
}

impl CoinGeckoSimple {
    /// `coin_id` such as `ethereum`.
    pub fn new(base_url: &str, coin_id: &str, timeout_secs: u64) -> KinkoResult<Self> {
        Ok(Self {
            http: HttpClient::new("coingecko", timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            coin_id: coin_id.to_string(),
            label: format!("coingecko:{coin_id}"),
        })
    }
}

#[async_trait]
impl SpotPriceSource for CoinGeckoSimple {
    fn name(&self) -> &str {
        &self.label
    }

    async fn price_usd(&self) -> KinkoResult<f64> {
        let url = join_url(&self.base_url, "simple/price");
        let req = self.http.get(&url).query(&[("ids", self.coin_id.as_str()), ("vs_currencies", "usd")]);
        let data = self.http.send_json(req).await?;
        let price = safe_number_opt(data.get(&self.coin_id).and_then(|c| c.get("usd")));
        if price > 0.0 {
            Ok(price)
        } else {
            Err(KinkoError::Parse(format!("{}: no usd price", self.label)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_coinbase_spot() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/prices/ETH-USD/spot")
            .with_status(200)
            .with_body(r#"{"data":{"amount":"3125.42","base":"ETH","currency":"USD"}}"#)
            .create_async()
            .await;

        let source = CoinbaseSpot::new(&server.url(), "ETH-USD", 5).unwrap();
        assert_eq!(source.price_usd().await.unwrap(), 3125.42);
        assert_eq!(source.name(), "coinbase:ETH-USD");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_coingecko_simple() {
        let mut server = mockito::Server::new_async().await;
        let _m1 = server
            .mock("GET", "/simple/price")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("ids".into(), "ethereum".into()),
                Matcher::UrlEncoded("vs_currencies".into(), "usd".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"ethereum":{"usd":3120.1}}"#)
            .create_async()
            .await;

        let source = CoinGeckoSimple::new(&server.url(), "ethereum", 5).unwrap();
        assert_eq!(source.price_usd().await.unwrap(), 3120.1);
    }

    #[tokio::test]
    async fn test_missing_price_and_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _m2 = server
            .mock("GET", "/simple/price")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        let _m3 = server
            .mock("GET", "/v2/prices/ETH-USD/spot")
            .with_status(503)
            .create_async()
            .await;

        let gecko = CoinGeckoSimple::new(&server.url(), "ethereum", 5).unwrap();
        assert!(matches!(gecko.price_usd().await, Err(KinkoError::Parse(_))));

        let coinbase = CoinbaseSpot::new(&server.url(), "ETH-USD", 5).unwrap();
        assert!(matches!(coinbase.price_usd().await, Err(KinkoError::Http { status: 503, .. })));
    }
}
