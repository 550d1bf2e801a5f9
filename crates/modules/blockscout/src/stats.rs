//! Native coin price from the explorer's own stats endpoints.
//!
//! Both endpoints report the price under several field names depending on
//! the deployment; the first candidate inside the configured range wins.

use async_trait::async_trait;
use serde_json::Value;

use kinko_common::error::{KinkoError, KinkoResult};
use kinko_common::http::{join_url, HttpClient};
use kinko_common::numeric::safe_number_opt;
use kinko_common::traits::SpotPriceSource;
use kinko_common::types::PriceSource;

use crate::convert::legacy_api_base;

/// Open interval a candidate price must fall in.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    min: f64,
    max: f64,
}

impl Bounds {
    const ANY: Bounds = Bounds { min: 0.0, max: f64::INFINITY };

    fn pick(self, object: &Value, fields: &[&str]) -> Option<f64> {
        fields
            .iter()
            .map(|f| safe_number_opt(object.get(*f)))
            .find(|p| *p > self.min && *p < self.max)
    }
}

/// `GET {v2}/stats` → `coin_price | usd_price | native_coin_price`.
pub struct BlockscoutStatsPrice {
    http: HttpClient,
    url: String,
    bounds: Bounds,
}

impl BlockscoutStatsPrice {
    pub fn new(v2_base: &str, timeout_secs: u64) -> KinkoResult<Self> {
        Ok(Self {
            http: HttpClient::new("blockscout-stats", timeout_secs)?,
            url: join_url(v2_base, "stats"),
            bounds: Bounds::ANY,
        })
    }

    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.bounds = Bounds { min, max };
        self
    }
}

#[async_trait]
impl SpotPriceSource for BlockscoutStatsPrice {
    fn name(&self) -> &str {
        "blockscout-stats"
    }

    fn source(&self) -> PriceSource {
        PriceSource::Indexer
    }

    async fn price_usd(&self) -> KinkoResult<f64> {
        let data = self.http.get_json(&self.url).await?;
        self.bounds
            .pick(&data, &["coin_price", "usd_price", "native_coin_price"])
            .ok_or_else(|| KinkoError::Parse("blockscout-stats: no usable coin price".into()))
    }
}

/// `GET {v1}?module=stats&action=coinprice` → `result.{usd|USD|ethusd|price|usdPrice}`.
pub struct BlockscoutCoinPrice {
    http: HttpClient,
    v1_base: String,
    bounds: Bounds,
}

impl BlockscoutCoinPrice {
    /// Takes the REST v2 base; the legacy API base is derived from it.
    pub fn new(v2_base: &str, timeout_secs: u64) -> KinkoResult<Self> {
        Ok(Self {
            http: HttpClient::new("blockscout-coinprice", timeout_secs)?,
            v1_base: legacy_api_base(v2_base),
            bounds: Bounds::ANY,
        })
    }

    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.bounds = Bounds { min, max };
        self
    }
}

#[async_trait]
impl SpotPriceSource for BlockscoutCoinPrice {
    fn name(&self) -> &str {
        "blockscout-coinprice"
    }

    fn source(&self) -> PriceSource {
        PriceSource::Indexer
    }

    async fn price_usd(&self) -> KinkoResult<f64> {
        let req = self.http.get(&self.v1_base).query(&[("module", "stats"), ("action", "coinprice")]);
        let data = self.http.send_json(req).await?;
        let result = match data.get("result") {
            Some(r) if r.is_object() => r,
            _ => &data,
        };
        self.bounds
            .pick(result, &["usd", "USD", "ethusd", "price", "usdPrice"])
            .ok_or_else(|| KinkoError::Parse("blockscout-coinprice: no usable coin price".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stats_price_respects_bounds() {
        let mut server = mockito::Server::new_async().await;
        let _m1 = server
            .mock("GET", "/api/v2/stats")
            .with_status(200)
            .with_body(r#"{"coin_price":"1843.2","usd_price":null,"native_coin_price":"0.0000321"}"#)
            .create_async()
            .await;

        let base = format!("{}/api/v2", server.url());
        let any = BlockscoutStatsPrice::new(&base, 5).unwrap();
        assert_eq!(any.price_usd().await.unwrap(), 1843.2);

        let pls = BlockscoutStatsPrice::new(&base, 5).unwrap().with_bounds(0.0, 1.0);
        assert_eq!(pls.price_usd().await.unwrap(), 0.0000321);
        assert_eq!(pls.source(), PriceSource::Indexer);
    }

    #[tokio::test]
    async fn test_coinprice_result_object() {
        let mut server = mockito::Server::new_async().await;
        let _m2 = server
            .mock("GET", "/api")
            .match_query(mockito::Matcher::UrlEncoded("action".into(), "coinprice".into()))
            .with_status(200)
            .with_body(r#"{"message":"OK","result":{"coin_usd":"x","usd":"0.000033"},"status":"1"}"#)
            .create_async()
            .await;

        let source = BlockscoutCoinPrice::new(&format!("{}/api/v2", server.url()), 5)
            .unwrap()
            .with_bounds(0.0, 1.0);
        assert_eq!(source.price_usd().await.unwrap(), 0.000033);
    }

    #[tokio::test]
    async fn test_coinprice_out_of_range_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _m3 = server
            .mock("GET", "/api")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"result":{"usd":"12.5"}}"#)
            .create_async()
            .await;

        let source = BlockscoutCoinPrice::new(&format!("{}/api/v2", server.url()), 5)
            .unwrap()
            .with_bounds(0.0, 1.0);
        assert!(matches!(source.price_usd().await, Err(KinkoError::Parse(_))));
    }
}
