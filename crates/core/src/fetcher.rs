//! Per-chain balance fetcher.
//!
//! A live fetch reads the token list from the primary indexer (secondary on
//! failure or an empty list), reads the native balance and native price
//! concurrently, fills missing prices from the indexer's per-token metadata
//! and then from the DEX aggregator, and finally hides dust. Row 0 is always
//! the native coin. Network failures never escape: they degrade to an empty
//! list or an unknown price.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use kinko_common::error::{KinkoError, KinkoResult};
use kinko_common::traits::BalanceIndexer;
use kinko_common::types::{Chain, PriceSource, TokenBalanceRow};

use crate::cache::ResponseCache;
use crate::filter::filter_dust;
use crate::price::PriceResolver;

/// Concurrent per-token metadata lookups during one live fetch.
const META_CONCURRENCY: usize = 4;

/// Source of one wallet's token rows on one chain.
#[async_trait]
pub trait TokenFetcher: Send + Sync {
    fn chain(&self) -> Chain;

    /// Rows for `address`, from cache unless `force`.
    async fn fetch_tokens(&self, address: &str, force: bool) -> KinkoResult<Vec<TokenBalanceRow>>;
}

/// Rows plus where they came from.
#[derive(Debug, Clone)]
pub struct FetchedTokens {
    pub rows: Vec<TokenBalanceRow>,
    /// Age of the cache entry served; `None` for a live fetch.
    pub cache_age_ms: Option<u64>,
}

/// Token rows and the indexer that produced them.
struct TokenList {
    rows: Vec<TokenBalanceRow>,
    source: Arc<dyn BalanceIndexer>,
    /// Every token endpoint failed; the list is a placeholder.
    degraded: bool,
}

/// Outcome of a live fetch before caching.
struct LiveFetch {
    rows: Vec<TokenBalanceRow>,
    /// Every token endpoint failed; the list is a placeholder.
    degraded: bool,
}

pub struct ChainFetcher {
    chain: Chain,
    primary: Arc<dyn BalanceIndexer>,
    fallback: Option<Arc<dyn BalanceIndexer>>,
    prices: Arc<PriceResolver>,
    cache: Arc<ResponseCache>,
    ttl_ms: u64,
    dust_usd: f64,
}

impl ChainFetcher {
    pub fn new(
        chain: Chain,
        primary: Arc<dyn BalanceIndexer>,
        prices: Arc<PriceResolver>,
        cache: Arc<ResponseCache>,
    ) -> Self {
        Self { chain, primary, fallback: None, prices, cache, ttl_ms: 600_000, dust_usd: 0.01 }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn BalanceIndexer>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    pub fn with_dust_threshold(mut self, min_usd: f64) -> Self {
        self.dust_usd = min_usd;
        self
    }

    pub fn cache_key(&self, address: &str) -> String {
        format!("{}:tokens:{}", self.chain, address.trim().to_lowercase())
    }

    /// Cached fetch. A fresh cache entry is served unless `force`; a live
    /// result is written back unless every token endpoint failed.
    pub async fn fetch(&self, address: &str, force: bool) -> KinkoResult<FetchedTokens> {
        let address = address.trim();
        if address.is_empty() {
            return Err(KinkoError::InvalidAddress("wallet address is required".into()));
        }

        let key = self.cache_key(address);
        if !force {
            if let Some(hit) = self.cache.get::<Vec<TokenBalanceRow>>(&key, self.ttl_ms) {
                debug!(chain = %self.chain, address, age_ms = hit.age_ms, "serving tokens from cache");
                return Ok(FetchedTokens { rows: hit.payload, cache_age_ms: Some(hit.age_ms) });
            }
        }

        let live = self.fetch_live(address).await;
        if live.degraded {
            warn!(chain = %self.chain, address, "token endpoints unavailable, result not cached");
        } else {
            self.cache.set(&key, &live.rows);
        }
        Ok(FetchedTokens { rows: live.rows, cache_age_ms: None })
    }

    /// Uncached fetch that overwrites the cache entry.
    pub async fn refresh(&self, address: &str) -> KinkoResult<Vec<TokenBalanceRow>> {
        Ok(self.fetch(address, true).await?.rows)
    }

    async fn fetch_live(&self, address: &str) -> LiveFetch {
        let ((native_amount, list), native_price) = tokio::join!(self.balances(address), self.native_price());

        let mut native = TokenBalanceRow::native(self.chain, native_amount);
        native.set_price(native_price.price_usd, native_price.source);

        let mut tokens = self.fill_from_meta(list.rows, list.source).await;
        self.fill_from_dex(&mut tokens).await;

        let mut rows = Vec::with_capacity(tokens.len() + 1);
        rows.push(native);
        rows.extend(tokens);
        for row in &mut rows {
            row.wallet_address = address.to_string();
        }

        let total_all: f64 = rows.iter().map(|r| r.value_usd).sum();
        let rows = filter_dust(rows, self.dust_usd);
        let total_shown: f64 = rows.iter().map(|r| r.value_usd).sum();
        info!(
            chain = %self.chain,
            address,
            rows = rows.len(),
            total_all,
            total_shown,
            "live fetch complete"
        );

        LiveFetch { rows, degraded: list.degraded }
    }

    /// Native balance and token list. The primary indexer is asked once for
    /// both; the fallback only for what the primary could not supply.
    async fn balances(&self, address: &str) -> (f64, TokenList) {
        let (native, tokens) = self.primary.balances(address).await;
        let mut native = self.accept_native(self.primary.as_ref(), native);

        let primary_failed = match tokens {
            Ok(rows) if !rows.is_empty() => {
                let amount = match native {
                    Some(amount) => amount,
                    None => self.fallback_native(address).await,
                };
                return (amount, TokenList { rows, source: self.primary.clone(), degraded: false });
            }
            Ok(_) => false,
            Err(e) => {
                warn!(chain = %self.chain, indexer = self.primary.name(), error = %e, "primary token list failed");
                true
            }
        };

        let list = match &self.fallback {
            None => TokenList { rows: Vec::new(), source: self.primary.clone(), degraded: primary_failed },
            Some(fallback) => {
                let tokens = if native.is_some() {
                    fallback.token_balances(address).await
                } else {
                    let (fb_native, fb_tokens) = fallback.balances(address).await;
                    native = self.accept_native(fallback.as_ref(), fb_native);
                    fb_tokens
                };
                match tokens {
                    Ok(rows) => TokenList { rows, source: fallback.clone(), degraded: false },
                    Err(e) => {
                        warn!(chain = %self.chain, indexer = fallback.name(), error = %e, "fallback token list failed");
                        TokenList { rows: Vec::new(), source: self.primary.clone(), degraded: primary_failed }
                    }
                }
            }
        };

        let amount = native.unwrap_or_else(|| {
            warn!(chain = %self.chain, address, "native balance unavailable");
            0.0
        });
        (amount, list)
    }

    async fn fallback_native(&self, address: &str) -> f64 {
        if let Some(fallback) = &self.fallback {
            if let Some(amount) = self.accept_native(fallback.as_ref(), fallback.native_balance(address).await) {
                return amount;
            }
        }
        warn!(chain = %self.chain, address, "native balance unavailable");
        0.0
    }

    fn accept_native(&self, indexer: &dyn BalanceIndexer, result: KinkoResult<f64>) -> Option<f64> {
        match result {
            Ok(amount) => Some(amount),
            Err(e) => {
                debug!(chain = %self.chain, indexer = indexer.name(), error = %e, "native balance failed");
                None
            }
        }
    }

    async fn native_price(&self) -> crate::price::NativeQuote {
        match self.prices.native_price_usd(self.chain).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!(chain = %self.chain, error = %e, "native price unavailable");
                crate::price::NativeQuote::unknown()
            }
        }
    }

    /// Backfill price and icon from the indexer's per-token metadata.
    async fn fill_from_meta(&self, tokens: Vec<TokenBalanceRow>, indexer: Arc<dyn BalanceIndexer>) -> Vec<TokenBalanceRow> {
        stream::iter(tokens)
            .map(|mut row| {
                let indexer = indexer.clone();
                async move {
                    if row.has_price() || row.contract_address.is_empty() {
                        return row;
                    }
                    match indexer.token_meta(&row.contract_address).await {
                        Ok(meta) => {
                            if meta.exchange_rate > 0.0 {
                                row.set_price(meta.exchange_rate, PriceSource::Indexer);
                            }
                            if row.icon_url.is_none() {
                                row.icon_url = meta.icon_url;
                            }
                        }
                        Err(e) => debug!(token = %row.contract_address, error = %e, "token metadata lookup failed"),
                    }
                    row
                }
            })
            .buffered(META_CONCURRENCY)
            .collect()
            .await
    }

    async fn fill_from_dex(&self, tokens: &mut [TokenBalanceRow]) {
        let needs: Vec<String> = tokens
            .iter()
            .filter(|t| !t.has_price() && !t.contract_address.is_empty())
            .map(|t| t.contract_address.clone())
            .collect();
        if needs.is_empty() {
            return;
        }

        let prices = match self.prices.batch_token_prices(self.chain, &needs).await {
            Ok(prices) => prices,
            Err(e) => {
                warn!(chain = %self.chain, error = %e, "dex pricing unavailable");
                return;
            }
        };
        for row in tokens.iter_mut().filter(|t| !t.has_price()) {
            if let Some(p) = prices.get(&row.contract_address.to_lowercase()) {
                row.set_price(*p, PriceSource::Dex);
            }
        }
    }
}

#[async_trait]
impl TokenFetcher for ChainFetcher {
    fn chain(&self) -> Chain {
        self.chain
    }

    async fn fetch_tokens(&self, address: &str, force: bool) -> KinkoResult<Vec<TokenBalanceRow>> {
        Ok(self.fetch(address, force).await?.rows)
    }
}
