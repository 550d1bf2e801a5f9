//! USD price resolution for native coins and tokens.
//!
//! Token prices come from the indexer's exchange rate when one was supplied,
//! else from a liquidity-weighted average over DEX pairs. Native prices walk
//! an ordered list of spot sources and take the first value inside the
//! chain's sanity bounds. 0 always means "unknown".

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, info};

use kinko_common::error::{KinkoError, KinkoResult};
use kinko_common::traits::{PairSource, SpotPriceSource};
use kinko_common::types::{Chain, DexPair, PriceSource};
use kinko_types::config::{ChainEntry, DexConfig};

use crate::fallback::{first_valid, Attempt};

// ═══════════════════════════════════════════════════════════════════════
//  LIQUIDITY-WEIGHTED PRICE
// ═══════════════════════════════════════════════════════════════════════

/// Liquidity-weighted USD price of `token` from `pairs`.
///
/// Only pairs on `chain` that contain the token count. Pairs against a
/// stablecoin are preferred when any exist. When the token is the quote
/// side, its price is `base price / (base/quote ratio)`. A pair contributes
/// only if both its implied price and its liquidity are positive. With a
/// non-zero `max_pairs` only that many pairs, deepest first, are averaged;
/// 0 averages every qualifying pair.
pub fn weighted_price(token: &str, chain: Chain, pairs: &[DexPair], stables: &[String], max_pairs: usize) -> f64 {
    let chain_id = chain.dex_chain_id();
    let mine: Vec<(&DexPair, bool)> = pairs
        .iter()
        .filter(|p| p.chain_id == chain_id)
        .filter_map(|p| {
            if p.base_address.eq_ignore_ascii_case(token) {
                Some((p, true))
            } else if p.quote_address.eq_ignore_ascii_case(token) {
                Some((p, false))
            } else {
                None
            }
        })
        .collect();
    if mine.is_empty() {
        return 0.0;
    }

    let against_stable = |(p, is_base): &(&DexPair, bool)| {
        let other = if *is_base { &p.quote_symbol } else { &p.base_symbol };
        stables.iter().any(|s| s.eq_ignore_ascii_case(other))
    };
    let stable: Vec<(&DexPair, bool)> = mine.iter().copied().filter(against_stable).collect();
    let source = if stable.is_empty() { mine } else { stable };

    let mut priced: Vec<(f64, f64)> = source
        .into_iter()
        .map(|(p, is_base)| {
            let usd = if is_base {
                p.price_usd
            } else if p.price_usd > 0.0 && p.price_native > 0.0 {
                p.price_usd / p.price_native
            } else {
                0.0
            };
            (usd, p.liquidity_usd)
        })
        .filter(|(usd, liq)| usd.is_finite() && *usd > 0.0 && liq.is_finite() && *liq > 0.0)
        .collect();

    if max_pairs > 0 {
        priced.sort_by(|a, b| b.1.total_cmp(&a.1));
        priced.truncate(max_pairs);
    }

    let den: f64 = priced.iter().map(|(_, l)| l).sum();
    if den <= 0.0 {
        return 0.0;
    }
    let num: f64 = priced.iter().map(|(u, l)| u * l).sum();
    let price = num / den;
    if price.is_finite() {
        price
    } else {
        0.0
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  WRAPPED-NATIVE SOURCE
// ═══════════════════════════════════════════════════════════════════════

enum PairLookup {
    Tokens,
    Search(String),
}

/// Prices a native coin through its wrapped token's DEX pairs.
pub struct WrappedNativeSource {
    name: String,
    pairs: Arc<dyn PairSource>,
    chain: Chain,
    wrapped: String,
    stables: Vec<String>,
    max_pairs: usize,
    lookup: PairLookup,
}

impl WrappedNativeSource {
    /// Pairs fetched by the wrapped token's address.
    pub fn by_address(pairs: Arc<dyn PairSource>, chain: Chain, wrapped: &str, stables: Vec<String>, max_pairs: usize) -> Self {
        Self {
            name: format!("dex-tokens:{chain}"),
            pairs,
            chain,
            wrapped: wrapped.to_lowercase(),
            stables,
            max_pairs,
            lookup: PairLookup::Tokens,
        }
    }

    /// Pairs found by free-text search (e.g. `"WPLS chain:pulsechain"`).
    pub fn by_search(
        pairs: Arc<dyn PairSource>,
        chain: Chain,
        wrapped: &str,
        query: &str,
        stables: Vec<String>,
        max_pairs: usize,
    ) -> Self {
        Self {
            name: format!("dex-search:{chain}"),
            lookup: PairLookup::Search(query.to_string()),
            ..Self::by_address(pairs, chain, wrapped, stables, max_pairs)
        }
    }
}

#[async_trait]
impl SpotPriceSource for WrappedNativeSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> PriceSource {
        PriceSource::Proxy
    }

    async fn price_usd(&self) -> KinkoResult<f64> {
        let pairs = match &self.lookup {
            PairLookup::Tokens => self.pairs.pairs_for_tokens(std::slice::from_ref(&self.wrapped)).await?,
            PairLookup::Search(q) => self.pairs.search_pairs(q).await?,
        };
        Ok(weighted_price(&self.wrapped, self.chain, &pairs, &self.stables, self.max_pairs))
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  RESOLVER
// ═══════════════════════════════════════════════════════════════════════

/// A native price and where it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeQuote {
    pub price_usd: f64,
    pub source: PriceSource,
}

impl NativeQuote {
    pub fn unknown() -> Self {
        Self { price_usd: 0.0, source: PriceSource::None }
    }
}

struct ChainPricing {
    entry: ChainEntry,
    native_sources: Vec<Arc<dyn SpotPriceSource>>,
}

pub struct PriceResolver {
    pairs: Arc<dyn PairSource>,
    dex: DexConfig,
    chains: HashMap<Chain, ChainPricing>,
}

impl PriceResolver {
    pub fn new(pairs: Arc<dyn PairSource>, dex: DexConfig) -> Self {
        Self { pairs, dex, chains: HashMap::new() }
    }

    /// Register a chain's stablecoins, native bounds and ordered native sources.
    pub fn add_chain(&mut self, chain: Chain, entry: ChainEntry, native_sources: Vec<Arc<dyn SpotPriceSource>>) {
        info!(%chain, sources = native_sources.len(), "registered price chain");
        self.chains.insert(chain, ChainPricing { entry, native_sources });
    }

    fn pricing(&self, chain: Chain) -> KinkoResult<&ChainPricing> {
        self.chains
            .get(&chain)
            .ok_or_else(|| KinkoError::InvalidChain(chain.to_string()))
    }

    /// First native price inside the chain's sanity bounds, or unknown.
    pub async fn native_price_usd(&self, chain: Chain) -> KinkoResult<NativeQuote> {
        let pricing = self.pricing(chain)?;
        let attempts = pricing
            .native_sources
            .iter()
            .map(|src| {
                let src = src.clone();
                let name = src.name().to_string();
                Attempt::new(name, async move { Ok::<_, KinkoError>((src.price_usd().await?, src.source())) }.boxed())
            })
            .collect();

        let accepted = first_valid(attempts, |(price, _): &(f64, PriceSource)| {
            pricing.entry.accepts_native_price(*price)
        })
        .await;

        Ok(match accepted {
            Some((provider, (price_usd, source))) => {
                debug!(%chain, %provider, price_usd, "native price resolved");
                NativeQuote { price_usd, source }
            }
            None => {
                info!(%chain, "no native price source passed validation");
                NativeQuote::unknown()
            }
        })
    }

    /// Token USD price. A positive `hint` (indexer exchange rate) wins;
    /// otherwise DEX pairs by address, then a DEX search.
    pub async fn token_price_usd(&self, contract: &str, chain: Chain, hint: Option<f64>) -> KinkoResult<f64> {
        let pricing = self.pricing(chain)?;
        if let Some(h) = hint.filter(|h| h.is_finite() && *h > 0.0) {
            return Ok(h);
        }

        let addr = contract.to_lowercase();
        let stables = &pricing.entry.stablecoins;
        match self.pairs.pairs_for_tokens(std::slice::from_ref(&addr)).await {
            Ok(pairs) => {
                let p = weighted_price(&addr, chain, &pairs, stables, self.dex.max_pairs);
                if p > 0.0 {
                    return Ok(p);
                }
            }
            Err(e) => debug!(%chain, token = %addr, error = %e, "dex token lookup failed"),
        }
        Ok(self.search_price(&addr, chain, stables).await)
    }

    /// Prices for many tokens: chunked pair lookups, then at most
    /// `single_lookup_cap` individual searches for what is still unpriced.
    /// Keys are lowercased addresses; unpriced tokens are absent.
    pub async fn batch_token_prices(&self, chain: Chain, addresses: &[String]) -> KinkoResult<HashMap<String, f64>> {
        let pricing = self.pricing(chain)?;
        let stables = &pricing.entry.stablecoins;

        let mut seen = HashSet::new();
        let unique: Vec<String> = addresses
            .iter()
            .map(|a| a.trim().to_lowercase())
            .filter(|a| !a.is_empty() && a != kinko_common::types::NATIVE)
            .filter(|a| seen.insert(a.clone()))
            .collect();

        let mut out = HashMap::new();
        for chunk in unique.chunks(self.dex.batch_size.max(1)) {
            match self.pairs.pairs_for_tokens(chunk).await {
                Ok(pairs) => {
                    for addr in chunk {
                        let p = weighted_price(addr, chain, &pairs, stables, self.dex.max_pairs);
                        if p > 0.0 {
                            out.insert(addr.clone(), p);
                        }
                    }
                }
                Err(e) => debug!(%chain, size = chunk.len(), error = %e, "dex batch lookup failed"),
            }
        }

        let unresolved: Vec<&String> = unique.iter().filter(|a| !out.contains_key(*a)).collect();
        for addr in unresolved.into_iter().take(self.dex.single_lookup_cap) {
            let p = self.search_price(addr, chain, stables).await;
            if p > 0.0 {
                out.insert(addr.clone(), p);
            }
        }

        debug!(%chain, requested = unique.len(), priced = out.len(), "dex batch pricing done");
        Ok(out)
    }

    async fn search_price(&self, addr: &str, chain: Chain, stables: &[String]) -> f64 {
        let query = format!("{addr} chain:{}", chain.dex_chain_id());
        match self.pairs.search_pairs(&query).await {
            Ok(pairs) => weighted_price(addr, chain, &pairs, stables, self.dex.max_pairs),
            Err(e) => {
                debug!(%chain, token = %addr, error = %e, "dex search failed");
                0.0
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    use kinko_types::config::AppConfig;

    pub(crate) fn pair(chain: &str, base: (&str, &str), quote: (&str, &str), usd: f64, native: f64, liq: f64) -> DexPair {
        DexPair {
            chain_id: chain.into(),
            base_address: base.0.into(),
            base_symbol: base.1.into(),
            quote_address: quote.0.into(),
            quote_symbol: quote.1.into(),
            price_usd: usd,
            price_native: native,
            liquidity_usd: liq,
        }
    }

    /// Pair source backed by a fixed pair list; records every call.
    #[derive(Default)]
    pub(crate) struct FakePairs {
        pub pairs: Vec<DexPair>,
        pub search_results: Vec<DexPair>,
        pub fail: bool,
        pub token_calls: Mutex<Vec<Vec<String>>>,
        pub search_calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PairSource for FakePairs {
        async fn pairs_for_tokens(&self, addresses: &[String]) -> KinkoResult<Vec<DexPair>> {
            self.token_calls.lock().unwrap().push(addresses.to_vec());
            if self.fail {
                return Err(KinkoError::Timeout("dex".into()));
            }
            Ok(self
                .pairs
                .iter()
                .filter(|p| {
                    addresses.iter().any(|a| {
                        p.base_address.eq_ignore_ascii_case(a) || p.quote_address.eq_ignore_ascii_case(a)
                    })
                })
                .cloned()
                .collect())
        }

        async fn search_pairs(&self, query: &str) -> KinkoResult<Vec<DexPair>> {
            self.search_calls.lock().unwrap().push(query.to_string());
            if self.fail {
                return Err(KinkoError::Timeout("dex".into()));
            }
            Ok(self.search_results.clone())
        }
    }

    pub(crate) struct FixedSpot {
        pub name: &'static str,
        pub result: Option<f64>,
    }

    #[async_trait]
    impl SpotPriceSource for FixedSpot {
        fn name(&self) -> &str {
            self.name
        }
        async fn price_usd(&self) -> KinkoResult<f64> {
            self.result.ok_or_else(|| KinkoError::Network(format!("{} unreachable", self.name)))
        }
    }

    fn stables() -> Vec<String> {
        vec!["USDC".into(), "DAI".into()]
    }

    fn resolver(fake: Arc<FakePairs>) -> PriceResolver {
        let config = AppConfig::default();
        let mut r = PriceResolver::new(fake, config.dex.clone());
        r.add_chain(Chain::Pulse, config.chains.pulse.clone(), vec![]);
        r.add_chain(Chain::Eth, config.chains.eth.clone(), vec![]);
        r
    }

    #[test]
    fn test_weighted_price_by_liquidity() {
        let pairs = vec![
            pair("pulsechain", ("0xtok", "TOK"), ("0xw", "WPLS"), 2.0, 0.0, 100.0),
            pair("pulsechain", ("0xtok", "TOK"), ("0xh", "HEX"), 4.0, 0.0, 300.0),
        ];
        assert_eq!(weighted_price("0xTOK", Chain::Pulse, &pairs, &stables(), 8), 3.5);
    }

    #[test]
    fn test_weighted_price_prefers_stable_pairs() {
        let pairs = vec![
            pair("pulsechain", ("0xtok", "TOK"), ("0xw", "WPLS"), 9.0, 0.0, 1_000_000.0),
            pair("pulsechain", ("0xtok", "TOK"), ("0xu", "usdc"), 1.0, 0.0, 10.0),
        ];
        assert_eq!(weighted_price("0xtok", Chain::Pulse, &pairs, &stables(), 8), 1.0);
    }

    #[test]
    fn test_weighted_price_inverts_quote_side() {
        // TOK is the quote: base WPLS at $0.00005, 1 WPLS = 0.00001 TOK
        let pairs = vec![pair("pulsechain", ("0xw", "WPLS"), ("0xtok", "TOK"), 0.00005, 0.00001, 500.0)];
        let p = weighted_price("0xtok", Chain::Pulse, &pairs, &stables(), 8);
        assert!((p - 5.0).abs() < 1e-9, "{p}");
    }

    #[test]
    fn test_weighted_price_ignores_unusable_pairs() {
        let pairs = vec![
            pair("ethereum", ("0xtok", "TOK"), ("0xu", "USDC"), 50.0, 0.0, 100.0),
            pair("pulsechain", ("0xtok", "TOK"), ("0xu", "USDC"), 0.0, 0.0, 100.0),
            pair("pulsechain", ("0xtok", "TOK"), ("0xu", "USDC"), 3.0, 0.0, 0.0),
            pair("pulsechain", ("0xw", "WPLS"), ("0xtok", "TOK"), 1.0, 0.0, 100.0),
        ];
        assert_eq!(weighted_price("0xtok", Chain::Pulse, &pairs, &stables(), 8), 0.0);
        assert_eq!(weighted_price("0xtok", Chain::Pulse, &[], &stables(), 8), 0.0);
    }

    #[test]
    fn test_weighted_price_top_n() {
        let pairs = vec![
            pair("pulsechain", ("0xtok", "TOK"), ("0xa", "A"), 10.0, 0.0, 1.0),
            pair("pulsechain", ("0xtok", "TOK"), ("0xb", "B"), 2.0, 0.0, 100.0),
            pair("pulsechain", ("0xtok", "TOK"), ("0xc", "C"), 4.0, 0.0, 300.0),
        ];
        assert_eq!(weighted_price("0xtok", Chain::Pulse, &pairs, &stables(), 2), 3.5);
        let all = weighted_price("0xtok", Chain::Pulse, &pairs, &stables(), 0);
        assert!((all - 1410.0 / 401.0).abs() < 1e-9, "{all}");
    }

    #[tokio::test]
    async fn test_token_price_uses_hint_first() {
        let fake = Arc::new(FakePairs::default());
        let r = resolver(fake.clone());
        assert_eq!(r.token_price_usd("0xtok", Chain::Pulse, Some(0.25)).await.unwrap(), 0.25);
        assert!(fake.token_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_token_price_falls_back_to_search() {
        let fake = Arc::new(FakePairs {
            search_results: vec![pair("pulsechain", ("0xtok", "TOK"), ("0xu", "USDC"), 0.5, 0.0, 10.0)],
            ..Default::default()
        });
        let r = resolver(fake.clone());
        assert_eq!(r.token_price_usd("0xTOK", Chain::Pulse, Some(0.0)).await.unwrap(), 0.5);
        assert_eq!(fake.search_calls.lock().unwrap()[0], "0xtok chain:pulsechain");
    }

    #[tokio::test]
    async fn test_token_price_unknown_when_dex_down() {
        let r = resolver(Arc::new(FakePairs { fail: true, ..Default::default() }));
        assert_eq!(r.token_price_usd("0xtok", Chain::Eth, None).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_unregistered_chain_is_an_error() {
        let r = resolver(Arc::new(FakePairs::default()));
        assert!(matches!(
            r.token_price_usd("0xtok", Chain::Base, None).await,
            Err(KinkoError::InvalidChain(_))
        ));
        assert!(r.native_price_usd(Chain::Base).await.is_err());
    }

    #[tokio::test]
    async fn test_batch_chunks_and_caps_single_lookups() {
        let mut pairs = Vec::new();
        let mut addrs = Vec::new();
        for i in 0..60 {
            let addr = format!("0x{i:040x}");
            if i < 10 {
                pairs.push(pair("pulsechain", (addr.as_str(), "T"), ("0xu", "USDC"), 1.0 + i as f64, 0.0, 50.0));
            }
            addrs.push(addr);
        }
        // Duplicates and the native sentinel are ignored
        addrs.push(addrs[0].to_uppercase().replace("0X", "0x"));
        addrs.push("native".into());

        let fake = Arc::new(FakePairs { pairs, ..Default::default() });
        let r = resolver(fake.clone());
        let prices = r.batch_token_prices(Chain::Pulse, &addrs).await.unwrap();

        assert_eq!(prices.len(), 10);
        assert_eq!(prices[&format!("0x{:040x}", 3)], 4.0);

        let token_calls = fake.token_calls.lock().unwrap();
        assert_eq!(token_calls.iter().map(Vec::len).collect::<Vec<_>>(), vec![25, 25, 10]);
        assert_eq!(fake.search_calls.lock().unwrap().len(), 12);
    }

    #[tokio::test]
    async fn test_native_price_fallback_and_bounds() {
        let config = AppConfig::default();
        let mut r = PriceResolver::new(Arc::new(FakePairs::default()), config.dex.clone());
        r.add_chain(
            Chain::Pulse,
            config.chains.pulse.clone(),
            vec![
                Arc::new(FixedSpot { name: "down", result: None }),
                Arc::new(FixedSpot { name: "eth-priced", result: Some(3200.0) }),
                Arc::new(FixedSpot { name: "ok", result: Some(0.00004) }),
            ],
        );
        r.add_chain(
            Chain::Eth,
            config.chains.eth.clone(),
            vec![Arc::new(FixedSpot { name: "pls-priced", result: Some(0.00004) })],
        );

        let q = r.native_price_usd(Chain::Pulse).await.unwrap();
        assert_eq!(q, NativeQuote { price_usd: 0.00004, source: PriceSource::Spot });

        let q = r.native_price_usd(Chain::Eth).await.unwrap();
        assert_eq!(q, NativeQuote::unknown());
    }

    #[tokio::test]
    async fn test_wrapped_native_source() {
        let wpls = kinko_common::constants::WPLS_ADDRESS;
        let fake = Arc::new(FakePairs {
            pairs: vec![pair("pulsechain", (wpls, "WPLS"), ("0xdai", "DAI"), 0.00003, 0.00003, 1_000.0)],
            search_results: vec![pair("pulsechain", (wpls, "WPLS"), ("0xdai", "DAI"), 0.00002, 0.00002, 1_000.0)],
            ..Default::default()
        });

        let by_addr = WrappedNativeSource::by_address(fake.clone(), Chain::Pulse, wpls, stables(), 8);
        assert_eq!(by_addr.source(), PriceSource::Proxy);
        assert_eq!(by_addr.price_usd().await.unwrap(), 0.00003);
        assert_eq!(fake.token_calls.lock().unwrap()[0], vec![wpls.to_lowercase()]);

        let by_search =
            WrappedNativeSource::by_search(fake.clone(), Chain::Pulse, wpls, "WPLS chain:pulsechain", stables(), 8);
        assert_eq!(by_search.price_usd().await.unwrap(), 0.00002);
        assert_eq!(by_search.name(), "dex-search:pulse");
    }
}
