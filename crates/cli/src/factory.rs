//! Runtime factory: builds stores, price resolver, chain fetchers and the
//! aggregator from config.
//!
//! Lives in `cli` because `core` must not depend on provider modules.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use kinko_common::constants::{ETHPLORER_FREE_KEY, WPLS_ADDRESS};
use kinko_common::traits::{BalanceIndexer, PairSource, SpotPriceSource};
use kinko_common::types::Chain;
use kinko_core::aggregator::Aggregator;
use kinko_core::cache::ResponseCache;
use kinko_core::fetcher::{ChainFetcher, TokenFetcher};
use kinko_core::filter::JunkFilter;
use kinko_core::identity::SyncIdentity;
use kinko_core::price::{PriceResolver, WrappedNativeSource};
use kinko_core::registry::WalletRegistry;
use kinko_core::store::{KvStore, SqliteStore};
use kinko_core::sync::{HttpSyncBackend, LocalSyncBackend, SyncBackend, SyncClient};
use kinko_types::config::{AppConfig, ChainEntry};

use kinko_mod_blockscout::{BlockscoutCoinPrice, BlockscoutGraphql, BlockscoutRest, BlockscoutStatsPrice};
use kinko_mod_dexscreener::DexScreenerClient;
use kinko_mod_ethplorer::EthplorerClient;
use kinko_mod_spot::{CoinGeckoSimple, CoinbaseSpot};

/// Everything a command needs, wired once per invocation.
pub struct Runtime {
    pub cache: Arc<ResponseCache>,
    pub registry: Arc<WalletRegistry>,
    pub prices: Arc<PriceResolver>,
    pub fetchers: BTreeMap<Chain, Arc<ChainFetcher>>,
    pub aggregator: Arc<Aggregator>,
    pub sync: SyncClient,
}

impl Runtime {
    /// Process-wide config, storage in `~/.kinko/data/kinko.db`.
    pub fn load() -> Result<Self> {
        let store: Arc<dyn KvStore> = Arc::new(SqliteStore::open_default()?);
        Self::from_global(store)
    }

    /// Runtime over the config installed by `set_global_config`.
    pub fn from_global(store: Arc<dyn KvStore>) -> Result<Self> {
        Self::from_config(kinko_core::workspace::global_config().clone(), store)
    }

    pub fn from_config(config: AppConfig, store: Arc<dyn KvStore>) -> Result<Self> {
        let timeout = config.system.request_timeout_secs;
        let cache = Arc::new(ResponseCache::new(store.clone()));
        let registry = Arc::new(WalletRegistry::new(store.clone()));

        let pairs: Arc<dyn PairSource> = Arc::new(DexScreenerClient::new(&config.dex.base_url, timeout)?);

        let mut resolver = PriceResolver::new(pairs.clone(), config.dex.clone());
        for chain in Chain::ALL {
            let entry = config.chains.get(chain);
            let sources = native_sources(chain, entry, &config, pairs.clone())?;
            resolver.add_chain(chain, entry.clone(), sources);
        }
        let prices = Arc::new(resolver);

        let mut aggregator = Aggregator::new(JunkFilter::from_policy(&config.policy));
        let mut fetchers = BTreeMap::new();
        for chain in config.chains.enabled() {
            let (primary, fallback) = indexers(chain, config.chains.get(chain), timeout)
                .with_context(|| format!("building {chain} indexers"))?;
            let fetcher = Arc::new(
                ChainFetcher::new(chain, primary, prices.clone(), cache.clone())
                    .with_fallback(fallback)
                    .with_ttl_ms(config.system.cache_ttl_ms())
                    .with_dust_threshold(config.system.dust_threshold_usd),
            );
            aggregator.add_fetcher(fetcher.clone() as Arc<dyn TokenFetcher>);
            fetchers.insert(chain, fetcher);
            info!(%chain, "chain fetcher loaded");
        }

        let backend: Arc<dyn SyncBackend> = match config.sync.api_base.as_deref().filter(|b| !b.trim().is_empty()) {
            Some(base) => Arc::new(HttpSyncBackend::new(base, timeout)?),
            None => Arc::new(LocalSyncBackend::new(store.clone())),
        };
        let sync = SyncClient::new(backend, registry.clone(), Arc::new(SyncIdentity::new(store)));

        Ok(Self { cache, registry, prices, fetchers, aggregator: Arc::new(aggregator), sync })
    }

    pub fn fetcher(&self, chain: Chain) -> Result<&Arc<ChainFetcher>> {
        self.fetchers
            .get(&chain)
            .with_context(|| format!("chain {chain} is disabled. Run: kinko configure chain {chain} --enable"))
    }
}

/// Primary and fallback balance indexers for a chain.
fn indexers(chain: Chain, entry: &ChainEntry, timeout: u64) -> Result<(Arc<dyn BalanceIndexer>, Arc<dyn BalanceIndexer>)> {
    let primary: Arc<dyn BalanceIndexer> = match chain {
        Chain::Eth => {
            let key = entry.indexer_api_key.as_deref().unwrap_or(ETHPLORER_FREE_KEY);
            Arc::new(EthplorerClient::new(&entry.indexer_base_url, key, timeout)?)
        }
        Chain::Pulse | Chain::Base => Arc::new(BlockscoutRest::new(chain, &entry.indexer_base_url, timeout)?),
    };
    let fallback: Arc<dyn BalanceIndexer> = match chain {
        Chain::Eth => Arc::new(BlockscoutRest::new(chain, &entry.indexer_fallback_url, timeout)?),
        Chain::Pulse | Chain::Base => Arc::new(BlockscoutGraphql::new(chain, &entry.indexer_fallback_url, timeout)?),
    };
    Ok((primary, fallback))
}

/// Ordered native price sources. The resolver validates each against the
/// chain's bounds and takes the first that passes.
fn native_sources(
    chain: Chain,
    entry: &ChainEntry,
    config: &AppConfig,
    pairs: Arc<dyn PairSource>,
) -> Result<Vec<Arc<dyn SpotPriceSource>>> {
    let timeout = config.system.request_timeout_secs;
    let mut sources: Vec<Arc<dyn SpotPriceSource>> = Vec::new();
    match chain {
        Chain::Eth | Chain::Base => {
            sources.push(Arc::new(CoinbaseSpot::new(&config.spot.coinbase_base_url, "ETH-USD", timeout)?));
            sources.push(Arc::new(CoinGeckoSimple::new(&config.spot.coingecko_base_url, "ethereum", timeout)?));
        }
        Chain::Pulse => {
            let stables = entry.stablecoins.clone();
            let max_pairs = config.dex.max_pairs;
            let query = format!("WPLS chain:{}", chain.dex_chain_id());
            sources.push(Arc::new(WrappedNativeSource::by_address(
                pairs.clone(),
                chain,
                WPLS_ADDRESS,
                stables.clone(),
                max_pairs,
            )));
            sources.push(Arc::new(WrappedNativeSource::by_search(pairs, chain, WPLS_ADDRESS, &query, stables, max_pairs)));
            sources.push(Arc::new(
                BlockscoutStatsPrice::new(&entry.indexer_base_url, timeout)?
                    .with_bounds(entry.native_price_min, entry.native_price_max),
            ));
            sources.push(Arc::new(
                BlockscoutCoinPrice::new(&entry.indexer_base_url, timeout)?
                    .with_bounds(entry.native_price_min, entry.native_price_max),
            ));
        }
    }
    Ok(sources)
}
