//! Provider traits. Every module implements these.
//!
//! This is the contract between core and provider modules. Core composes
//! indexers, pair sources and spot sources into fetchers and resolvers; it
//! never names a concrete provider.

use async_trait::async_trait;

use crate::error::KinkoResult;
use crate::types::*;

/// Balance indexer for one chain (Blockscout, Ethplorer, ...).
#[async_trait]
pub trait BalanceIndexer: Send + Sync {
    /// Chain this indexer serves.
    fn chain(&self) -> Chain;

    /// Short provider label for logs.
    fn name(&self) -> &str;

    /// Native coin balance in human units.
    async fn native_balance(&self, address: &str) -> KinkoResult<f64>;

    /// Token balances with non-zero raw balance, in human units.
    ///
    /// Rows carry the indexer's exchange rate as their price when one was
    /// supplied (`PriceSource::Indexer`), else they are unpriced.
    async fn token_balances(&self, address: &str) -> KinkoResult<Vec<TokenBalanceRow>>;

    /// Native balance and token list for one wallet. Indexers that answer
    /// both from a single response override this to make one request.
    async fn balances(&self, address: &str) -> (KinkoResult<f64>, KinkoResult<Vec<TokenBalanceRow>>) {
        futures::join!(self.native_balance(address), self.token_balances(address))
    }

    /// Per-token metadata lookup. Indexers without one return the default.
    async fn token_meta(&self, _contract: &str) -> KinkoResult<TokenMeta> {
        Ok(TokenMeta::default())
    }
}

/// DEX aggregator: source of trading pairs for liquidity-weighted prices.
#[async_trait]
pub trait PairSource: Send + Sync {
    /// Pairs involving any of the given token addresses (one request).
    async fn pairs_for_tokens(&self, addresses: &[String]) -> KinkoResult<Vec<DexPair>>;

    /// Free-text pair search (e.g. `"<address> chain:pulsechain"`).
    async fn search_pairs(&self, query: &str) -> KinkoResult<Vec<DexPair>>;
}

/// Spot-price source for a native coin.
#[async_trait]
pub trait SpotPriceSource: Send + Sync {
    /// Provider label for logs.
    fn name(&self) -> &str;

    /// Tag recorded on rows priced by this source.
    fn source(&self) -> PriceSource {
        PriceSource::Spot
    }

    /// Current USD price. May be implausible; callers validate.
    async fn price_usd(&self) -> KinkoResult<f64>;
}
