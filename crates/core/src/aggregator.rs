//! Cross-wallet portfolio aggregation.
//!
//! Every (wallet, chain) fetch runs concurrently; the merge waits for all of
//! them to settle. A failed fetch is logged and skipped. Rows sharing
//! `chain:contractOrNative:SYMBOL` merge into one [`AggregatedToken`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use kinko_common::error::{KinkoError, KinkoResult};
use kinko_common::types::{AggregatedToken, Chain, TokenBalanceRow, Wallet, WalletShare};

use crate::fetcher::TokenFetcher;
use crate::filter::JunkFilter;
use crate::guard::StaleGuard;

/// Which chains a portfolio covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// Every registered chain.
    #[default]
    Auto,
    Chain(Chain),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Auto => f.write_str("auto"),
            Scope::Chain(c) => write!(f, "{c}"),
        }
    }
}

impl FromStr for Scope {
    type Err = KinkoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(Scope::Auto);
        }
        s.parse().map(Scope::Chain)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortfolioOptions {
    pub scope: Scope,
    /// Bypass the response cache.
    pub force: bool,
}

/// Merged view across wallets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PortfolioView {
    pub total_usd: f64,
    /// Sorted by value, highest first.
    pub tokens: Vec<AggregatedToken>,
}

impl PortfolioView {
    /// Per-token wallet contributions keyed by merge key.
    pub fn breakdown(&self) -> HashMap<&str, &[WalletShare]> {
        self.tokens
            .iter()
            .map(|t| (t.key.as_str(), t.breakdown.as_slice()))
            .collect()
    }
}

/// Merge normalized rows. Output is sorted by `value_usd` descending, each
/// breakdown by amount descending; ties keep input order.
pub fn merge_rows(rows: impl IntoIterator<Item = TokenBalanceRow>) -> Vec<AggregatedToken> {
    let mut tokens: Vec<AggregatedToken> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let key = row.merge_key();
        let share = WalletShare {
            wallet_address: row.wallet_address.clone(),
            amount: row.amount,
            value_usd: row.value_usd,
        };

        match index.get(&key) {
            Some(&i) => {
                let t = &mut tokens[i];
                t.amount += row.amount;
                t.value_usd += row.value_usd;
                if t.unit_price_usd <= 0.0 && row.unit_price_usd > 0.0 {
                    t.unit_price_usd = row.unit_price_usd;
                }
                if t.icon_url.is_none() {
                    t.icon_url = row.icon_url;
                }
                t.breakdown.push(share);
            }
            None => {
                index.insert(key.clone(), tokens.len());
                tokens.push(AggregatedToken {
                    key,
                    chain: row.chain,
                    contract_address: row.contract_address,
                    symbol: row.symbol,
                    name: row.name,
                    decimals: row.decimals,
                    amount: row.amount,
                    unit_price_usd: row.unit_price_usd,
                    value_usd: row.value_usd,
                    icon_url: row.icon_url,
                    breakdown: vec![share],
                });
            }
        }
    }

    for t in &mut tokens {
        t.breakdown.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    }
    tokens.sort_by(|a, b| b.value_usd.total_cmp(&a.value_usd));
    tokens
}

pub struct Aggregator {
    fetchers: BTreeMap<Chain, Arc<dyn TokenFetcher>>,
    junk: JunkFilter,
}

impl Aggregator {
    pub fn new(junk: JunkFilter) -> Self {
        Self { fetchers: BTreeMap::new(), junk }
    }

    pub fn add_fetcher(&mut self, fetcher: Arc<dyn TokenFetcher>) {
        let chain = fetcher.chain();
        info!(%chain, "registered chain fetcher");
        self.fetchers.insert(chain, fetcher);
    }

    /// Registered chains in canonical order.
    pub fn chains(&self) -> Vec<Chain> {
        self.fetchers.keys().copied().collect()
    }

    pub fn fetcher(&self, chain: Chain) -> KinkoResult<&Arc<dyn TokenFetcher>> {
        self.fetchers
            .get(&chain)
            .ok_or_else(|| KinkoError::InvalidChain(chain.to_string()))
    }

    fn scoped(&self, scope: Scope) -> KinkoResult<Vec<(Chain, Arc<dyn TokenFetcher>)>> {
        match scope {
            Scope::Auto => Ok(self.fetchers.iter().map(|(c, f)| (*c, f.clone())).collect()),
            Scope::Chain(c) => Ok(vec![(c, self.fetcher(c)?.clone())]),
        }
    }

    /// Fetch, normalize and merge every wallet on every chain in scope.
    ///
    /// Only programmer errors (blank address, unregistered chain) are
    /// returned; fetch failures shrink the result instead.
    pub async fn build_portfolio(&self, wallets: &[Wallet], opts: &PortfolioOptions) -> KinkoResult<PortfolioView> {
        if let Some(w) = wallets.iter().find(|w| w.address.trim().is_empty()) {
            return Err(KinkoError::InvalidAddress(format!("blank address (name: {:?})", w.name)));
        }
        let chains = self.scoped(opts.scope)?;

        let jobs = wallets.iter().flat_map(|wallet| {
            chains.iter().map(move |(chain, fetcher)| {
                let address = wallet.address.trim();
                async move { (address, *chain, fetcher.fetch_tokens(address, opts.force).await) }
            })
        });
        let results = join_all(jobs).await;

        let mut rows = Vec::new();
        let mut failed = 0usize;
        for (address, chain, result) in results {
            match result {
                Ok(fetched) => {
                    rows.extend(fetched.into_iter().map(|mut row| {
                        row.wallet_address = address.to_string();
                        row.chain = chain;
                        row
                    }));
                }
                Err(e) => {
                    failed += 1;
                    warn!(address, %chain, error = %e, "wallet fetch failed, skipping");
                }
            }
        }

        let before = rows.len();
        rows.retain(|r| !self.junk.is_junk(r));
        if rows.len() < before {
            debug!(dropped = before - rows.len(), "junk rows hidden");
        }

        let tokens = merge_rows(rows);
        let total_usd = tokens.iter().map(|t| t.value_usd).sum();
        info!(
            scope = %opts.scope,
            wallets = wallets.len(),
            failed,
            tokens = tokens.len(),
            total_usd,
            "portfolio built"
        );
        Ok(PortfolioView { total_usd, tokens })
    }
}

/// Parameters a portfolio request was issued for.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioRequest {
    pub wallets: Vec<String>,
    pub options: PortfolioOptions,
}

/// Aggregator front that drops superseded results.
pub struct PortfolioSession {
    aggregator: Arc<Aggregator>,
    guard: StaleGuard<PortfolioRequest>,
}

impl PortfolioSession {
    pub fn new(aggregator: Arc<Aggregator>) -> Self {
        Self { aggregator, guard: StaleGuard::new() }
    }

    /// Build a portfolio. `Ok(None)` when a newer request started while this
    /// one was in flight.
    pub async fn request(&self, wallets: &[Wallet], opts: PortfolioOptions) -> KinkoResult<Option<PortfolioView>> {
        let params = PortfolioRequest {
            wallets: wallets.iter().map(|w| w.address.to_lowercase()).collect(),
            options: opts,
        };
        let ticket = self.guard.begin(params);
        let view = self.aggregator.build_portfolio(wallets, &opts).await?;
        let accepted = self.guard.accept(&ticket, view);
        if accepted.is_none() {
            debug!(generation = ticket.generation(), "discarding superseded portfolio");
        }
        Ok(accepted)
    }
}
