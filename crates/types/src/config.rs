use serde::{Deserialize, Serialize};

use kinko_common::constants::*;
use kinko_common::types::Chain;

// ═══════════════════════════════════════════════════════════════════════
//  APP CONFIG: top-level, stored at ~/.kinko/config.toml
// ═══════════════════════════════════════════════════════════════════════

/// Top-level configuration stored in `$HOME/.kinko/config.toml`.
///
/// ```toml
/// [system]
/// cache_ttl_minutes = 10
/// dust_threshold_usd = 0.01
///
/// [chains.pulse]
/// enabled = true
/// indexer_base_url = "https://api.scan.pulsechain.com/api/v2"
/// indexer_fallback_url = "https://api.scan.pulsechain.com/graphql"
/// native_price_min = 0.0
/// native_price_max = 1.0
///
/// [dex]
/// base_url = "https://api.dexscreener.com/latest/dex"
/// batch_size = 25
/// single_lookup_cap = 12
/// max_pairs = 8
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub system: SystemConfig,
    #[serde(default)]
    pub chains: ChainsConfig,
    #[serde(default)]
    pub dex: DexConfig,
    #[serde(default)]
    pub spot: SpotConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

// ═══════════════════════════════════════════════════════════════════════
//  SYSTEM CONFIG
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Enable verbose tracing output.
    #[serde(default)]
    pub verbose: bool,

    /// Per-wallet token list cache lifetime. 0 disables expiry.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_minutes: u64,

    /// Rows (other than the native coin) worth this much or less are hidden.
    #[serde(default = "default_dust")]
    pub dust_threshold_usd: f64,

    /// Timeout applied to every outbound request.
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl SystemConfig {
    pub fn cache_ttl_ms(&self) -> u64 {
        self.cache_ttl_minutes.saturating_mul(60_000)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  CHAINS CONFIG: one entry per supported chain
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainsConfig {
    #[serde(default = "default_eth")]
    pub eth: ChainEntry,
    #[serde(default = "default_pulse")]
    pub pulse: ChainEntry,
    #[serde(default = "default_base")]
    pub base: ChainEntry,
}

impl ChainsConfig {
    pub fn get(&self, chain: Chain) -> &ChainEntry {
        match chain {
            Chain::Eth => &self.eth,
            Chain::Pulse => &self.pulse,
            Chain::Base => &self.base,
        }
    }

    pub fn get_mut(&mut self, chain: Chain) -> &mut ChainEntry {
        match chain {
            Chain::Eth => &mut self.eth,
            Chain::Pulse => &mut self.pulse,
            Chain::Base => &mut self.base,
        }
    }

    /// Enabled chains in canonical order.
    pub fn enabled(&self) -> Vec<Chain> {
        Chain::ALL.into_iter().filter(|c| self.get(*c).enabled).collect()
    }
}

/// Per-chain indexer endpoints and pricing policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainEntry {
    pub enabled: bool,

    /// Primary balance indexer.
    pub indexer_base_url: String,

    /// Secondary indexer exposing equivalent data.
    pub indexer_fallback_url: String,

    /// API key for indexers that require one.
    #[serde(default)]
    pub indexer_api_key: Option<String>,

    /// Quote symbols treated as USD stablecoins when weighting DEX pairs.
    #[serde(default)]
    pub stablecoins: Vec<String>,

    /// Native price sanity bounds (exclusive). Market-dependent; tune freely.
    pub native_price_min: f64,
    pub native_price_max: f64,
}

impl ChainEntry {
    /// Whether a native price falls inside the sanity bounds.
    pub fn accepts_native_price(&self, price: f64) -> bool {
        price.is_finite() && price > self.native_price_min && price < self.native_price_max
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  DEX / SPOT / POLICY / SYNC
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DexConfig {
    #[serde(default = "default_dex_url")]
    pub base_url: String,
    /// Token addresses per `/tokens/{..}` request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Individual search calls allowed per pricing pass.
    #[serde(default = "default_single_cap")]
    pub single_lookup_cap: usize,
    /// Pairs (highest liquidity first) used in the weighted average; 0 uses all.
    #[serde(default = "default_max_pairs")]
    pub max_pairs: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotConfig {
    #[serde(default = "default_coinbase_url")]
    pub coinbase_base_url: String,
    #[serde(default = "default_coingecko_url")]
    pub coingecko_base_url: String,
}

/// Display policy: heuristics, not business rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_true")]
    pub hide_junk: bool,
    /// Symbols hidden from the aggregated view (compared uppercased).
    #[serde(default = "default_denylist")]
    pub denylist: Vec<String>,
    /// Unit prices above this are treated as junk.
    #[serde(default = "default_max_price")]
    pub max_plausible_price: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Portfolio-ID sync service. Unset → local-only sync store.
    #[serde(default)]
    pub api_base: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════
//  DEFAULTS
// ═══════════════════════════════════════════════════════════════════════

fn default_cache_ttl() -> u64 {
    10
}
fn default_dust() -> f64 {
    0.01
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_dex_url() -> String {
    DEXSCREENER_API.into()
}
fn default_batch_size() -> usize {
    25
}
fn default_single_cap() -> usize {
    12
}
fn default_max_pairs() -> usize {
    8
}
fn default_coinbase_url() -> String {
    COINBASE_API.into()
}
fn default_coingecko_url() -> String {
    COINGECKO_API.into()
}
fn default_true() -> bool {
    true
}
fn default_denylist() -> Vec<String> {
    vec!["ETHG".into(), "AICC".into()]
}
fn default_max_price() -> f64 {
    100_000.0
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_eth() -> ChainEntry {
    ChainEntry {
        enabled: true,
        indexer_base_url: ETHPLORER_API.into(),
        indexer_fallback_url: ETH_BLOCKSCOUT_V2.into(),
        indexer_api_key: Some(ETHPLORER_FREE_KEY.into()),
        stablecoins: strings(&["USDC", "USDT", "DAI", "FDUSD", "TUSD", "USDD", "USDP"]),
        native_price_min: 500.0,
        native_price_max: 10_000.0,
    }
}

fn default_pulse() -> ChainEntry {
    ChainEntry {
        enabled: true,
        indexer_base_url: PULSE_BLOCKSCOUT_V2.into(),
        indexer_fallback_url: PULSE_BLOCKSCOUT_GRAPHQL.into(),
        indexer_api_key: None,
        stablecoins: strings(&["USDC", "USDT", "DAI", "USDL", "PDAI", "USDC.E"]),
        native_price_min: 0.0,
        native_price_max: 1.0,
    }
}

fn default_base() -> ChainEntry {
    ChainEntry {
        enabled: true,
        indexer_base_url: BASE_BLOCKSCOUT_V2.into(),
        indexer_fallback_url: BASE_BLOCKSCOUT_GRAPHQL.into(),
        indexer_api_key: None,
        stablecoins: strings(&["USDC", "USDBC", "DAI", "USDT"]),
        native_price_min: 500.0,
        native_price_max: 10_000.0,
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            cache_ttl_minutes: default_cache_ttl(),
            dust_threshold_usd: default_dust(),
            request_timeout_secs: default_timeout(),
        }
    }
}

impl Default for ChainsConfig {
    fn default() -> Self {
        Self { eth: default_eth(), pulse: default_pulse(), base: default_base() }
    }
}

impl Default for DexConfig {
    fn default() -> Self {
        Self {
            base_url: default_dex_url(),
            batch_size: default_batch_size(),
            single_lookup_cap: default_single_cap(),
            max_pairs: default_max_pairs(),
        }
    }
}

impl Default for SpotConfig {
    fn default() -> Self {
        Self { coinbase_base_url: default_coinbase_url(), coingecko_base_url: default_coingecko_url() }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            hide_junk: true,
            denylist: default_denylist(),
            max_plausible_price: default_max_price(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            system: SystemConfig::default(),
            chains: ChainsConfig::default(),
            dex: DexConfig::default(),
            spot: SpotConfig::default(),
            policy: PolicyConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  TESTS
// ═══════════════════════════════════════════════════════════════════════
