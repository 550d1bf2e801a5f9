//! Structured output types for JSON/table rendering.
//!
//! Every data-producing command returns one of these types.
//! They all derive `Serialize` for JSON output, and implement
//! `TableDisplay` for human-readable table rendering.

use serde::Serialize;

// ─── Portfolio ──────────────────────────────────────────────────────

/// Aggregated portfolio across the registered wallets.
///
/// ```json
/// {
///   "scope": "auto",
///   "wallets": ["0xaaa...", "0xbbb..."],
///   "total_usd": 200.0,
///   "tokens": [
///     {
///       "chain": "eth", "symbol": "USDC", "amount": 200.0, "value_usd": 200.0,
///       "breakdown": [{ "wallet": "0xaaa...", "amount": 150.0, "value_usd": 150.0 }]
///     }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioOutput {
    pub scope: String,
    pub wallets: Vec<String>,
    pub total_usd: f64,
    pub tokens: Vec<PortfolioTokenRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioTokenRow {
    pub chain: String,
    pub symbol: String,
    pub name: String,
    pub contract: String,
    pub amount: f64,
    pub price_usd: Option<f64>,
    pub value_usd: f64,
    pub breakdown: Vec<ShareRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShareRow {
    pub wallet: String,
    pub amount: f64,
    pub value_usd: f64,
}

// ─── Single wallet tokens ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct TokensOutput {
    pub chain: String,
    pub address: String,
    /// Served from the response cache.
    pub cached: bool,
    /// Cache entry age when `cached`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_secs: Option<u64>,
    pub total_usd: f64,
    pub tokens: Vec<TokenRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenRow {
    pub symbol: String,
    pub name: String,
    pub contract: String,
    pub decimals: u32,
    pub amount: f64,
    pub price_usd: Option<f64>,
    pub value_usd: f64,
    pub source: String,
}

// ─── Prices ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct PriceOutput {
    pub chain: String,
    /// `native` or the token contract.
    pub asset: String,
    /// `None` when no source produced a usable price.
    pub price_usd: Option<f64>,
    pub source: String,
}

// ─── Wallets ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct WalletListOutput {
    pub wallets: Vec<WalletRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletRow {
    pub address: String,
    pub name: Option<String>,
    pub chain: Option<String>,
}

// ─── Cache ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CacheListOutput {
    pub entries: Vec<CacheEntryRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheEntryRow {
    pub key: String,
    pub stored_at_ms: u64,
    pub age_secs: u64,
    pub bytes: usize,
}

// ─── Sync ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SyncOutput {
    pub action: String,
    pub slug: String,
    pub version: u64,
    /// `remote` or `local`.
    pub backend: String,
    /// Wallet count after the operation.
    pub wallets: usize,
}
