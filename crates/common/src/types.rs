//! Universal types shared across core and provider modules.
//!
//! Every provider converts its payloads into these types. The aggregator,
//! CLI and any other consumer only ever see these shapes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KinkoError;

/// Contract sentinel for a chain's gas token.
pub const NATIVE: &str = "native";

/// Supported chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Eth,
    Pulse,
    Base,
}

impl Chain {
    pub const ALL: [Chain; 3] = [Chain::Eth, Chain::Pulse, Chain::Base];

    /// Short identifier used in cache keys and aggregation keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Chain::Eth => "eth",
            Chain::Pulse => "pulse",
            Chain::Base => "base",
        }
    }

    /// Chain identifier used by the DEX aggregator's `chainId` field.
    pub fn dex_chain_id(self) -> &'static str {
        match self {
            Chain::Eth => "ethereum",
            Chain::Pulse => "pulsechain",
            Chain::Base => "base",
        }
    }

    pub fn native_symbol(self) -> &'static str {
        match self {
            Chain::Eth | Chain::Base => "ETH",
            Chain::Pulse => "PLS",
        }
    }

    pub fn native_name(self) -> &'static str {
        match self {
            Chain::Eth => "Ethereum (native)",
            Chain::Pulse => "PulseChain (native)",
            Chain::Base => "Base (native ETH)",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = KinkoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "eth" | "ethereum" => Ok(Chain::Eth),
            "pulse" | "pls" | "pulsechain" => Ok(Chain::Pulse),
            "base" => Ok(Chain::Base),
            other => Err(KinkoError::InvalidChain(other.to_string())),
        }
    }
}

/// Where a row's unit price came from. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    /// Exchange rate supplied by the balance indexer.
    Indexer,
    /// Liquidity-weighted DEX pair price.
    Dex,
    /// Native coin priced through its wrapped token on a DEX.
    Proxy,
    /// Centralized spot-price API.
    Spot,
    /// Price unknown.
    #[default]
    None,
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PriceSource::Indexer => "indexer",
            PriceSource::Dex => "dex",
            PriceSource::Proxy => "proxy",
            PriceSource::Spot => "spot",
            PriceSource::None => "none",
        };
        f.write_str(s)
    }
}

/// One holding of one token, for one wallet, on one chain.
///
/// `value_usd` is always `amount * unit_price_usd`; mutate price or amount
/// through [`TokenBalanceRow::with_price`] / [`TokenBalanceRow::set_amount`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalanceRow {
    pub chain: Chain,
    #[serde(default)]
    pub wallet_address: String,
    /// Contract address, or [`NATIVE`] for the gas token.
    pub contract_address: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub decimals: u32,
    pub amount: f64,
    /// 0 means "price unknown", not "worth nothing".
    pub unit_price_usd: f64,
    pub value_usd: f64,
    #[serde(default)]
    pub price_source: PriceSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

impl TokenBalanceRow {
    /// Unpriced token row.
    pub fn token(chain: Chain, contract: &str, symbol: &str, name: &str, decimals: u32, amount: f64) -> Self {
        Self {
            chain,
            wallet_address: String::new(),
            contract_address: contract.to_lowercase(),
            symbol: symbol.to_string(),
            name: name.to_string(),
            decimals,
            amount,
            unit_price_usd: 0.0,
            value_usd: 0.0,
            price_source: PriceSource::None,
            icon_url: None,
        }
    }

    /// Unpriced native-coin row.
    pub fn native(chain: Chain, amount: f64) -> Self {
        Self {
            chain,
            wallet_address: String::new(),
            contract_address: NATIVE.to_string(),
            symbol: chain.native_symbol().to_string(),
            name: chain.native_name().to_string(),
            decimals: 18,
            amount,
            unit_price_usd: 0.0,
            value_usd: 0.0,
            price_source: PriceSource::None,
            icon_url: None,
        }
    }

    pub fn is_native(&self) -> bool {
        self.contract_address.is_empty() || self.contract_address == NATIVE
    }

    pub fn has_price(&self) -> bool {
        self.unit_price_usd > 0.0
    }

    /// Set the unit price and recompute the value. Non-positive prices mark
    /// the row as unknown.
    pub fn with_price(mut self, price: f64, source: PriceSource) -> Self {
        self.set_price(price, source);
        self
    }

    pub fn set_price(&mut self, price: f64, source: PriceSource) {
        if price.is_finite() && price > 0.0 {
            self.unit_price_usd = price;
            self.price_source = source;
        } else {
            self.unit_price_usd = 0.0;
            self.price_source = PriceSource::None;
        }
        self.value_usd = self.amount * self.unit_price_usd;
    }

    pub fn set_amount(&mut self, amount: f64) {
        self.amount = if amount.is_finite() && amount > 0.0 { amount } else { 0.0 };
        self.value_usd = self.amount * self.unit_price_usd;
    }

    /// Aggregation key: `chain:contractOrNative:SYMBOL`.
    pub fn merge_key(&self) -> String {
        let contract = if self.is_native() { NATIVE } else { self.contract_address.as_str() };
        format!("{}:{}:{}", self.chain, contract, self.symbol.to_uppercase())
    }
}

/// A wallet being viewed. Owned by the wallet registry, opaque to core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Display hint only; aggregation scope decides which chains are read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<Chain>,
}

impl Wallet {
    pub fn new(address: impl Into<String>) -> Self {
        Self { address: address.into(), name: None, chain: None }
    }
}

/// One wallet's contribution to an aggregated token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletShare {
    pub wallet_address: String,
    pub amount: f64,
    pub value_usd: f64,
}

/// All rows sharing one merge key, across the wallets being viewed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedToken {
    pub key: String,
    pub chain: Chain,
    pub contract_address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u32,
    /// Sum of contributing amounts.
    pub amount: f64,
    /// First non-zero price seen.
    pub unit_price_usd: f64,
    /// Sum of contributing values (not recomputed from amount × price).
    pub value_usd: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// Contributions, largest amount first.
    pub breakdown: Vec<WalletShare>,
}

/// A trading pair as reported by the DEX aggregator, already coerced.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexPair {
    pub chain_id: String,
    pub base_address: String,
    pub base_symbol: String,
    pub quote_address: String,
    pub quote_symbol: String,
    /// USD price of the base token.
    pub price_usd: f64,
    /// Base/quote price ratio.
    pub price_native: f64,
    pub liquidity_usd: f64,
}

/// Per-token metadata looked up on the indexer when the list lacked it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenMeta {
    pub exchange_rate: f64,
    pub icon_url: Option<String>,
}
