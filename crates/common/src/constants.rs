//! Universal constants for kinko.

/// Default public endpoints.
pub const ETHPLORER_API: &str = "https://api.ethplorer.io";
pub const ETHPLORER_FREE_KEY: &str = "freekey";
pub const ETH_BLOCKSCOUT_V2: &str = "https://eth.blockscout.com/api/v2";
pub const PULSE_BLOCKSCOUT_V2: &str = "https://api.scan.pulsechain.com/api/v2";
pub const PULSE_BLOCKSCOUT_GRAPHQL: &str = "https://api.scan.pulsechain.com/graphql";
pub const BASE_BLOCKSCOUT_V2: &str = "https://base.blockscout.com/api/v2";
pub const BASE_BLOCKSCOUT_GRAPHQL: &str = "https://base.blockscout.com/api/v1/graphql";
pub const DEXSCREENER_API: &str = "https://api.dexscreener.com/latest/dex";
pub const COINBASE_API: &str = "https://api.coinbase.com";
pub const COINGECKO_API: &str = "https://api.coingecko.com/api/v3";

/// Wrapped PLS, the pricing anchor for the PulseChain native coin.
pub const WPLS_ADDRESS: &str = "0xA1077a294dDE1B09bB078844df40758a5D0f9a27";

/// Default request timeout for every outbound call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Tolerance for float comparisons against display thresholds.
pub const USD_EPSILON: f64 = 1e-12;
