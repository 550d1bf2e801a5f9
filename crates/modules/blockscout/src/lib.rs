//! Blockscout explorer module.
//!
//! Token balances and native balance for PulseChain, Base and the Ethereum
//! fallback, over REST v2 (with the legacy `?module=` API for the native
//! balance) or GraphQL, plus the explorer's native coin price endpoints.

pub mod convert;
pub mod graphql;
pub mod rest;
pub mod stats;

pub use graphql::BlockscoutGraphql;
pub use rest::BlockscoutRest;
pub use stats::{BlockscoutCoinPrice, BlockscoutStatsPrice};
