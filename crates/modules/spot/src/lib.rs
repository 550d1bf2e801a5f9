//! Centralized spot-price sources for native coins.

pub mod client;

pub use client::{CoinGeckoSimple, CoinbaseSpot};
