//! DEX Screener module: pair data for on-chain token pricing.

pub mod client;

pub use client::DexScreenerClient;
