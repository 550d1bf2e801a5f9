//! Ethplorer module: Ethereum mainnet balances.

pub mod client;

pub use client::EthplorerClient;
