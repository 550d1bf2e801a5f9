//! Configuration schema and CLI output shapes shared by kinko crates.

pub mod config;
pub mod output;
