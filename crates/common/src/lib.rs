//! Shared vocabulary for kinko: universal types, the error model, provider
//! traits, the JSON HTTP helper and the safe-number utility every external
//! payload goes through.

pub mod constants;
pub mod error;
pub mod http;
pub mod numeric;
pub mod traits;
pub mod types;
