use anyhow::{bail, Result};
use kinko_common::types::Wallet;
use kinko_types::output::{WalletListOutput, WalletRow};
use kinko_utils::output::{render, render_json_or, OutputFormat};

use super::helpers::parse_chain;
use crate::factory::Runtime;

/// `kinko wallet add <address> [--name] [--chain]`
pub fn add(address: &str, name: Option<String>, chain: Option<&str>, fmt: OutputFormat) -> Result<()> {
    let chain = chain.map(parse_chain).transpose()?;
    let rt = Runtime::load()?;
    let wallet = Wallet { address: address.trim().to_string(), name, chain };
    let added = rt.registry.add(wallet)?;

    let result = serde_json::json!({ "ok": true, "added": added, "address": address.trim() });
    if !render_json_or(fmt, &result)? {
        if added {
            println!("✓ Added {}", address.trim());
        } else {
            println!("Already registered: {}", address.trim());
        }
    }
    Ok(())
}

/// `kinko wallet remove <address>`
pub fn remove(address: &str, fmt: OutputFormat) -> Result<()> {
    let rt = Runtime::load()?;
    if !rt.registry.remove(address)? {
        bail!("Wallet not registered: {address}");
    }
    let result = serde_json::json!({ "ok": true, "removed": address.trim() });
    if !render_json_or(fmt, &result)? {
        println!("✓ Removed {}", address.trim());
    }
    Ok(())
}

/// `kinko wallet list`
pub fn list(fmt: OutputFormat) -> Result<()> {
    let rt = Runtime::load()?;
    let output = WalletListOutput {
        wallets: rt
            .registry
            .list()?
            .into_iter()
            .map(|w| WalletRow { address: w.address, name: w.name, chain: w.chain.map(|c| c.to_string()) })
            .collect(),
    };
    render(fmt, &output)
}
