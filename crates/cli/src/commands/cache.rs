use anyhow::Result;
use kinko_types::output::{CacheEntryRow, CacheListOutput};
use kinko_utils::output::{render, render_json_or, OutputFormat};

use super::helpers::parse_chain;
use crate::factory::Runtime;

/// `kinko cache list`
pub fn list(fmt: OutputFormat) -> Result<()> {
    let rt = Runtime::load()?;
    let output = CacheListOutput {
        entries: rt
            .cache
            .entries()
            .into_iter()
            .map(|e| CacheEntryRow {
                key: e.key,
                stored_at_ms: e.timestamp.max(0) as u64,
                age_secs: e.age_ms / 1000,
                bytes: e.bytes,
            })
            .collect(),
    };
    render(fmt, &output)
}

/// `kinko cache clear [address] [--chain <chain>]`
pub fn clear(address: Option<&str>, chain: Option<&str>, fmt: OutputFormat) -> Result<()> {
    let chain = chain.map(parse_chain).transpose()?;
    let rt = Runtime::load()?;

    let removed = match address {
        Some(address) => {
            let mut removed = 0;
            for (c, fetcher) in &rt.fetchers {
                if chain.is_some_and(|want| want != *c) {
                    continue;
                }
                removed += rt.cache.clear_all(&fetcher.cache_key(address));
            }
            removed
        }
        None => match chain {
            Some(c) => rt.cache.clear_all(&format!("{c}:")),
            None => rt.cache.clear_all(""),
        },
    };

    let result = serde_json::json!({ "ok": true, "removed": removed });
    if !render_json_or(fmt, &result)? {
        println!("✓ Cleared {removed} cache entr{}", if removed == 1 { "y" } else { "ies" });
    }
    Ok(())
}
