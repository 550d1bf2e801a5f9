use anyhow::{bail, Result};
use kinko_utils::output::{render_json_or, OutputFormat};

use super::helpers::parse_chain;
use kinko_core::workspace::{global_config, load_config, save_config};

/// `kinko configure show`
pub fn run(fmt: OutputFormat) -> Result<()> {
    let config = global_config();
    if !render_json_or(fmt, config)? {
        print!("{}", config.to_toml_string()?);
        println!();
        println!("File: {}", kinko_core::workspace::resolve("config.toml")?.display());
    }
    Ok(())
}

/// `kinko configure chain <chain> --enable|--disable`
pub fn set_chain(chain: &str, enable: bool, disable: bool) -> Result<()> {
    if enable == disable {
        bail!("Pass exactly one of --enable or --disable");
    }
    let chain = parse_chain(chain)?;
    let mut config = load_config()?;
    config.chains.get_mut(chain).enabled = enable;
    if config.chains.enabled().is_empty() {
        bail!("At least one chain must stay enabled");
    }
    save_config(&config)?;
    println!("✓ {chain} {}", if enable { "enabled" } else { "disabled" });
    Ok(())
}

/// `kinko configure verbose <true|false>`
pub fn set_verbose(enabled: bool) -> Result<()> {
    let mut config = load_config()?;
    config.system.verbose = enabled;
    save_config(&config)?;
    println!("✓ verbose = {enabled}");
    Ok(())
}

/// `kinko configure sync-url <url|none>`
pub fn set_sync_url(url: &str) -> Result<()> {
    let mut config = load_config()?;
    let url = url.trim();
    if url.eq_ignore_ascii_case("none") || url.is_empty() {
        config.sync.api_base = None;
        save_config(&config)?;
        println!("✓ sync uses the local store");
        return Ok(());
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("Sync URL must start with http:// or https://");
    }
    config.sync.api_base = Some(url.trim_end_matches('/').to_string());
    save_config(&config)?;
    println!("✓ sync service = {url}");
    Ok(())
}

/// `kinko configure cache-ttl <minutes>`
pub fn set_cache_ttl(minutes: u64) -> Result<()> {
    let mut config = load_config()?;
    config.system.cache_ttl_minutes = minutes;
    save_config(&config)?;
    if minutes == 0 {
        println!("✓ cache entries never expire");
    } else {
        println!("✓ cache ttl = {minutes} min");
    }
    Ok(())
}
