use anyhow::Result;
use kinko_core::sync::SyncOutcome;
use kinko_types::output::SyncOutput;
use kinko_utils::output::{render, render_json_or, OutputFormat};

use crate::factory::Runtime;

fn to_output(action: &str, outcome: SyncOutcome) -> SyncOutput {
    SyncOutput {
        action: action.to_string(),
        slug: outcome.slug,
        version: outcome.version,
        backend: outcome.backend.to_string(),
        wallets: outcome.wallets,
    }
}

/// `kinko sync export [--force]`
pub async fn export(force: bool, fmt: OutputFormat) -> Result<()> {
    let rt = Runtime::load()?;
    let outcome = rt.sync.export(force).await?;
    render(fmt, &to_output("exported", outcome))
}

/// `kinko sync import <slug>`
pub async fn import(slug: &str, fmt: OutputFormat) -> Result<()> {
    let rt = Runtime::load()?;
    let outcome = rt.sync.import(&slug.trim().to_uppercase()).await?;
    render(fmt, &to_output("imported", outcome))
}

/// `kinko sync status`
pub fn status(fmt: OutputFormat) -> Result<()> {
    let rt = Runtime::load()?;
    let state = rt.sync.status()?;
    let result = serde_json::json!({
        "slug": state.as_ref().map(|s| s.slug.clone()),
        "version": state.as_ref().and_then(|s| s.version),
        "backend": rt.sync.backend_kind(),
    });
    if !render_json_or(fmt, &result)? {
        match state {
            Some(s) => println!(
                "Portfolio ID {} (version {}, {} backend)",
                s.slug,
                s.version.map_or_else(|| "unknown".to_string(), |v| v.to_string()),
                rt.sync.backend_kind(),
            ),
            None => println!("No portfolio ID yet. Create one with: kinko sync export"),
        }
    }
    Ok(())
}
