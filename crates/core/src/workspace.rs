use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use kinko_types::config::AppConfig;
use tracing::{info, warn};

/// Dotfolder name under `$HOME`.
const DOTFOLDER: &str = ".kinko";

/// Required subdirectories inside the dotfolder.
const SUBDIRS: &[&str] = &["logs", "data"];

static GLOBAL_CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Resolve the root path: `$HOME/.kinko/`.
pub fn root_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(DOTFOLDER))
}

/// Resolve a path relative to the dotfolder root.
pub fn resolve(relative: &str) -> Result<PathBuf> {
    Ok(root_dir()?.join(relative))
}

/// Ensure the dotfolder structure exists. Idempotent.
///
/// ```text
/// $HOME/.kinko/
/// ├── config.toml
/// ├── logs/
/// └── data/
///     └── kinko.db   (created on first open)
/// ```
pub fn init_workspace() -> Result<()> {
    let root = root_dir()?;

    for sub in SUBDIRS {
        let dir = root.join(sub);
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            info!("created directory: {}", dir.display());
        }
    }

    let config_path = root.join("config.toml");
    if !config_path.exists() {
        let toml_str = AppConfig::default()
            .to_toml_string()
            .context("Failed to serialize default config")?;
        fs::write(&config_path, &toml_str)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        info!("created default config: {}", config_path.display());
    }

    Ok(())
}

/// Load the config from disk. An outdated file is regenerated with defaults,
/// keeping the few values a user is likely to have set by hand.
pub fn load_config() -> Result<AppConfig> {
    let config_path = root_dir()?.join("config.toml");
    let raw = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;

    match AppConfig::from_toml_str(&raw) {
        Ok(config) => Ok(config),
        Err(e) => {
            warn!(error = %e, "config.toml outdated, migrating to new schema");
            let config = migrate_config(&raw);
            save_config(&config)?;
            info!("config migrated successfully");
            Ok(config)
        }
    }
}

/// Defaults plus whatever survives from an unparseable file.
fn migrate_config(raw: &str) -> AppConfig {
    let mut config = AppConfig::default();
    let Ok(old) = raw.parse::<toml::Table>() else {
        return config;
    };

    if let Some(system) = old.get("system").and_then(|v| v.as_table()) {
        if let Some(verbose) = system.get("verbose").and_then(|v| v.as_bool()) {
            config.system.verbose = verbose;
        }
        if let Some(ttl) = system.get("cache_ttl_minutes").and_then(|v| v.as_integer()) {
            if ttl >= 0 {
                config.system.cache_ttl_minutes = ttl as u64;
            }
        }
    }
    if let Some(api_base) = old
        .get("sync")
        .and_then(|v| v.as_table())
        .and_then(|t| t.get("api_base"))
        .and_then(|v| v.as_str())
    {
        config.sync.api_base = Some(api_base.to_string());
    }
    config
}

/// Write the config back to disk.
pub fn save_config(config: &AppConfig) -> Result<()> {
    let config_path = root_dir()?.join("config.toml");
    let toml_str = config.to_toml_string().context("Failed to serialize config")?;
    fs::write(&config_path, &toml_str)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    Ok(())
}

/// Install the process-wide config. Later calls keep the first value.
pub fn set_global_config(config: AppConfig) -> &'static AppConfig {
    GLOBAL_CONFIG.get_or_init(|| config)
}

/// Process-wide config; defaults if none was installed.
pub fn global_config() -> &'static AppConfig {
    GLOBAL_CONFIG.get_or_init(AppConfig::default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_dir_under_home() {
        let root = root_dir().unwrap();
        let home = dirs::home_dir().unwrap();
        assert_eq!(root, home.join(".kinko"));
    }

    #[test]
    fn test_resolve_nested() {
        let path = resolve("data/kinko.db").unwrap();
        assert_eq!(path, root_dir().unwrap().join("data/kinko.db"));
    }

    #[test]
    fn test_init_workspace_idempotent() {
        init_workspace().unwrap();
        init_workspace().unwrap();
        let root = root_dir().unwrap();
        for sub in SUBDIRS {
            assert!(root.join(sub).is_dir(), "{sub} directory should exist");
        }
        assert!(root.join("config.toml").is_file());
    }

    #[test]
    fn test_load_and_save_config() {
        init_workspace().unwrap();
        let config = load_config().unwrap();
        save_config(&config).unwrap();
        let reloaded = load_config().unwrap();
        assert_eq!(reloaded.system.cache_ttl_minutes, config.system.cache_ttl_minutes);
        assert_eq!(reloaded.dex.batch_size, config.dex.batch_size);
    }

    #[test]
    fn test_migrate_keeps_known_values() {
        let raw = r#"
[general]
active_profile = "old"

[system]
verbose = true
cache_ttl_minutes = "ten"

[sync]
api_base = "https://sync.example.org"
"#;
        let config = migrate_config(raw);
        assert!(config.system.verbose);
        assert_eq!(config.system.cache_ttl_minutes, 10);
        assert_eq!(config.sync.api_base.as_deref(), Some("https://sync.example.org"));
    }

    #[test]
    fn test_migrate_garbage_gives_defaults() {
        let config = migrate_config("not = [valid");
        assert_eq!(config.dex.batch_size, AppConfig::default().dex.batch_size);
    }

    #[test]
    fn test_global_config_is_stable() {
        let a = global_config() as *const AppConfig;
        let b = set_global_config(AppConfig::default()) as *const AppConfig;
        assert_eq!(a, b);
    }
}
