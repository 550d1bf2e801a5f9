mod commands;
mod factory;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use kinko_common::error::KinkoError;
use kinko_utils::output::OutputFormat;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "kinko",
    about = "Kinko: multi-chain wallet portfolio tracker.\nReads balances on Ethereum, PulseChain and Base, prices them, and merges wallets into one view.",
    version,
    propagate_version = true
)]
struct Cli {
    #[arg(long, short = 'o', global = true, default_value = "table")]
    output: CliOutputFormat,

    /// Debug logging (same as `system.verbose = true`).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat { Table, Json, JsonPretty }

impl From<CliOutputFormat> for OutputFormat {
    fn from(f: CliOutputFormat) -> OutputFormat {
        match f {
            CliOutputFormat::Table => OutputFormat::Table,
            CliOutputFormat::Json => OutputFormat::Json,
            CliOutputFormat::JsonPretty => OutputFormat::JsonPretty,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  TOP-LEVEL
// ═══════════════════════════════════════════════════════════════════════

#[derive(Subcommand)]
enum Commands {
    // ── PORTFOLIO ───────────────────────────────────────────────

    /// Merged holdings of every registered wallet.
    Portfolio {
        /// `auto` (all enabled chains) or one of eth, pulse, base.
        #[arg(long, default_value = "auto")]
        scope: String,
        /// Bypass the response cache.
        #[arg(long)]
        force: bool,
    },

    /// Priced token balances of one address on one chain.
    Tokens {
        chain: String,
        address: String,
        /// Bypass the response cache.
        #[arg(long)]
        force: bool,
    },

    /// USD prices: native coins and tokens.
    Price {
        #[command(subcommand)]
        action: PriceAction,
    },

    // ── STATE ───────────────────────────────────────────────────

    /// Manage the wallet registry.
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },

    /// Inspect or clear the response cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Portfolio-ID sync across devices.
    Sync {
        #[command(subcommand)]
        action: SyncAction,
    },

    /// Show or change configuration.
    Configure {
        #[command(subcommand)]
        action: ConfigureAction,
    },
}

#[derive(Subcommand)]
enum PriceAction {
    /// Native coin price (ETH, PLS).
    Native { chain: String },
    /// Token price by contract address.
    Token {
        chain: String,
        contract: String,
        /// Known exchange rate; used as-is when positive.
        #[arg(long)]
        hint: Option<f64>,
    },
}

#[derive(Subcommand)]
enum WalletAction {
    /// Register an address.
    Add {
        address: String,
        #[arg(long)]
        name: Option<String>,
        /// Display hint only.
        #[arg(long)]
        chain: Option<String>,
    },
    /// Remove an address.
    Remove { address: String },
    /// List registered wallets.
    List,
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached entries with their age.
    List,
    /// Clear one address (all chains), or everything.
    Clear {
        address: Option<String>,
        #[arg(long)]
        chain: Option<String>,
    },
}

#[derive(Subcommand)]
enum SyncAction {
    /// Push the wallet list under this device's portfolio ID.
    Export {
        /// Overwrite a newer remote copy.
        #[arg(long)]
        force: bool,
    },
    /// Pull a portfolio ID and replace the local wallet list.
    Import { slug: String },
    /// Show this device's portfolio ID.
    Status,
}

#[derive(Subcommand)]
enum ConfigureAction {
    /// Show all current configuration.
    Show,
    /// Enable or disable a chain.
    Chain {
        chain: String,
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        #[arg(long)]
        disable: bool,
    },
    /// Toggle verbose mode.
    Verbose { enabled: bool },
    /// Set (or clear with `none`) the remote sync service.
    SyncUrl { url: String },
    /// Cache lifetime in minutes (0 = never expire).
    CacheTtl { minutes: u64 },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let fmt: OutputFormat = cli.output.into();

    if let Err(e) = run(cli).await {
        std::process::exit(report(&e, fmt));
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Print the error (JSON envelope in JSON modes) and pick an exit code.
fn report(e: &anyhow::Error, fmt: OutputFormat) -> i32 {
    let kinko = e.downcast_ref::<KinkoError>();
    match fmt {
        OutputFormat::Table => eprintln!("error: {e:#}"),
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let envelope = match kinko {
                Some(k) => k.to_json(),
                None => serde_json::json!({
                    "ok": false,
                    "error": { "code": "ERROR", "message": format!("{e:#}"), "category": "system", "recoverable": false }
                }),
            };
            println!("{envelope}");
        }
    }
    kinko.map_or(1, KinkoError::exit_code)
}

async fn run(cli: Cli) -> Result<()> {
    kinko_core::init_workspace()?;
    let config = kinko_core::workspace::load_config()?;
    init_tracing(cli.verbose || config.system.verbose);
    kinko_core::workspace::set_global_config(config);

    let fmt: OutputFormat = cli.output.into();

    match cli.command {
        // ── PORTFOLIO ───────────────────────────────────────────
        Commands::Portfolio { scope, force } => commands::portfolio::run(&scope, force, fmt).await,
        Commands::Tokens { chain, address, force } => commands::tokens::run(&chain, &address, force, fmt).await,
        Commands::Price { action } => match action {
            PriceAction::Native { chain } => commands::price::native(&chain, fmt).await,
            PriceAction::Token { chain, contract, hint } => commands::price::token(&chain, &contract, hint, fmt).await,
        },

        // ── STATE ───────────────────────────────────────────────
        Commands::Wallet { action } => match action {
            WalletAction::Add { address, name, chain } => commands::wallet::add(&address, name, chain.as_deref(), fmt),
            WalletAction::Remove { address } => commands::wallet::remove(&address, fmt),
            WalletAction::List => commands::wallet::list(fmt),
        },
        Commands::Cache { action } => match action {
            CacheAction::List => commands::cache::list(fmt),
            CacheAction::Clear { address, chain } => commands::cache::clear(address.as_deref(), chain.as_deref(), fmt),
        },
        Commands::Sync { action } => match action {
            SyncAction::Export { force } => commands::sync::export(force, fmt).await,
            SyncAction::Import { slug } => commands::sync::import(&slug, fmt).await,
            SyncAction::Status => commands::sync::status(fmt),
        },
        Commands::Configure { action } => match action {
            ConfigureAction::Show => commands::configure::run(fmt),
            ConfigureAction::Chain { chain, enable, disable } => commands::configure::set_chain(&chain, enable, disable),
            ConfigureAction::Verbose { enabled } => commands::configure::set_verbose(enabled),
            ConfigureAction::SyncUrl { url } => commands::configure::set_sync_url(&url),
            ConfigureAction::CacheTtl { minutes } => commands::configure::set_cache_ttl(minutes),
        },
    }
}
