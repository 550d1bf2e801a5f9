// ── Storage ──
pub mod cache;
pub mod identity;
pub mod registry;
pub mod store;

// ── Pricing & fetching ──
pub mod fallback;
pub mod fetcher;
pub mod filter;
pub mod price;

// ── Portfolio ──
pub mod aggregator;
pub mod guard;

// ── Sync & workspace ──
pub mod sync;
pub mod workspace;

pub use aggregator::{Aggregator, PortfolioOptions, PortfolioSession, PortfolioView, Scope};
pub use cache::ResponseCache;
pub use fetcher::{ChainFetcher, TokenFetcher};
pub use price::PriceResolver;
pub use registry::WalletRegistry;
pub use store::{KvStore, MemoryStore, SqliteStore};
pub use sync::SyncClient;
pub use workspace::init_workspace;
