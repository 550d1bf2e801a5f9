//! Portfolio-ID sync: push/pull the wallet list under a short slug with
//! optimistic versioning.
//!
//! Remote contract:
//! ```text
//! GET /portfolio?slug=<id>   → 200 { slug, version, updatedAt, blob } | 404
//! PUT /portfolio             body { slug, blob, prevVersion? }
//!                            → 200 record | 409 { error: "version_mismatch", expected }
//! ```
//! Without a configured service the same contract is served from the local
//! key-value store.

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use kinko_common::error::{KinkoError, KinkoResult};
use kinko_common::http::{join_url, HttpClient};
use kinko_common::types::Wallet;

use crate::identity::{SyncIdentity, SyncState};
use crate::registry::WalletRegistry;
use crate::store::KvStore;

const SLUG_LEN: usize = 8;
const SLUG_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOCAL_PREFIX: &str = "kinko:sync:store:";
/// Fresh slugs tried before a first export gives up.
const SLUG_ATTEMPTS: usize = 3;

/// Fresh 8-character uppercase base-36 slug.
pub fn generate_slug() -> String {
    let mut rng = rand::thread_rng();
    (0..SLUG_LEN)
        .map(|_| SLUG_ALPHABET[rng.gen_range(0..SLUG_ALPHABET.len())] as char)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    pub slug: String,
    pub version: u64,
    #[serde(default)]
    pub updated_at: String,
    pub blob: Value,
}

/// Storage behind the sync contract.
#[async_trait]
pub trait SyncBackend: Send + Sync {
    /// `remote` or `local`.
    fn kind(&self) -> &'static str;

    async fn get(&self, slug: &str) -> KinkoResult<Option<SyncRecord>>;

    /// Store `blob`. With `prev_version`, fails with `VersionConflict` if the
    /// stored record is at a different version; nothing is written then.
    async fn put(&self, slug: &str, blob: &Value, prev_version: Option<u64>) -> KinkoResult<SyncRecord>;
}

// ═══════════════════════════════════════════════════════════════════════
//  HTTP BACKEND
// ═══════════════════════════════════════════════════════════════════════

pub struct HttpSyncBackend {
    http: HttpClient,
    base_url: String,
}

impl HttpSyncBackend {
    pub fn new(base_url: &str, timeout_secs: u64) -> KinkoResult<Self> {
        Ok(Self { http: HttpClient::new("sync", timeout_secs)?, base_url: base_url.trim_end_matches('/').to_string() })
    }
}

#[async_trait]
impl SyncBackend for HttpSyncBackend {
    fn kind(&self) -> &'static str {
        "remote"
    }

    async fn get(&self, slug: &str) -> KinkoResult<Option<SyncRecord>> {
        let url = join_url(&self.base_url, "portfolio");
        let req = self.http.get(&url).query(&[("slug", slug)]);
        let (status, body) = self.http.send_raw(req).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(self.http.status_error(status, &body));
        }
        Ok(Some(serde_json::from_str(&body)?))
    }

    async fn put(&self, slug: &str, blob: &Value, prev_version: Option<u64>) -> KinkoResult<SyncRecord> {
        let url = join_url(&self.base_url, "portfolio");
        let mut body = json!({ "slug": slug, "blob": blob });
        if let Some(v) = prev_version {
            body["prevVersion"] = json!(v);
        }

        let (status, text) = self.http.send_raw(self.http.put(&url).json(&body)).await?;
        if status == StatusCode::CONFLICT {
            let expected = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("expected").and_then(Value::as_u64))
                .ok_or_else(|| KinkoError::Parse("409 without expected version".into()))?;
            return Err(KinkoError::VersionConflict { expected });
        }
        if !status.is_success() {
            return Err(self.http.status_error(status, &text));
        }
        Ok(serde_json::from_str(&text)?)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  LOCAL BACKEND
// ═══════════════════════════════════════════════════════════════════════

/// Sync records in the local key-value store (`kinko:sync:store:<slug>`).
pub struct LocalSyncBackend {
    store: Arc<dyn KvStore>,
}

impl LocalSyncBackend {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    fn key(slug: &str) -> String {
        format!("{LOCAL_PREFIX}{slug}")
    }
}

#[async_trait]
impl SyncBackend for LocalSyncBackend {
    fn kind(&self) -> &'static str {
        "local"
    }

    async fn get(&self, slug: &str) -> KinkoResult<Option<SyncRecord>> {
        match self.store.get(&Self::key(slug))? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, slug: &str, blob: &Value, prev_version: Option<u64>) -> KinkoResult<SyncRecord> {
        let existing = self.get(slug).await.unwrap_or_else(|e| {
            warn!(slug, error = %e, "unreadable local sync record, replacing");
            None
        });

        if let (Some(existing), Some(prev)) = (&existing, prev_version) {
            if existing.version != prev {
                return Err(KinkoError::VersionConflict { expected: existing.version });
            }
        }

        let record = SyncRecord {
            slug: slug.to_string(),
            version: existing.map_or(0, |r| r.version) + 1,
            updated_at: chrono::Utc::now().to_rfc3339(),
            blob: blob.clone(),
        };
        self.store.set(&Self::key(slug), &serde_json::to_string(&record)?)?;
        Ok(record)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  CLIENT
// ═══════════════════════════════════════════════════════════════════════

/// Result of an export or import.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    pub slug: String,
    pub version: u64,
    pub wallets: usize,
    pub backend: &'static str,
}

pub struct SyncClient {
    backend: Arc<dyn SyncBackend>,
    registry: Arc<WalletRegistry>,
    identity: Arc<SyncIdentity>,
}

impl SyncClient {
    pub fn new(backend: Arc<dyn SyncBackend>, registry: Arc<WalletRegistry>, identity: Arc<SyncIdentity>) -> Self {
        Self { backend, registry, identity }
    }

    pub fn backend_kind(&self) -> &'static str {
        self.backend.kind()
    }

    pub fn status(&self) -> KinkoResult<Option<SyncState>> {
        self.identity.load()
    }

    /// Push the wallet registry under the stored slug (or a new one).
    ///
    /// The last version seen is sent as `prevVersion`, so a newer remote copy
    /// surfaces as `VersionConflict` instead of being overwritten. With
    /// `overwrite`, the check is skipped for a slug this device already owns.
    pub async fn export(&self, overwrite: bool) -> KinkoResult<SyncOutcome> {
        let wallets = self.registry.list()?;
        let blob = json!({ "wallets": wallets });

        let (slug, record) = match self.identity.load()? {
            Some(state) => {
                let prev = if overwrite { None } else { state.version };
                let record = self.backend.put(&state.slug, &blob, prev).await?;
                (state.slug, record)
            }
            None => self.claim_slug(&blob).await?,
        };
        self.identity.save(&slug, record.version)?;

        info!(slug = %slug, version = record.version, wallets = wallets.len(), "portfolio exported");
        Ok(SyncOutcome { slug, version: record.version, wallets: wallets.len(), backend: self.backend.kind() })
    }

    /// First write under a generated slug. `prevVersion: 0` turns a record
    /// already stored under that slug into a conflict; another slug is drawn.
    async fn claim_slug(&self, blob: &Value) -> KinkoResult<(String, SyncRecord)> {
        for _ in 0..SLUG_ATTEMPTS {
            let slug = generate_slug();
            match self.backend.put(&slug, blob, Some(0)).await {
                Ok(record) => return Ok((slug, record)),
                Err(KinkoError::VersionConflict { expected }) => {
                    warn!(slug = %slug, expected, "portfolio id already taken, drawing another");
                }
                Err(e) => return Err(e),
            }
        }
        Err(KinkoError::Other(format!("no unused portfolio id after {SLUG_ATTEMPTS} attempts")))
    }

    /// Pull a portfolio and replace the local wallet registry with it.
    pub async fn import(&self, slug: &str) -> KinkoResult<SyncOutcome> {
        let slug = slug.trim();
        if slug.is_empty() {
            return Err(KinkoError::NotFound("portfolio id is required".into()));
        }

        let record = self
            .backend
            .get(slug)
            .await?
            .ok_or_else(|| KinkoError::NotFound(format!("no portfolio stored under {slug}")))?;

        let wallets = wallets_from_blob(&record.blob);
        self.registry.replace(&wallets)?;
        self.identity.save(slug, record.version)?;

        info!(slug, version = record.version, wallets = wallets.len(), "portfolio imported");
        Ok(SyncOutcome { slug: slug.to_string(), version: record.version, wallets: wallets.len(), backend: self.backend.kind() })
    }
}

/// Wallets from `{ "wallets": [...] }` or a bare array; unreadable entries are skipped.
fn wallets_from_blob(blob: &Value) -> Vec<Wallet> {
    let items = blob
        .get("wallets")
        .and_then(Value::as_array)
        .or_else(|| blob.as_array())
        .cloned()
        .unwrap_or_default();
    items
        .into_iter()
        .filter_map(|v| serde_json::from_value::<Wallet>(v).ok())
        .filter(|w| !w.address.trim().is_empty())
        .collect()
}
