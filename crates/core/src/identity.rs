//! Device sync identity: the portfolio slug this device last pushed or
//! pulled, and the remote version it saw.

use std::sync::Arc;

use kinko_common::error::KinkoResult;

use crate::store::KvStore;

const ID_KEY: &str = "kinko:sync:id";
const VERSION_KEY: &str = "kinko:sync:version";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncState {
    pub slug: String,
    /// Last known remote version; `None` before the first successful push/pull.
    pub version: Option<u64>,
}

pub struct SyncIdentity {
    store: Arc<dyn KvStore>,
}

impl SyncIdentity {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> KinkoResult<Option<SyncState>> {
        let Some(slug) = self.store.get(ID_KEY)?.filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let version = self.store.get(VERSION_KEY)?.and_then(|v| v.trim().parse().ok());
        Ok(Some(SyncState { slug, version }))
    }

    pub fn save(&self, slug: &str, version: u64) -> KinkoResult<()> {
        self.store.set(ID_KEY, slug)?;
        self.store.set(VERSION_KEY, &version.to_string())
    }

    pub fn clear(&self) -> KinkoResult<()> {
        self.store.remove(ID_KEY)?;
        self.store.remove(VERSION_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_save_load_clear() {
        let store = Arc::new(MemoryStore::new());
        let identity = SyncIdentity::new(store.clone());
        assert!(identity.load().unwrap().is_none());

        identity.save("AB12CD34", 3).unwrap();
        assert_eq!(
            identity.load().unwrap(),
            Some(SyncState { slug: "AB12CD34".into(), version: Some(3) })
        );

        // A slug without a readable version is still an identity
        store.set(VERSION_KEY, "garbage").unwrap();
        assert_eq!(identity.load().unwrap().unwrap().version, None);

        identity.clear().unwrap();
        assert!(identity.load().unwrap().is_none());
    }
}
