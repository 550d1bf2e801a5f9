//! Wallet registry: the list of wallets being viewed.
//!
//! Stored as one JSON array under the `wallets` key. Addresses are compared
//! case-insensitively; the first spelling added is kept.

use std::sync::Arc;

use kinko_common::error::{KinkoError, KinkoResult};
use kinko_common::types::Wallet;

use crate::store::KvStore;

const WALLETS_KEY: &str = "wallets";

/// `0x` followed by 40 hex digits.
pub fn is_evm_address(addr: &str) -> bool {
    let Some(hex) = addr.strip_prefix("0x").or_else(|| addr.strip_prefix("0X")) else {
        return false;
    };
    hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

pub struct WalletRegistry {
    store: Arc<dyn KvStore>,
}

impl WalletRegistry {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Registered wallets in insertion order. A corrupt record reads as empty.
    pub fn list(&self) -> KinkoResult<Vec<Wallet>> {
        match self.store.get(WALLETS_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "wallet registry unreadable, treating as empty");
                Vec::new()
            })),
            None => Ok(Vec::new()),
        }
    }

    pub fn find(&self, address: &str) -> KinkoResult<Option<Wallet>> {
        Ok(self
            .list()?
            .into_iter()
            .find(|w| w.address.eq_ignore_ascii_case(address)))
    }

    /// Add a wallet. Returns false if the address was already registered.
    pub fn add(&self, wallet: Wallet) -> KinkoResult<bool> {
        let address = wallet.address.trim();
        if !is_evm_address(address) {
            return Err(KinkoError::InvalidAddress(wallet.address.clone()));
        }

        let mut wallets = self.list()?;
        if wallets.iter().any(|w| w.address.eq_ignore_ascii_case(address)) {
            return Ok(false);
        }
        wallets.push(Wallet { address: address.to_string(), ..wallet });
        self.write(&wallets)?;
        Ok(true)
    }

    /// Remove by address. Returns true if removed.
    pub fn remove(&self, address: &str) -> KinkoResult<bool> {
        let mut wallets = self.list()?;
        let before = wallets.len();
        wallets.retain(|w| !w.address.eq_ignore_ascii_case(address.trim()));
        if wallets.len() == before {
            return Ok(false);
        }
        self.write(&wallets)?;
        Ok(true)
    }

    /// Replace the whole list (sync import).
    pub fn replace(&self, wallets: &[Wallet]) -> KinkoResult<()> {
        self.write(wallets)
    }

    fn write(&self, wallets: &[Wallet]) -> KinkoResult<()> {
        let raw = serde_json::to_string(wallets)?;
        self.store.set(WALLETS_KEY, &raw)
    }
}
