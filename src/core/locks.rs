//! Per-wallet async locks.
//!
//! A grant reads a wallet, decides eligibility, then writes it back. Two grants
//! for the same wallet must not interleave that sequence, so each one holds the
//! wallet's lock from before its database transaction opens until it commits.
//! Wallets that nobody holds are pruned once the map grows past a threshold.

use crate::entities::CurrencyType;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

const PRUNE_THRESHOLD: usize = 1024;

/// Identity of a wallet: one per (guild, user, currency).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WalletKey {
    /// Discord guild ID
    pub guild_id: String,
    /// Discord user ID
    pub user_id: String,
    /// Wallet currency
    pub currency: CurrencyType,
}

impl WalletKey {
    /// Builds a key from borrowed IDs.
    #[must_use]
    pub fn new(guild_id: &str, user_id: &str, currency: CurrencyType) -> Self {
        Self {
            guild_id: guild_id.to_string(),
            user_id: user_id.to_string(),
            currency,
        }
    }
}

/// Guard for a single wallet.
pub type WalletGuard = OwnedMutexGuard<()>;

/// Registry of per-wallet locks shared by all service calls.
#[derive(Debug, Clone, Default)]
pub struct WalletLocks {
    inner: Arc<Mutex<HashMap<WalletKey, Arc<AsyncMutex<()>>>>>,
}

impl WalletLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn mutex_for(&self, key: &WalletKey) -> Arc<AsyncMutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if map.len() >= PRUNE_THRESHOLD {
            // Only the map itself references an idle lock.
            map.retain(|_, mutex| Arc::strong_count(mutex) > 1);
        }
        Arc::clone(map.entry(key.clone()).or_default())
    }

    /// Waits for exclusive access to one wallet.
    pub async fn lock(&self, key: &WalletKey) -> WalletGuard {
        self.mutex_for(key).lock_owned().await
    }

    /// Waits for exclusive access to two distinct wallets.
    ///
    /// Locks are always taken in key order, so two transfers running in opposite
    /// directions cannot deadlock. The guards are returned in argument order.
    pub async fn lock_pair(&self, a: &WalletKey, b: &WalletKey) -> (WalletGuard, WalletGuard) {
        if a <= b {
            let first = self.lock(a).await;
            let second = self.lock(b).await;
            (first, second)
        } else {
            let first = self.lock(b).await;
            let second = self.lock(a).await;
            (second, first)
        }
    }

    /// Number of wallets currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no wallet is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn key(user: &str) -> WalletKey {
        WalletKey::new("guild", user, CurrencyType::Topy)
    }

    #[tokio::test]
    async fn test_same_wallet_is_exclusive() {
        let locks = WalletLocks::new();
        let guard = locks.lock(&key("alice")).await;

        let waiting = tokio::time::timeout(Duration::from_millis(20), locks.lock(&key("alice"))).await;
        assert!(waiting.is_err(), "second lock on the same wallet must wait");

        drop(guard);
        let reacquired =
            tokio::time::timeout(Duration::from_millis(20), locks.lock(&key("alice"))).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn test_different_wallets_are_independent() {
        let locks = WalletLocks::new();
        let _alice = locks.lock(&key("alice")).await;
        let bob = tokio::time::timeout(Duration::from_millis(20), locks.lock(&key("bob"))).await;
        assert!(bob.is_ok());

        let ruby = WalletKey::new("guild", "alice", CurrencyType::Ruby);
        let alice_ruby = tokio::time::timeout(Duration::from_millis(20), locks.lock(&ruby)).await;
        assert!(alice_ruby.is_ok());
        assert_eq!(locks.len(), 3);
    }

    #[tokio::test]
    async fn test_lock_pair_opposite_directions() {
        let locks = WalletLocks::new();
        let (a, b) = (key("alice"), key("bob"));

        let (g1, g2) = locks.lock_pair(&a, &b).await;
        drop((g1, g2));
        let reversed =
            tokio::time::timeout(Duration::from_millis(20), locks.lock_pair(&b, &a)).await;
        assert!(reversed.is_ok());
    }
}
