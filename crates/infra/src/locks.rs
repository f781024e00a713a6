//! Per-account mutual exclusion for balance mutations.
//!
//! A storage transaction alone does not stop two operations from both reading
//! a balance as sufficient and then both debiting it. Every balance-affecting
//! operation holds the lock of each account it touches for the whole unit.
//!
//! The map only holds accounts that are locked or being waited on: releasing a
//! guard drops every entry nobody else references.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use ura_core::AccountId;

type LockMap = HashMap<AccountId, Arc<AsyncMutex<()>>>;

#[derive(Debug, Default)]
pub struct AccountLocks {
    locks: Arc<Mutex<LockMap>>,
}

/// Guards released on drop.
#[derive(Debug)]
pub struct AccountGuard {
    guards: Vec<OwnedMutexGuard<()>>,
    locks: Arc<Mutex<LockMap>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every listed account.
    ///
    /// Ids are sorted and deduplicated first, so two callers locking the same
    /// pair in opposite order cannot deadlock.
    pub async fn lock(&self, ids: &[AccountId]) -> AccountGuard {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut guard = AccountGuard {
            guards: Vec::with_capacity(ids.len()),
            locks: Arc::clone(&self.locks),
        };

        let mutexes: Vec<Arc<AsyncMutex<()>>> = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            ids.iter()
                .map(|id| locks.entry(*id).or_default().clone())
                .collect()
        };

        for mutex in mutexes {
            guard.guards.push(mutex.lock_owned().await);
        }

        guard
    }

    /// Accounts currently locked or waited on.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Drop for AccountGuard {
    fn drop(&mut self) {
        self.guards.clear();

        // Under the map lock, a count of one means only the map refers to the
        // mutex: nobody holds it and nobody is queued on it.
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }
}
