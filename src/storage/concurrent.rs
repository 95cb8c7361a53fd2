use std::sync::Arc;

use dashmap::{DashMap, Entry};

use super::error::StorageError;
use super::traits::AccountDirectory;
use crate::domain::{Account, AccountId, AccountKey};

/// Concurrent in-memory account directory using DashMap
pub struct ConcurrentAccountDirectory<K: AccountKey = AccountId> {
    accounts: DashMap<K, Arc<Account<K>>>,
}

impl<K: AccountKey> ConcurrentAccountDirectory<K> {
    /// Create a new empty directory
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }
}

impl<K: AccountKey> Default for ConcurrentAccountDirectory<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: AccountKey> AccountDirectory<K> for ConcurrentAccountDirectory<K> {
    fn register(&self, account: Account<K>) -> Result<Arc<Account<K>>, StorageError> {
        // The shard lock held by the entry makes check-and-insert atomic
        match self.accounts.entry(account.id().clone()) {
            Entry::Occupied(e) => Err(StorageError::AccountAlreadyRegistered(e.key().to_string())),
            Entry::Vacant(e) => {
                let handle = Arc::new(account);
                e.insert(Arc::clone(&handle));
                Ok(handle)
            }
        }
    }

    fn lookup(&self, id: &K) -> Option<Arc<Account<K>>> {
        // Clone the handle so no shard guard outlives this call
        self.accounts.get(id).map(|r| Arc::clone(r.value()))
    }

    fn len(&self) -> usize {
        self.accounts.len()
    }

    fn accounts(&self) -> Vec<Arc<Account<K>>> {
        self.accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}
