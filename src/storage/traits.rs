use std::sync::Arc;

use super::error::StorageError;
use crate::domain::{Account, AccountKey};

/// Directory of registered accounts with pluggable storage backends.
///
/// Accounts are handed out as shared handles, never copied: every caller that
/// looks up the same id sees the same balance cell. Implementations must be
/// safe under concurrent registration and lookup.
pub trait AccountDirectory<K: AccountKey>: Send + Sync {
    /// Insert a new account, failing if its id is already present
    fn register(&self, account: Account<K>) -> Result<Arc<Account<K>>, StorageError>;

    /// Shared handle to an account, if registered
    fn lookup(&self, id: &K) -> Option<Arc<Account<K>>>;

    /// Number of registered accounts
    fn len(&self) -> usize;

    /// Handles to every registered account, in no particular order
    fn accounts(&self) -> Vec<Arc<Account<K>>>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, id: &K) -> bool {
        self.lookup(id).is_some()
    }

    /// Like `lookup`, but an absent id is an `AccountNotFound` error
    fn require(&self, id: &K) -> Result<Arc<Account<K>>, StorageError> {
        self.lookup(id)
            .ok_or_else(|| StorageError::AccountNotFound(id.to_string()))
    }
}

// Allows a directory to be shared between a ledger and other owners
impl<K, D> AccountDirectory<K> for Arc<D>
where
    K: AccountKey,
    D: AccountDirectory<K>,
{
    fn register(&self, account: Account<K>) -> Result<Arc<Account<K>>, StorageError> {
        (**self).register(account)
    }

    fn lookup(&self, id: &K) -> Option<Arc<Account<K>>> {
        (**self).lookup(id)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn accounts(&self) -> Vec<Arc<Account<K>>> {
        (**self).accounts()
    }
}
