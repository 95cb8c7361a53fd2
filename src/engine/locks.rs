use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::trace;

use super::error::LedgerError;
use crate::domain::{AccountId, AccountKey};
use crate::storage::StorageError;

/// Per-account mutex tagged with the sequence number it was created with
#[derive(Debug)]
struct OrderedLock {
    sequence: u64,
    mutex: Mutex<()>,
}

/// Hands out one lock per account and acquires pairs of them deadlock-free.
///
/// Pairs are always taken in ascending creation-sequence order. The sequence
/// belongs to the lock, so the order never depends on argument order or on
/// anything derived from the account id (its `Hash` or `Ord`).
///
/// Every pessimistic strategy touching the same accounts must share one
/// coordinator; see [`OrderedLockTransfer::with_coordinator`].
///
/// [`OrderedLockTransfer::with_coordinator`]: super::strategy::OrderedLockTransfer::with_coordinator
#[derive(Debug)]
pub struct LockCoordinator<K: AccountKey = AccountId> {
    locks: DashMap<K, Arc<OrderedLock>>,
    next_sequence: AtomicU64,
}

impl<K: AccountKey> LockCoordinator<K> {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
            next_sequence: AtomicU64::new(0),
        }
    }

    /// Create the lock for `id` if it does not exist yet (idempotent)
    pub fn register(&self, id: &K) {
        self.locks.entry(id.clone()).or_insert_with(|| {
            let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
            trace!(account = %id, sequence, "Registered account lock");
            Arc::new(OrderedLock {
                sequence,
                mutex: Mutex::new(()),
            })
        });
    }

    pub fn is_registered(&self, id: &K) -> bool {
        self.locks.contains_key(id)
    }

    /// Number of locks handed out so far
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Run `action` while holding the locks of both accounts.
    ///
    /// Fails with `AccountNotFound` before taking any lock if either id is
    /// unknown. Locks are released in reverse acquisition order on every exit
    /// path, including an error or panic inside `action`. Passing the same id
    /// twice takes its lock once.
    pub fn with_both_locked<R, F>(&self, a: &K, b: &K, action: F) -> Result<R, LedgerError>
    where
        F: FnOnce() -> Result<R, LedgerError>,
    {
        let first = self.lock_for(a)?;
        let second = self.lock_for(b)?;

        if Arc::ptr_eq(&first, &second) {
            let _guard = first.mutex.lock();
            return action();
        }

        let (low, high) = if first.sequence < second.sequence {
            (first, second)
        } else {
            (second, first)
        };

        let low_guard = low.mutex.lock();
        let high_guard = high.mutex.lock();

        let result = action();

        drop(high_guard);
        drop(low_guard);
        result
    }

    fn lock_for(&self, id: &K) -> Result<Arc<OrderedLock>, StorageError> {
        self.locks
            .get(id)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| StorageError::AccountNotFound(id.to_string()))
    }

    #[cfg(test)]
    fn sequence_of(&self, id: &K) -> Option<u64> {
        self.locks.get(id).map(|r| r.value().sequence)
    }
}

impl<K: AccountKey> Default for LockCoordinator<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;
    use std::hash::{Hash, Hasher};
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    /// Id whose hash is constant and whose `Ord` is reversed
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct HostileId(&'static str);

    impl Hash for HostileId {
        fn hash<H: Hasher>(&self, state: &mut H) {
            state.write_u64(0);
        }
    }

    impl PartialOrd for HostileId {
        fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
            Some(self.cmp(other))
        }
    }

    impl Ord for HostileId {
        fn cmp(&self, other: &Self) -> std::cmp::Ordering {
            other.0.cmp(self.0)
        }
    }

    impl fmt::Display for HostileId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    #[test]
    fn register_is_idempotent() {
        let coordinator = LockCoordinator::new();
        let id = AccountId::new("A");

        coordinator.register(&id);
        let sequence = coordinator.sequence_of(&id);
        coordinator.register(&id);

        assert_eq!(coordinator.sequence_of(&id), sequence);
        assert_eq!(coordinator.len(), 1);
    }

    #[test]
    fn sequences_follow_registration_order() {
        let coordinator = LockCoordinator::new();
        let (z, a) = (AccountId::new("Z"), AccountId::new("A"));
        coordinator.register(&z);
        coordinator.register(&a);

        assert!(coordinator.sequence_of(&z) < coordinator.sequence_of(&a));
    }

    #[test]
    fn unknown_account_fails_without_running_action() {
        let coordinator = LockCoordinator::new();
        let known = AccountId::new("A");
        coordinator.register(&known);

        let mut ran = false;
        let result = coordinator.with_both_locked(&known, &AccountId::new("missing"), || {
            ran = true;
            Ok(())
        });

        assert!(result.unwrap_err().is_account_not_found());
        assert!(!ran);
    }

    #[test]
    fn action_error_propagates_and_releases_locks() {
        let coordinator = LockCoordinator::new();
        let (a, b) = (AccountId::new("A"), AccountId::new("B"));
        coordinator.register(&a);
        coordinator.register(&b);

        let result: Result<(), _> = coordinator.with_both_locked(&a, &b, || {
            Err(LedgerError::NegativeTransferAmount)
        });
        assert_eq!(result, Err(LedgerError::NegativeTransferAmount));

        // Locks are free again
        assert_eq!(coordinator.with_both_locked(&b, &a, || Ok(7)), Ok(7));
    }

    #[test]
    fn same_account_twice_does_not_self_deadlock() {
        let coordinator = LockCoordinator::new();
        let a = AccountId::new("A");
        coordinator.register(&a);

        assert_eq!(coordinator.with_both_locked(&a, &a, || Ok("done")), Ok("done"));
    }

    #[test]
    fn provides_mutual_exclusion() {
        let coordinator = Arc::new(LockCoordinator::new());
        let (a, b) = (AccountId::new("A"), AccountId::new("B"));
        coordinator.register(&a);
        coordinator.register(&b);
        let counter = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let coordinator = Arc::clone(&coordinator);
                let counter = Arc::clone(&counter);
                let (x, y) = if i % 2 == 0 {
                    (a.clone(), b.clone())
                } else {
                    (b.clone(), a.clone())
                };
                thread::spawn(move || {
                    for _ in 0..500 {
                        coordinator
                            .with_both_locked(&x, &y, || {
                                // Deliberately split read and write
                                let value = counter.load(Ordering::Relaxed);
                                thread::yield_now();
                                counter.store(value + 1, Ordering::Relaxed);
                                Ok(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.load(Ordering::Relaxed), 2_000);
    }

    #[test]
    fn colliding_hashes_still_lock_in_consistent_order() {
        let coordinator = Arc::new(LockCoordinator::new());
        let ids = [HostileId("A"), HostileId("B"), HostileId("C")];
        for id in &ids {
            coordinator.register(id);
        }
        assert_eq!(coordinator.len(), 3);

        let handles: Vec<_> = (0..6)
            .map(|i| {
                let coordinator = Arc::clone(&coordinator);
                let x = ids[i % 3].clone();
                let y = ids[(i + 1) % 3].clone();
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        coordinator.with_both_locked(&x, &y, || Ok(())).unwrap();
                        coordinator.with_both_locked(&y, &x, || Ok(())).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
