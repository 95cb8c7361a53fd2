use std::fmt;
use std::sync::Arc;

use super::{InterleaveHook, StrategyKind, TransferLegs, TransferStrategy};
use crate::domain::{AccountId, AccountKey, Money};
use crate::engine::error::LedgerError;
use crate::engine::locks::LockCoordinator;
use crate::storage::AccountDirectory;

/// Pessimistic transfer holding both account locks, taken in canonical order.
///
/// The pair is updated atomically with respect to every other transfer that
/// goes through the same [`LockCoordinator`].
pub struct OrderedLockTransfer<K: AccountKey = AccountId> {
    coordinator: Arc<LockCoordinator<K>>,
    interleave: Option<InterleaveHook>,
}

impl<K: AccountKey> OrderedLockTransfer<K> {
    /// Strategy with its own private coordinator
    pub fn new() -> Self {
        Self::with_coordinator(Arc::new(LockCoordinator::new()))
    }

    /// Strategy sharing `coordinator` with other owners
    pub fn with_coordinator(coordinator: Arc<LockCoordinator<K>>) -> Self {
        Self {
            coordinator,
            interleave: None,
        }
    }

    /// Run `hook` between the debit and the credit, with both locks held
    pub fn with_interleave(
        mut self,
        hook: impl Fn() -> Result<(), LedgerError> + Send + Sync + 'static,
    ) -> Self {
        self.interleave = Some(Arc::new(hook));
        self
    }

    pub fn coordinator(&self) -> &Arc<LockCoordinator<K>> {
        &self.coordinator
    }
}

impl<K: AccountKey> Default for OrderedLockTransfer<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: AccountKey> fmt::Debug for OrderedLockTransfer<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedLockTransfer")
            .field("coordinator", &self.coordinator)
            .field("interleave", &self.interleave.is_some())
            .finish()
    }
}

impl<K: AccountKey> TransferStrategy<K> for OrderedLockTransfer<K> {
    fn transfer(
        &self,
        directory: &dyn AccountDirectory<K>,
        amount: &Money,
        origin: &K,
        destiny: &K,
    ) -> Result<(), LedgerError> {
        let legs = TransferLegs::resolve(directory, amount, origin, destiny)?;

        // Accounts placed in the directory directly get their lock on first use
        self.coordinator.register(origin);
        self.coordinator.register(destiny);

        self.coordinator
            .with_both_locked(origin, destiny, || {
                legs.debit_then_credit(amount, self.interleave.as_ref())
            })
    }

    fn on_register(&self, id: &K) {
        self.coordinator.register(id);
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::OrderedLock
    }
}
