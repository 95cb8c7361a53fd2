use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{InterleaveHook, StrategyKind, TransferLegs, TransferStrategy};
use crate::domain::{AccountKey, Money};
use crate::engine::error::LedgerError;
use crate::storage::AccountDirectory;

/// Serialises every transfer behind one lock owned by this instance
#[derive(Default)]
pub struct GlobalLockTransfer {
    lock: Mutex<()>,
    interleave: Option<InterleaveHook>,
}

impl GlobalLockTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` between the debit and the credit, inside the global lock
    pub fn with_interleave(
        mut self,
        hook: impl Fn() -> Result<(), LedgerError> + Send + Sync + 'static,
    ) -> Self {
        self.interleave = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for GlobalLockTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalLockTransfer")
            .field("interleave", &self.interleave.is_some())
            .finish_non_exhaustive()
    }
}

impl<K: AccountKey> TransferStrategy<K> for GlobalLockTransfer {
    fn transfer(
        &self,
        directory: &dyn AccountDirectory<K>,
        amount: &Money,
        origin: &K,
        destiny: &K,
    ) -> Result<(), LedgerError> {
        let legs = TransferLegs::resolve(directory, amount, origin, destiny)?;

        let _guard = self.lock.lock();
        legs.debit_then_credit(amount, self.interleave.as_ref())
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::GlobalLock
    }
}
