use std::fmt;
use std::hint;
use std::sync::Arc;

use tracing::{trace, warn};

use super::{InterleaveHook, PendingDebit, StrategyKind, TransferLegs, TransferStrategy};
use crate::domain::{AccountKey, DomainError, Money};
use crate::engine::error::LedgerError;
use crate::storage::AccountDirectory;

/// Attempts before an optimistic transfer gives up with `TransferFailed`
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10_000;

/// Lock-free transfer built on per-account compare-and-update.
///
/// Each attempt snapshots both balances, swaps the origin to its debited
/// value, then swaps the destiny to its credited value. If the destiny moved
/// in between, the debit is returned to the origin and the attempt restarts.
///
/// Unlike the lock-based strategies the pair is not updated atomically: a
/// reader may observe the debit before the credit (or before its rollback).
/// The observable total is therefore transiently lower, never higher, and
/// exact once the transfer returns.
pub struct OptimisticTransfer {
    max_attempts: u32,
    interleave: Option<InterleaveHook>,
}

impl OptimisticTransfer {
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interleave: None,
        }
    }

    /// Bound the retry loop; at least one attempt is always made
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Run `hook` after the origin is debited and before the destiny is
    /// swapped. Used to force interleavings and failures in tests.
    ///
    /// An error from the hook ends the transfer with that error once the
    /// debit has been returned.
    pub fn with_interleave(
        mut self,
        hook: impl Fn() -> Result<(), LedgerError> + Send + Sync + 'static,
    ) -> Self {
        self.interleave = Some(Arc::new(hook));
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for OptimisticTransfer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OptimisticTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptimisticTransfer")
            .field("max_attempts", &self.max_attempts)
            .field("interleave", &self.interleave.is_some())
            .finish()
    }
}

impl<K: AccountKey> TransferStrategy<K> for OptimisticTransfer {
    fn transfer(
        &self,
        directory: &dyn AccountDirectory<K>,
        amount: &Money,
        origin: &K,
        destiny: &K,
    ) -> Result<(), LedgerError> {
        let legs = TransferLegs::resolve(directory, amount, origin, destiny)?;

        // Swapping one cell twice would always see its own debit; only the
        // funds check applies
        if legs.is_self_transfer() {
            let balance = legs.origin.balance();
            if balance.subtract(amount)?.is_negative() {
                return Err(DomainError::InsufficientFunds.into());
            }
            return Ok(());
        }

        let debit = |current: &Money| {
            let next = current.subtract(amount)?;
            if next.is_negative() {
                return Err(DomainError::InsufficientFunds);
            }
            Ok(next)
        };

        for attempt in 1..=self.max_attempts {
            let origin_balance = legs.origin.balance();
            let destiny_balance = legs.destiny.balance();

            if !legs.origin.compare_and_update(&origin_balance, debit)? {
                trace!(%origin, attempt, "Origin balance moved, retrying");
                hint::spin_loop();
                continue;
            }

            let pending = PendingDebit::new(&legs.origin, amount);

            if let Some(hook) = &self.interleave {
                if let Err(err) = hook() {
                    pending.roll_back()?;
                    return Err(err);
                }
            }

            match legs
                .destiny
                .compare_and_update(&destiny_balance, |current| current.add(amount))
            {
                Ok(true) => {
                    pending.commit();
                    return Ok(());
                }
                Ok(false) => {
                    pending.roll_back()?;
                    trace!(%destiny, attempt, "Destiny balance moved, rolled back debit");
                    hint::spin_loop();
                }
                Err(err) => {
                    pending.roll_back()?;
                    return Err(err.into());
                }
            }
        }

        warn!(
            %origin,
            %destiny,
            %amount,
            attempts = self.max_attempts,
            "Optimistic transfer exhausted its retry budget"
        );
        Err(LedgerError::TransferFailed {
            attempts: self.max_attempts,
        })
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Optimistic
    }
}
