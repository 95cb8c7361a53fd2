use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};

use super::error::DomainError;
use super::money::{Currency, Money};

/// Bound for anything usable as an account identifier.
///
/// Only `Eq`/`Hash` are used for directory lookups. Nothing in the engine
/// relies on `Hash` or `Ord` for lock ordering, so identifiers with colliding
/// or constant hashes stay correct.
pub trait AccountKey:
    Clone + Eq + Hash + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static
{
}

impl<T> AccountKey for T where
    T: Clone + Eq + Hash + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static
{
}

/// Default string-backed account identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AccountId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// How an account's balance cell is synchronised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BalanceCellKind {
    /// Single mutex guarding reads and writes
    #[default]
    Exclusive,
    /// Readers share, writers exclude
    ReadWrite,
    /// Immutable value behind an atomically swapped pointer
    LockFree,
}

impl BalanceCellKind {
    pub const ALL: [BalanceCellKind; 3] = [
        BalanceCellKind::Exclusive,
        BalanceCellKind::ReadWrite,
        BalanceCellKind::LockFree,
    ];
}

#[derive(Debug)]
enum BalanceCell {
    Exclusive(Mutex<Money>),
    ReadWrite(RwLock<Money>),
    LockFree(ArcSwap<Money>),
}

impl BalanceCell {
    fn new(kind: BalanceCellKind, balance: Money) -> Self {
        match kind {
            BalanceCellKind::Exclusive => Self::Exclusive(Mutex::new(balance)),
            BalanceCellKind::ReadWrite => Self::ReadWrite(RwLock::new(balance)),
            BalanceCellKind::LockFree => Self::LockFree(ArcSwap::from_pointee(balance)),
        }
    }

    fn kind(&self) -> BalanceCellKind {
        match self {
            Self::Exclusive(_) => BalanceCellKind::Exclusive,
            Self::ReadWrite(_) => BalanceCellKind::ReadWrite,
            Self::LockFree(_) => BalanceCellKind::LockFree,
        }
    }

    fn read(&self) -> Money {
        match self {
            Self::Exclusive(cell) => *cell.lock(),
            Self::ReadWrite(cell) => *cell.read(),
            Self::LockFree(cell) => **cell.load(),
        }
    }

    /// Apply `f` to the balance as one atomic step.
    ///
    /// Lock-backed cells run `f` once under the write guard. The lock-free
    /// cell runs `f` on a copy and swaps the result in, re-running `f` on
    /// the fresh value whenever another writer got there first. `f` must
    /// leave the balance untouched when it fails.
    fn modify<R>(&self, mut f: impl FnMut(&mut Money) -> R) -> R {
        match self {
            Self::Exclusive(cell) => f(&mut cell.lock()),
            Self::ReadWrite(cell) => f(&mut cell.write()),
            Self::LockFree(cell) => loop {
                let current = cell.load_full();
                let mut next = *current;
                let outcome = f(&mut next);
                if next == *current {
                    return outcome;
                }

                let previous = cell.compare_and_swap(&current, Arc::new(next));
                if Arc::ptr_eq(&*previous, &current) {
                    return outcome;
                }
            },
        }
    }
}

/// Account holding a single-currency balance.
///
/// All primitives are atomic with respect to each other: each one runs as a
/// single write (under the cell's guard, or as one pointer swap), validates
/// before mutating, and leaves the balance untouched when it fails. The currency is fixed at
/// construction.
#[derive(Debug)]
pub struct Account<K = AccountId> {
    id: K,
    currency: Currency,
    cell: BalanceCell,
}

impl<K: AccountKey> Account<K> {
    /// Create an account backed by an exclusive (mutex) cell
    pub fn new(id: K, opening_balance: Money) -> Self {
        Self::with_cell(id, opening_balance, BalanceCellKind::default())
    }

    pub fn with_cell(id: K, opening_balance: Money, kind: BalanceCellKind) -> Self {
        Self {
            id,
            currency: opening_balance.currency(),
            cell: BalanceCell::new(kind, opening_balance),
        }
    }

    pub fn id(&self) -> &K {
        &self.id
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn cell_kind(&self) -> BalanceCellKind {
        self.cell.kind()
    }

    /// Consistent read of the current balance
    pub fn balance(&self) -> Money {
        self.cell.read()
    }

    /// Subtract `amount`, failing without mutation if the result would be negative.
    /// Returns the new balance.
    pub fn withdraw(&self, amount: &Money) -> Result<Money, DomainError> {
        if amount.is_negative() {
            return Err(DomainError::NegativeAmount);
        }
        self.ensure_currency(amount)?;

        self.cell.modify(|balance| {
            let next = balance.subtract(amount)?;
            if next.is_negative() {
                return Err(DomainError::InsufficientFunds);
            }
            *balance = next;
            Ok(next)
        })
    }

    /// Add `amount` unconditionally. Returns the new balance.
    pub fn deposit(&self, amount: &Money) -> Result<Money, DomainError> {
        self.ensure_currency(amount)?;

        self.cell.modify(|balance| {
            let next = balance.add(amount)?;
            *balance = next;
            Ok(next)
        })
    }

    /// Replace the balance with `update(expected)` only if it still equals `expected`.
    ///
    /// Returns `Ok(false)` without mutating when the balance has moved on.
    /// An error from `update`, or an update that changes the currency, also
    /// leaves the balance untouched.
    pub fn compare_and_update<F>(&self, expected: &Money, mut update: F) -> Result<bool, DomainError>
    where
        F: FnMut(&Money) -> Result<Money, DomainError>,
    {
        self.cell.modify(|balance| {
            if *balance != *expected {
                return Ok(false);
            }

            let next = update(expected)?;
            self.ensure_currency(&next)?;
            *balance = next;
            Ok(true)
        })
    }

    fn ensure_currency(&self, amount: &Money) -> Result<(), DomainError> {
        if amount.currency() != self.currency {
            return Err(DomainError::CurrencyMismatch {
                expected: self.currency,
                found: amount.currency(),
            });
        }
        Ok(())
    }
}
