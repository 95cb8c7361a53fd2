pub mod global;
pub mod optimistic;
pub mod ordered;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error};

use super::error::LedgerError;
use crate::domain::{Account, AccountKey, DomainError, Money};
use crate::storage::AccountDirectory;

pub use global::GlobalLockTransfer;
pub use optimistic::{DEFAULT_MAX_ATTEMPTS, OptimisticTransfer};
pub use ordered::OrderedLockTransfer;

/// Algorithm moving money between two accounts of a directory.
///
/// Every implementation honours the same contract:
/// - `AccountNotFound` if either id is absent
/// - `NegativeTransferAmount` if `amount < 0`
/// - `CurrencyMismatch` if `amount` is not in both accounts' currency
/// - `InsufficientFunds` if the origin cannot cover `amount`
///
/// On success the origin is debited and the destiny credited by `amount`.
/// On failure no balance has a net change.
pub trait TransferStrategy<K: AccountKey>: Send + Sync {
    fn transfer(
        &self,
        directory: &dyn AccountDirectory<K>,
        amount: &Money,
        origin: &K,
        destiny: &K,
    ) -> Result<(), LedgerError>;

    /// Called before an account enters the directory
    fn on_register(&self, _id: &K) {}

    fn kind(&self) -> StrategyKind;
}

/// Constructor-time choice of transfer algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StrategyKind {
    /// Lock-free compare-and-update with bounded retry
    Optimistic,
    /// Per-account locks taken in canonical order
    #[default]
    OrderedLock,
    /// One process-wide lock around every transfer
    GlobalLock,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Optimistic,
        StrategyKind::OrderedLock,
        StrategyKind::GlobalLock,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Optimistic => "optimistic",
            Self::OrderedLock => "ordered",
            Self::GlobalLock => "global",
        }
    }

    /// Build a fresh strategy instance with default settings
    pub fn build<K: AccountKey>(self) -> Box<dyn TransferStrategy<K>> {
        match self {
            Self::Optimistic => Box::new(OptimisticTransfer::new()),
            Self::OrderedLock => Box::new(OrderedLockTransfer::new()),
            Self::GlobalLock => Box::new(GlobalLockTransfer::new()),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown transfer strategy: {0} (expected optimistic, ordered or global)")]
pub struct UnknownStrategy(pub String);

impl FromStr for StrategyKind {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "optimistic" => Ok(Self::Optimistic),
            "ordered" | "pessimistic" => Ok(Self::OrderedLock),
            "global" | "single-lock" => Ok(Self::GlobalLock),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

/// The two accounts of a transfer that passed validation
pub(crate) struct TransferLegs<K: AccountKey> {
    pub origin: Arc<Account<K>>,
    pub destiny: Arc<Account<K>>,
}

impl<K: AccountKey> TransferLegs<K> {
    /// Look up both accounts and check amount sign and currencies, in that order
    pub fn resolve(
        directory: &dyn AccountDirectory<K>,
        amount: &Money,
        origin: &K,
        destiny: &K,
    ) -> Result<Self, LedgerError> {
        let origin = directory.require(origin)?;
        let destiny = directory.require(destiny)?;

        if amount.is_negative() {
            return Err(LedgerError::NegativeTransferAmount);
        }

        for account in [&origin, &destiny] {
            if account.currency() != amount.currency() {
                return Err(DomainError::CurrencyMismatch {
                    expected: account.currency(),
                    found: amount.currency(),
                }
                .into());
            }
        }

        Ok(Self { origin, destiny })
    }

    pub fn is_self_transfer(&self) -> bool {
        Arc::ptr_eq(&self.origin, &self.destiny)
    }

    /// Withdraw, run the interleave hook, then deposit. Callers hold
    /// whatever lock serialises the pair.
    ///
    /// The withdraw validates before mutating. Once it has succeeded, any
    /// later failure (hook error, hook panic, failed credit) returns the
    /// debit to the origin so the transfer has no net effect.
    pub fn debit_then_credit(
        &self,
        amount: &Money,
        interleave: Option<&InterleaveHook>,
    ) -> Result<(), LedgerError> {
        self.origin.withdraw(amount)?;
        let pending = PendingDebit::new(&self.origin, amount);

        if let Some(hook) = interleave {
            if let Err(err) = hook() {
                pending.roll_back()?;
                return Err(err);
            }
        }

        match self.destiny.deposit(amount) {
            Ok(_) => {
                pending.commit();
                Ok(())
            }
            Err(err) => {
                pending.roll_back()?;
                Err(err.into())
            }
        }
    }
}

/// Callback run after the origin is debited and before the destiny is
/// credited. Returning an error or panicking aborts the transfer.
pub type InterleaveHook = Arc<dyn Fn() -> Result<(), LedgerError> + Send + Sync>;

/// A debit already taken from `origin`.
///
/// Dropping it without [`PendingDebit::commit`] returns the money, which
/// covers early returns and unwinding alike.
pub(crate) struct PendingDebit<'a, K: AccountKey> {
    origin: &'a Account<K>,
    amount: &'a Money,
    settled: bool,
}

impl<'a, K: AccountKey> PendingDebit<'a, K> {
    pub fn new(origin: &'a Account<K>, amount: &'a Money) -> Self {
        Self {
            origin,
            amount,
            settled: false,
        }
    }

    /// The credit landed; keep the debit
    pub fn commit(mut self) {
        self.settled = true;
    }

    /// Return the debit now, reporting a restore that failed
    pub fn roll_back(mut self) -> Result<(), LedgerError> {
        self.settled = true;
        compensate(self.origin, self.amount)
    }
}

impl<K: AccountKey> Drop for PendingDebit<'_, K> {
    fn drop(&mut self) {
        if !self.settled {
            debug!(account = %self.origin.id(), amount = %self.amount, "Returning debit of an abandoned transfer");
            // Failures are logged by compensate; there is no caller left to tell
            let _ = compensate(self.origin, self.amount);
        }
    }
}

/// Re-credit an origin whose debit could not be matched by a credit
pub(crate) fn compensate<K: AccountKey>(origin: &Account<K>, amount: &Money) -> Result<(), LedgerError> {
    origin.deposit(amount).map(|_| ()).map_err(|reason| {
        error!(account = %origin.id(), %amount, error = %reason, "Failed to roll back debit");
        LedgerError::RollbackFailed {
            account: origin.id().to_string(),
            amount: amount.to_string(),
            reason,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountId, Currency};
    use crate::storage::ConcurrentAccountDirectory;

    fn usd(units: i64) -> Money {
        Money::from_major(units, Currency::USD)
    }

    fn directory() -> ConcurrentAccountDirectory {
        let directory = ConcurrentAccountDirectory::new();
        directory
            .register(Account::new(AccountId::new("A"), usd(100)))
            .unwrap();
        directory
            .register(Account::new(AccountId::new("B"), usd(100)))
            .unwrap();
        directory
    }

    #[test]
    fn strategy_kind_parses_names_and_aliases() {
        assert_eq!("optimistic".parse(), Ok(StrategyKind::Optimistic));
        assert_eq!("ORDERED".parse(), Ok(StrategyKind::OrderedLock));
        assert_eq!("pessimistic".parse(), Ok(StrategyKind::OrderedLock));
        assert_eq!("global".parse(), Ok(StrategyKind::GlobalLock));
        assert_eq!(" single-lock ".parse(), Ok(StrategyKind::GlobalLock));
        assert_eq!(
            "fastest".parse::<StrategyKind>(),
            Err(UnknownStrategy("fastest".to_string()))
        );
    }

    #[test]
    fn strategy_kind_display_round_trips() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.to_string().parse(), Ok(kind));
        }
    }

    #[test]
    fn default_kind_is_ordered_lock() {
        assert_eq!(StrategyKind::default(), StrategyKind::OrderedLock);
    }

    #[test]
    fn build_produces_matching_kind() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.build::<AccountId>().kind(), kind);
        }
    }

    #[test]
    fn resolve_reports_missing_accounts_first() {
        let directory = directory();

        let err = TransferLegs::resolve(
            &directory,
            &usd(-1),
            &AccountId::new("A"),
            &AccountId::new("missing"),
        )
        .err()
        .unwrap();

        assert!(err.is_account_not_found());
    }

    #[test]
    fn resolve_rejects_negative_amount() {
        let directory = directory();

        let err = TransferLegs::resolve(
            &directory,
            &usd(-1),
            &AccountId::new("A"),
            &AccountId::new("B"),
        )
        .err()
        .unwrap();

        assert_eq!(err, LedgerError::NegativeTransferAmount);
    }

    #[test]
    fn resolve_rejects_foreign_currency() {
        let directory = directory();

        let err = TransferLegs::resolve(
            &directory,
            &Money::from_major(10, Currency::EUR),
            &AccountId::new("A"),
            &AccountId::new("B"),
        )
        .err()
        .unwrap();

        assert!(err.is_currency_mismatch());
    }

    #[test]
    fn debit_then_credit_moves_money() {
        let directory = directory();
        let legs = TransferLegs::resolve(
            &directory,
            &usd(40),
            &AccountId::new("A"),
            &AccountId::new("B"),
        )
        .unwrap();

        legs.debit_then_credit(&usd(40), None).unwrap();

        assert_eq!(legs.origin.balance(), usd(60));
        assert_eq!(legs.destiny.balance(), usd(140));
        assert!(!legs.is_self_transfer());
    }

    #[test]
    fn debit_then_credit_insufficient_funds_changes_nothing() {
        let directory = directory();
        let legs = TransferLegs::resolve(
            &directory,
            &usd(101),
            &AccountId::new("A"),
            &AccountId::new("B"),
        )
        .unwrap();

        let err = legs.debit_then_credit(&usd(101), None).unwrap_err();

        assert!(err.is_insufficient_funds());
        assert_eq!(legs.origin.balance(), usd(100));
        assert_eq!(legs.destiny.balance(), usd(100));
    }

    #[test]
    fn debit_then_credit_restores_origin_when_credit_overflows() {
        let directory = ConcurrentAccountDirectory::new();
        directory
            .register(Account::new(AccountId::new("A"), usd(100)))
            .unwrap();
        directory
            .register(Account::new(
                AccountId::new("B"),
                Money::new(rust_decimal::Decimal::MAX, Currency::USD),
            ))
            .unwrap();
        let legs = TransferLegs::resolve(
            &directory,
            &usd(1),
            &AccountId::new("A"),
            &AccountId::new("B"),
        )
        .unwrap();

        let err = legs.debit_then_credit(&usd(1), None).unwrap_err();

        assert_eq!(err, LedgerError::Domain(DomainError::Overflow));
        assert_eq!(legs.origin.balance(), usd(100));
    }

    #[test]
    fn debit_then_credit_restores_origin_when_hook_fails() {
        let directory = directory();
        let legs = TransferLegs::resolve(
            &directory,
            &usd(30),
            &AccountId::new("A"),
            &AccountId::new("B"),
        )
        .unwrap();
        let hook: InterleaveHook = Arc::new(|| -> Result<(), LedgerError> {
            Err(LedgerError::Interrupted("injected".to_string()))
        });

        let err = legs.debit_then_credit(&usd(30), Some(&hook)).unwrap_err();

        assert_eq!(err, LedgerError::Interrupted("injected".to_string()));
        assert_eq!(legs.origin.balance(), usd(100));
        assert_eq!(legs.destiny.balance(), usd(100));
    }

    #[test]
    fn debit_then_credit_restores_origin_when_hook_panics() {
        let directory = directory();
        let legs = TransferLegs::resolve(
            &directory,
            &usd(30),
            &AccountId::new("A"),
            &AccountId::new("B"),
        )
        .unwrap();
        let hook: InterleaveHook = Arc::new(|| -> Result<(), LedgerError> { panic!("hook blew up") });

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            legs.debit_then_credit(&usd(30), Some(&hook))
        }));

        assert!(outcome.is_err());
        assert_eq!(legs.origin.balance(), usd(100));
        assert_eq!(legs.destiny.balance(), usd(100));
    }

    #[test]
    fn failed_restore_is_reported() {
        let directory = directory();
        let legs = TransferLegs::resolve(
            &directory,
            &usd(1),
            &AccountId::new("A"),
            &AccountId::new("B"),
        )
        .unwrap();
        // Fill the origin up to the limit so returning the debit overflows
        let origin = Arc::clone(&legs.origin);
        let hook: InterleaveHook = Arc::new(move || -> Result<(), LedgerError> {
            let headroom = rust_decimal::Decimal::MAX - origin.balance().amount();
            origin.deposit(&Money::new(headroom, Currency::USD))?;
            Err(LedgerError::Interrupted("injected".to_string()))
        });

        let err = legs.debit_then_credit(&usd(1), Some(&hook)).unwrap_err();

        assert!(matches!(
            err,
            LedgerError::RollbackFailed { ref account, reason: DomainError::Overflow, .. } if account == "A"
        ));
        assert_eq!(legs.destiny.balance(), usd(100));
    }

    #[test]
    fn compensate_reports_overflow() {
        let account = Account::new(
            AccountId::new("A"),
            Money::new(rust_decimal::Decimal::MAX, Currency::USD),
        );

        let err = compensate(&account, &usd(1)).unwrap_err();

        assert!(matches!(err, LedgerError::RollbackFailed { reason: DomainError::Overflow, .. }));
        assert_eq!(account.balance().amount(), rust_decimal::Decimal::MAX);
    }
}
