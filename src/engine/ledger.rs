use std::sync::Arc;

use tracing::debug;

use super::error::LedgerError;
use super::strategy::{StrategyKind, TransferStrategy};
use crate::domain::{
    Account, AccountId, AccountKey, BalanceCellKind, Currency, LedgerCommand, Money,
};
use crate::storage::{AccountDirectory, ConcurrentAccountDirectory};

/// Owns the account directory and routes every transfer through one strategy.
///
/// The ledger holds no locks of its own; all serialisation lives in the
/// configured [`TransferStrategy`]. It is `Sync`, so a single instance is
/// meant to be shared (usually behind an `Arc`) by every worker.
pub struct Ledger<K = AccountId, D = ConcurrentAccountDirectory<K>>
where
    K: AccountKey,
    D: AccountDirectory<K>,
{
    directory: D,
    strategy: Box<dyn TransferStrategy<K>>,
    cell_kind: BalanceCellKind,
}

impl<K: AccountKey> Ledger<K> {
    /// Create a ledger with an empty in-memory directory
    pub fn new(kind: StrategyKind) -> Self {
        Self::with_strategy(kind.build())
    }

    pub fn with_strategy(strategy: Box<dyn TransferStrategy<K>>) -> Self {
        Self::with_directory(ConcurrentAccountDirectory::new(), strategy)
    }
}

impl<K, D> Ledger<K, D>
where
    K: AccountKey,
    D: AccountDirectory<K>,
{
    /// Create a ledger over an existing directory.
    ///
    /// Accounts already in `directory` are usable; lock-based strategies
    /// create their locks on first use.
    pub fn with_directory(directory: D, strategy: Box<dyn TransferStrategy<K>>) -> Self {
        Self {
            directory,
            strategy,
            cell_kind: BalanceCellKind::default(),
        }
    }

    /// Cell used by [`Ledger::open_account`] (defaults to `Exclusive`)
    pub fn with_cell_kind(mut self, kind: BalanceCellKind) -> Self {
        self.cell_kind = kind;
        self
    }

    /// Add a new account to the directory.
    ///
    /// Fails with `NegativeOpeningBalance` or `AccountAlreadyRegistered`,
    /// leaving the directory unchanged.
    pub fn register_account(&self, account: Account<K>) -> Result<Arc<Account<K>>, LedgerError> {
        let opening = account.balance();
        if opening.is_negative() {
            return Err(LedgerError::NegativeOpeningBalance);
        }

        // Strategy state (e.g. the account lock) must exist before the
        // account becomes visible to transfers
        self.strategy.on_register(account.id());
        let handle = self.directory.register(account)?;

        debug!(
            account = %handle.id(),
            balance = %opening,
            strategy = %self.strategy.kind(),
            "Registered account"
        );
        Ok(handle)
    }

    /// Register an account with this ledger's default cell kind
    pub fn open_account(&self, id: K, opening_balance: Money) -> Result<Arc<Account<K>>, LedgerError> {
        self.register_account(Account::with_cell(id, opening_balance, self.cell_kind))
    }

    pub fn get_balance(&self, id: &K) -> Result<Money, LedgerError> {
        Ok(self.directory.require(id)?.balance())
    }

    /// Move `amount` from `origin` to `destiny`, propagating strategy failures unchanged
    pub fn transfer(&self, origin: &K, destiny: &K, amount: &Money) -> Result<(), LedgerError> {
        debug!(
            %origin,
            %destiny,
            %amount,
            strategy = %self.strategy.kind(),
            "Processing transfer"
        );

        self.strategy
            .transfer(&self.directory, amount, origin, destiny)
    }

    /// Sum of every balance held in `currency`.
    ///
    /// Reads accounts one at a time, so it is exact only while no transfer
    /// is in flight.
    pub fn total_balance(&self, currency: Currency) -> Result<Money, LedgerError> {
        self.directory
            .accounts()
            .iter()
            .map(|account| account.balance())
            .filter(|balance| balance.currency() == currency)
            .try_fold(Money::zero(currency), |total, balance| total.add(&balance))
            .map_err(LedgerError::from)
    }

    /// Every account and its balance, ordered by id
    pub fn balances(&self) -> Vec<(K, Money)> {
        let mut balances: Vec<_> = self
            .directory
            .accounts()
            .iter()
            .map(|account| (account.id().clone(), account.balance()))
            .collect();
        balances.sort_by(|a, b| a.0.cmp(&b.0));
        balances
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn len(&self) -> usize {
        self.directory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directory.is_empty()
    }
}

impl<D: AccountDirectory<AccountId>> Ledger<AccountId, D> {
    /// Execute one command from an input stream
    pub fn apply(&self, command: LedgerCommand) -> Result<(), LedgerError> {
        match command {
            LedgerCommand::Open { account, balance } => {
                self.open_account(account, balance).map(|_| ())
            }
            LedgerCommand::Transfer {
                origin,
                destiny,
                amount,
            } => self.transfer(&origin, &destiny, &amount),
        }
    }
}

impl<K: AccountKey> Default for Ledger<K> {
    fn default() -> Self {
        Self::new(StrategyKind::default())
    }
}
