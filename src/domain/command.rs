use super::account::AccountId;
use super::money::Money;

/// A single instruction for the ledger, as produced by the CSV driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCommand {
    /// Register an account with its opening balance
    Open { account: AccountId, balance: Money },
    /// Move `amount` from `origin` to `destiny`
    Transfer {
        origin: AccountId,
        destiny: AccountId,
        amount: Money,
    },
}

impl LedgerCommand {
    /// The account the command is primarily about (the origin for transfers)
    pub fn account(&self) -> &AccountId {
        match self {
            Self::Open { account, .. } => account,
            Self::Transfer { origin, .. } => origin,
        }
    }
}
