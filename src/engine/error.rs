use thiserror::Error;

use crate::domain::DomainError;
use crate::storage::StorageError;

/// Errors surfaced to callers of the ledger and the transfer strategies
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Transfer amount must not be negative")]
    NegativeTransferAmount,

    #[error("Cannot register an account with a negative opening balance")]
    NegativeOpeningBalance,

    #[error("Transfer failed after {attempts} attempts under contention")]
    TransferFailed { attempts: u32 },

    /// Raised by an interleave hook between the debit and the credit
    #[error("Transfer interrupted: {0}")]
    Interrupted(String),

    /// A debit could not be returned to its origin; the ledger total is off by the amount
    #[error("Failed to restore {amount} to account {account}: {reason}")]
    RollbackFailed {
        account: String,
        amount: String,
        reason: DomainError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl LedgerError {
    pub fn is_account_not_found(&self) -> bool {
        matches!(self, Self::Storage(StorageError::AccountNotFound(_)))
    }

    pub fn is_already_registered(&self) -> bool {
        matches!(self, Self::Storage(StorageError::AccountAlreadyRegistered(_)))
    }

    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self, Self::Domain(DomainError::InsufficientFunds))
    }

    pub fn is_currency_mismatch(&self) -> bool {
        matches!(self, Self::Domain(DomainError::CurrencyMismatch { .. }))
    }
}
