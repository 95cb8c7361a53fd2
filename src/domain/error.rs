use thiserror::Error;

use super::money::Currency;

/// Domain-level errors raised by money arithmetic and account primitives
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch { expected: Currency, found: Currency },

    #[error("Insufficient funds")]
    InsufficientFunds,

    #[error("Amount must not be negative")]
    NegativeAmount,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    #[error("Arithmetic overflow")]
    Overflow,
}
