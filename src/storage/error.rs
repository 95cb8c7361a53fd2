use thiserror::Error;

/// Storage-level errors raised by the account directory
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account already registered: {0}")]
    AccountAlreadyRegistered(String),
}
