pub mod account;
pub mod command;
pub mod error;
pub mod money;

// Re-export commonly used types
pub use account::{Account, AccountId, AccountKey, BalanceCellKind};
pub use command::LedgerCommand;
pub use error::DomainError;
pub use money::{Currency, Money};
