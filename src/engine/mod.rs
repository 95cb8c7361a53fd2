pub mod error;
pub mod ledger;
pub mod locks;
pub mod strategy;

// Re-export commonly used types
pub use error::LedgerError;
pub use ledger::Ledger;
pub use locks::LockCoordinator;
pub use strategy::{
    DEFAULT_MAX_ATTEMPTS, GlobalLockTransfer, InterleaveHook, OptimisticTransfer,
    OrderedLockTransfer, StrategyKind, TransferStrategy, UnknownStrategy,
};
