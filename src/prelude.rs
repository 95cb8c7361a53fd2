//! Prelude module for convenient imports
//!
//! Import everything you need with: `use ledger::prelude::*;`

// Domain types
pub use crate::domain::{
    Account, AccountId, AccountKey, BalanceCellKind, Currency, DomainError, LedgerCommand, Money,
};

// Storage types
pub use crate::storage::{AccountDirectory, ConcurrentAccountDirectory, StorageError};

// Engine types
pub use crate::engine::{
    GlobalLockTransfer, InterleaveHook, Ledger, LedgerError, LockCoordinator, OptimisticTransfer,
    OrderedLockTransfer, StrategyKind, TransferStrategy,
};

// IO types
pub use crate::io::{CsvCommandStream, IoError, RawCommandRecord, write_snapshot};

// Streaming types
pub use crate::streaming::{
    AbortOnError, ErrorPolicy, ProcessorResults, ShardAssignment, SilentSkip, SkipErrors,
    StreamCombinator, StreamProcessor,
};

// App types
pub use crate::app::{AppError, CliApp, CliArgs, CliConfig, SnapshotWriter, init_tracing, run_ledger};
