use tracing::warn;

use crate::engine::LedgerError;
use crate::io::IoError;

/// Policy for handling errors during stream processing
pub trait ErrorPolicy: Send + Sync {
    /// Handle an IO error (CSV parsing, reading)
    /// Return true to continue processing, false to abort
    fn handle_io_error(&self, error: IoError) -> bool;

    /// Handle a ledger error (rejected registration or transfer)
    /// Return true to continue processing, false to abort
    fn handle_ledger_error(&self, error: LedgerError) -> bool;
}

/// Skip errors and continue processing, logging each one
#[derive(Debug, Clone, Copy)]
pub struct SkipErrors;

impl ErrorPolicy for SkipErrors {
    fn handle_io_error(&self, error: IoError) -> bool {
        warn!(%error, "IO error (skipping)");
        true
    }

    fn handle_ledger_error(&self, error: LedgerError) -> bool {
        warn!(%error, "Ledger error (skipping)");
        true
    }
}

/// Abort on first error
#[derive(Debug, Clone, Copy)]
pub struct AbortOnError;

impl ErrorPolicy for AbortOnError {
    fn handle_io_error(&self, error: IoError) -> bool {
        warn!(%error, "IO error (aborting)");
        false
    }

    fn handle_ledger_error(&self, error: LedgerError) -> bool {
        warn!(%error, "Ledger error (aborting)");
        false
    }
}

/// Silent error policy - skip errors without logging
#[derive(Debug, Clone, Copy)]
pub struct SilentSkip;

impl ErrorPolicy for SilentSkip {
    fn handle_io_error(&self, _error: IoError) -> bool {
        true
    }

    fn handle_ledger_error(&self, _error: LedgerError) -> bool {
        true
    }
}
