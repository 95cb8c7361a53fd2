use std::io;
use thiserror::Error;

use crate::domain::DomainError;
use crate::engine::LedgerError;
use crate::io::IoError;

/// Top-level application errors unifying all layer errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV IO error: {0}")]
    CsvIo(#[from] IoError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("{0}")]
    Cli(#[from] clap::Error),

    #[error("Processing aborted after {rejected} rejected command(s)")]
    Aborted { rejected: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;

    #[test]
    fn error_display_formats_correctly() {
        assert_eq!(
            AppError::FileNotFound("input.csv".to_string()).to_string(),
            "File not found: input.csv"
        );
        assert_eq!(
            AppError::Aborted { rejected: 1 }.to_string(),
            "Processing aborted after 1 rejected command(s)"
        );
    }

    #[test]
    fn io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let app_err = AppError::from(io_err);

        match app_err {
            AppError::Io(_) => {}
            _ => panic!("Expected Io error variant"),
        }
    }

    #[test]
    fn domain_error_conversion() {
        let app_err = AppError::from(DomainError::InvalidCurrency("X".to_string()));

        match app_err {
            AppError::Domain(DomainError::InvalidCurrency(_)) => {}
            _ => panic!("Expected Domain error variant"),
        }
    }

    #[test]
    fn ledger_error_conversion() {
        let ledger_err = LedgerError::from(StorageError::AccountNotFound("A".to_string()));
        let app_err = AppError::from(ledger_err);

        match app_err {
            AppError::Ledger(err) => assert!(err.is_account_not_found()),
            _ => panic!("Expected Ledger error variant"),
        }
    }
}
