pub mod args;
pub mod cli;
pub mod error;
pub mod logging;
pub mod runner;

// Re-export commonly used types
pub use args::{CliArgs, CliConfig};
pub use cli::{CliApp, SnapshotWriter};
pub use error::AppError;
pub use logging::init_tracing;
pub use runner::run_ledger;
