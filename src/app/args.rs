use std::path::PathBuf;

use clap::Parser;

use super::error::AppError;
use crate::engine::StrategyKind;

/// Replay ledger command files and print the final balances
#[derive(Parser, Debug, Clone)]
#[command(name = "ledger")]
#[command(about = "Apply open/transfer commands from CSV files and print every balance")]
pub struct CliArgs {
    /// Transfer strategy: optimistic, ordered (pessimistic) or global (single-lock)
    #[arg(short, long, default_value_t = StrategyKind::default())]
    pub strategy: StrategyKind,

    /// Number of concurrent shards (defaults to one per input file)
    #[arg(long, value_parser = parse_shards)]
    pub shards: Option<usize>,

    /// Stop at the first rejected command instead of skipping it
    #[arg(long)]
    pub abort_on_error: bool,

    /// Command files with header `type,account,counterparty,amount,currency`
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
}

fn parse_shards(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(shards) => Ok(shards),
        Err(_) => Err(format!("expected a positive integer, got {value}")),
    }
}

/// Validated command-line configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    pub strategy: StrategyKind,
    pub shards: usize,
    pub abort_on_error: bool,
    pub inputs: Vec<PathBuf>,
}

impl CliConfig {
    /// Parse arguments, excluding the program name
    pub fn parse<I, T>(args: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let argv = std::iter::once("ledger".to_string()).chain(args.into_iter().map(Into::into));
        Ok(CliArgs::try_parse_from(argv)?.into())
    }
}

impl From<CliArgs> for CliConfig {
    fn from(args: CliArgs) -> Self {
        Self {
            strategy: args.strategy,
            shards: args.shards.unwrap_or(args.inputs.len()),
            abort_on_error: args.abort_on_error,
            inputs: args.inputs,
        }
    }
}
