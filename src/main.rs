use clap::Parser;
use ledger::prelude::*;
use tokio::io::AsyncWriteExt;

#[tokio::main]
async fn main() {
    init_tracing();

    // Usage errors and --help exit here, before the runner takes over stdout
    let config = CliConfig::from(CliArgs::parse());
    CliApp::new("ledger")
        .run(|stdout| run(stdout, config))
        .await
}

/// Process every input file and write balances to stdout
async fn run(mut stdout: SnapshotWriter, config: CliConfig) -> Result<(), AppError> {
    let outcome = run_ledger(&config, &mut stdout).await;
    stdout.flush().await?;

    outcome.map(|_| ())
}
