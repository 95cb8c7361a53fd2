use std::io;
use std::path::Path;
use std::sync::Arc;

use tokio::io::AsyncWrite;
use tracing::{debug, info};

use super::args::CliConfig;
use super::error::AppError;
use crate::engine::Ledger;
use crate::io::{CsvCommandStream, IoError, write_snapshot};
use crate::streaming::{
    AbortOnError, ErrorPolicy, ProcessorResults, SkipErrors, StreamCombinator, StreamProcessor,
};

/// Apply every input file to a fresh ledger, then write the balance snapshot.
///
/// Files in the same shard are chained in argument order; shards run
/// concurrently against the shared ledger. The snapshot is written even when
/// processing aborts, in which case the result is `AppError::Aborted`.
pub async fn run_ledger<W>(config: &CliConfig, mut writer: W) -> Result<ProcessorResults, AppError>
where
    W: AsyncWrite + Unpin + Send,
{
    let ledger = Arc::new(Ledger::new(config.strategy));
    debug!(
        strategy = %config.strategy,
        shards = config.shards,
        inputs = config.inputs.len(),
        "Starting ledger run"
    );

    let results = if config.abort_on_error {
        process_inputs(&ledger, config, AbortOnError).await?
    } else {
        process_inputs(&ledger, config, SkipErrors).await?
    };

    info!(
        applied = results.commands_applied(),
        rejected = results.commands_rejected(),
        accounts = ledger.len(),
        "Ledger run finished"
    );

    write_snapshot(&*ledger, &mut writer).await?;

    if !results.all_succeeded() {
        return Err(AppError::Aborted {
            rejected: results.commands_rejected(),
        });
    }
    Ok(results)
}

async fn process_inputs<P>(
    ledger: &Arc<Ledger>,
    config: &CliConfig,
    policy: P,
) -> Result<ProcessorResults, AppError>
where
    P: ErrorPolicy + Clone + Send + 'static,
{
    let mut processor = StreamProcessor::new(Arc::clone(ledger), policy)
        .with_shards(config.shards)
        .with_stream_combinator(StreamCombinator::Chain);

    for input in &config.inputs {
        processor = processor.add_stream(open_input(input).await?);
    }

    Ok(processor.process().await)
}

async fn open_input(path: &Path) -> Result<CsvCommandStream, AppError> {
    CsvCommandStream::from_file(path).await.map_err(|err| match err {
        IoError::Io(e) if e.kind() == io::ErrorKind::NotFound => {
            AppError::FileNotFound(path.display().to_string())
        }
        other => AppError::CsvIo(other),
    })
}
