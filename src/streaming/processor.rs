use std::pin::Pin;
use std::sync::Arc;

use futures::stream;
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

use super::error::ErrorPolicy;
use crate::domain::{AccountId, LedgerCommand};
use crate::engine::Ledger;
use crate::io::IoError;
use crate::storage::AccountDirectory;

/// Type alias for a boxed command stream
type CommandStream = Pin<Box<dyn Stream<Item = Result<LedgerCommand, IoError>> + Send>>;

/// Primary API for feeding command streams into a shared ledger
///
/// Supports single-stream and multi-stream topologies with configurable
/// parallelism, sharding, and stream combining strategies. Every shard
/// applies its commands to the same [`Ledger`], so transfers from different
/// shards race against each other exactly as concurrent callers would.
pub struct StreamProcessor<D, P>
where
    D: AccountDirectory<AccountId> + 'static,
    P: ErrorPolicy + Clone + Send + 'static,
{
    ledger: Arc<Ledger<AccountId, D>>,
    error_policy: P,
    num_shards: usize,
    streams: Vec<CommandStream>,
    shard_assignment: ShardAssignment,
    stream_combinator: StreamCombinator,
}

/// How to assign streams to shards
pub enum ShardAssignment {
    /// Distribute streams round-robin across shards (default)
    /// Stream 0→Shard 0, Stream 1→Shard 1, ..., Stream N→Shard 0, ...
    RoundRobin,

    /// Assign streams sequentially to shards
    /// First N/S streams→Shard 0, next N/S→Shard 1, ...
    Sequential,

    /// Custom assignment function: stream_index -> shard_index
    Custom(Box<dyn Fn(usize) -> usize + Send + Sync>),
}

/// How to combine multiple streams within a single shard
#[derive(Debug, Clone, Copy)]
pub enum StreamCombinator {
    /// Merge streams concurrently (interleaved) - DEFAULT
    Merge,

    /// Chain streams sequentially (one after another)
    /// Keeps an `open` in one file ahead of transfers later in the same shard
    Chain,
}

impl<D, P> StreamProcessor<D, P>
where
    D: AccountDirectory<AccountId> + 'static,
    P: ErrorPolicy + Clone + Send + 'static,
{
    /// Create a new stream processor over a shared ledger
    ///
    /// # Example
    /// ```rust,ignore
    /// let ledger = Arc::new(Ledger::new(StrategyKind::OrderedLock));
    ///
    /// let processor = StreamProcessor::new(ledger, SkipErrors);
    /// ```
    pub fn new(ledger: Arc<Ledger<AccountId, D>>, error_policy: P) -> Self {
        Self {
            ledger,
            error_policy,
            num_shards: 1,
            streams: Vec::new(),
            shard_assignment: ShardAssignment::RoundRobin,
            stream_combinator: StreamCombinator::Merge,
        }
    }

    /// Set number of parallel shards (defaults to 1)
    ///
    /// Each shard runs in its own tokio task.
    pub fn with_shards(mut self, num: usize) -> Self {
        self.num_shards = num.max(1);
        self
    }

    /// Set how to assign streams to shards (defaults to RoundRobin)
    pub fn with_shard_assignment(mut self, assignment: ShardAssignment) -> Self {
        self.shard_assignment = assignment;
        self
    }

    /// Set how to combine multiple streams within a shard (defaults to Merge)
    pub fn with_stream_combinator(mut self, combinator: StreamCombinator) -> Self {
        self.stream_combinator = combinator;
        self
    }

    /// Add a stream to process (fluent interface)
    ///
    /// # Example
    /// ```rust,ignore
    /// StreamProcessor::new(ledger, SkipErrors)
    ///     .add_stream(csv_stream_1)
    ///     .add_stream(csv_stream_2)
    ///     .process()
    ///     .await;
    /// ```
    pub fn add_stream<S>(mut self, stream: S) -> Self
    where
        S: Stream<Item = Result<LedgerCommand, IoError>> + Send + 'static,
    {
        self.streams.push(Box::pin(stream));
        self
    }

    /// Get reference to the shared ledger
    pub fn ledger(&self) -> &Arc<Ledger<AccountId, D>> {
        &self.ledger
    }

    /// Process all streams across parallel shards
    ///
    /// 1. Assigns streams to shards based on shard assignment strategy
    /// 2. Combines streams within each shard based on stream combining strategy
    /// 3. Spawns one task per shard
    /// 4. Each task applies its combined stream to the ledger
    pub async fn process(self) -> ProcessorResults {
        let num_streams = self.streams.len();

        if num_streams == 0 {
            return ProcessorResults {
                shard_results: vec![],
                total_streams: 0,
            };
        }

        let StreamProcessor {
            ledger,
            error_policy,
            num_shards,
            streams,
            shard_assignment,
            stream_combinator,
        } = self;

        // Assign streams to shards
        let mut shards: Vec<Vec<_>> = (0..num_shards).map(|_| Vec::new()).collect();

        for (stream_idx, stream) in streams.into_iter().enumerate() {
            let shard_idx = match &shard_assignment {
                ShardAssignment::RoundRobin => stream_idx % num_shards,
                ShardAssignment::Sequential => {
                    let chunk_size = num_streams.div_ceil(num_shards);
                    (stream_idx / chunk_size).min(num_shards - 1)
                }
                ShardAssignment::Custom(f) => f(stream_idx) % num_shards,
            };

            shards[shard_idx].push(stream);
        }

        // Spawn one task per shard
        let handles: Vec<_> = shards
            .into_iter()
            .enumerate()
            .map(|(shard_id, shard_streams)| {
                let ledger = Arc::clone(&ledger);
                let policy = error_policy.clone();
                let combinator = stream_combinator;

                let handle = tokio::spawn(async move {
                    let stream_count = shard_streams.len();
                    if stream_count == 0 {
                        return ShardResult::empty(shard_id);
                    }

                    let combined = match combinator {
                        StreamCombinator::Merge => Box::pin(stream::select_all(shard_streams))
                            as Pin<Box<dyn Stream<Item = _> + Send>>,
                        StreamCombinator::Chain => Box::pin(stream::iter(shard_streams).flatten())
                            as Pin<Box<dyn Stream<Item = _> + Send>>,
                    };

                    let mut result = Self::process_shard_stream(combined, &ledger, &policy).await;
                    result.shard_id = shard_id;
                    result.streams_processed = stream_count;
                    result
                });

                (shard_id, handle)
            })
            .collect();

        let mut shard_results = Vec::with_capacity(handles.len());
        for (shard_id, handle) in handles {
            let result = handle.await.unwrap_or_else(|err| {
                warn!(shard_id, error = %err, "Shard task did not complete");
                ShardResult {
                    success: false,
                    ..ShardResult::empty(shard_id)
                }
            });
            shard_results.push(result);
        }

        ProcessorResults {
            shard_results,
            total_streams: num_streams,
        }
    }

    /// Apply a single shard's stream, stopping early if the policy says so
    async fn process_shard_stream<S>(
        mut stream: S,
        ledger: &Ledger<AccountId, D>,
        policy: &P,
    ) -> ShardResult
    where
        S: Stream<Item = Result<LedgerCommand, IoError>> + Unpin,
    {
        let mut result = ShardResult::empty(0);

        while let Some(item) = stream.next().await {
            match item {
                Ok(command) => match ledger.apply(command) {
                    Ok(()) => result.commands_applied += 1,
                    Err(e) => {
                        result.commands_rejected += 1;
                        if !policy.handle_ledger_error(e) {
                            result.success = false;
                            break;
                        }
                    }
                },
                Err(e) => {
                    result.commands_rejected += 1;
                    if !policy.handle_io_error(e) {
                        result.success = false;
                        break;
                    }
                }
            }
        }

        debug!(
            applied = result.commands_applied,
            rejected = result.commands_rejected,
            success = result.success,
            "Shard stream finished"
        );
        result
    }
}

/// Results from processing streams across multiple shards
#[derive(Debug)]
pub struct ProcessorResults {
    pub shard_results: Vec<ShardResult>,
    pub total_streams: usize,
}

/// Result from processing a single shard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardResult {
    pub shard_id: usize,
    pub streams_processed: usize,
    pub commands_applied: usize,
    pub commands_rejected: usize,
    pub success: bool,
}

impl ShardResult {
    fn empty(shard_id: usize) -> Self {
        Self {
            shard_id,
            streams_processed: 0,
            commands_applied: 0,
            commands_rejected: 0,
            success: true,
        }
    }
}

impl ProcessorResults {
    /// Check if all shards processed successfully
    pub fn all_succeeded(&self) -> bool {
        self.shard_results.iter().all(|r| r.success)
    }

    /// Get total number of shards
    pub fn total_shards(&self) -> usize {
        self.shard_results.len()
    }

    /// Commands applied across every shard
    pub fn commands_applied(&self) -> usize {
        self.shard_results.iter().map(|r| r.commands_applied).sum()
    }

    /// Commands rejected (parse or ledger failures) across every shard
    pub fn commands_rejected(&self) -> usize {
        self.shard_results.iter().map(|r| r.commands_rejected).sum()
    }
}
