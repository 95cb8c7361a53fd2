use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::{Stream, StreamExt};
use tokio::fs::File;
use tokio_util::compat::TokioAsyncReadCompatExt;

use super::error::IoError;
use super::parse::RawCommandRecord;
use crate::domain::LedgerCommand;

/// Async stream of ledger commands from CSV input
pub struct CsvCommandStream {
    inner: Pin<Box<dyn Stream<Item = Result<LedgerCommand, IoError>> + Send>>,
}

impl CsvCommandStream {
    /// Create a new command stream from an async reader
    pub fn new<R>(reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let csv_reader = AsyncReaderBuilder::new()
            .trim(csv_async::Trim::All)
            .flexible(true)
            .create_deserializer(reader);

        let stream = csv_reader
            .into_deserialize::<RawCommandRecord>()
            .map(|result| result.map_err(IoError::from).and_then(RawCommandRecord::parse));

        Self {
            inner: Box::pin(stream),
        }
    }

    /// Open `path` asynchronously and stream its commands
    ///
    /// # Example
    /// ```rust,ignore
    /// let stream = CsvCommandStream::from_file("commands.csv").await?;
    /// ```
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let file = File::open(path.as_ref()).await?;
        Ok(Self::new(file.compat()))
    }
}

impl Stream for CsvCommandStream {
    type Item = Result<LedgerCommand, IoError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}
