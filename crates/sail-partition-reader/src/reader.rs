use std::fmt;
use std::time::Instant;

use log::{debug, warn};
use sail_common::config::StreamConfig;

use crate::cancel::CancellationHandle;
use crate::error::{PartitionReaderError, PartitionReaderResult, SourceError};
use crate::iter::PartitionRowIterator;
use crate::metrics::ReaderMetrics;
use crate::source::{PartitionSource, PartitionSourceFactory};
use crate::state::{ReaderOperation, ReaderState};
use crate::stream::PartitionReaderStream;

/// A forward-only, single-owner iteration handle over the rows of one partition.
///
/// The reader owns the connector source for the partition. The source is
/// released exactly once: by the first call to [`close`](Self::close), or when
/// the reader is dropped without being closed.
pub struct PartitionReader<R> {
    partition: usize,
    state: ReaderState,
    current: Option<R>,
    /// `None` once the source has been released.
    source: Option<Box<dyn PartitionSource<R>>>,
    cancellation: CancellationHandle,
    metrics: ReaderMetrics,
}

impl<R> PartitionReader<R> {
    pub fn new(partition: usize, source: Box<dyn PartitionSource<R>>) -> Self {
        Self {
            partition,
            state: ReaderState::Fresh,
            current: None,
            source: Some(source),
            cancellation: CancellationHandle::new(),
            metrics: ReaderMetrics::default(),
        }
    }

    /// Opens the partition described by the factory.
    ///
    /// If the source cannot be opened, no reader is created and the failure
    /// is reported as a read failure.
    pub fn open<F>(factory: &F) -> PartitionReaderResult<Self>
    where
        F: PartitionSourceFactory<R> + ?Sized,
    {
        let partition = factory.partition();
        let source = factory
            .open()
            .map_err(|cause| PartitionReaderError::ReadFailure { partition, cause })?;
        debug!("opened reader for partition {partition}");
        Ok(Self::new(partition, source))
    }

    /// Opens the partition, runs `f` with the reader, and closes the reader
    /// on every exit path.
    ///
    /// An error from `f` takes precedence over an error from closing.
    pub fn scoped<F, T, U>(factory: &F, f: U) -> PartitionReaderResult<T>
    where
        F: PartitionSourceFactory<R> + ?Sized,
        U: FnOnce(&mut PartitionReader<R>) -> PartitionReaderResult<T>,
    {
        let mut reader = Self::open(factory)?;
        match f(&mut reader) {
            Ok(value) => {
                reader.close()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(release) = reader.close() {
                    warn!("{release}");
                }
                Err(e)
            }
        }
    }

    /// Uses an external cancellation handle, typically shared by all readers
    /// of the same query.
    pub fn with_cancellation(mut self, cancellation: CancellationHandle) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn cancellation_handle(&self) -> CancellationHandle {
        self.cancellation.clone()
    }

    pub fn partition(&self) -> usize {
        self.partition
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn metrics(&self) -> &ReaderMetrics {
        &self.metrics
    }

    /// Moves to the next row.
    ///
    /// Returns `false` once the partition is exhausted, and keeps returning
    /// `false` on every later call without touching the source.
    pub fn advance(&mut self) -> PartitionReaderResult<bool> {
        match self.state {
            ReaderState::Fresh | ReaderState::Positioned => {}
            ReaderState::Exhausted => return Ok(false),
            ReaderState::Failed | ReaderState::Closed => {
                return Err(self.violation(ReaderOperation::Advance));
            }
        }
        self.current = None;
        if self.cancellation.is_cancelled() {
            return Err(self.fail(SourceError::Interrupted));
        }
        let Some(source) = self.source.as_mut() else {
            return Err(self.violation(ReaderOperation::Advance));
        };
        let start = Instant::now();
        let result = source.next_row();
        self.metrics.add_source_time(start.elapsed());
        match result {
            Ok(Some(row)) => {
                self.current = Some(row);
                self.state = ReaderState::Positioned;
                self.metrics.record_row();
                Ok(true)
            }
            Ok(None) => {
                self.state = ReaderState::Exhausted;
                debug!(
                    "partition {} exhausted after {} rows",
                    self.partition,
                    self.metrics.rows_read()
                );
                Ok(false)
            }
            Err(cause) => Err(self.fail(cause)),
        }
    }

    /// Returns the row produced by the most recent successful [`advance`](Self::advance).
    pub fn current(&self) -> PartitionReaderResult<&R> {
        match (self.state, self.current.as_ref()) {
            (ReaderState::Positioned, Some(row)) => Ok(row),
            _ => Err(self.violation(ReaderOperation::Current)),
        }
    }

    /// Moves the current row out of the reader.
    /// Only the adapters that own the reader use this, since it breaks the
    /// stability of [`current`](Self::current) for the rest of the position.
    pub(crate) fn take_current(&mut self) -> PartitionReaderResult<R> {
        match self.state {
            ReaderState::Positioned => self
                .current
                .take()
                .ok_or_else(|| self.violation(ReaderOperation::Current)),
            _ => Err(self.violation(ReaderOperation::Current)),
        }
    }

    /// Releases the resources of this reader.
    ///
    /// This is valid from any state. Only the first call releases; later
    /// calls are no-ops. If releasing fails, the error is returned but the
    /// reader is closed all the same.
    pub fn close(&mut self) -> PartitionReaderResult<()> {
        self.current = None;
        self.state = ReaderState::Closed;
        let Some(mut source) = self.source.take() else {
            return Ok(());
        };
        let result = source.release();
        drop(source);
        self.metrics.record_release();
        match result {
            Ok(()) => {
                debug!("closed reader for partition {}", self.partition);
                Ok(())
            }
            Err(cause) => {
                warn!(
                    "failed to release resources for partition {}: {cause}",
                    self.partition
                );
                Err(PartitionReaderError::ReleaseFailure {
                    partition: self.partition,
                    cause,
                })
            }
        }
    }

    /// Turns the reader into an iterator of owned rows.
    pub fn into_rows(self) -> PartitionRowIterator<R> {
        PartitionRowIterator::new(self)
    }

    fn fail(&mut self, cause: SourceError) -> PartitionReaderError {
        self.state = ReaderState::Failed;
        self.metrics.record_failure();
        PartitionReaderError::ReadFailure {
            partition: self.partition,
            cause,
        }
    }

    fn violation(&self, operation: ReaderOperation) -> PartitionReaderError {
        PartitionReaderError::ProtocolViolation {
            partition: self.partition,
            operation,
            state: self.state,
        }
    }
}

impl<R: Send + 'static> PartitionReader<R> {
    /// Drives the reader on a dedicated thread and exposes its rows as an
    /// async stream.
    pub fn into_stream(
        self,
        config: &StreamConfig,
    ) -> PartitionReaderResult<PartitionReaderStream<R>> {
        PartitionReaderStream::try_new(self, config)
    }
}

impl<R> fmt::Debug for PartitionReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionReader")
            .field("partition", &self.partition)
            .field("state", &self.state)
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl<R> Drop for PartitionReader<R> {
    fn drop(&mut self) {
        if self.source.is_some() {
            warn!(
                "reader for partition {} dropped without close, releasing resources",
                self.partition
            );
            // The release error is already logged by `close()`.
            let _ = self.close();
        }
    }
}
