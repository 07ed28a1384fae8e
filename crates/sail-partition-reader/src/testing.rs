//! Instrumented sources for testing the reader contract.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{SourceError, SourceResult};
use crate::source::{PartitionSource, PartitionSourceFactory};

/// Counts the calls made to an [`InstrumentedSource`].
/// Clones share the same counters, so the tracker stays observable after the
/// source has been moved into a reader.
#[derive(Debug, Clone, Default)]
pub struct ReleaseTracker {
    reads: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
    reads_after_release: Arc<AtomicUsize>,
}

impl ReleaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn reads_after_release(&self) -> usize {
        self.reads_after_release.load(Ordering::SeqCst)
    }
}

/// A source over in-memory rows that records every read and release.
#[derive(Debug)]
pub struct InstrumentedSource<R> {
    rows: VecDeque<R>,
    tracker: ReleaseTracker,
    reads: usize,
    /// Fail the n-th read (1-based).
    fail_on_read: Option<usize>,
    fail_on_release: bool,
    released: bool,
}

impl<R> InstrumentedSource<R> {
    pub fn new(rows: impl IntoIterator<Item = R>, tracker: ReleaseTracker) -> Self {
        Self {
            rows: rows.into_iter().collect(),
            tracker,
            reads: 0,
            fail_on_read: None,
            fail_on_release: false,
            released: false,
        }
    }

    pub fn fail_on_read(mut self, n: usize) -> Self {
        self.fail_on_read = Some(n);
        self
    }

    pub fn fail_on_release(mut self) -> Self {
        self.fail_on_release = true;
        self
    }
}

impl<R: Send> PartitionSource<R> for InstrumentedSource<R> {
    fn next_row(&mut self) -> SourceResult<Option<R>> {
        if self.released {
            self.tracker
                .reads_after_release
                .fetch_add(1, Ordering::SeqCst);
            return Err(SourceError::decode("read after release"));
        }
        self.reads += 1;
        self.tracker.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_read == Some(self.reads) {
            return Err(SourceError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )));
        }
        Ok(self.rows.pop_front())
    }

    fn release(&mut self) -> SourceResult<()> {
        self.released = true;
        self.rows.clear();
        self.tracker.releases.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_release {
            return Err(SourceError::remote("failed to close connection"));
        }
        Ok(())
    }
}

/// A partition whose sources are [`InstrumentedSource`]s over the same rows.
#[derive(Debug, Clone)]
pub struct InstrumentedPartition<R> {
    partition: usize,
    rows: Vec<R>,
    tracker: ReleaseTracker,
    fail_on_read: Option<usize>,
    fail_on_open: bool,
}

impl<R> InstrumentedPartition<R> {
    pub fn new(partition: usize, rows: Vec<R>, tracker: ReleaseTracker) -> Self {
        Self {
            partition,
            rows,
            tracker,
            fail_on_read: None,
            fail_on_open: false,
        }
    }

    pub fn fail_on_read(mut self, n: usize) -> Self {
        self.fail_on_read = Some(n);
        self
    }

    pub fn fail_on_open(mut self) -> Self {
        self.fail_on_open = true;
        self
    }
}

impl<R> PartitionSourceFactory<R> for InstrumentedPartition<R>
where
    R: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    fn partition(&self) -> usize {
        self.partition
    }

    fn open(&self) -> SourceResult<Box<dyn PartitionSource<R>>> {
        if self.fail_on_open {
            return Err(SourceError::remote("source unavailable"));
        }
        let mut source = InstrumentedSource::new(self.rows.clone(), self.tracker.clone());
        source.fail_on_read = self.fail_on_read;
        Ok(Box::new(source))
    }
}
