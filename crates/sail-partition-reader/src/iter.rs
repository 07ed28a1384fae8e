use log::{debug, warn};

use crate::error::{PartitionReaderError, PartitionReaderResult};
use crate::metrics::ReaderMetrics;
use crate::reader::PartitionReader;
use crate::state::ReaderState;

/// An iterator of owned rows that drives a [`PartitionReader`].
///
/// The reader is closed as soon as the partition is exhausted, a read fails,
/// or the row limit is reached. An error is yielded once, after which the
/// iterator is fused.
#[derive(Debug)]
pub struct PartitionRowIterator<R> {
    reader: PartitionReader<R>,
    /// Whether the reader has been advanced to a row that is not yet consumed.
    value_prepared: bool,
    remaining: Option<usize>,
    done: bool,
}

impl<R> PartitionRowIterator<R> {
    pub fn new(reader: PartitionReader<R>) -> Self {
        Self {
            reader,
            value_prepared: false,
            remaining: None,
            done: false,
        }
    }

    /// Stops after `limit` rows and closes the reader without reading further.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.remaining = Some(limit);
        self
    }

    pub fn partition(&self) -> usize {
        self.reader.partition()
    }

    pub fn state(&self) -> ReaderState {
        self.reader.state()
    }

    pub fn metrics(&self) -> &ReaderMetrics {
        self.reader.metrics()
    }

    /// Returns whether another row is available, advancing the reader at most
    /// once per row no matter how many times this is called.
    pub fn has_next(&mut self) -> PartitionReaderResult<bool> {
        if self.done || self.remaining == Some(0) {
            return Ok(false);
        }
        if !self.value_prepared {
            match self.reader.advance() {
                Ok(prepared) => self.value_prepared = prepared,
                Err(e) => return Err(self.fail(e)),
            }
        }
        Ok(self.value_prepared)
    }

    /// Closes the underlying reader early. Any rows not yet read are skipped.
    pub fn close(&mut self) -> PartitionReaderResult<()> {
        self.done = true;
        self.value_prepared = false;
        self.reader.close()
    }

    fn finish(&mut self) -> Option<PartitionReaderResult<R>> {
        match self.close() {
            Ok(()) => None,
            Err(e) => Some(Err(e)),
        }
    }

    /// Closes the reader after a read failure and returns the failure.
    fn fail(&mut self, error: PartitionReaderError) -> PartitionReaderError {
        self.done = true;
        self.value_prepared = false;
        if let Err(release) = self.reader.close() {
            warn!("{release}");
        }
        error
    }
}

impl<R> Iterator for PartitionRowIterator<R> {
    type Item = PartitionReaderResult<R>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.has_next() {
            Ok(true) => {}
            Ok(false) => return self.finish(),
            Err(e) => return Some(Err(e)),
        }
        self.value_prepared = false;
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        Some(self.reader.take_current())
    }
}

impl<R> Drop for PartitionRowIterator<R> {
    fn drop(&mut self) {
        if !self.done {
            debug!("row iterator for partition {} stopped early", Self::partition(self));
            if let Err(e) = self.close() {
                warn!("{e}");
            }
        }
    }
}
