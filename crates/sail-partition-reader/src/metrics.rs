use std::time::Duration;

/// Input metrics collected by a single reader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderMetrics {
    rows_read: u64,
    read_failures: u64,
    released: bool,
    source_time: Duration,
}

impl ReaderMetrics {
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    pub fn read_failures(&self) -> u64 {
        self.read_failures
    }

    /// Whether the source has been released.
    pub fn released(&self) -> bool {
        self.released
    }

    /// The wall time spent inside the source producing rows.
    pub fn source_time(&self) -> Duration {
        self.source_time
    }

    pub(crate) fn record_row(&mut self) {
        self.rows_read += 1;
    }

    pub(crate) fn record_failure(&mut self) {
        self.read_failures += 1;
    }

    pub(crate) fn record_release(&mut self) {
        self.released = true;
    }

    pub(crate) fn add_source_time(&mut self, elapsed: Duration) {
        self.source_time += elapsed;
    }
}
