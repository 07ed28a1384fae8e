use std::fmt::Debug;

use crate::error::SourceResult;

/// The connector side of a partition read.
///
/// A [`PartitionReader`](crate::PartitionReader) owns exactly one source and
/// guarantees that [`release`](Self::release) is called at most once, and that
/// [`next_row`](Self::next_row) is never called after it.
pub trait PartitionSource<R>: Send {
    /// Produces the next row, or `None` once the partition has no more rows.
    /// This may block on I/O.
    fn next_row(&mut self) -> SourceResult<Option<R>>;

    /// Releases every resource held by this source.
    fn release(&mut self) -> SourceResult<()>;
}

/// The description of one partition, sufficient to open its data stream.
///
/// Factories are created by the planner and shipped to the worker that runs
/// the partition, so opening is deferred until [`open`](Self::open) is called.
pub trait PartitionSourceFactory<R>: Debug + Send + Sync {
    /// The index of the partition within the scan.
    fn partition(&self) -> usize;

    /// Acquires the resources for this partition.
    fn open(&self) -> SourceResult<Box<dyn PartitionSource<R>>>;

    /// Hosts where this partition can be read most efficiently.
    fn preferred_locations(&self) -> Vec<String> {
        vec![]
    }
}
