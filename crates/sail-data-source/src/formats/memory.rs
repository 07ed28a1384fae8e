use std::sync::Arc;

use log::debug;
use sail_partition_reader::{PartitionSource, PartitionSourceFactory, SourceResult};

/// A partition over rows that are already in memory.
#[derive(Debug, Clone)]
pub struct MemoryPartition<R> {
    partition: usize,
    rows: Arc<Vec<R>>,
}

impl<R> MemoryPartition<R> {
    pub fn new(partition: usize, rows: Vec<R>) -> Self {
        Self {
            partition,
            rows: Arc::new(rows),
        }
    }

    /// Splits the rows into at most `num_partitions` contiguous partitions
    /// of nearly equal size. No partition is created for an empty input.
    pub fn split(rows: Vec<R>, num_partitions: usize) -> Vec<Self> {
        let num_partitions = num_partitions.max(1).min(rows.len());
        if num_partitions == 0 {
            return vec![];
        }
        let base = rows.len() / num_partitions;
        let extra = rows.len() % num_partitions;
        let mut rows = rows.into_iter();
        (0..num_partitions)
            .map(|i| {
                let size = base + usize::from(i < extra);
                Self::new(i, rows.by_ref().take(size).collect())
            })
            .collect()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }
}

impl<R> PartitionSourceFactory<R> for MemoryPartition<R>
where
    R: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    fn partition(&self) -> usize {
        self.partition
    }

    fn open(&self) -> SourceResult<Box<dyn PartitionSource<R>>> {
        Ok(Box::new(MemorySource {
            rows: Some(Arc::clone(&self.rows)),
            offset: 0,
        }))
    }
}

struct MemorySource<R> {
    /// `None` once released.
    rows: Option<Arc<Vec<R>>>,
    offset: usize,
}

impl<R: Clone + Send + Sync> PartitionSource<R> for MemorySource<R> {
    fn next_row(&mut self) -> SourceResult<Option<R>> {
        let Some(rows) = self.rows.as_ref() else {
            return Ok(None);
        };
        let row = rows.get(self.offset).cloned();
        if row.is_some() {
            self.offset += 1;
        }
        Ok(row)
    }

    fn release(&mut self) -> SourceResult<()> {
        if self.rows.take().is_some() {
            debug!("released memory source after {} rows", self.offset);
        }
        Ok(())
    }
}
