use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::debug;
use sail_common::config::TextConfig;
use sail_common::error::CommonResult;
use sail_partition_reader::{PartitionSource, PartitionSourceFactory, SourceResult};

use crate::formats::text::reader::TextLineSource;

pub mod reader;

/// A local text file read as one row per line.
#[derive(Debug, Clone)]
pub struct TextFile {
    path: PathBuf,
    line_sep: Option<u8>,
    read_buffer_size: usize,
    max_partition_bytes: u64,
}

impl TextFile {
    /// Reads the file with the line separator, buffer size, and partition
    /// size from the configuration.
    pub fn try_new(path: impl Into<PathBuf>, config: &TextConfig) -> CommonResult<Self> {
        Ok(Self {
            path: path.into(),
            line_sep: config.line_sep_byte()?,
            read_buffer_size: config.read_buffer_size.max(1),
            max_partition_bytes: config.max_partition_bytes.max(1),
        })
    }

    pub fn with_max_partition_bytes(mut self, max_partition_bytes: u64) -> Self {
        self.max_partition_bytes = max_partition_bytes.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Splits the file into contiguous byte ranges of at most
    /// `max_partition_bytes` each. An empty file has no partitions.
    pub fn partitions(&self) -> SourceResult<Vec<TextPartition>> {
        let size = std::fs::metadata(&self.path)?.len();
        let mut partitions = vec![];
        let mut start = 0;
        while start < size {
            let length = self.max_partition_bytes.min(size - start);
            partitions.push(self.partition(partitions.len(), start, length));
            start += length;
        }
        debug!(
            "planned {} partitions for {} ({size} bytes)",
            partitions.len(),
            self.path().display()
        );
        Ok(partitions)
    }

    pub fn partition(&self, partition: usize, start: u64, length: u64) -> TextPartition {
        TextPartition {
            partition,
            file: self.clone(),
            start,
            length,
        }
    }
}

/// The byte range `[start, start + length)` of a text file.
///
/// A line belongs to the partition in which it starts. The first line is
/// skipped unless the range starts at the beginning of the file, and the last
/// line is read to its end even if that lies beyond the range.
#[derive(Debug, Clone)]
pub struct TextPartition {
    partition: usize,
    file: TextFile,
    start: u64,
    length: u64,
}

impl TextPartition {
    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }
}

impl PartitionSourceFactory<String> for TextPartition {
    fn partition(&self) -> usize {
        self.partition
    }

    fn open(&self) -> SourceResult<Box<dyn PartitionSource<String>>> {
        debug!(
            "opening partition {} of {} at byte {}",
            self.partition,
            self.path().display(),
            self.start
        );
        let mut file = File::open(self.path())?;
        if self.start > 0 {
            file.seek(SeekFrom::Start(self.start))?;
        }
        let input = BufReader::with_capacity(self.file.read_buffer_size, file);
        let source = TextLineSource::try_new(
            input,
            self.start,
            self.start.saturating_add(self.length),
            self.file.line_sep,
        )?;
        Ok(Box::new(source))
    }
}
