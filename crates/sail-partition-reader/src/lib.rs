pub mod cancel;
pub mod error;
pub mod iter;
pub mod metrics;
pub mod reader;
pub mod source;
pub mod state;
pub mod stream;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cancel::CancellationHandle;
pub use error::{PartitionReaderError, PartitionReaderResult, SourceError, SourceResult};
pub use iter::PartitionRowIterator;
pub use metrics::ReaderMetrics;
pub use reader::PartitionReader;
pub use source::{PartitionSource, PartitionSourceFactory};
pub use state::{ReaderOperation, ReaderState};
pub use stream::PartitionReaderStream;
