pub mod formats;

pub use formats::memory::MemoryPartition;
pub use formats::text::{TextFile, TextPartition};
