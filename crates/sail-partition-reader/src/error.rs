use thiserror::Error;

use crate::state::{ReaderOperation, ReaderState};

pub type SourceResult<T> = Result<T, SourceError>;

pub type PartitionReaderResult<T> = Result<T, PartitionReaderError>;

/// An error raised by a connector while producing rows or releasing resources.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("remote source error: {0}")]
    Remote(String),
    #[error("read interrupted")]
    Interrupted,
    #[error("external error: {0}")]
    External(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl SourceError {
    pub fn decode(message: impl Into<String>) -> Self {
        SourceError::Decode(message.into())
    }

    pub fn remote(message: impl Into<String>) -> Self {
        SourceError::Remote(message.into())
    }

    pub fn external(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        SourceError::External(Box::new(error))
    }
}

#[derive(Debug, Error)]
pub enum PartitionReaderError {
    /// The next row could not be produced. Not retried by the reader.
    #[error("failed to read partition {partition}: {cause}")]
    ReadFailure {
        partition: usize,
        #[source]
        cause: SourceError,
    },
    /// The caller used the reader outside of a valid state.
    #[error("protocol violation: {operation}() called on partition {partition} reader in state {state}")]
    ProtocolViolation {
        partition: usize,
        operation: ReaderOperation,
        state: ReaderState,
    },
    /// Resources could not be fully released. The reader is closed regardless.
    #[error("failed to release partition {partition}: {cause}")]
    ReleaseFailure {
        partition: usize,
        #[source]
        cause: SourceError,
    },
}

impl PartitionReaderError {
    pub fn partition(&self) -> usize {
        match self {
            PartitionReaderError::ReadFailure { partition, .. }
            | PartitionReaderError::ProtocolViolation { partition, .. }
            | PartitionReaderError::ReleaseFailure { partition, .. } => *partition,
        }
    }

    pub fn is_read_failure(&self) -> bool {
        matches!(self, PartitionReaderError::ReadFailure { .. })
    }

    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, PartitionReaderError::ProtocolViolation { .. })
    }

    pub fn is_release_failure(&self) -> bool {
        matches!(self, PartitionReaderError::ReleaseFailure { .. })
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            PartitionReaderError::ReadFailure {
                cause: SourceError::Interrupted,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = PartitionReaderError::ProtocolViolation {
            partition: 3,
            operation: ReaderOperation::Current,
            state: ReaderState::Fresh,
        };
        assert_eq!(
            error.to_string(),
            "protocol violation: current() called on partition 3 reader in state Fresh"
        );

        let error = PartitionReaderError::ReadFailure {
            partition: 1,
            cause: SourceError::decode("bad row"),
        };
        assert_eq!(
            error.to_string(),
            "failed to read partition 1: decode error: bad row"
        );
        assert!(error.is_read_failure());
        assert!(!error.is_interrupted());
        assert_eq!(error.partition(), 1);
    }

    #[test]
    fn test_error_source_chain() {
        let error = PartitionReaderError::ReleaseFailure {
            partition: 0,
            cause: SourceError::Io(std::io::Error::other("socket reset")),
        };
        let source = std::error::Error::source(&error).map(|e| e.to_string());
        assert_eq!(source.as_deref(), Some("IO error: socket reset"));
    }
}
