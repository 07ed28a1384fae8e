use std::fmt;

/// The lifecycle state of a [`PartitionReader`](crate::PartitionReader).
///
/// ```text
/// Fresh --advance(true)--> Positioned --advance(true)--> Positioned
/// Fresh/Positioned --advance(false)--> Exhausted
/// Fresh/Positioned --advance(error)--> Failed
/// any state --close()--> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Constructed, no call made yet.
    Fresh,
    /// The last advance succeeded and a current row is available.
    Positioned,
    /// The source reported no more rows. This state is sticky.
    Exhausted,
    /// The last advance failed. The reader can only be closed.
    Failed,
    /// Resources have been released. This state is terminal.
    Closed,
}

impl fmt::Display for ReaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderState::Fresh => write!(f, "Fresh"),
            ReaderState::Positioned => write!(f, "Positioned"),
            ReaderState::Exhausted => write!(f, "Exhausted"),
            ReaderState::Failed => write!(f, "Failed"),
            ReaderState::Closed => write!(f, "Closed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderOperation {
    Advance,
    Current,
}

impl fmt::Display for ReaderOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderOperation::Advance => write!(f, "advance"),
            ReaderOperation::Current => write!(f, "current"),
        }
    }
}
