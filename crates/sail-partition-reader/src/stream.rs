use std::pin::Pin;
use std::task::{Context, Poll};
use std::thread::JoinHandle;

use futures::Stream;
use log::{debug, warn};
use sail_common::config::StreamConfig;
use tokio::sync::{mpsc, oneshot};

use crate::error::{PartitionReaderError, PartitionReaderResult, SourceError};
use crate::reader::PartitionReader;

enum StreamState<R> {
    Running {
        /// Signal to stop the reader thread
        stop_signal: Option<oneshot::Sender<()>>,
        /// Handle to join the reader thread
        reader_thread: Option<JoinHandle<()>>,
        rx: mpsc::Receiver<PartitionReaderResult<R>>,
    },
    Stopped,
}

/// An async stream of rows read from a [`PartitionReader`].
///
/// The blocking reader is driven on a dedicated thread. The reader is closed
/// by that thread when the partition is exhausted, a read fails, or the
/// stream is dropped. Dropping the stream waits for the thread to finish.
pub struct PartitionReaderStream<R> {
    partition: usize,
    state: StreamState<R>,
}

impl<R: Send + 'static> PartitionReaderStream<R> {
    pub fn try_new(
        reader: PartitionReader<R>,
        config: &StreamConfig,
    ) -> PartitionReaderResult<Self> {
        let partition = reader.partition();
        let (tx, rx) = mpsc::channel(config.buffer_size.max(1));
        let (stop_tx, stop_rx) = oneshot::channel();

        let reader_thread = std::thread::Builder::new()
            .name(format!("partition-reader-{partition}"))
            .spawn(move || Self::run_reader(reader, tx, stop_rx))
            .map_err(|e| PartitionReaderError::ReadFailure {
                partition,
                cause: SourceError::Io(e),
            })?;

        Ok(Self {
            partition,
            state: StreamState::Running {
                stop_signal: Some(stop_tx),
                reader_thread: Some(reader_thread),
                rx,
            },
        })
    }

    fn run_reader(
        mut reader: PartitionReader<R>,
        tx: mpsc::Sender<PartitionReaderResult<R>>,
        mut stop_rx: oneshot::Receiver<()>,
    ) {
        loop {
            match stop_rx.try_recv() {
                Ok(_) | Err(oneshot::error::TryRecvError::Closed) => {
                    debug!("stopping reader for partition {}", reader.partition());
                    break;
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
            }
            match reader.advance() {
                Ok(true) => {
                    let row = reader.take_current();
                    let failed = row.is_err();
                    if tx.blocking_send(row).is_err() || failed {
                        break;
                    }
                }
                Ok(false) => break,
                Err(e) => {
                    let _ = tx.blocking_send(Err(e));
                    break;
                }
            }
        }
        if let Err(e) = reader.close() {
            let _ = tx.blocking_send(Err(e));
        }
    }
}

impl<R> Stream for PartitionReaderStream<R> {
    type Item = PartitionReaderResult<R>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match &mut self.state {
            StreamState::Running { rx, .. } => rx.poll_recv(cx),
            StreamState::Stopped => Poll::Ready(None),
        }
    }
}

impl<R> Drop for PartitionReaderStream<R> {
    fn drop(&mut self) {
        let state = std::mem::replace(&mut self.state, StreamState::Stopped);

        match state {
            StreamState::Running {
                stop_signal,
                reader_thread,
                rx,
            } => {
                if let Some(signal) = stop_signal {
                    let _ = signal.send(());
                }
                // The reader thread may be blocked on a full channel.
                drop(rx);
                if let Some(thread) = reader_thread {
                    if thread.join().is_err() {
                        warn!("reader thread for partition {} panicked", self.partition);
                    }
                }
            }
            StreamState::Stopped => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::testing::{InstrumentedSource, ReleaseTracker};

    fn config() -> StreamConfig {
        StreamConfig { buffer_size: 2 }
    }

    #[tokio::test]
    async fn test_stream_rows() -> PartitionReaderResult<()> {
        let tracker = ReleaseTracker::new();
        let reader = PartitionReader::new(
            0,
            Box::new(InstrumentedSource::new(vec![1, 2, 3, 4, 5], tracker.clone())),
        );
        let stream = PartitionReaderStream::try_new(reader, &config())?;
        let rows = stream.collect::<Vec<_>>().await;
        let rows = rows.into_iter().collect::<PartitionReaderResult<Vec<_>>>()?;
        assert_eq!(rows, vec![1, 2, 3, 4, 5]);
        assert_eq!(tracker.releases(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_stream_read_failure() -> PartitionReaderResult<()> {
        let tracker = ReleaseTracker::new();
        let source = InstrumentedSource::new(vec![1, 2, 3], tracker.clone()).fail_on_read(2);
        let reader = PartitionReader::new(5, Box::new(source));
        let mut stream = PartitionReaderStream::try_new(reader, &config())?;
        assert!(matches!(stream.next().await, Some(Ok(1))));
        let error = stream.next().await.and_then(|r| r.err());
        assert!(error.is_some_and(|e| e.is_read_failure() && e.partition() == 5));
        assert!(stream.next().await.is_none());
        assert_eq!(tracker.releases(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_drop_stream_early() -> PartitionReaderResult<()> {
        let tracker = ReleaseTracker::new();
        let reader = PartitionReader::new(
            0,
            Box::new(InstrumentedSource::new(0..10_000, tracker.clone())),
        );
        let mut stream = PartitionReaderStream::try_new(reader, &config())?;
        assert!(matches!(stream.next().await, Some(Ok(0))));
        drop(stream);
        assert_eq!(tracker.releases(), 1);
        assert!(tracker.reads() < 10_000);
        Ok(())
    }
}
