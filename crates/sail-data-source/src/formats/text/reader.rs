use std::io::BufRead;

use log::debug;
use sail_partition_reader::{PartitionSource, SourceError, SourceResult};

/// Reads the lines that start within `[start, end]` of the underlying input.
///
/// The input must already be positioned at `start`.
pub struct TextLineSource<I> {
    /// `None` once released.
    input: Option<I>,
    position: u64,
    end: u64,
    line_sep: Option<u8>,
    buffer: Vec<u8>,
}

impl<I: BufRead + Send> TextLineSource<I> {
    pub fn try_new(input: I, start: u64, end: u64, line_sep: Option<u8>) -> SourceResult<Self> {
        let mut source = Self {
            input: Some(input),
            position: start,
            end,
            line_sep,
            buffer: vec![],
        };
        if start > 0 {
            // The first line in the range belongs to the previous partition.
            source.position += source.read_record()? as u64;
        }
        Ok(source)
    }

    /// Reads one record into the buffer without its separator, and returns
    /// the number of bytes consumed from the input.
    fn read_record(&mut self) -> SourceResult<usize> {
        self.buffer.clear();
        let Some(input) = self.input.as_mut() else {
            return Ok(0);
        };
        if let Some(sep) = self.line_sep {
            let n = input.read_until(sep, &mut self.buffer)?;
            if self.buffer.last() == Some(&sep) {
                self.buffer.pop();
            }
            return Ok(n);
        }
        let mut consumed = 0;
        loop {
            let available = input.fill_buf()?;
            if available.is_empty() {
                return Ok(consumed);
            }
            match available.iter().position(|b| *b == b'\n' || *b == b'\r') {
                Some(i) => {
                    let sep = available[i];
                    self.buffer.extend_from_slice(&available[..i]);
                    input.consume(i + 1);
                    consumed += i + 1;
                    if sep == b'\r' && input.fill_buf()?.first() == Some(&b'\n') {
                        input.consume(1);
                        consumed += 1;
                    }
                    return Ok(consumed);
                }
                None => {
                    let n = available.len();
                    self.buffer.extend_from_slice(available);
                    input.consume(n);
                    consumed += n;
                }
            }
        }
    }
}

impl<I: BufRead + Send> PartitionSource<String> for TextLineSource<I> {
    fn next_row(&mut self) -> SourceResult<Option<String>> {
        if self.position > self.end {
            return Ok(None);
        }
        let offset = self.position;
        let n = self.read_record()?;
        if n == 0 {
            return Ok(None);
        }
        self.position += n as u64;
        let line = String::from_utf8(std::mem::take(&mut self.buffer)).map_err(|e| {
            SourceError::decode(format!("invalid UTF-8 in line at byte {offset}: {e}"))
        })?;
        Ok(Some(line))
    }

    fn release(&mut self) -> SourceResult<()> {
        if self.input.take().is_some() {
            debug!("released text input at byte {}", self.position);
        }
        self.buffer = vec![];
        Ok(())
    }
}
