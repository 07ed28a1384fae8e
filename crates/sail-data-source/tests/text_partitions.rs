use std::io::Write;
use std::path::PathBuf;

use futures::StreamExt;
use sail_common::config::{PartitionReaderConfig, StreamConfig, TextConfig};
use sail_data_source::{TextFile, TextPartition};
use sail_partition_reader::{PartitionReader, PartitionReaderResult, PartitionSourceFactory};
use sail_telemetry::{init_logging, LoggingOptions};
use tempfile::NamedTempFile;

fn write_file(content: &[u8]) -> std::io::Result<NamedTempFile> {
    // Only the first test to run installs the logger.
    let _ = init_logging(LoggingOptions {
        default_filter: "debug",
        is_test: true,
    });
    let mut file = NamedTempFile::new()?;
    file.write_all(content)?;
    file.flush()?;
    Ok(file)
}

fn text_config() -> TextConfig {
    TextConfig {
        read_buffer_size: 64 * 1024,
        line_sep: None,
        max_partition_bytes: 128 * 1024 * 1024,
    }
}

fn text_file(path: impl Into<PathBuf>) -> TextFile {
    TextFile::try_new(path, &text_config()).expect("failed to create text file")
}

fn read_partition(partition: &TextPartition) -> PartitionReaderResult<Vec<String>> {
    PartitionReader::open(partition)?
        .into_rows()
        .collect::<PartitionReaderResult<Vec<_>>>()
}

fn read_all(file: &TextFile) -> Vec<String> {
    let partitions = file.partitions().expect("failed to plan partitions");
    partitions
        .iter()
        .flat_map(|p| read_partition(p).expect("failed to read partition"))
        .collect()
}

#[test]
fn test_every_line_read_exactly_once() -> std::io::Result<()> {
    let lines = (0..50)
        .map(|i| format!("line {i} {}", "x".repeat(i % 7)))
        .collect::<Vec<_>>();
    let content = lines.join("\n") + "\n";
    let tmp = write_file(content.as_bytes())?;
    for max_partition_bytes in [1, 2, 3, 5, 8, 13, 64, 1024, 1 << 20] {
        let file = text_file(tmp.path()).with_max_partition_bytes(max_partition_bytes);
        assert_eq!(
            read_all(&file),
            lines,
            "max_partition_bytes = {max_partition_bytes}"
        );
    }
    Ok(())
}

#[test]
fn test_crlf_without_trailing_newline() -> std::io::Result<()> {
    let tmp = write_file(b"one\r\ntwo\r\nthree")?;
    for max_partition_bytes in [1, 4, 5, 6, 100] {
        let file = text_file(tmp.path()).with_max_partition_bytes(max_partition_bytes);
        assert_eq!(read_all(&file), vec!["one", "two", "three"]);
    }
    Ok(())
}

#[test]
fn test_custom_separator_from_config() -> Result<(), Box<dyn std::error::Error>> {
    let config = PartitionReaderConfig::load_with(
        "[text]\nline_sep = \";\"\nread_buffer_size = 4\nmax_partition_bytes = 3\n",
    )?;
    let tmp = write_file(b"a;bb;ccc;dddd")?;
    let file = TextFile::try_new(tmp.path(), &config.text)?;
    assert_eq!(file.partitions()?.len(), 5);
    assert_eq!(read_all(&file), vec!["a", "bb", "ccc", "dddd"]);
    Ok(())
}

#[test]
fn test_partition_size_from_config() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = write_file(&[b'x'; 100])?;
    let config = TextConfig {
        max_partition_bytes: 30,
        ..text_config()
    };
    let partitions = TextFile::try_new(tmp.path(), &config)?.partitions()?;
    let lengths = partitions.iter().map(|p| p.length()).collect::<Vec<_>>();
    assert_eq!(lengths, vec![30, 30, 30, 10]);
    assert!(partitions.iter().all(|p| p.path() == tmp.path()));

    let partitions = text_file(tmp.path()).partitions()?;
    assert_eq!(partitions.len(), 1);
    Ok(())
}

#[test]
fn test_empty_file_has_no_partitions() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = write_file(b"")?;
    let partitions = text_file(tmp.path()).partitions()?;
    assert!(partitions.is_empty());
    Ok(())
}

#[test]
fn test_partition_layout() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = write_file(b"0123456789")?;
    let partitions = text_file(tmp.path()).with_max_partition_bytes(4).partitions()?;
    let layout = partitions
        .iter()
        .map(|p| (p.partition(), p.start(), p.length()))
        .collect::<Vec<_>>();
    assert_eq!(layout, vec![(0, 0, 4), (1, 4, 4), (2, 8, 2)]);
    Ok(())
}

#[test]
fn test_missing_file_fails_to_open() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let file = text_file(dir.path().join("missing.txt"));
    assert!(file.partitions().is_err());

    let partition = file.partition(0, 0, 16);
    let result = PartitionReader::open(&partition);
    assert!(result.is_err_and(|e| e.is_read_failure()));
}

#[test]
fn test_decode_failure_then_close() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = write_file(b"good\n\xff\xfe\nlater\n")?;
    let partition = text_file(tmp.path()).partition(0, 0, 64);
    let mut reader = PartitionReader::open(&partition)?;
    assert!(reader.advance()?);
    assert_eq!(reader.current()?, "good");
    assert!(reader.advance().is_err_and(|e| e.is_read_failure()));
    reader.close()?;
    assert!(reader.metrics().released());
    Ok(())
}

#[test]
fn test_limit_closes_reader_early() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = write_file(b"a\nb\nc\nd\n")?;
    let partition = text_file(tmp.path()).partition(0, 0, 8);
    let mut rows = PartitionReader::open(&partition)?.into_rows().with_limit(2);
    assert_eq!(rows.next().transpose()?, Some("a".to_string()));
    assert_eq!(rows.next().transpose()?, Some("b".to_string()));
    assert_eq!(rows.next().transpose()?, None);
    assert!(rows.metrics().released());
    assert_eq!(rows.metrics().rows_read(), 2);
    Ok(())
}

#[tokio::test]
async fn test_stream_text_partitions() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = write_file(b"x\ny\nz\n")?;
    let file = text_file(tmp.path()).with_max_partition_bytes(3);
    let config = StreamConfig { buffer_size: 1 };
    let mut rows = vec![];
    for partition in file.partitions()? {
        let mut stream = PartitionReader::open(&partition)?.into_stream(&config)?;
        while let Some(row) = stream.next().await {
            rows.push(row?);
        }
    }
    assert_eq!(rows, vec!["x", "y", "z"]);
    Ok(())
}
