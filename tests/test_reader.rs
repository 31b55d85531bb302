mod common;

use common::ChunkReader;
use rawhttp::http::reader::{Fill, IncrementalReader, DEFAULT_CAPACITY};

#[tokio::test]
async fn test_reads_accumulate_until_consumed() {
    let mut reader = IncrementalReader::new(ChunkReader::new("abcdef", 2));

    assert_eq!(reader.read().await.unwrap(), Fill { read: 2, eof: false });
    assert_eq!(reader.read().await.unwrap(), Fill { read: 2, eof: false });
    assert_eq!(reader.buffered(), b"abcd");

    reader.consume(3);
    assert_eq!(reader.buffered(), b"d");

    reader.read().await.unwrap();
    assert_eq!(reader.buffered(), b"def");
}

#[tokio::test]
async fn test_eof_reported_once_source_is_drained() {
    let mut reader = IncrementalReader::new(ChunkReader::new("hi", 16));

    assert_eq!(reader.read().await.unwrap(), Fill { read: 2, eof: false });
    assert_eq!(reader.read().await.unwrap(), Fill { read: 0, eof: true });
    assert_eq!(reader.buffered(), b"hi");
}

#[tokio::test]
async fn test_capacity_doubles_when_full() {
    let mut reader = IncrementalReader::with_capacity(ChunkReader::new("x".repeat(20), 100), 4);
    assert_eq!(reader.capacity(), 4);

    assert_eq!(reader.read().await.unwrap().read, 4);
    assert_eq!(reader.capacity(), 4);

    assert_eq!(reader.read().await.unwrap().read, 4);
    assert_eq!(reader.capacity(), 8);

    assert_eq!(reader.read().await.unwrap().read, 8);
    assert_eq!(reader.capacity(), 16);
    assert_eq!(reader.buffered().len(), 16);
}

#[tokio::test]
async fn test_consumed_space_is_reused_before_growing() {
    let mut reader = IncrementalReader::with_capacity(ChunkReader::new("12345678", 100), 4);

    reader.read().await.unwrap();
    reader.consume(4);
    assert_eq!(reader.read().await.unwrap().read, 4);
    assert_eq!(reader.capacity(), 4);
    assert_eq!(reader.buffered(), b"5678");
}

#[test]
fn test_zero_capacity_is_raised_to_one() {
    let reader = IncrementalReader::with_capacity(ChunkReader::new("", 1), 0);
    assert_eq!(reader.capacity(), 1);

    let reader = IncrementalReader::new(ChunkReader::new("", 1));
    assert_eq!(reader.capacity(), DEFAULT_CAPACITY);
}
