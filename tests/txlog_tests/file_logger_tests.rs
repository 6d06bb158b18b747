//! Tests for FileTransactionLogger
//!
//! These tests verify:
//! - Line format on disk
//! - Replay order and sequence numbering
//! - Continuing the sequence after a restart
//! - Corruption and parse error detection
//! - Concurrent producers
//! - Write errors surfacing on the error stream

#[path = "../common/mod.rs"]
mod common;

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{collect_events, wait_for_lines};
use kvlog::{EventType, FileTransactionLogger, KvError, TransactionLogger};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("transaction.log");
    (temp_dir, log_path)
}

/// Open, replay to the end, and start the writer
fn open_live(path: &PathBuf) -> FileTransactionLogger {
    let logger = FileTransactionLogger::open(path).unwrap();
    let (_, err) = collect_events(&logger);
    assert!(err.is_none(), "unexpected replay error: {:?}", err);
    logger.run();
    logger
}

fn write_raw(path: &PathBuf, contents: &str) {
    let mut file = File::create(path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.sync_all().unwrap();
}

// =============================================================================
// Open / Bootstrap Tests
// =============================================================================

#[test]
fn test_open_creates_file_and_parent_dirs() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("nested").join("dir").join("tx.log");

    let _logger = FileTransactionLogger::open(&log_path).unwrap();

    assert!(log_path.exists());
    assert_eq!(fs::metadata(&log_path).unwrap().len(), 0);
}

#[test]
fn test_open_on_directory_is_initialization_error() {
    let temp_dir = TempDir::new().unwrap();

    let result = FileTransactionLogger::open(temp_dir.path());

    assert!(matches!(result, Err(KvError::Initialization(_))));
}

#[test]
fn test_reopen_keeps_existing_content() {
    let (_temp, log_path) = setup_temp_log();
    write_raw(&log_path, "1\t2\ta\t1\n2\t2\tb\t2\n");

    let first = FileTransactionLogger::open(&log_path).unwrap();
    drop(first);
    let second = FileTransactionLogger::open(&log_path).unwrap();

    let (events, err) = collect_events(&second);
    assert!(err.is_none());
    assert_eq!(events.len(), 2);
    assert_eq!(
        fs::read_to_string(&log_path).unwrap(),
        "1\t2\ta\t1\n2\t2\tb\t2\n"
    );
}

// =============================================================================
// Replay Tests
// =============================================================================

#[test]
fn test_empty_file_replays_nothing() {
    let (_temp, log_path) = setup_temp_log();
    let logger = FileTransactionLogger::open(&log_path).unwrap();

    let (events, err) = collect_events(&logger);

    assert!(events.is_empty());
    assert!(err.is_none());
    assert_eq!(logger.last_sequence(), 0);
}

#[test]
fn test_replay_updates_last_sequence() {
    let (_temp, log_path) = setup_temp_log();
    write_raw(&log_path, "3\t2\ta\t1\n10\t1\ta\t\n");
    let logger = FileTransactionLogger::open(&log_path).unwrap();

    let (events, err) = collect_events(&logger);

    assert!(err.is_none());
    assert_eq!(events.len(), 2);
    assert_eq!(logger.last_sequence(), 10);
}

#[test]
fn test_out_of_sequence_stops_replay() {
    let (_temp, log_path) = setup_temp_log();
    write_raw(
        &log_path,
        "1\t2\ta\t1\n3\t2\tb\t2\n2\t2\tc\t3\n4\t2\td\t4\n",
    );
    let logger = FileTransactionLogger::open(&log_path).unwrap();

    let (events, err) = collect_events(&logger);

    let sequences: Vec<u64> = events.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![1, 3]);
    match err {
        Some(KvError::OutOfSequence { previous, found }) => {
            assert_eq!(previous, 3);
            assert_eq!(found, 2);
        }
        other => panic!("expected out-of-sequence error, got {:?}", other),
    }
}

#[test]
fn test_duplicate_sequence_is_corruption() {
    let (_temp, log_path) = setup_temp_log();
    write_raw(&log_path, "1\t2\ta\t1\n1\t2\tb\t2\n");
    let logger = FileTransactionLogger::open(&log_path).unwrap();

    let (events, err) = collect_events(&logger);

    assert_eq!(events.len(), 1);
    assert!(matches!(err, Some(KvError::OutOfSequence { .. })));
}

#[test]
fn test_malformed_line_is_parse_error() {
    let (_temp, log_path) = setup_temp_log();
    write_raw(&log_path, "1\t2\ta\t1\nnot a record\n2\t2\tb\t2\n");
    let logger = FileTransactionLogger::open(&log_path).unwrap();

    let (events, err) = collect_events(&logger);

    assert_eq!(events.len(), 1);
    match err {
        Some(KvError::Parse { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn test_value_with_spaces_and_tabs_survives_replay() {
    let (_temp, log_path) = setup_temp_log();
    {
        let logger = open_live(&log_path);
        logger.write_put("greeting", "hello there\tworld");
        wait_for_lines(&log_path, 1);
    }

    let logger = FileTransactionLogger::open(&log_path).unwrap();
    let (events, err) = collect_events(&logger);

    assert!(err.is_none());
    assert_eq!(events[0].value, "hello there\tworld");
}

#[test]
fn test_trailing_carriage_return_survives_replay() {
    let (_temp, log_path) = setup_temp_log();
    {
        let logger = open_live(&log_path);
        logger.write_put("k", "v\r");
        logger.write_put("crlf", "a\r\r");
        wait_for_lines(&log_path, 2);
        assert!(logger.err().try_recv().is_err());
    }

    let logger = FileTransactionLogger::open(&log_path).unwrap();
    let (events, err) = collect_events(&logger);

    assert!(err.is_none());
    assert_eq!(events[0].value, "v\r");
    assert_eq!(events[1].value, "a\r\r");
}

// =============================================================================
// Write Tests
// =============================================================================

#[test]
fn test_put_then_delete_round_trip() {
    let (_temp, log_path) = setup_temp_log();
    {
        let logger = open_live(&log_path);
        logger.write_put("a", "1");
        logger.write_delete("a");
        wait_for_lines(&log_path, 2);
    }

    assert_eq!(
        fs::read_to_string(&log_path).unwrap(),
        "1\t2\ta\t1\n2\t1\ta\t\n"
    );

    let logger = FileTransactionLogger::open(&log_path).unwrap();
    let (events, err) = collect_events(&logger);

    assert!(err.is_none());
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, EventType::Put);
    assert_eq!(events[0].key, "a");
    assert_eq!(events[0].value, "1");
    assert_eq!(events[1].kind, EventType::Delete);
    assert_eq!(events[1].key, "a");
    assert_eq!(events[1].sequence, events[0].sequence + 1);
}

#[test]
fn test_order_preserved_across_many_writes() {
    let (_temp, log_path) = setup_temp_log();
    {
        let logger = open_live(&log_path);
        for i in 0..50 {
            if i % 5 == 4 {
                logger.write_delete(&format!("key{}", i - 1));
            } else {
                logger.write_put(&format!("key{}", i), &format!("value{}", i));
            }
        }
        wait_for_lines(&log_path, 50);
    }

    let logger = FileTransactionLogger::open(&log_path).unwrap();
    let (events, err) = collect_events(&logger);

    assert!(err.is_none());
    assert_eq!(events.len(), 50);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.sequence, i as u64 + 1);
        if i % 5 == 4 {
            assert_eq!(event.kind, EventType::Delete);
            assert_eq!(event.key, format!("key{}", i - 1));
        } else {
            assert_eq!(event.kind, EventType::Put);
            assert_eq!(event.key, format!("key{}", i));
        }
    }
}

#[test]
fn test_sequence_continues_after_restart() {
    let (_temp, log_path) = setup_temp_log();
    {
        let logger = open_live(&log_path);
        for i in 0..3 {
            logger.write_put(&format!("k{}", i), "v");
        }
        wait_for_lines(&log_path, 3);
    }
    {
        let logger = open_live(&log_path);
        assert_eq!(logger.last_sequence(), 3);
        logger.write_put("k3", "v");
        logger.write_delete("k0");
        wait_for_lines(&log_path, 5);
    }

    let logger = FileTransactionLogger::open(&log_path).unwrap();
    let (events, err) = collect_events(&logger);

    assert!(err.is_none());
    let sequences: Vec<u64> = events.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_delete_without_prior_put_is_logged() {
    let (_temp, log_path) = setup_temp_log();
    {
        let logger = open_live(&log_path);
        logger.write_delete("missing");
        wait_for_lines(&log_path, 1);
        assert!(logger.err().try_recv().is_err());
    }

    let logger = FileTransactionLogger::open(&log_path).unwrap();
    let (events, err) = collect_events(&logger);

    assert!(err.is_none());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventType::Delete);
    assert_eq!(events[0].key, "missing");
}

#[test]
fn test_writes_before_run_are_persisted_after_run() {
    let (_temp, log_path) = setup_temp_log();
    let logger = FileTransactionLogger::open(&log_path).unwrap();

    logger.write_put("early", "1");
    thread::sleep(Duration::from_millis(50));
    assert_eq!(fs::metadata(&log_path).unwrap().len(), 0);

    logger.run();
    wait_for_lines(&log_path, 1);
}

#[test]
fn test_second_run_does_not_duplicate_writes() {
    let (_temp, log_path) = setup_temp_log();
    let logger = open_live(&log_path);
    logger.run();

    for i in 0..10 {
        logger.write_put(&format!("k{}", i), "v");
    }
    wait_for_lines(&log_path, 10);
    drop(logger);

    let logger = FileTransactionLogger::open(&log_path).unwrap();
    let (events, err) = collect_events(&logger);
    assert!(err.is_none());
    assert_eq!(events.len(), 10);
}

#[test]
fn test_unencodable_key_reports_write_error_and_skips_sequence() {
    let (_temp, log_path) = setup_temp_log();
    let logger = open_live(&log_path);
    let errors = logger.err();

    logger.write_put("bad\tkey", "v");
    logger.write_put("good", "v");

    let err = errors.recv_timeout(Duration::from_secs(10)).unwrap();
    match err {
        KvError::Write { kind, key, reason } => {
            assert_eq!(kind, EventType::Put);
            assert_eq!(key, "bad\tkey");
            assert!(reason.contains("cannot be encoded"), "reason: {}", reason);
            assert!(!reason.contains("Protocol"));
        }
        other => panic!("expected write error, got {:?}", other),
    }

    wait_for_lines(&log_path, 1);
    assert_eq!(fs::read_to_string(&log_path).unwrap(), "1\t2\tgood\tv\n");
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_producers_get_unique_sequences() {
    let (_temp, log_path) = setup_temp_log();
    let producers = 8;
    let per_producer = 25;
    {
        let logger = Arc::new(open_live(&log_path));
        let handles: Vec<_> = (0..producers)
            .map(|p| {
                let logger = Arc::clone(&logger);
                thread::spawn(move || {
                    for i in 0..per_producer {
                        logger.write_put(&format!("p{}-k{}", p, i), &format!("{}", i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        wait_for_lines(&log_path, producers * per_producer);
    }

    let logger = FileTransactionLogger::open(&log_path).unwrap();
    let (events, err) = collect_events(&logger);

    assert!(err.is_none());
    assert_eq!(events.len(), producers * per_producer);

    let mut sequences: Vec<u64> = events.iter().map(|e| e.sequence).collect();
    sequences.dedup();
    assert_eq!(sequences.len(), producers * per_producer);

    let mut keys: Vec<String> = events.iter().map(|e| e.key.clone()).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), producers * per_producer);

    // Each producer's own writes stay in submission order
    for p in 0..producers {
        let prefix = format!("p{}-", p);
        let values: Vec<u32> = events
            .iter()
            .filter(|e| e.key.starts_with(&prefix))
            .map(|e| e.value.parse().unwrap())
            .collect();
        assert_eq!(values, (0..per_producer as u32).collect::<Vec<_>>());
    }
}
