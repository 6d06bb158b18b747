//! Tests for the recovery protocol
//!
//! These tests verify:
//! - Bootstrapping maps failures to Initialization
//! - Replay applies events to the store in order
//! - Replay errors abort recovery
//! - recover() leaves the logger live

#[path = "../common/mod.rs"]
mod common;

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use common::wait_for_lines;
use kvlog::txlog::recovery::{self, ReplaySummary};
use kvlog::{Config, KeyValueStore, KvError, Store};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("transaction.log");
    let mut file = File::create(&log_path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    (temp_dir, log_path)
}

fn file_config(path: &PathBuf) -> Config {
    Config::builder().file_log(path).build()
}

// =============================================================================
// Bootstrap Tests
// =============================================================================

#[test]
fn test_bootstrap_rejects_invalid_config() {
    let (_temp, log_path) = setup_temp_log("");
    let config = Config::builder().file_log(&log_path).queue_capacity(0).build();

    let result = recovery::bootstrap(&config);

    assert!(matches!(result, Err(KvError::Config(_))));
}

#[test]
fn test_bootstrap_unusable_file_is_initialization_error() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().file_log(temp_dir.path()).build();

    let result = recovery::bootstrap(&config);

    match result {
        Err(e) => {
            assert!(matches!(e, KvError::Initialization(_)));
            assert!(e.is_fatal());
        }
        Ok(_) => panic!("expected bootstrap to fail on a directory"),
    }
}

#[test]
fn test_bootstrap_unusable_database_is_initialization_error() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .sqlite_log(temp_dir.path().join("missing").join("db.sqlite"))
        .build();

    assert!(matches!(
        recovery::bootstrap(&config),
        Err(KvError::Initialization(_))
    ));
}

// =============================================================================
// Replay Tests
// =============================================================================

#[test]
fn test_replay_applies_puts_and_deletes_in_order() {
    let (_temp, log_path) = setup_temp_log(
        "1\t2\ta\t1\n2\t2\tb\t2\n3\t1\ta\t\n4\t2\tb\t3\n5\t1\tmissing\t\n",
    );
    let logger = recovery::bootstrap(&file_config(&log_path)).unwrap();
    let store = Store::new();

    let summary = recovery::replay(logger.as_ref(), &store).unwrap();

    assert_eq!(
        summary,
        ReplaySummary {
            events_applied: 5,
            puts: 3,
            deletes: 2,
            last_sequence: 5,
        }
    );
    assert!(matches!(store.get("a"), Err(KvError::KeyNotFound)));
    assert_eq!(store.get("b").unwrap(), "3");
    assert_eq!(store.len(), 1);
}

#[test]
fn test_replay_empty_log() {
    let (_temp, log_path) = setup_temp_log("");
    let logger = recovery::bootstrap(&file_config(&log_path)).unwrap();
    let store = Store::new();

    let summary = recovery::replay(logger.as_ref(), &store).unwrap();

    assert_eq!(summary, ReplaySummary::default());
    assert!(store.is_empty());
}

#[test]
fn test_replay_stops_at_corruption() {
    let (_temp, log_path) = setup_temp_log("1\t2\ta\t1\n5\t2\tb\t2\n4\t2\tc\t3\n");
    let logger = recovery::bootstrap(&file_config(&log_path)).unwrap();
    let store = Store::new();

    let err = recovery::replay(logger.as_ref(), &store).unwrap_err();

    assert!(matches!(err, KvError::OutOfSequence { previous: 5, found: 4 }));
    assert!(err.is_replay_error());
    assert!(store.get("c").is_err());
}

#[test]
fn test_replay_parse_error_is_fatal() {
    let (_temp, log_path) = setup_temp_log("1\t2\ta\t1\n2\t9\tb\t2\n");
    let logger = recovery::bootstrap(&file_config(&log_path)).unwrap();

    let err = recovery::replay(logger.as_ref(), &Store::new()).unwrap_err();

    assert!(matches!(err, KvError::Parse { line: 2, .. }));
    assert!(err.is_fatal());
}

// =============================================================================
// Full Recovery Tests
// =============================================================================

#[test]
fn test_recover_goes_live_and_continues_sequence() {
    let (_temp, log_path) = setup_temp_log("1\t2\ta\t1\n2\t2\tb\t2\n");
    let store = Store::new();

    let recovered = recovery::recover(&file_config(&log_path), &store).unwrap();
    assert_eq!(recovered.summary.last_sequence, 2);
    assert_eq!(store.get("a").unwrap(), "1");

    recovered.logger.write_delete("a");
    wait_for_lines(&log_path, 3);

    let contents = std::fs::read_to_string(&log_path).unwrap();
    assert!(contents.ends_with("3\t1\ta\t\n"));
}

#[test]
fn test_recover_refuses_corrupt_log() {
    let (_temp, log_path) = setup_temp_log("2\t2\ta\t1\n1\t2\tb\t2\n");

    let result = recovery::recover(&file_config(&log_path), &Store::new());

    assert!(matches!(result, Err(KvError::OutOfSequence { .. })));
}
