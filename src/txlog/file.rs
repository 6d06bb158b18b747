//! File Transaction Logger
//!
//! Append-only, tab-separated log file with a process-local sequence counter.
//!
//! ## Format
//! ```text
//! <sequence>\t<type>\t<key>\t<value>\n     type: 1 = Delete, 2 = Put
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{self, Receiver, Sender};

use crate::config::{SyncStrategy, DEFAULT_QUEUE_CAPACITY};
use crate::error::{KvError, Result};
use super::pipeline::WritePipeline;
use super::{Event, EventSink, TransactionLogger};

/// Transaction logger writing to a flat file
///
/// The last used sequence lives in `last_sequence`; replay advances it to
/// the highest sequence read so live writes continue without collision.
pub struct FileTransactionLogger {
    path: PathBuf,
    last_sequence: Arc<AtomicU64>,
    pipeline: WritePipeline,
}

impl FileTransactionLogger {
    /// Open or create the log file with default queue and sync settings
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, DEFAULT_QUEUE_CAPACITY, SyncStrategy::EveryWrite)
    }

    /// Open or create the log file
    ///
    /// Existing content is never truncated. Failure here is fatal for the
    /// store and is reported as `Initialization`.
    pub fn open_with(
        path: impl AsRef<Path>,
        queue_capacity: usize,
        sync_strategy: SyncStrategy,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                KvError::Initialization(format!(
                    "cannot create log directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                KvError::Initialization(format!(
                    "cannot open transaction log file {}: {}",
                    path.display(),
                    e
                ))
            })?;

        let last_sequence = Arc::new(AtomicU64::new(0));
        let sink = FileSink {
            file,
            last_sequence: Arc::clone(&last_sequence),
            sync_strategy,
            unsynced: 0,
            sync: File::sync_data,
        };

        tracing::debug!("Opened transaction log file {}", path.display());

        Ok(Self {
            path,
            last_sequence,
            pipeline: WritePipeline::new(queue_capacity, Box::new(sink)),
        })
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Highest sequence written or replayed so far
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence.load(Ordering::Acquire)
    }
}

impl TransactionLogger for FileTransactionLogger {
    fn write_put(&self, key: &str, value: &str) {
        self.pipeline.enqueue(Event::put(key, value));
    }

    fn write_delete(&self, key: &str) {
        self.pipeline.enqueue(Event::delete(key));
    }

    fn err(&self) -> Receiver<KvError> {
        self.pipeline.errors()
    }

    fn read_events(&self) -> (Receiver<Event>, Receiver<KvError>) {
        let (events_tx, events_rx) = channel::bounded(0);
        let (errors_tx, errors_rx) = channel::bounded(1);

        let path = self.path.clone();
        let last_sequence = Arc::clone(&self.last_sequence);

        let spawned = thread::Builder::new()
            .name("txlog-replay".to_string())
            .spawn(move || {
                if let Err(e) = scan_file(&path, &last_sequence, &events_tx) {
                    let _ = errors_tx.send(e);
                }
            });

        if let Err(e) = spawned {
            // Senders moved into the closure are dropped with it, so the
            // error has to travel on a fresh channel.
            let (tx, rx) = channel::bounded(1);
            let _ = tx.send(KvError::ReplayRead(format!(
                "cannot spawn replay thread: {}",
                e
            )));
            return (channel::never(), rx);
        }

        (events_rx, errors_rx)
    }

    fn run(&self) {
        self.pipeline.start("file");
    }
}

/// Read the log front to back, handing each event to `events`
///
/// Lines are split on `\n` only, so a `\r` inside a value comes back
/// unchanged. Stops at the first malformed line or non-increasing sequence.
/// Returns Ok early if the consumer hangs up.
fn scan_file(path: &Path, last_sequence: &AtomicU64, events: &Sender<Event>) -> Result<()> {
    let file = File::open(path).map_err(|e| {
        KvError::ReplayRead(format!("cannot open {}: {}", path.display(), e))
    })?;
    let reader = BufReader::new(file);

    let mut last = 0u64;
    for (index, bytes) in reader.split(b'\n').enumerate() {
        let line_no = index as u64 + 1;
        let bytes = bytes.map_err(|e| KvError::ReplayRead(e.to_string()))?;
        let line = String::from_utf8(bytes).map_err(|e| KvError::Parse {
            line: line_no,
            reason: format!("invalid UTF-8: {}", e),
        })?;
        let event = Event::parse_line(&line, line_no)?;

        if event.sequence <= last {
            return Err(KvError::OutOfSequence {
                previous: last,
                found: event.sequence,
            });
        }
        last = event.sequence;
        last_sequence.store(last, Ordering::Release);

        if events.send(event).is_err() {
            tracing::debug!("Replay consumer went away at sequence {}", last);
            return Ok(());
        }
    }

    tracing::debug!("Replayed {} up to sequence {}", path.display(), last);
    Ok(())
}

/// Append `line` through `out`, cutting `file` back to its previous length
/// if the write fails partway
///
/// `out` must write to `file`.
fn append_line<W: Write>(file: &File, out: &mut W, line: &[u8]) -> io::Result<()> {
    let len = file.metadata()?.len();
    if let Err(e) = out.write_all(line) {
        if let Err(truncate) = file.set_len(len) {
            tracing::error!(
                "Cannot remove torn record at offset {}: {}; replay will reject it",
                len,
                truncate
            );
        }
        return Err(e);
    }
    Ok(())
}

/// Writer-side state for the file backend
struct FileSink {
    file: File,
    last_sequence: Arc<AtomicU64>,
    sync_strategy: SyncStrategy,
    unsynced: usize,
    sync: fn(&File) -> io::Result<()>,
}

impl FileSink {
    fn check_encodable(event: &Event) -> Result<()> {
        if event.key.contains(['\t', '\n']) {
            return Err(KvError::Unencodable(
                "key contains a tab or newline".to_string(),
            ));
        }
        if event.value.contains('\n') {
            return Err(KvError::Unencodable("value contains a newline".to_string()));
        }
        Ok(())
    }

    fn maybe_sync(&mut self) -> io::Result<()> {
        self.unsynced += 1;
        let due = match self.sync_strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if due {
            (self.sync)(&self.file)?;
            self.unsynced = 0;
        }
        Ok(())
    }
}

impl EventSink for FileSink {
    /// Append one line and return its sequence
    ///
    /// A failed write leaves neither a partial line nor a used sequence. A
    /// failed sync comes back as `Unsynced`: the line is in the file and
    /// will replay, even though the caller sees an error.
    fn persist(&mut self, event: &Event) -> Result<u64> {
        Self::check_encodable(event)?;

        // Counter only moves once the line is written
        let sequence = self.last_sequence.load(Ordering::Acquire) + 1;
        let line = event.with_sequence(sequence).encode_line();
        append_line(&self.file, &mut &self.file, line.as_bytes())?;
        self.last_sequence.store(sequence, Ordering::Release);

        self.maybe_sync().map_err(|e| KvError::Unsynced {
            sequence,
            reason: e.to_string(),
        })?;
        Ok(sequence)
    }
}
