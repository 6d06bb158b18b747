//! SQLite Transaction Logger
//!
//! Table-backed log. The database assigns sequences through an
//! auto-incrementing primary key; this backend keeps no counter.
//!
//! ## Schema
//! ```text
//! transactions(
//!     sequence INTEGER PRIMARY KEY AUTOINCREMENT,
//!     type     SMALLINT NOT NULL,
//!     key      TEXT NOT NULL,
//!     value    TEXT
//! )
//! ```

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use rusqlite::{params, Connection, OpenFlags};

use crate::config::DEFAULT_QUEUE_CAPACITY;
use crate::error::{KvError, Result};
use super::pipeline::WritePipeline;
use super::{Event, EventSink, EventType, TransactionLogger};

/// How long a statement waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const TABLE_EXISTS: &str =
    "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'transactions')";

const CREATE_TABLE: &str = "CREATE TABLE transactions (
    sequence INTEGER PRIMARY KEY AUTOINCREMENT,
    type     SMALLINT NOT NULL,
    key      TEXT NOT NULL,
    value    TEXT
)";

const INSERT_EVENT: &str = "INSERT INTO transactions (type, key, value) VALUES (?1, ?2, ?3)";

const SELECT_EVENTS: &str = "SELECT sequence, type, key, value FROM transactions ORDER BY sequence";

/// Transaction logger writing to an SQLite `transactions` table
pub struct SqliteTransactionLogger {
    path: PathBuf,
    pipeline: WritePipeline,
}

impl SqliteTransactionLogger {
    /// Open the database with the default queue capacity
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, DEFAULT_QUEUE_CAPACITY)
    }

    /// Connect, then create the `transactions` table if it is missing
    ///
    /// An existing table is used as-is. Any failure is reported as
    /// `Initialization`.
    pub fn open_with(path: impl AsRef<Path>, queue_capacity: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let conn = Connection::open(&path).map_err(|e| {
            KvError::Initialization(format!(
                "failed to open database {}: {}",
                path.display(),
                e
            ))
        })?;

        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| KvError::Initialization(format!("failed to configure connection: {}", e)))?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| KvError::Initialization(format!("failed to open db connection: {}", e)))?;

        let exists = table_exists(&conn)
            .map_err(|e| KvError::Initialization(format!("failed to verify table exists: {}", e)))?;
        if !exists {
            conn.execute(CREATE_TABLE, [])
                .map_err(|e| KvError::Initialization(format!("failed to create table: {}", e)))?;
            tracing::info!("Created transactions table in {}", path.display());
        }

        Ok(Self {
            path,
            pipeline: WritePipeline::new(queue_capacity, Box::new(SqliteSink { conn })),
        })
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn table_exists(conn: &Connection) -> rusqlite::Result<bool> {
    conn.query_row(TABLE_EXISTS, [], |row| row.get(0))
}

impl TransactionLogger for SqliteTransactionLogger {
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
        let spawned = thread::Builder::new()
            .name("txlog-replay".to_string())
            .spawn(move || {
                if let Err(e) = scan_table(&path, &events_tx) {
                    let _ = errors_tx.send(e);
                }
            });

        if let Err(e) = spawned {
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
        self.pipeline.start("sqlite");
    }
}

/// Stream every row in ascending sequence order on a separate connection
fn scan_table(path: &Path, events: &Sender<Event>) -> Result<()> {
    let read_err = |e: rusqlite::Error| KvError::ReplayRead(e.to_string());

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(read_err)?;
    conn.busy_timeout(BUSY_TIMEOUT).map_err(read_err)?;
    let mut stmt = conn.prepare(SELECT_EVENTS).map_err(read_err)?;
    let mut rows = stmt.query([]).map_err(read_err)?;

    let mut count = 0u64;
    while let Some(row) = rows.next().map_err(read_err)? {
        let sequence: i64 = row.get(0).map_err(read_err)?;
        let kind: u8 = row.get(1).map_err(read_err)?;
        let key: String = row.get(2).map_err(read_err)?;
        let value: Option<String> = row.get(3).map_err(read_err)?;

        let event = Event {
            sequence: u64::try_from(sequence).map_err(|_| KvError::Parse {
                line: count + 1,
                reason: format!("negative sequence {}", sequence),
            })?,
            kind: EventType::try_from(kind).map_err(|_| KvError::Parse {
                line: count + 1,
                reason: format!("unknown event type {}", kind),
            })?,
            key,
            value: value.unwrap_or_default(),
        };

        if events.send(event).is_err() {
            tracing::debug!("Replay consumer went away after {} rows", count);
            return Ok(());
        }
        count += 1;
    }

    tracing::debug!("Replayed {} rows from {}", count, path.display());
    Ok(())
}

/// Writer-side state for the SQLite backend
struct SqliteSink {
    conn: Connection,
}

impl EventSink for SqliteSink {
    fn persist(&mut self, event: &Event) -> Result<u64> {
        let value = match event.kind {
            EventType::Put => Some(event.value.as_str()),
            EventType::Delete => None,
        };

        let mut stmt = self.conn.prepare_cached(INSERT_EVENT)?;
        stmt.execute(params![event.kind as u8, event.key, value])?;

        let sequence = self.conn.last_insert_rowid();
        u64::try_from(sequence)
            .map_err(|_| KvError::Database(rusqlite::Error::IntegralValueOutOfRange(0, sequence)))
    }
}
