//! Recovery
//!
//! Startup sequence that rebuilds the store from the transaction log
//! before any new write is accepted.
//!
//! ```text
//! Bootstrapping ──▶ Replaying ──▶ Live
//! ```
//!
//! The transition happens once per process. Any failure before Live is
//! fatal: the store must not serve from a partially recovered state.

use crossbeam::channel;

use crate::config::{Config, LogBackend};
use crate::error::{KvError, Result};
use crate::store::KeyValueStore;
use super::{Event, EventType, FileTransactionLogger, SqliteTransactionLogger, TransactionLogger};

/// Phase of the startup state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogState {
    /// Opening the backend and verifying its file or schema
    Bootstrapping,

    /// Applying recorded history to the store
    Replaying,

    /// Writer running, new mutations accepted
    Live,
}

/// Result of a replay
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Number of events applied to the store
    pub events_applied: u64,

    /// Put events among them
    pub puts: u64,

    /// Delete events among them
    pub deletes: u64,

    /// Highest sequence seen (0 for an empty log)
    pub last_sequence: u64,
}

/// A logger that has finished replay and is live
pub struct Recovered {
    pub logger: Box<dyn TransactionLogger>,
    pub summary: ReplaySummary,
}

/// Open the configured backend
///
/// Every failure surfaces as `KvError::Initialization`.
pub fn bootstrap(config: &Config) -> Result<Box<dyn TransactionLogger>> {
    config.validate()?;
    tracing::info!("Transaction log state: {:?}", LogState::Bootstrapping);

    let logger: Box<dyn TransactionLogger> = match &config.log_backend {
        LogBackend::File { path } => Box::new(
            FileTransactionLogger::open_with(path, config.queue_capacity, config.sync_strategy)
                .map_err(into_initialization)?,
        ),
        LogBackend::Sqlite { path } => Box::new(
            SqliteTransactionLogger::open_with(path, config.queue_capacity)
                .map_err(into_initialization)?,
        ),
    };

    Ok(logger)
}

fn into_initialization(err: KvError) -> KvError {
    match err {
        KvError::Initialization(_) => err,
        other => KvError::Initialization(other.to_string()),
    }
}

/// Apply the logger's history to `store` in sequence order
///
/// Watches the event and error streams together; the first error from
/// either ends replay and is returned.
pub fn replay<S>(logger: &dyn TransactionLogger, store: &S) -> Result<ReplaySummary>
where
    S: KeyValueStore + ?Sized,
{
    tracing::info!("Transaction log state: {:?}", LogState::Replaying);

    let (events, errors) = logger.read_events();
    let never = channel::never();
    let mut errors_open = true;
    let mut summary = ReplaySummary::default();

    loop {
        let watch = if errors_open { &errors } else { &never };
        channel::select! {
            recv(watch) -> msg => match msg {
                Ok(err) => return Err(err),
                // Producer finished without error; keep draining events
                Err(_) => errors_open = false,
            },
            recv(events) -> msg => match msg {
                Ok(event) => apply(store, &event, &mut summary)?,
                Err(_) => {
                    let pending = if errors_open { errors.recv().ok() } else { None };
                    return finish(pending, summary);
                }
            },
        }
    }
}

/// Event stream closed; an error sent just before closing still wins
fn finish(pending: Option<KvError>, summary: ReplaySummary) -> Result<ReplaySummary> {
    if let Some(err) = pending {
        return Err(err);
    }
    tracing::info!(
        "Replayed {} events ({} puts, {} deletes), last sequence {}",
        summary.events_applied,
        summary.puts,
        summary.deletes,
        summary.last_sequence
    );
    Ok(summary)
}

fn apply<S>(store: &S, event: &Event, summary: &mut ReplaySummary) -> Result<()>
where
    S: KeyValueStore + ?Sized,
{
    match event.kind {
        EventType::Put => {
            store.put(event.key.clone(), event.value.clone())?;
            summary.puts += 1;
        }
        EventType::Delete => {
            store.delete(&event.key)?;
            summary.deletes += 1;
        }
    }
    summary.events_applied += 1;
    summary.last_sequence = summary.last_sequence.max(event.sequence);
    Ok(())
}

/// Start the writer. Call once, after replay succeeded.
pub fn go_live(logger: &dyn TransactionLogger) {
    logger.run();
    tracing::info!("Transaction log state: {:?}", LogState::Live);
}

/// Run the full startup sequence against `store`
pub fn recover<S>(config: &Config, store: &S) -> Result<Recovered>
where
    S: KeyValueStore + ?Sized,
{
    let logger = bootstrap(config)?;
    let summary = replay(logger.as_ref(), store)?;
    go_live(logger.as_ref());
    Ok(Recovered { logger, summary })
}
