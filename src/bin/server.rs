//! kvlog Server Binary
//!
//! Replays the transaction log, then serves the TCP protocol.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use kvlog::network::Server;
use kvlog::{Config, Engine, SyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    File,
    Sqlite,
}

/// kvlog Server
#[derive(Parser, Debug)]
#[command(name = "kvlog-server")]
#[command(about = "Key-value store with a crash-recoverable transaction log")]
#[command(version)]
struct Args {
    /// Transaction log backend
    #[arg(short, long, value_enum, default_value = "file")]
    backend: Backend,

    /// Log file (file backend) or database file (sqlite backend)
    #[arg(short = 'p', long, default_value = "./kvlog_data/transaction.log")]
    log_path: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Capacity of the pending write queue
    #[arg(short, long, default_value = "16")]
    queue_capacity: usize,

    /// fsync the file log every N entries (1 = every write)
    #[arg(short = 'n', long, default_value = "100")]
    sync_every: usize,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kvlog=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("kvlog Server v{}", kvlog::VERSION);
    tracing::info!("Transaction log: {:?} at {}", args.backend, args.log_path);
    tracing::info!("Listen address: {}", args.listen);

    let sync_strategy = match args.sync_every {
        1 => SyncStrategy::EveryWrite,
        count => SyncStrategy::EveryNEntries { count },
    };

    let builder = Config::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .queue_capacity(args.queue_capacity)
        .sync_strategy(sync_strategy);
    let config = match args.backend {
        Backend::File => builder.file_log(&args.log_path),
        Backend::Sqlite => builder.sqlite_log(&args.log_path),
    }
    .build();

    // Bootstrapping and replay are fatal on failure
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Engine live with {} keys after replaying {} events",
        engine.store().len(),
        engine.replay_summary().events_applied
    );

    let server = match Server::bind(config, engine) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Server error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
