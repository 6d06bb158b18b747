//! TCP Server
//!
//! Accepts connections and hands each to its own handler thread.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{KvError, Result};
use super::Connection;

/// How long the acceptor sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// TCP server for kvlog
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    active: Arc<AtomicUsize>,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Bind the configured listen address
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            KvError::Network(format!("cannot bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            engine,
            listener,
            active: Arc::new(AtomicUsize::new(0)),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Flag that stops `run` once set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Accept connections until shutdown is signalled (blocking)
    pub fn run(&self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr()?);

        while !self.shutdown.load(Ordering::Relaxed) {
            let (stream, peer) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                    continue;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(KvError::Network(format!("accept failed: {}", e))),
            };

            if self.active.load(Ordering::Acquire) >= self.config.max_connections {
                tracing::warn!("Rejecting {}: connection limit reached", peer);
                drop(stream);
                continue;
            }

            // Handlers use blocking I/O with timeouts
            stream.set_nonblocking(false)?;

            let mut connection = Connection::new(stream, Arc::clone(&self.engine))?;
            connection.set_timeouts(self.config.read_timeout_ms, self.config.write_timeout_ms)?;

            let active = Arc::clone(&self.active);
            active.fetch_add(1, Ordering::AcqRel);

            let spawned = thread::Builder::new()
                .name(format!("conn-{}", peer))
                .spawn(move || {
                    if let Err(e) = connection.handle() {
                        tracing::warn!("Connection {} ended with error: {}", connection.peer_addr(), e);
                    }
                    active.fetch_sub(1, Ordering::AcqRel);
                });

            if let Err(e) = spawned {
                self.active.fetch_sub(1, Ordering::AcqRel);
                tracing::error!("Failed to spawn handler for {}: {}", peer, e);
            }
        }

        tracing::info!("Server shutting down");
        Ok(())
    }
}
