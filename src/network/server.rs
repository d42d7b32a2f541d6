//! TCP Server
//!
//! Accepts connections and runs each one on its own thread.

use std::io::BufWriter;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::collection::CollectionEngine;
use crate::config::Config;
use crate::error::{Result, VaultError};
use crate::protocol::{write_response, Response};
use crate::service::DocumentService;

use super::Connection;

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// TCP server for shardvault
pub struct Server<E: CollectionEngine + 'static> {
    config: Config,
    service: Arc<DocumentService<E>>,
    listener: Option<TcpListener>,

    /// Set to stop the accept loop
    shutdown: Arc<AtomicBool>,

    /// Connections currently being served
    active: Arc<AtomicUsize>,

    /// Counter used to name connection threads
    next_conn_id: u64,
}

impl<E: CollectionEngine + 'static> Server<E> {
    /// Create a new server with the given config and service
    pub fn new(config: Config, service: Arc<DocumentService<E>>) -> Self {
        Self {
            config,
            service,
            listener: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
            next_conn_id: 0,
        }
    }

    /// Bind the listen address (idempotent); returns the bound address
    pub fn bind(&mut self) -> Result<SocketAddr> {
        if let Some(listener) = &self.listener {
            return Ok(listener.local_addr()?);
        }

        let listener = TcpListener::bind(&self.config.listen_addr).map_err(|e| {
            VaultError::Network(format!("Failed to bind {}: {}", self.config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;

        let addr = listener.local_addr()?;
        tracing::info!("Listening on {}", addr);
        self.listener = Some(listener);
        Ok(addr)
    }

    /// Start the server (blocking until shutdown)
    pub fn run(&mut self) -> Result<()> {
        self.bind()?;

        while !self.shutdown.load(Ordering::Relaxed) {
            let accepted = match &self.listener {
                Some(listener) => listener.accept(),
                None => return Err(VaultError::Network("Listener not bound".to_string())),
            };

            match accepted {
                Ok((stream, addr)) => self.dispatch(stream, addr),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                }
            }
        }

        tracing::info!("Server shutting down");
        self.listener = None;
        if let Err(e) = self.service.engine().sync_all() {
            tracing::error!("Failed to sync collections on shutdown: {}", e);
        }
        Ok(())
    }

    /// Signal the server to shutdown gracefully
    ///
    /// Stops accepting; open connections finish on their own.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Flag that stops the accept loop when set, usable from other threads
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    fn dispatch(&mut self, stream: TcpStream, addr: SocketAddr) {
        if self.active.load(Ordering::SeqCst) >= self.config.max_connections {
            tracing::warn!("Rejecting {}: connection limit {} reached", addr, self.config.max_connections);
            reject(stream);
            return;
        }

        // The listener is non-blocking; accepted streams must not be
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("Dropping {}: {}", addr, e);
            return;
        }

        self.next_conn_id += 1;
        let name = format!("shardvault-conn-{}", self.next_conn_id);
        let service = Arc::clone(&self.service);
        let active = Arc::clone(&self.active);
        let (read_ms, write_ms) = (self.config.read_timeout_ms, self.config.write_timeout_ms);

        active.fetch_add(1, Ordering::SeqCst);
        let spawned = thread::Builder::new().name(name).spawn({
            let active = Arc::clone(&active);
            move || {
                let result = Connection::new(stream, service).and_then(|mut conn| {
                    conn.set_timeouts(read_ms, write_ms)?;
                    conn.handle()
                });
                if let Err(e) = result {
                    tracing::debug!("Connection {} closed with error: {}", addr, e);
                }
                active.fetch_sub(1, Ordering::SeqCst);
            }
        });

        if let Err(e) = spawned {
            tracing::error!("Failed to spawn connection thread for {}: {}", addr, e);
            active.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Tell an over-limit client why it is being dropped
fn reject(stream: TcpStream) {
    let _ = stream.set_nonblocking(false);
    let mut writer = BufWriter::new(stream);
    let _ = write_response(&mut writer, &Response::error("Too many connections"));
}
