//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::collection::CollectionEngine;
use crate::error::{Result, VaultError};
use crate::protocol::{read_command, write_response, Command, Response, MAX_PAYLOAD_SIZE};
use crate::service::DocumentService;

/// Handles a single client connection
pub struct Connection<E: CollectionEngine> {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Shared document service
    service: Arc<DocumentService<E>>,

    /// Peer address for logging
    peer_addr: String,
}

impl<E: CollectionEngine> Connection<E> {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O
    pub fn new(stream: TcpStream, service: Arc<DocumentService<E>>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            service,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 = no timeout)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads commands in a loop and sends responses.
    /// Returns when the client disconnects or an error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let command = match read_command(&mut self.reader) {
                Ok(cmd) => cmd,
                Err(VaultError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(VaultError::Io(ref e))
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    // Windows reports TimedOut where unix reports WouldBlock
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    let _ = self.send_response(Response::from_error(&e));
                    return Err(e);
                }
            };

            tracing::trace!(
                "Received {:?} command from {}",
                command.command_type(),
                self.peer_addr
            );

            let response = match execute(&self.service, command) {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!("Command from {} failed: {}", self.peer_addr, e);
                    Response::from_error(&e)
                }
            };

            if let Err(e) = self.send_response(response) {
                if let VaultError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Send a response to the client
    ///
    /// Payloads the client could not accept are replaced by an error reply.
    fn send_response(&mut self, response: Response) -> Result<()> {
        let response = if response.payload.len() > MAX_PAYLOAD_SIZE as usize {
            tracing::warn!(
                "Response of {} bytes to {} exceeds the {} byte limit",
                response.payload.len(),
                self.peer_addr,
                MAX_PAYLOAD_SIZE
            );
            Response::error(&format!(
                "Response too large: {} bytes (max {})",
                response.payload.len(),
                MAX_PAYLOAD_SIZE
            ))
        } else {
            response
        };
        write_response(&mut self.writer, &response)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(kind: std::io::ErrorKind) -> bool {
    matches!(
        kind,
        std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
    )
}

/// Run one command against the service
pub fn execute<E: CollectionEngine>(
    service: &DocumentService<E>,
    command: Command,
) -> Result<Response> {
    let response = match command {
        Command::Insert {
            collection,
            doc,
            upload,
        } => {
            let mutation = service.insert(&collection, &doc, upload)?;
            Response::text(mutation.id.to_string())
        }
        Command::Get { collection, id } => {
            let doc = service.get(&collection, id)?;
            Response::ok(crate::store::JSON_CONTENT_TYPE, serde_json::to_vec(&doc)?)
        }
        Command::Page {
            collection,
            page,
            total,
        } => {
            let docs = service.get_page(&collection, page, total)?;
            Response::ok(crate::store::JSON_CONTENT_TYPE, serde_json::to_vec(&docs)?)
        }
        Command::Update {
            collection,
            id,
            doc,
        } => {
            service.update(&collection, id, &doc)?;
            Response::empty()
        }
        Command::Delete { collection, id } => {
            service.delete(&collection, id)?;
            Response::empty()
        }
        Command::Count { collection } => {
            Response::text(service.approx_doc_count(&collection)?.to_string())
        }
        Command::Fetch {
            collection,
            id,
            selector,
        } => {
            let fetched = service.fetch(&collection, id, &selector)?;
            Response::ok(fetched.content_type, fetched.bytes)
        }
        Command::Create { collection } => {
            service.create_collection(&collection)?;
            Response::empty()
        }
        Command::Drop { collection } => {
            service.drop_collection(&collection)?;
            Response::empty()
        }
        Command::Ping => Response::text("PONG"),
    };
    Ok(response)
}
