//! Client
//!
//! Blocking client for the shardvault wire protocol.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::collection::Document;
use crate::error::{Result, VaultError};
use crate::protocol::{read_response, write_command, Command, Response, Status};
use crate::service::{parse_document, parse_document_id, Fetched};
use crate::store::{ArtifactKind, Upload};
use crate::DocumentId;

/// A connection to a shardvault server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| VaultError::Network(format!("Failed to connect: {}", e)))?;
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Send a command and wait for its response, whatever the status
    pub fn request(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }

    /// Send a command; non-OK responses become `VaultError::Remote`
    fn call(&mut self, command: Command) -> Result<Response> {
        let response = self.request(&command)?;
        if response.status != Status::Ok {
            return Err(VaultError::Remote {
                status: response.status,
                message: response.text_payload(),
            });
        }
        Ok(response)
    }

    pub fn ping(&mut self) -> Result<()> {
        self.call(Command::Ping)?;
        Ok(())
    }

    /// Insert a document; returns the new ID
    pub fn insert(&mut self, collection: &str, doc: &str, upload: Option<Upload>) -> Result<DocumentId> {
        let response = self.call(Command::Insert {
            collection: collection.to_string(),
            doc: doc.to_string(),
            upload,
        })?;
        parse_document_id(&response.text_payload())
    }

    pub fn get(&mut self, collection: &str, id: DocumentId) -> Result<Document> {
        let response = self.call(Command::Get {
            collection: collection.to_string(),
            id,
        })?;
        parse_document(&response.text_payload())
    }

    /// One page of documents keyed by decimal ID
    pub fn page(&mut self, collection: &str, page: u64, total: u64) -> Result<Document> {
        let response = self.call(Command::Page {
            collection: collection.to_string(),
            page,
            total,
        })?;
        parse_document(&response.text_payload())
    }

    pub fn update(&mut self, collection: &str, id: DocumentId, doc: &str) -> Result<()> {
        self.call(Command::Update {
            collection: collection.to_string(),
            id,
            doc: doc.to_string(),
        })?;
        Ok(())
    }

    pub fn delete(&mut self, collection: &str, id: DocumentId) -> Result<()> {
        self.call(Command::Delete {
            collection: collection.to_string(),
            id,
        })?;
        Ok(())
    }

    pub fn count(&mut self, collection: &str) -> Result<u64> {
        let response = self.call(Command::Count {
            collection: collection.to_string(),
        })?;
        response
            .text_payload()
            .trim()
            .parse()
            .map_err(|_| VaultError::Protocol("COUNT reply is not a number".to_string()))
    }

    /// Fetch one artifact by selector (`json`, `meta`, `preview.jpg`, extension)
    pub fn fetch(&mut self, collection: &str, id: DocumentId, selector: &str) -> Result<Fetched> {
        let response = self.call(Command::Fetch {
            collection: collection.to_string(),
            id,
            selector: selector.to_string(),
        })?;

        // Map back onto the static content types the server knows
        let content_type = ArtifactKind::from_selector(selector)?.content_type();
        if content_type != response.content_type {
            tracing::debug!(
                "Server sent content type {} for selector {}, expected {}",
                response.content_type,
                selector,
                content_type
            );
        }
        Ok(Fetched {
            content_type,
            bytes: response.payload,
        })
    }

    pub fn create_collection(&mut self, collection: &str) -> Result<()> {
        self.call(Command::Create {
            collection: collection.to_string(),
        })?;
        Ok(())
    }

    pub fn drop_collection(&mut self, collection: &str) -> Result<()> {
        self.call(Command::Drop {
            collection: collection.to_string(),
        })?;
        Ok(())
    }
}
