//! Command definitions
//!
//! Represents requests from clients.

use crate::store::Upload;
use crate::DocumentId;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Insert = 0x01,
    Get = 0x02,
    Page = 0x03,
    Update = 0x04,
    Delete = 0x05,
    Count = 0x06,
    Fetch = 0x07,
    Create = 0x08,
    Drop = 0x09,
    Ping = 0x0A,
}

impl CommandType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        let ty = match byte {
            0x01 => CommandType::Insert,
            0x02 => CommandType::Get,
            0x03 => CommandType::Page,
            0x04 => CommandType::Update,
            0x05 => CommandType::Delete,
            0x06 => CommandType::Count,
            0x07 => CommandType::Fetch,
            0x08 => CommandType::Create,
            0x09 => CommandType::Drop,
            0x0A => CommandType::Ping,
            _ => return None,
        };
        Some(ty)
    }
}

/// A parsed command
#[derive(Debug, Clone)]
pub enum Command {
    /// Insert a JSON document, optionally with an attachment
    Insert {
        collection: String,
        doc: String,
        upload: Option<Upload>,
    },

    /// Read a document
    Get { collection: String, id: DocumentId },

    /// Read one page of documents
    Page {
        collection: String,
        page: u64,
        total: u64,
    },

    /// Replace a document's JSON
    Update {
        collection: String,
        id: DocumentId,
        doc: String,
    },

    /// Delete a document and its artifacts
    Delete { collection: String, id: DocumentId },

    /// Approximate document count
    Count { collection: String },

    /// Read one artifact by type selector
    Fetch {
        collection: String,
        id: DocumentId,
        selector: String,
    },

    /// Create a collection
    Create { collection: String },

    /// Drop a collection
    Drop { collection: String },

    /// Ping (health check)
    Ping,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Insert { .. } => CommandType::Insert,
            Command::Get { .. } => CommandType::Get,
            Command::Page { .. } => CommandType::Page,
            Command::Update { .. } => CommandType::Update,
            Command::Delete { .. } => CommandType::Delete,
            Command::Count { .. } => CommandType::Count,
            Command::Fetch { .. } => CommandType::Fetch,
            Command::Create { .. } => CommandType::Create,
            Command::Drop { .. } => CommandType::Drop,
            Command::Ping => CommandType::Ping,
        }
    }
}
