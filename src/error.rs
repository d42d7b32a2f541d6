//! Error types for shardvault
//!
//! Provides a unified error type for all operations, grouped into the three
//! classes a caller has to tell apart: bad input, missing data, and internal
//! failures.

use thiserror::Error;

use crate::protocol::Status;
use crate::DocumentId;

/// Result type alias using VaultError
pub type Result<T> = std::result::Result<T, VaultError>;

/// Unified error type for shardvault operations
#[derive(Debug, Error)]
pub enum VaultError {
    // -------------------------------------------------------------------------
    // Client Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("'{0}' is not a valid JSON document")]
    InvalidDocument(String),

    #[error("Invalid document ID '{0}'")]
    InvalidDocumentId(String),

    #[error("Collection '{0}' does not exist")]
    CollectionNotFound(String),

    #[error("Collection '{0}' already exists")]
    CollectionExists(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Not Found
    // -------------------------------------------------------------------------
    #[error("No such document ID {0}")]
    DocumentNotFound(DocumentId),

    /// Carries no filesystem path; the message is sent to remote clients
    #[error("No '{artifact}' artifact for document {id} in collection '{collection}'")]
    ArtifactNotFound {
        collection: String,
        id: DocumentId,
        artifact: String,
    },

    // -------------------------------------------------------------------------
    // Internal Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Log corruption detected: {0}")]
    Corruption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server replied {status:?}: {message}")]
    Remote { status: Status, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification used to pick a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request was malformed; nothing was changed
    Client,
    /// The document or artifact does not exist
    NotFound,
    /// Storage, image or transport failure
    Internal,
}

impl VaultError {
    /// Classify this error
    pub fn class(&self) -> ErrorClass {
        match self {
            VaultError::InvalidArgument(_)
            | VaultError::InvalidDocument(_)
            | VaultError::InvalidDocumentId(_)
            | VaultError::CollectionNotFound(_)
            | VaultError::CollectionExists(_)
            | VaultError::Protocol(_) => ErrorClass::Client,
            VaultError::DocumentNotFound(_) | VaultError::ArtifactNotFound { .. } => {
                ErrorClass::NotFound
            }
            VaultError::Remote { status, .. } => match status {
                Status::BadRequest => ErrorClass::Client,
                Status::NotFound => ErrorClass::NotFound,
                Status::Ok | Status::Error => ErrorClass::Internal,
            },
            _ => ErrorClass::Internal,
        }
    }

    /// True for missing documents and artifacts
    pub fn is_not_found(&self) -> bool {
        self.class() == ErrorClass::NotFound
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(e: serde_json::Error) -> Self {
        VaultError::Serialization(e.to_string())
    }
}

impl From<bincode::Error> for VaultError {
    fn from(e: bincode::Error) -> Self {
        VaultError::Serialization(e.to_string())
    }
}
