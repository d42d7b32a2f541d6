//! Response definitions
//!
//! Represents responses to clients.

use crate::error::{ErrorClass, VaultError};

/// Content type of plain-text payloads (IDs, counts, error messages)
pub const TEXT_CONTENT_TYPE: &str = "text/plain";

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
    BadRequest = 0x03,
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// MIME type of the payload
    pub content_type: String,

    /// Payload (document, artifact bytes, or error message)
    pub payload: Vec<u8>,
}

impl Response {
    /// Create an OK response with a typed payload
    pub fn ok(content_type: &str, payload: Vec<u8>) -> Self {
        Self {
            status: Status::Ok,
            content_type: content_type.to_string(),
            payload,
        }
    }

    /// Create an OK plain-text response
    pub fn text(text: impl Into<String>) -> Self {
        Self::ok(TEXT_CONTENT_TYPE, text.into().into_bytes())
    }

    /// Create an OK response with no payload
    pub fn empty() -> Self {
        Self::ok(TEXT_CONTENT_TYPE, Vec::new())
    }

    /// Create a NOT_FOUND response
    pub fn not_found(message: &str) -> Self {
        Self::with_message(Status::NotFound, message)
    }

    /// Create a BAD_REQUEST response
    pub fn bad_request(message: &str) -> Self {
        Self::with_message(Status::BadRequest, message)
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self::with_message(Status::Error, message)
    }

    /// Response for a failed command, status picked by error class
    pub fn from_error(err: &VaultError) -> Self {
        let message = err.to_string();
        match err.class() {
            ErrorClass::Client => Self::bad_request(&message),
            ErrorClass::NotFound => Self::not_found(&message),
            ErrorClass::Internal => Self::error(&message),
        }
    }

    /// Payload as UTF-8 text (lossy)
    pub fn text_payload(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    fn with_message(status: Status, message: &str) -> Self {
        Self {
            status,
            content_type: TEXT_CONTENT_TYPE.to_string(),
            payload: message.as_bytes().to_vec(),
        }
    }
}
