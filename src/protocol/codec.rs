//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload Fields
//! - str/bytes: len (4) + bytes
//! - u64:       8 bytes
//! - upload:    flag (1); if 1 then filename (str) + content type (str) + data (bytes)
//!
//! ### Payload by Command Type
//! - INSERT: collection + doc + upload
//! - GET:    collection + id
//! - PAGE:   collection + page + total
//! - UPDATE: collection + id + doc
//! - DELETE: collection + id
//! - COUNT:  collection
//! - FETCH:  collection + id + selector
//! - CREATE: collection
//! - DROP:   collection
//! - PING:   empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬──────────┬──────────────┬──────────────┐
//! │Status(1) │ CtLen(1) │ Len (4)  │ Content-Type │   Payload    │
//! └──────────┴──────────┴──────────┴──────────────┴──────────────┘
//! ```
//!
//! All integers are big-endian.

use std::io::{Read, Write};

use crate::error::{Result, VaultError};
use crate::store::Upload;

use super::{Command, CommandType, Response, Status};

/// Request header size: 1 byte command + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Response header size: 1 byte status + 1 byte content-type length + 4 bytes length
pub const RESPONSE_HEADER_SIZE: usize = 6;

/// Maximum payload size (32 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 32 * 1024 * 1024;

// =============================================================================
// Payload Helpers
// =============================================================================

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    put_bytes(buf, s.as_bytes());
}

fn put_u64(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_be_bytes());
}

/// Cursor over a command payload
struct PayloadReader<'a> {
    command: &'static str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    fn new(command: &'static str, bytes: &'a [u8]) -> Self {
        Self {
            command,
            bytes,
            pos: 0,
        }
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        let remaining = self.bytes.len() - self.pos;
        if remaining < len {
            return Err(VaultError::Protocol(format!(
                "{} command: incomplete {} (expected {}, got {})",
                self.command, what, len, remaining
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    fn u64(&mut self, what: &str) -> Result<u64> {
        let b = self.take(8, what)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_be_bytes(arr))
    }

    fn bytes(&mut self, what: &str) -> Result<&'a [u8]> {
        let b = self.take(4, what)?;
        let len = u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as usize;
        self.take(len, what)
    }

    fn string(&mut self, what: &str) -> Result<String> {
        let b = self.bytes(what)?;
        String::from_utf8(b.to_vec()).map_err(|_| {
            VaultError::Protocol(format!("{} command: {} is not valid UTF-8", self.command, what))
        })
    }

    fn upload(&mut self) -> Result<Option<Upload>> {
        match self.u8("upload flag")? {
            0 => Ok(None),
            1 => {
                let filename = self.string("filename")?;
                let content_type = self.string("content type")?;
                let data = self.bytes("upload data")?.to_vec();
                Ok(Some(Upload::new(filename, content_type, data)))
            }
            flag => Err(VaultError::Protocol(format!(
                "{} command: bad upload flag 0x{:02x}",
                self.command, flag
            ))),
        }
    }

    fn finish(self) -> Result<()> {
        if self.pos != self.bytes.len() {
            return Err(VaultError::Protocol(format!(
                "{} command: {} trailing bytes",
                self.command,
                self.bytes.len() - self.pos
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Vec<u8> {
    let cmd_type = command.command_type() as u8;

    let mut payload = Vec::new();
    match command {
        Command::Insert {
            collection,
            doc,
            upload,
        } => {
            put_str(&mut payload, collection);
            put_str(&mut payload, doc);
            match upload {
                Some(upload) => {
                    payload.push(1);
                    put_str(&mut payload, &upload.filename);
                    put_str(&mut payload, &upload.content_type);
                    put_bytes(&mut payload, &upload.data);
                }
                None => payload.push(0),
            }
        }
        Command::Get { collection, id } | Command::Delete { collection, id } => {
            put_str(&mut payload, collection);
            put_u64(&mut payload, *id);
        }
        Command::Page {
            collection,
            page,
            total,
        } => {
            put_str(&mut payload, collection);
            put_u64(&mut payload, *page);
            put_u64(&mut payload, *total);
        }
        Command::Update {
            collection,
            id,
            doc,
        } => {
            put_str(&mut payload, collection);
            put_u64(&mut payload, *id);
            put_str(&mut payload, doc);
        }
        Command::Fetch {
            collection,
            id,
            selector,
        } => {
            put_str(&mut payload, collection);
            put_u64(&mut payload, *id);
            put_str(&mut payload, selector);
        }
        Command::Count { collection }
        | Command::Create { collection }
        | Command::Drop { collection } => {
            put_str(&mut payload, collection);
        }
        Command::Ping => {}
    }

    let mut message = Vec::with_capacity(HEADER_SIZE + payload.len());
    message.push(cmd_type);
    message.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    message.extend_from_slice(&payload);

    message
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    if bytes.len() < HEADER_SIZE {
        return Err(VaultError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let cmd_byte = bytes[0];
    let payload_len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;

    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(VaultError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(VaultError::Protocol(format!(
            "Incomplete payload: expected {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }

    let cmd_type = CommandType::from_byte(cmd_byte).ok_or_else(|| {
        VaultError::Protocol(format!("Unknown command type: 0x{:02x}", cmd_byte))
    })?;

    decode_payload(cmd_type, &bytes[HEADER_SIZE..total_len])
}

fn decode_payload(cmd_type: CommandType, payload: &[u8]) -> Result<Command> {
    let command = match cmd_type {
        CommandType::Insert => {
            let mut r = PayloadReader::new("INSERT", payload);
            let command = Command::Insert {
                collection: r.string("collection")?,
                doc: r.string("document")?,
                upload: r.upload()?,
            };
            r.finish()?;
            command
        }
        CommandType::Get => {
            let mut r = PayloadReader::new("GET", payload);
            let command = Command::Get {
                collection: r.string("collection")?,
                id: r.u64("id")?,
            };
            r.finish()?;
            command
        }
        CommandType::Page => {
            let mut r = PayloadReader::new("PAGE", payload);
            let command = Command::Page {
                collection: r.string("collection")?,
                page: r.u64("page")?,
                total: r.u64("total")?,
            };
            r.finish()?;
            command
        }
        CommandType::Update => {
            let mut r = PayloadReader::new("UPDATE", payload);
            let command = Command::Update {
                collection: r.string("collection")?,
                id: r.u64("id")?,
                doc: r.string("document")?,
            };
            r.finish()?;
            command
        }
        CommandType::Delete => {
            let mut r = PayloadReader::new("DELETE", payload);
            let command = Command::Delete {
                collection: r.string("collection")?,
                id: r.u64("id")?,
            };
            r.finish()?;
            command
        }
        CommandType::Count => {
            let mut r = PayloadReader::new("COUNT", payload);
            let command = Command::Count {
                collection: r.string("collection")?,
            };
            r.finish()?;
            command
        }
        CommandType::Fetch => {
            let mut r = PayloadReader::new("FETCH", payload);
            let command = Command::Fetch {
                collection: r.string("collection")?,
                id: r.u64("id")?,
                selector: r.string("selector")?,
            };
            r.finish()?;
            command
        }
        CommandType::Create => {
            let mut r = PayloadReader::new("CREATE", payload);
            let command = Command::Create {
                collection: r.string("collection")?,
            };
            r.finish()?;
            command
        }
        CommandType::Drop => {
            let mut r = PayloadReader::new("DROP", payload);
            let command = Command::Drop {
                collection: r.string("collection")?,
            };
            r.finish()?;
            command
        }
        CommandType::Ping => {
            if !payload.is_empty() {
                return Err(VaultError::Protocol(format!(
                    "PING command: unexpected payload of {} bytes",
                    payload.len()
                )));
            }
            Command::Ping
        }
    };
    Ok(command)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + content_type_len (1) + payload_len (4) + content_type + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    // Content types are short ASCII; anything longer is cut
    let ct = response.content_type.as_bytes();
    let ct = &ct[..ct.len().min(u8::MAX as usize)];

    let mut message = Vec::with_capacity(RESPONSE_HEADER_SIZE + ct.len() + response.payload.len());
    message.push(response.status as u8);
    message.push(ct.len() as u8);
    message.extend_from_slice(&(response.payload.len() as u32).to_be_bytes());
    message.extend_from_slice(ct);
    message.extend_from_slice(&response.payload);

    message
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    if bytes.len() < RESPONSE_HEADER_SIZE {
        return Err(VaultError::Protocol(format!(
            "Incomplete response header: expected {} bytes, got {}",
            RESPONSE_HEADER_SIZE,
            bytes.len()
        )));
    }

    let status_byte = bytes[0];
    let ct_len = bytes[1] as usize;
    let payload_len = u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]) as usize;

    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(VaultError::Protocol(format!(
            "Response payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let total_len = RESPONSE_HEADER_SIZE + ct_len + payload_len;
    if bytes.len() < total_len {
        return Err(VaultError::Protocol(format!(
            "Incomplete response payload: expected {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }

    let status = match status_byte {
        0x00 => Status::Ok,
        0x01 => Status::NotFound,
        0x02 => Status::Error,
        0x03 => Status::BadRequest,
        _ => {
            return Err(VaultError::Protocol(format!(
                "Unknown response status: 0x{:02x}",
                status_byte
            )))
        }
    };

    let ct_end = RESPONSE_HEADER_SIZE + ct_len;
    let content_type = String::from_utf8(bytes[RESPONSE_HEADER_SIZE..ct_end].to_vec())
        .map_err(|_| VaultError::Protocol("Response content type is not valid UTF-8".to_string()))?;

    Ok(Response {
        status,
        content_type,
        payload: bytes[ct_end..total_len].to_vec(),
    })
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(VaultError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let mut full_message = vec![0u8; HEADER_SIZE + payload_len];
    full_message[..HEADER_SIZE].copy_from_slice(&header);
    reader.read_exact(&mut full_message[HEADER_SIZE..])?;

    decode_command(&full_message)
}

/// Write a command to a stream
///
/// Commands the peer would reject for size are refused before anything is
/// written.
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command);
    check_payload_size("Command", bytes.len() - HEADER_SIZE)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let mut header = [0u8; RESPONSE_HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let ct_len = header[1] as usize;
    let payload_len = u32::from_be_bytes([header[2], header[3], header[4], header[5]]) as usize;
    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(VaultError::Protocol(format!(
            "Response payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let mut full_message = vec![0u8; RESPONSE_HEADER_SIZE + ct_len + payload_len];
    full_message[..RESPONSE_HEADER_SIZE].copy_from_slice(&header);
    reader.read_exact(&mut full_message[RESPONSE_HEADER_SIZE..])?;

    decode_response(&full_message)
}

/// Write a response to a stream
///
/// A payload over [`MAX_PAYLOAD_SIZE`] is refused with a `Protocol` error and
/// nothing is written, so the stream stays in sync.
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    check_payload_size("Response", response.payload.len())?;
    let bytes = encode_response(response);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

fn check_payload_size(what: &str, len: usize) -> Result<()> {
    if len > MAX_PAYLOAD_SIZE as usize {
        return Err(VaultError::Protocol(format!(
            "{} payload too large: {} bytes (max {})",
            what, len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(())
}
