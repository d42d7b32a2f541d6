//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (V1 - Simple Binary)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0x01: INSERT - collection, JSON body, optional upload
//! - 0x02: GET    - collection, id
//! - 0x03: PAGE   - collection, page, total
//! - 0x04: UPDATE - collection, id, JSON body
//! - 0x05: DELETE - collection, id
//! - 0x06: COUNT  - collection
//! - 0x07: FETCH  - collection, id, artifact selector
//! - 0x08: CREATE - collection
//! - 0x09: DROP   - collection
//! - 0x0A: PING   - empty
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0x01: NOT_FOUND
//! - 0x02: ERROR
//! - 0x03: BAD_REQUEST

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType};
pub use response::{Response, Status, TEXT_CONTENT_TYPE};
pub use codec::{
    decode_command, decode_response, encode_command, encode_response, read_command,
    read_response, write_command, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
    RESPONSE_HEADER_SIZE,
};
