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
//! - 0x01: GET       - Payload: key
//! - 0x02: PUT       - Payload: key + value
//! - 0x03: DEL       - Payload: key
//! - 0x04: PING      - Payload: empty
//! - 0x05: BATCH_PUT - Payload: keys + values
//! - 0x06: RANGE     - Payload: start + end
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0x01: NOT_FOUND   (missing, deleted or evicted key)
//! - 0x02: ERROR       (storage failure)
//! - 0x03: BAD_REQUEST (batch length mismatch, inverted range)

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType};
pub use response::{Response, Status};
pub use codec::{
    decode_command, decode_pairs, decode_response, encode_command, encode_pairs,
    encode_response, read_command, read_response, write_command, write_response,
    HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
