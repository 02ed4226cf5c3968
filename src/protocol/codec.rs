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
//! ### Payload by Command Type
//! Every string is `str_len (4 bytes) + utf-8 bytes`; every list is
//! `count (4 bytes) + strings`.
//! - GET:       key
//! - PUT:       key + value
//! - DELETE:    key
//! - PING:      empty
//! - BATCH_PUT: keys (list) + values (list)
//! - RANGE:     start + end
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! A RANGE response payload is `count (4 bytes)` followed by
//! `key + value` string pairs.

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use super::{Command, Response, Status};
use crate::error::{KvError, Result};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut payload = BytesMut::new();

    match command {
        Command::Get { key } | Command::Delete { key } => put_string(&mut payload, key),
        Command::Put { key, value } => {
            put_string(&mut payload, key);
            put_string(&mut payload, value);
        }
        Command::Ping => {}
        Command::BatchPut { keys, values } => {
            put_strings(&mut payload, keys);
            put_strings(&mut payload, values);
        }
        Command::Range { start, end } => {
            put_string(&mut payload, start);
            put_string(&mut payload, end);
        }
    }

    frame(command.command_type() as u8, &payload)
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_type, mut payload) = split_frame(bytes, "request")?;

    let command = match cmd_type {
        0x01 => Command::Get {
            key: get_string(&mut payload, "GET command: key")?,
        },
        0x02 => Command::Put {
            key: get_string(&mut payload, "PUT command: key")?,
            value: get_string(&mut payload, "PUT command: value")?,
        },
        0x03 => Command::Delete {
            key: get_string(&mut payload, "DELETE command: key")?,
        },
        0x04 => Command::Ping,
        0x05 => Command::BatchPut {
            keys: get_strings(&mut payload, "BATCH_PUT command: keys")?,
            values: get_strings(&mut payload, "BATCH_PUT command: values")?,
        },
        0x06 => Command::Range {
            start: get_string(&mut payload, "RANGE command: start")?,
            end: get_string(&mut payload, "RANGE command: end")?,
        },
        _ => {
            return Err(KvError::Protocol(format!(
                "Unknown command type: 0x{:02x}",
                cmd_type
            )))
        }
    };

    if payload.has_remaining() {
        return Err(KvError::Protocol(format!(
            "{:?} command: unexpected {} trailing bytes",
            command.command_type(),
            payload.remaining()
        )));
    }

    Ok(command)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    frame(response.status as u8, payload)
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = split_frame(bytes, "response")?;

    let status = match status_byte {
        0x00 => Status::Ok,
        0x01 => Status::NotFound,
        0x02 => Status::Error,
        0x03 => Status::BadRequest,
        _ => {
            return Err(KvError::Protocol(format!(
                "Unknown response status: 0x{:02x}",
                status_byte
            )))
        }
    };

    let payload = if payload.is_empty() {
        None
    } else {
        Some(payload.to_vec())
    };

    Ok(Response { status, payload })
}

/// Encode RANGE results as a response payload
pub fn encode_pairs(pairs: &[(String, String)]) -> Vec<u8> {
    let mut payload = BytesMut::new();
    payload.put_u32(pairs.len() as u32);
    for (key, value) in pairs {
        put_string(&mut payload, key);
        put_string(&mut payload, value);
    }
    payload.to_vec()
}

/// Decode a RANGE response payload
pub fn decode_pairs(bytes: &[u8]) -> Result<Vec<(String, String)>> {
    let mut payload = bytes;
    let count = get_count(&mut payload, "RANGE response")?;

    let mut pairs = Vec::with_capacity(count.min(payload.remaining() / 8));
    for _ in 0..count {
        let key = get_string(&mut payload, "RANGE response: key")?;
        let value = get_string(&mut payload, "RANGE response: value")?;
        pairs.push((key, value));
    }

    Ok(pairs)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    decode_command(&read_frame(reader)?)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    writer.write_all(&encode_command(command))?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    decode_response(&read_frame(reader)?)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(&encode_response(response))?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Private Helpers
// =============================================================================

fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(tag);
    message.put_u32(payload.len() as u32);
    message.put_slice(payload);
    message.to_vec()
}

/// Read header + payload of one message without interpreting it
fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(KvError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let mut message = vec![0u8; HEADER_SIZE + payload_len as usize];
    message[..HEADER_SIZE].copy_from_slice(&header);
    reader.read_exact(&mut message[HEADER_SIZE..])?;

    Ok(message)
}

/// Split a message into its tag byte and exactly-sized payload
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(KvError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let tag = bytes[0];
    let payload_len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);

    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(KvError::Protocol(format!(
            "{} payload too large: {} bytes (max {})",
            what, payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let total_len = HEADER_SIZE + payload_len as usize;
    if bytes.len() < total_len {
        return Err(KvError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((tag, &bytes[HEADER_SIZE..total_len]))
}

fn put_string(buf: &mut BytesMut, s: &str) {
    buf.put_u32(s.len() as u32);
    buf.put_slice(s.as_bytes());
}

fn put_strings(buf: &mut BytesMut, strings: &[String]) {
    buf.put_u32(strings.len() as u32);
    for s in strings {
        put_string(buf, s);
    }
}

fn get_count(buf: &mut &[u8], what: &str) -> Result<usize> {
    if buf.remaining() < 4 {
        return Err(KvError::Protocol(format!("{}: missing count", what)));
    }
    Ok(buf.get_u32() as usize)
}

fn get_string(buf: &mut &[u8], what: &str) -> Result<String> {
    if buf.remaining() < 4 {
        return Err(KvError::Protocol(format!("{}: missing length", what)));
    }

    let len = buf.get_u32() as usize;
    if buf.remaining() < len {
        return Err(KvError::Protocol(format!(
            "{}: incomplete (expected {}, got {})",
            what,
            len,
            buf.remaining()
        )));
    }

    let raw = buf.copy_to_bytes(len);
    String::from_utf8(raw.to_vec())
        .map_err(|_| KvError::Protocol(format!("{}: invalid UTF-8", what)))
}

fn get_strings(buf: &mut &[u8], what: &str) -> Result<Vec<String>> {
    let count = get_count(buf, what)?;

    let mut strings = Vec::with_capacity(count.min(buf.remaining() / 4));
    for _ in 0..count {
        strings.push(get_string(buf, what)?);
    }

    Ok(strings)
}
