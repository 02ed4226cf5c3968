//! Log record definitions
//!
//! Defines a single record and its on-disk frame encoding.

use serde::{Deserialize, Serialize};

use crate::error::{KvError, Result};

/// Frame header size: CRC (4) + body length (4)
pub const HEADER_SIZE: usize = 8;

/// A single (key, value-or-tombstone) record in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    pub value: RecordValue,
}

/// Value half of a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordValue {
    /// A live value
    Value(String),

    /// The key is logically deleted as of this record
    Tombstone,
}

impl Record {
    /// A record storing `value` under `key`
    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: RecordValue::Value(value.into()),
        }
    }

    /// A tombstone record for `key`
    pub fn tombstone(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: RecordValue::Tombstone,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self.value, RecordValue::Tombstone)
    }

    /// Encode this record as a complete frame: CRC (4) + Len (4) + body
    pub fn encode(&self) -> Result<Vec<u8>> {
        let body = bincode::serialize(self).map_err(|e| KvError::Serialization(e.to_string()))?;

        let body_len = u32::try_from(body.len()).map_err(|_| {
            KvError::Serialization(format!(
                "record body of {} bytes exceeds the frame limit",
                body.len()
            ))
        })?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + body.len());
        frame.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
        frame.extend_from_slice(&body_len.to_le_bytes());
        frame.extend_from_slice(&body);

        Ok(frame)
    }

    /// Decode one frame from the start of `bytes`
    ///
    /// Returns the record and the number of bytes the frame occupies.
    /// Trailing bytes after the frame are ignored.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize)> {
        if bytes.len() < HEADER_SIZE {
            return Err(KvError::CorruptRecord(format!(
                "incomplete header: expected {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let stored_crc = read_u32(&bytes[0..4]);
        let body_len = read_u32(&bytes[4..8]) as usize;

        let total_len = HEADER_SIZE + body_len;
        if bytes.len() < total_len {
            return Err(KvError::CorruptRecord(format!(
                "incomplete body: expected {} bytes, got {}",
                body_len,
                bytes.len() - HEADER_SIZE
            )));
        }

        let body = &bytes[HEADER_SIZE..total_len];
        let computed_crc = crc32fast::hash(body);
        if computed_crc != stored_crc {
            return Err(KvError::CorruptRecord(format!(
                "checksum mismatch: stored {:08x}, computed {:08x}",
                stored_crc, computed_crc
            )));
        }

        let record: Record = bincode::deserialize(body)
            .map_err(|e| KvError::CorruptRecord(format!("undecodable body: {}", e)))?;

        Ok((record, total_len))
    }
}

/// Total frame length (header + body) announced by a frame header
pub fn frame_len(header: &[u8; HEADER_SIZE]) -> u64 {
    HEADER_SIZE as u64 + read_u32(&header[4..8]) as u64
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
