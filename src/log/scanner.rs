//! Log Scanner
//!
//! Sequential iteration over every frame in the log.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{KvError, Result};

use super::record::{frame_len, HEADER_SIZE};

/// Iterator over `(offset, frame)` pairs in file order
///
/// Frames are returned raw (not checksum-verified). A frame that runs past
/// the end of the file yields `TruncatedRecord` and ends the iteration.
pub struct LogScanner {
    reader: BufReader<File>,
    /// File length when the scan started; later appends are not visited
    file_len: u64,
    /// Offset of the next frame
    position: u64,
    done: bool,
}

impl LogScanner {
    /// Open a scanner over the log at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();

        Ok(Self {
            reader: BufReader::new(file),
            file_len,
            position: 0,
            done: false,
        })
    }

    /// Offset just past the last frame returned
    pub fn position(&self) -> u64 {
        self.position
    }

    fn read_frame(&mut self, offset: u64) -> Result<Vec<u8>> {
        let remaining = self.file_len - offset;
        if remaining < HEADER_SIZE as u64 {
            return Err(KvError::TruncatedRecord { offset });
        }

        let mut header = [0u8; HEADER_SIZE];
        self.reader.read_exact(&mut header)?;

        let total_len = frame_len(&header);
        if total_len > remaining {
            return Err(KvError::TruncatedRecord { offset });
        }

        let mut frame = vec![0u8; total_len as usize];
        frame[..HEADER_SIZE].copy_from_slice(&header);
        self.reader.read_exact(&mut frame[HEADER_SIZE..])?;

        Ok(frame)
    }
}

impl Iterator for LogScanner {
    type Item = Result<(u64, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.position >= self.file_len {
            return None;
        }

        let offset = self.position;
        match self.read_frame(offset) {
            Ok(frame) => {
                self.position += frame.len() as u64;
                Some(Ok((offset, frame)))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
