//! OVF writer stream.
//!
//! Buffered file sink that tracks the write cursor itself, so recording an
//! offset never costs a syscall.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::codec::{encode_delimited, Record};
use crate::container::format::write_offset;
use crate::util::{Error, Result};

/// Output stream for writing OVF data.
pub struct OStream {
    writer: BufWriter<File>,
    pos: u64,
}

impl OStream {
    /// Create (or truncate) the file at `path` for writing.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| Error::SinkOpen {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            writer: BufWriter::with_capacity(1024 * 1024, file),
            pos: 0,
        })
    }

    /// Get the current write position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Write bytes and advance position.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    /// Write an 8-byte little-endian offset.
    pub fn write_offset(&mut self, value: u64) -> Result<()> {
        write_offset(value, &mut self.writer)?;
        self.pos += 8;
        Ok(())
    }

    /// Write a length-delimited record; returns the bytes written.
    pub fn write_record<R: Record>(&mut self, record: &R) -> Result<u64> {
        let framed = encode_delimited(record);
        self.write_bytes(&framed)?;
        Ok(framed.len() as u64)
    }

    /// Seek to a position and return the current position.
    pub fn seek(&mut self, pos: u64) -> Result<u64> {
        self.writer.flush()?;
        let new_pos = self.writer.seek(SeekFrom::Start(pos))?;
        self.pos = new_pos;
        Ok(new_pos)
    }

    /// Seek to end and return the position.
    pub fn seek_end(&mut self) -> Result<u64> {
        self.writer.flush()?;
        let new_pos = self.writer.seek(SeekFrom::End(0))?;
        self.pos = new_pos;
        Ok(new_pos)
    }

    /// Overwrite the placeholder at `at` with `value`, then return to the end.
    pub fn backpatch(&mut self, at: u64, value: u64) -> Result<()> {
        self.seek(at)?;
        self.write_offset(value)?;
        self.seek_end()?;
        Ok(())
    }

    /// Flush the buffer to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
