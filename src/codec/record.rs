//! Length-delimited record framing.
//!
//! A record on disk is `varint(body_len) || body`. Offsets stored in LUTs
//! always point at the first byte of the length prefix.

use std::io::Write;

use super::wire::{decode_varint, encode_varint, varint_size, Decoder, Encoder, WireType};
use crate::util::{Error, Result};

/// A structured message with a protobuf-compatible body encoding.
pub trait Record: Default {
    /// Write every non-default field into `enc`.
    fn encode(&self, enc: &mut Encoder);

    /// Merge one decoded field into `self`. Unknown fields must be skipped.
    fn merge_field(&mut self, field: u32, wire: WireType, dec: &mut Decoder<'_>) -> Result<()>;

    /// Body length in bytes (without length prefix).
    fn encoded_len(&self) -> usize {
        self.to_bytes().len()
    }

    /// Encode the body (without length prefix).
    fn to_bytes(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        self.encode(&mut enc);
        enc.into_bytes()
    }

    /// Decode a body (without length prefix).
    fn from_bytes(buf: &[u8]) -> Result<Self> {
        let mut record = Self::default();
        let mut dec = Decoder::new(buf);
        while let Some((field, wire)) = dec.next_key()? {
            record.merge_field(field, wire, &mut dec)?;
        }
        Ok(record)
    }
}

/// Encode `record` with its length prefix.
pub fn encode_delimited<R: Record>(record: &R) -> Vec<u8> {
    let body = record.to_bytes();
    let mut out = Vec::with_capacity(varint_size(body.len() as u64) + body.len());
    encode_varint(body.len() as u64, &mut out);
    out.extend_from_slice(&body);
    out
}

/// Write `record` with its length prefix; returns the number of bytes written.
pub fn write_delimited<R: Record, W: Write>(record: &R, sink: &mut W) -> Result<u64> {
    let framed = encode_delimited(record);
    sink.write_all(&framed)?;
    Ok(framed.len() as u64)
}

/// Return the body slice of the record framed at `offset`.
///
/// An offset at or past the end of `buf`, or a body that runs past it, is a
/// [`Error::ShortRead`].
pub fn delimited_body(buf: &[u8], offset: u64) -> Result<&[u8]> {
    let start = usize::try_from(offset).map_err(|_| Error::ShortRead(offset))?;
    if start >= buf.len() {
        return Err(Error::ShortRead(offset));
    }
    let mut pos = start;
    let len = decode_varint(buf, &mut pos)?;
    let end = usize::try_from(len)
        .ok()
        .and_then(|len| pos.checked_add(len))
        .filter(|&end| end <= buf.len())
        .ok_or(Error::ShortRead(buf.len() as u64))?;
    Ok(&buf[pos..end])
}

/// Decode the record framed at `offset` in `buf`.
pub fn read_delimited<R: Record>(buf: &[u8], offset: u64) -> Result<R> {
    R::from_bytes(delimited_body(buf, offset)?)
}
