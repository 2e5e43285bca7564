//! OVF container constants and the offset codec.

use std::io::Write;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::util::Result;

/// Magic bytes at the start of an OVF file.
pub const OVF_MAGIC: &[u8; 4] = b"OVF!";

/// Size of a stored offset (placeholder or backpatched value).
pub const OFFSET_SIZE: usize = 8;

/// Position of the Job LUT offset in the header.
pub const JOB_LUT_OFFSET_POS: u64 = OVF_MAGIC.len() as u64;

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = OVF_MAGIC.len() + OFFSET_SIZE;

/// Value stored in a placeholder until it is backpatched.
pub const UNPATCHED_OFFSET: u64 = 0;

/// Encode an offset as 8 little-endian bytes, independent of host order.
#[inline]
pub fn encode_offset(value: u64) -> [u8; OFFSET_SIZE] {
    let mut buf = [0u8; OFFSET_SIZE];
    LittleEndian::write_u64(&mut buf, value);
    buf
}

/// Decode 8 little-endian bytes into an offset.
#[inline]
pub fn decode_offset(bytes: [u8; OFFSET_SIZE]) -> u64 {
    LittleEndian::read_u64(&bytes)
}

/// Write an offset to `sink` in little-endian order.
pub fn write_offset<W: Write + ?Sized>(value: u64, sink: &mut W) -> Result<()> {
    sink.write_u64::<LittleEndian>(value)?;
    Ok(())
}
