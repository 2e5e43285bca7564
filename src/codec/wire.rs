//! Protobuf-compatible wire primitives.
//!
//! Every field is prefixed by a key `field << 3 | wire_type`. Integers use
//! LEB128 varints, floats are fixed-width little-endian, and strings, nested
//! messages and packed repeated fields are length-delimited.

use byteorder::{ByteOrder, LittleEndian};

use super::record::Record;
use crate::util::{Error, Result};

/// Maximum number of bytes a u64 varint can occupy.
pub const MAX_VARINT_LEN: usize = 10;

/// Wire type carried in the low three bits of a field key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint,
    Fixed64,
    LengthDelimited,
    Fixed32,
}

impl WireType {
    /// Decode a wire type from the low bits of a key.
    pub fn from_bits(bits: u8) -> Result<Self> {
        match bits {
            0 => Ok(Self::Varint),
            1 => Ok(Self::Fixed64),
            2 => Ok(Self::LengthDelimited),
            5 => Ok(Self::Fixed32),
            other => Err(Error::corrupt(format!("unsupported wire type {other}"))),
        }
    }

    /// Wire type bits for key encoding.
    pub fn bits(self) -> u8 {
        match self {
            Self::Varint => 0,
            Self::Fixed64 => 1,
            Self::LengthDelimited => 2,
            Self::Fixed32 => 5,
        }
    }
}

/// Append `value` as a LEB128 varint.
pub fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decode a LEB128 varint from `buf` starting at `*pos`, advancing `*pos`.
///
/// Running off the end of `buf` is a [`Error::ShortRead`]; a varint longer
/// than ten bytes is a [`Error::CorruptRecord`].
pub fn decode_varint(buf: &[u8], pos: &mut usize) -> Result<u64> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    for _ in 0..MAX_VARINT_LEN {
        let Some(&byte) = buf.get(*pos) else {
            return Err(Error::ShortRead(*pos as u64));
        };
        *pos += 1;

        let payload = (byte & 0x7F) as u64;
        if shift == 63 && payload > 1 {
            return Err(Error::corrupt("varint overflows u64"));
        }
        result |= payload << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
    Err(Error::corrupt("varint longer than 10 bytes"))
}

/// Number of bytes `value` occupies as a varint.
pub fn varint_size(mut value: u64) -> usize {
    let mut size = 1;
    while value >= 0x80 {
        value >>= 7;
        size += 1;
    }
    size
}

/// Field encoder writing into an owned buffer.
///
/// Scalar writers skip default values (zero, empty), matching proto3.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn key(&mut self, field: u32, wire: WireType) {
        encode_varint(((field as u64) << 3) | wire.bits() as u64, &mut self.buf);
    }

    pub fn uint64(&mut self, field: u32, value: u64) {
        if value != 0 {
            self.key(field, WireType::Varint);
            encode_varint(value, &mut self.buf);
        }
    }

    pub fn int64(&mut self, field: u32, value: i64) {
        self.uint64(field, value as u64);
    }

    /// Negative values are sign-extended to ten bytes, as protobuf does.
    pub fn int32(&mut self, field: u32, value: i32) {
        self.uint64(field, value as i64 as u64);
    }

    /// Compared bitwise so that `-0.0` survives a round trip.
    pub fn float(&mut self, field: u32, value: f32) {
        if value.to_bits() != 0 {
            self.key(field, WireType::Fixed32);
            let mut bytes = [0u8; 4];
            LittleEndian::write_f32(&mut bytes, value);
            self.buf.extend_from_slice(&bytes);
        }
    }

    pub fn string(&mut self, field: u32, value: &str) {
        if !value.is_empty() {
            self.bytes(field, value.as_bytes());
        }
    }

    /// Length-delimited field. Always written, even when empty.
    pub fn bytes(&mut self, field: u32, value: &[u8]) {
        self.key(field, WireType::LengthDelimited);
        encode_varint(value.len() as u64, &mut self.buf);
        self.buf.extend_from_slice(value);
    }

    /// Nested message. Always written, so an empty message stays present.
    pub fn message<R: Record>(&mut self, field: u32, record: &R) {
        self.nested(field, |enc| record.encode(enc));
    }

    /// Nested message built by a closure (used for map entries).
    pub fn nested(&mut self, field: u32, build: impl FnOnce(&mut Encoder)) {
        let mut inner = Encoder::new();
        build(&mut inner);
        self.bytes(field, &inner.buf);
    }

    pub fn packed_f32(&mut self, field: u32, values: &[f32]) {
        if values.is_empty() {
            return;
        }
        self.key(field, WireType::LengthDelimited);
        encode_varint((values.len() * 4) as u64, &mut self.buf);
        let start = self.buf.len();
        self.buf.resize(start + values.len() * 4, 0);
        LittleEndian::write_f32_into(values, &mut self.buf[start..]);
    }

    pub fn packed_u64(&mut self, field: u32, values: &[u64]) {
        if values.is_empty() {
            return;
        }
        let mut body = Vec::with_capacity(values.len() * 2);
        for &v in values {
            encode_varint(v, &mut body);
        }
        self.bytes(field, &body);
    }
}

/// Field decoder over a borrowed record body.
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Read the next field key, or `None` at the end of the body.
    pub fn next_key(&mut self) -> Result<Option<(u32, WireType)>> {
        if self.remaining() == 0 {
            return Ok(None);
        }
        let key = self.read_varint()?;
        let wire = WireType::from_bits((key & 0x7) as u8)?;
        let field = key >> 3;
        if field == 0 || field > u32::MAX as u64 {
            return Err(Error::corrupt(format!("invalid field number {field}")));
        }
        Ok(Some((field as u32, wire)))
    }

    /// Varints inside a framed body can only be truncated by corruption.
    pub fn read_varint(&mut self) -> Result<u64> {
        decode_varint(self.buf, &mut self.pos).map_err(|e| match e {
            Error::ShortRead(_) => Error::corrupt("truncated varint"),
            other => other,
        })
    }

    pub fn read_u64(&mut self, wire: WireType) -> Result<u64> {
        expect(wire, WireType::Varint)?;
        self.read_varint()
    }

    pub fn read_i64(&mut self, wire: WireType) -> Result<i64> {
        Ok(self.read_u64(wire)? as i64)
    }

    pub fn read_i32(&mut self, wire: WireType) -> Result<i32> {
        Ok(self.read_u64(wire)? as i32)
    }

    pub fn read_f32(&mut self, wire: WireType) -> Result<f32> {
        expect(wire, WireType::Fixed32)?;
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    pub fn read_bytes(&mut self, wire: WireType) -> Result<&'a [u8]> {
        expect(wire, WireType::LengthDelimited)?;
        let len = self.read_varint()?;
        let len = usize::try_from(len).map_err(|_| Error::corrupt("length overflows usize"))?;
        self.take(len)
    }

    pub fn read_string(&mut self, wire: WireType) -> Result<String> {
        let bytes = self.read_bytes(wire)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::corrupt(format!("invalid UTF-8: {e}")))
    }

    pub fn read_message<R: Record>(&mut self, wire: WireType) -> Result<R> {
        R::from_bytes(self.read_bytes(wire)?)
    }

    /// Append a repeated float field, accepting packed and unpacked encodings.
    pub fn read_packed_f32(&mut self, wire: WireType, out: &mut Vec<f32>) -> Result<()> {
        if wire == WireType::Fixed32 {
            out.push(self.read_f32(wire)?);
            return Ok(());
        }
        let body = self.read_bytes(wire)?;
        if body.len() % 4 != 0 {
            return Err(Error::corrupt("packed float field is not a multiple of 4 bytes"));
        }
        let start = out.len();
        out.resize(start + body.len() / 4, 0.0);
        LittleEndian::read_f32_into(body, &mut out[start..]);
        Ok(())
    }

    /// Append a repeated varint field, accepting packed and unpacked encodings.
    pub fn read_packed_u64(&mut self, wire: WireType, out: &mut Vec<u64>) -> Result<()> {
        if wire == WireType::Varint {
            out.push(self.read_varint()?);
            return Ok(());
        }
        let mut inner = Decoder::new(self.read_bytes(wire)?);
        while inner.remaining() > 0 {
            out.push(inner.read_varint()?);
        }
        Ok(())
    }

    /// Skip a field this record does not know about.
    pub fn skip(&mut self, wire: WireType) -> Result<()> {
        match wire {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::Fixed64 => {
                self.take(8)?;
            }
            WireType::Fixed32 => {
                self.take(4)?;
            }
            WireType::LengthDelimited => {
                self.read_bytes(wire)?;
            }
        }
        Ok(())
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::corrupt(format!(
                "field needs {len} bytes, only {} left",
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }
}

fn expect(actual: WireType, expected: WireType) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(Error::corrupt(format!("expected {expected:?} field, found {actual:?}")))
    }
}
