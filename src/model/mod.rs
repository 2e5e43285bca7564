//! OVF record types.
//!
//! - [`Job`] - top-level task: metadata, parameter maps, work planes
//! - [`WorkPlane`] - one layer with its pose and vector blocks
//! - [`VectorBlock`] - opaque toolpath payload
//! - [`JobLut`] / [`WorkPlaneLut`] - random-access offset tables

mod job;
mod lut;
mod vector_block;
mod work_plane;

pub use job::*;
pub use lut::*;
pub use vector_block::*;
pub use work_plane::*;

use std::collections::BTreeMap;

use crate::codec::{Decoder, Encoder, Record, WireType};
use crate::util::{Error, Result};

// Map fields are repeated entry messages with key = 1, value = 2.
const MAP_KEY: u32 = 1;
const MAP_VALUE: u32 = 2;

pub(crate) fn encode_int_map<R: Record>(enc: &mut Encoder, field: u32, map: &BTreeMap<i32, R>) {
    for (key, value) in map {
        enc.nested(field, |entry| {
            entry.int32(MAP_KEY, *key);
            entry.message(MAP_VALUE, value);
        });
    }
}

pub(crate) fn decode_int_map_entry<R: Record>(
    wire: WireType,
    dec: &mut Decoder<'_>,
    map: &mut BTreeMap<i32, R>,
) -> Result<()> {
    let mut entry = Decoder::new(dec.read_bytes(wire)?);
    let mut key = 0;
    let mut value = R::default();
    while let Some((field, wire)) = entry.next_key()? {
        match field {
            MAP_KEY => key = entry.read_i32(wire)?,
            MAP_VALUE => value = entry.read_message(wire)?,
            _ => entry.skip(wire)?,
        }
    }
    map.insert(key, value);
    Ok(())
}

pub(crate) fn encode_string_map(enc: &mut Encoder, field: u32, map: &BTreeMap<String, String>) {
    for (key, value) in map {
        enc.nested(field, |entry| {
            entry.string(MAP_KEY, key);
            entry.string(MAP_VALUE, value);
        });
    }
}

pub(crate) fn decode_string_map_entry(
    wire: WireType,
    dec: &mut Decoder<'_>,
    map: &mut BTreeMap<String, String>,
) -> Result<()> {
    let mut entry = Decoder::new(dec.read_bytes(wire)?);
    let mut key = String::new();
    let mut value = String::new();
    while let Some((field, wire)) = entry.next_key()? {
        match field {
            MAP_KEY => key = entry.read_string(wire)?,
            MAP_VALUE => value = entry.read_string(wire)?,
            _ => entry.skip(wire)?,
        }
    }
    map.insert(key, value);
    Ok(())
}

/// Decode a non-negative count field.
pub(crate) fn read_count(dec: &mut Decoder<'_>, wire: WireType) -> Result<u32> {
    let value = dec.read_i32(wire)?;
    u32::try_from(value).map_err(|_| Error::corrupt(format!("negative count {value}")))
}
