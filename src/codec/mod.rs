//! Record codec.
//!
//! Records are framed as a varint length followed by a protobuf-compatible
//! body. The writer only needs [`write_delimited`]; readers locate records
//! by offset with [`read_delimited`].

mod record;
pub mod wire;

pub use record::*;
pub use wire::{Decoder, Encoder, WireType};
