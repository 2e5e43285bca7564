//! Look-up tables written after their referents.

use crate::codec::{Decoder, Encoder, Record, WireType};
use crate::util::Result;

/// Job-level table, the last record in a file.
///
/// Each entry is the offset of a work plane's 8-byte placeholder, not of the
/// work plane LUT itself; readers dereference it once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobLut {
    pub work_plane_positions: Vec<u64>,
    pub job_shell_position: u64,
}

impl Record for JobLut {
    fn encode(&self, enc: &mut Encoder) {
        enc.packed_u64(1, &self.work_plane_positions);
        enc.uint64(2, self.job_shell_position);
    }

    fn merge_field(&mut self, field: u32, wire: WireType, dec: &mut Decoder<'_>) -> Result<()> {
        match field {
            1 => dec.read_packed_u64(wire, &mut self.work_plane_positions)?,
            2 => self.job_shell_position = dec.read_u64(wire)?,
            _ => dec.skip(wire)?,
        }
        Ok(())
    }
}

/// Work-plane table. Entries point directly at vector block records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkPlaneLut {
    pub vector_blocks_positions: Vec<u64>,
    pub work_plane_shell_position: u64,
}

impl Record for WorkPlaneLut {
    fn encode(&self, enc: &mut Encoder) {
        enc.packed_u64(1, &self.vector_blocks_positions);
        enc.uint64(2, self.work_plane_shell_position);
    }

    fn merge_field(&mut self, field: u32, wire: WireType, dec: &mut Decoder<'_>) -> Result<()> {
        match field {
            1 => dec.read_packed_u64(wire, &mut self.vector_blocks_positions)?,
            2 => self.work_plane_shell_position = dec.read_u64(wire)?,
            _ => dec.skip(wire)?,
        }
        Ok(())
    }
}
