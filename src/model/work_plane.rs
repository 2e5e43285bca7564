//! Work plane record.

use serde::{Deserialize, Serialize};

use super::{read_count, VectorBlock};
use crate::codec::{Decoder, Encoder, Record, WireType};
use crate::util::Result;

/// Process a work plane is intended for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineType {
    /// Powder bed fusion.
    #[default]
    Pbf,
    /// Laser metal deposition.
    Lmd,
    /// 2D laser marking or cutting.
    Marking,
    /// Value written by a newer producer; kept so it round-trips.
    #[serde(skip)]
    Unrecognized(i32),
}

impl MachineType {
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::Pbf,
            1 => Self::Lmd,
            2 => Self::Marking,
            other => Self::Unrecognized(other),
        }
    }

    pub fn to_i32(self) -> i32 {
        match self {
            Self::Pbf => 0,
            Self::Lmd => 1,
            Self::Marking => 2,
            Self::Unrecognized(v) => v,
        }
    }
}

/// One layer: pose, process settings and its vector blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkPlane {
    /// Vector blocks in append order. Never written as part of the shell.
    pub vector_blocks: Vec<VectorBlock>,
    pub x_pos_in_mm: f32,
    pub y_pos_in_mm: f32,
    pub z_pos_in_mm: f32,
    pub x_rot_in_deg: f32,
    pub y_rot_in_deg: f32,
    pub z_rot_in_deg: f32,
    pub num_blocks: u32,
    pub repeats: u32,
    /// Sequence index inside the job; assigned by the writer.
    pub work_plane_number: u32,
    pub machine_type: MachineType,
    pub additional_axis_positions: Vec<f32>,
    pub meta_data: Option<WorkPlaneMetaData>,
}

impl WorkPlane {
    /// Work plane at height `z` (mm) with no rotation.
    pub fn at_height(z: f32) -> Self {
        Self {
            z_pos_in_mm: z,
            ..Default::default()
        }
    }
}

impl Record for WorkPlane {
    fn encode(&self, enc: &mut Encoder) {
        for block in &self.vector_blocks {
            enc.message(1, block);
        }
        enc.float(2, self.x_pos_in_mm);
        enc.float(3, self.y_pos_in_mm);
        enc.float(4, self.z_pos_in_mm);
        enc.float(5, self.x_rot_in_deg);
        enc.float(6, self.y_rot_in_deg);
        enc.float(7, self.z_rot_in_deg);
        enc.int32(8, self.num_blocks as i32);
        enc.int32(9, self.repeats as i32);
        enc.int32(10, self.work_plane_number as i32);
        enc.int32(11, self.machine_type.to_i32());
        enc.packed_f32(12, &self.additional_axis_positions);
        if let Some(meta) = &self.meta_data {
            enc.message(13, meta);
        }
    }

    fn merge_field(&mut self, field: u32, wire: WireType, dec: &mut Decoder<'_>) -> Result<()> {
        match field {
            1 => self.vector_blocks.push(dec.read_message(wire)?),
            2 => self.x_pos_in_mm = dec.read_f32(wire)?,
            3 => self.y_pos_in_mm = dec.read_f32(wire)?,
            4 => self.z_pos_in_mm = dec.read_f32(wire)?,
            5 => self.x_rot_in_deg = dec.read_f32(wire)?,
            6 => self.y_rot_in_deg = dec.read_f32(wire)?,
            7 => self.z_rot_in_deg = dec.read_f32(wire)?,
            8 => self.num_blocks = read_count(dec, wire)?,
            9 => self.repeats = read_count(dec, wire)?,
            10 => self.work_plane_number = read_count(dec, wire)?,
            11 => self.machine_type = MachineType::from_i32(dec.read_i32(wire)?),
            12 => dec.read_packed_f32(wire, &mut self.additional_axis_positions)?,
            13 => self.meta_data = Some(dec.read_message(wire)?),
            _ => dec.skip(wire)?,
        }
        Ok(())
    }
}

/// Summary statistics for a work plane.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkPlaneMetaData {
    pub total_scan_distance_in_mm: f32,
    pub total_jump_distance_in_mm: f32,
    pub layer_thickness_in_mm: f32,
}

impl Record for WorkPlaneMetaData {
    fn encode(&self, enc: &mut Encoder) {
        enc.float(1, self.total_scan_distance_in_mm);
        enc.float(2, self.total_jump_distance_in_mm);
        enc.float(3, self.layer_thickness_in_mm);
    }

    fn merge_field(&mut self, field: u32, wire: WireType, dec: &mut Decoder<'_>) -> Result<()> {
        match field {
            1 => self.total_scan_distance_in_mm = dec.read_f32(wire)?,
            2 => self.total_jump_distance_in_mm = dec.read_f32(wire)?,
            3 => self.layer_thickness_in_mm = dec.read_f32(wire)?,
            _ => dec.skip(wire)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_type_codes() {
        for t in [
            MachineType::Pbf,
            MachineType::Lmd,
            MachineType::Marking,
            MachineType::Unrecognized(17),
        ] {
            assert_eq!(MachineType::from_i32(t.to_i32()), t);
        }
    }

    #[test]
    fn test_work_plane_decode() {
        let plane = WorkPlane {
            z_pos_in_mm: 0.05,
            x_rot_in_deg: -90.0,
            repeats: 2,
            work_plane_number: 7,
            machine_type: MachineType::Lmd,
            additional_axis_positions: vec![1.5, 0.0, -3.25],
            meta_data: Some(WorkPlaneMetaData {
                layer_thickness_in_mm: 0.05,
                ..Default::default()
            }),
            ..Default::default()
        };
        let decoded = WorkPlane::from_bytes(&plane.to_bytes()).unwrap();
        assert_eq!(decoded, plane);
    }

    #[test]
    fn test_default_work_plane_encodes_empty() {
        assert!(WorkPlane::default().to_bytes().is_empty());
    }
}
