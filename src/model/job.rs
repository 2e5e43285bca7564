//! Job record and its metadata/parameter types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    decode_int_map_entry, decode_string_map_entry, encode_int_map, encode_string_map, read_count,
    WorkPlane,
};
use crate::codec::{Decoder, Encoder, Record, WireType};
use crate::util::Result;

/// Top-level marking task. Exactly one per file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Job {
    /// Work planes in append order. Never written as part of the job shell.
    pub work_planes: Vec<WorkPlane>,
    pub job_meta_data: Option<JobMetaData>,
    /// Marking parameter sets, referenced by `VectorBlock::marking_params_key`.
    pub marking_params_map: BTreeMap<i32, MarkingParams>,
    /// Part definitions, referenced by `VectorBlockMetaData::part_key`.
    pub parts_map: BTreeMap<i32, Part>,
    pub num_work_planes: u32,
    pub job_parameters: Option<JobParameters>,
}

impl Job {
    /// Create a job carrying only a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            job_meta_data: Some(JobMetaData {
                job_name: name.into(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Job name, or an empty string when no metadata is set.
    pub fn name(&self) -> &str {
        self.job_meta_data
            .as_ref()
            .map(|m| m.job_name.as_str())
            .unwrap_or("")
    }
}

impl Record for Job {
    fn encode(&self, enc: &mut Encoder) {
        for plane in &self.work_planes {
            enc.message(1, plane);
        }
        if let Some(meta) = &self.job_meta_data {
            enc.message(2, meta);
        }
        encode_int_map(enc, 3, &self.marking_params_map);
        encode_int_map(enc, 4, &self.parts_map);
        enc.int32(5, self.num_work_planes as i32);
        if let Some(params) = &self.job_parameters {
            enc.message(6, params);
        }
    }

    fn merge_field(&mut self, field: u32, wire: WireType, dec: &mut Decoder<'_>) -> Result<()> {
        match field {
            1 => self.work_planes.push(dec.read_message(wire)?),
            2 => self.job_meta_data = Some(dec.read_message(wire)?),
            3 => decode_int_map_entry(wire, dec, &mut self.marking_params_map)?,
            4 => decode_int_map_entry(wire, dec, &mut self.parts_map)?,
            5 => self.num_work_planes = read_count(dec, wire)?,
            6 => self.job_parameters = Some(dec.read_message(wire)?),
            _ => dec.skip(wire)?,
        }
        Ok(())
    }
}

/// Descriptive job metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobMetaData {
    /// Seconds since the Unix epoch.
    pub job_creation_time: u64,
    pub version: i64,
    pub job_name: String,
    pub author: String,
    pub description: String,
}

impl Record for JobMetaData {
    fn encode(&self, enc: &mut Encoder) {
        enc.uint64(1, self.job_creation_time);
        enc.int64(2, self.version);
        enc.string(3, &self.job_name);
        enc.string(4, &self.author);
        enc.string(5, &self.description);
    }

    fn merge_field(&mut self, field: u32, wire: WireType, dec: &mut Decoder<'_>) -> Result<()> {
        match field {
            1 => self.job_creation_time = dec.read_u64(wire)?,
            2 => self.version = dec.read_i64(wire)?,
            3 => self.job_name = dec.read_string(wire)?,
            4 => self.author = dec.read_string(wire)?,
            5 => self.description = dec.read_string(wire)?,
            _ => dec.skip(wire)?,
        }
        Ok(())
    }
}

/// Free-form machine/process parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobParameters {
    pub entries: BTreeMap<String, String>,
}

impl Record for JobParameters {
    fn encode(&self, enc: &mut Encoder) {
        encode_string_map(enc, 1, &self.entries);
    }

    fn merge_field(&mut self, field: u32, wire: WireType, dec: &mut Decoder<'_>) -> Result<()> {
        match field {
            1 => decode_string_map_entry(wire, dec, &mut self.entries)?,
            _ => dec.skip(wire)?,
        }
        Ok(())
    }
}

/// One laser parameter set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkingParams {
    pub name: String,
    pub laser_power_in_w: f32,
    pub laser_speed_in_mm_per_s: f32,
    pub laser_focus_shift_in_mm: f32,
    pub jump_speed_in_mm_s: f32,
}

impl Record for MarkingParams {
    fn encode(&self, enc: &mut Encoder) {
        enc.string(1, &self.name);
        enc.float(2, self.laser_power_in_w);
        enc.float(3, self.laser_speed_in_mm_per_s);
        enc.float(4, self.laser_focus_shift_in_mm);
        enc.float(5, self.jump_speed_in_mm_s);
    }

    fn merge_field(&mut self, field: u32, wire: WireType, dec: &mut Decoder<'_>) -> Result<()> {
        match field {
            1 => self.name = dec.read_string(wire)?,
            2 => self.laser_power_in_w = dec.read_f32(wire)?,
            3 => self.laser_speed_in_mm_per_s = dec.read_f32(wire)?,
            4 => self.laser_focus_shift_in_mm = dec.read_f32(wire)?,
            5 => self.jump_speed_in_mm_s = dec.read_f32(wire)?,
            _ => dec.skip(wire)?,
        }
        Ok(())
    }
}

/// A part placed in the job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Part {
    pub name: String,
    pub material: String,
}

impl Record for Part {
    fn encode(&self, enc: &mut Encoder) {
        enc.string(1, &self.name);
        enc.string(2, &self.material);
    }

    fn merge_field(&mut self, field: u32, wire: WireType, dec: &mut Decoder<'_>) -> Result<()> {
        match field {
            1 => self.name = dec.read_string(wire)?,
            2 => self.material = dec.read_string(wire)?,
            _ => dec.skip(wire)?,
        }
        Ok(())
    }
}
