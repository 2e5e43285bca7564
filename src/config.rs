//! Job configuration file.
//!
//! A JSON document describing everything about a job except its geometry.
//! Every field is optional:
//!
//! ```json
//! {
//!   "job_name": "bracket",
//!   "author": "line 3",
//!   "layer_height_mm": 0.03,
//!   "machine_type": "pbf",
//!   "marking_params_key": 1,
//!   "marking_params": { "1": { "name": "contour", "laser_power_in_w": 180.0 } },
//!   "parts": { "1": { "name": "bracket", "material": "Ti6Al4V" } },
//!   "part_key": 1,
//!   "parameters": { "shielding_gas": "argon" }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::convert::ConvertOptions;
use crate::model::{Job, JobMetaData, JobParameters, MachineType, MarkingParams, Part};
use crate::util::{Error, Result};

/// Layer height used when the configuration does not set one.
pub const DEFAULT_LAYER_HEIGHT_MM: f64 = 0.05;

/// Current job metadata version written by this crate.
pub const JOB_VERSION: i64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub job_name: String,
    pub author: String,
    pub description: String,
    pub layer_height_mm: f64,
    pub machine_type: MachineType,
    pub marking_params_key: i32,
    pub marking_params: BTreeMap<i32, MarkingParams>,
    pub part_key: i32,
    pub parts: BTreeMap<i32, Part>,
    pub parameters: BTreeMap<String, String>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            job_name: String::new(),
            author: String::new(),
            description: String::new(),
            layer_height_mm: DEFAULT_LAYER_HEIGHT_MM,
            machine_type: MachineType::default(),
            marking_params_key: 0,
            marking_params: BTreeMap::new(),
            part_key: 0,
            parts: BTreeMap::new(),
            parameters: BTreeMap::new(),
        }
    }
}

impl JobConfig {
    /// Read a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        Self::from_json(&text)
    }

    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(self.layer_height_mm > 0.0 && self.layer_height_mm.is_finite()) {
            return Err(Error::Config(format!(
                "layer_height_mm must be positive, got {}",
                self.layer_height_mm
            )));
        }
        if !self.marking_params.is_empty()
            && !self.marking_params.contains_key(&self.marking_params_key)
        {
            return Err(Error::Config(format!(
                "marking_params_key {} is not defined in marking_params",
                self.marking_params_key
            )));
        }
        Ok(())
    }

    /// Job record (without work planes) for this configuration.
    pub fn to_job(&self, job_creation_time: u64) -> Job {
        Job {
            work_planes: Vec::new(),
            job_meta_data: Some(JobMetaData {
                job_creation_time,
                version: JOB_VERSION,
                job_name: self.job_name.clone(),
                author: self.author.clone(),
                description: self.description.clone(),
            }),
            marking_params_map: self.marking_params.clone(),
            parts_map: self.parts.clone(),
            num_work_planes: 0,
            job_parameters: (!self.parameters.is_empty()).then(|| JobParameters {
                entries: self.parameters.clone(),
            }),
        }
    }

    /// Conversion settings for this configuration.
    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            marking_params_key: self.marking_params_key,
            part_key: self.part_key,
            machine_type: self.machine_type,
            layer_thickness_in_mm: self.layer_height_mm as f32,
        }
    }
}
