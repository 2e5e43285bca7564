//! Shell projection: a record minus its children, with the child count reset.
//!
//! The writer keeps the shell as running state and counts children itself
//! as they are appended. Struct literals are spelled out so that a new field
//! cannot be silently dropped.

use crate::model::{Job, WorkPlane};

/// Copy of `job` without work planes and with `num_work_planes = 0`.
pub fn job_shell(job: &Job) -> Job {
    Job {
        work_planes: Vec::new(),
        job_meta_data: job.job_meta_data.clone(),
        marking_params_map: job.marking_params_map.clone(),
        parts_map: job.parts_map.clone(),
        num_work_planes: 0,
        job_parameters: job.job_parameters.clone(),
    }
}

/// Copy of `plane` without vector blocks and with `num_blocks = 0`.
pub fn work_plane_shell(plane: &WorkPlane) -> WorkPlane {
    WorkPlane {
        vector_blocks: Vec::new(),
        x_pos_in_mm: plane.x_pos_in_mm,
        y_pos_in_mm: plane.y_pos_in_mm,
        z_pos_in_mm: plane.z_pos_in_mm,
        x_rot_in_deg: plane.x_rot_in_deg,
        y_rot_in_deg: plane.y_rot_in_deg,
        z_rot_in_deg: plane.z_rot_in_deg,
        num_blocks: 0,
        repeats: plane.repeats,
        work_plane_number: plane.work_plane_number,
        machine_type: plane.machine_type,
        additional_axis_positions: plane.additional_axis_positions.clone(),
        meta_data: plane.meta_data.clone(),
    }
}
