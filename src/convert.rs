//! Sliced layers to OVF.
//!
//! Each layer becomes one work plane at its height; each contour becomes one
//! line-sequence vector block.

use std::path::Path;

use tracing::{debug, info};

use crate::container::JobWriter;
use crate::model::{
    Job, MachineType, Points, VectorBlock, VectorBlockMetaData, VectorData, WorkPlane,
    WorkPlaneMetaData,
};
use crate::slicer::{Contour, SlicedLayer, Slicer};
use crate::util::Result;

/// Per-block and per-plane settings applied during conversion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertOptions {
    pub marking_params_key: i32,
    pub part_key: i32,
    pub machine_type: MachineType,
    /// Stored in each work plane's metadata when non-zero.
    pub layer_thickness_in_mm: f32,
}

/// What a conversion produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertSummary {
    pub work_planes: usize,
    pub vector_blocks: usize,
}

/// Line-sequence block for one contour, points flattened to `f32` pairs.
pub fn contour_to_vector_block(
    contour: &Contour,
    index: usize,
    options: &ConvertOptions,
) -> VectorBlock {
    let points = contour
        .points
        .iter()
        .flat_map(|p| [p.x as f32, p.y as f32])
        .collect();
    VectorBlock {
        data: Some(VectorData::LineSequence(Points::new(points))),
        marking_params_key: options.marking_params_key,
        meta_data: Some(VectorBlockMetaData {
            part_key: options.part_key,
            contour_index: index as u32,
        }),
        repeats: 0,
    }
}

/// Work plane header for one layer (no vector blocks).
pub fn layer_to_work_plane(layer: &SlicedLayer, options: &ConvertOptions) -> WorkPlane {
    let scan_distance: f64 = layer.contours.iter().map(Contour::length).sum();
    WorkPlane {
        z_pos_in_mm: layer.z_height as f32,
        machine_type: options.machine_type,
        meta_data: Some(WorkPlaneMetaData {
            total_scan_distance_in_mm: scan_distance as f32,
            total_jump_distance_in_mm: 0.0,
            layer_thickness_in_mm: options.layer_thickness_in_mm,
        }),
        ..Default::default()
    }
}

/// Write `layers` as the work planes of `job` to `path`.
pub fn write_layers(
    path: impl AsRef<Path>,
    job: &Job,
    layers: &[SlicedLayer],
    options: &ConvertOptions,
) -> Result<ConvertSummary> {
    let mut writer = JobWriter::create(path, job)?;
    let mut summary = ConvertSummary::default();

    for layer in layers {
        let mut wp = writer.append_work_plane(&layer_to_work_plane(layer, options))?;
        for (i, contour) in layer.contours.iter().enumerate() {
            wp.append_vector_block(&contour_to_vector_block(contour, i, options))?;
        }
        summary.vector_blocks += layer.contours.len();
        wp.finish()?;
        summary.work_planes += 1;
        debug!(z = layer.z_height, contours = layer.contours.len(), "wrote layer");
    }

    writer.finish()?;
    info!(
        work_planes = summary.work_planes,
        vector_blocks = summary.vector_blocks,
        "wrote OVF job"
    );
    Ok(summary)
}

/// Slice with `slicer` and write the result.
pub fn convert(
    slicer: &impl Slicer,
    path: impl AsRef<Path>,
    job: &Job,
    layer_height: f64,
    options: &ConvertOptions,
) -> Result<ConvertSummary> {
    let layers = slicer.slice(layer_height)?;
    write_layers(path, job, &layers, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::OvfReader;
    use crate::slicer::{MeshSlicer, Point2D, TriangleMesh};
    use glam::DVec3;
    use tempfile::NamedTempFile;

    #[test]
    fn test_contour_block_points() {
        let contour = Contour {
            points: vec![Point2D::new(0.0, 0.0), Point2D::new(10.0, 0.0), Point2D::new(0.0, 0.0)],
        };
        let options = ConvertOptions { marking_params_key: 2, part_key: 7, ..Default::default() };
        let block = contour_to_vector_block(&contour, 3, &options);
        assert_eq!(
            block.points().map(|p| p.points.clone()),
            Some(vec![0.0, 0.0, 10.0, 0.0, 0.0, 0.0])
        );
        assert_eq!(block.marking_params_key, 2);
        assert_eq!(block.meta_data, Some(VectorBlockMetaData { part_key: 7, contour_index: 3 }));
    }

    #[test]
    fn test_convert_cube() -> Result<()> {
        let temp = NamedTempFile::new()?;
        let mesh = TriangleMesh::cuboid(DVec3::ZERO, DVec3::new(10.0, 10.0, 1.0));
        let slicer = MeshSlicer::new(mesh);
        let options = ConvertOptions { layer_thickness_in_mm: 0.5, ..Default::default() };

        let summary = convert(&slicer, temp.path(), &Job::named("cube"), 0.5, &options)?;
        assert_eq!(summary, ConvertSummary { work_planes: 3, vector_blocks: 3 });

        let reader = OvfReader::open(temp.path())?;
        let job = reader.read_job()?;
        assert_eq!(job.name(), "cube");
        assert_eq!(job.num_work_planes, 3);

        let zs: Vec<f32> = job.work_planes.iter().map(|wp| wp.z_pos_in_mm).collect();
        assert_eq!(zs, vec![0.0, 0.5, 1.0]);
        for plane in &job.work_planes {
            let meta = plane.meta_data.as_ref().unwrap();
            assert!((meta.total_scan_distance_in_mm - 40.0).abs() < 1e-4);
            assert_eq!(meta.layer_thickness_in_mm, 0.5);
            assert_eq!(plane.vector_blocks.len(), 1);
        }
        Ok(())
    }
}
