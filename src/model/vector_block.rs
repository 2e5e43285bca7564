//! Vector block record: the toolpath payload of a work plane.

use super::read_count;
use crate::codec::{Decoder, Encoder, Record, WireType};
use crate::util::Result;

/// Flat coordinate list, `[x0, y0, x1, y1, ...]` (or `x, y, z` triples in 3D).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Points {
    pub points: Vec<f32>,
}

impl Points {
    pub fn new(points: Vec<f32>) -> Self {
        Self { points }
    }

    /// Build a 2D list from `(x, y)` pairs.
    pub fn from_xy(pairs: &[(f32, f32)]) -> Self {
        Self {
            points: pairs.iter().flat_map(|&(x, y)| [x, y]).collect(),
        }
    }

    /// Iterate the list as `(x, y)` pairs. A trailing odd value is ignored.
    pub fn xy(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.points.chunks_exact(2).map(|p| (p[0], p[1]))
    }
}

impl Record for Points {
    fn encode(&self, enc: &mut Encoder) {
        enc.packed_f32(1, &self.points);
    }

    fn merge_field(&mut self, field: u32, wire: WireType, dec: &mut Decoder<'_>) -> Result<()> {
        match field {
            1 => dec.read_packed_f32(wire, &mut self.points)?,
            _ => dec.skip(wire)?,
        }
        Ok(())
    }
}

/// Geometry carried by a vector block.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorData {
    /// Connected polyline.
    LineSequence(Points),
    /// Independent lines, two points each.
    Hatches(Points),
    /// Isolated exposure points.
    PointSequence(Points),
    /// Connected polyline with `x, y, z` triples.
    LineSequence3D(Points),
}

impl VectorData {
    fn field(&self) -> u32 {
        match self {
            Self::LineSequence(_) => 1,
            Self::Hatches(_) => 2,
            Self::PointSequence(_) => 3,
            Self::LineSequence3D(_) => 4,
        }
    }

    pub fn points(&self) -> &Points {
        match self {
            Self::LineSequence(p)
            | Self::Hatches(p)
            | Self::PointSequence(p)
            | Self::LineSequence3D(p) => p,
        }
    }
}

/// Opaque toolpath record. The writer never looks inside.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorBlock {
    pub data: Option<VectorData>,
    pub marking_params_key: i32,
    pub meta_data: Option<VectorBlockMetaData>,
    pub repeats: u32,
}

impl VectorBlock {
    /// Polyline block from `(x, y)` pairs.
    pub fn line_sequence(pairs: &[(f32, f32)]) -> Self {
        Self {
            data: Some(VectorData::LineSequence(Points::from_xy(pairs))),
            ..Default::default()
        }
    }

    /// Hatch block from `(x, y)` pairs; consecutive pairs form one line.
    pub fn hatches(pairs: &[(f32, f32)]) -> Self {
        Self {
            data: Some(VectorData::Hatches(Points::from_xy(pairs))),
            ..Default::default()
        }
    }

    /// Point list of whichever geometry variant is set.
    pub fn points(&self) -> Option<&Points> {
        self.data.as_ref().map(VectorData::points)
    }
}

impl Record for VectorBlock {
    fn encode(&self, enc: &mut Encoder) {
        if let Some(data) = &self.data {
            enc.message(data.field(), data.points());
        }
        enc.int32(50, self.marking_params_key);
        if let Some(meta) = &self.meta_data {
            enc.message(51, meta);
        }
        enc.int32(52, self.repeats as i32);
    }

    fn merge_field(&mut self, field: u32, wire: WireType, dec: &mut Decoder<'_>) -> Result<()> {
        match field {
            1 => self.data = Some(VectorData::LineSequence(dec.read_message(wire)?)),
            2 => self.data = Some(VectorData::Hatches(dec.read_message(wire)?)),
            3 => self.data = Some(VectorData::PointSequence(dec.read_message(wire)?)),
            4 => self.data = Some(VectorData::LineSequence3D(dec.read_message(wire)?)),
            50 => self.marking_params_key = dec.read_i32(wire)?,
            51 => self.meta_data = Some(dec.read_message(wire)?),
            52 => self.repeats = read_count(dec, wire)?,
            _ => dec.skip(wire)?,
        }
        Ok(())
    }
}

/// Association of a block with a part and contour role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorBlockMetaData {
    pub part_key: i32,
    /// Index of the contour inside its layer.
    pub contour_index: u32,
}

impl Record for VectorBlockMetaData {
    fn encode(&self, enc: &mut Encoder) {
        enc.int32(1, self.part_key);
        enc.int32(2, self.contour_index as i32);
    }

    fn merge_field(&mut self, field: u32, wire: WireType, dec: &mut Decoder<'_>) -> Result<()> {
        match field {
            1 => self.part_key = dec.read_i32(wire)?,
            2 => self.contour_index = read_count(dec, wire)?,
            _ => dec.skip(wire)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_xy_flattens() {
        let p = Points::from_xy(&[(0.0, 1.0), (2.0, 3.0)]);
        assert_eq!(p.points, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(p.xy().collect::<Vec<_>>(), vec![(0.0, 1.0), (2.0, 3.0)]);
    }

    #[test]
    fn test_variant_is_preserved() {
        let mut block = VectorBlock::hatches(&[(0.0, 0.0), (1.0, 0.0)]);
        block.marking_params_key = 3;
        block.meta_data = Some(VectorBlockMetaData { part_key: 1, contour_index: 4 });
        let decoded = VectorBlock::from_bytes(&block.to_bytes()).unwrap();
        assert_eq!(decoded, block);
        assert!(matches!(decoded.data, Some(VectorData::Hatches(_))));
    }

    #[test]
    fn test_empty_geometry_stays_present() {
        let block = VectorBlock {
            data: Some(VectorData::PointSequence(Points::default())),
            ..Default::default()
        };
        let decoded = VectorBlock::from_bytes(&block.to_bytes()).unwrap();
        assert_eq!(decoded.data, Some(VectorData::PointSequence(Points::default())));
    }
}
