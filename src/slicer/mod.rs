//! Geometry slicing.
//!
//! A [`Slicer`] turns a model into horizontal layers of closed or open 2D
//! contours. [`MeshSlicer`] implements it for triangle meshes read from STL.

mod mesh;
mod section;

pub use mesh::*;
pub use section::*;

use crate::util::Result;

/// A point in the slicing plane, in model units (mm).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Ordered polyline. Closed contours repeat their first point at the end.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Contour {
    pub points: Vec<Point2D>,
}

impl Contour {
    /// First point equals last point (and there is more than one point).
    pub fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(a), Some(b)) => self.points.len() > 1 && a == b,
            _ => false,
        }
    }

    /// Sum of segment lengths.
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(&w[1])).sum()
    }
}

/// Cross-section of the model at one height.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SlicedLayer {
    pub z_height: f64,
    pub contours: Vec<Contour>,
}

/// Source of sliced layers.
pub trait Slicer {
    /// Slice at `layer_height` spacing, bottom to top. Layers without any
    /// geometry are omitted.
    fn slice(&self, layer_height: f64) -> Result<Vec<SlicedLayer>>;
}
