//! Triangle mesh and STL loading.

use std::io::Cursor;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use glam::DVec3;
use tracing::debug;

use crate::util::{Error, Result};

const STL_HEADER_LEN: usize = 80;
const STL_TRIANGLE_LEN: usize = 50;

/// Triangle soup. Facet normals are not kept; winding (counter-clockwise
/// seen from outside) tells the slicer which flat faces point down.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    pub triangles: Vec<[DVec3; 3]>,
}

impl TriangleMesh {
    pub fn from_triangles(triangles: Vec<[DVec3; 3]>) -> Self {
        Self { triangles }
    }

    /// Axis-aligned box between `min` and `max`, as 12 triangles.
    pub fn cuboid(min: DVec3, max: DVec3) -> Self {
        let c = |x: bool, y: bool, z: bool| {
            DVec3::new(
                if x { max.x } else { min.x },
                if y { max.y } else { min.y },
                if z { max.z } else { min.z },
            )
        };
        let (f, t) = (false, true);
        let quads = [
            // bottom, top
            [c(f, f, f), c(f, t, f), c(t, t, f), c(t, f, f)],
            [c(f, f, t), c(t, f, t), c(t, t, t), c(f, t, t)],
            // front, back
            [c(f, f, f), c(t, f, f), c(t, f, t), c(f, f, t)],
            [c(f, t, f), c(f, t, t), c(t, t, t), c(t, t, f)],
            // left, right
            [c(f, f, f), c(f, f, t), c(f, t, t), c(f, t, f)],
            [c(t, f, f), c(t, t, f), c(t, t, t), c(t, f, t)],
        ];
        let triangles = quads
            .iter()
            .flat_map(|q| [[q[0], q[1], q[2]], [q[0], q[2], q[3]]])
            .collect();
        Self { triangles }
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Bounding box `(min, max)`, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(DVec3, DVec3)> {
        let mut vertices = self.triangles.iter().flatten();
        let first = *vertices.next()?;
        Some(vertices.fold((first, first), |(lo, hi), v| (lo.min(*v), hi.max(*v))))
    }

    /// Load an ASCII or binary STL file.
    pub fn load_stl(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let mesh = Self::parse_stl(&bytes)?;
        debug!(path = %path.display(), triangles = mesh.len(), "loaded STL");
        Ok(mesh)
    }

    /// Parse STL bytes, detecting the binary or ASCII variant.
    pub fn parse_stl(bytes: &[u8]) -> Result<Self> {
        if let Some(count) = binary_triangle_count(bytes) {
            if STL_HEADER_LEN + 4 + count * STL_TRIANGLE_LEN == bytes.len() {
                return Self::parse_binary_stl(bytes, count);
            }
        }
        if bytes.trim_ascii_start().starts_with(b"solid") {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| Error::invalid_model(format!("ASCII STL is not UTF-8: {e}")))?;
            return Self::parse_ascii_stl(text);
        }
        Err(Error::invalid_model("not a binary or ASCII STL file"))
    }

    fn parse_binary_stl(bytes: &[u8], count: usize) -> Result<Self> {
        let mut cur = Cursor::new(&bytes[STL_HEADER_LEN + 4..]);
        let mut triangles = Vec::with_capacity(count);
        for _ in 0..count {
            // normal is recomputable, skip it
            for _ in 0..3 {
                cur.read_f32::<LittleEndian>()?;
            }
            let mut tri = [DVec3::ZERO; 3];
            for v in &mut tri {
                let x = cur.read_f32::<LittleEndian>()?;
                let y = cur.read_f32::<LittleEndian>()?;
                let z = cur.read_f32::<LittleEndian>()?;
                *v = DVec3::new(x as f64, y as f64, z as f64);
            }
            cur.read_u16::<LittleEndian>()?;
            triangles.push(tri);
        }
        Ok(Self { triangles })
    }

    fn parse_ascii_stl(text: &str) -> Result<Self> {
        let mut triangles = Vec::new();
        let mut pending: Vec<DVec3> = Vec::with_capacity(3);
        for (line_no, line) in text.lines().enumerate() {
            let mut tokens = line.split_whitespace();
            match tokens.next() {
                Some("vertex") => {
                    let mut coord = || -> Result<f64> {
                        tokens
                            .next()
                            .and_then(|t| t.parse::<f64>().ok())
                            .ok_or_else(|| {
                                Error::invalid_model(format!("bad vertex on line {}", line_no + 1))
                            })
                    };
                    pending.push(DVec3::new(coord()?, coord()?, coord()?));
                }
                Some("endloop") => {
                    if pending.len() != 3 {
                        return Err(Error::invalid_model(format!(
                            "facet ending on line {} has {} vertices",
                            line_no + 1,
                            pending.len()
                        )));
                    }
                    triangles.push([pending[0], pending[1], pending[2]]);
                    pending.clear();
                }
                _ => {}
            }
        }
        Ok(Self { triangles })
    }
}

fn binary_triangle_count(bytes: &[u8]) -> Option<usize> {
    let raw = bytes.get(STL_HEADER_LEN..STL_HEADER_LEN + 4)?;
    let mut cur = Cursor::new(raw);
    cur.read_u32::<LittleEndian>().ok().map(|n| n as usize)
}
