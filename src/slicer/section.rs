//! Plane sectioning of triangle meshes.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use glam::{DVec2, DVec3};
use rayon::prelude::*;
use tracing::debug;

use super::{Contour, Point2D, SlicedLayer, Slicer, TriangleMesh};
use crate::util::{Error, Result};

/// Slack added above the top of the model so its top face gets a layer.
const TOP_EPSILON: f64 = 1e-9;

/// Grid used to weld segment endpoints when chaining contours.
const WELD_TOLERANCE: f64 = 1e-6;

/// Distance within which a triangle vertex lies on a slicing plane.
const COPLANAR_TOLERANCE: f64 = 1e-9;

/// Slices a [`TriangleMesh`] with planes `z = z_min + k * layer_height`.
#[derive(Debug, Clone)]
pub struct MeshSlicer {
    mesh: TriangleMesh,
}

impl MeshSlicer {
    pub fn new(mesh: TriangleMesh) -> Self {
        Self { mesh }
    }

    /// Load the mesh from an STL file.
    pub fn from_stl(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(TriangleMesh::load_stl(path)?))
    }

    pub fn mesh(&self) -> &TriangleMesh {
        &self.mesh
    }

    /// Cross-section at height `z`: the outline of the material just above
    /// the plane.
    ///
    /// Triangles crossing the plane contribute one segment each. Downward
    /// facing triangles lying in the plane (the bottom of a part or of an
    /// overhang) contribute their edges. Edges found an even number of times
    /// are interior and cancel out.
    pub fn section(&self, z: f64) -> SlicedLayer {
        let mut segments: Vec<[DVec2; 2]> = Vec::new();
        for tri in &self.mesh.triangles {
            if let Some(segment) = intersect_triangle(tri, z) {
                segments.push(segment);
            } else if faces_down_in_plane(tri, z) {
                let edges = (0..3).map(|i| [tri[i].truncate(), tri[(i + 1) % 3].truncate()]);
                segments.extend(edges);
            }
        }
        SlicedLayer {
            z_height: z,
            contours: chain_segments(&cancel_shared_edges(segments)),
        }
    }
}

impl Slicer for MeshSlicer {
    fn slice(&self, layer_height: f64) -> Result<Vec<SlicedLayer>> {
        if !(layer_height > 0.0 && layer_height.is_finite()) {
            return Err(Error::invalid_arg(format!(
                "layer height must be positive, got {layer_height}"
            )));
        }
        let Some((min, max)) = self.mesh.bounds() else {
            return Ok(Vec::new());
        };

        let count = ((max.z - min.z + TOP_EPSILON) / layer_height).floor() as usize;
        let layers: Vec<SlicedLayer> = (0..=count)
            .into_par_iter()
            .map(|k| self.section(min.z + k as f64 * layer_height))
            .filter(|layer| !layer.contours.is_empty())
            .collect();

        debug!(planes = count + 1, layers = layers.len(), layer_height, "sliced mesh");
        Ok(layers)
    }
}

/// Segment where the plane `z` cuts the triangle, if it does.
///
/// Vertices lying on the plane count as above it, so a face lying in the
/// plane produces nothing here and shared edges are not emitted twice.
fn intersect_triangle(tri: &[DVec3; 3], z: f64) -> Option<[DVec2; 2]> {
    let above = tri.map(|v| v.z >= z);
    if above.iter().all(|&a| a) || above.iter().all(|&a| !a) {
        return None;
    }

    let mut hits = [DVec2::ZERO; 2];
    let mut n = 0;
    for i in 0..3 {
        let (a, b) = (tri[i], tri[(i + 1) % 3]);
        if above[i] != above[(i + 1) % 3] {
            let t = (z - a.z) / (b.z - a.z);
            let p = a.lerp(b, t);
            hits[n] = DVec2::new(p.x, p.y);
            n += 1;
        }
    }
    // a crossing triangle always has exactly two crossing edges
    if n != 2 || hits[0].distance_squared(hits[1]) < WELD_TOLERANCE * WELD_TOLERANCE {
        return None;
    }
    Some(hits)
}

/// Triangle lies in the plane `z` with its winding normal pointing down.
fn faces_down_in_plane(tri: &[DVec3; 3], z: f64) -> bool {
    tri.iter().all(|v| (v.z - z).abs() <= COPLANAR_TOLERANCE)
        && (tri[1] - tri[0]).cross(tri[2] - tri[0]).z < 0.0
}

/// Keep each edge found an odd number of times, once.
fn cancel_shared_edges(segments: Vec<[DVec2; 2]>) -> Vec<[DVec2; 2]> {
    let mut counts: HashMap<_, usize> = HashMap::new();
    for [a, b] in &segments {
        *counts.entry(edge_key(*a, *b)).or_default() += 1;
    }
    let mut emitted = HashSet::new();
    segments
        .into_iter()
        .filter(|[a, b]| {
            let key = edge_key(*a, *b);
            counts[&key] % 2 == 1 && emitted.insert(key)
        })
        .collect()
}

type WeldKey = (i64, i64);

fn edge_key(a: DVec2, b: DVec2) -> (WeldKey, WeldKey) {
    let (ka, kb) = (weld_key(a), weld_key(b));
    if ka <= kb {
        (ka, kb)
    } else {
        (kb, ka)
    }
}

fn weld_key(p: DVec2) -> WeldKey {
    ((p.x / WELD_TOLERANCE).round() as i64, (p.y / WELD_TOLERANCE).round() as i64)
}

/// Join segments sharing endpoints into polylines.
///
/// Closed loops repeat their first point at the end; open chains (from
/// non-manifold input) are kept as they are.
fn chain_segments(segments: &[[DVec2; 2]]) -> Vec<Contour> {
    let mut by_point: HashMap<WeldKey, Vec<usize>> = HashMap::new();
    for (i, seg) in segments.iter().enumerate() {
        for p in seg {
            by_point.entry(weld_key(*p)).or_default().push(i);
        }
    }

    let mut used = vec![false; segments.len()];
    let mut contours = Vec::new();

    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut chain = vec![segments[start][0], segments[start][1]];

        // walk forward from the tail, then backward from the head
        for forward in [true, false] {
            loop {
                let end = if forward { chain[chain.len() - 1] } else { chain[0] };
                let next = by_point
                    .get(&weld_key(end))
                    .and_then(|ids| ids.iter().copied().find(|&i| !used[i]));
                let Some(i) = next else { break };
                used[i] = true;
                let [a, b] = segments[i];
                let other = if weld_key(a) == weld_key(end) { b } else { a };
                if forward {
                    chain.push(other);
                } else {
                    chain.insert(0, other);
                }
            }
            if weld_key(chain[0]) == weld_key(chain[chain.len() - 1]) {
                break;
            }
        }

        let mut points: Vec<Point2D> = chain.iter().map(|p| Point2D::new(p.x, p.y)).collect();
        if let (Some(first), Some(last)) = (points.first().copied(), points.last_mut()) {
            if weld_key(DVec2::new(first.x, first.y)) == weld_key(DVec2::new(last.x, last.y)) {
                *last = first;
            }
        }
        contours.push(Contour { points });
    }
    contours
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cube() -> MeshSlicer {
        MeshSlicer::new(TriangleMesh::cuboid(DVec3::ZERO, DVec3::ONE))
    }

    fn on_square_boundary(p: &Point2D) -> bool {
        let near = |a: f64, b: f64| (a - b).abs() < 1e-9;
        let inside = |v: f64| (-1e-9..=1.0 + 1e-9).contains(&v);
        let on_edge = |v: f64| near(v, 0.0) || near(v, 1.0);
        inside(p.x) && inside(p.y) && (on_edge(p.x) || on_edge(p.y))
    }

    #[test]
    fn test_cube_layers_are_closed_squares() {
        let layers = unit_cube().slice(0.25).unwrap();
        let heights: Vec<f64> = layers.iter().map(|l| l.z_height).collect();
        // the bottom face lies in the first plane and gives its outline
        assert_eq!(heights, vec![0.0, 0.25, 0.5, 0.75, 1.0]);

        for layer in &layers {
            assert_eq!(layer.contours.len(), 1, "layer at {}", layer.z_height);
            let contour = &layer.contours[0];
            assert!(contour.is_closed());
            assert!(contour.points.iter().all(on_square_boundary));
            assert!((contour.length() - 4.0).abs() < 1e-9);
        }
    }

    /// Two triangles covering a planar quad, wound to face down or up.
    fn flat_quad(q: [DVec3; 4], down: bool) -> [[DVec3; 3]; 2] {
        let normal_z = (q[1] - q[0]).cross(q[2] - q[0]).z;
        let q = if (normal_z < 0.0) == down { q } else { [q[3], q[2], q[1], q[0]] };
        [[q[0], q[1], q[2]], [q[0], q[2], q[3]]]
    }

    fn wall(a: DVec3, b: DVec3, height: f64) -> [[DVec3; 3]; 2] {
        let up = DVec3::Z * height;
        [[a, b, b + up], [a, b + up, a + up]]
    }

    fn square_at(lo: f64, hi: f64, z: f64) -> [DVec3; 4] {
        [
            DVec3::new(lo, lo, z),
            DVec3::new(hi, lo, z),
            DVec3::new(hi, hi, z),
            DVec3::new(lo, hi, z),
        ]
    }

    /// Unit column under a 3x3 slab, as one closed surface.
    fn t_shape() -> TriangleMesh {
        let mut triangles = Vec::new();
        let column = square_at(0.0, 1.0, 0.0);
        let inner = square_at(0.0, 1.0, 1.0);
        let outer = square_at(-1.0, 2.0, 1.0);
        triangles.extend(flat_quad(column, true));
        triangles.extend(flat_quad(square_at(-1.0, 2.0, 2.0), false));
        for i in 0..4 {
            let j = (i + 1) % 4;
            triangles.extend(wall(column[i], column[j], 1.0));
            triangles.extend(wall(outer[i], outer[j], 1.0));
            // underside ring between the column and the slab edge
            triangles.extend(flat_quad([inner[i], outer[i], outer[j], inner[j]], true));
        }
        TriangleMesh::from_triangles(triangles)
    }

    #[test]
    fn test_overhang_underside_gives_outer_outline() {
        let slicer = MeshSlicer::new(t_shape());

        let column = slicer.section(0.5);
        assert_eq!(column.contours.len(), 1);
        assert!((column.contours[0].length() - 4.0).abs() < 1e-9);

        // column outline and the ring's inner edge cancel
        let underside = slicer.section(1.0);
        assert_eq!(underside.contours.len(), 1);
        let contour = &underside.contours[0];
        assert!(contour.is_closed());
        assert!((contour.length() - 12.0).abs() < 1e-9);
        let on_edge = |v: f64| (v + 1.0).abs() < 1e-9 || (v - 2.0).abs() < 1e-9;
        assert!(contour.points.iter().all(|p| on_edge(p.x) || on_edge(p.y)));
    }

    #[test]
    fn test_upward_face_in_plane_adds_nothing() {
        let slicer = MeshSlicer::new(t_shape());
        let top = slicer.section(2.0);
        assert_eq!(top.contours.len(), 1);
        assert!((top.contours[0].length() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_bodies_give_two_contours() {
        let mut mesh = TriangleMesh::cuboid(DVec3::ZERO, DVec3::ONE);
        let second = TriangleMesh::cuboid(DVec3::new(5.0, 0.0, 0.0), DVec3::new(6.0, 1.0, 1.0));
        mesh.triangles.extend(second.triangles);
        let layer = MeshSlicer::new(mesh).section(0.5);
        assert_eq!(layer.contours.len(), 2);
        assert!(layer.contours.iter().all(Contour::is_closed));
    }

    #[test]
    fn test_open_surface_gives_open_chain() {
        // single vertical quad
        let a = DVec3::new(0.0, 0.0, 0.0);
        let b = DVec3::new(2.0, 0.0, 0.0);
        let c = DVec3::new(2.0, 0.0, 1.0);
        let d = DVec3::new(0.0, 0.0, 1.0);
        let slicer = MeshSlicer::new(TriangleMesh::from_triangles(vec![[a, b, c], [a, c, d]]));
        let layer = slicer.section(0.5);
        assert_eq!(layer.contours.len(), 1);
        let contour = &layer.contours[0];
        assert!(!contour.is_closed());
        assert!((contour.length() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_layer_height() {
        for h in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(unit_cube().slice(h), Err(Error::InvalidArgument(_))));
        }
    }

    #[test]
    fn test_empty_mesh_has_no_layers() {
        let slicer = MeshSlicer::new(TriangleMesh::default());
        assert!(slicer.slice(0.1).unwrap().is_empty());
    }
}
