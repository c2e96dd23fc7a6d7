use std::collections::BTreeSet;

use slotmap::SecondaryMap;
use tracing::warn;

use crate::error::Result;
use crate::math::bbox::Aabb;
use crate::mesh::{EdgeId, FaceId, Mesh, PositionSnapshot, VertexId};

/// One collision plane between a pair of faces.
///
/// For every flagged axis the interpolated crossing coordinate is recorded;
/// `lower` vertices (the face on the positive side) must stay above
/// `coordinate + shyness/2`, `upper` vertices below `coordinate - shyness/2`.
#[derive(Debug)]
struct CollisionPlane {
    /// Flagged axes with their plane coordinate.
    axes: Vec<(usize, f64)>,
    /// Vertices bounded from below.
    lower: Vec<VertexId>,
    /// Vertices bounded from above.
    upper: Vec<VertexId>,
}

/// Per-vertex, per-axis position bounds aggregated over all face pairs.
///
/// Lower bounds start at −∞ and only ever grow; upper bounds start at +∞
/// and only ever shrink. A vertex with no finite bound on an axis is
/// unconstrained there.
#[derive(Debug, Default)]
struct BoundsTables {
    lower: SecondaryMap<VertexId, [f64; 3]>,
    upper: SecondaryMap<VertexId, [f64; 3]>,
}

impl BoundsTables {
    /// Folds one collision plane into the running bounds.
    fn fold(&mut self, plane: &CollisionPlane, shyness: f64) {
        for &(axis, coordinate) in &plane.axes {
            for &v in &plane.lower {
                let entry = self
                    .lower
                    .entry(v)
                    .map(|e| e.or_insert([f64::NEG_INFINITY; 3]));
                if let Some(bounds) = entry {
                    bounds[axis] = bounds[axis].max(coordinate + shyness / 2.0);
                }
            }
            for &v in &plane.upper {
                let entry = self.upper.entry(v).map(|e| e.or_insert([f64::INFINITY; 3]));
                if let Some(bounds) = entry {
                    bounds[axis] = bounds[axis].min(coordinate - shyness / 2.0);
                }
            }
        }
    }

    /// Clamps every bounded vertex into its feasible interval.
    ///
    /// Applies `min(current, upper)` then `max(current, lower)` per axis,
    /// so a position already inside its bounds is left bit-identical.
    /// Returns the number of vertices that moved.
    fn clamp(&self, mesh: &mut Mesh, dim: usize) -> Result<usize> {
        let mut corrected: BTreeSet<VertexId> = BTreeSet::new();
        for (v, bounds) in &self.upper {
            let point = &mut mesh.vertex_mut(v)?.point;
            for (axis, &upper) in bounds.iter().enumerate().take(dim) {
                if point[axis] > upper {
                    point[axis] = upper;
                    corrected.insert(v);
                }
            }
        }
        for (v, bounds) in &self.lower {
            let point = &mut mesh.vertex_mut(v)?.point;
            for (axis, &lower) in bounds.iter().enumerate().take(dim) {
                if point[axis] < lower {
                    point[axis] = lower;
                    corrected.insert(v);
                }
            }
        }
        Ok(corrected.len())
    }
}

/// Resolves self-collisions between pairs of faces flagged by the
/// intersection detector.
///
/// Follows the self-collision avoidance scheme of Liu, Ko & Chang (1998):
/// compare each face pair's bounding boxes between the previous and the
/// current position state, find the axis along which their ordering
/// flipped, place a separating plane at the interpolated crossing
/// coordinate, and clamp the faces' vertices to either side of it.
#[derive(Debug)]
pub struct CollidingBoxes {
    face_pairs: Vec<(FaceId, FaceId)>,
}

impl CollidingBoxes {
    /// Maps intersecting edge pairs to their owning faces.
    ///
    /// Face pairs are deduplicated with unordered-pair semantics; a pair
    /// that does not resolve to two distinct faces is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if an edge is missing from the store.
    pub fn new(mesh: &Mesh, edge_pairs: &[(EdgeId, EdgeId)]) -> Result<Self> {
        let mut pairs = BTreeSet::new();
        for &(e0, e1) in edge_pairs {
            let f0 = mesh.edge(e0)?.face;
            let f1 = mesh.edge(e1)?.face;
            if f0 == f1 {
                continue;
            }
            pairs.insert(if f1 < f0 { (f1, f0) } else { (f0, f1) });
        }
        Ok(Self {
            face_pairs: pairs.into_iter().collect(),
        })
    }

    /// The deduplicated candidate colliding face pairs.
    #[must_use]
    pub fn face_pairs(&self) -> &[(FaceId, FaceId)] {
        &self.face_pairs
    }

    /// Solves the collisions by clamping vertex positions to either side
    /// of each discovered collision plane, `shyness / 2` away from it.
    ///
    /// `previous` is the position snapshot taken before the update that
    /// caused the intersections. Pairs whose collision axis cannot be
    /// determined are skipped with a warning. Returns the number of
    /// vertices whose position was corrected; zero when no plane was found.
    ///
    /// # Errors
    ///
    /// Returns an error if the mesh references a missing entity or the
    /// snapshot does not cover a needed vertex.
    pub fn resolve(
        &self,
        mesh: &mut Mesh,
        previous: &PositionSnapshot,
        shyness: f64,
    ) -> Result<usize> {
        let dim = mesh.dim();
        let mut tables = BoundsTables::default();
        let mut plane_found = false;
        for &pair in &self.face_pairs {
            if let Some(plane) = Self::collision_plane(mesh, previous, pair)? {
                plane_found = true;
                tables.fold(&plane, shyness);
            }
        }
        if !plane_found {
            return Ok(0);
        }
        tables.clamp(mesh, dim)
    }

    /// Finds the collision plane between two faces, if one is detectable.
    ///
    /// An axis is flagged when the relative ordering of the two faces'
    /// bounding-box intervals flipped between the previous and the current
    /// state. The plane coordinate is the linear interpolation of the
    /// crossing point of the two moving box edges. Returns `None` (with a
    /// warning) when no axis shows a sign change — the collision was
    /// already present, or the configuration is degenerate.
    fn collision_plane(
        mesh: &Mesh,
        previous: &PositionSnapshot,
        (f0, f1): (FaceId, FaceId),
    ) -> Result<Option<CollisionPlane>> {
        let pts0 = mesh.face_source_points(f0)?;
        let pts1 = mesh.face_source_points(f1)?;
        let (Some(bb0c), Some(bb1c)) = (Aabb::from_points(&pts0), Aabb::from_points(&pts1))
        else {
            warn!(?f0, ?f1, "colliding face without boundary vertices, skipping pair");
            return Ok(None);
        };
        let prev0 = mesh.face_source_points_from(f0, previous)?;
        let prev1 = mesh.face_source_points_from(f1, previous)?;
        let (Some(bb0p), Some(bb1p)) = (Aabb::from_points(&prev0), Aabb::from_points(&prev1))
        else {
            warn!(?f0, ?f1, "colliding face without boundary vertices, skipping pair");
            return Ok(None);
        };

        let dim = mesh.dim();
        // Sign change of (face 1 low − face 0 high): face 0 was left of
        // face 1 and the gap flipped, or the mirror ordering.
        let crossed_from_left: Vec<usize> = (0..dim)
            .filter(|&a| (bb1c.min[a] - bb0c.max[a]) * (bb1p.min[a] - bb0p.max[a]) < 0.0)
            .collect();
        let crossed_from_right: Vec<usize> = (0..dim)
            .filter(|&a| (bb0c.min[a] - bb1c.max[a]) * (bb0p.min[a] - bb1p.max[a]) < 0.0)
            .collect();

        let plane = if !crossed_from_left.is_empty() {
            let axes = crossed_from_left
                .into_iter()
                .map(|a| {
                    let dr0h = bb0c.max[a] - bb0p.max[a];
                    let dr1l = bb1c.min[a] - bb1p.min[a];
                    let coordinate =
                        (bb0p.max[a] * dr1l - bb1p.min[a] * dr0h) / (dr1l - dr0h);
                    (a, coordinate)
                })
                .collect();
            CollisionPlane {
                axes,
                lower: mesh.face_source_vertices(f1)?,
                upper: mesh.face_source_vertices(f0)?,
            }
        } else if !crossed_from_right.is_empty() {
            let axes = crossed_from_right
                .into_iter()
                .map(|a| {
                    let dr0l = bb0c.min[a] - bb0p.min[a];
                    let dr1h = bb1c.max[a] - bb1p.max[a];
                    let coordinate =
                        (bb1p.max[a] * dr0l - bb0p.min[a] * dr1h) / (dr0l - dr1h);
                    (a, coordinate)
                })
                .collect();
            CollisionPlane {
                axes,
                lower: mesh.face_source_vertices(f0)?,
                upper: mesh.face_source_vertices(f1)?,
            }
        } else {
            warn!(
                ?f0,
                ?f1,
                "collision already present or its axis could not be determined"
            );
            return Ok(None);
        };

        Ok(Some(plane))
    }
}
