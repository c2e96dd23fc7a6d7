use crate::math::Point3;

use super::edge::EdgeId;

slotmap::new_key_type! {
    /// Unique identifier for a face in the mesh store.
    pub struct FaceId;
}

/// Data associated with a polygonal face.
///
/// The boundary is an ordered loop of half-edges; the source vertices of
/// those edges, taken in order, are the face's polygon. `area`, `perimeter`
/// and `centroid` are derived quantities refreshed by
/// [`Geometry::update_all`](crate::geometry::Geometry::update_all).
/// For 2D meshes `area` is the signed polygon area (positive for
/// counter-clockwise winding); for 3D meshes it is unsigned.
#[derive(Debug, Clone)]
pub struct FaceData {
    /// Ordered boundary loop of half-edges.
    pub edges: Vec<EdgeId>,
    /// Derived face area.
    pub area: f64,
    /// Derived boundary perimeter.
    pub perimeter: f64,
    /// Derived centroid of the boundary vertices.
    pub centroid: Point3,
}

impl FaceData {
    /// Creates a face with an empty boundary loop and zeroed derived fields.
    #[must_use]
    pub fn new() -> Self {
        Self {
            edges: Vec::new(),
            area: 0.0,
            perimeter: 0.0,
            centroid: Point3::origin(),
        }
    }
}

impl Default for FaceData {
    fn default() -> Self {
        Self::new()
    }
}
