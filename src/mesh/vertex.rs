use crate::math::Point3;

slotmap::new_key_type! {
    /// Unique identifier for a vertex in the mesh store.
    pub struct VertexId;
}

/// Data associated with a mesh vertex.
///
/// Whether the vertex is a free degree of freedom or a fixed boundary
/// condition is recorded in the mesh's active list, not here.
#[derive(Debug, Clone)]
pub struct VertexData {
    /// Current position of the vertex.
    pub point: Point3,
}

impl VertexData {
    /// Creates a new vertex at the given point.
    #[must_use]
    pub fn new(point: Point3) -> Self {
        Self { point }
    }
}
