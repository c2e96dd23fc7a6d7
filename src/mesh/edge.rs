use crate::math::Vector3;

use super::face::FaceId;
use super::vertex::VertexId;

slotmap::new_key_type! {
    /// Unique identifier for a half-edge in the mesh store.
    pub struct EdgeId;
}

/// Data associated with a half-edge.
///
/// Every face owns its own oriented boundary loop, so a junction shared by
/// two faces is represented by two opposite half-edges. `displacement` and
/// `length` are derived quantities refreshed by
/// [`Geometry::update_all`](crate::geometry::Geometry::update_all); they are
/// stale after any direct position write.
#[derive(Debug, Clone)]
pub struct EdgeData {
    /// Source vertex of the half-edge.
    pub srce: VertexId,
    /// Target vertex of the half-edge.
    pub trgt: VertexId,
    /// The face owning this half-edge.
    pub face: FaceId,
    /// Derived displacement `target - source`.
    pub displacement: Vector3,
    /// Derived length of the displacement.
    pub length: f64,
}

impl EdgeData {
    /// Creates a new half-edge between two vertices, owned by `face`.
    ///
    /// Derived fields start at zero; run a geometry update before reading
    /// them.
    #[must_use]
    pub fn new(srce: VertexId, trgt: VertexId, face: FaceId) -> Self {
        Self {
            srce,
            trgt,
            face,
            displacement: Vector3::zeros(),
            length: 0.0,
        }
    }
}
