mod planar;
mod spring;

pub use planar::PlanarModel;
pub use spring::SpringModel;

use slotmap::SecondaryMap;

use crate::error::Result;
use crate::math::Vector3;
use crate::mesh::{Mesh, VertexId};

/// Per-vertex energy gradient, one vector per vertex in the store.
///
/// The solver flattens this over the mesh's active list; entries for fixed
/// vertices are computed but never enter the optimization variable.
pub type GradientTable = SecondaryMap<VertexId, Vector3>;

/// A mechanical energy functional over the mesh.
///
/// Both operations read the *derived* geometric quantities (edge lengths,
/// face areas and perimeters), so a geometry update must precede them
/// after any position write.
pub trait Model {
    /// Total mechanical energy of the mesh.
    ///
    /// # Errors
    ///
    /// Returns an error if the mesh references a missing entity or the
    /// model does not support the mesh's dimension.
    fn compute_energy(&self, mesh: &Mesh) -> Result<f64>;

    /// Analytic gradient of the energy with respect to vertex positions.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as
    /// [`compute_energy`](Model::compute_energy).
    fn compute_gradient(&self, mesh: &Mesh) -> Result<GradientTable>;
}

/// A gradient table with a zero vector for every vertex in the store.
pub(crate) fn zeroed_gradient(mesh: &Mesh) -> GradientTable {
    mesh.vertex_ids().map(|v| (v, Vector3::zeros())).collect()
}
