use crate::error::Result;
use crate::math::TOLERANCE;
use crate::mesh::Mesh;

use super::{zeroed_gradient, GradientTable, Model};

/// Elastic springs along every half-edge.
///
/// `E = Σ_e k/2 (ℓ_e − ℓ0)²` with a single stiffness and rest length for
/// the whole mesh. Valid in 2 and 3 dimensions; mainly used as the
/// reference model with a trivially verifiable gradient.
#[derive(Debug, Clone, Copy)]
pub struct SpringModel {
    /// Spring stiffness `k`.
    pub stiffness: f64,
    /// Rest length `ℓ0` shared by all edges.
    pub rest_length: f64,
}

impl Model for SpringModel {
    fn compute_energy(&self, mesh: &Mesh) -> Result<f64> {
        let mut energy = 0.0;
        for (_, edge) in mesh.edges() {
            let stretch = edge.length - self.rest_length;
            energy += 0.5 * self.stiffness * stretch * stretch;
        }
        Ok(energy)
    }

    fn compute_gradient(&self, mesh: &Mesh) -> Result<GradientTable> {
        let mut grad = zeroed_gradient(mesh);
        for (_, edge) in mesh.edges() {
            if edge.length < TOLERANCE {
                // Zero-length edge: direction undefined, force is zero anyway
                // at the rest length and unresolvable otherwise.
                continue;
            }
            let unit = edge.displacement / edge.length;
            let force = self.stiffness * (edge.length - self.rest_length);
            if let Some(g) = grad.get_mut(edge.srce) {
                *g -= force * unit;
            }
            if let Some(g) = grad.get_mut(edge.trgt) {
                *g += force * unit;
            }
        }
        Ok(grad)
    }
}
