use crate::error::{GeometryError, Result};
use crate::math::TOLERANCE;
use crate::mesh::Mesh;

use super::{zeroed_gradient, GradientTable, Model};

/// The standard planar epithelial vertex-model energy.
///
/// `E = Σ_f [K/2 (A_f − A0)² + Γ/2 P_f²] + Σ_e Λ ℓ_e`
///
/// with per-face area elasticity `K` around the preferred area `A0`,
/// perimeter contractility `Γ`, and line tension `Λ` on every half-edge
/// (a shared junction carries two half-edges, hence twice the tension).
/// Areas are signed, so faces are expected to wind counter-clockwise.
/// 2D meshes only.
#[derive(Debug, Clone, Copy)]
pub struct PlanarModel {
    /// Area elasticity `K`.
    pub area_elasticity: f64,
    /// Preferred face area `A0`.
    pub preferred_area: f64,
    /// Perimeter contractility `Γ`.
    pub contractility: f64,
    /// Line tension `Λ` per half-edge.
    pub line_tension: f64,
}

impl PlanarModel {
    fn require_planar(mesh: &Mesh) -> Result<()> {
        if mesh.dim() != 2 {
            return Err(GeometryError::UnsupportedDimension {
                operation: "planar vertex model",
                dim: mesh.dim(),
            }
            .into());
        }
        Ok(())
    }
}

impl Model for PlanarModel {
    fn compute_energy(&self, mesh: &Mesh) -> Result<f64> {
        Self::require_planar(mesh)?;
        let mut energy = 0.0;
        for face_id in mesh.face_ids() {
            let face = mesh.face(face_id)?;
            let strain = face.area - self.preferred_area;
            energy += 0.5 * self.area_elasticity * strain * strain;
            energy += 0.5 * self.contractility * face.perimeter * face.perimeter;
        }
        for (_, edge) in mesh.edges() {
            energy += self.line_tension * edge.length;
        }
        Ok(energy)
    }

    fn compute_gradient(&self, mesh: &Mesh) -> Result<GradientTable> {
        Self::require_planar(mesh)?;
        let mut grad = zeroed_gradient(mesh);

        // Edge-length terms: line tension plus the perimeter contractility
        // of the owning face, both proportional to ∂ℓ/∂v = ±unit.
        for (_, edge) in mesh.edges() {
            if edge.length < TOLERANCE {
                continue;
            }
            let unit = edge.displacement / edge.length;
            let face = mesh.face(edge.face)?;
            let pull = self.line_tension + self.contractility * face.perimeter;
            if let Some(g) = grad.get_mut(edge.srce) {
                *g -= pull * unit;
            }
            if let Some(g) = grad.get_mut(edge.trgt) {
                *g += pull * unit;
            }
        }

        // Area term: shoelace derivative over each face's ordered boundary.
        for face_id in mesh.face_ids() {
            let face = mesh.face(face_id)?;
            let strain = self.area_elasticity * (face.area - self.preferred_area);
            let verts = mesh.face_source_vertices(face_id)?;
            let n = verts.len();
            if n < 3 {
                continue;
            }
            for i in 0..n {
                let prev = mesh.vertex(verts[(i + n - 1) % n])?.point;
                let next = mesh.vertex(verts[(i + 1) % n])?.point;
                if let Some(g) = grad.get_mut(verts[i]) {
                    g.x += strain * 0.5 * (next.y - prev.y);
                    g.y += strain * 0.5 * (prev.x - next.x);
                }
            }
        }

        Ok(grad)
    }
}
