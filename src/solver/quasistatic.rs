use tracing::info;

use crate::error::{EpimechError, MeshError, Result, SolverError};
use crate::geometry::Geometry;
use crate::math::DVector;
use crate::mesh::Mesh;
use crate::model::Model;

use super::optimize::{minimize, Objective, OptimizeResult, OptimizerOptions};
use super::pipeline::{PositionPipeline, SolverSettings};

/// Trial evaluation bridging the mesh, geometry and model collaborators to
/// the minimizer.
///
/// Every trial vector is written onto the mesh through the position
/// pipeline before the model is queried, so the mesh is mutated on every
/// evaluation. The gradient is read at the state of the immediately
/// preceding energy evaluation, without another write.
struct MeshProblem<'a> {
    mesh: &'a mut Mesh,
    geometry: &'a dyn Geometry,
    model: &'a dyn Model,
    pipeline: &'a PositionPipeline,
}

impl MeshProblem<'_> {
    /// Checks the trial vector against the current active layout.
    ///
    /// With a topology-reshaping pipeline a mismatch means a transition
    /// fired mid-run and is signalled as [`SolverError::TopologyChanged`];
    /// without one it is a caller bug and surfaces as the fatal
    /// [`MeshError::PositionCountMismatch`].
    fn guard(&self, x: &DVector, context: &'static str) -> Result<()> {
        let dim = self.mesh.dim();
        let count = self.mesh.active_count();
        if x.len() == count * dim {
            return Ok(());
        }
        if self.pipeline.reshapes_topology() {
            Err(SolverError::TopologyChanged {
                context,
                trial: x.len() / dim,
                mesh: count,
            }
            .into())
        } else {
            Err(MeshError::PositionCountMismatch {
                len: x.len(),
                count,
                dim,
            }
            .into())
        }
    }

    /// Flattens the model's per-vertex gradient over the active layout.
    fn flattened_gradient(&self) -> Result<DVector> {
        let table = self.model.compute_gradient(self.mesh)?;
        let dim = self.mesh.dim();
        let active = self.mesh.active_vertices();
        let mut flat = DVector::zeros(active.len() * dim);
        for (i, &v) in active.iter().enumerate() {
            if let Some(g) = table.get(v) {
                for axis in 0..dim {
                    flat[i * dim + axis] = g[axis];
                }
            }
        }
        Ok(flat)
    }
}

impl Objective for MeshProblem<'_> {
    fn value(&mut self, x: &DVector) -> Result<f64> {
        self.guard(x, "energy")?;
        self.pipeline.write(self.mesh, self.geometry, x)?;
        self.model.compute_energy(self.mesh)
    }

    fn gradient(&mut self, x: &DVector) -> Result<DVector> {
        self.guard(x, "gradient")?;
        self.flattened_gradient()
    }
}

/// Quasistatic solver: relaxes the mesh toward a local energy minimum by
/// displacing its active vertices.
///
/// Each trial proposed by the minimizer goes through the position-update
/// pipeline (collisions → T1 → T3, as enabled), then energy and gradient
/// are read from the model. When a transition changes the active-vertex
/// set mid-run, the in-flight minimization is discarded and restarted from
/// the new active coordinate vector, until one run completes without
/// interruption.
#[derive(Debug)]
pub struct QuasistaticSolver {
    pipeline: PositionPipeline,
}

impl QuasistaticSolver {
    /// Creates a solver with the given correction stages.
    #[must_use]
    pub fn new(settings: SolverSettings) -> Self {
        Self {
            pipeline: PositionPipeline::from_settings(&settings),
        }
    }

    /// Minimizes the mesh's total energy over its active vertices.
    ///
    /// On return the mesh holds the last evaluated trial; for a converged
    /// run that is the returned coordinate vector. Optimizer options are
    /// forwarded verbatim.
    ///
    /// # Errors
    ///
    /// Propagates any mesh, geometry or model error unchanged. Only the
    /// topology-change signal is caught internally and turned into a
    /// restart.
    pub fn find_energy_min(
        &self,
        mesh: &mut Mesh,
        geometry: &dyn Geometry,
        model: &dyn Model,
        options: &OptimizerOptions,
    ) -> Result<OptimizeResult> {
        info!(vertices = mesh.active_count(), "initial number of active vertices");
        let result = loop {
            let x0 = mesh.active_positions();
            let mut problem = MeshProblem {
                mesh: &mut *mesh,
                geometry,
                model,
                pipeline: &self.pipeline,
            };
            match minimize(&mut problem, x0, options) {
                Err(EpimechError::Solver(SolverError::TopologyChanged {
                    context,
                    trial,
                    mesh: vertices,
                })) => {
                    info!(context, trial, vertices, "topology changed, restarting minimization");
                }
                other => break other?,
            }
        };
        info!(vertices = mesh.active_count(), "final number of active vertices");
        Ok(result)
    }

    /// Evaluates the energy of one trial vector through the pipeline.
    ///
    /// # Errors
    ///
    /// Fails with the topology-change signal or the fatal count mismatch
    /// when the trial does not match the active layout, per
    /// [`SolverSettings`]; collaborator errors propagate unchanged.
    pub fn evaluate_energy(
        &self,
        mesh: &mut Mesh,
        geometry: &dyn Geometry,
        model: &dyn Model,
        trial: &DVector,
    ) -> Result<f64> {
        let mut problem = MeshProblem {
            mesh,
            geometry,
            model,
            pipeline: &self.pipeline,
        };
        problem.value(trial)
    }

    /// Approximates the energy gradient by forward finite differences.
    ///
    /// Each coordinate of the active layout is perturbed by `step` and the
    /// energy re-evaluated through the pipeline. The original positions
    /// are restored afterwards.
    ///
    /// # Errors
    ///
    /// Propagates collaborator errors unchanged; fails if a perturbation
    /// triggers a topology transition (validate with transitions off).
    pub fn approx_gradient(
        &self,
        mesh: &mut Mesh,
        geometry: &dyn Geometry,
        model: &dyn Model,
        step: f64,
    ) -> Result<DVector> {
        let snapshot = mesh.position_snapshot();
        let mut grad;
        {
            let mut problem = MeshProblem {
                mesh: &mut *mesh,
                geometry,
                model,
                pipeline: &self.pipeline,
            };
            let x0 = problem.mesh.active_positions();
            let f0 = problem.value(&x0)?;
            grad = DVector::zeros(x0.len());
            let mut x = x0.clone();
            for i in 0..x0.len() {
                x[i] = x0[i] + step;
                grad[i] = (problem.value(&x)? - f0) / step;
                x[i] = x0[i];
            }
        }
        mesh.restore_positions(&snapshot);
        geometry.update_all(mesh)?;
        Ok(grad)
    }

    /// Compares the model's analytic gradient against the finite-difference
    /// approximation, returning the Euclidean norm of their difference.
    ///
    /// # Errors
    ///
    /// As for [`approx_gradient`](QuasistaticSolver::approx_gradient).
    pub fn check_gradient(
        &self,
        mesh: &mut Mesh,
        geometry: &dyn Geometry,
        model: &dyn Model,
        step: f64,
    ) -> Result<f64> {
        let analytic = {
            let mut problem = MeshProblem {
                mesh: &mut *mesh,
                geometry,
                model,
                pipeline: &self.pipeline,
            };
            let x0 = problem.mesh.active_positions();
            problem.value(&x0)?;
            problem.gradient(&x0)?
        };
        let approximated = self.approx_gradient(mesh, geometry, model, step)?;
        Ok((analytic - approximated).norm())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::PlanarGeometry;
    use crate::math::Point3;
    use crate::model::{PlanarModel, SpringModel};

    fn p(x: f64, y: f64) -> Point3 {
        Point3::new(x, y, 0.0)
    }

    fn spring() -> SpringModel {
        SpringModel {
            stiffness: 1.0,
            rest_length: 1.0,
        }
    }

    fn stretched_triangle() -> Mesh {
        let mut mesh = Mesh::new(2).unwrap();
        let a = mesh.add_vertex(p(0.0, 0.0));
        let b = mesh.add_vertex(p(2.0, 0.0));
        let c = mesh.add_vertex(p(0.0, 2.0));
        mesh.add_face(&[a, b, c]).unwrap();
        PlanarGeometry.update_all(&mut mesh).unwrap();
        mesh
    }

    /// Two quads whose shared junction is degenerately short, so the first
    /// pipeline write fires a type-1 transition.
    fn mesh_with_short_junction() -> Mesh {
        let mut mesh = Mesh::new(2).unwrap();
        let a = mesh.add_vertex(p(0.0, 0.0));
        let b = mesh.add_vertex(p(1.0, 0.4999));
        let c = mesh.add_vertex(p(2.0, 0.0));
        let d = mesh.add_vertex(p(2.0, 1.0));
        let e = mesh.add_vertex(p(1.0, 0.5001));
        let f = mesh.add_vertex(p(0.0, 1.0));
        mesh.add_face(&[a, b, e, f]).unwrap();
        mesh.add_face(&[b, c, d, e]).unwrap();
        PlanarGeometry.update_all(&mut mesh).unwrap();
        mesh
    }

    #[test]
    fn relaxes_a_stretched_triangle_to_rest() {
        let mut mesh = stretched_triangle();
        let model = spring();
        let initial = model.compute_energy(&mesh).unwrap();

        let solver = QuasistaticSolver::new(SolverSettings::default());
        let result = solver
            .find_energy_min(&mut mesh, &PlanarGeometry, &model, &OptimizerOptions::default())
            .unwrap();

        assert!(result.converged);
        assert!(result.energy < initial);
        assert!(result.energy < 1e-8, "energy = {}", result.energy);
        for (_, edge) in mesh.edges() {
            assert!((edge.length - 1.0).abs() < 1e-3, "length = {}", edge.length);
        }
    }

    #[test]
    fn restarts_after_a_mid_run_topology_change() {
        let mut mesh = mesh_with_short_junction();
        let model = spring();
        let solver = QuasistaticSolver::new(SolverSettings {
            with_t1: true,
            t1_threshold: 1e-2,
            ..SolverSettings::default()
        });

        let result = solver
            .find_energy_min(&mut mesh, &PlanarGeometry, &model, &OptimizerOptions::default())
            .unwrap();

        // The junction collapsed during the first run; the solver restarted
        // and finished on the 5-vertex mesh.
        assert_eq!(mesh.active_count(), 5);
        assert_eq!(result.x.len(), 10);
    }

    #[test]
    fn trial_length_mismatch_is_fatal_without_reactivity() {
        let mut mesh = stretched_triangle();
        let solver = QuasistaticSolver::new(SolverSettings::default());
        let bad = DVector::zeros(4);
        let err = solver
            .evaluate_energy(&mut mesh, &PlanarGeometry, &spring(), &bad)
            .unwrap_err();
        assert!(matches!(
            err,
            EpimechError::Mesh(MeshError::PositionCountMismatch { len: 4, count: 3, dim: 2 })
        ));
    }

    #[test]
    fn trial_length_mismatch_signals_topology_change_with_reactivity() {
        let mut mesh = stretched_triangle();
        let solver = QuasistaticSolver::new(SolverSettings {
            with_t1: true,
            ..SolverSettings::default()
        });
        let bad = DVector::zeros(4);
        let err = solver
            .evaluate_energy(&mut mesh, &PlanarGeometry, &spring(), &bad)
            .unwrap_err();
        assert!(matches!(
            err,
            EpimechError::Solver(SolverError::TopologyChanged { trial: 2, mesh: 3, .. })
        ));
    }

    #[test]
    fn spring_gradient_passes_the_check() {
        let mut mesh = stretched_triangle();
        let solver = QuasistaticSolver::new(SolverSettings::default());
        let err = solver
            .check_gradient(&mut mesh, &PlanarGeometry, &spring(), 1e-9)
            .unwrap();
        assert!(err < 1e-4, "gradient discrepancy = {err}");
    }

    #[test]
    fn planar_model_gradient_passes_the_check() {
        let mut mesh = Mesh::new(2).unwrap();
        let pts = [
            (0.0, 0.0),
            (1.1, -0.1),
            (1.4, 0.9),
            (0.6, 1.5),
            (-0.2, 0.8),
        ];
        let verts: Vec<_> = pts
            .iter()
            .map(|&(x, y)| mesh.add_vertex(p(x, y)))
            .collect();
        mesh.add_face(&verts).unwrap();
        PlanarGeometry.update_all(&mut mesh).unwrap();

        let model = PlanarModel {
            area_elasticity: 1.0,
            preferred_area: 1.0,
            contractility: 0.04,
            line_tension: 0.1,
        };
        let solver = QuasistaticSolver::new(SolverSettings::default());
        let err = solver
            .check_gradient(&mut mesh, &PlanarGeometry, &model, 1e-9)
            .unwrap();
        assert!(err < 1e-4, "gradient discrepancy = {err}");
    }

    #[test]
    fn approx_gradient_restores_the_mesh() {
        let mut mesh = stretched_triangle();
        let before = mesh.active_positions();
        let solver = QuasistaticSolver::new(SolverSettings::default());
        solver
            .approx_gradient(&mut mesh, &PlanarGeometry, &spring(), 1e-9)
            .unwrap();
        assert_eq!(mesh.active_positions(), before);
    }

    #[test]
    fn fixed_vertices_pin_the_boundary() {
        // Fix two corners of the stretched triangle; only the third may move.
        let mut mesh = Mesh::new(2).unwrap();
        let a = mesh.add_fixed_vertex(p(0.0, 0.0));
        let b = mesh.add_fixed_vertex(p(2.0, 0.0));
        let c = mesh.add_vertex(p(0.0, 2.0));
        mesh.add_face(&[a, b, c]).unwrap();
        PlanarGeometry.update_all(&mut mesh).unwrap();

        let solver = QuasistaticSolver::new(SolverSettings::default());
        let result = solver
            .find_energy_min(&mut mesh, &PlanarGeometry, &spring(), &OptimizerOptions::default())
            .unwrap();

        assert!(result.converged);
        assert_eq!(result.x.len(), 2);
        assert_eq!(mesh.vertex(a).unwrap().point, p(0.0, 0.0));
        assert_eq!(mesh.vertex(b).unwrap().point, p(2.0, 0.0));
        // The free vertex settled where both springs are least stretched:
        // on the perpendicular bisector of the fixed edge.
        let settled = mesh.vertex(c).unwrap().point;
        assert!((settled.x - 1.0).abs() < 1e-4, "x = {}", settled.x);
    }
}
