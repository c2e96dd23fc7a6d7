use tracing::info;

use crate::collision::{find_intersections, CollidingBoxes};
use crate::error::Result;
use crate::geometry::Geometry;
use crate::math::DVector;
use crate::mesh::Mesh;
use crate::transitions::{collapse_short_edges, eliminate_small_faces};

/// Solver-level configuration: which correction stages run after every
/// position write, and the thresholds the transition operators use.
#[derive(Debug, Clone, Copy)]
pub struct SolverSettings {
    /// Detect and resolve self-collisions after each write.
    pub with_collisions: bool,
    /// Collapse degenerate short edges after each write.
    pub with_t1: bool,
    /// Eliminate degenerate small faces after each write.
    pub with_t3: bool,
    /// Edge length below which a type-1 transition fires.
    pub t1_threshold: f64,
    /// Face area magnitude below which a type-3 transition fires.
    pub t3_threshold: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            with_collisions: false,
            with_t1: false,
            with_t3: false,
            t1_threshold: 1e-2,
            t3_threshold: 1e-2,
        }
    }
}

/// A correction stage of the position-update pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Snapshot-compare collision correction.
    Collisions,
    /// Type-1 short-edge collapse.
    TypeOne,
    /// Type-3 small-face elimination.
    TypeThree,
}

/// The position-update pipeline: scatters a trial vector onto the mesh,
/// refreshes the geometry, then runs the enabled correction stages in the
/// fixed order collisions → T1 → T3.
///
/// When nothing needs correcting, the pipeline is transparent: the mesh
/// state equals a plain scatter-and-update, bit for bit.
#[derive(Debug)]
pub struct PositionPipeline {
    stages: Vec<Stage>,
    t1_threshold: f64,
    t3_threshold: f64,
}

impl PositionPipeline {
    /// Builds the stage list from the solver settings.
    #[must_use]
    pub fn from_settings(settings: &SolverSettings) -> Self {
        let mut stages = Vec::new();
        if settings.with_collisions {
            stages.push(Stage::Collisions);
        }
        if settings.with_t1 {
            stages.push(Stage::TypeOne);
        }
        if settings.with_t3 {
            stages.push(Stage::TypeThree);
        }
        Self {
            stages,
            t1_threshold: settings.t1_threshold,
            t3_threshold: settings.t3_threshold,
        }
    }

    /// The enabled stages, in execution order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Whether any enabled stage may change the active-vertex set.
    #[must_use]
    pub fn reshapes_topology(&self) -> bool {
        self.stages
            .iter()
            .any(|s| matches!(s, Stage::TypeOne | Stage::TypeThree))
    }

    /// Writes a trial coordinate vector onto the mesh and applies the
    /// enabled corrections.
    ///
    /// # Errors
    ///
    /// Returns an error if the trial vector does not match the active
    /// layout, or if a stage references a missing entity.
    pub fn write(&self, mesh: &mut Mesh, geometry: &dyn Geometry, trial: &DVector) -> Result<()> {
        // The collision stage needs the pre-write state to discover the
        // crossing axis.
        let snapshot = self
            .stages
            .contains(&Stage::Collisions)
            .then(|| mesh.position_snapshot());

        mesh.set_active_positions(trial)?;
        geometry.update_all(mesh)?;

        for stage in &self.stages {
            match stage {
                Stage::Collisions => {
                    let Some(previous) = snapshot.as_ref() else {
                        continue;
                    };
                    let edge_pairs = find_intersections(mesh)?;
                    if edge_pairs.is_empty() {
                        continue;
                    }
                    info!(count = edge_pairs.len(), "intersections detected");
                    let boxes = CollidingBoxes::new(mesh, &edge_pairs)?;
                    let shyness = mesh.settings.shyness;
                    if boxes.resolve(mesh, previous, shyness)? > 0 {
                        geometry.update_all(mesh)?;
                    }
                }
                Stage::TypeOne => {
                    if collapse_short_edges(mesh, self.t1_threshold)? > 0 {
                        geometry.update_all(mesh)?;
                    }
                }
                Stage::TypeThree => {
                    if eliminate_small_faces(mesh, self.t3_threshold)? > 0 {
                        geometry.update_all(mesh)?;
                    }
                }
            }
        }
        Ok(())
    }
}
