pub mod optimize;
pub mod pipeline;
pub mod quasistatic;

pub use optimize::{minimize, Objective, OptimizeResult, OptimizerOptions};
pub use pipeline::{PositionPipeline, SolverSettings, Stage};
pub use quasistatic::QuasistaticSolver;
