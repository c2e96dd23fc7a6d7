use thiserror::Error;

/// Top-level error type for the Epimech vertex-model kernel.
#[derive(Debug, Error)]
pub enum EpimechError {
    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Solver(#[from] SolverError),
}

/// Errors related to the mesh entity store.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("entity not found: {0}")]
    EntityNotFound(&'static str),

    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    /// A position vector's length does not factor into `dim * active_count`.
    #[error("position vector of length {len} does not match {count} active vertices in {dim} dimensions")]
    PositionCountMismatch { len: usize, count: usize, dim: usize },
}

/// Errors related to geometric computations.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("unsupported dimension {dim} for {operation}")]
    UnsupportedDimension {
        operation: &'static str,
        dim: usize,
    },
}

/// Errors related to the quasistatic solver.
#[derive(Debug, Error)]
pub enum SolverError {
    /// The active-vertex set changed while an optimizer run was in flight.
    ///
    /// This is a control signal, not a failure: the solver catches it and
    /// restarts the optimization with the new active set.
    #[error("topology changed before {context} evaluation: trial has {trial} vertices, mesh has {mesh}")]
    TopologyChanged {
        context: &'static str,
        trial: usize,
        mesh: usize,
    },
}

/// Convenience type alias for results using [`EpimechError`].
pub type Result<T> = std::result::Result<T, EpimechError>;
