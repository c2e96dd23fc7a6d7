pub mod edge;
pub mod face;
pub mod vertex;

pub use edge::{EdgeData, EdgeId};
pub use face::{FaceData, FaceId};
pub use vertex::{VertexData, VertexId};

use slotmap::{SecondaryMap, SlotMap};

use crate::error::{GeometryError, MeshError};
use crate::math::{DVector, Point3};

/// An immutable copy of vertex positions, taken before a position update.
///
/// Used as the "previous" state for collision-axis discovery and for
/// restoring positions after finite-difference sweeps.
pub type PositionSnapshot = SecondaryMap<VertexId, Point3>;

/// Mesh-level tunables.
#[derive(Debug, Clone, Copy)]
pub struct MeshSettings {
    /// Minimum separation margin enforced between two surfaces after
    /// collision correction, split evenly across the collision plane.
    pub shyness: f64,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self { shyness: 1e-10 }
    }
}

/// Central store for a vertex-model mesh.
///
/// Entities reference each other via typed IDs (generational indices).
/// The mesh also owns the ordered list of *active* vertices — those whose
/// positions are free optimization variables. The order of that list
/// defines the layout of the flattened coordinate vector exchanged with
/// the solver: vertex-major, axis-minor, `dim` axes per vertex.
#[derive(Debug)]
pub struct Mesh {
    vertices: SlotMap<VertexId, VertexData>,
    edges: SlotMap<EdgeId, EdgeData>,
    faces: SlotMap<FaceId, FaceData>,
    active: Vec<VertexId>,
    dim: usize,
    /// Mesh-level tunables, read by the collision stage.
    pub settings: MeshSettings,
}

impl Mesh {
    /// Creates a new, empty mesh embedded in `dim` coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error unless `dim` is 2 or 3.
    pub fn new(dim: usize) -> Result<Self, GeometryError> {
        if dim != 2 && dim != 3 {
            return Err(GeometryError::UnsupportedDimension {
                operation: "mesh construction",
                dim,
            });
        }
        Ok(Self {
            vertices: SlotMap::with_key(),
            edges: SlotMap::with_key(),
            faces: SlotMap::with_key(),
            active: Vec::new(),
            dim,
            settings: MeshSettings::default(),
        })
    }

    /// Number of embedding coordinates (2 or 3).
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    // --- Vertex operations ---

    /// Inserts an active vertex and returns its ID.
    pub fn add_vertex(&mut self, point: Point3) -> VertexId {
        let id = self.vertices.insert(VertexData::new(point));
        self.active.push(id);
        id
    }

    /// Inserts a fixed (boundary-condition) vertex and returns its ID.
    ///
    /// Fixed vertices are never part of the optimization variable.
    pub fn add_fixed_vertex(&mut self, point: Point3) -> VertexId {
        self.vertices.insert(VertexData::new(point))
    }

    /// Returns a reference to the vertex data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn vertex(&self, id: VertexId) -> Result<&VertexData, MeshError> {
        self.vertices
            .get(id)
            .ok_or(MeshError::EntityNotFound("vertex"))
    }

    /// Returns a mutable reference to the vertex data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn vertex_mut(&mut self, id: VertexId) -> Result<&mut VertexData, MeshError> {
        self.vertices
            .get_mut(id)
            .ok_or(MeshError::EntityNotFound("vertex"))
    }

    /// Removes a vertex from the store and, if present, from the active list.
    pub fn remove_vertex(&mut self, id: VertexId) -> Option<VertexData> {
        self.active.retain(|&v| v != id);
        self.vertices.remove(id)
    }

    /// Whether the vertex is a free optimization variable.
    #[must_use]
    pub fn is_active(&self, id: VertexId) -> bool {
        self.active.contains(&id)
    }

    /// The ordered active-vertex list defining the coordinate layout.
    #[must_use]
    pub fn active_vertices(&self) -> &[VertexId] {
        &self.active
    }

    /// Number of active vertices.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of vertices in the store (active and fixed).
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Iterates over all vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.keys()
    }

    // --- Edge operations ---

    /// Returns a reference to the half-edge data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn edge(&self, id: EdgeId) -> Result<&EdgeData, MeshError> {
        self.edges.get(id).ok_or(MeshError::EntityNotFound("edge"))
    }

    /// Returns a mutable reference to the half-edge data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn edge_mut(&mut self, id: EdgeId) -> Result<&mut EdgeData, MeshError> {
        self.edges
            .get_mut(id)
            .ok_or(MeshError::EntityNotFound("edge"))
    }

    /// Removes a half-edge, detaching it from its owning face's loop.
    pub fn remove_edge(&mut self, id: EdgeId) -> Option<EdgeData> {
        let data = self.edges.remove(id)?;
        if let Some(face) = self.faces.get_mut(data.face) {
            face.edges.retain(|&e| e != id);
        }
        Some(data)
    }

    /// Number of half-edges in the store.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Iterates over all half-edge IDs.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.keys()
    }

    /// Iterates over all half-edges with their IDs.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &EdgeData)> {
        self.edges.iter()
    }

    /// Whether any half-edge references the vertex as source or target.
    #[must_use]
    pub fn vertex_has_edges(&self, id: VertexId) -> bool {
        self.edges.values().any(|e| e.srce == id || e.trgt == id)
    }

    // --- Face operations ---

    /// Creates a face from an ordered vertex loop, building its half-edges.
    ///
    /// The vertices are taken in boundary order; an edge is created from
    /// each vertex to its successor, wrapping around.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than 3 vertices are given or any vertex is
    /// not in the store.
    pub fn add_face(&mut self, boundary: &[VertexId]) -> Result<FaceId, MeshError> {
        if boundary.len() < 3 {
            return Err(MeshError::InvalidMesh(format!(
                "face needs at least 3 vertices, got {}",
                boundary.len()
            )));
        }
        for &v in boundary {
            if !self.vertices.contains_key(v) {
                return Err(MeshError::EntityNotFound("vertex"));
            }
        }
        let face = self.faces.insert(FaceData::new());
        let mut loop_edges = Vec::with_capacity(boundary.len());
        for (i, &srce) in boundary.iter().enumerate() {
            let trgt = boundary[(i + 1) % boundary.len()];
            loop_edges.push(self.edges.insert(EdgeData::new(srce, trgt, face)));
        }
        if let Some(data) = self.faces.get_mut(face) {
            data.edges = loop_edges;
        }
        Ok(face)
    }

    /// Returns a reference to the face data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn face(&self, id: FaceId) -> Result<&FaceData, MeshError> {
        self.faces.get(id).ok_or(MeshError::EntityNotFound("face"))
    }

    /// Returns a mutable reference to the face data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn face_mut(&mut self, id: FaceId) -> Result<&mut FaceData, MeshError> {
        self.faces
            .get_mut(id)
            .ok_or(MeshError::EntityNotFound("face"))
    }

    /// Removes a face from the store. Its half-edges are left to the caller.
    pub fn remove_face(&mut self, id: FaceId) -> Option<FaceData> {
        self.faces.remove(id)
    }

    /// Number of faces in the store.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Iterates over all face IDs.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.faces.keys()
    }

    /// The face's boundary vertices: the source vertex of each loop edge,
    /// in boundary order.
    ///
    /// # Errors
    ///
    /// Returns an error if the face or one of its edges is not in the store.
    pub fn face_source_vertices(&self, id: FaceId) -> Result<Vec<VertexId>, MeshError> {
        let face = self.face(id)?;
        face.edges.iter().map(|&e| Ok(self.edge(e)?.srce)).collect()
    }

    /// Positions of the face's boundary vertices, in boundary order.
    ///
    /// # Errors
    ///
    /// Returns an error if the face, one of its edges, or a vertex is
    /// missing from the store.
    pub fn face_source_points(&self, id: FaceId) -> Result<Vec<Point3>, MeshError> {
        let verts = self.face_source_vertices(id)?;
        verts.iter().map(|&v| Ok(self.vertex(v)?.point)).collect()
    }

    /// Positions of the face's boundary vertices read from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the face or one of its edges is missing, or the
    /// snapshot does not cover one of the boundary vertices.
    pub fn face_source_points_from(
        &self,
        id: FaceId,
        snapshot: &PositionSnapshot,
    ) -> Result<Vec<Point3>, MeshError> {
        let verts = self.face_source_vertices(id)?;
        verts
            .iter()
            .map(|&v| {
                snapshot
                    .get(v)
                    .copied()
                    .ok_or(MeshError::EntityNotFound("snapshot position"))
            })
            .collect()
    }

    // --- Coordinate vector exchange ---

    /// Flattens the active vertices' positions into a coordinate vector.
    #[must_use]
    pub fn active_positions(&self) -> DVector {
        let mut flat = DVector::zeros(self.active.len() * self.dim);
        for (i, &v) in self.active.iter().enumerate() {
            if let Some(data) = self.vertices.get(v) {
                for axis in 0..self.dim {
                    flat[i * self.dim + axis] = data.point[axis];
                }
            }
        }
        flat
    }

    /// Scatters a flattened coordinate vector back onto the active vertices.
    ///
    /// This is the raw position write; derived geometry is stale until the
    /// next [`Geometry::update_all`](crate::geometry::Geometry::update_all).
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::PositionCountMismatch`] if the vector's length
    /// does not equal `dim * active_count`.
    pub fn set_active_positions(&mut self, flat: &DVector) -> Result<(), MeshError> {
        if flat.len() != self.active.len() * self.dim {
            return Err(MeshError::PositionCountMismatch {
                len: flat.len(),
                count: self.active.len(),
                dim: self.dim,
            });
        }
        for (i, &v) in self.active.iter().enumerate() {
            if let Some(data) = self.vertices.get_mut(v) {
                for axis in 0..self.dim {
                    data.point[axis] = flat[i * self.dim + axis];
                }
            }
        }
        Ok(())
    }

    /// Copies every vertex position into a snapshot.
    #[must_use]
    pub fn position_snapshot(&self) -> PositionSnapshot {
        let mut snapshot = SecondaryMap::with_capacity(self.vertices.len());
        for (id, data) in &self.vertices {
            snapshot.insert(id, data.point);
        }
        snapshot
    }

    /// Writes the snapshot's positions back onto the vertices it covers.
    pub fn restore_positions(&mut self, snapshot: &PositionSnapshot) {
        for (id, point) in snapshot {
            if let Some(data) = self.vertices.get_mut(id) {
                data.point = *point;
            }
        }
    }
}
