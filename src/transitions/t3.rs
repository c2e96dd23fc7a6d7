use tracing::debug;

use crate::error::Result;
use crate::mesh::Mesh;

use super::merge_vertices;

/// Type-3 transition: eliminates every face whose area magnitude is below
/// `threshold` by merging all of its boundary vertices into one, placed at
/// the face centroid.
///
/// The face's edge loop degenerates away with the merge; neighbouring
/// faces keep a single vertex where the small face used to be. Shrinks
/// the active-vertex set. Areas and centroids are read from the last
/// geometry update; run one before calling. Returns the number of faces
/// eliminated.
///
/// # Errors
///
/// Returns an error if the mesh references a missing entity.
pub fn eliminate_small_faces(mesh: &mut Mesh, threshold: f64) -> Result<usize> {
    let candidates: Vec<_> = mesh
        .face_ids()
        .filter(|&f| {
            mesh.face(f)
                .map(|data| data.area.abs() < threshold)
                .unwrap_or(false)
        })
        .collect();

    let mut count = 0;
    for id in candidates {
        // An earlier elimination may have taken this face with it.
        let Ok(face) = mesh.face(id) else { continue };
        let centroid = face.centroid;
        let verts = mesh.face_source_vertices(id)?;
        let Some((&keep, rest)) = verts.split_first() else {
            continue;
        };
        let mut dropped: Vec<_> = rest.iter().copied().filter(|&v| v != keep).collect();
        dropped.sort_unstable();
        dropped.dedup();
        merge_vertices(mesh, keep, &dropped, centroid)?;
        count += 1;
    }
    if count > 0 {
        debug!(count, "eliminated small faces");
    }
    Ok(count)
}
