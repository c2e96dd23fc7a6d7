pub mod t1;
pub mod t3;

pub use t1::collapse_short_edges;
pub use t3::eliminate_small_faces;

use crate::error::Result;
use crate::math::Point3;
use crate::mesh::{Mesh, VertexId};

/// Merges `dropped` vertices into `keep`, placed at `at`.
///
/// Every half-edge referencing a dropped vertex is rewired to `keep`;
/// edges that become degenerate (source equals target) are removed, faces
/// left with fewer than three sides are removed together with their
/// remaining edges, and vertices left without any incident half-edge are
/// dropped from the store and the active list. This is the shared
/// machinery behind both transition operators.
pub(crate) fn merge_vertices(
    mesh: &mut Mesh,
    keep: VertexId,
    dropped: &[VertexId],
    at: Point3,
) -> Result<()> {
    mesh.vertex_mut(keep)?.point = at;

    // Rewire half-edges away from the dropped vertices.
    let edge_ids: Vec<_> = mesh.edge_ids().collect();
    for id in &edge_ids {
        let edge = mesh.edge_mut(*id)?;
        if dropped.contains(&edge.srce) {
            edge.srce = keep;
        }
        if dropped.contains(&edge.trgt) {
            edge.trgt = keep;
        }
    }

    // Degenerate edges vanish; their faces shed a side.
    let mut touched = vec![keep];
    for id in edge_ids {
        let Ok(edge) = mesh.edge(id) else { continue };
        if edge.srce == edge.trgt {
            if let Some(data) = mesh.remove_edge(id) {
                touched.push(data.srce);
                touched.push(data.trgt);
            }
        }
    }

    // A face needs at least three sides to enclose anything.
    let collapsed: Vec<_> = mesh
        .face_ids()
        .filter(|&f| mesh.face(f).map(|d| d.edges.len() < 3).unwrap_or(false))
        .collect();
    for face in collapsed {
        let loop_edges = mesh.face(face)?.edges.clone();
        for e in loop_edges {
            if let Some(data) = mesh.remove_edge(e) {
                touched.push(data.srce);
                touched.push(data.trgt);
            }
        }
        mesh.remove_face(face);
    }

    for &v in dropped {
        mesh.remove_vertex(v);
    }

    // Vertices stranded by the removals above leave the store too.
    touched.sort_unstable();
    touched.dedup();
    for v in touched {
        if mesh.vertex(v).is_ok() && !mesh.vertex_has_edges(v) {
            mesh.remove_vertex(v);
        }
    }

    Ok(())
}
