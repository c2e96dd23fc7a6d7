use tracing::debug;

use crate::error::Result;
use crate::math::Point3;
use crate::mesh::Mesh;

use super::merge_vertices;

/// Type-1 transition: collapses every edge shorter than `threshold` by
/// merging its target vertex into its source, placed at the edge midpoint.
///
/// Both half-edges of a collapsed junction degenerate and vanish, so the
/// two faces sharing it each lose a side. Shrinks the active-vertex set.
/// Edge lengths are read from the last geometry update; run one before
/// calling. Returns the number of collapses performed.
///
/// # Errors
///
/// Returns an error if the mesh references a missing entity.
pub fn collapse_short_edges(mesh: &mut Mesh, threshold: f64) -> Result<usize> {
    let candidates: Vec<_> = mesh
        .edges()
        .filter(|(_, e)| e.length < threshold)
        .map(|(id, _)| id)
        .collect();

    let mut count = 0;
    for id in candidates {
        // Earlier collapses may have removed the edge or its endpoints.
        let Ok(edge) = mesh.edge(id) else { continue };
        let (srce, trgt) = (edge.srce, edge.trgt);
        if srce == trgt {
            continue;
        }
        let (Ok(a), Ok(b)) = (mesh.vertex(srce), mesh.vertex(trgt)) else {
            continue;
        };
        let midpoint = Point3::from((a.point.coords + b.point.coords) * 0.5);
        merge_vertices(mesh, srce, &[trgt], midpoint)?;
        count += 1;
    }
    if count > 0 {
        debug!(count, "collapsed short edges");
    }
    Ok(count)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::{Geometry, PlanarGeometry};

    fn p(x: f64, y: f64) -> Point3 {
        Point3::new(x, y, 0.0)
    }

    #[test]
    fn short_junction_collapses_and_shrinks_the_active_set() {
        // Two quads whose shared junction b-e is much shorter than the
        // other sides.
        let mut mesh = Mesh::new(2).unwrap();
        let a = mesh.add_vertex(p(0.0, 0.0));
        let b = mesh.add_vertex(p(1.0, 0.495));
        let c = mesh.add_vertex(p(2.0, 0.0));
        let d = mesh.add_vertex(p(2.0, 1.0));
        let e = mesh.add_vertex(p(1.0, 0.505));
        let f = mesh.add_vertex(p(0.0, 1.0));
        let left = mesh.add_face(&[a, b, e, f]).unwrap();
        let right = mesh.add_face(&[b, c, d, e]).unwrap();
        PlanarGeometry.update_all(&mut mesh).unwrap();

        let active_before = mesh.active_count();
        let count = collapse_short_edges(&mut mesh, 0.05).unwrap();

        assert_eq!(count, 1);
        assert_eq!(mesh.active_count(), active_before - 1);
        assert_eq!(mesh.face(left).unwrap().edges.len(), 3);
        assert_eq!(mesh.face(right).unwrap().edges.len(), 3);
        // The merged vertex sits at the old junction midpoint.
        assert_eq!(mesh.vertex(b).unwrap().point, p(1.0, 0.5));
    }

    #[test]
    fn long_edges_are_left_alone() {
        let mut mesh = Mesh::new(2).unwrap();
        let a = mesh.add_vertex(p(0.0, 0.0));
        let b = mesh.add_vertex(p(1.0, 0.0));
        let c = mesh.add_vertex(p(0.5, 1.0));
        mesh.add_face(&[a, b, c]).unwrap();
        PlanarGeometry.update_all(&mut mesh).unwrap();

        assert_eq!(collapse_short_edges(&mut mesh, 0.05).unwrap(), 0);
        assert_eq!(mesh.edge_count(), 3);
    }
}
