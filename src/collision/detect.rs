use crate::error::Result;
use crate::math::bbox::Aabb;
use crate::math::intersect_2d::segments_cross_2d;
use crate::mesh::{EdgeId, Mesh};

/// Finds all pairs of half-edges whose segments currently cross.
///
/// Planar detector: segments are tested in the xy plane. Pairs that share
/// a vertex or belong to the same face are skipped — the loop around a
/// face and the junction between adjacent faces are not self-intersections.
/// Endpoint touches are likewise not crossings. Returns an empty list for
/// a mesh with no self-intersection.
///
/// # Errors
///
/// Returns an error if an edge references a missing vertex.
pub fn find_intersections(mesh: &Mesh) -> Result<Vec<(EdgeId, EdgeId)>> {
    let edge_ids: Vec<_> = mesh.edge_ids().collect();

    // Segment endpoints and a per-edge box for cheap rejection.
    let mut segments = Vec::with_capacity(edge_ids.len());
    for &id in &edge_ids {
        let edge = mesh.edge(id)?;
        let srce = mesh.vertex(edge.srce)?.point;
        let trgt = mesh.vertex(edge.trgt)?.point;
        let Some(bb) = Aabb::from_points(&[srce, trgt]) else {
            continue;
        };
        segments.push((id, edge.srce, edge.trgt, edge.face, srce, trgt, bb));
    }

    let mut crossings = Vec::new();
    for (i, a) in segments.iter().enumerate() {
        for b in &segments[i + 1..] {
            let (ia, a_srce, a_trgt, a_face, a0, a1, a_bb) = a;
            let (ib, b_srce, b_trgt, b_face, b0, b1, b_bb) = b;
            if a_face == b_face {
                continue;
            }
            if a_srce == b_srce || a_srce == b_trgt || a_trgt == b_srce || a_trgt == b_trgt {
                continue;
            }
            if !a_bb.overlaps(b_bb, 2) {
                continue;
            }
            if segments_cross_2d(a0, a1, b0, b1).is_some() {
                crossings.push((*ia, *ib));
            }
        }
    }
    Ok(crossings)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;

    fn p(x: f64, y: f64) -> Point3 {
        Point3::new(x, y, 0.0)
    }

    #[test]
    fn disjoint_faces_have_no_intersections() {
        let mut mesh = Mesh::new(2).unwrap();
        let a = mesh.add_vertex(p(0.0, 0.0));
        let b = mesh.add_vertex(p(1.0, 0.0));
        let c = mesh.add_vertex(p(0.5, 1.0));
        mesh.add_face(&[a, b, c]).unwrap();
        let d = mesh.add_vertex(p(3.0, 0.0));
        let e = mesh.add_vertex(p(4.0, 0.0));
        let f = mesh.add_vertex(p(3.5, 1.0));
        mesh.add_face(&[d, e, f]).unwrap();

        assert!(find_intersections(&mesh).unwrap().is_empty());
    }

    #[test]
    fn overlapping_faces_cross() {
        let mut mesh = Mesh::new(2).unwrap();
        let a = mesh.add_vertex(p(0.0, 0.0));
        let b = mesh.add_vertex(p(2.0, 0.0));
        let c = mesh.add_vertex(p(1.0, 2.0));
        mesh.add_face(&[a, b, c]).unwrap();
        // Second triangle shifted to overlap the first.
        let d = mesh.add_vertex(p(1.0, -0.5));
        let e = mesh.add_vertex(p(3.0, -0.5));
        let f = mesh.add_vertex(p(2.0, 1.5));
        mesh.add_face(&[d, e, f]).unwrap();

        let pairs = find_intersections(&mesh).unwrap();
        assert!(!pairs.is_empty());
        for (e0, e1) in pairs {
            let f0 = mesh.edge(e0).unwrap().face;
            let f1 = mesh.edge(e1).unwrap().face;
            assert_ne!(f0, f1, "crossings must involve two distinct faces");
        }
    }

    #[test]
    fn shared_junction_is_not_an_intersection() {
        // Two quads sharing the junction 1-4, each with its own half-edges.
        let mut mesh = Mesh::new(2).unwrap();
        let v0 = mesh.add_vertex(p(0.0, 0.0));
        let v1 = mesh.add_vertex(p(1.0, 0.0));
        let v2 = mesh.add_vertex(p(2.0, 0.0));
        let v3 = mesh.add_vertex(p(2.0, 1.0));
        let v4 = mesh.add_vertex(p(1.0, 1.0));
        let v5 = mesh.add_vertex(p(0.0, 1.0));
        mesh.add_face(&[v0, v1, v4, v5]).unwrap();
        mesh.add_face(&[v1, v2, v3, v4]).unwrap();

        assert!(find_intersections(&mesh).unwrap().is_empty());
    }
}
