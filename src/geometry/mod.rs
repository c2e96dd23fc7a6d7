use crate::error::Result;
use crate::math::{Point3, Vector3};
use crate::mesh::Mesh;

/// Recomputes derived geometric quantities after a position write.
///
/// Implementations must be idempotent and must not mutate anything beyond
/// the mesh's derived fields: running `update_all` twice in a row leaves
/// the mesh in the same state as running it once.
pub trait Geometry {
    /// Refreshes every derived quantity from the current vertex positions.
    ///
    /// # Errors
    ///
    /// Returns an error if the mesh references a missing entity.
    fn update_all(&self, mesh: &mut Mesh) -> Result<()>;
}

/// Geometry of a planar or near-planar sheet of polygonal faces.
///
/// Refreshes per-edge displacement and length, and per-face centroid,
/// perimeter and area. On 2D meshes the face area is the signed shoelace
/// area (positive for counter-clockwise winding); on 3D meshes it is the
/// unsigned cross-sum magnitude.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlanarGeometry;

impl Geometry for PlanarGeometry {
    fn update_all(&self, mesh: &mut Mesh) -> Result<()> {
        let edge_ids: Vec<_> = mesh.edge_ids().collect();
        for id in edge_ids {
            let edge = mesh.edge(id)?;
            let srce = mesh.vertex(edge.srce)?.point;
            let trgt = mesh.vertex(edge.trgt)?.point;
            let displacement = trgt - srce;
            let length = displacement.norm();
            let edge = mesh.edge_mut(id)?;
            edge.displacement = displacement;
            edge.length = length;
        }

        let face_ids: Vec<_> = mesh.face_ids().collect();
        for id in face_ids {
            let points = mesh.face_source_points(id)?;
            let perimeter = mesh
                .face(id)?
                .edges
                .iter()
                .map(|&e| mesh.edge(e).map(|d| d.length))
                .sum::<std::result::Result<f64, _>>()?;
            let centroid = centroid_of(&points);
            let area = if mesh.dim() == 2 {
                signed_area_2d(&points)
            } else {
                cross_sum_area(&points, &centroid)
            };
            let face = mesh.face_mut(id)?;
            face.centroid = centroid;
            face.perimeter = perimeter;
            face.area = area;
        }
        Ok(())
    }
}

#[allow(clippy::cast_precision_loss)]
fn centroid_of(points: &[Point3]) -> Point3 {
    if points.is_empty() {
        return Point3::origin();
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / points.len() as f64)
}

/// Signed shoelace area of a polygon in the xy plane.
fn signed_area_2d(points: &[Point3]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let mut twice_area = 0.0;
    for i in 0..n {
        let a = &points[i];
        let b = &points[(i + 1) % n];
        twice_area += a.x * b.y - b.x * a.y;
    }
    0.5 * twice_area
}

/// Unsigned area of a (near-)planar 3D polygon via the cross-product sum
/// about the centroid.
fn cross_sum_area(points: &[Point3], centroid: &Point3) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let mut cross_sum = Vector3::zeros();
    for i in 0..n {
        let a = points[i] - centroid;
        let b = points[(i + 1) % n] - centroid;
        cross_sum += a.cross(&b);
    }
    0.5 * cross_sum.norm()
}
