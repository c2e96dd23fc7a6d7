use super::{Point3, TOLERANCE};

/// Strict crossing test for two planar segments `a0→a1` and `b0→b1`.
///
/// Works in the xy plane; z coordinates are ignored. Returns the parameter
/// pair `(t, u)` of the crossing point on each segment, or `None` when the
/// segments are parallel, disjoint, or only touch at an endpoint. Endpoint
/// touches are excluded because two half-edges meeting at a shared junction
/// are not a self-intersection.
#[must_use]
pub fn segments_cross_2d(a0: &Point3, a1: &Point3, b0: &Point3, b1: &Point3) -> Option<(f64, f64)> {
    let dax = a1.x - a0.x;
    let day = a1.y - a0.y;
    let dbx = b1.x - b0.x;
    let dby = b1.y - b0.y;

    let cross = dax * dby - day * dbx;
    if cross.abs() < TOLERANCE {
        return None;
    }

    let dx = b0.x - a0.x;
    let dy = b0.y - a0.y;
    let t = (dx * dby - dy * dbx) / cross;
    let u = (dx * day - dy * dax) / cross;

    // Open-interval bounds: a parameter at 0 or 1 is an endpoint touch.
    let eps = TOLERANCE * 100.0;
    let interior = |s: f64| s > eps && s < 1.0 - eps;
    if interior(t) && interior(u) {
        Some((t, u))
    } else {
        None
    }
}
