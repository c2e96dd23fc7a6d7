use super::Point3;

/// An axis-aligned bounding box.
///
/// `min` and `max` hold, per coordinate axis, the lowest and highest
/// coordinate seen among the enclosed points. A box built from a single
/// point (or from coincident points) is valid and has zero volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3,
    /// Maximum corner of the bounding box.
    pub max: Point3,
}

impl Aabb {
    /// Builds the bounding box of a non-empty point set.
    ///
    /// Returns `None` for an empty slice.
    #[must_use]
    pub fn from_points(points: &[Point3]) -> Option<Self> {
        let first = points.first()?;
        let mut min = *first;
        let mut max = *first;
        for p in &points[1..] {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        Some(Self { min, max })
    }

    /// The `(low, high)` interval covered on the given axis.
    #[must_use]
    pub fn interval(&self, axis: usize) -> (f64, f64) {
        (self.min[axis], self.max[axis])
    }

    /// Extent of the box along the given axis.
    #[must_use]
    pub fn extent(&self, axis: usize) -> f64 {
        self.max[axis] - self.min[axis]
    }

    /// Whether the box overlaps `other` on every one of the first `dim` axes.
    #[must_use]
    pub fn overlaps(&self, other: &Self, dim: usize) -> bool {
        (0..dim).all(|axis| self.min[axis] <= other.max[axis] && other.min[axis] <= self.max[axis])
    }
}
