pub mod bbox;
pub mod intersect_2d;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Dynamically sized column vector, used for flattened coordinate layouts.
pub type DVector = nalgebra::DVector<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;
