//! Mathematical structs and functions.

use cgmath::{Point2, Vector2};
pub use circle::{fit_circle, fit_circles, TurnCircle};
pub use cubic::CubicFn;
pub use spline::SmoothingSpline;
pub use util::*;

mod circle;
mod cubic;
mod spline;
mod util;

/// A 2D point
pub type Point2d = Point2<f64>;

/// A 2D vector
pub type Vector2d = Vector2<f64>;
