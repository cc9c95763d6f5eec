//! Mathematical functions.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A cubic function.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CubicFn {
    coeffs: [f64; 4],
    offset: f64,
}

impl CubicFn {
    pub const fn constant(y: f64) -> Self {
        Self {
            coeffs: [0.0, 0.0, 0.0, y],
            offset: 0.0,
        }
    }

    /// Creates the cubic `a + b(x - x0) + c(x - x0)^2 + d(x - x0)^3`.
    pub const fn about(x0: f64, a: f64, b: f64, c: f64, d: f64) -> Self {
        Self {
            coeffs: [d, c, b, a],
            offset: -x0,
        }
    }

    pub fn y(&self, x: f64) -> f64 {
        self.y_and_dy(x).0
    }

    pub fn dy(&self, x: f64) -> f64 {
        self.y_and_dy(x).1
    }

    pub fn y_and_dy(&self, x: f64) -> (f64, f64) {
        let c = &self.coeffs;
        let x = x + self.offset;

        let y = ((c[0] * x + c[1]) * x + c[2]) * x + c[3];
        let dy = (c[0] * 3. * x + c[1] * 2.) * x + c[2];

        (y, dy)
    }
}
