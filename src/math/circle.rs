use super::{is_finite_point, Point2d};
use crate::util::rotated_range;
use cgmath::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Triples whose cross product is below this fraction of the product of
/// their chord lengths are treated as collinear.
const COLLINEAR_TOLERANCE: f64 = 1e-9;

/// The circle approximating the local curvature of the centerline
/// at a waypoint.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TurnCircle {
    /// A circle through three consecutive waypoints.
    Arc { centre: Point2d, radius: f64 },
    /// The waypoints are (nearly) collinear or coincident.
    Straight,
}

impl TurnCircle {
    /// The radius of the circle in m, which is infinite for straights.
    pub fn radius(&self) -> f64 {
        match self {
            Self::Arc { radius, .. } => *radius,
            Self::Straight => f64::INFINITY,
        }
    }

    /// The centre of the circle, if it has one.
    pub fn centre(&self) -> Option<Point2d> {
        match self {
            Self::Arc { centre, .. } => Some(*centre),
            Self::Straight => None,
        }
    }

    pub fn is_straight(&self) -> bool {
        matches!(self, Self::Straight)
    }
}

/// Finds the circle passing through three points.
///
/// The circle is written as `x^2 + y^2 + 2gx + 2fy + c = 0`, giving a centre
/// of `(-g, -f)` and a radius of `sqrt(g^2 + f^2 - c)`.
/// Collinear or coincident points produce [TurnCircle::Straight].
pub fn fit_circle(p1: Point2d, p2: Point2d, p3: Point2d) -> TurnCircle {
    let (x1, y1, x2, y2, x3, y3) = (p1.x, p1.y, p2.x, p2.y, p3.x, p3.y);
    let (x12, x13, y12, y13) = (x1 - x2, x1 - x3, y1 - y2, y1 - y3);

    let cross = x12 * y13 - y12 * x13;
    let scale = (p2 - p1).magnitude() * (p3 - p1).magnitude();
    if !(cross.abs() > COLLINEAR_TOLERANCE * scale) {
        return TurnCircle::Straight;
    }

    let sx13 = x1 * x1 - x3 * x3;
    let sy13 = y1 * y1 - y3 * y3;
    let sx21 = x2 * x2 - x1 * x1;
    let sy21 = y2 * y2 - y1 * y1;

    let f = ((sx13 + sy13) * x12 + (sx21 + sy21) * x13) / (2.0 * (y12 * x13 - y13 * x12));
    let g = ((sx13 + sy13) * y12 + (sx21 + sy21) * y13) / (2.0 * (x12 * y13 - x13 * y12));
    let c = -x1 * x1 - y1 * y1 - 2.0 * g * x1 - 2.0 * f * y1;

    let centre = Point2d::new(-g, -f);
    let radius_sq = g * g + f * f - c;
    if !(radius_sq > 0.0) || !radius_sq.is_finite() || !is_finite_point(centre) {
        return TurnCircle::Straight;
    }

    TurnCircle::Arc {
        centre,
        radius: radius_sq.sqrt(),
    }
}

/// Fits one circle to every waypoint.
///
/// An open track fits the `N - 2` consecutive triples and repeats the
/// final circle for the last two waypoints. A closed track wraps around,
/// so the triple starting at waypoint `i` is always `(i, i + 1, i + 2)`.
pub fn fit_circles(waypoints: &[Point2d], closed: bool) -> Vec<TurnCircle> {
    let n = waypoints.len();
    if n < 3 {
        return vec![TurnCircle::Straight; n];
    }

    if closed {
        return (0..n)
            .map(|i| {
                let mut triple = rotated_range(n, i).map(|j| waypoints[j]);
                match (triple.next(), triple.next(), triple.next()) {
                    (Some(a), Some(b), Some(c)) => fit_circle(a, b, c),
                    _ => TurnCircle::Straight,
                }
            })
            .collect();
    }

    let mut circles: Vec<_> = waypoints
        .windows(3)
        .map(|w| fit_circle(w[0], w[1], w[2]))
        .collect();
    let last = circles[circles.len() - 1];
    circles.push(last);
    circles.push(last);
    circles
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::{Rng, SeedableRng};

    #[test]
    fn collinear_points_are_straight() {
        let circle = fit_circle(
            Point2d::new(0.0, 0.0),
            Point2d::new(1.0, 0.0),
            Point2d::new(2.0, 0.0),
        );
        assert_eq!(circle, TurnCircle::Straight);
        assert_eq!(circle.radius(), f64::INFINITY);
        assert!(!circle.radius().is_nan());
        assert_eq!(circle.centre(), None);
    }

    #[test]
    fn coincident_points_are_straight() {
        let p = Point2d::new(3.0, -1.0);
        assert!(fit_circle(p, p, Point2d::new(4.0, 2.0)).is_straight());
        assert!(fit_circle(p, p, p).is_straight());
    }

    #[test]
    fn unit_circle_through_three_points() {
        let circle = fit_circle(
            Point2d::new(0.0, 0.0),
            Point2d::new(1.0, 1.0),
            Point2d::new(2.0, 0.0),
        );
        let centre = circle.centre().unwrap();
        assert_approx_eq!(centre.x, 1.0);
        assert_approx_eq!(centre.y, 0.0);
        assert_approx_eq!(circle.radius(), 1.0);
    }

    #[test]
    fn random_circles() {
        let mut rng = rand::rngs::StdRng::from_seed(*b"Hairpins are wider than they...!");
        for _i in 0..100 {
            let centre = Point2d::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0));
            let radius = rng.gen_range(0.5..200.0);
            let angle = rng.gen_range(0.0..std::f64::consts::TAU);
            let on_circle = |a: f64| centre + radius * cgmath::Vector2::new(a.cos(), a.sin());
            let (p1, p2, p3) = (on_circle(angle), on_circle(angle + 0.4), on_circle(angle + 1.1));
            let circle = fit_circle(p1, p2, p3);

            let fitted = circle.centre().unwrap();
            assert_approx_eq!(circle.radius(), radius, 1e-6 * radius);
            assert_approx_eq!(fitted.x, centre.x, 1e-6 * radius);
            assert_approx_eq!(fitted.y, centre.y, 1e-6 * radius);
        }
    }

    #[test]
    fn open_track_pads_with_last_circle() {
        let points = [
            Point2d::new(0.0, 0.0),
            Point2d::new(1.0, 0.0),
            Point2d::new(2.0, 0.0),
            Point2d::new(3.0, 1.0),
            Point2d::new(3.0, 2.0),
        ];
        let circles = fit_circles(&points, false);
        assert_eq!(circles.len(), points.len());
        assert!(circles[0].is_straight());
        assert!(!circles[2].is_straight());
        assert_eq!(circles[3], circles[2]);
        assert_eq!(circles[4], circles[2]);
    }

    #[test]
    fn closed_track_wraps_triples() {
        let square = [
            Point2d::new(0.0, 0.0),
            Point2d::new(2.0, 0.0),
            Point2d::new(2.0, 2.0),
            Point2d::new(0.0, 2.0),
        ];
        let circles = fit_circles(&square, true);
        assert_eq!(circles.len(), 4);
        for circle in circles {
            assert_approx_eq!(circle.radius(), f64::sqrt(2.0));
            let centre = circle.centre().unwrap();
            assert_approx_eq!(centre.x, 1.0);
            assert_approx_eq!(centre.y, 1.0);
        }
    }
}
