use crate::debug::{debug_circle, debug_segment};
use crate::error::{PlanError, Result};
use crate::math::{angle_between, fit_circles, is_finite_point, Point2d, TurnCircle};
use cgmath::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The fewest waypoints from which curvature can be estimated.
pub const MIN_WAYPOINTS: usize = 3;

/// How the ends of the waypoint sequence relate to each other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TrackLayout {
    /// The first and last waypoints are unrelated.
    #[default]
    Open,
    /// The last waypoint is followed by the first, as on a full lap.
    Closed,
}

/// The centerline of a track, with its curvature and arc-length estimates.
#[derive(Clone, Debug)]
pub struct Track {
    /// The centerline waypoints in the direction of travel.
    waypoints: Vec<Point2d>,
    /// The turn circle at each waypoint.
    circles: Vec<TurnCircle>,
    /// The distance from each waypoint to the next in m.
    lengths: Vec<f64>,
    /// The running sum of `lengths`.
    cumulative: Vec<f64>,
    layout: TrackLayout,
}

impl Track {
    /// Builds a track from its centerline waypoints.
    pub fn new(waypoints: Vec<Point2d>, layout: TrackLayout) -> Result<Self> {
        if waypoints.len() < MIN_WAYPOINTS {
            return Err(PlanError::InsufficientInput {
                required: MIN_WAYPOINTS,
                actual: waypoints.len(),
            });
        }
        if let Some(index) = waypoints.iter().position(|p| !is_finite_point(*p)) {
            return Err(PlanError::NonFiniteWaypoint { index });
        }

        let circles = fit_circles(&waypoints, layout == TrackLayout::Closed);
        let lengths = segment_lengths(&waypoints, &circles, layout);
        let cumulative = cumulative_arc_length(&lengths);

        for (circle, pair) in circles.iter().zip(waypoints.windows(2)) {
            match circle {
                TurnCircle::Arc { centre, radius } => debug_circle("turn", *centre, *radius),
                TurnCircle::Straight => debug_segment("straight", pair[0], pair[1]),
            }
        }

        Ok(Self {
            waypoints,
            circles,
            lengths,
            cumulative,
            layout,
        })
    }

    /// The number of waypoints.
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn layout(&self) -> TrackLayout {
        self.layout
    }

    pub fn waypoints(&self) -> &[Point2d] {
        &self.waypoints
    }

    pub fn circles(&self) -> &[TurnCircle] {
        &self.circles
    }

    /// The turn radius at each waypoint, infinite on straights.
    pub fn radii(&self) -> Vec<f64> {
        self.circles.iter().map(TurnCircle::radius).collect()
    }

    /// The estimated distance from each waypoint to the next, in m.
    pub fn segment_lengths(&self) -> &[f64] {
        &self.lengths
    }

    /// The running sum of the segment lengths, starting with the first segment.
    pub fn cumulative_arc_length(&self) -> &[f64] {
        &self.cumulative
    }

    /// The total length of the track in m.
    pub fn length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }
}

/// Finds the length of the arc of `circle` between two points, measured by
/// the angle they subtend at the circle's centre.
///
/// Returns `None` for straights, or if either point sits on the centre.
pub fn arc_length(from: Point2d, to: Point2d, circle: &TurnCircle) -> Option<f64> {
    match *circle {
        TurnCircle::Arc { centre, radius } => {
            let angle = angle_between(from - centre, to - centre)?;
            Some(radius * angle)
        }
        TurnCircle::Straight => None,
    }
}

/// Estimates the distance travelled between each pair of consecutive waypoints.
///
/// Segment `i` is measured along circle `i` between waypoints `i - 1` and `i`.
/// The first segment has no predecessor on an open track and is measured
/// between waypoints 0 and 1 instead, while a closed track wraps around to
/// the last waypoint. Straights fall back to the Euclidean distance between
/// waypoints `i` and `i + 1`.
pub fn segment_lengths(
    waypoints: &[Point2d],
    circles: &[TurnCircle],
    layout: TrackLayout,
) -> Vec<f64> {
    let n = waypoints.len();
    (0..n.saturating_sub(1))
        .map(|i| {
            let (from, to) = match (i, layout) {
                (0, TrackLayout::Open) => (waypoints[0], waypoints[1]),
                (0, TrackLayout::Closed) => (waypoints[n - 1], waypoints[0]),
                _ => (waypoints[i - 1], waypoints[i]),
            };
            circles
                .get(i)
                .and_then(|circle| arc_length(from, to, circle))
                .filter(|len| len.is_finite())
                .unwrap_or_else(|| waypoints[i].distance(waypoints[i + 1]))
        })
        .collect()
}

/// Computes the running sum of the segment lengths.
///
/// The first entry is the length of the first segment, so entry `i` is the
/// distance along the track to waypoint `i + 1`.
pub fn cumulative_arc_length(lengths: &[f64]) -> Vec<f64> {
    lengths
        .iter()
        .scan(0.0, |total, len| {
            *total += len;
            Some(*total)
        })
        .collect()
}
