//! Centerline extraction from track boundary cones.
//!
//! Cones are supplied as a single sequence alternating between the two sides
//! of the track. Each batch of cones is triangulated, and the edges joining a
//! cone on one side to a cone on the other span the track. Their midpoints
//! trace the centerline.

use crate::error::{PlanError, Result};
use crate::math::{midpoint, Point2d};
use itertools::Itertools;
use log::warn;

/// Triangulates a set of points.
///
/// Implementations typically compute a Delaunay triangulation.
pub trait Triangulator {
    /// Returns the triangles covering `points` as triples of indices into `points`.
    fn triangulate(&self, points: &[Point2d]) -> Result<Vec<[usize; 3]>>;
}

/// Triangulates cones that are ordered along the track and alternate sides,
/// joining each run of three consecutive cones into a triangle.
#[derive(Clone, Copy, Debug, Default)]
pub struct StripTriangulator;

impl Triangulator for StripTriangulator {
    fn triangulate(&self, points: &[Point2d]) -> Result<Vec<[usize; 3]>> {
        if points.len() < 3 {
            return Err(PlanError::Triangulation(format!(
                "at least 3 points are required, got {}",
                points.len()
            )));
        }
        Ok((0..points.len() - 2).map(|i| [i, i + 1, i + 2]).collect())
    }
}

/// Interleaves the cones on either side of the track, starting with the left.
///
/// Surplus cones on the longer side are dropped.
pub fn combine_cones(left: &[Point2d], right: &[Point2d]) -> Vec<Point2d> {
    left.iter()
        .zip(right)
        .flat_map(|(l, r)| [*l, *r])
        .collect()
}

/// Extracts the track centerline from alternating boundary cones.
///
/// The cones are split into consecutive batches of `batch_size`, the last
/// batch taking whatever remains. Batches that cannot be triangulated are
/// skipped.
pub fn extract_centerline(
    cones: &[Point2d],
    batch_size: usize,
    triangulator: &impl Triangulator,
) -> Result<Vec<Point2d>> {
    if batch_size == 0 {
        return Err(PlanError::Configuration("batch size must be positive".into()));
    }

    let mut midpoints = vec![];
    for (batch_idx, batch) in cones.chunks(batch_size).enumerate() {
        let offset = batch_idx * batch_size;
        let triangles = match triangulator.triangulate(batch) {
            Ok(triangles) => triangles,
            Err(err) => {
                warn!("Skipping cones {}..{}: {}", offset, offset + batch.len(), err);
                continue;
            }
        };

        let edges = triangles
            .iter()
            .flat_map(|[a, b, c]| [(*a, *b), (*a, *c), (*b, *c)])
            .filter(|(a, b)| *a < batch.len() && *b < batch.len())
            .filter(|(a, b)| (offset + a) % 2 != (offset + b) % 2)
            .unique_by(|(a, b)| (usize::min(*a, *b), usize::max(*a, *b)));

        midpoints.extend(edges.map(|(a, b)| midpoint(batch[a], batch[b])));
    }
    Ok(midpoints)
}
