//! Error types for velocity planning.

use thiserror::Error;

/// The failures surfaced to callers of the planner.
///
/// Geometric degeneracies and numeric domain problems inside the pipeline
/// are recovered locally and never appear here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("insufficient input: at least {required} waypoints are required, got {actual}")]
    InsufficientInput { required: usize, actual: usize },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("waypoint {index} has a non-finite coordinate")]
    NonFiniteWaypoint { index: usize },

    #[error("triangulation failed: {0}")]
    Triangulation(String),
}

pub type Result<T> = std::result::Result<T, PlanError>;
