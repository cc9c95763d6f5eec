//! Speed profile planning along a racetrack centerline.
//!
//! The centerline is taken from the midpoints of the edges spanning a
//! cone-marked track. Local curvature is estimated by fitting circles through
//! consecutive waypoints, and a [VelocityPlanner] produces a speed target for
//! every waypoint that respects tyre grip, aerodynamics and the drivetrain.

pub use cgmath;
pub use centerline::{combine_cones, extract_centerline, StripTriangulator, Triangulator};
#[cfg(feature = "debug")]
pub use debug::take_debug_frame;
pub use error::{PlanError, Result};
pub use planner::{
    plan_velocity, PlannerConfig, VelocityPlanner, VelocityProfile, DEFAULT_SMOOTHING,
};
pub use track::{Track, TrackLayout};
pub use util::Interval;
pub use vehicle::{AccelMode, DynamicsModel, VehicleParameters};

mod centerline;
mod debug;
mod error;
pub mod math;
mod planner;
pub mod track;
mod util;
mod vehicle;
