use super::{VehicleParameters, GRAVITY};
use crate::math::safe_sqrt;

/// The direction of travel and longitudinal intent for an acceleration query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccelMode {
    /// Accelerating while sweeping forward along the track.
    AccelForward,
    /// Braking, evaluated while sweeping backward from the braking point.
    DecelBackward,
    /// Braking, evaluated while sweeping forward.
    DecelForward,
}

/// The longitudinal dynamics of the vehicle.
///
/// Tyre grip is shared between cornering and longitudinal acceleration
/// through a friction circle whose radius grows with aerodynamic downforce.
#[derive(Clone, Copy, Debug)]
pub struct DynamicsModel {
    params: VehicleParameters,
    max_acc: f64,
}

impl DynamicsModel {
    /// Creates a new dynamics model.
    pub fn new(params: &VehicleParameters) -> Self {
        Self {
            params: *params,
            max_acc: params.max_drivetrain_accel(),
        }
    }

    /// The vehicle parameters behind this model.
    pub fn params(&self) -> &VehicleParameters {
        &self.params
    }

    /// The maximum lateral acceleration the tyres can provide in m/s<sup>2</sup>.
    fn max_lateral_accel(&self, vel: f64) -> f64 {
        let normal_force = self.params.mass * GRAVITY + self.params.downforce(vel);
        self.params.friction_coefficient * normal_force / self.params.mass
    }

    /// Calculates the maximum longitudinal acceleration in m/s<sup>2</sup>.
    ///
    /// Accelerating modes return the tyre-limited push minus drag, and braking
    /// modes return the (negative) tyre-limited braking plus drag.
    ///
    /// # Arguments
    /// * `vel` - The current speed (m/s).
    /// * `radius` - The radius of the corner (m), infinite on straights.
    /// * `mode` - The direction of the query.
    pub fn max_longitudinal_accel(&self, vel: f64, radius: f64, mode: AccelMode) -> f64 {
        let lat_used = if radius > 0.0 { vel * vel / radius } else { 0.0 };
        let lat_max = self.max_lateral_accel(vel);

        // Whatever grip cornering leaves behind
        let lon_avail = if lat_used < lat_max {
            safe_sqrt(lat_max.powi(2) - lat_used.powi(2))
        } else {
            0.0
        };
        let lon_avail = f64::min(self.max_acc, lon_avail);

        let drag_acc = -self.params.drag(vel) / self.params.mass;

        match mode {
            AccelMode::AccelForward | AccelMode::DecelBackward => lon_avail + drag_acc,
            AccelMode::DecelForward => -lon_avail + drag_acc,
        }
    }

    /// The highest speed at which the corner can be taken, given the
    /// downforce available at `vel`.
    pub fn cornering_speed(&self, vel: f64, radius: f64) -> f64 {
        if !(radius > 0.0) {
            return 0.0;
        }
        if radius.is_infinite() {
            return f64::INFINITY;
        }
        safe_sqrt(self.max_lateral_accel(vel) * radius)
    }
}

/// The speed reached from `vel` after applying `acc` over `dist`.
pub fn reachable_speed(vel: f64, acc: f64, dist: f64) -> f64 {
    safe_sqrt(vel * vel + 2.0 * acc * dist)
}
