use crate::error::{PlanError, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use self::dynamics::{reachable_speed, AccelMode, DynamicsModel};

mod dynamics;

/// Gravitational acceleration in m/s<sup>2</sup>.
pub const GRAVITY: f64 = 9.81;

/// The physical parameters of the race vehicle.
///
/// The default values describe the reference car.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleParameters {
    /// The vehicle mass in kg.
    pub mass: f64,
    /// The frontal area in m<sup>2</sup>.
    pub frontal_area: f64,
    /// The aerodynamic lift coefficient, positive for downforce.
    pub lift_coefficient: f64,
    /// The aerodynamic drag coefficient.
    pub drag_coefficient: f64,
    /// The air density in kg/m<sup>3</sup>.
    pub air_density: f64,
    /// The tyre friction coefficient.
    pub friction_coefficient: f64,
    /// The maximum motor torque in N m.
    pub max_torque: f64,
    /// The drivetrain gear ratio.
    pub gear_ratio: f64,
    /// The wheel diameter in m.
    pub wheel_diameter: f64,
}

impl Default for VehicleParameters {
    fn default() -> Self {
        Self {
            mass: 195.0,
            frontal_area: 1.36,
            lift_coefficient: 2.69,
            drag_coefficient: 2.69,
            air_density: 1.225,
            friction_coefficient: 1.6,
            max_torque: 21.0,
            gear_ratio: 13.25,
            wheel_diameter: 0.202,
        }
    }
}

impl VehicleParameters {
    /// Checks that the parameters describe a physically meaningful vehicle.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("mass", self.mass),
            ("friction coefficient", self.friction_coefficient),
            ("max torque", self.max_torque),
            ("gear ratio", self.gear_ratio),
            ("wheel diameter", self.wheel_diameter),
        ];
        let non_negative = [
            ("frontal area", self.frontal_area),
            ("lift coefficient", self.lift_coefficient),
            ("drag coefficient", self.drag_coefficient),
            ("air density", self.air_density),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(PlanError::Configuration(format!(
                    "vehicle {} must be positive, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(PlanError::Configuration(format!(
                    "vehicle {} must not be negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// The acceleration ceiling imposed by the drivetrain in m/s<sup>2</sup>,
    /// from `T = F r` at the driven wheels.
    pub fn max_drivetrain_accel(&self) -> f64 {
        self.max_torque * self.gear_ratio / (self.mass * 0.5 * self.wheel_diameter)
    }

    /// The aerodynamic downforce at the given speed in N.
    pub fn downforce(&self, vel: f64) -> f64 {
        0.5 * self.air_density * self.lift_coefficient * self.frontal_area * vel * vel
    }

    /// The aerodynamic drag at the given speed in N.
    pub fn drag(&self, vel: f64) -> f64 {
        0.5 * self.air_density * self.drag_coefficient * self.frontal_area * vel * vel
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn reference_drivetrain_ceiling() {
        let params = VehicleParameters::default();
        assert_approx_eq!(params.max_drivetrain_accel(), 21.0 * 13.25 / (195.0 * 0.5 * 0.202));
        assert!(params.validate().is_ok());
    }

    #[test]
    fn rejects_massless_vehicle() {
        let params = VehicleParameters {
            mass: 0.0,
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(PlanError::Configuration(_))));
    }

    #[test]
    fn rejects_negative_drag() {
        let params = VehicleParameters {
            drag_coefficient: -0.1,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
