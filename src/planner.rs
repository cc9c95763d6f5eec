use crate::debug::debug_profile;
use crate::error::{PlanError, Result};
use crate::math::{Point2d, SmoothingSpline};
use crate::track::{Track, TrackLayout};
use crate::util::Interval;
use crate::vehicle::{reachable_speed, AccelMode, DynamicsModel, VehicleParameters};
use itertools::Itertools;
use log::{debug, trace};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::iter::once;

/// The default smoothing factor of the velocity profile spline.
pub const DEFAULT_SMOOTHING: f64 = 50.0;

/// The settings of a [VelocityPlanner].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlannerConfig {
    /// The absolute speed limit in m/s.
    pub max_speed: f64,
    /// The smoothing factor of the final spline fit, or `None` to skip smoothing.
    pub smoothing: Option<f64>,
    /// Whether the waypoints describe a closed lap.
    pub layout: TrackLayout,
}

impl PlannerConfig {
    /// Creates a configuration with the given speed limit and default smoothing.
    pub fn new(max_speed: f64) -> Self {
        Self {
            max_speed,
            smoothing: Some(DEFAULT_SMOOTHING),
            layout: TrackLayout::Open,
        }
    }

    pub fn with_smoothing(self, smoothing: f64) -> Self {
        Self {
            smoothing: Some(smoothing),
            ..self
        }
    }

    pub fn without_smoothing(self) -> Self {
        Self {
            smoothing: None,
            ..self
        }
    }

    pub fn with_layout(self, layout: TrackLayout) -> Self {
        Self { layout, ..self }
    }

    /// Checks the configuration before any planning takes place.
    pub fn validate(&self) -> Result<()> {
        if !(self.max_speed.is_finite() && self.max_speed > 0.0) {
            return Err(PlanError::Configuration(format!(
                "max speed must be positive, got {}",
                self.max_speed
            )));
        }
        if let Some(smoothing) = self.smoothing {
            if !(smoothing.is_finite() && smoothing > 0.0) {
                return Err(PlanError::Configuration(format!(
                    "smoothing factor must be positive, got {}",
                    smoothing
                )));
            }
        }
        Ok(())
    }
}

/// A speed target for every waypoint of a track.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VelocityProfile {
    /// The distance along the track to each waypoint in m.
    arc_length: Vec<f64>,
    /// The target speed at each waypoint in m/s.
    speeds: Vec<f64>,
    /// The speed limit the profile was planned with in m/s.
    max_speed: f64,
}

impl VelocityProfile {
    /// The target speed at each waypoint in m/s.
    pub fn speeds(&self) -> &[f64] {
        &self.speeds
    }

    /// The distance along the track to each waypoint in m, starting at zero.
    pub fn arc_length(&self) -> &[f64] {
        &self.arc_length
    }

    pub fn len(&self) -> usize {
        self.speeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speeds.is_empty()
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    /// Iterates over `(distance, speed)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.arc_length.iter().copied().zip(self.speeds.iter().copied())
    }

    pub fn into_speeds(self) -> Vec<f64> {
        self.speeds
    }
}

/// Plans speed targets along a track centerline.
///
/// Planning runs in three stages. A forward pass accelerates as hard as the
/// tyres and drivetrain allow, capped by the speed limit and the cornering
/// speed of each turn. A backward pass then lowers speeds ahead of slow
/// sections so they can be reached under maximum braking. Finally a
/// smoothing spline is fitted to the result.
#[derive(Clone, Debug)]
pub struct VelocityPlanner {
    config: PlannerConfig,
    model: DynamicsModel,
}

impl VelocityPlanner {
    /// Creates a new velocity planner.
    pub fn new(config: PlannerConfig, vehicle: &VehicleParameters) -> Result<Self> {
        config.validate()?;
        vehicle.validate()?;
        Ok(Self {
            config,
            model: DynamicsModel::new(vehicle),
        })
    }

    /// The absolute speed limit in m/s.
    pub fn max_speed(&self) -> f64 {
        self.config.max_speed
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn vehicle(&self) -> &VehicleParameters {
        self.model.params()
    }

    /// Plans a velocity profile along the given centerline.
    ///
    /// # Parameters
    /// * `waypoints` - The centerline in the direction of travel
    /// * `initial_speed` - The speed at the first waypoint in m/s
    pub fn plan(&self, waypoints: &[Point2d], initial_speed: f64) -> Result<VelocityProfile> {
        let track = Track::new(waypoints.to_vec(), self.config.layout)?;
        self.plan_track(&track, initial_speed)
    }

    /// Plans a velocity profile along a prepared track.
    ///
    /// The track keeps the layout it was built with, which takes precedence
    /// over the layout in the planner's configuration.
    pub fn plan_track(&self, track: &Track, initial_speed: f64) -> Result<VelocityProfile> {
        if !(initial_speed.is_finite() && initial_speed >= 0.0) {
            return Err(PlanError::Configuration(format!(
                "initial speed must be non-negative, got {}",
                initial_speed
            )));
        }
        if track.layout() != self.config.layout {
            debug!(
                "Planning a {:?} track with a planner configured for {:?} tracks",
                track.layout(),
                self.config.layout
            );
        }

        debug!(
            "Planning velocity over {} waypoints ({} straight, {:.1} m)",
            track.len(),
            track.circles().iter().filter(|c| c.is_straight()).count(),
            track.length()
        );

        let mut profile = self.forward_pass(track, initial_speed);
        self.backward_pass(track, &mut profile);
        let speeds = self.smooth(track, &profile, initial_speed);

        let arc_length: Vec<f64> = once(0.0)
            .chain(track.cumulative_arc_length().iter().copied())
            .collect();
        debug_profile("velocity", &arc_length, &speeds);

        Ok(VelocityProfile {
            arc_length,
            speeds,
            max_speed: self.config.max_speed,
        })
    }

    /// Computes the fastest speeds reachable by accelerating from
    /// `initial_speed`, limited by the speed limit and the cornering speed
    /// of each turn.
    pub fn forward_pass(&self, track: &Track, initial_speed: f64) -> Vec<f64> {
        let radii = track.radii();
        let lengths = track.segment_lengths();

        let mut profile = Vec::with_capacity(track.len());
        profile.push(initial_speed);

        let mut vel = initial_speed;
        for (radius, length) in radii.iter().zip(lengths) {
            let acc = self.model.max_longitudinal_accel(vel, *radius, AccelMode::AccelForward);
            let accel_limit = reachable_speed(vel, acc, *length);
            let corner_limit = self.model.cornering_speed(vel, *radius);
            vel = accel_limit.min(self.config.max_speed).min(corner_limit);
            profile.push(vel);
        }
        profile
    }

    /// Lowers speeds so every slow section can be reached by braking.
    ///
    /// The profile is walked from the finish back to the start, where each
    /// braking zone appears as a run of increasing speeds. Runs are queued
    /// and relaxed one at a time: speeds are capped by what braking allows
    /// until the limit exceeds the speed limit or the next run begins.
    /// Speeds are never raised.
    pub fn backward_pass(&self, track: &Track, profile: &mut [f64]) {
        let n = profile.len();
        if n < 2 {
            return;
        }
        let radii: Vec<f64> = track.radii().into_iter().rev().collect();
        let lengths: Vec<f64> = track.segment_lengths().iter().rev().copied().collect();

        profile.reverse();
        let mut runs = run_starts(profile);
        debug!("Relaxing {} braking zones", runs.len());

        while let Some(start) = runs.pop_front() {
            let mut i = start;
            while i < n - 1 {
                let limit = self.braking_limit(profile[i], radii[i], radii[i + 1], lengths[i]);
                if limit < profile[i + 1] {
                    profile[i + 1] = limit;
                }
                i += 1;
                if limit > self.config.max_speed || runs.front().map_or(false, |next| i >= *next) {
                    break;
                }
            }
            trace!("Relaxed braking zone from {} to {}", n - 1 - start, n - 1 - i);
        }
        profile.reverse();
    }

    /// The highest speed from which the vehicle can brake to `vel` over
    /// `length`, taking the lower of the braking capability at either end.
    ///
    /// # Parameters
    /// * `vel` - The speed at the end of the braking segment (m/s)
    /// * `radius` - The turn radius at the end of the segment (m)
    /// * `prev_radius` - The turn radius at the start of the segment (m)
    /// * `length` - The length of the segment (m)
    pub fn braking_limit(&self, vel: f64, radius: f64, prev_radius: f64, length: f64) -> f64 {
        let dec = self.model.max_longitudinal_accel(vel, radius, AccelMode::DecelBackward);
        let limit = reachable_speed(vel, dec, length);

        let dec = self.model.max_longitudinal_accel(limit, prev_radius, AccelMode::DecelBackward);
        f64::min(limit, reachable_speed(vel, dec, length))
    }

    /// Fits the smoothing spline over arc length and clamps the result to
    /// the speed limit. The first waypoint keeps the initial speed.
    fn smooth(&self, track: &Track, profile: &[f64], initial_speed: f64) -> Vec<f64> {
        let bounds = Interval::new(0.0, self.config.max_speed);
        let xs = track.cumulative_arc_length();
        let ys = &profile[1..];

        let spline = self
            .config
            .smoothing
            .and_then(|smoothing| SmoothingSpline::fit(xs, ys, smoothing));
        let smoothed: Vec<f64> = match spline {
            Some(spline) => xs.iter().map(|x| spline.sample(*x)).collect(),
            None => ys.to_vec(),
        };

        once(initial_speed)
            .chain(smoothed)
            .map(|vel| bounds.clamp(vel))
            .collect()
    }
}

/// Finds the first index of every run of increasing values.
fn run_starts(profile: &[f64]) -> VecDeque<usize> {
    let mut prev: Option<usize> = None;
    profile
        .iter()
        .tuple_windows()
        .positions(|(a, b)| b > a)
        .filter(|i| {
            let is_start = prev.map_or(true, |p| *i > p + 1);
            prev = Some(*i);
            is_start
        })
        .collect()
}

/// Plans a velocity profile along `waypoints` and returns the speed at each.
pub fn plan_velocity(
    waypoints: &[Point2d],
    initial_speed: f64,
    config: PlannerConfig,
    vehicle: &VehicleParameters,
) -> Result<Vec<f64>> {
    let planner = VelocityPlanner::new(config, vehicle)?;
    Ok(planner.plan(waypoints, initial_speed)?.into_speeds())
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use crate::math::Vector2d;
    use rand::{Rng, SeedableRng};

    fn planner(config: PlannerConfig) -> VelocityPlanner {
        VelocityPlanner::new(config, &VehicleParameters::default()).unwrap()
    }

    fn line(n: usize, spacing: f64) -> Vec<Point2d> {
        (0..n).map(|i| Point2d::new(spacing * i as f64, 0.0)).collect()
    }

    /// A winding track of `n` waypoints with random turns and spacing.
    fn random_track(rng: &mut impl Rng, n: usize) -> Vec<Point2d> {
        let mut heading = 0.0f64;
        let mut pos = Point2d::new(0.0, 0.0);
        (0..n)
            .map(|_| {
                let turn: f64 = rng.gen_range(-0.6..0.6);
                let step: f64 = rng.gen_range(0.5..3.0);
                heading += turn;
                pos += step * Vector2d::new(heading.cos(), heading.sin());
                pos
            })
            .collect()
    }

    #[test]
    fn run_starts_skip_continuations() {
        let runs = run_starts(&[5.0, 4.0, 6.0, 7.0, 8.0, 3.0, 3.0, 4.0, 2.0, 9.0]);
        assert_eq!(runs, VecDeque::from(vec![1, 6, 8]));
        assert!(run_starts(&[3.0, 2.0, 2.0, 1.0]).is_empty());
        assert!(run_starts(&[]).is_empty());
    }

    #[test]
    fn forward_pass_respects_acceleration() {
        let planner = planner(PlannerConfig::new(18.0));
        let track = Track::new(line(10, 2.0), TrackLayout::Open).unwrap();
        let profile = planner.forward_pass(&track, 0.0);
        assert_eq!(profile.len(), 10);
        assert_eq!(profile[0], 0.0);

        let model = DynamicsModel::new(&VehicleParameters::default());
        for i in 0..profile.len() - 1 {
            let acc =
                model.max_longitudinal_accel(profile[i], f64::INFINITY, AccelMode::AccelForward);
            let bound = (profile[i].powi(2) + 2.0 * acc * 2.0).sqrt();
            assert!(profile[i + 1] <= bound + 1e-9);
            assert!(profile[i + 1] >= profile[i]);
            assert!(profile[i + 1] <= 18.0);
        }
        assert_eq!(profile[9], 18.0);
    }

    #[test]
    fn forward_pass_respects_grip_in_corners() {
        let mut rng = rand::rngs::StdRng::from_seed(*b"Apex early, exit slow, lose time");
        let planner = planner(PlannerConfig::new(25.0));
        let model = DynamicsModel::new(&VehicleParameters::default());
        let mut cornering_limited = 0;
        for _ in 0..20 {
            let track = Track::new(random_track(&mut rng, 60), TrackLayout::Open).unwrap();
            let initial: f64 = rng.gen_range(0.0..15.0);
            let profile = planner.forward_pass(&track, initial);
            let radii = track.radii();
            let lengths = track.segment_lengths();
            assert_eq!(profile.len(), track.len());
            assert_eq!(profile[0], initial);

            for i in 0..lengths.len() {
                let (vel, next) = (profile[i], profile[i + 1]);
                let acc = model.max_longitudinal_accel(vel, radii[i], AccelMode::AccelForward);
                let reachable = (vel * vel + 2.0 * acc * lengths[i]).max(0.0).sqrt();
                let corner = model.cornering_speed(vel, radii[i]);
                assert!(next <= reachable + 1e-9, "segment {} accelerates too hard", i);
                assert!(next <= corner + 1e-9, "segment {} corners too fast", i);
                assert!(next <= 25.0);
                if radii[i].is_finite() && (next - corner).abs() < 1e-9 {
                    cornering_limited += 1;
                }
            }
        }
        assert!(cornering_limited > 0);
    }

    #[test]
    fn braking_limit_grows_with_distance() {
        let planner = planner(PlannerConfig::new(30.0));
        let short = planner.braking_limit(5.0, f64::INFINITY, f64::INFINITY, 1.0);
        let long = planner.braking_limit(5.0, f64::INFINITY, f64::INFINITY, 10.0);
        assert!(short > 5.0);
        assert!(long > short);
        assert_eq!(planner.braking_limit(5.0, 2.0, 2.0, 0.0), 5.0);
    }

    #[test]
    fn backward_pass_never_raises() {
        let planner = planner(PlannerConfig::new(18.0));
        let track = Track::new(line(6, 1.0), TrackLayout::Open).unwrap();
        let original = vec![0.0, 18.0, 18.0, 18.0, 2.0, 18.0];
        let mut profile = original.clone();
        planner.backward_pass(&track, &mut profile);

        for (after, before) in profile.iter().zip(original.iter()) {
            assert!(after <= before);
        }
        assert_eq!(profile[4], 2.0);
        assert_eq!(profile[5], 18.0);
        assert!(profile[3] < 18.0);
        assert!(profile[2] < 18.0);
        assert!(profile[3] < profile[2]);
    }

    #[test]
    fn unsmoothed_straight_profile() {
        let planner = planner(PlannerConfig::new(18.0).without_smoothing());
        let profile = planner.plan(&line(10, 2.0), 0.0).unwrap();
        let track = Track::new(line(10, 2.0), TrackLayout::Open).unwrap();
        let forward = planner.forward_pass(&track, 0.0);
        assert_eq!(profile.speeds(), forward.as_slice());
        assert_eq!(profile.arc_length().len(), 10);
        assert_eq!(profile.arc_length()[0], 0.0);
        assert_approx_eq!(profile.arc_length()[9], 18.0);
    }

    #[test]
    fn prepared_track_keeps_its_layout() {
        let n = 12;
        let lap: Vec<_> = (0..n)
            .map(|i| {
                let a = std::f64::consts::TAU * i as f64 / n as f64;
                Point2d::new(8.0 * a.cos(), 8.0 * a.sin() + 0.5 * (2.0 * a).sin())
            })
            .collect();
        let closed = Track::new(lap.clone(), TrackLayout::Closed).unwrap();
        let open = Track::new(lap.clone(), TrackLayout::Open).unwrap();
        assert_ne!(closed.segment_lengths(), open.segment_lengths());

        let open_planner = planner(PlannerConfig::new(18.0));
        let closed_planner = planner(PlannerConfig::new(18.0).with_layout(TrackLayout::Closed));
        assert_eq!(
            open_planner.plan_track(&closed, 0.0).unwrap(),
            closed_planner.plan(&lap, 0.0).unwrap()
        );
        assert_eq!(
            closed_planner.plan_track(&open, 0.0).unwrap(),
            open_planner.plan(&lap, 0.0).unwrap()
        );
    }

    #[test]
    fn smoothed_profile_is_clamped() {
        let planner = planner(PlannerConfig::new(18.0).with_smoothing(5.0));
        let profile = planner.plan(&line(25, 2.0), 3.0).unwrap();
        assert_eq!(profile.len(), 25);
        assert_eq!(profile.speeds()[0], 3.0);
        assert!(profile.speeds().iter().all(|v| (0.0..=18.0).contains(v)));
        assert_eq!(profile.max_speed(), 18.0);
    }

    #[test]
    fn random_tracks_stay_in_bounds() {
        let mut rng = rand::rngs::StdRng::from_seed(*b"Braking late is rarely faster...");
        let planner = planner(PlannerConfig::new(18.0));
        for _ in 0..20 {
            let waypoints = random_track(&mut rng, 40);
            let initial: f64 = rng.gen_range(0.0..10.0);
            let profile = planner.plan(&waypoints, initial).unwrap();
            assert_eq!(profile.len(), waypoints.len());
            assert_eq!(profile.speeds()[0], initial);
            assert!(profile.speeds().iter().all(|v| (0.0..=18.0).contains(v)));
            assert!(profile.arc_length().windows(2).all(|w| w[1] >= w[0]));
        }
    }

    #[test]
    fn configuration_errors() {
        let vehicle = VehicleParameters::default();
        for config in [
            PlannerConfig::new(0.0),
            PlannerConfig::new(-4.0),
            PlannerConfig::new(f64::NAN),
            PlannerConfig::new(18.0).with_smoothing(0.0),
            PlannerConfig::new(18.0).with_smoothing(-1.0),
        ] {
            assert!(matches!(
                VelocityPlanner::new(config, &vehicle),
                Err(PlanError::Configuration(_))
            ));
        }
        let planner = planner(PlannerConfig::new(18.0));
        assert!(matches!(
            planner.plan(&line(5, 1.0), -1.0),
            Err(PlanError::Configuration(_))
        ));
    }

    #[test]
    fn too_few_waypoints() {
        let config = PlannerConfig::new(18.0);
        let vehicle = VehicleParameters::default();
        assert_eq!(
            plan_velocity(&line(2, 1.0), 0.0, config, &vehicle),
            Err(PlanError::InsufficientInput {
                required: 3,
                actual: 2
            })
        );
        assert!(plan_velocity(&[], 0.0, config, &vehicle).is_err());
    }
}
