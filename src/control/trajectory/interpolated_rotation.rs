//! Orientation interpolation between timestamped waypoints

use crate::common::types::{OriWaypoint, Rotation};
use log::warn;
use nalgebra::{UnitQuaternion, Vector3};

/// Piecewise shortest-arc rotation through `(time, rotation)` waypoints.
///
/// The initial rotation sits at t = 0 and the final rotation at t = duration;
/// interior waypoints are kept sorted by time in between.
#[derive(Debug, Clone)]
pub struct InterpolatedRotation {
    duration: f64,
    // Always starts with (0, initial) and ends with (duration, final)
    waypoints: Vec<OriWaypoint>,
}

impl InterpolatedRotation {
    /// Interpolator from `initial` to `target` through `waypoints`
    pub fn new(duration: f64, initial: Rotation, target: Rotation, waypoints: Vec<OriWaypoint>) -> Self {
        let mut interpolator = InterpolatedRotation {
            duration,
            waypoints: vec![(0.0, initial), (duration, target)],
        };
        interpolator.set_waypoints(waypoints);
        interpolator
    }

    /// Time span, starting at t = 0
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Rotation at t = 0
    pub fn initial(&self) -> &Rotation {
        &self.waypoints[0].1
    }

    /// Rotation at t = duration
    pub fn target(&self) -> &Rotation {
        &self.waypoints[self.waypoints.len() - 1].1
    }

    /// Replace the rotation at t = 0. Used when the owning task is reset.
    pub fn set_initial(&mut self, initial: Rotation) {
        self.waypoints[0].1 = initial;
    }

    /// Replace the rotation at t = duration
    pub fn set_target(&mut self, target: Rotation) {
        let last = self.waypoints.len() - 1;
        self.waypoints[last].1 = target;
    }

    /// Interior waypoints, sorted by time
    pub fn waypoints(&self) -> &[OriWaypoint] {
        &self.waypoints[1..self.waypoints.len() - 1]
    }

    /// Replace the interior waypoints.
    ///
    /// Times are clamped into [0, duration] and the sequence is stably sorted;
    /// both corrections are logged.
    pub fn set_waypoints(&mut self, mut waypoints: Vec<OriWaypoint>) {
        for wp in waypoints.iter_mut() {
            if !(0.0..=self.duration).contains(&wp.0) {
                warn!(
                    "Orientation waypoint at t={} outside [0, {}], clamping",
                    wp.0, self.duration
                );
                wp.0 = wp.0.clamp(0.0, self.duration);
            }
        }
        if waypoints.windows(2).any(|w| w[0].0 > w[1].0) {
            warn!("Orientation waypoints are not in ascending time order, sorting them");
            waypoints.sort_by(|a, b| a.0.total_cmp(&b.0));
        }

        let initial = *self.initial();
        let target = *self.target();
        self.waypoints.clear();
        self.waypoints.push((0.0, initial));
        self.waypoints.extend(waypoints);
        self.waypoints.push((self.duration, target));
    }

    /// Rotation and world-frame angular velocity at time `t`
    pub fn evaluate(&self, t: f64) -> (Rotation, Vector3<f64>) {
        if t < 0.0 || t.is_nan() {
            return (*self.initial(), Vector3::zeros());
        }
        // Waypoints stamped at t = 0 must not shadow the initial rotation
        if t == 0.0 {
            let (t1, r1) = self.waypoints[1];
            let omega = if t1 > 0.0 {
                self.initial().rotation_to(&r1).scaled_axis() / t1
            } else {
                Vector3::zeros()
            };
            return (*self.initial(), omega);
        }
        let next = self.waypoints.partition_point(|(time, _)| *time <= t);
        if next == self.waypoints.len() {
            return (*self.target(), Vector3::zeros());
        }

        let (t0, r0) = self.waypoints[next - 1];
        let (t1, r1) = self.waypoints[next];
        // t0 <= t < t1 here, so the bracket has a positive width
        let span = t1 - t0;
        let s = (t - t0) / span;

        // World-frame rotation taking r0 onto r1, along the shortest arc
        let delta = r0.rotation_to(&r1).scaled_axis();
        let rotation = UnitQuaternion::from_scaled_axis(delta * s) * r0;
        (rotation, delta / span)
    }
}
