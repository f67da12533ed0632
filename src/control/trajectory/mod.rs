//! Trajectory generation module
//!
//! A trajectory is a position curve plus an orientation interpolator,
//! sampled once per control tick by a [`SplineTrajectoryTask`].

use crate::gui::StateBuilder;
use nalgebra::Vector3;
use std::fmt::Debug;

pub mod bspline;
pub mod bspline_task;
pub mod interpolated_rotation;
pub mod spline_task;

pub use bspline::{BSpline, BoundaryConstraint, CurveConstraints};
pub use bspline_task::BSplineTrajectoryTask;
pub use interpolated_rotation::InterpolatedRotation;
pub use spline_task::{SplineTrajectoryTask, TrajectoryReference};

/// Trait for position curves a [`SplineTrajectoryTask`] can follow
pub trait SplineCurve: Debug + Send {
    /// Time span of the curve, starting at t = 0
    fn duration(&self) -> f64;

    /// Position at time `t`, clamped to the curve end points outside [0, duration]
    fn evaluate(&self, t: f64) -> Vector3<f64>;

    /// `order`-th time derivative at `t`. Zero outside [0, duration].
    fn derivative(&self, t: f64, order: usize) -> Vector3<f64>;

    /// Start point of the curve
    fn start(&self) -> &Vector3<f64>;

    /// Move the start point. Only used when the owning task is reset.
    fn set_start(&mut self, start: Vector3<f64>);

    /// End point of the curve
    fn target(&self) -> &Vector3<f64>;

    /// Move the end point, keeping the start and the waypoints
    fn set_target(&mut self, target: Vector3<f64>);

    /// Intermediate position waypoints, start and target excluded
    fn waypoints(&self) -> &[Vector3<f64>];

    /// Replace the intermediate waypoints
    fn set_waypoints(&mut self, waypoints: Vec<Vector3<f64>>);

    /// `samples + 1` evenly spaced positions over the whole curve
    fn sample(&self, samples: usize) -> Vec<Vector3<f64>>;

    /// Describe the curve's editable handles under `category`
    fn add_to_gui(&self, gui: &mut StateBuilder, category: &[String], samples: usize);
}
