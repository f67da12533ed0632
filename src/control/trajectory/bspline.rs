//! Position curve shaped by a control polygon
//!
//! The curve is a single Bézier segment of degree `n` spanning `[0, duration]`.
//! Its control polygon is the start point, the user waypoints and the target.
//! Boundary constraints insert one extra control point per constrained
//! derivative so that the curve's end derivatives match them exactly.
//! Waypoints shape the curve but are not interpolated.

use super::SplineCurve;
use crate::error::{Result, TrajectoryError};
use crate::gui::{GuiElement, StateBuilder};
use log::debug;
use nalgebra::Vector3;
use std::borrow::Cow;

/// Derivative values imposed at one end of the curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryConstraint {
    pub velocity: Vector3<f64>,
    pub acceleration: Option<Vector3<f64>>,
}

impl BoundaryConstraint {
    /// Velocity constraint alone
    pub fn velocity(velocity: Vector3<f64>) -> Self {
        BoundaryConstraint {
            velocity,
            acceleration: None,
        }
    }

    /// Add an acceleration constraint at the same end
    pub fn with_acceleration(mut self, acceleration: Vector3<f64>) -> Self {
        self.acceleration = Some(acceleration);
        self
    }

    fn extra_points(&self) -> usize {
        1 + self.acceleration.is_some() as usize
    }
}

/// Optional constraints at t = 0 and t = duration
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CurveConstraints {
    pub start: Option<BoundaryConstraint>,
    pub end: Option<BoundaryConstraint>,
}

impl CurveConstraints {
    /// True when neither end is constrained
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    fn extra_points(&self) -> usize {
        self.start.map_or(0, |c| c.extra_points()) + self.end.map_or(0, |c| c.extra_points())
    }
}

/// Position trajectory from a start point to a target through shaping waypoints
#[derive(Debug, Clone)]
pub struct BSpline {
    duration: f64,
    start: Vector3<f64>,
    target: Vector3<f64>,
    waypoints: Vec<Vector3<f64>>,
    constraints: CurveConstraints,
    // Control points of the curve (index 0) and of its first two time derivatives
    hodographs: Vec<Vec<Vector3<f64>>>,
}

impl BSpline {
    /// Create an unconstrained curve
    pub fn new(
        duration: f64,
        start: Vector3<f64>,
        target: Vector3<f64>,
        waypoints: Vec<Vector3<f64>>,
    ) -> Result<Self> {
        Self::with_constraints(duration, start, target, CurveConstraints::default(), waypoints)
    }

    /// Create a curve whose end derivatives match `constraints`
    pub fn with_constraints(
        duration: f64,
        start: Vector3<f64>,
        target: Vector3<f64>,
        constraints: CurveConstraints,
        waypoints: Vec<Vector3<f64>>,
    ) -> Result<Self> {
        if !(duration > 0.0 && duration.is_finite()) {
            return Err(TrajectoryError::InvalidDuration(duration));
        }
        let mut spline = BSpline {
            duration,
            start,
            target,
            waypoints,
            constraints,
            hodographs: Vec::new(),
        };
        spline.update();
        Ok(spline)
    }

    /// Boundary derivatives the curve is built to match
    pub fn constraints(&self) -> &CurveConstraints {
        &self.constraints
    }

    /// Fitted control polygon, constraint points included
    pub fn control_points(&self) -> &[Vector3<f64>] {
        &self.hodographs[0]
    }

    /// Degree of the Bézier segment, one less than the number of control points
    pub fn degree(&self) -> usize {
        self.hodographs[0].len() - 1
    }

    fn update(&mut self) {
        let polygon = self.control_polygon();
        debug!(
            "Rebuilding curve: degree {}, {} waypoints, constrained: {}",
            polygon.len() - 1,
            self.waypoints.len(),
            !self.constraints.is_empty()
        );
        let velocity = differentiate(&polygon, self.duration);
        let acceleration = differentiate(&velocity, self.duration);
        self.hodographs = vec![polygon, velocity, acceleration];
    }

    fn control_polygon(&self) -> Vec<Vector3<f64>> {
        let n = (self.waypoints.len() + 1 + self.constraints.extra_points()) as f64;
        let d = self.duration;

        let mut points = Vec::with_capacity(n as usize + 1);
        points.push(self.start);
        if let Some(c) = self.constraints.start {
            let q1 = self.start + c.velocity * d / n;
            points.push(q1);
            if let Some(a) = c.acceleration {
                points.push(a * d * d / (n * (n - 1.0)) + 2.0 * q1 - self.start);
            }
        }
        points.extend(self.waypoints.iter().copied());

        let mut tail = Vec::with_capacity(3);
        tail.push(self.target);
        if let Some(c) = self.constraints.end {
            let q = self.target - c.velocity * d / n;
            tail.push(q);
            if let Some(a) = c.acceleration {
                tail.push(a * d * d / (n * (n - 1.0)) + 2.0 * q - self.target);
            }
        }
        points.extend(tail.into_iter().rev());
        points
    }

    fn hodograph(&self, order: usize) -> Cow<'_, [Vector3<f64>]> {
        if let Some(points) = self.hodographs.get(order) {
            return Cow::Borrowed(points);
        }
        let mut points = self.hodographs[self.hodographs.len() - 1].clone();
        for _ in self.hodographs.len() - 1..order {
            points = differentiate(&points, self.duration);
        }
        Cow::Owned(points)
    }
}

/// Control points of the time derivative of a Bézier curve spanning `duration`
fn differentiate(points: &[Vector3<f64>], duration: f64) -> Vec<Vector3<f64>> {
    let n = points.len().saturating_sub(1);
    if n == 0 {
        return vec![Vector3::zeros()];
    }
    let scale = n as f64 / duration;
    points.windows(2).map(|w| (w[1] - w[0]) * scale).collect()
}

/// de Casteljau evaluation at `u` in [0, 1]. Exact at both ends.
fn de_casteljau(points: &[Vector3<f64>], u: f64) -> Vector3<f64> {
    let mut buffer = points.to_vec();
    for k in (1..buffer.len()).rev() {
        for i in 0..k {
            buffer[i] = buffer[i] * (1.0 - u) + buffer[i + 1] * u;
        }
    }
    buffer[0]
}

impl SplineCurve for BSpline {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn evaluate(&self, t: f64) -> Vector3<f64> {
        if t <= 0.0 {
            self.start
        } else if t >= self.duration {
            self.target
        } else {
            de_casteljau(&self.hodographs[0], t / self.duration)
        }
    }

    fn derivative(&self, t: f64, order: usize) -> Vector3<f64> {
        if order == 0 {
            return self.evaluate(t);
        }
        if !(0.0..=self.duration).contains(&t) {
            return Vector3::zeros();
        }
        de_casteljau(&self.hodograph(order), t / self.duration)
    }

    fn start(&self) -> &Vector3<f64> {
        &self.start
    }

    fn set_start(&mut self, start: Vector3<f64>) {
        self.start = start;
        self.update();
    }

    fn target(&self) -> &Vector3<f64> {
        &self.target
    }

    fn set_target(&mut self, target: Vector3<f64>) {
        self.target = target;
        self.update();
    }

    fn waypoints(&self) -> &[Vector3<f64>] {
        &self.waypoints
    }

    fn set_waypoints(&mut self, waypoints: Vec<Vector3<f64>>) {
        self.waypoints = waypoints;
        self.update();
    }

    fn sample(&self, samples: usize) -> Vec<Vector3<f64>> {
        let samples = samples.max(1);
        (0..=samples)
            .map(|i| self.evaluate(self.duration * i as f64 / samples as f64))
            .collect()
    }

    fn add_to_gui(&self, gui: &mut StateBuilder, category: &[String], samples: usize) {
        let mut points_category = category.to_vec();
        points_category.push("Control points".to_string());

        gui.add_element(
            &points_category,
            GuiElement::ArrayInput {
                name: "control_points".to_string(),
                len: self.waypoints.len(),
            },
        );
        for (index, position) in self.waypoints.iter().enumerate() {
            gui.add_element(
                &points_category,
                GuiElement::Point3 {
                    name: format!("control_point_{}", index),
                    index,
                    position: *position,
                },
            );
        }
        gui.add_element(
            category,
            GuiElement::Polyline {
                name: "trajectory".to_string(),
                points: self.sample(samples),
            },
        );
    }
}
