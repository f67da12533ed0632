//! Per-tick sampling of a position curve and an orientation interpolator
//!
//! [`SplineTrajectoryTask`] owns both models and an elapsed-time clock.
//! Each call to [`SplineTrajectoryTask::advance`] moves the clock forward
//! (unless paused), samples the models and hands the resulting reference to
//! the feedback task.

use super::{InterpolatedRotation, SplineCurve};
use crate::common::types::{OriWaypoint, Pose};
use crate::common::Robots;
use crate::control::feedback::FeedbackTask;
use crate::error::{Result, TrajectoryError};
use crate::gui::{GuiElement, Mutation, StateBuilder};
use crate::task::{MetaTask, TaskState};
use log::{debug, info};
use nalgebra::{Isometry3, Translation3, Vector3, Vector6};
use std::any::Any;

/// Display density used when none is configured
pub const DEFAULT_DISPLAY_SAMPLES: usize = 20;

/// Upper bound on the display density
pub const MAX_DISPLAY_SAMPLES: usize = 1000;

/// Reference handed to the feedback task every tick
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryReference {
    pub pose: Isometry3<f64>,
    pub linear_velocity: Vector3<f64>,
    pub linear_acceleration: Vector3<f64>,
    pub angular_velocity: Vector3<f64>,
}

impl TrajectoryReference {
    /// Motionless reference at `pose`
    pub fn hold(pose: Isometry3<f64>) -> Self {
        TrajectoryReference {
            pose,
            linear_velocity: Vector3::zeros(),
            linear_acceleration: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
        }
    }

    /// Reference position
    pub fn position(&self) -> &Vector3<f64> {
        &self.pose.translation.vector
    }
}

/// Trajectory task following a curve `C` with interpolated orientation
#[derive(Debug)]
pub struct SplineTrajectoryTask<C: SplineCurve> {
    name: String,
    type_name: String,
    robot: String,
    frame: String,
    curve: C,
    orientation: InterpolatedRotation,
    elapsed: f64,
    paused: bool,
    display_samples: usize,
    feedback: Box<dyn FeedbackTask>,
}

impl<C: SplineCurve> SplineTrajectoryTask<C> {
    /// Assemble a task for `frame` of `robot`.
    ///
    /// `curve` and `orientation` must already start at the frame's current pose.
    /// The feedback task immediately receives the reference at t = 0.
    pub fn new(
        type_name: &str,
        robot: &str,
        frame: &str,
        curve: C,
        orientation: InterpolatedRotation,
        feedback: Box<dyn FeedbackTask>,
    ) -> Self {
        let mut task = SplineTrajectoryTask {
            name: format!("{}_{}_{}", type_name, robot, frame),
            type_name: type_name.to_string(),
            robot: robot.to_string(),
            frame: frame.to_string(),
            curve,
            orientation,
            elapsed: 0.0,
            paused: false,
            display_samples: DEFAULT_DISPLAY_SAMPLES,
            feedback,
        };
        task.refresh_reference();
        task
    }

    /// Rename the task. Queued mutations address tasks by this name.
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Name of the controlled robot
    pub fn robot(&self) -> &str {
        &self.robot
    }

    /// Name of the controlled frame
    pub fn frame(&self) -> &str {
        &self.frame
    }

    /// Position curve
    pub fn curve(&self) -> &C {
        &self.curve
    }

    /// Orientation interpolator
    pub fn orientation(&self) -> &InterpolatedRotation {
        &self.orientation
    }

    /// Feedback task receiving the references
    pub fn feedback(&self) -> &dyn FeedbackTask {
        self.feedback.as_ref()
    }

    /// Mutable feedback task, to retune its gains
    pub fn feedback_mut(&mut self) -> &mut dyn FeedbackTask {
        self.feedback.as_mut()
    }

    /// Duration of the trajectory in seconds
    pub fn duration(&self) -> f64 {
        self.curve.duration()
    }

    /// Elapsed time in [0, duration]
    pub fn current_time(&self) -> f64 {
        self.elapsed
    }

    /// True once the whole trajectory has been played
    pub fn time_elapsed(&self) -> bool {
        self.elapsed >= self.duration()
    }

    /// True while time is frozen
    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Completed takes precedence over Paused
    pub fn state(&self) -> TaskState {
        if self.time_elapsed() {
            TaskState::Completed
        } else if self.paused {
            TaskState::Paused
        } else {
            TaskState::Active
        }
    }

    /// Number of segments in the displayed trajectory
    pub fn display_samples(&self) -> usize {
        self.display_samples
    }

    /// Final pose of the trajectory
    pub fn target(&self) -> Pose {
        Isometry3::from_parts(Translation3::from(*self.curve.target()), *self.orientation.target())
    }

    /// Last reference sent to the feedback task
    pub fn reference(&self) -> &TrajectoryReference {
        self.feedback.reference()
    }

    /// Tracking error of `current` against the last reference
    pub fn eval(&self, current: &Isometry3<f64>) -> Vector6<f64> {
        self.feedback.eval(current)
    }

    /// Run one control tick
    pub fn advance(&mut self, dt: f64) {
        if !self.paused {
            let was_elapsed = self.time_elapsed();
            self.elapsed = (self.elapsed + dt.max(0.0)).min(self.duration());
            if !was_elapsed && self.time_elapsed() {
                info!("{}: trajectory completed, holding target", self.name);
            }
        }
        self.refresh_reference();
    }

    /// Reference at the current elapsed time
    pub fn sample(&self) -> TrajectoryReference {
        let t = self.elapsed;
        let position = self.curve.evaluate(t);
        let (rotation, angular_velocity) = self.orientation.evaluate(t);
        let pose = Isometry3::from_parts(Translation3::from(position), rotation);
        if self.time_elapsed() {
            return TrajectoryReference::hold(pose);
        }
        TrajectoryReference {
            pose,
            linear_velocity: self.curve.derivative(t, 1),
            linear_acceleration: self.curve.derivative(t, 2),
            angular_velocity,
        }
    }

    fn refresh_reference(&mut self) {
        let reference = self.sample();
        self.feedback.set_reference(&reference);
    }

    /// Change the final pose. Elapsed time is kept.
    pub fn set_target(&mut self, target: Pose) {
        debug!("{}: new target {:?}", self.name, target.translation.vector);
        self.curve.set_target(target.translation.vector);
        self.orientation.set_target(target.rotation);
    }

    /// Replace the position waypoints. Elapsed time is kept.
    pub fn set_waypoints(&mut self, waypoints: Vec<Vector3<f64>>) {
        debug!("{}: {} position waypoints", self.name, waypoints.len());
        self.curve.set_waypoints(waypoints);
    }

    /// Replace the orientation waypoints. Elapsed time is kept.
    pub fn set_ori_waypoints(&mut self, waypoints: Vec<OriWaypoint>) {
        debug!("{}: {} orientation waypoints", self.name, waypoints.len());
        self.orientation.set_waypoints(waypoints);
    }

    /// Set the display density, clamped to [1, MAX_DISPLAY_SAMPLES]
    pub fn set_display_samples(&mut self, samples: usize) {
        self.display_samples = samples.clamp(1, MAX_DISPLAY_SAMPLES);
    }

    /// Freeze or resume time. References are still emitted while paused.
    pub fn pause(&mut self, paused: bool) {
        if paused != self.paused {
            info!("{}: {}", self.name, if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
    }

    /// Restart the trajectory from `current`, which becomes the new start pose
    pub fn reset(&mut self, current: &Pose) {
        info!("{}: reset", self.name);
        self.elapsed = 0.0;
        self.curve.set_start(current.translation.vector);
        self.orientation.set_initial(current.rotation);
        self.refresh_reference();
    }

    /// Translate a UI mutation into the matching setter
    pub fn apply(&mut self, mutation: Mutation) -> Result<()> {
        match mutation {
            Mutation::SetTarget(pose) => self.set_target(pose),
            Mutation::SetWaypoints(waypoints) => self.set_waypoints(waypoints),
            Mutation::MoveWaypoint { index, position } => {
                let mut waypoints = self.curve.waypoints().to_vec();
                let len = waypoints.len();
                let waypoint = waypoints
                    .get_mut(index)
                    .ok_or(TrajectoryError::InvalidWaypointIndex { index, len })?;
                *waypoint = position;
                self.set_waypoints(waypoints);
            }
            Mutation::AddWaypoint { position } => {
                let mut waypoints = self.curve.waypoints().to_vec();
                waypoints.push(position);
                self.set_waypoints(waypoints);
            }
            Mutation::RemoveWaypoint { index } => {
                let mut waypoints = self.curve.waypoints().to_vec();
                if index >= waypoints.len() {
                    return Err(TrajectoryError::InvalidWaypointIndex {
                        index,
                        len: waypoints.len(),
                    });
                }
                waypoints.remove(index);
                self.set_waypoints(waypoints);
            }
            Mutation::SetDisplaySamples(samples) => self.set_display_samples(samples),
            Mutation::Pause(paused) => self.pause(paused),
        }
        Ok(())
    }

    fn gui_category(&self) -> Vec<String> {
        vec!["Tasks".to_string(), self.name.clone()]
    }
}

impl<C: SplineCurve + 'static> MetaTask for SplineTrajectoryTask<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn state(&self) -> TaskState {
        SplineTrajectoryTask::state(self)
    }

    fn update(&mut self, dt: f64) {
        self.advance(dt);
    }

    fn apply(&mut self, mutation: Mutation) -> Result<()> {
        SplineTrajectoryTask::apply(self, mutation)
    }

    fn reset(&mut self, robots: &Robots) -> Result<()> {
        let current = *robots.robot(Some(&self.robot))?.frame(&self.frame)?;
        SplineTrajectoryTask::reset(self, &current);
        Ok(())
    }

    fn add_to_gui(&self, gui: &mut StateBuilder) {
        let category = self.gui_category();
        gui.add_element(
            &category,
            GuiElement::Label {
                name: "time".to_string(),
                text: format!("{:.3} / {:.3} s", self.elapsed, self.duration()),
            },
        );
        gui.add_element(
            &category,
            GuiElement::Checkbox {
                name: "paused".to_string(),
                value: self.paused,
            },
        );
        gui.add_element(
            &category,
            GuiElement::NumberInput {
                name: "display_samples".to_string(),
                value: self.display_samples as f64,
            },
        );
        gui.add_element(
            &category,
            GuiElement::Transform {
                name: "target".to_string(),
                pose: self.target(),
            },
        );
        self.curve.add_to_gui(gui, &category, self.display_samples);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Robot;
    use crate::control::feedback::TransformTask;
    use crate::control::trajectory::BSpline;
    use nalgebra::UnitQuaternion;

    const EPS: f64 = 1e-9;

    fn straight_task(duration: f64) -> SplineTrajectoryTask<BSpline> {
        let curve = BSpline::new(duration, Vector3::zeros(), Vector3::new(1.0, 0.0, 0.0), vec![]).unwrap();
        let orientation = InterpolatedRotation::new(
            duration,
            UnitQuaternion::identity(),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 1.0),
            vec![],
        );
        SplineTrajectoryTask::new(
            "bspline_trajectory",
            "arm",
            "tool",
            curve,
            orientation,
            Box::new(TransformTask::new(100.0, 500.0)),
        )
    }

    #[test]
    fn test_initial_reference_is_start() {
        let task = straight_task(2.0);
        assert_eq!(task.name(), "bspline_trajectory_arm_tool");
        assert_eq!(task.current_time(), 0.0);
        assert_eq!(*task.reference().position(), Vector3::zeros());
        assert!((task.reference().linear_velocity - Vector3::new(0.5, 0.0, 0.0)).norm() < EPS);
    }

    #[test]
    fn test_advance_samples_curve() {
        let mut task = straight_task(2.0);
        task.advance(0.5);
        task.advance(0.5);

        assert!((task.current_time() - 1.0).abs() < EPS);
        assert_eq!(task.state(), TaskState::Active);
        let reference = task.reference();
        assert!((reference.position() - Vector3::new(0.5, 0.0, 0.0)).norm() < EPS);
        assert!((reference.linear_velocity - Vector3::new(0.5, 0.0, 0.0)).norm() < EPS);
        assert!((reference.angular_velocity - Vector3::new(0.0, 0.0, 0.5)).norm() < EPS);
    }

    #[test]
    fn test_pause_freezes_time_but_emits() {
        let mut task = straight_task(2.0);
        task.advance(0.5);
        task.pause(true);
        assert_eq!(task.state(), TaskState::Paused);

        // A target change while paused shows up in the next reference at the same time
        task.set_target(Isometry3::translation(0.0, 2.0, 0.0));
        task.advance(0.5);
        assert!((task.current_time() - 0.5).abs() < EPS);
        let expected = task.curve().evaluate(0.5);
        assert!((task.reference().position() - expected).norm() < EPS);
        assert!((expected - Vector3::new(0.0, 0.5, 0.0)).norm() < EPS);

        task.pause(false);
        task.advance(0.5);
        assert!((task.current_time() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_completion_holds_target() {
        let mut task = straight_task(2.0);
        for _ in 0..30 {
            task.advance(0.1);
        }

        assert_eq!(task.current_time(), 2.0);
        assert!(task.time_elapsed());
        assert_eq!(task.state(), TaskState::Completed);
        let reference = task.reference();
        assert_eq!(*reference.position(), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(reference.linear_velocity, Vector3::zeros());
        assert_eq!(reference.linear_acceleration, Vector3::zeros());
        assert_eq!(reference.angular_velocity, Vector3::zeros());
        assert!(reference.pose.rotation.angle_to(&task.target().rotation) < EPS);
    }

    #[test]
    fn test_negative_dt_does_not_rewind() {
        let mut task = straight_task(2.0);
        task.advance(0.4);
        task.advance(-1.0);
        assert!((task.current_time() - 0.4).abs() < EPS);
    }

    #[test]
    fn test_mutations_keep_time_and_start() {
        let mut task = straight_task(2.0);
        task.advance(1.0);

        task.set_waypoints(vec![Vector3::new(0.5, 1.0, 0.0)]);
        task.set_target(Isometry3::translation(2.0, 0.0, 0.0));
        assert_eq!(task.current_time(), 1.0);
        assert_eq!(*task.curve().start(), Vector3::zeros());
        assert_eq!(task.curve().waypoints().len(), 1);
        assert_eq!(task.duration(), 2.0);
    }

    #[test]
    fn test_apply_waypoint_mutations() {
        let mut task = straight_task(2.0);
        task.apply(Mutation::AddWaypoint { position: Vector3::new(0.2, 0.0, 0.0) }).unwrap();
        task.apply(Mutation::AddWaypoint { position: Vector3::new(0.8, 0.0, 0.0) }).unwrap();
        task.apply(Mutation::MoveWaypoint { index: 0, position: Vector3::new(0.3, 0.1, 0.0) }).unwrap();
        task.apply(Mutation::RemoveWaypoint { index: 1 }).unwrap();

        assert_eq!(task.curve().waypoints(), &[Vector3::new(0.3, 0.1, 0.0)]);
        assert!(matches!(
            task.apply(Mutation::RemoveWaypoint { index: 4 }),
            Err(TrajectoryError::InvalidWaypointIndex { index: 4, len: 1 })
        ));
        assert!(matches!(
            task.apply(Mutation::MoveWaypoint { index: 1, position: Vector3::zeros() }),
            Err(TrajectoryError::InvalidWaypointIndex { index: 1, len: 1 })
        ));

        task.apply(Mutation::SetDisplaySamples(0)).unwrap();
        assert_eq!(task.display_samples(), 1);
        task.apply(Mutation::SetDisplaySamples(usize::MAX)).unwrap();
        assert_eq!(task.display_samples(), MAX_DISPLAY_SAMPLES);
        task.apply(Mutation::Pause(true)).unwrap();
        assert!(task.paused());
    }

    #[test]
    fn test_reset_restarts_from_robot_frame() {
        let mut task = straight_task(2.0);
        task.advance(1.5);

        let current = Isometry3::translation(0.2, 0.3, 0.4);
        let robots = Robots::new(vec![Robot::new("arm").with_frame("tool", current)]);
        MetaTask::reset(&mut task, &robots).unwrap();

        assert_eq!(task.current_time(), 0.0);
        assert_eq!(*task.curve().start(), Vector3::new(0.2, 0.3, 0.4));
        assert_eq!(*task.reference().position(), Vector3::new(0.2, 0.3, 0.4));
        assert_eq!(*task.curve().target(), Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_gui_lists_handles() {
        let mut task = straight_task(2.0);
        task.set_waypoints(vec![Vector3::new(0.1, 0.2, 0.3), Vector3::new(0.4, 0.5, 0.6)]);
        task.set_display_samples(8);

        let mut gui = StateBuilder::new();
        MetaTask::add_to_gui(&task, &mut gui);

        let category = task.gui_category();
        assert!(matches!(gui.find(&category, "target"), Some(GuiElement::Transform { .. })));
        assert!(matches!(
            gui.find(&category, "trajectory"),
            Some(GuiElement::Polyline { points, .. }) if points.len() == 9
        ));

        let mut points = category.clone();
        points.push("Control points".to_string());
        assert!(matches!(
            gui.find(&points, "control_point_1"),
            Some(GuiElement::Point3 { index: 1, position, .. }) if *position == Vector3::new(0.4, 0.5, 0.6)
        ));
        assert!(matches!(
            gui.find(&points, "control_points"),
            Some(GuiElement::ArrayInput { len: 2, .. })
        ));
    }

    #[test]
    fn test_huge_display_density_is_bounded() {
        let mut task = straight_task(2.0);
        task.set_display_samples(usize::MAX);

        let mut gui = StateBuilder::new();
        MetaTask::add_to_gui(&task, &mut gui);
        assert!(matches!(
            gui.find(&task.gui_category(), "trajectory"),
            Some(GuiElement::Polyline { points, .. }) if points.len() == MAX_DISPLAY_SAMPLES + 1
        ));
    }
}
