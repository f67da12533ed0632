//! Trajectory task following a [`BSpline`] curve

use super::{BSpline, CurveConstraints, InterpolatedRotation, SplineTrajectoryTask};
use crate::common::types::{OriWaypoint, Pose};
use crate::common::Robot;
use crate::control::feedback::TransformTask;
use crate::error::Result;
use log::debug;
use nalgebra::Vector3;

/// Type identifier used by the task registry
pub const BSPLINE_TRAJECTORY: &str = "bspline_trajectory";

/// Track a control-polygon curve with a robot frame
pub type BSplineTrajectoryTask = SplineTrajectoryTask<BSpline>;

impl SplineTrajectoryTask<BSpline> {
    /// Straight move of `frame` from its current pose to `target` in `duration` seconds
    pub fn bspline(
        robot: &Robot,
        frame: &str,
        duration: f64,
        stiffness: f64,
        weight: f64,
        target: Pose,
    ) -> Result<Self> {
        Self::bspline_with_waypoints(
            robot,
            frame,
            duration,
            stiffness,
            weight,
            target,
            CurveConstraints::default(),
            Vec::new(),
            Vec::new(),
        )
    }

    /// Move of `frame` to `target` shaped by position and orientation waypoints.
    ///
    /// `pos_waypoints` exclude the start and the target. Orientation waypoints
    /// are `(time, rotation)` pairs within `[0, duration]`.
    #[allow(clippy::too_many_arguments)]
    pub fn bspline_with_waypoints(
        robot: &Robot,
        frame: &str,
        duration: f64,
        stiffness: f64,
        weight: f64,
        target: Pose,
        constraints: CurveConstraints,
        pos_waypoints: Vec<Vector3<f64>>,
        ori_waypoints: Vec<OriWaypoint>,
    ) -> Result<Self> {
        let start = *robot.frame(frame)?;
        if constraints.is_empty() {
            debug!("Building unconstrained bspline trajectory for {}::{}", robot.name, frame);
        } else {
            debug!(
                "Building constrained bspline trajectory for {}::{}: {:?}",
                robot.name, frame, constraints
            );
        }

        let curve = BSpline::with_constraints(
            duration,
            start.translation.vector,
            target.translation.vector,
            constraints,
            pos_waypoints,
        )?;
        let orientation = InterpolatedRotation::new(duration, start.rotation, target.rotation, ori_waypoints);
        Ok(SplineTrajectoryTask::new(
            BSPLINE_TRAJECTORY,
            &robot.name,
            frame,
            curve,
            orientation,
            Box::new(TransformTask::new(stiffness, weight)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::trajectory::{BoundaryConstraint, SplineCurve};
    use crate::error::TrajectoryError;
    use crate::task::MetaTask;
    use nalgebra::{Isometry3, Translation3, UnitQuaternion};
    use std::f64::consts::FRAC_PI_2;

    fn robot_at(pose: Isometry3<f64>) -> Robot {
        Robot::new("arm").with_frame("tool", pose)
    }

    #[test]
    fn test_straight_line_scenario() {
        let robot = robot_at(Isometry3::identity());
        let mut task =
            BSplineTrajectoryTask::bspline(&robot, "tool", 2.0, 100.0, 500.0, Isometry3::translation(1.0, 0.0, 0.0))
                .unwrap();

        assert_eq!(task.name(), "bspline_trajectory_arm_tool");
        assert_eq!(task.type_name(), BSPLINE_TRAJECTORY);
        assert_eq!(task.feedback().stiffness(), 100.0);
        assert_eq!(task.feedback().weight(), 500.0);

        task.advance(1.0);
        assert!((task.reference().position() - Vector3::new(0.5, 0.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_start_is_frame_pose() {
        let start = Isometry3::from_parts(
            Translation3::new(0.4, -0.2, 0.9),
            UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3),
        );
        let robot = robot_at(start);
        let task = BSplineTrajectoryTask::bspline(&robot, "tool", 1.0, 10.0, 1.0, Isometry3::identity()).unwrap();

        assert_eq!(*task.curve().start(), start.translation.vector);
        assert_eq!(task.reference().pose.rotation, start.rotation);
    }

    #[test]
    fn test_orientation_waypoint_scenario() {
        let quarter = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        let robot = robot_at(Isometry3::identity());
        let mut task = BSplineTrajectoryTask::bspline_with_waypoints(
            &robot,
            "tool",
            2.0,
            100.0,
            500.0,
            Isometry3::identity(),
            CurveConstraints::default(),
            vec![],
            vec![(1.0, quarter)],
        )
        .unwrap();

        task.advance(1.0);
        assert_eq!(task.reference().pose.rotation, quarter);
        task.advance(1.0);
        assert_eq!(task.reference().pose.rotation, UnitQuaternion::identity());
    }

    #[test]
    fn test_end_velocity_constraint() {
        let robot = robot_at(Isometry3::identity());
        let constraints = CurveConstraints {
            start: None,
            end: Some(BoundaryConstraint::velocity(Vector3::new(0.0, 0.0, 1.0))),
        };
        let task = BSplineTrajectoryTask::bspline_with_waypoints(
            &robot,
            "tool",
            2.0,
            100.0,
            500.0,
            Isometry3::translation(1.0, 0.0, 0.0),
            constraints,
            vec![],
            vec![],
        )
        .unwrap();

        assert!((task.curve().derivative(2.0, 1) - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-9);
        assert_eq!(task.curve().constraints().end, constraints.end);
        assert!(task.curve().constraints().start.is_none());
    }

    #[test]
    fn test_invalid_inputs() {
        let robot = robot_at(Isometry3::identity());
        assert!(matches!(
            BSplineTrajectoryTask::bspline(&robot, "tool", 0.0, 1.0, 1.0, Isometry3::identity()),
            Err(TrajectoryError::InvalidDuration(_))
        ));
        assert!(matches!(
            BSplineTrajectoryTask::bspline(&robot, "wrist", 1.0, 1.0, 1.0, Isometry3::identity()),
            Err(TrajectoryError::UnknownFrame { .. })
        ));
    }
}
