//! Feedback tasks consuming trajectory references

use crate::control::trajectory::TrajectoryReference;
use nalgebra::{Isometry3, Vector3, Vector6};
use std::fmt::Debug;

/// Weighted tracking objective fed with a new reference every tick.
///
/// Six-dimensional quantities are ordered rotational part first, then
/// translational part.
pub trait FeedbackTask: Debug + Send {
    /// Replace the tracked reference
    fn set_reference(&mut self, reference: &TrajectoryReference);

    /// Reference currently tracked
    fn reference(&self) -> &TrajectoryReference;

    /// Proportional gain
    fn stiffness(&self) -> f64;

    /// Derivative gain
    fn damping(&self) -> f64;

    /// Set stiffness and damping together
    fn set_gains(&mut self, stiffness: f64, damping: f64);

    /// Weight of the objective among the controller's tasks
    fn weight(&self) -> f64;

    /// Tracking error of `current` with respect to the reference pose
    fn eval(&self, current: &Isometry3<f64>) -> Vector6<f64>;
}

/// Proportional-derivative tracker of a full frame pose
#[derive(Debug, Clone)]
pub struct TransformTask {
    stiffness: f64,
    damping: f64,
    weight: f64,
    reference: TrajectoryReference,
}

impl TransformTask {
    /// Create a task with critical damping, holding the identity pose
    pub fn new(stiffness: f64, weight: f64) -> Self {
        TransformTask {
            stiffness,
            damping: 2.0 * stiffness.sqrt(),
            weight,
            reference: TrajectoryReference::hold(Isometry3::identity()),
        }
    }

    /// Desired frame acceleration for the given pose and velocity
    pub fn compute_acceleration(
        &self,
        current: &Isometry3<f64>,
        angular_velocity: &Vector3<f64>,
        linear_velocity: &Vector3<f64>,
    ) -> Vector6<f64> {
        let error = self.eval(current);
        let angular = self.stiffness * error.fixed_rows::<3>(0)
            + self.damping * (self.reference.angular_velocity - angular_velocity);
        let linear = self.reference.linear_acceleration
            + self.stiffness * error.fixed_rows::<3>(3)
            + self.damping * (self.reference.linear_velocity - linear_velocity);
        Vector6::new(angular.x, angular.y, angular.z, linear.x, linear.y, linear.z)
    }
}

impl FeedbackTask for TransformTask {
    fn set_reference(&mut self, reference: &TrajectoryReference) {
        self.reference = reference.clone();
    }

    fn reference(&self) -> &TrajectoryReference {
        &self.reference
    }

    fn stiffness(&self) -> f64 {
        self.stiffness
    }

    fn damping(&self) -> f64 {
        self.damping
    }

    fn set_gains(&mut self, stiffness: f64, damping: f64) {
        self.stiffness = stiffness;
        self.damping = damping;
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn eval(&self, current: &Isometry3<f64>) -> Vector6<f64> {
        let rotation = current.rotation.rotation_to(&self.reference.pose.rotation).scaled_axis();
        let translation = self.reference.pose.translation.vector - current.translation.vector;
        Vector6::new(
            rotation.x,
            rotation.y,
            rotation.z,
            translation.x,
            translation.y,
            translation.z,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Translation3, UnitQuaternion};

    #[test]
    fn test_critical_damping_default() {
        let task = TransformTask::new(100.0, 500.0);
        assert_eq!(task.stiffness(), 100.0);
        assert_eq!(task.damping(), 20.0);
        assert_eq!(task.weight(), 500.0);
    }

    #[test]
    fn test_eval_error() {
        let mut task = TransformTask::new(10.0, 1.0);
        let target = Isometry3::from_parts(
            Translation3::new(1.0, 2.0, 3.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.5),
        );
        task.set_reference(&TrajectoryReference::hold(target));

        let error = task.eval(&Isometry3::identity());
        assert!((error - Vector6::new(0.0, 0.0, 0.5, 1.0, 2.0, 3.0)).norm() < 1e-12);
        assert!(task.eval(&target).norm() < 1e-12);
    }

    #[test]
    fn test_acceleration_feeds_forward_reference() {
        let mut task = TransformTask::new(4.0, 1.0);
        let mut reference = TrajectoryReference::hold(Isometry3::identity());
        reference.linear_velocity = Vector3::new(1.0, 0.0, 0.0);
        reference.linear_acceleration = Vector3::new(0.0, 0.5, 0.0);
        task.set_reference(&reference);

        // On the reference: only the feed-forward acceleration remains
        let acc = task.compute_acceleration(
            &Isometry3::identity(),
            &Vector3::zeros(),
            &Vector3::new(1.0, 0.0, 0.0),
        );
        assert!((acc - Vector6::new(0.0, 0.0, 0.0, 0.0, 0.5, 0.0)).norm() < 1e-12);

        // Lagging behind in velocity adds damping * velocity error
        let acc = task.compute_acceleration(&Isometry3::identity(), &Vector3::zeros(), &Vector3::zeros());
        assert!((acc.x - 0.0).abs() < 1e-12);
        assert!((acc[3] - 4.0).abs() < 1e-12);
    }
}
