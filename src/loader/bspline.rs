//! Loader for `bspline_trajectory` tasks
//!
//! The target is either an absolute world pose (`target`) or an offset
//! relative to a frame (`targetFrame`). In the relative case, control points
//! and orientation waypoints are offsets in that same frame.

use super::{PoseConfig, RotationConfig};
use crate::common::types::{OriWaypoint, Pose};
use crate::common::Robots;
use crate::control::trajectory::{BSplineTrajectoryTask, BoundaryConstraint, CurveConstraints};
use crate::error::{Result, TrajectoryError};
use crate::task::MetaTask;
use log::warn;
use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use serde::Deserialize;
use serde_json::Value;

fn default_duration() -> f64 {
    10.0
}

fn default_stiffness() -> f64 {
    100.0
}

fn default_weight() -> f64 {
    500.0
}

/// Configuration of a `bspline_trajectory` task
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BSplineTrajectoryConfig {
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub name: Option<String>,
    /// Controlled robot, the main robot when absent
    pub robot: Option<String>,
    pub frame: Option<String>,
    /// Deprecated alias of `frame`
    pub surface: Option<String>,
    #[serde(default = "default_duration")]
    pub duration: f64,
    #[serde(default = "default_stiffness")]
    pub stiffness: f64,
    /// Critical damping when absent
    pub damping: Option<f64>,
    #[serde(default = "default_weight")]
    pub weight: f64,
    pub target: Option<PoseConfig>,
    pub target_frame: Option<TargetFrameConfig>,
    /// Deprecated alias of `targetFrame`
    pub target_surface: Option<TargetFrameConfig>,
    pub control_points: Option<Vec<[f64; 3]>>,
    pub ori_waypoints: Option<Vec<(f64, RotationConfig)>>,
    pub constraints: Option<ConstraintsConfig>,
    pub display_samples: Option<usize>,
    #[serde(default)]
    pub paused: bool,
}

/// Target expressed as an offset in a robot frame
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetFrameConfig {
    /// Robot owning the frame, the main robot when absent
    pub robot: Option<String>,
    pub frame: Option<String>,
    /// Deprecated alias of `frame`
    pub surface: Option<String>,
    #[serde(default)]
    pub translation: [f64; 3],
    pub rotation: Option<RotationConfig>,
    pub control_points: Option<Vec<[f64; 3]>>,
    pub ori_waypoints: Option<Vec<(f64, RotationConfig)>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoundaryConfig {
    pub velocity: [f64; 3],
    pub acceleration: Option<[f64; 3]>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstraintsConfig {
    pub start: Option<BoundaryConfig>,
    pub end: Option<BoundaryConfig>,
}

impl From<BoundaryConfig> for BoundaryConstraint {
    fn from(c: BoundaryConfig) -> Self {
        BoundaryConstraint {
            velocity: Vector3::from(c.velocity),
            acceleration: c.acceleration.map(Vector3::from),
        }
    }
}

impl From<ConstraintsConfig> for CurveConstraints {
    fn from(c: ConstraintsConfig) -> Self {
        CurveConstraints {
            start: c.start.map(BoundaryConstraint::from),
            end: c.end.map(BoundaryConstraint::from),
        }
    }
}

/// Pick `modern`, or fall back to the deprecated key with a warning
fn with_deprecated<'a, T>(
    context: &str,
    modern: Option<&'a T>,
    modern_key: &str,
    deprecated: Option<&'a T>,
    deprecated_key: &str,
) -> Option<&'a T> {
    match (modern, deprecated) {
        (Some(value), Some(_)) => {
            warn!(
                "[{}] both `{}` and deprecated `{}` are set, using `{}`",
                context, modern_key, deprecated_key, modern_key
            );
            Some(value)
        }
        (Some(value), None) => Some(value),
        (None, Some(value)) => {
            warn!(
                "[{}] `{}` is deprecated, use `{}` instead",
                context, deprecated_key, modern_key
            );
            Some(value)
        }
        (None, None) => None,
    }
}

/// Target pose and waypoints, all in world coordinates
struct ResolvedTarget {
    target: Pose,
    pos_waypoints: Vec<Vector3<f64>>,
    ori_waypoints: Vec<OriWaypoint>,
}

fn absolute_points(points: &[[f64; 3]]) -> Vec<Vector3<f64>> {
    points.iter().map(|p| Vector3::from(*p)).collect()
}

fn absolute_rotations(waypoints: &[(f64, RotationConfig)]) -> Vec<OriWaypoint> {
    waypoints.iter().map(|(t, r)| (*t, r.0)).collect()
}

impl BSplineTrajectoryConfig {
    fn controlled_frame(&self) -> Result<&str> {
        with_deprecated(
            "bspline_trajectory",
            self.frame.as_ref(),
            "frame",
            self.surface.as_ref(),
            "surface",
        )
        .map(String::as_str)
        .ok_or_else(|| TrajectoryError::MissingKey("frame".to_string()))
    }

    fn resolve_target(&self, robots: &Robots) -> Result<ResolvedTarget> {
        let relative = with_deprecated(
            "bspline_trajectory",
            self.target_frame.as_ref(),
            "targetFrame",
            self.target_surface.as_ref(),
            "targetSurface",
        );

        let Some(tf) = relative else {
            let target = self
                .target
                .as_ref()
                .ok_or_else(|| TrajectoryError::MissingKey("target".to_string()))?;
            return Ok(ResolvedTarget {
                target: target.to_isometry(),
                pos_waypoints: absolute_points(self.control_points.as_deref().unwrap_or_default()),
                ori_waypoints: absolute_rotations(self.ori_waypoints.as_deref().unwrap_or_default()),
            });
        };

        let frame_name = with_deprecated(
            "bspline_trajectory::targetFrame",
            tf.frame.as_ref(),
            "frame",
            tf.surface.as_ref(),
            "surface",
        )
        .ok_or_else(|| TrajectoryError::MissingKey("targetFrame.frame".to_string()))?;
        let frame = *robots.robot(tf.robot.as_deref())?.frame(frame_name)?;

        let offset = Isometry3::from_parts(
            Translation3::from(Vector3::from(tf.translation)),
            tf.rotation.map_or_else(UnitQuaternion::identity, |r| r.0),
        );

        // Offsets nested in targetFrame take precedence over top-level ones
        let points = tf.control_points.as_ref().or(self.control_points.as_ref());
        let rotations = tf.ori_waypoints.as_ref().or(self.ori_waypoints.as_ref());

        Ok(ResolvedTarget {
            target: frame * offset,
            pos_waypoints: points
                .map(|points| {
                    points
                        .iter()
                        .map(|p| (frame * Point3::from(Vector3::from(*p))).coords)
                        .collect()
                })
                .unwrap_or_default(),
            ori_waypoints: rotations
                .map(|waypoints| waypoints.iter().map(|(t, r)| (*t, frame.rotation * r.0)).collect())
                .unwrap_or_default(),
        })
    }
}

/// Build a `bspline_trajectory` task from configuration
pub fn load_bspline_task(config: &Value, robots: &Robots) -> Result<BSplineTrajectoryTask> {
    let config: BSplineTrajectoryConfig = serde_json::from_value(config.clone())?;

    let robot = robots.robot(config.robot.as_deref())?;
    let frame = config.controlled_frame()?;
    let resolved = config.resolve_target(robots)?;
    let constraints = config.constraints.map(CurveConstraints::from).unwrap_or_default();

    let mut task = BSplineTrajectoryTask::bspline_with_waypoints(
        robot,
        frame,
        config.duration,
        config.stiffness,
        config.weight,
        resolved.target,
        constraints,
        resolved.pos_waypoints,
        resolved.ori_waypoints,
    )?;

    if let Some(name) = &config.name {
        task.set_name(name);
    }
    if let Some(damping) = config.damping {
        task.feedback_mut().set_gains(config.stiffness, damping);
    }
    if let Some(samples) = config.display_samples {
        task.set_display_samples(samples);
    }
    task.pause(config.paused);
    Ok(task)
}

/// Registry entry point for `bspline_trajectory`
pub fn load_bspline_trajectory(config: &Value, robots: &Robots) -> Result<Box<dyn MetaTask>> {
    Ok(Box::new(load_bspline_task(config, robots)?))
}
