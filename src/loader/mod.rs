//! Build tasks from JSON configuration
//!
//! A [`TaskRegistry`] maps the `type` key of a task configuration to the
//! function that builds it. The registry is an ordinary value: create it once
//! at startup and pass it to whatever loads tasks.

pub mod bspline;

use crate::common::Robots;
use crate::control::trajectory::bspline_task::BSPLINE_TRAJECTORY;
use crate::error::{Result, TrajectoryError};
use crate::task::MetaTask;
use log::{info, warn};
use nalgebra::{Isometry3, Matrix3, Rotation3, Translation3, UnitQuaternion, Vector3};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

pub use self::bspline::{load_bspline_task, load_bspline_trajectory, BSplineTrajectoryConfig};

/// Function building a task from its configuration and the controlled robots
pub type LoadFn = Box<dyn Fn(&Value, &Robots) -> Result<Box<dyn MetaTask>> + Send + Sync>;

/// Task factory keyed by type identifier
pub struct TaskRegistry {
    loaders: HashMap<String, LoadFn>,
}

impl TaskRegistry {
    /// Registry without any loader
    pub fn empty() -> Self {
        TaskRegistry {
            loaders: HashMap::new(),
        }
    }

    /// Register `loader` for `type_name`. An existing loader is kept and false is returned.
    pub fn register<F>(&mut self, type_name: &str, loader: F) -> bool
    where
        F: Fn(&Value, &Robots) -> Result<Box<dyn MetaTask>> + Send + Sync + 'static,
    {
        if self.loaders.contains_key(type_name) {
            warn!("A loader is already registered for `{}`, keeping it", type_name);
            return false;
        }
        self.loaders.insert(type_name.to_string(), Box::new(loader));
        true
    }

    /// True if a loader is registered for `type_name`
    pub fn has(&self, type_name: &str) -> bool {
        self.loaders.contains_key(type_name)
    }

    /// Registered type identifiers, sorted
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.loaders.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Load a task whose type is given by the `type` key of `config`
    pub fn load(&self, config: &Value, robots: &Robots) -> Result<Box<dyn MetaTask>> {
        let type_name = config
            .get("type")
            .ok_or_else(|| TrajectoryError::MissingKey("type".to_string()))?
            .as_str()
            .ok_or_else(|| TrajectoryError::InvalidConfig("`type` must be a string".to_string()))?;
        self.load_as(type_name, config, robots)
    }

    /// Load a task of an explicit type
    pub fn load_as(&self, type_name: &str, config: &Value, robots: &Robots) -> Result<Box<dyn MetaTask>> {
        let loader = self
            .loaders
            .get(type_name)
            .ok_or_else(|| TrajectoryError::UnknownTaskType(type_name.to_string()))?;
        let task = loader(config, robots)?;
        info!("Loaded task {} ({})", task.name(), type_name);
        Ok(task)
    }
}

impl Default for TaskRegistry {
    /// Registry with every task type shipped by this crate
    fn default() -> Self {
        let mut registry = TaskRegistry::empty();
        registry.register(BSPLINE_TRAJECTORY, load_bspline_trajectory);
        registry
    }
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistry").field("types", &self.types()).finish()
    }
}

/// Rotation given as roll/pitch/yaw (3 numbers), a quaternion `[w, x, y, z]`
/// (4 numbers) or a row-major rotation matrix (9 numbers)
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "Vec<f64>")]
pub struct RotationConfig(pub UnitQuaternion<f64>);

impl TryFrom<Vec<f64>> for RotationConfig {
    type Error = TrajectoryError;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        if values.iter().any(|v| !v.is_finite()) {
            return Err(TrajectoryError::InvalidRotation(format!("non-finite value in {:?}", values)));
        }
        let rotation = match values.len() {
            3 => UnitQuaternion::from_euler_angles(values[0], values[1], values[2]),
            4 => {
                let q = nalgebra::Quaternion::new(values[0], values[1], values[2], values[3]);
                UnitQuaternion::try_new(q, 1e-12).ok_or_else(|| {
                    TrajectoryError::InvalidRotation(format!("degenerate quaternion {:?}", values))
                })?
            }
            9 => {
                let m = Matrix3::from_row_slice(&values);
                if (m.transpose() * m - Matrix3::identity()).norm() > 1e-6 || m.determinant() <= 0.0 {
                    return Err(TrajectoryError::InvalidRotation(format!("not a rotation matrix: {:?}", values)));
                }
                UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(m))
            }
            n => {
                return Err(TrajectoryError::InvalidRotation(format!(
                    "expected 3, 4 or 9 values, got {}",
                    n
                )))
            }
        };
        Ok(RotationConfig(rotation))
    }
}

/// Rigid pose given as `{ "translation": [x, y, z], "rotation": ... }`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoseConfig {
    #[serde(default)]
    pub translation: [f64; 3],
    #[serde(default)]
    pub rotation: Option<RotationConfig>,
}

impl PoseConfig {
    /// World pose described by this configuration
    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::from(Vector3::from(self.translation)),
            self.rotation.map_or_else(UnitQuaternion::identity, |r| r.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_rotation_formats_agree() {
        let rpy: RotationConfig = serde_json::from_value(json!([0.0, 0.0, FRAC_PI_2])).unwrap();
        let half = FRAC_PI_2 / 2.0;
        let quat: RotationConfig = serde_json::from_value(json!([half.cos(), 0.0, 0.0, half.sin()])).unwrap();
        let matrix: RotationConfig =
            serde_json::from_value(json!([0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0])).unwrap();

        let expected = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        for rotation in [rpy, quat, matrix] {
            assert!(rotation.0.angle_to(&expected) < 1e-9);
        }
    }

    #[test]
    fn test_rotation_rejects_bad_input() {
        assert!(serde_json::from_value::<RotationConfig>(json!([1.0, 2.0])).is_err());
        assert!(serde_json::from_value::<RotationConfig>(json!([0.0, 0.0, 0.0, 0.0])).is_err());
        assert!(serde_json::from_value::<RotationConfig>(json!([2.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])).is_err());
    }

    #[test]
    fn test_pose_defaults() {
        let pose: PoseConfig = serde_json::from_value(json!({ "translation": [1.0, 2.0, 3.0] })).unwrap();
        let iso = pose.to_isometry();
        assert_eq!(iso.translation.vector, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(iso.rotation, UnitQuaternion::identity());
    }

    #[test]
    fn test_registry_dispatch() {
        let registry = TaskRegistry::default();
        assert!(registry.has(BSPLINE_TRAJECTORY));
        assert_eq!(registry.types(), vec![BSPLINE_TRAJECTORY]);

        let robots = Robots::default();
        assert!(matches!(
            registry.load(&json!({ "type": "exact_cubic_trajectory" }), &robots),
            Err(TrajectoryError::UnknownTaskType(t)) if t == "exact_cubic_trajectory"
        ));
        assert!(matches!(
            registry.load(&json!({ "frame": "tool" }), &robots),
            Err(TrajectoryError::MissingKey(k)) if k == "type"
        ));
    }

    #[test]
    fn test_register_keeps_first_loader() {
        let mut registry = TaskRegistry::default();
        let replaced = registry.register(BSPLINE_TRAJECTORY, |_: &Value, _: &Robots| -> Result<Box<dyn MetaTask>> {
            Err(TrajectoryError::InvalidConfig("never used".to_string()))
        });
        assert!(!replaced);
        assert_eq!(registry.types().len(), 1);
    }
}
