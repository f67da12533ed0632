//! Common utilities and types shared across the crate

use crate::error::{Result, TrajectoryError};
use nalgebra::Isometry3;
use std::collections::HashMap;

/// Common types and utilities used across the codebase
pub mod types {
    use nalgebra::{Isometry3, UnitQuaternion};

    /// A world rotation
    pub type Rotation = UnitQuaternion<f64>;

    /// A rigid world pose (rotation + translation)
    pub type Pose = Isometry3<f64>;

    /// Orientation waypoint as (time, rotation)
    pub type OriWaypoint = (f64, Rotation);
}

/// A robot seen as a named set of frames with known world poses.
///
/// Kinematics live outside this crate; callers refresh the frame poses
/// from their own model before loading or resetting tasks.
#[derive(Debug, Clone)]
pub struct Robot {
    pub name: String,
    frames: HashMap<String, Isometry3<f64>>,
}

impl Robot {
    /// Create a robot with no frames
    pub fn new(name: &str) -> Self {
        Robot {
            name: name.to_string(),
            frames: HashMap::new(),
        }
    }

    /// Add a frame, builder style
    pub fn with_frame(mut self, frame: &str, pose: Isometry3<f64>) -> Self {
        self.set_frame(frame, pose);
        self
    }

    /// Insert or update a frame's world pose
    pub fn set_frame(&mut self, frame: &str, pose: Isometry3<f64>) {
        self.frames.insert(frame.to_string(), pose);
    }

    /// World pose of a frame
    pub fn frame(&self, frame: &str) -> Result<&Isometry3<f64>> {
        self.frames
            .get(frame)
            .ok_or_else(|| TrajectoryError::UnknownFrame {
                robot: self.name.clone(),
                frame: frame.to_string(),
            })
    }
}

/// The set of robots known to the controller. The first one is the main robot.
#[derive(Debug, Clone, Default)]
pub struct Robots {
    robots: Vec<Robot>,
}

impl Robots {
    /// Robot set whose first element is the main robot
    pub fn new(robots: Vec<Robot>) -> Self {
        Robots { robots }
    }

    /// Add a robot. It only becomes the main robot if the set was empty.
    pub fn push(&mut self, robot: Robot) {
        self.robots.push(robot);
    }

    /// The main robot
    pub fn main(&self) -> Result<&Robot> {
        self.robots
            .first()
            .ok_or_else(|| TrajectoryError::UnknownRobot("<main>".to_string()))
    }

    /// Look up a robot by name, falling back to the main robot when `name` is `None`
    pub fn robot(&self, name: Option<&str>) -> Result<&Robot> {
        match name {
            None => self.main(),
            Some(name) => self
                .robots
                .iter()
                .find(|r| r.name == name)
                .ok_or_else(|| TrajectoryError::UnknownRobot(name.to_string())),
        }
    }

    /// Mutable lookup, used to refresh frame poses before a reset
    pub fn robot_mut(&mut self, name: &str) -> Option<&mut Robot> {
        self.robots.iter_mut().find(|r| r.name == name)
    }
}
