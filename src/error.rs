//! Error types for trajectory construction and loading

use thiserror::Error;

/// Errors raised while building or loading a trajectory task
#[derive(Debug, Error)]
pub enum TrajectoryError {
    #[error("missing required configuration key `{0}`")]
    MissingKey(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("trajectory duration must be positive, got {0}")]
    InvalidDuration(f64),

    #[error("invalid rotation: {0}")]
    InvalidRotation(String),

    #[error("no loader registered for task type `{0}`")]
    UnknownTaskType(String),

    #[error("no robot named `{0}`")]
    UnknownRobot(String),

    #[error("robot `{robot}` has no frame named `{frame}`")]
    UnknownFrame { robot: String, frame: String },

    #[error("no task named `{0}`")]
    UnknownTask(String),

    #[error("waypoint index {index} out of range ({len} waypoints)")]
    InvalidWaypointIndex { index: usize, len: usize },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = TrajectoryError> = std::result::Result<T, E>;
