//! Control module: reference trajectories and the feedback task tracking them
pub mod feedback;
pub mod trajectory;

pub use self::feedback::{FeedbackTask, TransformTask};
