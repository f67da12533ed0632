//! Task interface shared by everything the controller ticks

use crate::common::Robots;
use crate::error::Result;
use crate::gui::{Mutation, StateBuilder};
use std::any::Any;

/// Trait for tasks owned and updated by a [`crate::TrajectoryController`]
pub trait MetaTask: Send {
    /// Unique name, used to address mutations
    fn name(&self) -> &str;

    /// Type identifier the task was loaded from
    fn type_name(&self) -> &str;

    /// Current state of the task
    fn state(&self) -> TaskState;

    /// Run one control tick of `dt` seconds
    fn update(&mut self, dt: f64);

    /// Apply a queued UI mutation
    fn apply(&mut self, mutation: Mutation) -> Result<()>;

    /// Restart from the current robot state
    fn reset(&mut self, robots: &Robots) -> Result<()>;

    /// Describe the task's editable handles
    fn add_to_gui(&self, gui: &mut StateBuilder);

    /// Convert to Any for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Convert to Any for downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// State of a trajectory task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Time advances every tick
    Active,
    /// Time is frozen, references are still emitted
    Paused,
    /// Elapsed time reached the duration; the target is held
    Completed,
}
