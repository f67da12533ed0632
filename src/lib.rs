pub mod common;
pub mod control;
pub mod error;
pub mod gui;
pub mod loader;
pub mod task;

use crate::common::Robots;
use crate::error::{Result, TrajectoryError};
use crate::gui::{ControlSurface, StateBuilder, TaskMutation};
use crate::loader::TaskRegistry;
use crate::task::MetaTask;
use log::{info, warn};
use serde_json::Value;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub use crate::control::trajectory::{BSpline, BSplineTrajectoryTask, InterpolatedRotation, SplineTrajectoryTask};
pub use crate::error::TrajectoryError as Error;

/// Owns the trajectory tasks and ticks them on the control thread.
///
/// UI contexts edit tasks through [`ControlSurface`] handles. Their mutations
/// are queued and applied by [`TrajectoryController::run_tick`] right before
/// the tasks are updated, so tasks only ever see one writer.
pub struct TrajectoryController {
    tasks: Vec<Box<dyn MetaTask>>,
    sender: UnboundedSender<TaskMutation>,
    mutations: UnboundedReceiver<TaskMutation>,
}

impl TrajectoryController {
    /// Create a controller with no task
    pub fn new() -> Self {
        let (sender, mutations) = gui::mutation_queue();
        TrajectoryController {
            tasks: Vec::new(),
            sender,
            mutations,
        }
    }

    /// Add a task. Names must be unique.
    pub fn register(&mut self, task: Box<dyn MetaTask>) -> Result<()> {
        if self.tasks.iter().any(|t| t.name() == task.name()) {
            return Err(TrajectoryError::InvalidConfig(format!(
                "a task named `{}` is already registered",
                task.name()
            )));
        }
        info!("Adding task {}", task.name());
        self.tasks.push(task);
        Ok(())
    }

    /// Load a task from configuration and add it. Returns the task's name.
    pub fn load(&mut self, registry: &TaskRegistry, config: &Value, robots: &Robots) -> Result<String> {
        let task = registry.load(config, robots)?;
        let name = task.name().to_string();
        self.register(task)?;
        Ok(name)
    }

    /// Remove a task, handing it back to the caller
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn MetaTask>> {
        let index = self.tasks.iter().position(|t| t.name() == name)?;
        info!("Removing task {}", name);
        Some(self.tasks.remove(index))
    }

    /// Every task, in registration order
    pub fn tasks(&self) -> impl Iterator<Item = &(dyn MetaTask + 'static)> {
        self.tasks.iter().map(|t| t.as_ref())
    }

    /// Task called `name`
    pub fn task(&self, name: &str) -> Option<&(dyn MetaTask + 'static)> {
        self.tasks.iter().find(|t| t.name() == name).map(|t| t.as_ref())
    }

    /// Get a task as its concrete type
    pub fn task_as<T: MetaTask + 'static>(&self, name: &str) -> Option<&T> {
        self.task(name)
            .and_then(|task| task.as_any().downcast_ref::<T>())
    }

    /// Get a task as its concrete type
    pub fn task_as_mut<T: MetaTask + 'static>(&mut self, name: &str) -> Option<&mut T> {
        self.tasks
            .iter_mut()
            .filter(|task| task.name() == name)
            .find_map(|task| task.as_any_mut().downcast_mut::<T>())
    }

    /// Edit handle for `task`, usable from another thread
    pub fn control_surface(&self, task: &str) -> ControlSurface {
        ControlSurface::new(task, self.sender.clone())
    }

    /// Apply every queued mutation. Returns how many were processed.
    ///
    /// Invalid mutations are logged and skipped.
    pub fn drain_mutations(&mut self) -> usize {
        let mut count = 0;
        while let Ok(request) = self.mutations.try_recv() {
            count += 1;
            match self.tasks.iter_mut().find(|t| t.name() == request.task) {
                Some(task) => {
                    if let Err(e) = task.apply(request.mutation) {
                        warn!("Rejected mutation for {}: {}", request.task, e);
                    }
                }
                None => warn!("{}", TrajectoryError::UnknownTask(request.task)),
            }
        }
        count
    }

    /// One control cycle: apply queued mutations, then update every task
    pub fn run_tick(&mut self, dt: f64) {
        self.drain_mutations();
        for task in &mut self.tasks {
            task.update(dt);
        }
    }

    /// Restart every task from the robots' current state
    pub fn reset(&mut self, robots: &Robots) -> Result<()> {
        for task in &mut self.tasks {
            task.reset(robots)?;
        }
        Ok(())
    }

    /// Describe every task's editable elements
    pub fn gui(&self) -> StateBuilder {
        let mut gui = StateBuilder::new();
        for task in &self.tasks {
            task.add_to_gui(&mut gui);
        }
        gui
    }
}

impl Default for TrajectoryController {
    fn default() -> Self {
        Self::new()
    }
}
