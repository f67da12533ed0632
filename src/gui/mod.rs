//! Interactive control surface
//!
//! Tasks describe their editable handles into a [`StateBuilder`]. A UI never
//! edits a task directly: a [`ControlSurface`] turns user edits into
//! [`Mutation`]s and queues them. The control loop drains that queue right
//! before each tick, so the task only ever has one writer.

use log::warn;
use nalgebra::{Isometry3, Vector3};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// One element displayed by a UI
#[derive(Debug, Clone, PartialEq)]
pub enum GuiElement {
    /// Read-only text
    Label { name: String, text: String },
    Checkbox { name: String, value: bool },
    NumberInput { name: String, value: f64 },
    /// Draggable position handle. `index` is the waypoint it edits.
    Point3 {
        name: String,
        index: usize,
        position: Vector3<f64>,
    },
    /// Draggable pose handle
    Transform { name: String, pose: Isometry3<f64> },
    /// Growable list with add/remove buttons
    ArrayInput { name: String, len: usize },
    /// Display-only line strip
    Polyline {
        name: String,
        points: Vec<Vector3<f64>>,
    },
}

impl GuiElement {
    /// Name the element is looked up by
    pub fn name(&self) -> &str {
        match self {
            GuiElement::Label { name, .. }
            | GuiElement::Checkbox { name, .. }
            | GuiElement::NumberInput { name, .. }
            | GuiElement::Point3 { name, .. }
            | GuiElement::Transform { name, .. }
            | GuiElement::ArrayInput { name, .. }
            | GuiElement::Polyline { name, .. } => name,
        }
    }
}

/// An element and the category path it is displayed under
#[derive(Debug, Clone)]
pub struct GuiEntry {
    pub category: Vec<String>,
    pub element: GuiElement,
}

/// Snapshot of everything the UI should display
#[derive(Debug, Default)]
pub struct StateBuilder {
    entries: Vec<GuiEntry>,
}

impl StateBuilder {
    /// Empty snapshot
    pub fn new() -> Self {
        StateBuilder::default()
    }

    /// Register `element` under `category`
    pub fn add_element(&mut self, category: &[String], element: GuiElement) {
        self.entries.push(GuiEntry {
            category: category.to_vec(),
            element,
        });
    }

    /// Every registered element, in insertion order
    pub fn entries(&self) -> &[GuiEntry] {
        &self.entries
    }

    /// Elements registered under exactly `category`
    pub fn category<'a>(&'a self, category: &'a [String]) -> impl Iterator<Item = &'a GuiElement> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.category == category)
            .map(|e| &e.element)
    }

    /// Element called `name` under exactly `category`
    pub fn find(&self, category: &[String], name: &str) -> Option<&GuiElement> {
        self.entries
            .iter()
            .find(|e| e.category == category && e.element.name() == name)
            .map(|e| &e.element)
    }

    /// Drop every element
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// An edit requested by the UI, applied by the owning task between ticks
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    SetTarget(Isometry3<f64>),
    SetWaypoints(Vec<Vector3<f64>>),
    MoveWaypoint { index: usize, position: Vector3<f64> },
    /// Appended after the last waypoint, right before the target
    AddWaypoint { position: Vector3<f64> },
    RemoveWaypoint { index: usize },
    SetDisplaySamples(usize),
    Pause(bool),
}

/// A mutation addressed to a task by name
#[derive(Debug, Clone, PartialEq)]
pub struct TaskMutation {
    pub task: String,
    pub mutation: Mutation,
}

/// Create the mutation queue. The receiver belongs to the control loop.
pub fn mutation_queue() -> (UnboundedSender<TaskMutation>, UnboundedReceiver<TaskMutation>) {
    mpsc::unbounded_channel()
}

/// Edit handle for one task, usable from any thread.
///
/// It only knows the task's name and the queue; dropping it has no effect on the task.
#[derive(Debug, Clone)]
pub struct ControlSurface {
    task: String,
    sender: UnboundedSender<TaskMutation>,
}

impl ControlSurface {
    /// Handle editing `task` through `sender`
    pub fn new(task: &str, sender: UnboundedSender<TaskMutation>) -> Self {
        ControlSurface {
            task: task.to_string(),
            sender,
        }
    }

    /// Name of the edited task
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Queue a mutation. Returns false once the control loop is gone.
    pub fn send(&self, mutation: Mutation) -> bool {
        let request = TaskMutation {
            task: self.task.clone(),
            mutation,
        };
        match self.sender.send(request) {
            Ok(()) => true,
            Err(e) => {
                warn!("Dropping {:?} for task {}: control loop stopped", e.0.mutation, self.task);
                false
            }
        }
    }

    /// Move waypoint `index` to `position`
    pub fn move_waypoint(&self, index: usize, position: Vector3<f64>) -> bool {
        self.send(Mutation::MoveWaypoint { index, position })
    }

    /// Append a waypoint before the target
    pub fn add_waypoint(&self, position: Vector3<f64>) -> bool {
        self.send(Mutation::AddWaypoint { position })
    }

    /// Remove waypoint `index`
    pub fn remove_waypoint(&self, index: usize) -> bool {
        self.send(Mutation::RemoveWaypoint { index })
    }

    /// Move the target pose
    pub fn set_target(&self, pose: Isometry3<f64>) -> bool {
        self.send(Mutation::SetTarget(pose))
    }

    /// Change the display density
    pub fn set_display_samples(&self, samples: usize) -> bool {
        self.send(Mutation::SetDisplaySamples(samples))
    }

    /// Pause or resume the task
    pub fn pause(&self, paused: bool) -> bool {
        self.send(Mutation::Pause(paused))
    }
}
