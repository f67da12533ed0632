use anyhow::{Context, Result};
use bspline_trajectory::common::{Robot, Robots};
use bspline_trajectory::loader::TaskRegistry;
use bspline_trajectory::task::TaskState;
use bspline_trajectory::{BSplineTrajectoryTask, TrajectoryController};
use log::info;
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use serde_json::Value;
use std::f64::consts::FRAC_PI_2;
use std::fs;

const DEFAULT_CONFIG: &str = "config/bspline_trajectory.json";
const DT: f64 = 0.1;

fn robots() -> Robots {
    let tool = Isometry3::from_parts(Translation3::new(0.3, 0.0, 0.6), UnitQuaternion::identity());
    let lid = Isometry3::from_parts(
        Translation3::new(0.8, 0.2, 0.2),
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
    );
    let mut robots = Robots::new(vec![Robot::new("arm").with_frame("tool", tool)]);
    robots.push(Robot::new("box").with_frame("lid", lid));
    robots
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let text = fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
    let config: Value = serde_json::from_str(&text).with_context(|| format!("parsing {}", path))?;

    let robots = robots();
    let registry = TaskRegistry::default();
    info!("Known task types: {:?}", registry.types());

    let mut controller = TrajectoryController::new();
    let name = controller
        .load(&registry, &config, &robots)
        .with_context(|| format!("loading task from {}", path))?;

    let surface = controller.control_surface(&name);
    let mut tick = 0usize;
    while controller.task(&name).map(|t| t.state()) != Some(TaskState::Completed) {
        // Nudge the first waypoint half way through, as a UI drag would
        if tick == 20 {
            surface.move_waypoint(0, Vector3::new(0.6, 0.4, 0.7));
        }
        controller.run_tick(DT);
        tick += 1;

        if let Some(task) = controller.task_as::<BSplineTrajectoryTask>(&name) {
            let reference = task.reference();
            info!(
                "t={:.1} p=({:.3}, {:.3}, {:.3}) |v|={:.3} |w|={:.3}",
                task.current_time(),
                reference.pose.translation.x,
                reference.pose.translation.y,
                reference.pose.translation.z,
                reference.linear_velocity.norm(),
                reference.angular_velocity.norm(),
            );
        }
    }

    let gui = controller.gui();
    info!("{} gui elements after {} ticks", gui.entries().len(), tick);
    Ok(())
}
