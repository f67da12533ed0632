use anyhow::{Context, Result};
use bspline_trajectory::common::{Robot, Robots};
use bspline_trajectory::gui::ControlSurface;
use bspline_trajectory::loader::TaskRegistry;
use bspline_trajectory::task::TaskState;
use bspline_trajectory::{BSplineTrajectoryTask, TrajectoryController};
use log::{debug, info, warn};
use nalgebra::{Isometry3, Vector3};
use serde_json::json;
use std::time::Duration;
use tokio::time;

const CONTROL_PERIOD: Duration = Duration::from_millis(20);

/// Simulated operator: edits the trajectory while it runs
async fn operator(surface: ControlSurface) {
    time::sleep(Duration::from_millis(500)).await;
    info!("operator: adding a waypoint to {}", surface.task());
    surface.add_waypoint(Vector3::new(0.5, 0.3, 0.8));

    time::sleep(Duration::from_millis(500)).await;
    info!("operator: pausing");
    surface.pause(true);

    time::sleep(Duration::from_millis(300)).await;
    info!("operator: moving target and resuming");
    surface.set_target(Isometry3::translation(0.9, -0.1, 0.5));
    if !surface.pause(false) {
        warn!("operator: control loop is gone");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let robots = Robots::new(vec![
        Robot::new("arm").with_frame("tool", Isometry3::translation(0.3, 0.0, 0.6))
    ]);
    let config = json!({
        "type": "bspline_trajectory",
        "frame": "tool",
        "duration": 3.0,
        "target": { "translation": [0.8, 0.2, 0.4], "rotation": [0.0, 0.0, 1.0] }
    });

    let mut controller = TrajectoryController::new();
    let name = controller
        .load(&TaskRegistry::default(), &config, &robots)
        .context("loading trajectory task")?;

    let ui = tokio::spawn(operator(controller.control_surface(&name)));

    let dt = CONTROL_PERIOD.as_secs_f64();
    let mut interval = time::interval(CONTROL_PERIOD);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                controller.run_tick(dt);
                if let Some(task) = controller.task_as::<BSplineTrajectoryTask>(&name) {
                    debug!("t={:.2} p={:?}", task.current_time(), task.reference().position());
                    if task.state() == TaskState::Completed {
                        info!("{} reached {:?}", name, task.reference().position());
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping control loop");
                break;
            }
        }
    }

    ui.abort();
    Ok(())
}
