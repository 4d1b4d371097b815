//! 双关节位置模式演示
//!
//! 实时线程 250 Hz 驱动执行循环（spin_sleep 定拍），主线程扮演
//! 非实时域：提交一条 1.5 秒轨迹，按 20 Hz tick 管理器并打印
//! 反馈/结果事件。
//!
//! ```bash
//! RUST_LOG=info cargo run --example two_joint_demo
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::info;
use trajx_exec::{ControllerConfig, GoalEvent, TrajectoryController};
use trajx_hal::MockMechanism;
use trajx_model::{SplineTrajectory, TrajectoryPoint};

const CONTROL_PERIOD: Duration = Duration::from_millis(4);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ControllerConfig::from_toml_str(
        r#"
        feedback_rate_hz = 20.0

        [[joints]]
        name = "shoulder"
        mode = "position"
        limits = { min_position = -3.14, max_position = 3.14 }

        [[joints]]
        name = "elbow"
        mode = "position"
        limits = { min_position = -3.14, max_position = 3.14 }
        "#,
    )?;

    let hardware = MockMechanism::new(2);
    let mechanism = hardware.handle();
    let (mut executor, mut manager, events) =
        TrajectoryController::from_config(&config, Box::new(hardware))?;

    // 实时域：固定周期执行循环
    let running = Arc::new(AtomicBool::new(true));
    let rt_running = Arc::clone(&running);
    let rt_thread = std::thread::spawn(move || {
        let sleeper = spin_sleep::SpinSleeper::default();
        executor.start(Instant::now());
        let mut next = Instant::now();
        while rt_running.load(Ordering::Relaxed) {
            executor.update(Instant::now(), CONTROL_PERIOD);
            mechanism.step(CONTROL_PERIOD.as_secs_f64());
            next += CONTROL_PERIOD;
            sleeper.sleep(next.saturating_duration_since(Instant::now()));
        }
        executor.stop(Instant::now());
        executor.diagnostics()
    });

    // 非实时域：提交目标并消费事件
    let trajectory = Arc::new(SplineTrajectory::from_points(vec![
        TrajectoryPoint::at(Duration::ZERO, [0.0, 0.0].as_slice()),
        TrajectoryPoint::at(Duration::from_millis(750), [0.8, -0.4].as_slice()),
        TrajectoryPoint::at(Duration::from_millis(1500), [1.2, 0.6].as_slice()),
    ])?);
    let goal = manager.submit(trajectory)?;
    info!(goal = %goal.id(), "goal submitted");

    let tick_period = config.feedback_period();
    loop {
        std::thread::sleep(tick_period);
        manager.tick(Instant::now());

        let mut done = false;
        for event in events.try_iter() {
            match event {
                GoalEvent::Feedback {
                    goal,
                    desired_positions,
                    actual_positions,
                } => {
                    info!(
                        %goal,
                        desired = ?desired_positions.as_slice(),
                        actual = ?actual_positions.as_slice(),
                        "progress"
                    );
                }
                GoalEvent::Result { goal, state } => {
                    info!(%goal, ?state, "goal finished");
                    done = true;
                }
            }
        }
        if done {
            break;
        }
    }

    running.store(false, Ordering::Relaxed);
    let diag = rt_thread.join().expect("realtime thread panicked");
    info!(?diag, "executor diagnostics");
    Ok(())
}
