//! 端到端执行场景测试
//!
//! 不建实时线程：用确定性的虚拟时钟（`t0 + k * period`）手动驱动
//! `update` / `tick`，mock 机构代替硬件。

use std::sync::Arc;
use std::time::{Duration, Instant};

use trajx_exec::{
    ControlMode, ControllerConfig, GoalEvent, GoalState, JointConfig, TrajectoryController,
};
use trajx_hal::{JointCommand, MockMechanism, MockMechanismHandle};
use trajx_model::{JointLimits, SplineTrajectory, Trajectory, TrajectoryPoint};

const PERIOD: Duration = Duration::from_millis(10);

fn position_config(limits: JointLimits) -> ControllerConfig {
    ControllerConfig {
        joints: vec![
            JointConfig {
                name: "j1".into(),
                mode: ControlMode::Position,
                gains: Default::default(),
                limits,
            },
            JointConfig {
                name: "j2".into(),
                mode: ControlMode::Position,
                gains: Default::default(),
                limits,
            },
        ],
        feedback_rate_hz: 20.0,
        goal_timeout_s: None,
    }
}

fn line_trajectory(to: f64, duration: Duration) -> Arc<dyn Trajectory> {
    Arc::new(
        SplineTrajectory::from_points(vec![
            TrajectoryPoint::at(Duration::ZERO, [0.0, 0.0].as_slice()),
            TrajectoryPoint::at(duration, [to, to].as_slice()),
        ])
        .unwrap(),
    )
}

struct Rig {
    executor: trajx_exec::TrajectoryExecutor,
    manager: trajx_exec::GoalLifecycleManager,
    events: crossbeam_channel::Receiver<GoalEvent>,
    mechanism: MockMechanismHandle,
    t0: Instant,
}

fn rig(config: ControllerConfig) -> Rig {
    let hardware = MockMechanism::new(config.joints.len());
    let mechanism = hardware.handle();
    let (mut executor, manager, events) =
        TrajectoryController::from_config(&config, Box::new(hardware)).unwrap();
    let t0 = Instant::now();
    executor.start(t0);
    Rig {
        executor,
        manager,
        events,
        mechanism,
        t0,
    }
}

impl Rig {
    /// 推进一个控制周期（第 k 拍）+ 一次管理器 tick
    fn cycle(&mut self, k: u32) -> Instant {
        let now = self.t0 + PERIOD * k;
        self.executor.update(now, PERIOD);
        self.mechanism.step(PERIOD.as_secs_f64());
        self.manager.tick(now);
        now
    }

    fn results(&self) -> Vec<(trajx_exec::GoalId, GoalState)> {
        self.events
            .try_iter()
            .filter_map(|e| match e {
                GoalEvent::Result { goal, state } => Some((goal, state)),
                _ => None,
            })
            .collect()
    }
}

#[test]
fn two_joint_position_trajectory_succeeds_monotonically() {
    let mut rig = rig(position_config(JointLimits::default()));
    let goal = rig
        .manager
        .submit_at(line_trajectory(1.0, Duration::from_secs(1)), rig.t0)
        .unwrap();

    let mut last = [f64::NEG_INFINITY; 2];
    for k in 1..=99 {
        rig.cycle(k);
        // 1 秒到点之前绝不提前成功
        assert_eq!(goal.state(), GoalState::Active, "succeeded early at cycle {k}");
        for joint in 0..2 {
            let pos = rig.mechanism.position(joint);
            assert!(
                pos >= last[joint] - 1e-9,
                "joint {joint} regressed at cycle {k}: {pos} < {}",
                last[joint]
            );
            last[joint] = pos;
        }
    }

    // 1 秒整拍：钳位采样到终点并标记成功
    rig.cycle(100);
    assert_eq!(goal.state(), GoalState::Succeeded);
    assert!((rig.mechanism.position(0) - 1.0).abs() < 1e-6);
    assert!((rig.mechanism.position(1) - 1.0).abs() < 1e-6);
    assert!(rig
        .results()
        .contains(&(goal.id(), GoalState::Succeeded)));
}

#[test]
fn preemption_cancels_a_then_b_succeeds() {
    let mut rig = rig(position_config(JointLimits::default()));
    let a = rig
        .manager
        .submit_at(line_trajectory(0.5, Duration::from_secs(1)), rig.t0)
        .unwrap();

    for k in 1..=30 {
        rig.cycle(k);
    }
    assert_eq!(a.state(), GoalState::Active);

    // 未完成时提交 B：A 被隐式抢占
    let t_b = rig.t0 + PERIOD * 30;
    let b = rig
        .manager
        .submit_at(line_trajectory(1.0, Duration::from_secs(1)), t_b)
        .unwrap();
    assert_eq!(a.state(), GoalState::Canceled);

    for k in 31..=131 {
        rig.cycle(k);
    }
    assert_eq!(b.state(), GoalState::Succeeded);

    let results = rig.results();
    assert!(results.contains(&(a.id(), GoalState::Canceled)));
    assert!(results.contains(&(b.id(), GoalState::Succeeded)));
}

#[test]
fn zero_duration_trajectory_completes_on_first_observed_cycle() {
    let mut rig = rig(position_config(JointLimits::default()));
    let point = Arc::new(
        SplineTrajectory::from_points(vec![TrajectoryPoint::at(
            Duration::ZERO,
            [0.3, -0.3].as_slice(),
        )])
        .unwrap(),
    ) as Arc<dyn Trajectory>;
    let goal = rig.manager.submit_at(point, rig.t0).unwrap();

    // 首个观察周期即完成
    rig.cycle(1);
    assert_eq!(goal.state(), GoalState::Succeeded);
    assert!((rig.mechanism.position(0) - 0.3).abs() < 1e-9);
}

#[test]
fn limit_violation_aborts_and_holds_last_valid_command() {
    let limits = JointLimits {
        min_position: -1.0,
        max_position: 1.0,
        ..JointLimits::default()
    };
    let mut rig = rig(position_config(limits));
    let goal = rig
        .manager
        .submit_at(line_trajectory(0.5, Duration::from_secs(1)), rig.t0)
        .unwrap();

    for k in 1..=40 {
        rig.cycle(k);
    }
    let last_valid = rig.mechanism.position(0);
    assert_eq!(goal.state(), GoalState::Active);

    // 外力把关节推出限位
    rig.mechanism.set_position(0, 2.0);
    rig.cycle(41);
    assert_eq!(goal.state(), GoalState::Aborted);

    // 之后的周期保持在违规前最后一次有效指令处
    for k in 42..=60 {
        rig.cycle(k);
        let cmd = rig.mechanism.last_command(0).unwrap();
        match cmd {
            JointCommand::Position(p) => {
                assert!(
                    (p - last_valid).abs() < 0.02,
                    "hold drifted from last valid command: {p} vs {last_valid}"
                );
            }
            other => panic!("expected position hold, got {other:?}"),
        }
    }
    assert!(rig.results().contains(&(goal.id(), GoalState::Aborted)));
}

#[test]
fn cancel_active_goal_holds_within_one_cycle() {
    let mut rig = rig(position_config(JointLimits::default()));
    let goal = rig
        .manager
        .submit_at(line_trajectory(1.0, Duration::from_secs(1)), rig.t0)
        .unwrap();

    for k in 1..=20 {
        rig.cycle(k);
    }
    rig.manager.cancel(&goal);
    assert_eq!(goal.state(), GoalState::Canceled);

    // 取消在下一周期边界生效：此后指令不再推进
    rig.cycle(21);
    let held = rig.mechanism.position(0);
    for k in 22..=40 {
        rig.cycle(k);
        assert!((rig.mechanism.position(0) - held).abs() < 1e-9);
    }
}

#[test]
fn stale_sensor_reads_are_non_fatal() {
    let mut rig = rig(position_config(JointLimits::default()));
    let goal = rig
        .manager
        .submit_at(line_trajectory(1.0, Duration::from_secs(1)), rig.t0)
        .unwrap();

    for k in 1..=30 {
        rig.cycle(k);
    }
    // 传感失效 20 拍：执行照常推进
    rig.mechanism.set_fail_reads(true);
    for k in 31..=50 {
        rig.cycle(k);
    }
    rig.mechanism.set_fail_reads(false);
    for k in 51..=110 {
        rig.cycle(k);
    }

    assert_eq!(goal.state(), GoalState::Succeeded);
    let diag = rig.executor.diagnostics();
    assert!(diag.stale_reads >= 20, "stale reads not counted: {diag:?}");
    assert_eq!(diag.limit_faults, 0);
}

#[test]
fn feedback_events_track_progress() {
    let mut rig = rig(position_config(JointLimits::default()));
    let goal = rig
        .manager
        .submit_at(line_trajectory(1.0, Duration::from_secs(1)), rig.t0)
        .unwrap();

    for k in 1..=50 {
        rig.cycle(k);
    }
    let feedback: Vec<_> = rig
        .events
        .try_iter()
        .filter_map(|e| match e {
            GoalEvent::Feedback {
                goal: g,
                desired_positions,
                actual_positions,
            } if g == goal.id() => Some((desired_positions, actual_positions)),
            _ => None,
        })
        .collect();

    assert!(!feedback.is_empty(), "no feedback published");
    let (desired, actual) = feedback.last().unwrap();
    assert_eq!(desired.len(), 2);
    // 位置模式 + 理想伺服：实测最多滞后期望一拍
    assert!((desired[0] - actual[0]).abs() < 0.05);
    assert!(desired[0] > 0.2, "expected mid-trajectory progress");
}
