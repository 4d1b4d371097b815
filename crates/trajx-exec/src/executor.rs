//! 轨迹执行循环
//!
//! 固定周期入口 [`TrajectoryExecutor::update`]，由外部实时调度器
//! 驱动（引擎自身不睡眠、不建线程）。每次调用：
//!
//! 1. 刷新运动学快照（失败非致命，陈旧复用）；
//! 2. 无阻塞读交接盒；上下文身份变化 ⇒ 重置全部适配器，
//!    经过时间锚定在上下文的 `start_time`（目标接受时刻）；
//! 3. 无活动上下文 / 已有终态标记 ⇒ 按模式输出保持姿态；
//! 4. 经过时间钳位到轨迹时长；到达时长 ⇒ 标记 Succeeded
//!    （零时长轨迹在首个观察周期即完成）；
//! 5. 采样轨迹，按关节顺序调用适配器并写指令；实测位置越限 ⇒
//!    标记 Aborted，本周期继续下发最后有效值，之后保持姿态；
//! 6. 经有界通道 `try_send` 投递周期报告（绝不做阻塞 I/O）。
//!
//! # 实时契约
//!
//! `update` 绝不返回错误、绝不堆分配、绝不持有非实时侧可能长期
//! 占用的锁；所有故障退化为保持姿态，经终态标记 / 诊断计数异步
//! 浮出。

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Sender, TrySendError};
use tracing::{trace, warn};
use trajx_hal::{JointInterface, JointMeasurement};
use trajx_model::{JointVec, MAX_JOINTS, MechanismModel, TrajectorySample, joint_vec_zeros};

use crate::adapter::{DesiredJoint, JointAdapter};
use crate::context::{ContextBox, Outcome, TrajectoryContext};
use crate::goal::GoalId;
use crate::state_updater::{KinematicState, SkeletonStateUpdater};

/// 实时侧 → 非实时侧的周期报告
///
/// `Copy` 且内含定长数组：跨通道投递不触碰堆。投递失败（通道满）
/// 只丢反馈，不丢结果——结果终结走管理器自持的上下文引用。
#[derive(Debug, Clone, Copy)]
pub struct CycleReport {
    /// 所属目标
    pub goal: GoalId,
    /// 有效关节数（数组前 `dof` 个元素有效）
    pub dof: usize,
    /// 本拍期望位置
    pub desired: [f64; MAX_JOINTS],
    /// 本拍实测位置
    pub actual: [f64; MAX_JOINTS],
    /// 本拍的终态标记快照
    pub outcome: Outcome,
}

/// 执行循环诊断计数（O(1) 更新，零分配）
#[derive(Debug, Clone, Copy, Default)]
pub struct Diagnostics {
    /// 已执行周期数
    pub cycles: u64,
    /// 陈旧传感读取次数
    pub stale_reads: u64,
    /// 因通道满而丢弃的周期报告数
    pub dropped_reports: u64,
    /// 限位/写入故障次数
    pub limit_faults: u64,
}

/// 轨迹执行循环
///
/// 实时线程独占；与非实时侧仅通过交接盒和报告通道交互。
pub struct TrajectoryExecutor {
    model: Arc<MechanismModel>,
    hw: Box<dyn JointInterface>,
    adapters: Vec<JointAdapter>,
    updater: SkeletonStateUpdater,
    kin: KinematicState,
    sample: TrajectorySample,
    /// 保持姿态（每次正常指令周期更新为本拍期望位置）
    hold_positions: JointVec,
    ctx_box: Arc<ContextBox>,
    /// 上一周期观察到的上下文（身份比较用）
    active: Option<Arc<TrajectoryContext>>,
    reports: Sender<CycleReport>,
    diag: Diagnostics,
    running: bool,
}

impl TrajectoryExecutor {
    pub(crate) fn new(
        model: Arc<MechanismModel>,
        hw: Box<dyn JointInterface>,
        adapters: Vec<JointAdapter>,
        ctx_box: Arc<ContextBox>,
        reports: Sender<CycleReport>,
    ) -> Self {
        let dof = model.dof();
        TrajectoryExecutor {
            model,
            hw,
            adapters,
            updater: SkeletonStateUpdater::new(dof),
            kin: KinematicState::zeroed(dof),
            sample: TrajectorySample::zeroed(dof),
            hold_positions: joint_vec_zeros(dof),
            ctx_box,
            active: None,
            reports,
            diag: Diagnostics::default(),
            running: false,
        }
    }

    /// 启动：以当前实测姿态作为保持姿态
    ///
    /// 在首次 `update` 之前由宿主调用（非实时线程亦可）。
    pub fn start(&mut self, _now: Instant) {
        self.updater.refresh(self.hw.as_mut(), &mut self.kin);
        self.hold_positions.copy_from_slice(&self.kin.positions);
        self.running = true;
        trace!("trajectory executor started");
    }

    /// 停止：清空交接盒，未完成的上下文标记为 Aborted
    ///
    /// 管理器在下一次 tick 终结对应目标。
    pub fn stop(&mut self, _now: Instant) {
        if let Some(ctx) = self.ctx_box.take() {
            ctx.mark_aborted();
        }
        self.active = None;
        self.running = false;
        trace!("trajectory executor stopped");
    }

    /// 固定周期实时入口
    pub fn update(&mut self, now: Instant, period: Duration) {
        if !self.running {
            return;
        }
        self.diag.cycles += 1;

        // 1. 刷新快照（陈旧容忍；计数在 updater 内累积）
        let _ = self.updater.refresh(self.hw.as_mut(), &mut self.kin);

        // 2. 无阻塞读交接盒；身份变化 ⇒ 重置适配器
        let ctx = self.ctx_box.load();
        let changed = match (&ctx, &self.active) {
            (Some(a), Some(b)) => !Arc::ptr_eq(a, b),
            (None, None) => false,
            _ => true,
        };
        if changed {
            for adapter in &mut self.adapters {
                adapter.reset();
            }
            self.active = ctx.clone();
            trace!(goal = ?ctx.as_ref().map(|c| c.goal.id()), "active context changed");
        }

        // 3. 无上下文 / 已终态 ⇒ 保持姿态
        let Some(ctx) = ctx else {
            self.command_hold();
            return;
        };
        if ctx.outcome().is_terminal() {
            self.command_hold();
            self.send_report(&ctx);
            return;
        }

        // 4. 经过时间：锚定在目标接受时刻，钳位到轨迹时长
        let elapsed = now.saturating_duration_since(ctx.start_time);
        let duration = ctx.trajectory.duration();
        let completing = elapsed >= duration;

        // 5. 采样并逐关节执行
        ctx.trajectory.sample_into(elapsed.min(duration), &mut self.sample);

        let mut fault = false;
        for joint in 0..self.model.dof() {
            if !self.model.check_position(joint, self.kin.positions[joint]) {
                self.diag.limit_faults += 1;
                warn!(
                    joint,
                    position = self.kin.positions[joint],
                    "measured position left kinematic limits"
                );
                fault = true;
            }
        }
        if fault {
            // 本周期继续下发最后有效值（= 保持姿态），之后一直保持
            ctx.mark_aborted();
            self.command_hold();
            self.send_report(&ctx);
            return;
        }

        for joint in 0..self.model.dof() {
            let desired = DesiredJoint {
                position: self.sample.positions[joint],
                velocity: self.sample.velocities[joint],
                acceleration: self.sample.accelerations[joint],
                effort: 0.0,
            };
            let measured = JointMeasurement {
                position: self.kin.positions[joint],
                velocity: self.kin.velocities[joint],
                effort: self.kin.efforts[joint],
            };
            let command =
                self.adapters[joint].compute(desired, measured, period.as_secs_f64());
            if self.hw.write(joint, command).is_err() {
                self.diag.limit_faults += 1;
                warn!(joint, "command write rejected");
                fault = true;
            } else {
                // 本拍期望位置成为新的保持姿态
                self.hold_positions[joint] = self.sample.positions[joint];
            }
        }

        if fault {
            ctx.mark_aborted();
        } else if completing {
            ctx.mark_succeeded();
        }

        // 6. 投递周期报告（try_send，绝不阻塞）
        self.send_report(&ctx);
    }

    /// 按模式输出保持姿态
    fn command_hold(&mut self) {
        for joint in 0..self.model.dof() {
            let command = self.adapters[joint].hold_command(self.hold_positions[joint]);
            // 保持路径上的写失败只计数，不再有可中止的目标
            if self.hw.write(joint, command).is_err() {
                self.diag.limit_faults += 1;
            }
        }
    }

    fn send_report(&mut self, ctx: &TrajectoryContext) {
        // 超出内联容量的关节不进报告（反馈截断，结果不受影响）
        let dof = self.model.dof().min(MAX_JOINTS);
        let mut report = CycleReport {
            goal: ctx.goal.id(),
            dof,
            desired: [0.0; MAX_JOINTS],
            actual: [0.0; MAX_JOINTS],
            outcome: ctx.outcome(),
        };
        report.desired[..dof].copy_from_slice(&self.sample.positions[..dof]);
        report.actual[..dof].copy_from_slice(&self.kin.positions[..dof]);

        if let Err(TrySendError::Full(_)) = self.reports.try_send(report) {
            self.diag.dropped_reports += 1;
        }
    }

    /// 诊断计数快照
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            stale_reads: self.updater.stale_reads(),
            ..self.diag
        }
    }
}
