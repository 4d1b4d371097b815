//! 目标生命周期管理器
//!
//! action 协议的非实时半边：接受/校验/取消目标，以及所有 I/O 级
//! 或无界延迟的工作（校验、日志、结果发布）。与实时侧只通过交接
//! 盒（写入）和周期报告通道（读取）交互。
//!
//! # 每目标状态机
//!
//! `Received → {Accepted → {Succeeded | Aborted | Canceled}} | Rejected`
//!
//! 执行循环只*标记*上下文终态；观察标记、发布结果、驱动目标状态
//! 机全部发生在 [`GoalLifecycleManager::tick`]（慢节拍，非实时）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, warn};
use trajx_model::{MechanismModel, Trajectory, TrajectorySample};

use crate::context::{ContextBox, Outcome, TrajectoryContext};
use crate::error::ValidationError;
use crate::executor::CycleReport;
use crate::goal::{GoalEvent, GoalHandle, GoalId, GoalState};

/// 目标生命周期管理器
///
/// 单线程使用（非实时线程）；所有方法都可能做无界延迟工作，
/// 绝不在实时线程上调用。
pub struct GoalLifecycleManager {
    model: Arc<MechanismModel>,
    ctx_box: Arc<ContextBox>,
    reports: Receiver<CycleReport>,
    events: Sender<GoalEvent>,
    /// 管理器自持的活动上下文引用（结果终结的权威来源，
    /// 不依赖可能丢失的周期报告）
    active: Option<Arc<TrajectoryContext>>,
    next_goal: u64,
    goal_timeout: Option<Duration>,
    /// 校验用采样缓冲（非实时，分配无妨，但复用避免反复建）
    scratch: TrajectorySample,
}

impl GoalLifecycleManager {
    pub(crate) fn new(
        model: Arc<MechanismModel>,
        ctx_box: Arc<ContextBox>,
        reports: Receiver<CycleReport>,
        events: Sender<GoalEvent>,
        goal_timeout: Option<Duration>,
    ) -> Self {
        let dof = model.dof();
        GoalLifecycleManager {
            model,
            ctx_box,
            reports,
            events,
            active: None,
            next_goal: 0,
            goal_timeout,
            scratch: TrajectorySample::zeroed(dof),
        }
    }

    /// 提交目标（轨迹零点锚定在当前时刻）
    pub fn submit(
        &mut self,
        trajectory: Arc<dyn Trajectory>,
    ) -> Result<GoalHandle, ValidationError> {
        self.submit_at(trajectory, Instant::now())
    }

    /// 提交目标，显式指定轨迹零点时刻
    ///
    /// 校验通过 ⇒ 新上下文原子替换交接盒内容（隐式抢占），被抢占
    /// 的目标转入 Canceled 并发布结果；校验失败 ⇒ 目标转入
    /// Rejected，发布结果并同步返回错误，实时侧不受任何影响。
    pub fn submit_at(
        &mut self,
        trajectory: Arc<dyn Trajectory>,
        now: Instant,
    ) -> Result<GoalHandle, ValidationError> {
        self.next_goal += 1;
        let handle = GoalHandle::new(GoalId(self.next_goal));

        if let Err(err) = self.validate(trajectory.as_ref()) {
            handle.set_state(GoalState::Rejected);
            warn!(goal = %handle.id(), error = %err, "goal rejected");
            let _ = self.events.send(GoalEvent::Result {
                goal: handle.id(),
                state: GoalState::Rejected,
            });
            return Err(err);
        }
        handle.set_state(GoalState::Active);

        let ctx = Arc::new(TrajectoryContext::new(now, trajectory, handle.clone()));
        let prev = self.active.replace(Arc::clone(&ctx));
        self.ctx_box.store(Some(ctx));
        info!(goal = %handle.id(), "goal accepted");

        // 被抢占的目标：若执行循环已抢先标记终态则按标记终结，
        // 否则按 Canceled 终结
        if let Some(prev) = prev {
            self.finalize(&prev, GoalState::Canceled);
        }
        Ok(handle)
    }

    /// 取消目标
    ///
    /// - 活动目标：清空交接盒（循环退化为保持姿态），转入 Canceled；
    /// - 非活动且未终结：仅转换状态，不触碰交接盒；
    /// - 已终结：无操作。
    pub fn cancel(&mut self, handle: &GoalHandle) {
        let is_active = self
            .active
            .as_ref()
            .is_some_and(|ctx| ctx.goal.id() == handle.id());

        if is_active {
            let ctx = self.active.take().expect("active checked above");
            self.ctx_box.take();
            self.finalize(&ctx, GoalState::Canceled);
        } else if handle.set_state(GoalState::Canceled) {
            info!(goal = %handle.id(), "inactive goal canceled");
            let _ = self.events.send(GoalEvent::Result {
                goal: handle.id(),
                state: GoalState::Canceled,
            });
        }
    }

    /// 非实时周期 tick：反馈发布 + 终态终结 + 目标超时
    ///
    /// 以配置的反馈频率（几十 Hz）调用。
    pub fn tick(&mut self, now: Instant) {
        // 反馈：排空报告通道，只发布最新一份
        let mut latest: Option<CycleReport> = None;
        while let Ok(report) = self.reports.try_recv() {
            latest = Some(report);
        }
        if let (Some(report), Some(active)) = (latest, &self.active) {
            if report.goal == active.goal.id() {
                let _ = self.events.send(GoalEvent::Feedback {
                    goal: report.goal,
                    desired_positions: report.desired[..report.dof].into(),
                    actual_positions: report.actual[..report.dof].into(),
                });
            }
        }

        // 目标超时：轨迹时长 + 宽限期之后仍无终态 ⇒ 主动标记中止
        if let (Some(timeout), Some(active)) = (self.goal_timeout, &self.active) {
            let deadline = active.start_time + active.trajectory.duration() + timeout;
            if now >= deadline && active.mark_aborted() {
                warn!(goal = %active.goal.id(), "goal timed out, aborting");
            }
        }

        // 终结：观察执行循环置位的终态标记，恰好发布一次结果
        if self
            .active
            .as_ref()
            .is_some_and(|ctx| ctx.outcome().is_terminal())
        {
            let ctx = self.active.take().expect("active checked above");
            // 终态后的上下文留在交接盒里：循环继续按它保持姿态，
            // 直到新目标或 stop
            self.finalize(&ctx, GoalState::Canceled);
        }
    }

    /// 将上下文对应的目标终结为其标记的终态；
    /// 标记仍为 Pending 时使用 `fallback`（取消/抢占路径）。
    fn finalize(&mut self, ctx: &TrajectoryContext, fallback: GoalState) {
        let state = match ctx.outcome() {
            Outcome::Succeeded => GoalState::Succeeded,
            Outcome::Aborted => GoalState::Aborted,
            Outcome::Pending => fallback,
        };
        if ctx.goal.set_state(state) {
            info!(goal = %ctx.goal.id(), ?state, "goal finalized");
            let _ = self.events.send(GoalEvent::Result {
                goal: ctx.goal.id(),
                state,
            });
        } else {
            debug!(goal = %ctx.goal.id(), "goal already finalized");
        }
    }

    /// 目标校验：自由度匹配、轨迹端点位于位置限位内且有限
    fn validate(&mut self, trajectory: &dyn Trajectory) -> Result<(), ValidationError> {
        let expected = self.model.dof();
        let actual = trajectory.dof();
        if actual != expected {
            return Err(ValidationError::DofMismatch { expected, actual });
        }

        self.scratch.reset(expected);
        for elapsed in [Duration::ZERO, trajectory.duration()] {
            trajectory.sample_into(elapsed, &mut self.scratch);
            for joint in 0..expected {
                let value = self.scratch.positions[joint];
                if !value.is_finite() {
                    return Err(ValidationError::NonFiniteSample { joint });
                }
                if !self.model.check_position(joint, value) {
                    return Err(ValidationError::PositionOutOfLimits { joint, value });
                }
            }
        }
        Ok(())
    }

    /// 当前活动目标句柄（若有）
    pub fn active_goal(&self) -> Option<GoalHandle> {
        self.active.as_ref().map(|ctx| ctx.goal.clone())
    }
}
