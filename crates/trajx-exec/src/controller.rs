//! 控制器装配
//!
//! 把配置 + 硬件装配成一对半边：实时侧的 [`TrajectoryExecutor`]
//! 与非实时侧的 [`GoalLifecycleManager`]，各自放到宿主的对应线程
//! 上运行。引擎自身不建线程、不做调度——宿主通过生命周期钩子
//! `init（即本装配）/ start / update / stop` 驱动。

use std::sync::Arc;

use crossbeam_channel::{Receiver, bounded, unbounded};
use tracing::info;
use trajx_hal::JointInterface;

use crate::adapter::JointAdapter;
use crate::config::ControllerConfig;
use crate::context::ContextBox;
use crate::error::ExecError;
use crate::executor::{CycleReport, TrajectoryExecutor};
use crate::goal::GoalEvent;
use crate::manager::GoalLifecycleManager;

/// 周期报告通道容量
///
/// 实时侧 `try_send`、满即丢（只丢反馈不丢结果），非实时 tick
/// 每次排空，容量只需覆盖两个 tick 之间的峰值。
const REPORT_CAPACITY: usize = 8;

/// 轨迹控制器装配入口
pub struct TrajectoryController;

impl TrajectoryController {
    /// 由配置与硬件装配引擎（生命周期钩子中的 `init`）
    ///
    /// # 返回
    ///
    /// `(executor, manager, events)`：
    /// - `executor` 移交给实时线程，按固定周期调用 `update`；
    /// - `manager` 留在非实时线程，处理 submit/cancel 并按反馈
    ///   频率调用 `tick`；
    /// - `events` 是调用方的结果/反馈接收端。
    pub fn from_config(
        config: &ControllerConfig,
        hardware: Box<dyn JointInterface>,
    ) -> Result<(TrajectoryExecutor, GoalLifecycleManager, Receiver<GoalEvent>), ExecError> {
        config.validate()?;

        let expected = config.joints.len();
        let actual = hardware.dof();
        if actual != expected {
            return Err(ExecError::HardwareDofMismatch { expected, actual });
        }

        let model = Arc::new(config.build_model());
        let adapters: Vec<JointAdapter> =
            config.joints.iter().map(JointAdapter::from_config).collect();

        let ctx_box = Arc::new(ContextBox::new());
        let (report_tx, report_rx) = bounded::<CycleReport>(REPORT_CAPACITY);
        let (event_tx, event_rx) = unbounded::<GoalEvent>();

        let executor = TrajectoryExecutor::new(
            Arc::clone(&model),
            hardware,
            adapters,
            Arc::clone(&ctx_box),
            report_tx,
        );
        let manager = GoalLifecycleManager::new(
            model,
            ctx_box,
            report_rx,
            event_tx,
            config.goal_timeout(),
        );

        info!(
            joints = expected,
            feedback_rate_hz = config.feedback_rate_hz,
            "trajectory controller assembled"
        );
        Ok((executor, manager, event_rx))
    }
}
