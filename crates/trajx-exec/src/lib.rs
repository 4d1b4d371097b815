//! 实时轨迹执行引擎
//!
//! 接受非实时调用方提交的时间参数化运动目标，在固定周期控制循环
//! 上确定性执行，按关节驱动异构执行后端（位置/速度/力矩），并向
//! 调用方回报进度与结果。
//!
//! # 架构：两个时序域
//!
//! - **硬实时域**（如 1 kHz）：[`TrajectoryExecutor::update`]——
//!   采样/指令/报告，绝不阻塞、绝不堆分配、绝不持有非实时侧可能
//!   长期占用的锁；
//! - **非实时域**（几十 Hz）：[`GoalLifecycleManager`]——
//!   接受/取消目标、校验、结果发布等全部无界延迟工作。
//!
//! 两域之间唯一的共享可变状态是单槽交接盒 [`ContextBox`]
//! （ArcSwap 无锁读取）；反馈经有界通道 `try_send` 跨域，满即丢。
//!
//! # 使用方式
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::{Duration, Instant};
//! use trajx_exec::{ControllerConfig, TrajectoryController};
//! use trajx_hal::MockMechanism;
//! use trajx_model::{SplineTrajectory, TrajectoryPoint};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ControllerConfig::from_toml_str(r#"
//!     [[joints]]
//!     name = "shoulder"
//!     mode = "position"
//!
//!     [[joints]]
//!     name = "elbow"
//!     mode = "position"
//! "#)?;
//!
//! let hardware = Box::new(MockMechanism::new(2));
//! let (mut executor, mut manager, events) =
//!     TrajectoryController::from_config(&config, hardware)?;
//!
//! executor.start(Instant::now());
//!
//! let trajectory = Arc::new(SplineTrajectory::from_points(vec![
//!     TrajectoryPoint::at(Duration::ZERO, [0.0, 0.0].as_slice()),
//!     TrajectoryPoint::at(Duration::from_secs(1), [1.0, 1.0].as_slice()),
//! ])?);
//! let goal = manager.submit(trajectory)?;
//!
//! // 实时线程：executor.update(now, period)（固定周期）
//! // 非实时线程：manager.tick(now)（反馈节拍），消费 events
//! # let _ = (goal, events);
//! # Ok(())
//! # }
//! ```

mod adapter;
mod config;
mod context;
mod controller;
mod error;
mod executor;
mod goal;
mod manager;
mod state_updater;

pub use adapter::{DesiredJoint, JointAdapter, PidGains};
pub use config::{ControlMode, ControllerConfig, JointConfig};
pub use context::{ContextBox, Outcome, TrajectoryContext};
pub use controller::TrajectoryController;
pub use error::{ExecError, ValidationError};
pub use executor::{CycleReport, Diagnostics, TrajectoryExecutor};
pub use goal::{GoalEvent, GoalHandle, GoalId, GoalState};
pub use manager::GoalLifecycleManager;
pub use state_updater::{KinematicState, SkeletonStateUpdater};
