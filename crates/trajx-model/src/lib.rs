//! 模型层模块
//!
//! 本模块提供 trajx 引擎的关节空间基础类型，包括：
//! - 关节向量类型（栈上内联，实时路径零堆分配）
//! - 轨迹表示与按时间采样（钳位语义，不外推）
//! - 机构模型（关节顺序、限位查询）
//!
//! # 使用场景
//!
//! 被 `trajx-exec` 的执行循环和目标生命周期管理器共同消费。
//! 轨迹一旦交给执行循环即不可变，可跨线程共享（`Send + Sync`）。

mod error;
mod model;
mod trajectory;
mod types;

pub use error::TrajectoryError;
pub use model::{JointLimits, JointSpec, MechanismModel};
pub use trajectory::{SplineTrajectory, Trajectory, TrajectoryPoint, TrajectorySample};
pub use types::{JointVec, MAX_JOINTS, joint_vec_zeros};
