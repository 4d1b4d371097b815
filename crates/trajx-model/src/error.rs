//! 模型层错误类型定义

use thiserror::Error;

/// 轨迹构建/查询错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrajectoryError {
    /// 空轨迹（至少需要一个路点）
    #[error("Trajectory has no points")]
    Empty,

    /// 路点时间非单调递增
    #[error("Non-monotonic time at point {index}: {time_s} s <= previous {prev_s} s")]
    NonMonotonicTime {
        /// 出错路点索引
        index: usize,
        /// 该路点的 time_from_start（秒）
        time_s: f64,
        /// 前一路点的 time_from_start（秒）
        prev_s: f64,
    },

    /// 路点自由度不一致
    #[error("Dof mismatch at point {index}: expected {expected}, got {actual}")]
    DofMismatch {
        /// 出错路点索引
        index: usize,
        /// 期望自由度（由首个路点确定）
        expected: usize,
        /// 实际自由度
        actual: usize,
    },

    /// 路点包含非有限值（NaN / Inf）
    #[error("Non-finite value at point {index}, joint {joint}")]
    NonFinite {
        /// 出错路点索引
        index: usize,
        /// 出错关节索引
        joint: usize,
    },
}
