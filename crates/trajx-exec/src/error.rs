//! 执行层错误类型定义
//!
//! 错误分两类传播：
//! - **非实时侧**（校验、配置、传输）：同步返回给调用方；
//! - **实时侧**：绝不同步抛出——一律退化为保持姿态，并通过
//!   上下文的终态标记 / 诊断计数异步浮出。

use thiserror::Error;
use trajx_hal::HalError;
use trajx_model::TrajectoryError;

/// 目标校验错误（接受前拒绝，不触碰实时侧）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// 轨迹自由度与受控关节数不符
    #[error("Trajectory dof {actual} does not match controlled joints {expected}")]
    DofMismatch {
        /// 受控关节数
        expected: usize,
        /// 轨迹自由度
        actual: usize,
    },

    /// 轨迹本身不合法
    #[error("Malformed trajectory: {0}")]
    Trajectory(#[from] TrajectoryError),

    /// 轨迹端点超出关节位置限位
    #[error("Trajectory sample leaves position limits on joint {joint}: {value}")]
    PositionOutOfLimits {
        /// 出错关节索引
        joint: usize,
        /// 越限的采样位置（rad）
        value: f64,
    },

    /// 轨迹采样包含非有限值
    #[error("Trajectory sample is not finite on joint {joint}")]
    NonFiniteSample {
        /// 出错关节索引
        joint: usize,
    },
}

/// 引擎装配/配置错误
#[derive(Error, Debug)]
pub enum ExecError {
    /// 配置不合法
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// TOML 解析失败
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// 硬件接口错误（装配阶段）
    #[error("Hardware error: {0}")]
    Hal(#[from] HalError),

    /// 硬件关节数与配置不符
    #[error("Hardware reports {actual} joints, configuration expects {expected}")]
    HardwareDofMismatch {
        /// 配置关节数
        expected: usize,
        /// 硬件关节数
        actual: usize,
    },
}
