//! 硬件层错误类型定义

use thiserror::Error;

/// 硬件接口错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HalError {
    /// 关节索引越界
    #[error("No such joint: {joint}")]
    NoSuchJoint {
        /// 越界的关节索引
        joint: usize,
    },

    /// 本周期传感读取失败（上层按陈旧快照继续）
    #[error("Sensor read failed on joint {joint}")]
    ReadFailed {
        /// 出错关节索引
        joint: usize,
    },

    /// 指令写入被硬件拒绝
    #[error("Command write rejected on joint {joint}")]
    WriteRejected {
        /// 出错关节索引
        joint: usize,
    },
}
