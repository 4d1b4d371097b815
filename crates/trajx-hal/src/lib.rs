//! 硬件抽象层模块
//!
//! 定义执行循环与底层执行/传感硬件之间的边界：
//! - 每关节每周期一对 `read` / `write` 调用
//! - 有界耗时、零堆分配（实现方的契约）
//! - 读失败非致命（上层复用上一拍快照并计数）
//!
//! 具体后端（CAN 总线、EtherCAT、仿真器等）由宿主提供；本 crate
//! 自带一个确定性的 [`MockMechanism`] 用于测试与示例。

mod error;
mod mock;

pub use error::HalError;
pub use mock::{MockMechanism, MockMechanismHandle};

/// 单关节测量值
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointMeasurement {
    /// 实测位置（rad）
    pub position: f64,
    /// 实测速度（rad/s）
    pub velocity: f64,
    /// 实测力矩（Nm）
    pub effort: f64,
}

/// 单关节执行指令
///
/// 变体与关节的控制模式一一对应；执行循环保证每周期每关节
/// 恰好写入一条指令。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JointCommand {
    /// 位置指令（rad）——硬件自带位置伺服
    Position(f64),
    /// 速度指令（rad/s）
    Velocity(f64),
    /// 力矩指令（Nm）
    Effort(f64),
}

impl JointCommand {
    /// 指令数值（不区分模式）
    #[inline]
    pub fn value(self) -> f64 {
        match self {
            JointCommand::Position(v) | JointCommand::Velocity(v) | JointCommand::Effort(v) => v,
        }
    }
}

/// 执行/传感硬件接口
///
/// # 实现契约
///
/// - `read` / `write` 必须有界耗时、不分配、不阻塞等待外部事件；
///   数据未就绪时返回 [`HalError::ReadFailed`] 而不是等待。
/// - 关节索引遵循机构模型的受控顺序。
pub trait JointInterface: Send {
    /// 受控关节数
    fn dof(&self) -> usize;

    /// 读取单关节当前测量值
    fn read(&mut self, joint: usize) -> Result<JointMeasurement, HalError>;

    /// 写入单关节执行指令
    fn write(&mut self, joint: usize, command: JointCommand) -> Result<(), HalError>;
}
