//! 关节适配器：按控制模式多态的控制律
//!
//! 每个受控关节一个适配器实例，把一拍的（期望采样, 实测状态）
//! 映射为一条执行指令。
//!
//! # 设计
//!
//! 控制模式集合在配置期闭合（位置/速度/力矩），因此用**带标签的
//! 枚举 + 单个 match** 分发，而不是 trait 对象——热路径分支可预测，
//! 无虚调用。
//!
//! # 契约
//!
//! - `reset()`：清空积分器与微分历史，在适配器所属上下文变为活动
//!   时恰好调用一次；
//! - `compute()`：内部状态 + 当前输入的确定性纯函数，零分配、
//!   有界耗时；
//! - 适配器只接触数值向量，绝不读写交接盒、目标句柄或轨迹——
//!   生命周期关注点与控制律关注点严格分离。

use serde::{Deserialize, Serialize};
use trajx_hal::{JointCommand, JointMeasurement};
use trajx_model::JointLimits;

use crate::config::{ControlMode, JointConfig};

/// 单关节一拍的期望状态
#[derive(Debug, Clone, Copy, Default)]
pub struct DesiredJoint {
    /// 期望位置（rad）
    pub position: f64,
    /// 期望速度（rad/s）
    pub velocity: f64,
    /// 期望加速度（rad/s²）
    pub acceleration: f64,
    /// 期望力矩前馈（Nm；轨迹不提供时为 0）
    pub effort: f64,
}

/// PID 增益
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PidGains {
    /// 比例增益
    #[serde(default)]
    pub kp: f64,
    /// 积分增益
    #[serde(default)]
    pub ki: f64,
    /// 微分增益
    #[serde(default)]
    pub kd: f64,
    /// 积分项限幅（防积分饱和）
    #[serde(default = "default_integral_limit")]
    pub integral_limit: f64,
}

fn default_integral_limit() -> f64 {
    10.0
}

impl Default for PidGains {
    fn default() -> Self {
        PidGains {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            integral_limit: 10.0,
        }
    }
}

impl PidGains {
    /// 增益是否合法（有限且非负）
    pub fn is_valid(&self) -> bool {
        [self.kp, self.ki, self.kd, self.integral_limit]
            .iter()
            .all(|g| g.is_finite() && *g >= 0.0)
    }
}

/// PID 内部状态
///
/// 跨周期保留积分累积与上一拍误差；上下文切换时必须清零。
#[derive(Debug, Clone, Copy, Default)]
pub struct PidState {
    /// 积分累积
    integral: f64,
    /// 上一拍误差（微分项用）
    last_error: f64,
    /// reset 后的首拍标记：首拍不计算微分（避免 de/dt 尖峰）
    first_cycle: bool,
}

impl PidState {
    fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
        self.first_cycle = true;
    }

    /// 计算一拍 PID 输出
    fn compute(&mut self, gains: &PidGains, error: f64, dt: f64) -> f64 {
        if dt <= 0.0 {
            // 周期异常：只输出比例项，不污染积分/微分历史
            return gains.kp * error;
        }

        self.integral = (self.integral + error * dt)
            .clamp(-gains.integral_limit, gains.integral_limit);

        let derivative = if self.first_cycle {
            0.0
        } else {
            (error - self.last_error) / dt
        };
        self.first_cycle = false;
        self.last_error = error;

        gains.kp * error + gains.ki * self.integral + gains.kd * derivative
    }
}

/// 关节适配器（按控制模式闭合的策略集合）
#[derive(Debug, Clone)]
pub enum JointAdapter {
    /// 位置模式：期望位置钳位后直接下发
    Position {
        /// 关节限位
        limits: JointLimits,
    },
    /// 速度模式：速度前馈 + 位置误差 PID
    Velocity {
        /// 增益
        gains: PidGains,
        /// 关节限位
        limits: JointLimits,
        /// PID 状态
        state: PidState,
    },
    /// 力矩模式：力矩前馈 + 位置误差 PID
    Effort {
        /// 增益
        gains: PidGains,
        /// 关节限位
        limits: JointLimits,
        /// PID 状态
        state: PidState,
    },
}

impl JointAdapter {
    /// 由关节配置构建适配器
    pub fn from_config(config: &JointConfig) -> Self {
        match config.mode {
            ControlMode::Position => JointAdapter::Position {
                limits: config.limits,
            },
            ControlMode::Velocity => JointAdapter::Velocity {
                gains: config.gains,
                limits: config.limits,
                state: PidState::default(),
            },
            ControlMode::Effort => JointAdapter::Effort {
                gains: config.gains,
                limits: config.limits,
                state: PidState::default(),
            },
        }
    }

    /// 适配器的控制模式
    pub fn mode(&self) -> ControlMode {
        match self {
            JointAdapter::Position { .. } => ControlMode::Position,
            JointAdapter::Velocity { .. } => ControlMode::Velocity,
            JointAdapter::Effort { .. } => ControlMode::Effort,
        }
    }

    /// 清空内部状态（积分器、微分历史）
    ///
    /// 在所属上下文变为活动时恰好调用一次。
    pub fn reset(&mut self) {
        match self {
            JointAdapter::Position { .. } => {}
            JointAdapter::Velocity { state, .. } | JointAdapter::Effort { state, .. } => {
                state.reset();
            }
        }
    }

    /// 计算一拍执行指令
    ///
    /// 确定性、零分配、有界耗时。
    pub fn compute(
        &mut self,
        desired: DesiredJoint,
        measured: JointMeasurement,
        dt: f64,
    ) -> JointCommand {
        match self {
            JointAdapter::Position { limits } => {
                JointCommand::Position(limits.clamp_position(desired.position))
            }
            JointAdapter::Velocity { gains, limits, state } => {
                let error = desired.position - measured.position;
                let v = desired.velocity + state.compute(gains, error, dt);
                JointCommand::Velocity(limits.clamp_velocity(v))
            }
            JointAdapter::Effort { gains, limits, state } => {
                let error = desired.position - measured.position;
                let tau = desired.effort + state.compute(gains, error, dt);
                JointCommand::Effort(limits.clamp_effort(tau))
            }
        }
    }

    /// 保持姿态指令（无活动上下文/终态之后的安全输出）
    ///
    /// 模式相关：位置模式重复下发保持位置；速度/力矩模式输出零。
    pub fn hold_command(&self, hold_position: f64) -> JointCommand {
        match self {
            JointAdapter::Position { limits } => {
                JointCommand::Position(limits.clamp_position(hold_position))
            }
            JointAdapter::Velocity { .. } => JointCommand::Velocity(0.0),
            JointAdapter::Effort { .. } => JointCommand::Effort(0.0),
        }
    }
}
