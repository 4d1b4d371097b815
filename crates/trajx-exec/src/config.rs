//! 控制器配置
//!
//! 枚举受控关节、各关节控制模式与增益、反馈发布频率和目标超时。
//! 通过 serde + TOML 加载，使用前必须 [`ControllerConfig::validate`]。
//!
//! # Example
//!
//! ```toml
//! feedback_rate_hz = 20.0
//! goal_timeout_s = 2.0
//!
//! [[joints]]
//! name = "shoulder"
//! mode = "position"
//!
//! [joints.limits]
//! min_position = -3.14
//! max_position = 3.14
//!
//! [[joints]]
//! name = "elbow"
//! mode = "velocity"
//!
//! [joints.gains]
//! kp = 5.0
//! ki = 0.1
//! kd = 0.0
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use trajx_model::{JointLimits, JointSpec, MechanismModel};

use crate::adapter::PidGains;
use crate::error::ExecError;

/// 关节控制模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    /// 位置模式：直接下发期望位置（硬件自带伺服）
    Position,
    /// 速度模式：速度前馈 + 位置误差 PID
    Velocity,
    /// 力矩模式：力矩前馈 + 位置误差 PID
    Effort,
}

/// 单关节配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointConfig {
    /// 关节名称（机构内唯一）
    pub name: String,
    /// 控制模式
    pub mode: ControlMode,
    /// PID 增益（位置模式可省略）
    #[serde(default)]
    pub gains: PidGains,
    /// 运动学限位
    #[serde(default)]
    pub limits: JointLimits,
}

/// 控制器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// 受控关节（顺序即执行顺序）
    pub joints: Vec<JointConfig>,
    /// 反馈发布频率（Hz，非实时 tick 的建议节拍）
    #[serde(default = "default_feedback_rate")]
    pub feedback_rate_hz: f64,
    /// 目标超时（秒）：轨迹时长之外额外等待的收敛时间，
    /// 超过后主动中止。`None` 表示不超时。
    #[serde(default)]
    pub goal_timeout_s: Option<f64>,
}

fn default_feedback_rate() -> f64 {
    20.0
}

impl ControllerConfig {
    /// 从 TOML 文本解析配置
    pub fn from_toml_str(s: &str) -> Result<Self, ExecError> {
        Ok(toml::from_str(s)?)
    }

    /// 校验配置自洽性
    ///
    /// - 至少一个关节，名称唯一
    /// - 限位自洽（min <= max，绝对值限位非负）
    /// - 增益有限且非负
    /// - 反馈频率为正
    pub fn validate(&self) -> Result<(), ExecError> {
        if self.joints.is_empty() {
            return Err(ExecError::Config("no controlled joints".into()));
        }
        for (i, joint) in self.joints.iter().enumerate() {
            if joint.name.is_empty() {
                return Err(ExecError::Config(format!("joint {i} has an empty name")));
            }
            if self.joints[..i].iter().any(|j| j.name == joint.name) {
                return Err(ExecError::Config(format!(
                    "duplicate joint name: {}",
                    joint.name
                )));
            }
            if !joint.limits.is_valid() {
                return Err(ExecError::Config(format!(
                    "invalid limits on joint {}",
                    joint.name
                )));
            }
            if !joint.gains.is_valid() {
                return Err(ExecError::Config(format!(
                    "invalid PID gains on joint {}",
                    joint.name
                )));
            }
        }
        if !(self.feedback_rate_hz > 0.0) {
            return Err(ExecError::Config(format!(
                "feedback_rate_hz must be positive, got {}",
                self.feedback_rate_hz
            )));
        }
        if let Some(t) = self.goal_timeout_s {
            if !(t >= 0.0) || !t.is_finite() {
                return Err(ExecError::Config(format!(
                    "goal_timeout_s must be finite and non-negative, got {t}"
                )));
            }
        }
        Ok(())
    }

    /// 由关节配置构建机构模型
    pub fn build_model(&self) -> MechanismModel {
        MechanismModel::new(
            self.joints
                .iter()
                .map(|j| JointSpec {
                    name: j.name.clone(),
                    limits: j.limits,
                })
                .collect(),
        )
    }

    /// 反馈发布周期
    pub fn feedback_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.feedback_rate_hz)
    }

    /// 目标超时
    pub fn goal_timeout(&self) -> Option<Duration> {
        self.goal_timeout_s.map(Duration::from_secs_f64)
    }
}
