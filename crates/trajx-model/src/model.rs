//! 机构模型
//!
//! 提供关节顺序、名称与运动学限位的只读查询，被执行循环与状态
//! 更新器消费。动力学/碰撞检测不在引擎范围内。

use serde::{Deserialize, Serialize};

/// 单关节运动学限位
///
/// 缺省无界（±∞），即该维度不做检查。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct JointLimits {
    /// 位置下限（rad）
    #[serde(default = "neg_inf")]
    pub min_position: f64,
    /// 位置上限（rad）
    #[serde(default = "pos_inf")]
    pub max_position: f64,
    /// 速度绝对值上限（rad/s）
    #[serde(default = "pos_inf")]
    pub max_velocity: f64,
    /// 力矩绝对值上限（Nm）
    #[serde(default = "pos_inf")]
    pub max_effort: f64,
}

fn neg_inf() -> f64 {
    f64::NEG_INFINITY
}

fn pos_inf() -> f64 {
    f64::INFINITY
}

impl Default for JointLimits {
    fn default() -> Self {
        JointLimits {
            min_position: f64::NEG_INFINITY,
            max_position: f64::INFINITY,
            max_velocity: f64::INFINITY,
            max_effort: f64::INFINITY,
        }
    }
}

impl JointLimits {
    /// 位置是否在限位内
    #[inline]
    pub fn contains_position(&self, position: f64) -> bool {
        position >= self.min_position && position <= self.max_position
    }

    /// 将位置钳位到限位内
    #[inline]
    pub fn clamp_position(&self, position: f64) -> f64 {
        position.clamp(self.min_position, self.max_position)
    }

    /// 将速度钳位到 ±max_velocity
    #[inline]
    pub fn clamp_velocity(&self, velocity: f64) -> f64 {
        velocity.clamp(-self.max_velocity, self.max_velocity)
    }

    /// 将力矩钳位到 ±max_effort
    #[inline]
    pub fn clamp_effort(&self, effort: f64) -> f64 {
        effort.clamp(-self.max_effort, self.max_effort)
    }

    /// 限位定义是否自洽（min <= max，绝对值限位非负）
    pub fn is_valid(&self) -> bool {
        self.min_position <= self.max_position
            && self.max_velocity >= 0.0
            && self.max_effort >= 0.0
    }
}

/// 单关节描述
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointSpec {
    /// 关节名称（机构内唯一）
    pub name: String,
    /// 运动学限位
    #[serde(default)]
    pub limits: JointLimits,
}

/// 机构模型：受控关节的有序集合
///
/// 关节顺序即轨迹采样与执行循环的关节顺序。
#[derive(Debug, Clone)]
pub struct MechanismModel {
    joints: Vec<JointSpec>,
}

impl MechanismModel {
    /// 由关节描述序列创建模型
    pub fn new(joints: Vec<JointSpec>) -> Self {
        MechanismModel { joints }
    }

    /// 自由度（受控关节数）
    #[inline]
    pub fn dof(&self) -> usize {
        self.joints.len()
    }

    /// 关节名称迭代器（按受控顺序）
    pub fn joint_names(&self) -> impl Iterator<Item = &str> {
        self.joints.iter().map(|j| j.name.as_str())
    }

    /// 按名称查找关节索引
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    /// 指定关节的限位
    #[inline]
    pub fn limits(&self, joint: usize) -> &JointLimits {
        &self.joints[joint].limits
    }

    /// 测得位置是否在该关节限位内
    #[inline]
    pub fn check_position(&self, joint: usize, position: f64) -> bool {
        self.joints[joint].limits.contains_position(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_joint_model() -> MechanismModel {
        MechanismModel::new(vec![
            JointSpec {
                name: "shoulder".into(),
                limits: JointLimits {
                    min_position: -1.0,
                    max_position: 1.0,
                    max_velocity: 2.0,
                    max_effort: 10.0,
                },
            },
            JointSpec {
                name: "elbow".into(),
                limits: JointLimits::default(),
            },
        ])
    }

    #[test]
    fn test_dof_and_lookup() {
        let model = two_joint_model();
        assert_eq!(model.dof(), 2);
        assert_eq!(model.index_of("elbow"), Some(1));
        assert_eq!(model.index_of("wrist"), None);
        assert_eq!(model.joint_names().collect::<Vec<_>>(), ["shoulder", "elbow"]);
    }

    #[test]
    fn test_limit_checks() {
        let model = two_joint_model();
        assert!(model.check_position(0, 0.5));
        assert!(!model.check_position(0, 1.5));
        // 缺省限位无界
        assert!(model.check_position(1, 1e9));
    }

    #[test]
    fn test_clamping() {
        let limits = JointLimits {
            min_position: -1.0,
            max_position: 1.0,
            max_velocity: 2.0,
            max_effort: 10.0,
        };
        assert_eq!(limits.clamp_position(3.0), 1.0);
        assert_eq!(limits.clamp_velocity(-5.0), -2.0);
        assert_eq!(limits.clamp_effort(42.0), 10.0);
        assert!(limits.is_valid());
    }

    #[test]
    fn test_invalid_limits_detected() {
        let limits = JointLimits {
            min_position: 1.0,
            max_position: -1.0,
            ..JointLimits::default()
        };
        assert!(!limits.is_valid());
    }
}
