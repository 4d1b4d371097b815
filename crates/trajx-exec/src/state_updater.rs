//! 机构状态更新器
//!
//! 每周期开始时读取所有受控关节的实测位置/速度/力矩，写入执行
//! 循环独占的运动学快照。读取失败**非致命**：保留上一拍数值
//! （陈旧复用）并累加诊断计数，循环照常推进。

use tracing::trace;
use trajx_hal::JointInterface;
use trajx_model::{JointVec, joint_vec_zeros};

/// 运动学状态快照
///
/// 执行循环独占所有权，每周期由 [`SkeletonStateUpdater::refresh`]
/// 原地刷新；适配器与轨迹采样共同消费。
#[derive(Debug, Clone)]
pub struct KinematicState {
    /// 实测位置（rad）
    pub positions: JointVec,
    /// 实测速度（rad/s）
    pub velocities: JointVec,
    /// 实测力矩（Nm）
    pub efforts: JointVec,
}

impl KinematicState {
    /// 创建 `dof` 个关节的全零快照
    pub fn zeroed(dof: usize) -> Self {
        KinematicState {
            positions: joint_vec_zeros(dof),
            velocities: joint_vec_zeros(dof),
            efforts: joint_vec_zeros(dof),
        }
    }
}

/// 机构状态更新器
#[derive(Debug)]
pub struct SkeletonStateUpdater {
    dof: usize,
    stale_reads: u64,
}

impl SkeletonStateUpdater {
    /// 创建 `dof` 个关节的更新器
    pub fn new(dof: usize) -> Self {
        SkeletonStateUpdater { dof, stale_reads: 0 }
    }

    /// 刷新快照：每关节一次 `read`
    ///
    /// 返回本周期失败（陈旧复用）的关节数。有界耗时、零分配。
    pub fn refresh(
        &mut self,
        hw: &mut dyn JointInterface,
        state: &mut KinematicState,
    ) -> usize {
        let mut failed = 0usize;
        for joint in 0..self.dof {
            match hw.read(joint) {
                Ok(m) => {
                    state.positions[joint] = m.position;
                    state.velocities[joint] = m.velocity;
                    state.efforts[joint] = m.effort;
                }
                Err(_) => {
                    // 保留上一拍数值
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            self.stale_reads += failed as u64;
            trace!(failed, "sensor read failed, reusing stale snapshot");
        }
        failed
    }

    /// 累计陈旧读取次数（诊断）
    #[inline]
    pub fn stale_reads(&self) -> u64 {
        self.stale_reads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trajx_hal::{JointCommand, MockMechanism};

    #[test]
    fn test_refresh_copies_measurements() {
        let mut hw = MockMechanism::new(2);
        hw.write(0, JointCommand::Position(0.25)).unwrap();
        hw.write(1, JointCommand::Position(-0.75)).unwrap();

        let mut updater = SkeletonStateUpdater::new(2);
        let mut state = KinematicState::zeroed(2);
        assert_eq!(updater.refresh(&mut hw, &mut state), 0);
        assert_eq!(state.positions[0], 0.25);
        assert_eq!(state.positions[1], -0.75);
    }

    #[test]
    fn test_failed_read_reuses_stale_snapshot() {
        let mut hw = MockMechanism::new(1);
        let handle = hw.handle();
        hw.write(0, JointCommand::Position(0.5)).unwrap();

        let mut updater = SkeletonStateUpdater::new(1);
        let mut state = KinematicState::zeroed(1);
        updater.refresh(&mut hw, &mut state);
        assert_eq!(state.positions[0], 0.5);

        // 注入读失败并移动机构：快照保持陈旧值
        handle.set_fail_reads(true);
        handle.set_position(0, 9.0);
        assert_eq!(updater.refresh(&mut hw, &mut state), 1);
        assert_eq!(state.positions[0], 0.5);
        assert_eq!(updater.stale_reads(), 1);

        // 恢复后重新跟踪
        handle.set_fail_reads(false);
        assert_eq!(updater.refresh(&mut hw, &mut state), 0);
        assert_eq!(state.positions[0], 9.0);
    }
}
