//! Mock 机构：确定性仿真后端
//!
//! 用于测试与示例，无需真实硬件：
//! - 位置指令立即跟踪（理想位置伺服）
//! - 速度/力矩指令在 [`MockMechanismHandle::step`] 中积分
//! - 可注入读失败与强制位置覆盖（限位违规场景）
//!
//! 执行循环独占 [`MockMechanism`]（`JointInterface` 需要 `&mut`），
//! 测试线程通过 [`MockMechanismHandle`] 并发注入故障和观察状态。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::{HalError, JointCommand, JointInterface, JointMeasurement};

#[derive(Debug)]
struct MockInner {
    positions: Vec<f64>,
    velocities: Vec<f64>,
    efforts: Vec<f64>,
    last_commands: Vec<Option<JointCommand>>,
}

#[derive(Debug)]
struct MockShared {
    fail_reads: AtomicBool,
    inner: Mutex<MockInner>,
}

/// Mock 机构（执行循环侧）
#[derive(Debug)]
pub struct MockMechanism {
    dof: usize,
    shared: Arc<MockShared>,
}

/// Mock 机构观察/注入句柄（测试侧）
#[derive(Debug, Clone)]
pub struct MockMechanismHandle {
    dof: usize,
    shared: Arc<MockShared>,
}

impl MockMechanism {
    /// 创建 `dof` 个关节的 Mock 机构，初始静止于零位
    pub fn new(dof: usize) -> Self {
        let inner = MockInner {
            positions: vec![0.0; dof],
            velocities: vec![0.0; dof],
            efforts: vec![0.0; dof],
            last_commands: vec![None; dof],
        };
        MockMechanism {
            dof,
            shared: Arc::new(MockShared {
                fail_reads: AtomicBool::new(false),
                inner: Mutex::new(inner),
            }),
        }
    }

    /// 获取观察/注入句柄（可跨线程克隆）
    pub fn handle(&self) -> MockMechanismHandle {
        MockMechanismHandle {
            dof: self.dof,
            shared: Arc::clone(&self.shared),
        }
    }
}

impl JointInterface for MockMechanism {
    fn dof(&self) -> usize {
        self.dof
    }

    fn read(&mut self, joint: usize) -> Result<JointMeasurement, HalError> {
        if joint >= self.dof {
            return Err(HalError::NoSuchJoint { joint });
        }
        if self.shared.fail_reads.load(Ordering::Relaxed) {
            return Err(HalError::ReadFailed { joint });
        }
        let inner = self.shared.inner.lock();
        Ok(JointMeasurement {
            position: inner.positions[joint],
            velocity: inner.velocities[joint],
            effort: inner.efforts[joint],
        })
    }

    fn write(&mut self, joint: usize, command: JointCommand) -> Result<(), HalError> {
        if joint >= self.dof {
            return Err(HalError::NoSuchJoint { joint });
        }
        let mut inner = self.shared.inner.lock();
        inner.last_commands[joint] = Some(command);
        // 理想位置伺服：位置指令立即跟踪
        if let JointCommand::Position(target) = command {
            inner.positions[joint] = target;
            inner.velocities[joint] = 0.0;
        }
        Ok(())
    }
}

impl MockMechanismHandle {
    /// 推进仿真 `dt` 秒：积分速度/力矩指令（单位惯量）
    pub fn step(&self, dt: f64) {
        let mut inner = self.shared.inner.lock();
        for joint in 0..self.dof {
            match inner.last_commands[joint] {
                Some(JointCommand::Velocity(v)) => {
                    inner.velocities[joint] = v;
                    inner.positions[joint] += v * dt;
                }
                Some(JointCommand::Effort(e)) => {
                    inner.efforts[joint] = e;
                    inner.velocities[joint] += e * dt;
                    let v = inner.velocities[joint];
                    inner.positions[joint] += v * dt;
                }
                // 位置指令在 write 时已生效
                Some(JointCommand::Position(_)) | None => {}
            }
        }
    }

    /// 强制覆盖关节位置（用于限位违规注入）
    pub fn set_position(&self, joint: usize, position: f64) {
        self.shared.inner.lock().positions[joint] = position;
    }

    /// 打开/关闭读失败注入
    pub fn set_fail_reads(&self, fail: bool) {
        self.shared.fail_reads.store(fail, Ordering::Relaxed);
    }

    /// 当前关节位置
    pub fn position(&self, joint: usize) -> f64 {
        self.shared.inner.lock().positions[joint]
    }

    /// 最近一条写入指令（None 表示尚未写入）
    pub fn last_command(&self, joint: usize) -> Option<JointCommand> {
        self.shared.inner.lock().last_commands[joint]
    }
}
