//! 关节向量类型
//!
//! 使用 SmallVec 在栈上预留 [`MAX_JOINTS`] 个位置，覆盖常见机械臂
//! 的自由度（6-7 轴 + 夹爪）。关节数不超过内联容量时，实时路径上的
//! 向量拷贝不会触碰堆。
//!
//! **性能要求**：执行循环的每周期缓冲区在初始化阶段一次性分配
//! （`joint_vec_zeros`），循环内只做原地写入，绝不 push 超过容量。

use smallvec::SmallVec;

/// 内联关节容量
///
/// 超过此数量的机构仍然可用，但关节向量会在**初始化时**落入堆分配。
/// 初始化之后的控制循环只复用既有缓冲区，不再分配。
pub const MAX_JOINTS: usize = 8;

/// 关节向量（每个受控关节一个标量）
///
/// 语义由上下文决定：位置（rad）、速度（rad/s）、力矩（Nm）。
pub type JointVec = SmallVec<[f64; MAX_JOINTS]>;

/// 创建长度为 `dof` 的全零关节向量
#[inline]
pub fn joint_vec_zeros(dof: usize) -> JointVec {
    let mut v = JointVec::new();
    v.resize(dof, 0.0);
    v
}
