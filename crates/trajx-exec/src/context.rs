//! 轨迹上下文与交接盒
//!
//! [`ContextBox`] 是两个时序域之间**唯一**的共享可变状态：
//! 非实时侧（目标生命周期管理器）写入，实时侧（执行循环）读取。
//!
//! # 实时安全契约
//!
//! - `load()`：wait-free，不分配堆内存，不可能观察到半构造的
//!   上下文（ArcSwap 的原子指针交换语义）；
//! - `store()` / `take()`：非实时侧调用，与并发 `load` 的竞争
//!   被限制在一次原子交换内，绝不让读者停顿；
//! - 上下文经 `Arc` 共享：实时侧消费完毕后，非实时侧仍持有自己的
//!   引用用于结果终结，最后一个引用在哪个线程释放就在哪个线程
//!   归还内存（管理器总是比执行循环活得久，实践中是非实时侧）。
//!
//! 终态标记（[`Outcome`]）由执行循环通过 CAS 置位：循环只*标记*
//! 成功/中止，反馈与结果发布完全留在非实时侧。

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

use arc_swap::ArcSwapOption;
use trajx_model::Trajectory;

use crate::goal::GoalHandle;

/// 上下文终态标记
///
/// 执行循环置位（首个终态胜出），管理器读取并终结。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Outcome {
    /// 仍在执行
    Pending = 0,
    /// 轨迹走完（待终结）
    Succeeded = 1,
    /// 执行失败：限位违规或指令写入被拒（待终结）
    Aborted = 2,
}

impl Outcome {
    /// 从 u8 转换；无效值按 Pending 处理
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Outcome::Succeeded,
            2 => Outcome::Aborted,
            _ => Outcome::Pending,
        }
    }

    /// 转换为 u8
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 是否为终态
    #[inline]
    pub fn is_terminal(self) -> bool {
        self != Outcome::Pending
    }
}

/// 正在执行的轨迹上下文
///
/// {起始时刻, 轨迹, 目标句柄}。管理器在接受目标时创建，放入交接
/// 盒；被新上下文替换或终结完成后随最后一个 `Arc` 销毁。
pub struct TrajectoryContext {
    /// 轨迹零点时刻（目标被接受的时刻，而非循环首次观察到的时刻）
    pub start_time: Instant,
    /// 共享的不可变轨迹
    pub trajectory: Arc<dyn Trajectory>,
    /// 目标句柄
    pub goal: GoalHandle,
    outcome: AtomicU8,
}

impl TrajectoryContext {
    /// 创建新上下文（outcome 初始为 Pending）
    pub fn new(start_time: Instant, trajectory: Arc<dyn Trajectory>, goal: GoalHandle) -> Self {
        TrajectoryContext {
            start_time,
            trajectory,
            goal,
            outcome: AtomicU8::new(Outcome::Pending.as_u8()),
        }
    }

    /// 当前终态标记
    #[inline]
    pub fn outcome(&self) -> Outcome {
        Outcome::from_u8(self.outcome.load(Ordering::Acquire))
    }

    /// 标记成功；仅当尚无终态时生效（首个终态胜出）
    #[inline]
    pub fn mark_succeeded(&self) -> bool {
        self.mark(Outcome::Succeeded)
    }

    /// 标记中止；仅当尚无终态时生效
    #[inline]
    pub fn mark_aborted(&self) -> bool {
        self.mark(Outcome::Aborted)
    }

    fn mark(&self, outcome: Outcome) -> bool {
        self.outcome
            .compare_exchange(
                Outcome::Pending.as_u8(),
                outcome.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

impl std::fmt::Debug for TrajectoryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrajectoryContext")
            .field("goal", &self.goal.id())
            .field("duration", &self.trajectory.duration())
            .field("outcome", &self.outcome())
            .finish()
    }
}

/// 单槽交接盒
///
/// 至多持有一个"当前执行"上下文。两个时序域之间的唯一同步点。
#[derive(Debug, Default)]
pub struct ContextBox {
    slot: ArcSwapOption<TrajectoryContext>,
}

impl ContextBox {
    /// 创建空盒
    pub fn new() -> Self {
        ContextBox {
            slot: ArcSwapOption::empty(),
        }
    }

    /// 非实时侧：替换槽内容（None 表示清空 → 循环退化为保持姿态）
    pub fn store(&self, context: Option<Arc<TrajectoryContext>>) {
        self.slot.store(context);
    }

    /// 非实时侧：取走槽内容
    pub fn take(&self) -> Option<Arc<TrajectoryContext>> {
        self.slot.swap(None)
    }

    /// 实时侧：读取当前内容
    ///
    /// wait-free、零分配（仅引用计数递增），返回上一次或最近一次
    /// store 的值，绝不返回撕裂值。
    #[inline]
    pub fn load(&self) -> Option<Arc<TrajectoryContext>> {
        self.slot.load_full()
    }
}
