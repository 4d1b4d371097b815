//! 目标状态机
//!
//! 每个在途客户端请求对应一个 [`GoalHandle`]。状态转换仅由目标
//! 生命周期管理器驱动；执行循环只通过上下文的终态标记（见
//! `context` 模块）*标记*成功/中止，绝不在实时路径上做终结发布。
//!
//! # 状态图
//!
//! ```text
//! Pending ──► Active ──► Succeeded
//!    │           ├──────► Aborted
//!    │           └──────► Canceled
//!    └──► Rejected
//! ```
//!
//! Pending 是句柄的构造初态，只存在于 `submit` 内部：提交要么立即
//! 接受（Active），要么立即拒绝（Rejected），不会有目标停留在
//! Pending 等待取消。
//!
//! 使用原子 u8 存储状态：调用方可以在任意线程廉价读取，写入端
//! 单一（管理器），合法性由 [`GoalState::can_transition_to`] 把关。

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use trajx_model::JointVec;

/// 目标标识（单调递增，进程内唯一）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GoalId(pub u64);

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "goal#{}", self.0)
    }
}

/// 目标状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GoalState {
    /// 已收到，尚未校验/接受
    Pending = 0,
    /// 已接受，上下文已进入交接盒
    Active = 1,
    /// 轨迹执行完成（终态）
    Succeeded = 2,
    /// 执行中途失败（终态）
    Aborted = 3,
    /// 被取消或被新目标抢占（终态）
    Canceled = 4,
    /// 校验失败，从未启动（终态）
    Rejected = 5,
}

impl GoalState {
    /// 从 u8 转换；无效值按 Pending 处理
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => GoalState::Active,
            2 => GoalState::Succeeded,
            3 => GoalState::Aborted,
            4 => GoalState::Canceled,
            5 => GoalState::Rejected,
            _ => GoalState::Pending,
        }
    }

    /// 转换为 u8
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// 是否为终态（不再允许任何转换）
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            GoalState::Succeeded | GoalState::Aborted | GoalState::Canceled | GoalState::Rejected
        )
    }

    /// 转换合法性
    pub fn can_transition_to(self, next: GoalState) -> bool {
        use GoalState::*;
        matches!(
            (self, next),
            (Pending, Active)
                | (Pending, Rejected)
                | (Active, Succeeded)
                | (Active, Aborted)
                | (Active, Canceled)
        )
    }
}

#[derive(Debug)]
struct GoalInner {
    id: GoalId,
    state: AtomicU8,
}

/// 目标句柄
///
/// 跨线程可克隆；读取状态无锁。状态写入是 crate 内部操作，
/// 仅生命周期管理器调用。
#[derive(Debug, Clone)]
pub struct GoalHandle {
    inner: Arc<GoalInner>,
}

impl GoalHandle {
    pub(crate) fn new(id: GoalId) -> Self {
        GoalHandle {
            inner: Arc::new(GoalInner {
                id,
                state: AtomicU8::new(GoalState::Pending.as_u8()),
            }),
        }
    }

    /// 目标标识
    #[inline]
    pub fn id(&self) -> GoalId {
        self.inner.id
    }

    /// 当前状态
    #[inline]
    pub fn state(&self) -> GoalState {
        GoalState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// 状态是否已进入终态
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// 执行一次状态转换；非法转换返回 false 且不改变状态
    pub(crate) fn set_state(&self, next: GoalState) -> bool {
        let mut current = self.inner.state.load(Ordering::Acquire);
        loop {
            if !GoalState::from_u8(current).can_transition_to(next) {
                return false;
            }
            match self.inner.state.compare_exchange(
                current,
                next.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }
}

/// 管理器向调用方发布的异步事件
///
/// 通过 crossbeam 通道投递（消息传递，实时路径上没有回调）。
#[derive(Debug, Clone)]
pub enum GoalEvent {
    /// 进度反馈（非实时 tick 节拍发布）
    Feedback {
        /// 目标标识
        goal: GoalId,
        /// 最近一拍的期望位置
        desired_positions: JointVec,
        /// 最近一拍的实测位置
        actual_positions: JointVec,
    },
    /// 终结结果（每个目标恰好一次）
    Result {
        /// 目标标识
        goal: GoalId,
        /// 终态（Succeeded / Aborted / Canceled）
        state: GoalState,
    },
}
