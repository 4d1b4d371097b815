//! 轨迹表示与按时间采样
//!
//! 轨迹是关节空间上按时间参数化的曲线：给定从目标起点算起的经过
//! 时间，返回每个受控关节的（位置、速度、加速度）。
//!
//! # 采样契约
//!
//! - **钳位，不外推**：`elapsed` 超出 `[0, duration]` 时返回端点采样。
//! - **缺省为零**：路点未提供速度/加速度目标时按 0 处理。
//! - **零堆分配**：`sample_into` 写入调用方预分配的
//!   [`TrajectorySample`]，适合实时路径每周期调用。
//!
//! # 算法
//!
//! 相邻路点之间使用三次 Hermite 插值：
//!
//! ```text
//! p(s) = a0 + a1*s + a2*s² + a3*s³    s ∈ [0, 1]
//! ```
//!
//! 边界条件为路点给出的位置与速度（未给出时速度为 0），速度/加速度
//! 在物理时间上按段长缩放。

use std::time::Duration;

use crate::error::TrajectoryError;
use crate::types::{JointVec, joint_vec_zeros};

/// 轨迹路点
///
/// `velocities` / `accelerations` 为 `None` 时，对应目标按 0 处理。
#[derive(Debug, Clone)]
pub struct TrajectoryPoint {
    /// 相对轨迹零点的时间
    pub time_from_start: Duration,
    /// 关节位置（rad）
    pub positions: JointVec,
    /// 关节速度（rad/s，可选）
    pub velocities: Option<JointVec>,
    /// 关节加速度（rad/s²，可选）
    pub accelerations: Option<JointVec>,
}

impl TrajectoryPoint {
    /// 创建仅含位置的路点（速度/加速度缺省为 0）
    pub fn at(time_from_start: Duration, positions: impl Into<JointVec>) -> Self {
        TrajectoryPoint {
            time_from_start,
            positions: positions.into(),
            velocities: None,
            accelerations: None,
        }
    }
}

/// 单次采样结果
///
/// 三个向量长度恒等于轨迹自由度。由调用方持有并在周期间复用，
/// `sample_into` 只做原地写入。
#[derive(Debug, Clone, Default)]
pub struct TrajectorySample {
    /// 期望位置（rad）
    pub positions: JointVec,
    /// 期望速度（rad/s）
    pub velocities: JointVec,
    /// 期望加速度（rad/s²）
    pub accelerations: JointVec,
}

impl TrajectorySample {
    /// 创建长度为 `dof` 的全零采样缓冲区
    pub fn zeroed(dof: usize) -> Self {
        TrajectorySample {
            positions: joint_vec_zeros(dof),
            velocities: joint_vec_zeros(dof),
            accelerations: joint_vec_zeros(dof),
        }
    }

    /// 调整缓冲区长度（仅在上下文切换时调用，非实时路径）
    pub fn reset(&mut self, dof: usize) {
        self.positions.clear();
        self.positions.resize(dof, 0.0);
        self.velocities.clear();
        self.velocities.resize(dof, 0.0);
        self.accelerations.clear();
        self.accelerations.resize(dof, 0.0);
    }
}

/// 时间参数化的关节空间轨迹
///
/// 一旦交给执行循环即不可变；通过 `Arc<dyn Trajectory>` 跨线程共享。
pub trait Trajectory: Send + Sync {
    /// 自由度（受控关节数）
    fn dof(&self) -> usize;

    /// 轨迹总时长（有限；单点轨迹为 0）
    fn duration(&self) -> Duration;

    /// 在经过时间 `elapsed` 处采样
    ///
    /// `elapsed` 超出 `[0, duration]` 时钳位到端点，绝不外推。
    /// `out` 必须由 [`TrajectorySample::zeroed`] 以相同自由度创建。
    fn sample_into(&self, elapsed: Duration, out: &mut TrajectorySample);
}

/// 三次插值系数（归一化时间 s ∈ [0, 1]）
///
/// 表示 `p(s) = a0 + a1*s + a2*s² + a3*s³`
#[derive(Debug, Clone, Copy)]
struct CubicCoeffs {
    a0: f64,
    a1: f64,
    a2: f64,
    a3: f64,
}

impl CubicCoeffs {
    /// 由边界条件求解系数
    ///
    /// `v0` / `v1` 为**归一化时间**下的速度（物理速度 × 段长）。
    fn from_boundary(p0: f64, v0: f64, p1: f64, v1: f64) -> Self {
        // p(0) = a0 = p0
        // v(0) = a1 = v0
        // p(1) = a0 + a1 + a2 + a3 = p1
        // v(1) = a1 + 2*a2 + 3*a3 = v1
        let a0 = p0;
        let a1 = v0;
        let a2 = 3.0 * (p1 - p0) - 2.0 * v0 - v1;
        let a3 = -2.0 * (p1 - p0) + v0 + v1;
        CubicCoeffs { a0, a1, a2, a3 }
    }

    #[inline]
    fn position(&self, s: f64) -> f64 {
        self.a0 + self.a1 * s + self.a2 * s * s + self.a3 * s * s * s
    }

    /// 归一化时间导数（物理速度需除以段长）
    #[inline]
    fn velocity(&self, s: f64) -> f64 {
        self.a1 + 2.0 * self.a2 * s + 3.0 * self.a3 * s * s
    }

    /// 归一化时间二阶导数（物理加速度需除以段长平方）
    #[inline]
    fn acceleration(&self, s: f64) -> f64 {
        2.0 * self.a2 + 6.0 * self.a3 * s
    }
}

/// 轨迹段：相邻两路点之间的插值
#[derive(Debug, Clone)]
struct Segment {
    /// 段起始时间（秒，相对轨迹零点）
    start_s: f64,
    /// 段长（秒，> 0）
    length_s: f64,
    /// 每关节系数
    coeffs: JointVec2,
}

type JointVec2 = smallvec::SmallVec<[CubicCoeffs; crate::types::MAX_JOINTS]>;

/// 分段三次样条轨迹
///
/// 由路点序列构建，相邻路点间做 Hermite 插值。这是引擎默认的具体
/// 轨迹类型；调用方也可以实现自己的 [`Trajectory`]。
#[derive(Debug, Clone)]
pub struct SplineTrajectory {
    dof: usize,
    /// 首路点位置（elapsed 早于首路点时间时保持此姿态）
    head: JointVec,
    /// 末路点位置（钳位端点）
    tail: JointVec,
    segments: Vec<Segment>,
    duration: Duration,
}

impl SplineTrajectory {
    /// 由路点序列构建轨迹
    ///
    /// # 校验
    ///
    /// - 至少一个路点
    /// - `time_from_start` 严格单调递增
    /// - 所有路点自由度一致（位置与可选的速度/加速度向量）
    /// - 所有数值有限
    ///
    /// 单路点轨迹合法，时长为该路点的 `time_from_start`（通常 0）。
    pub fn from_points(points: Vec<TrajectoryPoint>) -> Result<Self, TrajectoryError> {
        let first = points.first().ok_or(TrajectoryError::Empty)?;
        let dof = first.positions.len();

        let mut prev_time = f64::NEG_INFINITY;
        for (index, p) in points.iter().enumerate() {
            if p.positions.len() != dof {
                return Err(TrajectoryError::DofMismatch {
                    index,
                    expected: dof,
                    actual: p.positions.len(),
                });
            }
            for opt in [&p.velocities, &p.accelerations] {
                if let Some(v) = opt {
                    if v.len() != dof {
                        return Err(TrajectoryError::DofMismatch {
                            index,
                            expected: dof,
                            actual: v.len(),
                        });
                    }
                }
            }
            for joint in 0..dof {
                let finite = p.positions[joint].is_finite()
                    && p.velocities.as_ref().is_none_or(|v| v[joint].is_finite())
                    && p.accelerations.as_ref().is_none_or(|a| a[joint].is_finite());
                if !finite {
                    return Err(TrajectoryError::NonFinite { index, joint });
                }
            }
            let t = p.time_from_start.as_secs_f64();
            if index > 0 && t <= prev_time {
                return Err(TrajectoryError::NonMonotonicTime {
                    index,
                    time_s: t,
                    prev_s: prev_time,
                });
            }
            prev_time = t;
        }

        let mut segments = Vec::with_capacity(points.len().saturating_sub(1));
        for pair in points.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let start_s = a.time_from_start.as_secs_f64();
            let length_s = b.time_from_start.as_secs_f64() - start_s;

            let mut coeffs = JointVec2::new();
            for joint in 0..dof {
                let v0 = a.velocities.as_ref().map_or(0.0, |v| v[joint]);
                let v1 = b.velocities.as_ref().map_or(0.0, |v| v[joint]);
                // 物理速度 → 归一化时间速度
                coeffs.push(CubicCoeffs::from_boundary(
                    a.positions[joint],
                    v0 * length_s,
                    b.positions[joint],
                    v1 * length_s,
                ));
            }
            segments.push(Segment {
                start_s,
                length_s,
                coeffs,
            });
        }

        let head = first.positions.clone();
        let tail = points.last().map(|p| p.positions.clone()).unwrap_or_default();
        let duration = points.last().map(|p| p.time_from_start).unwrap_or_default();

        Ok(SplineTrajectory {
            dof,
            head,
            tail,
            segments,
            duration,
        })
    }

    /// 在 `elapsed` 所处的段内采样；超出末段时返回末路点静止采样
    fn sample_clamped(&self, elapsed_s: f64, out: &mut TrajectorySample) {
        // 钳位到末端：末路点位置、零速度、零加速度
        if self.segments.is_empty() || elapsed_s >= self.duration.as_secs_f64() {
            for joint in 0..self.dof {
                out.positions[joint] = self.tail[joint];
                out.velocities[joint] = 0.0;
                out.accelerations[joint] = 0.0;
            }
            return;
        }

        // 首路点时间之前：保持首路点姿态
        if elapsed_s < self.segments[0].start_s {
            for joint in 0..self.dof {
                out.positions[joint] = self.head[joint];
                out.velocities[joint] = 0.0;
                out.accelerations[joint] = 0.0;
            }
            return;
        }

        // 二分查找所在段（首个 start_s > elapsed 的段的前驱）
        let idx = self
            .segments
            .partition_point(|seg| seg.start_s <= elapsed_s)
            .saturating_sub(1);
        let seg = &self.segments[idx];
        let s = ((elapsed_s - seg.start_s) / seg.length_s).clamp(0.0, 1.0);
        let h = seg.length_s;

        for joint in 0..self.dof {
            let c = &seg.coeffs[joint];
            out.positions[joint] = c.position(s);
            out.velocities[joint] = c.velocity(s) / h;
            out.accelerations[joint] = c.acceleration(s) / (h * h);
        }
    }
}

impl Trajectory for SplineTrajectory {
    fn dof(&self) -> usize {
        self.dof
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn sample_into(&self, elapsed: Duration, out: &mut TrajectorySample) {
        debug_assert_eq!(out.positions.len(), self.dof);
        self.sample_clamped(elapsed.as_secs_f64(), out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn linear_2dof() -> SplineTrajectory {
        // 1 秒线性轨迹 [0, 0] → [1, 1]
        SplineTrajectory::from_points(vec![
            TrajectoryPoint::at(Duration::ZERO, [0.0, 0.0].as_slice()),
            TrajectoryPoint::at(Duration::from_secs(1), [1.0, 1.0].as_slice()),
        ])
        .unwrap()
    }

    #[test]
    fn test_boundary_conditions() {
        let traj = linear_2dof();
        let mut sample = TrajectorySample::zeroed(2);

        traj.sample_into(Duration::ZERO, &mut sample);
        assert!((sample.positions[0] - 0.0).abs() < 1e-9);
        // 边界速度为 0（rest-to-rest）
        assert!(sample.velocities[0].abs() < 1e-9);

        traj.sample_into(Duration::from_secs(1), &mut sample);
        assert!((sample.positions[0] - 1.0).abs() < 1e-9);
        assert!(sample.velocities[1].abs() < 1e-9);
    }

    #[test]
    fn test_sampling_clamps_past_duration() {
        let traj = linear_2dof();
        let mut at_end = TrajectorySample::zeroed(2);
        let mut past_end = TrajectorySample::zeroed(2);

        traj.sample_into(traj.duration(), &mut at_end);
        traj.sample_into(Duration::from_secs(100), &mut past_end);

        assert_eq!(at_end.positions[0], past_end.positions[0]);
        assert_eq!(at_end.positions[1], past_end.positions[1]);
        assert_eq!(past_end.velocities[0], 0.0);
    }

    proptest! {
        /// 对任意 elapsed >= duration，采样结果等于 duration 处的采样
        #[test]
        fn prop_clamp_never_extrapolates(extra_ms in 0u64..10_000) {
            let traj = linear_2dof();
            let mut at_end = TrajectorySample::zeroed(2);
            let mut past = TrajectorySample::zeroed(2);

            traj.sample_into(traj.duration(), &mut at_end);
            traj.sample_into(traj.duration() + Duration::from_millis(extra_ms), &mut past);

            prop_assert_eq!(at_end.positions[0], past.positions[0]);
            prop_assert_eq!(at_end.velocities[0], past.velocities[0]);
        }
    }

    #[test]
    fn test_monotonic_progress_midpoints() {
        let traj = linear_2dof();
        let mut sample = TrajectorySample::zeroed(2);
        let mut last = -1.0;
        for i in 0..=10 {
            traj.sample_into(Duration::from_millis(i * 100), &mut sample);
            assert!(sample.positions[0] >= last, "position must not regress");
            last = sample.positions[0];
        }
        assert!((last - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_duration_trajectory() {
        let traj = SplineTrajectory::from_points(vec![TrajectoryPoint::at(
            Duration::ZERO,
            [0.5, -0.5].as_slice(),
        )])
        .unwrap();
        assert_eq!(traj.duration(), Duration::ZERO);

        let mut sample = TrajectorySample::zeroed(2);
        traj.sample_into(Duration::ZERO, &mut sample);
        assert_eq!(sample.positions[0], 0.5);
        assert_eq!(sample.positions[1], -0.5);
        assert_eq!(sample.velocities[0], 0.0);
    }

    #[test]
    fn test_multi_segment_waypoint_passthrough() {
        let traj = SplineTrajectory::from_points(vec![
            TrajectoryPoint::at(Duration::ZERO, [0.0].as_slice()),
            TrajectoryPoint::at(Duration::from_secs(1), [2.0].as_slice()),
            TrajectoryPoint::at(Duration::from_secs(2), [1.0].as_slice()),
        ])
        .unwrap();
        let mut sample = TrajectorySample::zeroed(1);

        // 中间路点必须被精确经过
        traj.sample_into(Duration::from_secs(1), &mut sample);
        assert!((sample.positions[0] - 2.0).abs() < 1e-9);

        traj.sample_into(Duration::from_secs(2), &mut sample);
        assert!((sample.positions[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_boundary_velocity_honored() {
        let mut p0 = TrajectoryPoint::at(Duration::ZERO, [0.0].as_slice());
        p0.velocities = Some([1.0].as_slice().into());
        let traj = SplineTrajectory::from_points(vec![
            p0,
            TrajectoryPoint::at(Duration::from_secs(2), [1.0].as_slice()),
        ])
        .unwrap();

        let mut sample = TrajectorySample::zeroed(1);
        traj.sample_into(Duration::ZERO, &mut sample);
        assert!((sample.velocities[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(
            SplineTrajectory::from_points(vec![]).unwrap_err(),
            TrajectoryError::Empty
        );
    }

    #[test]
    fn test_rejects_non_monotonic_time() {
        let err = SplineTrajectory::from_points(vec![
            TrajectoryPoint::at(Duration::from_secs(1), [0.0].as_slice()),
            TrajectoryPoint::at(Duration::from_secs(1), [1.0].as_slice()),
        ])
        .unwrap_err();
        assert!(matches!(err, TrajectoryError::NonMonotonicTime { index: 1, .. }));
    }

    #[test]
    fn test_rejects_dof_mismatch() {
        let err = SplineTrajectory::from_points(vec![
            TrajectoryPoint::at(Duration::ZERO, [0.0, 0.0].as_slice()),
            TrajectoryPoint::at(Duration::from_secs(1), [1.0].as_slice()),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            TrajectoryError::DofMismatch {
                index: 1,
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_rejects_non_finite() {
        let err = SplineTrajectory::from_points(vec![TrajectoryPoint::at(
            Duration::ZERO,
            [f64::NAN].as_slice(),
        )])
        .unwrap_err();
        assert!(matches!(err, TrajectoryError::NonFinite { index: 0, joint: 0 }));
    }
}
