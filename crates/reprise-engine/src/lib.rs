//! 实验引擎模块
//!
//! 本模块提供 VR 轨迹实验的三件核心能力：
//! - 锚点相对的位姿录制（[`PoseRecorder`]）
//! - 插值回放（[`Replayer`]，lerp + slerp，跟随锚点实时位姿）
//! - 全因子压力扫描（[`SweepController`]，效果 × 环境 × 重复）
//!
//! # 使用场景
//!
//! 引擎不直接接触任何宿主运行时：场景通过 [`reprise_scene::Rig`]
//! 注入，时间通过 [`TickSource`] 注入。同一套引擎代码既能在真实
//! 头显上逐帧驱动，也能在测试里用 [`FixedTicks`] 毫秒级跑完。
//!
//! # 输出文件
//!
//! 录制落盘 `MovementData_*.csv`，扫描落盘每格一个
//! `RecordedData_*.csv` 和一份 `SweepManifest_*.json`，
//! 命名规则集中在 [`naming`](self::naming) 模块。

pub mod error;
pub mod events;
pub mod metrics;
pub mod naming;
pub mod ramp;
pub mod recorder;
pub mod replayer;
pub mod session;
pub mod stats;
pub mod store;
pub mod sweep;

// 重新导出常用类型
pub use error::{HarnessError, Result};
pub use events::{EventBus, HarnessEvent};
pub use metrics::{CounterReadings, MetricsLog, MetricsRow, RenderProbes};
pub use ramp::EmissionRamp;
pub use recorder::PoseRecorder;
pub use replayer::{ReplayStatus, Replayer};
pub use session::{FixedTicks, LoopConfig, RealtimeTicks, TickSource};
pub use stats::TrajectoryStats;
pub use store::TrajectoryStore;
pub use sweep::{
    CellPhase, CellReport, RateCeilings, SweepCell, SweepConfig, SweepController, SweepManifest,
    SweepSummary,
};
