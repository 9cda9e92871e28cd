//! # Reprise Core
//!
//! 头显轨迹录制/回放的基础数据层（无场景依赖）
//!
//! ## 模块
//!
//! - `math`: 3D 位姿数学（向量、四元数、位姿组合）
//! - `sample`: 锚点相对位姿采样点与行编解码
//! - `trajectory`: 有序采样序列（轨迹）
//!
//! ## 坐标约定
//!
//! 所有采样均表示「移动帧相对锚点帧」的位姿：位置是锚点局部坐标，
//! 旋转是锚点姿态左乘逆后的四元数。回放时再与锚点的实时位姿复合，
//! 因此锚点在两次会话之间移动或重设父级都不影响轨迹语义。

pub mod math;
pub mod sample;
pub mod trajectory;

// 重新导出常用类型
pub use math::{Pose, Position3D, Quaternion};
pub use sample::{PoseSample, SampleDecodeError};
pub use trajectory::{Trajectory, TrajectoryError};
