//! 锚点相对位姿采样与行编解码
//!
//! 录制文件每行一个采样，8 个逗号分隔字段：
//!
//! ```text
//! timestamp,px,py,pz,rx,ry,rz,rw
//! ```
//!
//! 四元数在磁盘上按 `x,y,z,w` 排列（实部在最后），内存中则是
//! [`Quaternion`] 的 `w,x,y,z`，编解码负责换位。数字使用 Rust 默认
//! 浮点格式化（小数点、无千分位），与解析端约定一致，不受 locale 影响。

use crate::math::{Position3D, Pose, Quaternion};
use thiserror::Error;

/// 每行字段数
pub const FIELDS_PER_LINE: usize = 8;

/// 字段名（按磁盘顺序，用于错误信息定位）
const FIELD_NAMES: [&str; FIELDS_PER_LINE] =
    ["timestamp", "px", "py", "pz", "rx", "ry", "rz", "rw"];

/// 行解码错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleDecodeError {
    /// 字段数不是 8
    #[error("expected {FIELDS_PER_LINE} comma-separated fields, found {found}")]
    FieldCount { found: usize },

    /// 字段不是合法数字
    #[error("field '{field}' is not a number: '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    /// 字段是 NaN 或无穷（会污染后续插值，按坏行处理）
    #[error("field '{field}' is not finite")]
    NonFinite { field: &'static str },
}

/// 某一时刻移动帧相对锚点帧的位姿
///
/// 构造后不可变；`rotation` 保证是单位四元数（构造与解析时归一化）。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoseSample {
    /// 采样时刻（秒，自录制开始）
    pub timestamp: f64,
    /// 锚点局部坐标中的位置
    pub position: Position3D,
    /// 锚点姿态左乘逆后的旋转
    pub rotation: Quaternion,
}

impl PoseSample {
    /// 创建采样点（旋转会被归一化）
    pub fn new(timestamp: f64, position: Position3D, rotation: Quaternion) -> Self {
        PoseSample {
            timestamp,
            position,
            rotation: rotation.normalize(),
        }
    }

    /// 以 [`Pose`] 视角读取（不含时间戳）
    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.rotation)
    }

    /// 编码为一行（不含换行符）
    pub fn encode_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{}",
            self.timestamp,
            self.position.x,
            self.position.y,
            self.position.z,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
            self.rotation.w,
        )
    }

    /// 从一行文本解析
    ///
    /// 每个字段两侧允许空白（兼容 CRLF 与手工编辑的文件），
    /// 字段数不对、数字非法或出现 NaN/无穷都会报错并指明字段名。
    pub fn parse_line(line: &str) -> Result<Self, SampleDecodeError> {
        let mut values = [0.0f64; FIELDS_PER_LINE];
        let mut count = 0;

        for (i, raw) in line.split(',').enumerate() {
            count += 1;
            if count > FIELDS_PER_LINE {
                continue; // 只为报出准确的 found 数
            }
            let trimmed = raw.trim();
            let value: f64 =
                trimmed
                    .parse()
                    .map_err(|_| SampleDecodeError::InvalidNumber {
                        field: FIELD_NAMES[i],
                        value: trimmed.to_string(),
                    })?;
            if !value.is_finite() {
                return Err(SampleDecodeError::NonFinite {
                    field: FIELD_NAMES[i],
                });
            }
            values[i] = value;
        }

        if count != FIELDS_PER_LINE {
            return Err(SampleDecodeError::FieldCount { found: count });
        }

        Ok(PoseSample::new(
            values[0],
            Position3D::new(values[1], values[2], values[3]),
            Quaternion {
                x: values[4],
                y: values[5],
                z: values[6],
                w: values[7],
            },
        ))
    }
}
