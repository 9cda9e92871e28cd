//! 舞台开关：环境模式、头部追踪、录制指示、状态文本

use std::fmt;

/// 环境呈现模式（扫描矩阵的第二维）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EnvironmentMode {
    /// 沉浸模式：显示 3D 环境，天空盒清屏
    Immersive,
    /// 透视模式：隐藏 3D 环境，纯色清屏，透出实景
    Passthrough,
}

impl EnvironmentMode {
    /// 扫描顺序固定的全部模式
    pub const ALL: [EnvironmentMode; 2] =
        [EnvironmentMode::Immersive, EnvironmentMode::Passthrough];

    /// 输出文件名中的 Passthrough 布尔标记
    pub fn passthrough_flag(&self) -> bool {
        matches!(self, EnvironmentMode::Passthrough)
    }
}

impl fmt::Display for EnvironmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EnvironmentMode::Immersive => "Immersive",
            EnvironmentMode::Passthrough => "Passthrough",
        };
        write!(f, "{label}")
    }
}

/// 引擎驱动的场景侧开关
///
/// 所有方法幂等：重复设置同一状态是无害的。
pub trait Stage: Send + Sync {
    /// 切换环境呈现模式
    fn set_environment(&self, mode: EnvironmentMode);

    /// 当前环境模式
    fn environment(&self) -> EnvironmentMode;

    /// 启用/禁用实时头部追踪输入
    fn set_head_tracking(&self, enabled: bool);

    /// 头部追踪是否启用
    fn head_tracking(&self) -> bool;

    /// 录制指示（屏内红点等）
    fn set_recording_indicator(&self, on: bool);

    /// 屏内状态文本（进度与错误提示都走这里）
    fn set_status_text(&self, text: &str);
}
