//! 粒子效果抽象

use std::fmt;

/// 参数扫描覆盖的效果变体
///
/// 三个变体对应扫描矩阵的第一维。`Vfx` 和 `Builtin` 各绑定一个
/// 场景对象，`None` 表示两者都关闭的对照组。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectVariant {
    /// GPU 粒子效果
    Vfx,
    /// 内置 CPU 粒子系统
    Builtin,
    /// 无效果（对照组）
    None,
}

impl EffectVariant {
    /// 扫描顺序固定的全部变体
    pub const ALL: [EffectVariant; 3] = [
        EffectVariant::Vfx,
        EffectVariant::Builtin,
        EffectVariant::None,
    ];
}

impl fmt::Display for EffectVariant {
    /// 输出文件名中使用的变体标签
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EffectVariant::Vfx => "VFX",
            EffectVariant::Builtin => "BuiltIn",
            EffectVariant::None => "None",
        };
        write!(f, "{label}")
    }
}

/// 可调发射率的粒子效果
///
/// 互斥约束由调用方维护：同一 tick 内最多一个效果处于激活状态，
/// 激活新效果前必须先 `stop_and_clear` 其余效果。
pub trait ParticleEffect: Send + Sync {
    /// 开始发射
    fn play(&self);

    /// 停止发射并清空存活粒子
    fn stop_and_clear(&self);

    /// 是否处于激活状态
    fn is_active(&self) -> bool;

    /// 设置每秒发射率
    fn set_emission_rate(&self, rate: f64);

    /// 当前每秒发射率
    fn emission_rate(&self) -> f64;

    /// 当前存活粒子数
    fn alive_count(&self) -> u32;
}
