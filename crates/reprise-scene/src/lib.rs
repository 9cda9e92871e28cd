//! # Reprise Scene Layer
//!
//! 场景抽象层，把宿主运行时（渲染、粒子、性能计数、显示、舞台开关）
//! 收拢成几个窄接口。引擎只通过这些 trait 与场景交互，宿主可以是真实
//! 的 VR 运行时，也可以是 `mock` feature 提供的内存场景。

use std::sync::Arc;
use thiserror::Error;

pub mod counters;
pub mod display;
pub mod effect;
pub mod frame;
pub mod stage;

#[cfg(feature = "mock")]
pub mod mock;

pub use counters::{CounterHandle, CounterProbe, CounterSource};
pub use display::{DisplayLink, negotiate_refresh_rate};
pub use effect::{EffectVariant, ParticleEffect};
pub use frame::Frame;
pub use stage::{EnvironmentMode, Stage};

/// 场景层统一错误类型
///
/// 场景侧的缺失都是可降级的：调用方记录一次警告后继续运行，
/// 不会因为某个计数器或显示设备不在而中断实验。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// 协作子系统缺失（显示设备、粒子系统等）
    #[error("subsystem '{subsystem}' unavailable: {detail}")]
    SubsystemUnavailable {
        subsystem: &'static str,
        detail: String,
    },

    /// 请求的性能计数器无法打开
    #[error("counter '{category}/{name}' unavailable")]
    CounterUnavailable { category: String, name: String },
}

impl SceneError {
    pub fn subsystem_unavailable(subsystem: &'static str, detail: impl Into<String>) -> Self {
        SceneError::SubsystemUnavailable {
            subsystem,
            detail: detail.into(),
        }
    }

    pub fn counter_unavailable(category: impl Into<String>, name: impl Into<String>) -> Self {
        SceneError::CounterUnavailable {
            category: category.into(),
            name: name.into(),
        }
    }
}

/// 一次实验会话用到的全部场景句柄
///
/// `anchor` 是轨迹的参考帧，`mover` 是被录制/被回放驱动的帧
/// （通常是头显相机的代理）。两个粒子效果各占一个槽位，
/// [`EffectVariant::None`] 变体没有对应对象。
#[derive(Clone)]
pub struct Rig {
    pub anchor: Arc<dyn Frame>,
    pub mover: Arc<dyn Frame>,
    pub stage: Arc<dyn Stage>,
    pub vfx: Arc<dyn ParticleEffect>,
    pub builtin: Arc<dyn ParticleEffect>,
    pub counters: Arc<dyn CounterSource>,
}

impl Rig {
    /// 变体对应的效果对象（`None` 变体返回 `None`）
    pub fn effect(&self, variant: EffectVariant) -> Option<&Arc<dyn ParticleEffect>> {
        match variant {
            EffectVariant::Vfx => Some(&self.vfx),
            EffectVariant::Builtin => Some(&self.builtin),
            EffectVariant::None => None,
        }
    }

    /// 停止并清空所有效果
    pub fn stop_all_effects(&self) {
        self.vfx.stop_and_clear();
        self.builtin.stop_and_clear();
    }
}
