//! 性能计数器抽象
//!
//! 计数器是会话内打开、会话后必须关闭的宿主资源。
//! [`CounterHandle`] 用 Drop 保证关闭：提前退出（取消、报错）时
//! 句柄随作用域析构，宿主侧不会留下悬挂的采样器。

use crate::SceneError;

/// 渲染三角形数
pub const COUNTER_TRIANGLES: (&str, &str) = ("Render", "Triangles Count");
/// 每帧 draw call 数
pub const COUNTER_DRAW_CALLS: (&str, &str) = ("Render", "Draw Calls Count");
/// 渲染顶点数
pub const COUNTER_VERTICES: (&str, &str) = ("Render", "Vertices Count");
/// 已用内存（字节）
pub const COUNTER_MEMORY_USED: (&str, &str) = ("Memory", "Total Used Memory");
/// GPU 占用（0..1）
pub const COUNTER_GPU_USAGE: (&str, &str) = ("Render", "GPU Usage");

/// 计数器后端探针
///
/// 由场景实现提供；`last_value` 返回宿主最近一帧写入的值。
pub trait CounterProbe: Send {
    /// 最近一次采样值
    fn last_value(&self) -> f64;

    /// 释放宿主侧资源（Drop 时调用一次）
    fn close(&mut self) {}
}

/// 打开计数器的入口
pub trait CounterSource: Send + Sync {
    /// 按分类和名称打开一个计数器
    ///
    /// 计数器不存在或子系统缺失时返回 [`SceneError::CounterUnavailable`]，
    /// 调用方按可降级处理。
    fn open(&self, category: &str, name: &str) -> Result<CounterHandle, SceneError>;
}

/// 已打开的计数器（RAII）
pub struct CounterHandle {
    category: String,
    name: String,
    probe: Box<dyn CounterProbe>,
}

impl CounterHandle {
    pub fn new(
        category: impl Into<String>,
        name: impl Into<String>,
        probe: Box<dyn CounterProbe>,
    ) -> Self {
        CounterHandle {
            category: category.into(),
            name: name.into(),
            probe,
        }
    }

    /// 计数器分类
    pub fn category(&self) -> &str {
        &self.category
    }

    /// 计数器名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 最近一次采样值
    pub fn last_value(&self) -> f64 {
        self.probe.last_value()
    }
}

impl Drop for CounterHandle {
    fn drop(&mut self) {
        self.probe.close();
        tracing::debug!(
            category = %self.category,
            name = %self.name,
            "Counter closed"
        );
    }
}

impl std::fmt::Debug for CounterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterHandle")
            .field("category", &self.category)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
