//! 发射率爬坡
//!
//! 一个格子回放期间，粒子发射率从起始值线性爬到该格子的上限：
//! `rate(t) = start + (ceiling - start) · clamp(t / ramp_time, 0, 1)`。
//! 爬坡时间走 tick 时间，到顶后保持上限不变。

use std::time::Duration;

/// 线性发射率爬坡
#[derive(Debug, Clone, Copy)]
pub struct EmissionRamp {
    start: f64,
    ceiling: f64,
    ramp_time: f64,
    elapsed: f64,
}

impl EmissionRamp {
    pub fn new(start: f64, ceiling: f64, ramp_time: Duration) -> Self {
        EmissionRamp {
            start,
            ceiling,
            ramp_time: ramp_time.as_secs_f64(),
            elapsed: 0.0,
        }
    }

    /// 推进 `dt` 并返回当前发射率
    pub fn advance(&mut self, dt: Duration) -> f64 {
        self.elapsed += dt.as_secs_f64();
        self.rate_at(self.elapsed)
    }

    /// `t` 时刻的发射率（不改内部时钟）
    pub fn rate_at(&self, t: f64) -> f64 {
        if self.ramp_time <= 0.0 {
            return self.ceiling;
        }
        let u = (t / self.ramp_time).clamp(0.0, 1.0);
        self.start + (self.ceiling - self.start) * u
    }

    /// 是否已经爬到上限
    pub fn at_ceiling(&self) -> bool {
        self.ramp_time <= 0.0 || self.elapsed >= self.ramp_time
    }
}
