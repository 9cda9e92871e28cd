//! Tick 调度
//!
//! 引擎核心是单线程协作式的：回放、指标采样、冷却等待都挂在
//! 每帧一次的 tick 上。[`TickSource`] 把「下一帧」抽象出来：
//!
//! - 真实宿主里由渲染循环驱动（[`RealtimeTicks`]，spin_sleep 低抖动）
//! - 测试和 dry-run 里用确定步长（[`FixedTicks`]），结果可复现
//!
//! `next_tick()` 返回 `None` 表示宿主正在拆除任务，调用方必须走
//! 清理路径退出（等价于 finally 保证）。

use crate::error::{HarnessError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// 每帧时间步长的来源
pub trait TickSource {
    /// 下一帧的时间步长
    ///
    /// `None` 表示宿主正在拆除任务；调用方不得再请求 tick。
    fn next_tick(&mut self) -> Option<Duration>;
}

/// 确定步长的 tick 源（测试 / dry-run）
///
/// 发出固定数量、固定步长的 tick，之后返回 `None`。
#[derive(Debug, Clone)]
pub struct FixedTicks {
    dt: Duration,
    remaining: usize,
}

impl FixedTicks {
    /// 创建 `count` 个步长为 `dt` 的 tick
    pub fn new(dt: Duration, count: usize) -> Self {
        FixedTicks {
            dt,
            remaining: count,
        }
    }

    /// 按频率创建：`hz` 帧每秒，共 `count` 个 tick
    pub fn at_hz(hz: f64, count: usize) -> Self {
        FixedTicks::new(Duration::from_secs_f64(1.0 / hz), count)
    }

    /// 还剩多少 tick
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl TickSource for FixedTicks {
    fn next_tick(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.dt)
    }
}

/// 实时循环配置
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// tick 频率（Hz）
    ///
    /// 例如：72.0 对应常见头显的 72 FPS。
    pub frequency_hz: f64,

    /// dt 钳位倍数
    ///
    /// 当实际 dt 超过标称周期的此倍数时（调度毛刺、断点暂停），
    /// dt 被钳位，避免一次 tick 吞掉大段轨迹。
    pub dt_clamp_multiplier: f64,

    /// 最大 tick 数（None 表示不限制）
    ///
    /// 用于测试或定时运行。
    pub max_ticks: Option<usize>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        LoopConfig {
            frequency_hz: 72.0,       // 默认 72Hz
            dt_clamp_multiplier: 2.0, // 默认 2x
            max_ticks: None,          // 默认不限制
        }
    }
}

/// 实时 tick 源
///
/// 使用 `spin_sleep` 实现低抖动的固定频率节拍；每帧返回实测 dt
/// （超过钳位上限时截断）。`stop_flag` 置位后下一次请求返回 `None`，
/// 用于 Ctrl+C 等宿主侧停止信号。
#[derive(Debug)]
pub struct RealtimeTicks {
    nominal_period: Duration,
    max_dt: Duration,
    max_ticks: Option<usize>,
    sleeper: spin_sleep::SpinSleeper,
    last_time: Option<Instant>,
    ticks: usize,
    stop: Arc<AtomicBool>,
}

impl RealtimeTicks {
    /// 按配置创建实时 tick 源
    pub fn new(config: LoopConfig) -> Result<Self> {
        // ✅ 输入验证
        if config.frequency_hz <= 0.0 {
            return Err(HarnessError::config(format!(
                "Invalid frequency_hz: {} (must be > 0)",
                config.frequency_hz
            )));
        }
        if config.frequency_hz > 1000.0 {
            tracing::warn!(
                "Very high tick frequency: {} Hz. No headset refreshes this fast.",
                config.frequency_hz
            );
        }
        if config.dt_clamp_multiplier <= 0.0 {
            return Err(HarnessError::config(format!(
                "Invalid dt_clamp_multiplier: {} (must be > 0)",
                config.dt_clamp_multiplier
            )));
        }

        let nominal_period = Duration::from_secs_f64(1.0 / config.frequency_hz);
        Ok(RealtimeTicks {
            nominal_period,
            max_dt: nominal_period.mul_f64(config.dt_clamp_multiplier),
            max_ticks: config.max_ticks,
            sleeper: spin_sleep::SpinSleeper::default(),
            last_time: None,
            ticks: 0,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// 停止标志（克隆给信号处理器等）
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// 已发出的 tick 数
    pub fn tick_count(&self) -> usize {
        self.ticks
    }
}

impl TickSource for RealtimeTicks {
    fn next_tick(&mut self) -> Option<Duration> {
        if self.stop.load(Ordering::Relaxed) {
            return None;
        }
        if let Some(max) = self.max_ticks
            && self.ticks >= max
        {
            return None;
        }

        let dt = match self.last_time {
            // 第一帧没有历史，按标称周期计
            None => {
                self.last_time = Some(Instant::now());
                self.nominal_period
            }
            Some(prev) => {
                self.sleeper.sleep(self.nominal_period);
                let now = Instant::now();
                let real_dt = now - prev;
                self.last_time = Some(now);

                if real_dt > self.max_dt {
                    tracing::warn!(
                        real_dt_ms = real_dt.as_millis() as u64,
                        clamped_ms = self.max_dt.as_millis() as u64,
                        "Tick time jump clamped"
                    );
                    self.max_dt
                } else {
                    real_dt
                }
            }
        };

        self.ticks += 1;
        Some(dt)
    }
}
