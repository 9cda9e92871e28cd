//! 渲染指标采集
//!
//! 一个压力格子回放期间，每个 tick 从计数器探针读一组快照、
//! 攒进内存日志，格子收尾时整体落盘为 `RecordedData_*.csv`。
//!
//! 计数器打开失败是降级而不是致命：对应列恒为 0，通过日志和
//! [`HarnessEvent::CounterDegraded`] 报告一次，扫描继续。

use crate::error::{HarnessError, Result};
use crate::events::{EventBus, HarnessEvent};
use reprise_scene::counters::{
    COUNTER_DRAW_CALLS, COUNTER_GPU_USAGE, COUNTER_MEMORY_USED, COUNTER_TRIANGLES,
    COUNTER_VERTICES,
};
use reprise_scene::{CounterHandle, CounterSource};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// 一个 tick 的计数器读数
///
/// 打不开的计数器读作 0.0。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CounterReadings {
    pub triangles: f64,
    pub draw_calls: f64,
    pub vertices: f64,
    pub memory_bytes: f64,
    pub gpu_usage: f64,
}

/// 一个 tick 的完整指标快照
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsRow {
    /// 扫描会话时钟，秒
    pub wall_clock_s: f64,
    /// 由本 tick 时长折算的瞬时帧率
    pub fps: f64,
    pub triangles: f64,
    pub draw_calls: f64,
    pub vertices: f64,
    pub memory_bytes: f64,
    pub gpu_usage: f64,
    /// 自定义粒子效果的存活粒子数
    pub vfx_alive: u32,
    /// 内置粒子系统的粒子数
    pub builtin_count: u32,
    pub effect_active: bool,
}

impl MetricsRow {
    /// 编码为一行输出，逗号加空格分隔，无表头
    pub fn encode_line(&self) -> String {
        format!(
            "{}, {}, {}, {}, {}, {}, {}, {}, {}, {}",
            self.wall_clock_s,
            self.fps,
            self.triangles,
            self.draw_calls,
            self.vertices,
            self.memory_bytes,
            self.gpu_usage,
            self.vfx_alive,
            self.builtin_count,
            if self.effect_active { "True" } else { "False" },
        )
    }
}

/// 五个渲染计数器探针的打包
///
/// `open()` 逐个尝试打开；失败的探针缺席（读 0.0）并各报告一次。
/// Drop 时所有探针随 [`CounterHandle`] 一起关闭。
pub struct RenderProbes {
    triangles: Option<CounterHandle>,
    draw_calls: Option<CounterHandle>,
    vertices: Option<CounterHandle>,
    memory: Option<CounterHandle>,
    gpu: Option<CounterHandle>,
    degraded: usize,
}

impl RenderProbes {
    pub fn open(source: &dyn CounterSource, events: &EventBus) -> Self {
        let mut degraded = 0;
        let mut open = |id: (&'static str, &'static str)| -> Option<CounterHandle> {
            let (category, name) = id;
            match source.open(category, name) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    degraded += 1;
                    tracing::warn!(
                        category,
                        name,
                        error = %e,
                        "Counter unavailable, column reads 0"
                    );
                    events.emit(HarnessEvent::CounterDegraded {
                        category: category.to_string(),
                        name: name.to_string(),
                    });
                    None
                }
            }
        };

        let triangles = open(COUNTER_TRIANGLES);
        let draw_calls = open(COUNTER_DRAW_CALLS);
        let vertices = open(COUNTER_VERTICES);
        let memory = open(COUNTER_MEMORY_USED);
        let gpu = open(COUNTER_GPU_USAGE);

        RenderProbes {
            triangles,
            draw_calls,
            vertices,
            memory,
            gpu,
            degraded,
        }
    }

    /// 读取当前值；缺席的探针给 0.0
    pub fn read(&self) -> CounterReadings {
        let value = |probe: &Option<CounterHandle>| probe.as_ref().map_or(0.0, |p| p.last_value());
        CounterReadings {
            triangles: value(&self.triangles),
            draw_calls: value(&self.draw_calls),
            vertices: value(&self.vertices),
            memory_bytes: value(&self.memory),
            gpu_usage: value(&self.gpu),
        }
    }

    /// 打开失败的探针数
    pub fn degraded_count(&self) -> usize {
        self.degraded
    }
}

/// 单个格子的内存指标日志
#[derive(Debug, Default)]
pub struct MetricsLog {
    rows: Vec<MetricsRow>,
}

impl MetricsLog {
    pub fn new() -> Self {
        MetricsLog { rows: Vec::new() }
    }

    /// 追加一个 tick 的快照
    ///
    /// `wall_clock_s` 是扫描级会话时钟（跨格子连续），由调用方累计。
    pub fn record_tick(
        &mut self,
        wall_clock_s: f64,
        dt: Duration,
        readings: &CounterReadings,
        vfx_alive: u32,
        builtin_count: u32,
        effect_active: bool,
    ) {
        let dt_s = dt.as_secs_f64();
        let fps = if dt_s > 0.0 { 1.0 / dt_s } else { 0.0 };
        self.rows.push(MetricsRow {
            wall_clock_s,
            fps,
            triangles: readings.triangles,
            draw_calls: readings.draw_calls,
            vertices: readings.vertices,
            memory_bytes: readings.memory_bytes,
            gpu_usage: readings.gpu_usage,
            vfx_alive,
            builtin_count,
            effect_active,
        });
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[MetricsRow] {
        &self.rows
    }

    /// 落盘并清空
    ///
    /// 无论写入成败，内存日志都被清空：下一个格子从空日志开始。
    /// 返回写入的行数。
    pub fn flush_to(&mut self, path: &Path) -> Result<usize> {
        let rows = std::mem::take(&mut self.rows);
        let write = |path: &Path| -> std::io::Result<()> {
            let file = File::create(path)?;
            let mut writer = BufWriter::new(file);
            for row in &rows {
                writeln!(writer, "{}", row.encode_line())?;
            }
            writer.flush()
        };
        write(path).map_err(|source| HarnessError::WriteFailure {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), rows = rows.len(), "Metrics flushed");
        Ok(rows.len())
    }
}
