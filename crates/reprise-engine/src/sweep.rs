//! 压力扫描控制器
//!
//! 在一条已录制的轨迹上跑满 {效果变体} × {环境模式} × {重复次数}
//! 的全因子格子（默认 3 × 2 × 3 = 18 格），每格回放一遍轨迹、
//! 线性抬升粒子发射率、逐 tick 采集渲染指标并落盘。
//!
//! # 单格生命周期
//!
//! `Configuring → Recording → Replaying → Flushing → CoolingDown`
//!
//! - **Configuring**：关头部追踪、移动帧回到锚点原点、互斥地启动
//!   本格效果、切环境模式
//! - **Recording**：打开五个渲染计数器探针，新建内存指标日志
//! - **Replaying**：每 tick 固定顺序「读指标 → 调发射率 → 推位姿」，
//!   直到回放走完
//! - **Flushing**：先关探针再落盘 `RecordedData_*.csv`；写失败降级
//! - **CoolingDown**：停掉所有效果，静置 `cooldown_s` 的 tick 时间
//!
//! # 中断与收尾
//!
//! tick 源提前耗尽（宿主拆除）返回 [`HarnessError::Interrupted`]。
//! 无论从哪一格的哪一相退出，RAII 守卫都会停效果、恢复移动帧的
//! 原始局部位姿、重开头部追踪；探针和内存日志随所有权一起释放。

use crate::error::{HarnessError, Result};
use crate::events::{EventBus, HarnessEvent};
use crate::metrics::{MetricsLog, RenderProbes};
use crate::naming;
use crate::ramp::EmissionRamp;
use crate::replayer::{ReplayStatus, Replayer};
use crate::session::TickSource;
use crate::store::TrajectoryStore;
use reprise_core::{Pose, Trajectory};
use reprise_scene::{EffectVariant, EnvironmentMode, Rig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// 每个（效果 × 环境）组合的发射率上限
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RateCeilings {
    pub vfx_immersive: f64,
    pub vfx_passthrough: f64,
    pub builtin_immersive: f64,
    pub builtin_passthrough: f64,
}

impl Default for RateCeilings {
    fn default() -> Self {
        RateCeilings {
            vfx_immersive: 2000.0,
            vfx_passthrough: 1200.0,
            builtin_immersive: 1500.0,
            builtin_passthrough: 900.0,
        }
    }
}

impl RateCeilings {
    /// 格子对应的上限；`None` 变体没有发射率，恒为 0
    pub fn for_cell(&self, effect: EffectVariant, environment: EnvironmentMode) -> f64 {
        match (effect, environment) {
            (EffectVariant::Vfx, EnvironmentMode::Immersive) => self.vfx_immersive,
            (EffectVariant::Vfx, EnvironmentMode::Passthrough) => self.vfx_passthrough,
            (EffectVariant::Builtin, EnvironmentMode::Immersive) => self.builtin_immersive,
            (EffectVariant::Builtin, EnvironmentMode::Passthrough) => self.builtin_passthrough,
            (EffectVariant::None, _) => 0.0,
        }
    }

    fn validate(&self) -> Result<()> {
        let all = [
            self.vfx_immersive,
            self.vfx_passthrough,
            self.builtin_immersive,
            self.builtin_passthrough,
        ];
        if all.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(HarnessError::config("rate ceilings must be finite and >= 0"));
        }
        Ok(())
    }
}

/// 扫描参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// 每个（效果 × 环境）组合重复几遍
    pub repetitions: u32,
    /// 格子之间的静置时长，tick 时间，秒
    pub cooldown_s: f64,
    /// 每格开始时的粒子发射率
    pub particle_start_rate: f64,
    /// 发射率从起始值爬到上限用的时间，秒
    pub time_to_increase_particles_s: f64,
    pub ceilings: RateCeilings,
    /// CSV 与清单的输出目录
    pub output_dir: PathBuf,
    /// 扫描结束后是否写 `SweepManifest_*.json`
    pub write_manifest: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            repetitions: 3,
            cooldown_s: 5.0,
            particle_start_rate: 100.0,
            time_to_increase_particles_s: 10.0,
            ceilings: RateCeilings::default(),
            output_dir: PathBuf::from("recordings"),
            write_manifest: true,
        }
    }
}

impl SweepConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        SweepConfig {
            output_dir: output_dir.into(),
            ..SweepConfig::default()
        }
    }

    /// 校验参数；非法值返回 [`HarnessError::Config`]
    pub fn validate(&self) -> Result<()> {
        if self.repetitions == 0 {
            return Err(HarnessError::config("repetitions must be >= 1"));
        }
        if !self.cooldown_s.is_finite() || self.cooldown_s < 0.0 {
            return Err(HarnessError::config("cooldown_s must be finite and >= 0"));
        }
        if !self.particle_start_rate.is_finite() || self.particle_start_rate < 0.0 {
            return Err(HarnessError::config(
                "particle_start_rate must be finite and >= 0",
            ));
        }
        if !self.time_to_increase_particles_s.is_finite() || self.time_to_increase_particles_s < 0.0
        {
            return Err(HarnessError::config(
                "time_to_increase_particles_s must be finite and >= 0",
            ));
        }
        self.ceilings.validate()
    }

    /// 发射率爬坡时长
    pub fn ramp_time(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.time_to_increase_particles_s)
    }

    /// 固定顺序展开全部格子：效果最外、环境居中、重复最内
    pub fn cells(&self) -> Vec<SweepCell> {
        let mut cells =
            Vec::with_capacity(EffectVariant::ALL.len() * EnvironmentMode::ALL.len() * self.repetitions as usize);
        for effect in EffectVariant::ALL {
            for environment in EnvironmentMode::ALL {
                for repetition in 0..self.repetitions {
                    cells.push(SweepCell {
                        effect,
                        environment,
                        repetition,
                    });
                }
            }
        }
        cells
    }
}

/// 全因子设计中的一个格子
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepCell {
    pub effect: EffectVariant,
    pub environment: EnvironmentMode,
    /// 同组合内的第几遍，0 起算
    pub repetition: u32,
}

impl SweepCell {
    pub fn label(&self) -> String {
        format!(
            "{} / {} / rep {}",
            self.effect,
            self.environment,
            self.repetition + 1
        )
    }
}

/// 单格内部的相位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellPhase {
    Configuring,
    Recording,
    Replaying,
    Flushing,
    CoolingDown,
}

impl fmt::Display for CellPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CellPhase::Configuring => "Configuring",
            CellPhase::Recording => "Recording",
            CellPhase::Replaying => "Replaying",
            CellPhase::Flushing => "Flushing",
            CellPhase::CoolingDown => "CoolingDown",
        };
        write!(f, "{name}")
    }
}

/// 单格执行上下文：相位推进只通过 [`CellRun::enter`]
struct CellRun {
    label: String,
    phase: CellPhase,
}

impl CellRun {
    fn new(label: String) -> Self {
        CellRun {
            label,
            phase: CellPhase::Configuring,
        }
    }

    fn enter(&mut self, next: CellPhase) {
        tracing::debug!(cell = %self.label, from = %self.phase, to = %next, "Cell phase");
        self.phase = next;
    }
}

/// 清单里的一格记录
#[derive(Debug, Clone, Serialize)]
pub struct CellReport {
    pub effect: String,
    pub environment: String,
    pub repetition: u32,
    /// 成功落盘的文件名；写失败时为 `None`
    pub output_file: Option<String>,
    pub rows: usize,
    pub ticks: usize,
}

/// 扫描结束后写出的清单
#[derive(Debug, Serialize)]
pub struct SweepManifest {
    pub created: String,
    pub trajectory_samples: usize,
    pub trajectory_duration_s: f64,
    pub cells: Vec<CellReport>,
}

/// `run` 的返回值
#[derive(Debug)]
pub struct SweepSummary {
    pub cells_completed: usize,
    pub outputs: Vec<PathBuf>,
    pub manifest: Option<PathBuf>,
}

/// 扫描收尾守卫
///
/// 无论正常完成还是中途拆除，都把场景恢复到扫描前的状态。
struct SweepGuard<'a> {
    rig: &'a Rig,
    mover_local: Pose,
}

impl<'a> SweepGuard<'a> {
    fn new(rig: &'a Rig) -> Self {
        SweepGuard {
            rig,
            mover_local: rig.mover.local_pose(),
        }
    }
}

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.rig.stop_all_effects();
        self.rig.mover.set_local_pose(self.mover_local);
        self.rig.stage.set_head_tracking(true);
        tracing::debug!("Sweep teardown: effects stopped, head tracking restored");
    }
}

/// 扫描控制器
pub struct SweepController {
    config: SweepConfig,
    rig: Rig,
    events: EventBus,
}

impl SweepController {
    pub fn new(config: SweepConfig, rig: Rig, events: EventBus) -> Result<Self> {
        config.validate()?;
        Ok(SweepController {
            config,
            rig,
            events,
        })
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// 加载最新录制并跑完整个扫描
    ///
    /// 轨迹加载失败在进入第一格之前就以致命错误返回。
    pub fn run(&self, store: &TrajectoryStore, ticks: &mut dyn TickSource) -> Result<SweepSummary> {
        let trajectory = store.load_latest()?;
        self.run_with_trajectory(&trajectory, ticks)
    }

    /// 在给定轨迹上跑完整个扫描
    pub fn run_with_trajectory(
        &self,
        trajectory: &Trajectory,
        ticks: &mut dyn TickSource,
    ) -> Result<SweepSummary> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let cells = self.config.cells();
        let total = cells.len();
        tracing::info!(
            cells = total,
            samples = trajectory.sample_count(),
            duration_s = trajectory.duration(),
            "Sweep starting"
        );

        let guard = SweepGuard::new(&self.rig);
        let mut clock = 0.0_f64;
        let mut reports: Vec<CellReport> = Vec::with_capacity(total);
        let mut outputs = Vec::new();

        for (index, cell) in cells.iter().enumerate() {
            let label = cell.label();
            self.rig
                .stage
                .set_status_text(&format!("Cell {}/{}: {}", index + 1, total, label));
            self.events.emit(HarnessEvent::CellStarted {
                index,
                total,
                label: label.clone(),
            });

            match self.run_cell(cell, trajectory, ticks, &mut clock) {
                Ok(report) => {
                    let output = report
                        .output_file
                        .as_ref()
                        .map(|name| self.config.output_dir.join(name));
                    if let Some(path) = &output {
                        outputs.push(path.clone());
                    }
                    self.events.emit(HarnessEvent::CellCompleted {
                        index,
                        label,
                        output,
                        rows: report.rows,
                    });
                    reports.push(report);
                }
                Err(e) if e.is_interruption() => {
                    tracing::warn!(
                        completed = reports.len(),
                        total,
                        "Sweep interrupted by host teardown"
                    );
                    self.rig.stage.set_status_text("Sweep interrupted");
                    self.events.emit(HarnessEvent::SweepInterrupted {
                        completed_cells: reports.len(),
                    });
                    return Err(e);
                }
                Err(e) => return Err(e),
            }
        }

        // 先恢复场景（头部追踪、移动帧），清单在恢复后的场景上写
        drop(guard);

        let manifest = if self.config.write_manifest {
            self.write_manifest(trajectory, &reports)
        } else {
            None
        };

        self.rig.stage.set_status_text("Sweep complete");
        self.events.emit(HarnessEvent::SweepCompleted {
            cells: reports.len(),
            manifest: manifest.clone(),
        });
        tracing::info!(cells = reports.len(), "Sweep complete");

        Ok(SweepSummary {
            cells_completed: reports.len(),
            outputs,
            manifest,
        })
    }

    fn run_cell(
        &self,
        cell: &SweepCell,
        trajectory: &Trajectory,
        ticks: &mut dyn TickSource,
        clock: &mut f64,
    ) -> Result<CellReport> {
        let mut run = CellRun::new(cell.label());

        // Configuring：追踪关掉后移动帧归属引擎，回放从锚点原点出发
        self.rig.stage.set_head_tracking(false);
        self.rig.mover.set_local_pose(Pose::IDENTITY);
        self.rig.stop_all_effects();
        let effect = self.rig.effect(cell.effect);
        if let Some(effect) = effect {
            effect.set_emission_rate(self.config.particle_start_rate);
            effect.play();
        }
        self.rig.stage.set_environment(cell.environment);

        run.enter(CellPhase::Recording);
        let probes = RenderProbes::open(self.rig.counters.as_ref(), &self.events);
        let mut log = MetricsLog::new();

        run.enter(CellPhase::Replaying);
        let mut replayer = Replayer::new(trajectory, &self.rig);
        let ceiling = self.config.ceilings.for_cell(cell.effect, cell.environment);
        let mut ramp = EmissionRamp::new(
            self.config.particle_start_rate,
            ceiling,
            self.config.ramp_time(),
        );
        let mut tick_count = 0usize;

        loop {
            let Some(dt) = ticks.next_tick() else {
                return Err(HarnessError::Interrupted);
            };
            *clock += dt.as_secs_f64();
            tick_count += 1;

            // 每 tick 固定顺序：读指标 → 调发射率 → 推位姿
            let readings = probes.read();
            log.record_tick(
                *clock,
                dt,
                &readings,
                self.rig.vfx.alive_count(),
                self.rig.builtin.alive_count(),
                effect.is_some_and(|e| e.is_active()),
            );

            if let Some(effect) = effect {
                effect.set_emission_rate(ramp.advance(dt));
            }

            if replayer.tick(dt) == ReplayStatus::Finished {
                break;
            }
        }

        run.enter(CellPhase::Flushing);
        // 探针先关再写盘
        drop(probes);
        let rows = log.len();
        let path = naming::unique_stamped_path(&self.config.output_dir, |stamp| {
            naming::metrics_file_name(cell.effect, cell.environment, stamp)
        });
        let output_file = match log.flush_to(&path) {
            Ok(_) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            Err(e) => {
                tracing::warn!(cell = %run.label, error = %e, "Cell metrics lost");
                self.rig
                    .stage
                    .set_status_text(&format!("Write failed: {}", path.display()));
                self.events.emit(HarnessEvent::WriteFailed {
                    path,
                    detail: e.to_string(),
                });
                None
            }
        };

        run.enter(CellPhase::CoolingDown);
        self.rig.stop_all_effects();
        let mut settled = 0.0;
        while settled < self.config.cooldown_s {
            let Some(dt) = ticks.next_tick() else {
                return Err(HarnessError::Interrupted);
            };
            *clock += dt.as_secs_f64();
            settled += dt.as_secs_f64();
        }

        Ok(CellReport {
            effect: cell.effect.to_string(),
            environment: cell.environment.to_string(),
            repetition: cell.repetition,
            output_file,
            rows,
            ticks: tick_count,
        })
    }

    /// 写扫描清单；失败降级为 `None`
    fn write_manifest(&self, trajectory: &Trajectory, reports: &[CellReport]) -> Option<PathBuf> {
        let manifest = SweepManifest {
            created: chrono::Local::now().to_rfc3339(),
            trajectory_samples: trajectory.sample_count(),
            trajectory_duration_s: trajectory.duration(),
            cells: reports.to_vec(),
        };
        let path = naming::unique_stamped_path(&self.config.output_dir, naming::manifest_file_name);

        let write = || -> std::io::Result<()> {
            let file = File::create(&path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &manifest)?;
            writer.flush()
        };
        match write() {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Sweep manifest written");
                Some(path)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Manifest write failed");
                self.events.emit(HarnessEvent::WriteFailed {
                    path,
                    detail: e.to_string(),
                });
                None
            }
        }
    }
}
