//! sweep 命令
//!
//! 在最新录制上跑全因子效果扫描，每格产出一份渲染指标 CSV

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tokio::task::spawn_blocking;

use reprise_engine::{
    EventBus, FixedTicks, HarnessEvent, LoopConfig, RealtimeTicks, SweepConfig, SweepController,
    TickSource, TrajectoryStore,
};
use reprise_scene::mock::MockScene;
use reprise_scene::negotiate_refresh_rate;

use super::config;

/// 扫描命令参数
#[derive(Args, Debug)]
pub struct SweepCommand {
    /// 录制目录（覆盖配置）
    #[arg(long)]
    pub recordings: Option<PathBuf>,

    /// 指标输出目录（覆盖配置）
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 每个效果×环境组合的重复次数
    #[arg(short, long)]
    pub repetitions: Option<u32>,

    /// 单元间冷却时长（秒）
    #[arg(long)]
    pub cooldown: Option<f64>,

    /// tick 频率 Hz（覆盖配置）
    #[arg(long)]
    pub hz: Option<f64>,

    /// 确定性模式：固定步长一口气跑完，不等真实时钟
    #[arg(long)]
    pub dry_run: bool,

    /// 不写扫描清单 JSON
    #[arg(long)]
    pub no_manifest: bool,
}

impl SweepCommand {
    /// 执行扫描
    pub async fn execute(self) -> Result<()> {
        if matches!(self.hz, Some(hz) if hz <= 0.0) {
            anyhow::bail!("❌ 频率必须为正数");
        }
        let hz = config::effective_frequency(self.hz)?;
        let recordings_dir = config::effective_recordings_dir(self.recordings)?;
        let output_dir = config::effective_output_dir(self.output)?;

        // === 1. 组装扫描配置 ===

        let mut sweep_config = SweepConfig::new(&output_dir);
        if let Some(repetitions) = self.repetitions {
            sweep_config.repetitions = repetitions;
        }
        if let Some(cooldown) = self.cooldown {
            sweep_config.cooldown_s = cooldown;
        }
        sweep_config.write_manifest = !self.no_manifest;

        let total = sweep_config.cells().len();

        // === 2. 显示扫描信息 ===

        println!("════════════════════════════════════════");
        println!("           压力扫描模式");
        println!("════════════════════════════════════════");
        println!();
        println!("📁 录制目录: {}", recordings_dir.display());
        println!("📁 输出目录: {}", output_dir.display());
        println!(
            "🧪 {} 个单元（{} 次重复），冷却 {:.1} 秒",
            total, sweep_config.repetitions, sweep_config.cooldown_s
        );
        if self.dry_run {
            println!("🧪 dry-run: 固定步长，立即完成");
        }
        println!();

        // === 3. 场景、控制器与事件打印线程 ===

        let scene = MockScene::new();

        // 启动时一次性协商 HMD 刷新率，失败只降级
        if let Some(rate) = negotiate_refresh_rate(scene.display.as_ref(), Some(hz)) {
            println!("🖥️  显示刷新率: {rate:.0} Hz");
        }

        let (events, rx) = EventBus::channel();
        let controller = SweepController::new(sweep_config, scene.rig(), events)?;
        let store = TrajectoryStore::new(&recordings_dir);

        let printer = std::thread::spawn(move || {
            for event in rx {
                match event {
                    HarnessEvent::CellStarted {
                        index,
                        total,
                        label,
                    } => {
                        println!("▶ [{}/{}] {}", index + 1, total, label);
                    }
                    HarnessEvent::CellCompleted { output, rows, .. } => match output {
                        Some(path) => println!("  ✅ {} 行 → {}", rows, path.display()),
                        None => println!("  ⚠️  {} 行，未产出文件", rows),
                    },
                    HarnessEvent::CounterDegraded { category, name } => {
                        println!("  ⚠️  计数器不可用: {}/{}（该列记 0）", category, name);
                    }
                    HarnessEvent::WriteFailed { path, detail } => {
                        println!("  ❌ 写入失败 {}: {}", path.display(), detail);
                    }
                    HarnessEvent::SweepInterrupted { completed_cells } => {
                        println!("🛑 扫描中断，已完成 {} 个单元", completed_cells);
                    }
                    _ => {}
                }
            }
        });

        // === 4. tick 源 ===

        let ticks: Box<dyn TickSource + Send> = if self.dry_run {
            Box::new(FixedTicks::at_hz(hz, usize::MAX))
        } else {
            let realtime = RealtimeTicks::new(LoopConfig {
                frequency_hz: hz,
                ..LoopConfig::default()
            })?;

            let stop = realtime.stop_flag();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    println!();
                    println!("🛑 收到停止信号，正在恢复场景...");
                    stop.store(true, Ordering::Relaxed);
                }
            });

            println!("💡 提示: 按 Ctrl-C 可随时中断，场景会恢复原状");
            println!();

            Box::new(realtime)
        };

        // === 5. 在专用线程中跑完整个扫描 ===

        let result = spawn_blocking(move || {
            let mut ticks = ticks;
            controller.run(&store, ticks.as_mut())
        })
        .await
        .context("扫描任务失败")?;

        // 控制器（事件发送端）已销毁，打印线程会把剩余事件吐完后退出
        let _ = printer.join();

        // === 6. 汇报结果 ===

        match result {
            Ok(summary) => {
                println!();
                println!("✅ 扫描完成: {} 个单元", summary.cells_completed);
                println!("   指标文件: {} 份", summary.outputs.len());
                if let Some(manifest) = &summary.manifest {
                    println!("   清单: {}", manifest.display());
                }
                Ok(())
            }
            Err(e) if e.is_interruption() => {
                // 中断不是错误，场景已由控制器恢复
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e).context("扫描失败")),
        }
    }
}
