//! record 命令
//!
//! 录制一条锚点相对的头部轨迹到 CSV

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tokio::task::spawn_blocking;

use reprise_engine::{
    EventBus, FixedTicks, HarnessEvent, LoopConfig, PoseRecorder, RealtimeTicks, TickSource,
};
use reprise_scene::mock::MockScene;
use reprise_scene::negotiate_refresh_rate;

use super::config;

/// 录制命令参数
#[derive(Args, Debug)]
pub struct RecordCommand {
    /// 录制时长（秒）
    #[arg(short, long, default_value_t = 10.0)]
    pub duration: f64,

    /// 采样频率 Hz（覆盖配置）
    #[arg(long)]
    pub hz: Option<f64>,

    /// 输出目录（覆盖配置）
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 确定性模式：固定步长一口气跑完，不等真实时钟
    #[arg(long)]
    pub dry_run: bool,
}

impl RecordCommand {
    /// 执行录制
    pub async fn execute(self) -> Result<()> {
        // === 1. 参数验证 ===

        if self.duration <= 0.0 {
            anyhow::bail!("❌ 时长必须为正数，当前: {:.2}", self.duration);
        }
        if matches!(self.hz, Some(hz) if hz <= 0.0) {
            anyhow::bail!("❌ 频率必须为正数");
        }

        let hz = config::effective_frequency(self.hz)?;
        let output_dir = config::effective_recordings_dir(self.output)?;
        let tick_count = (self.duration * hz).ceil() as usize;

        // === 2. 显示录制信息 ===

        println!("════════════════════════════════════════");
        println!("           录制模式");
        println!("════════════════════════════════════════");
        println!();
        println!("📁 输出目录: {}", output_dir.display());
        println!(
            "⏱️  时长: {:.1} 秒 @ {:.0} Hz（{} tick）",
            self.duration, hz, tick_count
        );
        if self.dry_run {
            println!("🧪 dry-run: 固定步长，立即完成");
        }
        println!();

        // === 3. 搭建场景与录制器 ===

        let scene = MockScene::new();

        // 启动时一次性协商 HMD 刷新率，失败只降级
        if let Some(rate) = negotiate_refresh_rate(scene.display.as_ref(), Some(hz)) {
            println!("🖥️  显示刷新率: {rate:.0} Hz");
        }

        let (events, rx) = EventBus::channel();
        let recorder = PoseRecorder::new(&scene.rig(), &output_dir, events);

        // === 4. tick 源 ===

        let ticks: Box<dyn TickSource + Send> = if self.dry_run {
            Box::new(FixedTicks::at_hz(hz, tick_count))
        } else {
            let realtime = RealtimeTicks::new(LoopConfig {
                frequency_hz: hz,
                max_ticks: Some(tick_count),
                ..LoopConfig::default()
            })?;

            // 注册 Ctrl-C：置位停止标志后下一个 tick 返回 None
            let stop = realtime.stop_flag();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    println!();
                    println!("🛑 收到停止信号，正在保存已录内容...");
                    stop.store(true, Ordering::Relaxed);
                }
            });

            println!("💡 提示: 按 Ctrl-C 可提前结束（已录内容仍会保存）");
            println!();

            Box::new(realtime)
        };

        // === 5. 在专用线程中驱动录制循环 ===

        let saved = spawn_blocking(move || Self::record_sync(scene, recorder, ticks))
            .await
            .context("录制任务失败")?;

        // === 6. 汇报结果 ===

        // 录制器（连同事件发送端）已随线程结束销毁，接收端会把事件吐完
        for event in rx {
            match event {
                HarnessEvent::RecordingSaved { samples, .. } => {
                    println!("💾 {} 个采样已写盘", samples);
                }
                HarnessEvent::WriteFailed { path, detail } => {
                    println!("❌ 写入失败 {}: {}", path.display(), detail);
                }
                _ => {}
            }
        }

        match saved {
            Some(path) => {
                println!();
                println!("✅ 录制完成: {}", path.display());
                Ok(())
            }
            None => anyhow::bail!("❌ 录制未能保存，详见上方日志"),
        }
    }

    /// 同步录制循环（在专用线程中运行）
    ///
    /// 每个 tick 先推进场景再采样，最后 disarm 落盘。
    fn record_sync(
        scene: MockScene,
        mut recorder: PoseRecorder,
        mut ticks: Box<dyn TickSource + Send>,
    ) -> Option<PathBuf> {
        recorder.arm();
        while let Some(dt) = ticks.next_tick() {
            scene.advance(dt.as_secs_f64());
            recorder.sample_tick(dt);
        }
        recorder.disarm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_command_defaults() {
        let cmd = RecordCommand {
            duration: 10.0,
            hz: None,
            output: None,
            dry_run: false,
        };

        assert_eq!(cmd.duration, 10.0);
        assert!(cmd.hz.is_none());
        assert!(!cmd.dry_run);
    }

    #[test]
    fn test_dry_run_record_produces_file() {
        let dir = tempfile::tempdir().unwrap();
        let scene = MockScene::new();
        let (events, _rx) = EventBus::channel();
        let recorder = PoseRecorder::new(&scene.rig(), dir.path(), events);
        let ticks: Box<dyn TickSource + Send> = Box::new(FixedTicks::at_hz(72.0, 36));

        let saved = RecordCommand::record_sync(scene, recorder, ticks);

        let path = saved.unwrap();
        assert!(path.exists());
        assert!(path.file_name().unwrap().to_str().unwrap().starts_with("MovementData_"));
    }
}
