//! replay 命令
//!
//! 把一条录制重新驱动到场景的移动帧上

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tokio::task::spawn_blocking;

use reprise_core::Trajectory;
use reprise_engine::{
    FixedTicks, LoopConfig, RealtimeTicks, ReplayStatus, Replayer, TickSource, TrajectoryStats,
    TrajectoryStore,
};
use reprise_scene::mock::MockScene;
use reprise_scene::{Stage, negotiate_refresh_rate};

use super::config;

/// 回放命令参数
#[derive(Args, Debug)]
pub struct ReplayCommand {
    /// 录制文件路径（缺省取最新一条）
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// 录制目录（覆盖配置）
    #[arg(long)]
    pub recordings: Option<PathBuf>,

    /// 回放频率 Hz（覆盖配置）
    #[arg(long)]
    pub hz: Option<f64>,

    /// 确定性模式：固定步长一口气跑完，不等真实时钟
    #[arg(long)]
    pub dry_run: bool,
}

impl ReplayCommand {
    /// 执行回放
    pub async fn execute(self) -> Result<()> {
        if matches!(self.hz, Some(hz) if hz <= 0.0) {
            anyhow::bail!("❌ 频率必须为正数");
        }
        let hz = config::effective_frequency(self.hz)?;

        // === 1. 加载轨迹 ===

        let store = TrajectoryStore::new(config::effective_recordings_dir(self.recordings)?);
        let (path, trajectory) = match self.input {
            Some(path) => {
                let trajectory = store.load_path(&path)?;
                (path, trajectory)
            }
            None => {
                let path = store
                    .list()?
                    .into_iter()
                    .next()
                    .with_context(|| format!("❌ {} 里没有录制", store.dir().display()))?;
                let trajectory = store.load_path(&path)?;
                (path, trajectory)
            }
        };

        // === 2. 显示回放信息 ===

        let stats = TrajectoryStats::calculate(&trajectory);

        println!("════════════════════════════════════════");
        println!("           回放模式");
        println!("════════════════════════════════════════");
        println!();
        println!("📁 文件: {}", path.display());
        println!("{}", stats);
        println!();
        if self.dry_run {
            println!("🧪 dry-run: 固定步长，立即完成");
            println!();
        }

        // === 3. tick 源 ===

        let ticks: Box<dyn TickSource + Send> = if self.dry_run {
            let tick_count = (trajectory.duration() * hz).ceil() as usize + 2;
            Box::new(FixedTicks::at_hz(hz, tick_count))
        } else {
            let realtime = RealtimeTicks::new(LoopConfig {
                frequency_hz: hz,
                ..LoopConfig::default()
            })?;

            let stop = realtime.stop_flag();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    println!();
                    println!("🛑 收到停止信号，正在退出回放...");
                    stop.store(true, Ordering::Relaxed);
                }
            });

            println!("💡 提示: 按 Ctrl-C 可随时停止回放");
            println!();

            Box::new(realtime)
        };

        // === 4. 在专用线程中驱动回放循环 ===

        let scene = MockScene::new();

        // 启动时一次性协商 HMD 刷新率，失败只降级
        if let Some(rate) = negotiate_refresh_rate(scene.display.as_ref(), Some(hz)) {
            println!("🖥️  显示刷新率: {rate:.0} Hz");
        }

        let finished = spawn_blocking(move || Self::replay_sync(trajectory, scene, ticks))
            .await
            .context("回放任务失败")?;

        println!();
        if finished {
            println!("✅ 回放完成");
        } else {
            println!("🛑 回放已中止");
        }

        Ok(())
    }

    /// 同步回放循环（在专用线程中运行）
    ///
    /// 返回 `true` 表示走完整条轨迹，`false` 表示被停止信号打断。
    fn replay_sync(
        trajectory: Trajectory,
        scene: MockScene,
        mut ticks: Box<dyn TickSource + Send>,
    ) -> bool {
        // 回放期间头部归回放器所有
        scene.stage.set_head_tracking(false);

        let rig = scene.rig();
        let mut replayer = Replayer::new(&trajectory, &rig);
        let mut next_mark = 0.0;

        let finished = loop {
            let Some(dt) = ticks.next_tick() else {
                break false;
            };
            scene.advance(dt.as_secs_f64());
            let status = replayer.tick(dt);

            if replayer.progress() >= next_mark {
                print!("\r🔄 回放进度: {:3.0}%", replayer.progress() * 100.0);
                use std::io::Write;
                std::io::stdout().flush().ok();
                next_mark += 0.1;
            }
            if status == ReplayStatus::Finished {
                break true;
            }
        };

        scene.stage.set_head_tracking(true);
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_command_defaults() {
        let cmd = ReplayCommand {
            input: None,
            recordings: None,
            hz: None,
            dry_run: false,
        };

        assert!(cmd.input.is_none());
        assert!(!cmd.dry_run);
    }

    #[test]
    fn test_replay_sync_reaches_end() {
        use reprise_core::{PoseSample, Position3D, Quaternion};

        let samples = vec![
            PoseSample::new(0.0, Position3D::ZERO, Quaternion::IDENTITY),
            PoseSample::new(0.5, Position3D::new(1.0, 0.0, 0.0), Quaternion::IDENTITY),
        ];
        let trajectory = Trajectory::new(samples).unwrap();
        let scene = MockScene::new();
        let ticks: Box<dyn TickSource + Send> = Box::new(FixedTicks::at_hz(72.0, 72));

        assert!(ReplayCommand::replay_sync(trajectory, scene, ticks));
    }

    #[test]
    fn test_replay_sync_interrupted_by_exhausted_ticks() {
        use reprise_core::{PoseSample, Position3D, Quaternion};

        let samples = vec![
            PoseSample::new(0.0, Position3D::ZERO, Quaternion::IDENTITY),
            PoseSample::new(10.0, Position3D::new(1.0, 0.0, 0.0), Quaternion::IDENTITY),
        ];
        let trajectory = Trajectory::new(samples).unwrap();
        let scene = MockScene::new();
        let ticks: Box<dyn TickSource + Send> = Box::new(FixedTicks::at_hz(72.0, 3));

        assert!(!ReplayCommand::replay_sync(trajectory, scene, ticks));
    }
}
