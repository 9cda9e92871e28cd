//! inspect 命令
//!
//! 查看录制文件的统计信息

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use reprise_engine::{TrajectoryStats, TrajectoryStore};

use super::config;

/// 查看命令参数
#[derive(Args, Debug)]
pub struct InspectCommand {
    /// 录制文件路径（缺省取最新一条）
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// 录制目录（覆盖配置）
    #[arg(long)]
    pub recordings: Option<PathBuf>,

    /// 以 JSON 输出统计
    #[arg(long)]
    pub json: bool,

    /// 只列出目录里的录制，不做统计
    #[arg(short, long)]
    pub list: bool,
}

impl InspectCommand {
    /// 执行查看
    pub async fn execute(self) -> Result<()> {
        let store = TrajectoryStore::new(config::effective_recordings_dir(self.recordings)?);

        // === 列表模式 ===

        if self.list {
            let recordings = store.list()?;
            if recordings.is_empty() {
                println!("（{} 里没有录制）", store.dir().display());
                return Ok(());
            }
            println!("📁 {}（新 → 旧）:", store.dir().display());
            for path in &recordings {
                if let Some(name) = path.file_name() {
                    println!("  📄 {}", name.to_string_lossy());
                }
            }
            return Ok(());
        }

        // === 统计模式 ===

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

        let stats = TrajectoryStats::calculate(&trajectory);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("📄 {}", path.display());
            println!("{}", stats);
        }

        Ok(())
    }
}
