//! # Reprise CLI
//!
//! VR 轨迹实验引擎的命令行入口。场景用内存 mock 驱动，
//! 录制、回放、压力扫描的完整流水线都能在桌面上跑通。
//!
//! ## 典型流程
//!
//! ```bash
//! # 配置默认目录
//! reprise config set --recordings ~/reprise/recordings
//!
//! # 录一条 10 秒的轨道运动
//! reprise record --duration 10
//!
//! # 看看录了什么
//! reprise inspect
//!
//! # 最新录制上跑全因子扫描（18 格）
//! reprise sweep
//!
//! # CI / 快速验证：确定步长，毫秒级跑完
//! reprise sweep --dry-run
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{ConfigCommand, InspectCommand, RecordCommand, ReplayCommand, SweepCommand};

/// Reprise CLI - 轨迹录制/回放/压力扫描工具
#[derive(Parser, Debug)]
#[command(name = "reprise")]
#[command(about = "Anchor-relative trajectory recording, replay and effect sweeps", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 录制一条锚点相对轨迹
    Record {
        #[command(flatten)]
        args: RecordCommand,
    },

    /// 回放一条录制
    Replay {
        #[command(flatten)]
        args: ReplayCommand,
    },

    /// 在最新录制上跑全因子压力扫描
    Sweep {
        #[command(flatten)]
        args: SweepCommand,
    },

    /// 查看录制的统计信息
    Inspect {
        #[command(flatten)]
        args: InspectCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("reprise_cli=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(cmd) => {
            // One-shot 模式：配置管理
            cmd.execute().await
        }

        Commands::Record { args } => {
            // One-shot 模式：录制
            args.execute().await
        }

        Commands::Replay { args } => {
            // One-shot 模式：回放
            args.execute().await
        }

        Commands::Sweep { args } => {
            // One-shot 模式：压力扫描
            args.execute().await
        }

        Commands::Inspect { args } => {
            // One-shot 模式：统计查看
            args.execute().await
        }
    }
}
