//! 配置管理命令
//!
//! 管理 CLI 的持久配置（录制目录、输出目录、默认频率）。
//! 配置存在平台配置目录下的 `reprise/config.toml`。

use anyhow::{Context, Result};
use clap::Subcommand;
use std::fs;
use std::path::PathBuf;

/// 配置文件路径
fn config_dir() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;

    path.push("reprise");
    Ok(path)
}

fn config_file() -> Result<PathBuf> {
    let mut path = config_dir()?;
    fs::create_dir_all(&path).context("创建配置目录失败")?;

    path.push("config.toml");
    Ok(path)
}

/// CLI 配置
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CliConfig {
    /// 录制文件目录
    pub recordings_dir: Option<PathBuf>,

    /// 扫描输出目录（缺省与录制目录相同）
    pub output_dir: Option<PathBuf>,

    /// 默认 tick 频率（Hz）
    pub frequency_hz: Option<f64>,
}

impl CliConfig {
    /// 加载配置
    pub fn load() -> Result<Self> {
        let path = config_file()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).context("读取配置文件失败")?;
        toml::from_str(&content).context("解析配置文件失败")
    }

    /// 保存配置
    fn save(&self) -> Result<()> {
        let path = config_file()?;
        let content = toml::to_string_pretty(self).context("序列化配置失败")?;

        fs::write(&path, content).context("写入配置文件失败")?;
        Ok(())
    }
}

/// 解析录制目录：命令行参数 > 配置文件 > `./recordings`
pub fn effective_recordings_dir(overriding: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = overriding {
        return Ok(dir);
    }
    Ok(CliConfig::load()?
        .recordings_dir
        .unwrap_or_else(|| PathBuf::from("recordings")))
}

/// 解析输出目录：命令行参数 > 配置文件 > 录制目录
pub fn effective_output_dir(overriding: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = overriding {
        return Ok(dir);
    }
    let config = CliConfig::load()?;
    if let Some(dir) = config.output_dir {
        return Ok(dir);
    }
    Ok(config
        .recordings_dir
        .unwrap_or_else(|| PathBuf::from("recordings")))
}

/// 解析 tick 频率：命令行参数 > 配置文件 > 72 Hz
pub fn effective_frequency(overriding: Option<f64>) -> Result<f64> {
    if let Some(hz) = overriding {
        return Ok(hz);
    }
    Ok(CliConfig::load()?.frequency_hz.unwrap_or(72.0))
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 设置配置项
    Set {
        /// 录制文件目录
        #[arg(long)]
        recordings: Option<PathBuf>,

        /// 扫描输出目录
        #[arg(long)]
        output: Option<PathBuf>,

        /// 默认 tick 频率（Hz）
        #[arg(long)]
        hz: Option<f64>,
    },

    /// 获取配置项
    Get {
        /// 配置项名称
        #[arg(default_value = "all")]
        key: String,
    },

    /// 检查配置
    Check,
}

impl ConfigCommand {
    pub async fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Set {
                recordings,
                output,
                hz,
            } => Self::set_(recordings, output, hz).await,

            ConfigCommand::Get { key } => Self::get_(key).await,

            ConfigCommand::Check => Self::check_().await,
        }
    }

    async fn set_(
        recordings: Option<PathBuf>,
        output: Option<PathBuf>,
        hz: Option<f64>,
    ) -> Result<()> {
        let mut config = CliConfig::load()?;

        if let Some(dir) = recordings {
            println!("✅ 设置录制目录: {}", dir.display());
            config.recordings_dir = Some(dir);
        }

        if let Some(dir) = output {
            println!("✅ 设置输出目录: {}", dir.display());
            config.output_dir = Some(dir);
        }

        if let Some(hz) = hz {
            if hz <= 0.0 {
                anyhow::bail!("❌ 频率必须为正数，当前: {hz}");
            }
            println!("✅ 设置默认频率: {hz} Hz");
            config.frequency_hz = Some(hz);
        }

        config.save()?;
        Ok(())
    }

    async fn get_(key: String) -> Result<()> {
        let config = CliConfig::load()?;

        let show_path = |label: &str, value: &Option<PathBuf>| match value {
            Some(dir) => println!("{label}: {}", dir.display()),
            None => println!("{label}: (未设置)"),
        };

        match key.as_str() {
            "recordings" => show_path("recordings", &config.recordings_dir),

            "output" => show_path("output", &config.output_dir),

            "hz" => match config.frequency_hz {
                Some(hz) => println!("hz: {hz}"),
                None => println!("hz: (未设置)"),
            },

            "all" => {
                show_path("recordings", &config.recordings_dir);
                show_path("output", &config.output_dir);
                match config.frequency_hz {
                    Some(hz) => println!("hz: {hz}"),
                    None => println!("hz: (未设置)"),
                }
            }

            other => anyhow::bail!("❌ 未知配置项: {other}（可用: recordings / output / hz / all）"),
        }

        Ok(())
    }

    async fn check_() -> Result<()> {
        let recordings = effective_recordings_dir(None)?;
        let output = effective_output_dir(None)?;
        let hz = effective_frequency(None)?;

        println!("配置文件: {}", config_file()?.display());
        println!();

        if recordings.is_dir() {
            let count = reprise_engine::TrajectoryStore::new(&recordings)
                .list()
                .map(|paths| paths.len())
                .unwrap_or(0);
            println!("✅ 录制目录: {}（{count} 条录制）", recordings.display());
        } else {
            println!("⚠️ 录制目录不存在: {}", recordings.display());
        }

        if output.is_dir() {
            println!("✅ 输出目录: {}", output.display());
        } else {
            println!("⚠️ 输出目录不存在: {}（首次运行时创建）", output.display());
        }

        println!("✅ tick 频率: {hz} Hz");
        Ok(())
    }
}
