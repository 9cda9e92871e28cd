//! 错误类型体系
//!
//! 分层错误处理，区分致命错误（中止整次扫描）和可降级错误（记录后继续）。
//!
//! # 传播策略
//!
//! - 轨迹加载失败（找不到文件、坏行、采样不足）在任何扫描单元开始前中止
//! - 输出写入失败按「已报告的非致命错误」处理，不影响其他单元
//! - 场景子系统缺失只降级对应指标，绝不跨单元传播
//!
//! # 示例
//!
//! ```rust
//! use reprise_engine::HarnessError;
//!
//! fn handle_error(err: HarnessError) {
//!     if err.is_fatal() {
//!         eprintln!("致命错误: {err}");
//!         // 中止扫描
//!     } else {
//!         eprintln!("已降级: {err}");
//!         // 记录并继续
//!     }
//! }
//! ```

use reprise_core::{SampleDecodeError, TrajectoryError};
use reprise_scene::SceneError;
use std::path::PathBuf;
use thiserror::Error;

/// 引擎统一错误类型
#[derive(Debug, Error)]
pub enum HarnessError {
    // ==================== Fatal Errors（中止整次扫描）====================
    /// 目录中没有任何轨迹录制文件
    #[error("no movement recordings found in {dir}")]
    NoRecordings {
        /// 被扫描的目录
        dir: PathBuf,
    },

    /// 录制文件中存在坏行（部分轨迹一律拒绝）
    #[error("malformed sample in {path} at line {line}: {source}")]
    MalformedLine {
        /// 出错的文件
        path: PathBuf,
        /// 1 起始的行号
        line: usize,
        #[source]
        source: SampleDecodeError,
    },

    /// 采样不足以构成轨迹
    #[error(transparent)]
    Trajectory(#[from] TrajectoryError),

    /// 配置非法
    #[error("invalid config: {0}")]
    Config(String),

    /// I/O 错误（读取录制文件等）
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Recoverable Errors（记录后继续）====================
    /// 输出文件写入失败（尽力而为，不中止扫描）
    #[error("failed to write {path}: {source}")]
    WriteFailure {
        /// 目标文件
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 场景子系统缺失（对应指标降级为 0）
    #[error(transparent)]
    Scene(#[from] SceneError),

    // ==================== Teardown ====================
    /// 宿主在任务完成前结束了 tick 流
    #[error("interrupted: tick source ended before completion")]
    Interrupted,
}

impl HarnessError {
    /// 创建配置错误
    pub fn config(message: impl Into<String>) -> Self {
        HarnessError::Config(message.into())
    }

    /// 是否为致命错误（必须中止扫描）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            HarnessError::NoRecordings { .. }
                | HarnessError::MalformedLine { .. }
                | HarnessError::Trajectory(_)
                | HarnessError::Config(_)
                | HarnessError::Io(_)
        )
    }

    /// 是否为可降级错误（记录后继续运行）
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            HarnessError::WriteFailure { .. } | HarnessError::Scene(_)
        )
    }

    /// 是否为宿主拆除任务导致的中断
    pub fn is_interruption(&self) -> bool {
        matches!(self, HarnessError::Interrupted)
    }
}

/// 引擎层 Result 别名
pub type Result<T> = std::result::Result<T, HarnessError>;
