//! 轨迹文件仓库
//!
//! 在单个目录下管理 `MovementData_*.csv` 录制文件：按修改时间挑最新、
//! 逐行解析、把行号带进错误里。
//!
//! 解析是严格的：任何一行损坏都拒绝整个文件
//! （[`HarnessError::MalformedLine`]），不会静默丢行。

use crate::error::{HarnessError, Result};
use crate::naming;
use reprise_core::Trajectory;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// 录制文件仓库，绑定一个输出目录
#[derive(Debug, Clone)]
pub struct TrajectoryStore {
    dir: PathBuf,
}

impl TrajectoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        TrajectoryStore { dir: dir.into() }
    }

    /// 仓库目录
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 加载最新的录制文件
    ///
    /// 「最新」按文件修改时间取最大；修改时间相同（常见于粗粒度
    /// 文件系统时钟）时取文件名字典序最大的一个，文件名里的时间戳
    /// 保证了这等价于较晚的录制。
    ///
    /// 目录缺失或没有任何录制文件时返回 [`HarnessError::NoRecordings`]。
    pub fn load_latest(&self) -> Result<Trajectory> {
        let path = self
            .latest_path()?
            .ok_or_else(|| HarnessError::NoRecordings {
                dir: self.dir.clone(),
            })?;
        tracing::info!(path = %path.display(), "Loading latest recording");
        self.load_path(&path)
    }

    /// 加载指定路径的录制文件
    ///
    /// 空白行跳过；其余每行必须是完整的 8 字段采样，行号从 1 起算。
    pub fn load_path(&self, path: &Path) -> Result<Trajectory> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut samples = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let sample = reprise_core::PoseSample::parse_line(&line).map_err(|source| {
                HarnessError::MalformedLine {
                    path: path.to_path_buf(),
                    line: index + 1,
                    source,
                }
            })?;
            samples.push(sample);
        }

        let trajectory = Trajectory::new(samples)?;
        tracing::debug!(
            path = %path.display(),
            samples = trajectory.sample_count(),
            duration_s = trajectory.duration(),
            "Recording loaded"
        );
        Ok(trajectory)
    }

    /// 列出目录里的全部录制文件，最新的在前
    ///
    /// 目录缺失按空集处理，返回空 Vec 而不是错误。
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let mut entries = self.recordings()?;
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
        Ok(entries.into_iter().map(|(path, _)| path).collect())
    }

    fn latest_path(&self) -> Result<Option<PathBuf>> {
        let entries = self.recordings()?;
        Ok(entries
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
            .map(|(path, _)| path))
    }

    /// 收集 (路径, 修改时间) 对；目录不存在时返回空集
    fn recordings(&self) -> Result<Vec<(PathBuf, SystemTime)>> {
        let read_dir = match std::fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !naming::is_movement_log(name) {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            entries.push((path, modified));
        }
        Ok(entries)
    }
}
