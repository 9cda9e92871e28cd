//! 轨迹：按时间排序的采样序列
//!
//! 回放器按相邻采样对逐段插值，所以一条可用的轨迹至少要有 2 个
//! 采样。构造时做稳定排序（等时间戳采样保持文件内的相对顺序），
//! 之后只读，整个参数扫描期间 18 次回放共享同一个实例。

use crate::sample::PoseSample;
use thiserror::Error;

/// 轨迹构造错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrajectoryError {
    /// 采样不足以构成一个插值段
    #[error("trajectory needs at least {min} samples, got {count}", min = Trajectory::MIN_SAMPLES)]
    InsufficientSamples { count: usize },
}

/// 只读的时间有序采样序列
#[derive(Debug, Clone)]
pub struct Trajectory {
    samples: Vec<PoseSample>,
}

impl Trajectory {
    /// 最少采样数（一个插值段需要两端）
    pub const MIN_SAMPLES: usize = 2;

    /// 从采样列表构造轨迹
    ///
    /// 按时间戳稳定排序；少于 [`Trajectory::MIN_SAMPLES`] 个采样时拒绝。
    pub fn new(mut samples: Vec<PoseSample>) -> Result<Self, TrajectoryError> {
        if samples.len() < Self::MIN_SAMPLES {
            return Err(TrajectoryError::InsufficientSamples {
                count: samples.len(),
            });
        }
        // total_cmp：NaN 在解析层已被拒绝，这里只是避免 partial_cmp 的 unwrap
        samples.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Ok(Trajectory { samples })
    }

    /// 采样视图
    pub fn samples(&self) -> &[PoseSample] {
        &self.samples
    }

    /// 采样数
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// 插值段数（采样数 - 1）
    pub fn segment_count(&self) -> usize {
        self.samples.len() - 1
    }

    /// 第 `index` 段的两端采样
    pub fn segment(&self, index: usize) -> Option<(&PoseSample, &PoseSample)> {
        if index + 1 < self.samples.len() {
            Some((&self.samples[index], &self.samples[index + 1]))
        } else {
            None
        }
    }

    /// 首个采样
    pub fn first(&self) -> &PoseSample {
        // 构造保证非空
        &self.samples[0]
    }

    /// 末尾采样
    pub fn last(&self) -> &PoseSample {
        &self.samples[self.samples.len() - 1]
    }

    /// 轨迹时长（秒，末尾减首个时间戳）
    pub fn duration(&self) -> f64 {
        self.last().timestamp - self.first().timestamp
    }
}
