//! 轨迹统计
//!
//! 给 CLI 的 `inspect` 子命令用：不回放也能快速了解一条录制的
//! 规模和形态。

use reprise_core::Trajectory;
use serde::Serialize;
use std::fmt;

/// 一条轨迹的汇总统计
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TrajectoryStats {
    /// 采样数
    pub samples: usize,
    /// 首末采样的时间跨度，秒
    pub duration_s: f64,
    /// 相邻采样位置距离之和，米
    pub path_length_m: f64,
    /// 离锚点原点的最大距离，米
    pub max_displacement_m: f64,
    /// 平均采样间隔，秒
    pub mean_interval_s: f64,
}

impl TrajectoryStats {
    pub fn calculate(trajectory: &Trajectory) -> Self {
        let samples = trajectory.samples();
        let count = samples.len();
        let duration = trajectory.duration();

        let mut path_length = 0.0;
        for pair in samples.windows(2) {
            path_length += pair[0].position.distance(&pair[1].position);
        }

        let max_displacement = samples
            .iter()
            .map(|s| s.position.norm())
            .fold(0.0, f64::max);

        let mean_interval = if count > 1 {
            duration / (count - 1) as f64
        } else {
            0.0
        };

        TrajectoryStats {
            samples: count,
            duration_s: duration,
            path_length_m: path_length,
            max_displacement_m: max_displacement,
            mean_interval_s: mean_interval,
        }
    }
}

impl fmt::Display for TrajectoryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "samples:          {}", self.samples)?;
        writeln!(f, "duration:         {:.3} s", self.duration_s)?;
        writeln!(f, "path length:      {:.3} m", self.path_length_m)?;
        writeln!(f, "max displacement: {:.3} m", self.max_displacement_m)?;
        write!(f, "mean interval:    {:.4} s", self.mean_interval_s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reprise_core::{PoseSample, Position3D, Quaternion};

    fn sample(t: f64, x: f64, y: f64) -> PoseSample {
        PoseSample::new(t, Position3D::new(x, y, 0.0), Quaternion::IDENTITY)
    }

    #[test]
    fn test_straight_path() {
        let trajectory = Trajectory::new(vec![
            sample(0.0, 0.0, 0.0),
            sample(0.5, 3.0, 0.0),
            sample(1.0, 3.0, 4.0),
        ])
        .unwrap();
        let stats = TrajectoryStats::calculate(&trajectory);

        assert_eq!(stats.samples, 3);
        assert!((stats.duration_s - 1.0).abs() < 1e-12);
        assert!((stats.path_length_m - 7.0).abs() < 1e-12);
        assert!((stats.max_displacement_m - 5.0).abs() < 1e-12);
        assert!((stats.mean_interval_s - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_display_renders_all_fields() {
        let trajectory =
            Trajectory::new(vec![sample(0.0, 0.0, 0.0), sample(2.0, 1.0, 0.0)]).unwrap();
        let text = TrajectoryStats::calculate(&trajectory).to_string();
        assert!(text.contains("samples:"));
        assert!(text.contains("2.000 s"));
    }
}
