//! 轨迹回放器
//!
//! 借用一条 [`Trajectory`]，按 tick 推进一个段游标，把移动帧驱动到
//! 相邻采样对之间的插值位姿上。
//!
//! # 插值语义
//!
//! 对段 `i`（采样 `a = s[i]`、`b = s[i+1]`）：
//!
//! - 先用锚点当前位姿把两个端点换算到世界系，再在世界系端点之间
//!   插值（位置 lerp、姿态 slerp），参数 `u = 段内耗时 / 段时长`
//! - 锚点位姿每个 tick 重新读取：回放期间移动锚点，轨迹整体跟着走
//! - 段时长 ≤ 0 的段直接穿过，不做除法
//! - 一个超长 tick 允许跨越多个段，剩余时间结转
//! - 每个 tick 至多写一次移动帧位姿
//!
//! 最后一段走完后 `Finished`，移动帧停在「末采样 ∘ 锚点当前位姿」上。

use reprise_core::{Pose, Trajectory};
use reprise_scene::{Frame, Rig};
use std::sync::Arc;
use std::time::Duration;

/// 单次 `tick` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayStatus {
    /// 游标仍在轨迹中间
    InProgress,
    /// 轨迹走完（或被取消），移动帧已停在终点
    Finished,
}

/// 回放游标
///
/// 生命周期绑定在被回放的轨迹上；回放期间轨迹只读。
pub struct Replayer<'a> {
    trajectory: &'a Trajectory,
    anchor: Arc<dyn Frame>,
    mover: Arc<dyn Frame>,
    segment: usize,
    elapsed_in_segment: f64,
    finished: bool,
    cancelled: bool,
}

impl<'a> Replayer<'a> {
    pub fn new(trajectory: &'a Trajectory, rig: &Rig) -> Self {
        Replayer {
            trajectory,
            anchor: rig.anchor.clone(),
            mover: rig.mover.clone(),
            segment: 0,
            elapsed_in_segment: 0.0,
            finished: false,
            cancelled: false,
        }
    }

    /// 推进 `dt` 的回放时间
    ///
    /// 结束后继续调用是 no-op，始终返回 [`ReplayStatus::Finished`]。
    pub fn tick(&mut self, dt: Duration) -> ReplayStatus {
        if self.finished || self.cancelled {
            return ReplayStatus::Finished;
        }

        // 锚点位姿每 tick 现读，回放跟随锚点移动
        let anchor = self.anchor.world_pose();
        self.elapsed_in_segment += dt.as_secs_f64();

        loop {
            let Some((a, b)) = self.trajectory.segment(self.segment) else {
                return self.finish(&anchor);
            };

            let duration = b.timestamp - a.timestamp;
            if duration <= 0.0 || self.elapsed_in_segment >= duration {
                // 穿过整段：零时长段不消耗时间，普通段把余量结转
                self.elapsed_in_segment -= duration.max(0.0);
                self.segment += 1;
                continue;
            }

            let u = self.elapsed_in_segment / duration;
            let start = anchor.compose(&a.pose());
            let end = anchor.compose(&b.pose());
            self.mover.set_world_pose(Pose::new(
                start.position.lerp(&end.position, u),
                start.rotation.slerp(&end.rotation, u),
            ));
            return ReplayStatus::InProgress;
        }
    }

    /// 强制结束回放；之后的 `tick` 不再移动任何东西
    pub fn cancel(&mut self) {
        if !self.finished && !self.cancelled {
            tracing::debug!(segment = self.segment, "Replay cancelled");
        }
        self.cancelled = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished || self.cancelled
    }

    /// 已消耗的轨迹时间占总时长的比例，`0.0..=1.0`
    pub fn progress(&self) -> f64 {
        if self.finished {
            return 1.0;
        }
        let total = self.trajectory.duration();
        if total <= 0.0 {
            return 0.0;
        }
        let samples = self.trajectory.samples();
        let consumed = match samples.get(self.segment) {
            Some(sample) => sample.timestamp - samples[0].timestamp + self.elapsed_in_segment,
            None => total,
        };
        (consumed / total).clamp(0.0, 1.0)
    }

    fn finish(&mut self, anchor: &Pose) -> ReplayStatus {
        // 终点不插值：末采样与锚点当前位姿的精确合成
        let last = self.trajectory.last();
        self.mover.set_world_pose(anchor.compose(&last.pose()));
        self.finished = true;
        tracing::debug!("Replay finished");
        ReplayStatus::Finished
    }
}
