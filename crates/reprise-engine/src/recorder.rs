//! 位姿录制器
//!
//! 每个 tick 把移动帧（头显代理）的位姿换算到锚点帧的局部坐标系里
//! 记一笔，`disarm()` 时整体落盘为 `MovementData_*.csv`。
//!
//! # 状态语义
//!
//! - `arm()`：Idle → Recording。把移动帧吸附到锚点、清空缓冲、
//!   点亮录制指示、清零会话时钟
//! - `sample_tick(dt)`：Recording 状态下推进时钟并追加一个采样
//! - `disarm()`：Recording → Idle。落盘、清空缓冲、熄灭指示
//!
//! 重复 `arm()` 或空转 `disarm()` 都是无害的 no-op。
//!
//! # 写入失败
//!
//! 落盘是尽力而为：失败只通过日志和事件通道报告
//! （[`HarnessEvent::WriteFailed`]），绝不 panic、不中止调用方。

use crate::events::{EventBus, HarnessEvent};
use crate::naming;
use chrono::{DateTime, Local};
use reprise_core::PoseSample;
use reprise_scene::{Frame, Rig, Stage};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
enum RecorderState {
    Idle,
    Recording,
}

/// 轨迹录制器
pub struct PoseRecorder {
    anchor: Arc<dyn Frame>,
    mover: Arc<dyn Frame>,
    stage: Arc<dyn Stage>,
    events: EventBus,
    output_dir: PathBuf,
    state: RecorderState,
    elapsed: f64,
    started_at: DateTime<Local>,
    buffer: Vec<PoseSample>,
}

impl PoseRecorder {
    /// 创建录制器
    ///
    /// 录制文件写入 `output_dir`，目录不存在时在落盘前创建。
    pub fn new(rig: &Rig, output_dir: impl Into<PathBuf>, events: EventBus) -> Self {
        PoseRecorder {
            anchor: rig.anchor.clone(),
            mover: rig.mover.clone(),
            stage: rig.stage.clone(),
            events,
            output_dir: output_dir.into(),
            state: RecorderState::Idle,
            elapsed: 0.0,
            started_at: Local::now(),
            buffer: Vec::new(),
        }
    }

    /// 是否处于录制状态
    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// 缓冲中的采样数
    pub fn sample_count(&self) -> usize {
        self.buffer.len()
    }

    /// 本次录制已经过的会话时间
    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.elapsed)
    }

    /// 开始录制（Idle → Recording，重复调用为 no-op）
    pub fn arm(&mut self) {
        if self.state == RecorderState::Recording {
            tracing::trace!("arm() while already recording, no-op");
            return;
        }

        // 把移动帧吸附到锚点：锚点系内从单位位姿出发
        self.mover.set_world_pose(self.anchor.world_pose());
        self.buffer.clear();
        self.elapsed = 0.0;
        // 文件名用录制开始时刻，不是落盘时刻
        self.started_at = Local::now();
        self.stage.set_recording_indicator(true);
        self.state = RecorderState::Recording;
        tracing::info!(dir = %self.output_dir.display(), "Recording armed");
    }

    /// 录制状态下采样一帧；Idle 状态下为 no-op
    ///
    /// 锚点的世界位姿每次重新读取，录制中移动锚点是允许的。
    pub fn sample_tick(&mut self, dt: Duration) {
        if self.state != RecorderState::Recording {
            return;
        }
        self.elapsed += dt.as_secs_f64();

        let anchor = self.anchor.world_pose();
        let relative = self.mover.world_pose().relative_to(&anchor);
        self.buffer
            .push(PoseSample::new(self.elapsed, relative.position, relative.rotation));
    }

    /// 停止录制并落盘（Recording → Idle，空转调用为 no-op）
    ///
    /// 返回成功写入的文件路径；写入失败（或本来就不在录制）返回 `None`。
    pub fn disarm(&mut self) -> Option<PathBuf> {
        if self.state == RecorderState::Idle {
            tracing::trace!("disarm() while idle, no-op");
            return None;
        }
        self.state = RecorderState::Idle;
        self.stage.set_recording_indicator(false);

        let samples = std::mem::take(&mut self.buffer);

        if let Err(source) = std::fs::create_dir_all(&self.output_dir) {
            self.report_write_failure(self.output_dir.clone(), &source);
            return None;
        }

        let path = naming::unique_stamped_path_from(
            &self.output_dir,
            self.started_at,
            naming::movement_file_name,
        );
        match write_samples(&path, &samples) {
            Ok(()) => {
                tracing::info!(
                    path = %path.display(),
                    samples = samples.len(),
                    "Recording saved"
                );
                self.events.emit(HarnessEvent::RecordingSaved {
                    path: path.clone(),
                    samples: samples.len(),
                });
                Some(path)
            }
            Err(source) => {
                self.report_write_failure(path, &source);
                None
            }
        }
    }

    fn report_write_failure(&self, path: PathBuf, source: &std::io::Error) {
        tracing::warn!(
            path = %path.display(),
            error = %source,
            "Recording write failed, samples discarded"
        );
        self.events.emit(HarnessEvent::WriteFailed {
            path,
            detail: source.to_string(),
        });
    }
}

fn write_samples(path: &Path, samples: &[PoseSample]) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for sample in samples {
        writeln!(writer, "{}", sample.encode_line())?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reprise_core::{Pose, Position3D, Quaternion};
    use reprise_scene::mock::MockScene;

    fn dt(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn test_arm_is_idempotent_and_resets() {
        let scene = MockScene::new();
        let mut recorder = PoseRecorder::new(
            &scene.rig(),
            tempfile::tempdir().unwrap().path(),
            EventBus::sink(),
        );

        recorder.arm();
        recorder.sample_tick(dt(10));
        assert_eq!(recorder.sample_count(), 1);

        // 录制中再次 arm 不得清空缓冲
        recorder.arm();
        assert_eq!(recorder.sample_count(), 1);
        assert!(recorder.is_recording());
    }

    #[test]
    fn test_arm_snaps_mover_to_anchor() {
        let scene = MockScene::new();
        let mut recorder = PoseRecorder::new(
            &scene.rig(),
            tempfile::tempdir().unwrap().path(),
            EventBus::sink(),
        );

        recorder.arm();
        let anchor = scene.anchor.world_pose();
        let mover = scene.head.world_pose();
        assert!(mover.position.distance(&anchor.position) < 1e-9);
    }

    #[test]
    fn test_disarm_while_idle_is_noop() {
        let scene = MockScene::new();
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = PoseRecorder::new(&scene.rig(), dir.path(), EventBus::sink());

        assert_eq!(recorder.disarm(), None);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_samples_are_anchor_relative() {
        let scene = MockScene::new();
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = PoseRecorder::new(&scene.rig(), dir.path(), EventBus::sink());

        recorder.arm();
        // 把头放到锚点前方 1 米（锚点系内 +x）
        let anchor = scene.anchor.world_pose();
        let target = anchor.compose(&Pose::new(
            Position3D::new(1.0, 0.0, 0.0),
            Quaternion::IDENTITY,
        ));
        scene.head.set_world_pose(target);
        recorder.sample_tick(dt(10));

        let path = recorder.disarm().unwrap();
        let body = std::fs::read_to_string(path).unwrap();
        let sample = PoseSample::parse_line(body.lines().next().unwrap()).unwrap();
        assert!(sample.position.distance(&Position3D::new(1.0, 0.0, 0.0)) < 1e-9);
    }

    #[test]
    fn test_recording_indicator_follows_state() {
        let scene = MockScene::new();
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = PoseRecorder::new(&scene.rig(), dir.path(), EventBus::sink());

        assert!(!scene.stage.snapshot().recording_indicator);
        recorder.arm();
        assert!(scene.stage.snapshot().recording_indicator);
        recorder.disarm();
        assert!(!scene.stage.snapshot().recording_indicator);
    }

    #[test]
    fn test_timestamps_accumulate_tick_time() {
        let scene = MockScene::new();
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = PoseRecorder::new(&scene.rig(), dir.path(), EventBus::sink());

        recorder.arm();
        for _ in 0..3 {
            scene.advance(0.25);
            recorder.sample_tick(Duration::from_secs_f64(0.25));
        }
        let path = recorder.disarm().unwrap();
        let body = std::fs::read_to_string(path).unwrap();
        let ts: Vec<f64> = body
            .lines()
            .map(|l| PoseSample::parse_line(l).unwrap().timestamp)
            .collect();
        assert_eq!(ts, vec![0.25, 0.5, 0.75]);
    }

    #[test]
    fn test_write_failure_reports_event() {
        let scene = MockScene::new();
        let dir = tempfile::tempdir().unwrap();
        // 用一个普通文件占住目录名，create_dir_all 必然失败
        let blocked = dir.path().join("not_a_dir");
        std::fs::write(&blocked, "x").unwrap();

        let (bus, rx) = EventBus::channel();
        let mut recorder = PoseRecorder::new(&scene.rig(), &blocked, bus);
        recorder.arm();
        recorder.sample_tick(dt(10));

        assert_eq!(recorder.disarm(), None);
        assert!(matches!(
            rx.try_recv().unwrap(),
            HarnessEvent::WriteFailed { .. }
        ));
        // 失败后录制器回到 Idle，可以立刻重新 arm
        assert!(!recorder.is_recording());
    }
}
