//! 录制 → 落盘 → 加载 的端到端一致性
//!
//! 在 mock 场景里让头绕锚点转一段，落盘后用仓库读回来，逐采样
//! 对比锚点相对位姿。行编码用的是 f64 的最短无损十进制表示，
//! 读回值应与录制值完全一致（只留极小容差吸收四元数归一化）。

use reprise_core::Pose;
use reprise_engine::{EventBus, HarnessEvent, PoseRecorder, TrajectoryStore};
use reprise_scene::Frame;
use reprise_scene::mock::MockScene;
use std::time::Duration;

const DT: f64 = 1.0 / 72.0;
const TOL: f64 = 1e-12;

#[test]
fn test_recorded_trajectory_survives_disk_round_trip() {
    let scene = MockScene::new();
    let dir = tempfile::tempdir().unwrap();
    let (bus, rx) = EventBus::channel();
    let mut recorder = PoseRecorder::new(&scene.rig(), dir.path(), bus);

    recorder.arm();
    let mut expected: Vec<Pose> = Vec::new();
    for _ in 0..144 {
        scene.advance(DT);
        recorder.sample_tick(Duration::from_secs_f64(DT));
        expected.push(
            scene
                .head
                .world_pose()
                .relative_to(&scene.anchor.world_pose()),
        );
    }
    let path = recorder.disarm().unwrap();

    match rx.try_recv().unwrap() {
        HarnessEvent::RecordingSaved {
            path: event_path,
            samples,
        } => {
            assert_eq!(event_path, path);
            assert_eq!(samples, 144);
        }
        other => panic!("expected RecordingSaved, got {other:?}"),
    }

    let store = TrajectoryStore::new(dir.path());
    let trajectory = store.load_latest().unwrap();
    assert_eq!(trajectory.sample_count(), 144);

    for (sample, want) in trajectory.samples().iter().zip(&expected) {
        assert!(
            sample.position.distance(&want.position) < TOL,
            "position drift: {} vs {}",
            sample.position,
            want.position
        );
        assert!(
            sample.rotation.dot(&want.rotation).abs() > 1.0 - TOL,
            "rotation drift: {} vs {}",
            sample.rotation,
            want.rotation
        );
    }

    // 时间戳严格递增，间隔等于 tick 步长
    for pair in trajectory.samples().windows(2) {
        assert!((pair[1].timestamp - pair[0].timestamp - DT).abs() < 1e-9);
    }
}

#[test]
fn test_moved_anchor_keeps_samples_relative() {
    let scene = MockScene::new();
    let dir = tempfile::tempdir().unwrap();
    let mut recorder = PoseRecorder::new(&scene.rig(), dir.path(), EventBus::sink());

    recorder.arm();
    let mut expected: Vec<Pose> = Vec::new();
    for i in 0..8 {
        scene.advance(DT);
        // 录制中途把锚点拖走，之后的采样必须相对于新的锚点位姿
        if i == 4 {
            let pose = scene.anchor.world_pose();
            scene.anchor.set_world_pose(Pose::new(
                pose.position + reprise_core::Position3D::new(3.0, 0.0, 0.0),
                pose.rotation,
            ));
        }
        recorder.sample_tick(Duration::from_secs_f64(DT));
        expected.push(
            scene
                .head
                .world_pose()
                .relative_to(&scene.anchor.world_pose()),
        );
    }
    recorder.disarm().unwrap();

    let trajectory = TrajectoryStore::new(dir.path()).load_latest().unwrap();
    for (sample, want) in trajectory.samples().iter().zip(&expected) {
        assert!(sample.position.distance(&want.position) < TOL);
    }
}

#[test]
fn test_rearm_discards_previous_buffer() {
    let scene = MockScene::new();
    let dir = tempfile::tempdir().unwrap();
    let mut recorder = PoseRecorder::new(&scene.rig(), dir.path(), EventBus::sink());

    recorder.arm();
    for _ in 0..10 {
        scene.advance(DT);
        recorder.sample_tick(Duration::from_secs_f64(DT));
    }
    recorder.disarm().unwrap();

    // 第二段录制更短，加载到的必须是第二段
    recorder.arm();
    for _ in 0..3 {
        scene.advance(DT);
        recorder.sample_tick(Duration::from_secs_f64(DT));
    }
    recorder.disarm().unwrap();

    let trajectory = TrajectoryStore::new(dir.path()).load_latest().unwrap();
    assert_eq!(trajectory.sample_count(), 3);
}
