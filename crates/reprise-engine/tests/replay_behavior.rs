//! 回放语义的参考实现对照
//!
//! 用测试内独立实现的插值公式作为对照：任意 tick 序列驱动下，
//! 回放器写出的位姿都必须等于「先把段端点换算到世界系、再按
//! 段内参数插值」的参考结果，锚点取每个 tick 的实时位姿。

use reprise_core::{Pose, PoseSample, Position3D, Quaternion, Trajectory};
use reprise_engine::{EventBus, PoseRecorder, ReplayStatus, Replayer, TrajectoryStore};
use reprise_scene::mock::MockScene;
use reprise_scene::{Frame, Stage};
use std::time::Duration;

const TOL: f64 = 1e-9;

fn yaw(angle: f64) -> Quaternion {
    Quaternion::from_axis_angle(Position3D::new(0.0, 1.0, 0.0), angle)
}

/// 参考实现：时刻 `t` 时移动帧应有的世界位姿
fn pose_at(trajectory: &Trajectory, anchor: &Pose, t: f64) -> Pose {
    let samples = trajectory.samples();
    let mut elapsed = t;
    for pair in samples.windows(2) {
        let duration = pair[1].timestamp - pair[0].timestamp;
        if duration <= 0.0 {
            continue;
        }
        if elapsed < duration {
            let u = elapsed / duration;
            let start = anchor.compose(&pair[0].pose());
            let end = anchor.compose(&pair[1].pose());
            return Pose::new(
                start.position.lerp(&end.position, u),
                start.rotation.slerp(&end.rotation, u),
            );
        }
        elapsed -= duration;
    }
    anchor.compose(&samples[samples.len() - 1].pose())
}

fn winding_trajectory() -> Trajectory {
    Trajectory::new(vec![
        PoseSample::new(0.0, Position3D::new(0.0, 0.0, 0.0), Quaternion::IDENTITY),
        PoseSample::new(0.4, Position3D::new(1.0, 0.2, 0.0), yaw(0.3)),
        // 零时长段：同一时刻换了个位姿
        PoseSample::new(0.4, Position3D::new(1.0, 0.2, -0.5), yaw(0.8)),
        PoseSample::new(1.0, Position3D::new(0.5, 0.6, -1.0), yaw(1.4)),
        PoseSample::new(1.8, Position3D::new(-0.2, 0.3, -0.4), yaw(0.9)),
    ])
    .unwrap()
}

#[test]
fn test_irregular_ticks_match_reference() {
    let scene = MockScene::new();
    let trajectory = winding_trajectory();
    let mut replayer = Replayer::new(&trajectory, &scene.rig());

    let script = [0.1, 0.15, 0.05, 0.2, 0.3, 0.25, 0.4, 0.1];
    let mut elapsed = 0.0;
    for dt in script {
        elapsed += dt;
        let status = replayer.tick(Duration::from_secs_f64(dt));
        assert_eq!(status, ReplayStatus::InProgress, "at elapsed {elapsed}");

        let anchor = scene.anchor.world_pose();
        let want = pose_at(&trajectory, &anchor, elapsed);
        let got = scene.head.world_pose();
        assert!(
            got.position.distance(&want.position) < TOL,
            "position at {elapsed}: {} vs {}",
            got.position,
            want.position
        );
        assert!(
            got.rotation.dot(&want.rotation).abs() > 1.0 - TOL,
            "rotation at {elapsed}"
        );
    }

    // 1.55 + 0.33 越过终点
    assert_eq!(
        replayer.tick(Duration::from_secs_f64(0.33)),
        ReplayStatus::Finished
    );
    let anchor = scene.anchor.world_pose();
    let want = pose_at(&trajectory, &anchor, 2.0);
    assert!(scene.head.world_pose().position.distance(&want.position) < TOL);
}

#[test]
fn test_drifting_anchor_matches_reference() {
    let scene = MockScene::new();
    let trajectory = winding_trajectory();
    let mut replayer = Replayer::new(&trajectory, &scene.rig());

    let mut elapsed = 0.0;
    for i in 0..17 {
        // 每个 tick 前锚点都在漂移（平移加旋转）
        let drift = Pose::new(
            Position3D::new(1.5 + 0.01 * i as f64, 0.0, -2.0),
            yaw(0.5 + 0.02 * i as f64),
        );
        scene.anchor.set_local_pose(drift);

        let dt = 0.1;
        elapsed += dt;
        replayer.tick(Duration::from_secs_f64(dt));

        let anchor = scene.anchor.world_pose();
        let want = pose_at(&trajectory, &anchor, elapsed);
        let got = scene.head.world_pose();
        assert!(
            got.position.distance(&want.position) < TOL,
            "position at {elapsed} with drifting anchor"
        );
        assert!(got.rotation.dot(&want.rotation).abs() > 1.0 - TOL);
    }
}

#[test]
fn test_random_tick_sequences_match_reference() {
    use rand::{Rng, SeedableRng};

    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    for round in 0..50 {
        let scene = MockScene::new();
        let trajectory = winding_trajectory();
        let mut replayer = Replayer::new(&trajectory, &scene.rig());

        let mut elapsed = 0.0;
        loop {
            // 对照用的 elapsed 取 Duration 量化后的值，和回放器看到的一致
            let dt = Duration::from_secs_f64(rng.gen_range(0.001..0.35));
            elapsed += dt.as_secs_f64();
            let status = replayer.tick(dt);

            let anchor = scene.anchor.world_pose();
            let want = pose_at(&trajectory, &anchor, elapsed);
            let got = scene.head.world_pose();
            assert!(
                got.position.distance(&want.position) < TOL,
                "round {round}, elapsed {elapsed}"
            );
            assert!(got.rotation.dot(&want.rotation).abs() > 1.0 - TOL);

            if status == ReplayStatus::Finished {
                break;
            }
        }
    }
}

#[test]
fn test_recorded_orbit_replays_to_final_pose() {
    let scene = MockScene::new();
    let dir = tempfile::tempdir().unwrap();
    let mut recorder = PoseRecorder::new(&scene.rig(), dir.path(), EventBus::sink());

    let dt = 1.0 / 72.0;
    recorder.arm();
    for _ in 0..72 {
        scene.advance(dt);
        recorder.sample_tick(Duration::from_secs_f64(dt));
    }
    recorder.disarm().unwrap();

    let trajectory = TrajectoryStore::new(dir.path()).load_latest().unwrap();

    // 回放期间头部归回放器所有
    scene.stage.set_head_tracking(false);
    let mut replayer = Replayer::new(&trajectory, &scene.rig());
    let mut guard = 0;
    while replayer.tick(Duration::from_secs_f64(dt)) == ReplayStatus::InProgress {
        guard += 1;
        assert!(guard < 10_000, "replay never finished");
    }

    let anchor = scene.anchor.world_pose();
    let want = anchor.compose(&trajectory.last().pose());
    let got = scene.head.world_pose();
    assert!(got.position.distance(&want.position) < TOL);
    assert!(got.rotation.dot(&want.rotation).abs() > 1.0 - TOL);
    assert!((replayer.progress() - 1.0).abs() < 1e-12);
}
