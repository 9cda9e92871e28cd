//! Mock 场景
//!
//! 用于测试和 dry-run 的内存场景：帧层级、脚本化头部运动、
//! 简化的粒子群体模型和可脚本化的性能计数器。
//! 行为足够产生有意义的录制/回放/扫描输出，但不渲染任何东西。

use crate::counters::{
    COUNTER_DRAW_CALLS, COUNTER_GPU_USAGE, COUNTER_MEMORY_USED, COUNTER_TRIANGLES,
    COUNTER_VERTICES,
};
use crate::{
    CounterHandle, CounterProbe, CounterSource, DisplayLink, EnvironmentMode, Frame,
    ParticleEffect, Rig, SceneError, Stage,
};
use parking_lot::{Mutex, RwLock};
use reprise_core::{Pose, Position3D, Quaternion};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// 粒子平均寿命（秒），群体模型的衰减常数
const PARTICLE_LIFETIME_S: f64 = 2.0;

/// 头部轨道角速度（弧度/秒）
const ORBIT_RATE: f64 = 0.4;

/// 头部轨道半径（米）
const ORBIT_RADIUS: f64 = 0.8;

/// 模拟场景帧（父子层级 + 局部位姿）
pub struct MockFrame {
    name: String,
    parent: Option<Arc<MockFrame>>,
    local: RwLock<Pose>,
}

impl MockFrame {
    /// 创建根帧（无父级，局部即世界）
    pub fn root(name: impl Into<String>) -> Arc<Self> {
        Arc::new(MockFrame {
            name: name.into(),
            parent: None,
            local: RwLock::new(Pose::IDENTITY),
        })
    }

    /// 创建子帧
    pub fn child_of(parent: &Arc<MockFrame>, name: impl Into<String>, local: Pose) -> Arc<Self> {
        Arc::new(MockFrame {
            name: name.into(),
            parent: Some(parent.clone()),
            local: RwLock::new(local),
        })
    }
}

impl Frame for MockFrame {
    fn world_pose(&self) -> Pose {
        match &self.parent {
            Some(parent) => parent.world_pose().compose(&self.local.read()),
            None => *self.local.read(),
        }
    }

    fn set_world_pose(&self, pose: Pose) {
        let local = match &self.parent {
            Some(parent) => pose.relative_to(&parent.world_pose()),
            None => pose,
        };
        *self.local.write() = local;
    }

    fn local_pose(&self) -> Pose {
        *self.local.read()
    }

    fn set_local_pose(&self, pose: Pose) {
        *self.local.write() = pose;
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct EffectState {
    active: bool,
    rate: f64,
    alive: f64,
}

/// 模拟粒子效果
///
/// 群体模型：激活时每秒新增 `rate` 个粒子，存活数按固定寿命
/// 指数衰减，稳态存活数约为 `rate × PARTICLE_LIFETIME_S`。
pub struct MockEffect {
    name: &'static str,
    state: Mutex<EffectState>,
}

impl MockEffect {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(MockEffect {
            name,
            state: Mutex::new(EffectState {
                active: false,
                rate: 0.0,
                alive: 0.0,
            }),
        })
    }

    /// 推进群体模型一帧
    pub fn step(&self, dt: f64) {
        let mut state = self.state.lock();
        if state.active {
            state.alive += state.rate * dt;
        }
        let decay = (dt / PARTICLE_LIFETIME_S).min(1.0);
        state.alive -= state.alive * decay;
        if !state.active && state.alive < 0.5 {
            state.alive = 0.0;
        }
    }
}

impl ParticleEffect for MockEffect {
    fn play(&self) {
        let mut state = self.state.lock();
        if !state.active {
            tracing::debug!(effect = self.name, "Effect play");
            state.active = true;
        }
    }

    fn stop_and_clear(&self) {
        let mut state = self.state.lock();
        state.active = false;
        state.alive = 0.0;
    }

    fn is_active(&self) -> bool {
        self.state.lock().active
    }

    fn set_emission_rate(&self, rate: f64) {
        self.state.lock().rate = rate.max(0.0);
    }

    fn emission_rate(&self) -> f64 {
        self.state.lock().rate
    }

    fn alive_count(&self) -> u32 {
        let alive = self.state.lock().alive;
        alive.round().max(0.0) as u32
    }
}

fn counter_key(category: &str, name: &str) -> String {
    format!("{category}/{name}")
}

/// 可脚本化的计数器源
///
/// 值由 [`MockScene::advance`] 每帧刷新，也可以在测试里直接
/// `set_value`。`make_unavailable` 模拟子系统缺失。
pub struct MockCounterSource {
    values: Arc<RwLock<HashMap<String, f64>>>,
    unavailable: RwLock<HashSet<String>>,
    open_probes: Arc<AtomicUsize>,
}

impl MockCounterSource {
    pub fn new() -> Arc<Self> {
        Arc::new(MockCounterSource {
            values: Arc::new(RwLock::new(HashMap::new())),
            unavailable: RwLock::new(HashSet::new()),
            open_probes: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// 写入一个计数器值
    pub fn set_value(&self, category: &str, name: &str, value: f64) {
        self.values
            .write()
            .insert(counter_key(category, name), value);
    }

    /// 让某个计数器打开失败（模拟子系统缺失）
    pub fn make_unavailable(&self, category: &str, name: &str) {
        self.unavailable.write().insert(counter_key(category, name));
    }

    /// 当前未关闭的探针数（测试用）
    pub fn open_probe_count(&self) -> usize {
        self.open_probes.load(Ordering::SeqCst)
    }
}

impl CounterSource for MockCounterSource {
    fn open(&self, category: &str, name: &str) -> Result<CounterHandle, SceneError> {
        let key = counter_key(category, name);
        if self.unavailable.read().contains(&key) {
            return Err(SceneError::counter_unavailable(category, name));
        }
        self.open_probes.fetch_add(1, Ordering::SeqCst);
        Ok(CounterHandle::new(
            category,
            name,
            Box::new(MockProbe {
                key,
                values: self.values.clone(),
                open_probes: self.open_probes.clone(),
                closed: false,
            }),
        ))
    }
}

struct MockProbe {
    key: String,
    values: Arc<RwLock<HashMap<String, f64>>>,
    open_probes: Arc<AtomicUsize>,
    closed: bool,
}

impl CounterProbe for MockProbe {
    fn last_value(&self) -> f64 {
        self.values.read().get(&self.key).copied().unwrap_or(0.0)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.open_probes.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// 模拟显示设备
pub struct MockDisplay {
    rates: Vec<f64>,
    requested: Mutex<Option<f64>>,
}

impl MockDisplay {
    pub fn new(rates: Vec<f64>) -> Arc<Self> {
        Arc::new(MockDisplay {
            rates,
            requested: Mutex::new(None),
        })
    }

    /// 最近一次被请求的刷新率（测试用）
    pub fn requested(&self) -> Option<f64> {
        *self.requested.lock()
    }
}

impl DisplayLink for MockDisplay {
    fn supported_refresh_rates(&self) -> Vec<f64> {
        self.rates.clone()
    }

    fn request_refresh_rate(&self, rate: f64) -> bool {
        *self.requested.lock() = Some(rate);
        self.rates.iter().any(|r| (r - rate).abs() < 0.1)
    }
}

/// 舞台状态快照
#[derive(Debug, Clone, PartialEq)]
pub struct StageState {
    pub environment: EnvironmentMode,
    pub head_tracking: bool,
    pub recording_indicator: bool,
    pub status_text: String,
}

impl Default for StageState {
    fn default() -> Self {
        StageState {
            environment: EnvironmentMode::Immersive,
            head_tracking: true,
            recording_indicator: false,
            status_text: String::new(),
        }
    }
}

/// 模拟舞台
pub struct MockStage {
    state: RwLock<StageState>,
}

impl MockStage {
    pub fn new() -> Arc<Self> {
        Arc::new(MockStage {
            state: RwLock::new(StageState::default()),
        })
    }

    /// 当前状态快照（测试用）
    pub fn snapshot(&self) -> StageState {
        self.state.read().clone()
    }
}

impl Stage for MockStage {
    fn set_environment(&self, mode: EnvironmentMode) {
        self.state.write().environment = mode;
    }

    fn environment(&self) -> EnvironmentMode {
        self.state.read().environment
    }

    fn set_head_tracking(&self, enabled: bool) {
        self.state.write().head_tracking = enabled;
    }

    fn head_tracking(&self) -> bool {
        self.state.read().head_tracking
    }

    fn set_recording_indicator(&self, on: bool) {
        self.state.write().recording_indicator = on;
    }

    fn set_status_text(&self, text: &str) {
        self.state.write().status_text = text.to_string();
    }
}

/// 完整的模拟场景
///
/// 层级：`root` 下挂 `anchor`（非平凡位姿，让锚点相对换算真正起作用）
/// 和 `head`（被录制/回放驱动的移动帧）。
pub struct MockScene {
    pub root: Arc<MockFrame>,
    pub anchor: Arc<MockFrame>,
    pub head: Arc<MockFrame>,
    pub vfx: Arc<MockEffect>,
    pub builtin: Arc<MockEffect>,
    pub counters: Arc<MockCounterSource>,
    pub display: Arc<MockDisplay>,
    pub stage: Arc<MockStage>,
    clock: Mutex<f64>,
}

impl MockScene {
    pub fn new() -> Self {
        let root = MockFrame::root("root");
        let anchor = MockFrame::child_of(
            &root,
            "anchor",
            Pose::new(
                Position3D::new(1.5, 0.0, -2.0),
                Quaternion::from_axis_angle(Position3D::new(0.0, 1.0, 0.0), 0.5),
            ),
        );
        let head = MockFrame::child_of(
            &root,
            "head",
            Pose::new(Position3D::new(0.0, 1.7, 0.0), Quaternion::IDENTITY),
        );

        let scene = MockScene {
            root,
            anchor,
            head,
            vfx: MockEffect::new("vfx"),
            builtin: MockEffect::new("builtin"),
            counters: MockCounterSource::new(),
            display: MockDisplay::new(vec![72.0, 90.0, 120.0]),
            stage: MockStage::new(),
            clock: Mutex::new(0.0),
        };
        // 计数器从第 0 帧就有值
        scene.refresh_counters(0.0);
        scene
    }

    /// 以 trait 对象形式借出场景句柄
    pub fn rig(&self) -> Rig {
        Rig {
            anchor: self.anchor.clone(),
            mover: self.head.clone(),
            stage: self.stage.clone(),
            vfx: self.vfx.clone(),
            builtin: self.builtin.clone(),
            counters: self.counters.clone(),
        }
    }

    /// 场景时钟（秒）
    pub fn time(&self) -> f64 {
        *self.clock.lock()
    }

    /// 推进场景一帧
    ///
    /// 头部追踪开启时沿轨道驱动头部；追踪关闭时头部位姿归
    /// 引擎（回放器）所有，这里不碰。随后推进粒子模型并刷新计数器。
    pub fn advance(&self, dt: f64) {
        let time = {
            let mut clock = self.clock.lock();
            *clock += dt;
            *clock
        };

        if self.stage.head_tracking() {
            let theta = ORBIT_RATE * time;
            let position = Position3D::new(
                ORBIT_RADIUS * theta.cos(),
                1.7 + 0.1 * (2.0 * theta).sin(),
                ORBIT_RADIUS * theta.sin(),
            );
            let rotation =
                Quaternion::from_axis_angle(Position3D::new(0.0, 1.0, 0.0), -theta);
            self.head.set_world_pose(Pose::new(position, rotation));
        }

        self.vfx.step(dt);
        self.builtin.step(dt);
        self.refresh_counters(time);
    }

    fn refresh_counters(&self, time: f64) {
        let alive = (self.vfx.alive_count() + self.builtin.alive_count()) as f64;
        let triangles = 48_000.0 + 6.0 * alive;

        let c = &self.counters;
        c.set_value(COUNTER_TRIANGLES.0, COUNTER_TRIANGLES.1, triangles);
        c.set_value(
            COUNTER_DRAW_CALLS.0,
            COUNTER_DRAW_CALLS.1,
            120.0 + (alive / 64.0).floor(),
        );
        c.set_value(COUNTER_VERTICES.0, COUNTER_VERTICES.1, triangles * 3.0);
        c.set_value(
            COUNTER_MEMORY_USED.0,
            COUNTER_MEMORY_USED.1,
            512.0 * 1024.0 * 1024.0 + alive * 256.0,
        );
        c.set_value(
            COUNTER_GPU_USAGE.0,
            COUNTER_GPU_USAGE.1,
            (0.35 + alive / 40_000.0 + 0.05 * time.sin()).clamp(0.0, 1.0),
        );
    }
}

impl Default for MockScene {
    fn default() -> Self {
        Self::new()
    }
}
