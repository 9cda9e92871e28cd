//! 场景帧（变换节点）抽象

use reprise_core::Pose;

/// 场景中的一个变换节点
///
/// 引擎以 `Arc<dyn Frame>` 共享帧句柄，因此所有方法都取 `&self`，
/// 内部可变性由实现方负责。锚点帧可能在会话之间被移动或重设父级，
/// 使用方每个 tick 都应重新读取 `world_pose`，不要缓存。
pub trait Frame: Send + Sync {
    /// 世界坐标系位姿
    fn world_pose(&self) -> Pose;

    /// 设置世界坐标系位姿
    fn set_world_pose(&self, pose: Pose);

    /// 相对父节点的局部位姿
    fn local_pose(&self) -> Pose;

    /// 设置相对父节点的局部位姿
    fn set_local_pose(&self, pose: Pose);

    /// 帧名称（仅用于日志）
    fn name(&self) -> &str {
        "frame"
    }
}
