//! 3D 位姿数学
//!
//! 提供位置向量、单位四元数和位姿（位置+旋转）的表示与组合运算，
//! 用于锚点相对坐标的换算与回放插值。
//!
//! # 设计目标
//!
//! - **数值稳定**: 四元数归一化防止 NaN 传播，slerp 在小夹角时退化为 nlerp
//! - **最短路径**: slerp 自动翻转半球，两个相邻采样之间不会绕远路
//! - **自包含**: 全部为 `Copy` 值类型，无堆分配
//!
//! # 示例
//!
//! ```rust
//! use reprise_core::math::{Pose, Position3D, Quaternion};
//!
//! let anchor = Pose::new(
//!     Position3D::new(1.0, 0.0, 0.0),
//!     Quaternion::from_axis_angle(Position3D::new(0.0, 1.0, 0.0), 1.57),
//! );
//!
//! // 世界位姿 -> 锚点相对位姿 -> 世界位姿
//! let head = Pose::new(Position3D::new(1.5, 1.6, 0.0), Quaternion::IDENTITY);
//! let relative = head.relative_to(&anchor);
//! let restored = anchor.compose(&relative);
//! ```

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// 四元数归一化阈值（避免除零）
///
/// 当四元数的模平方小于此值时，归一化会返回单位四元数。
const QUATERNION_NORM_THRESHOLD: f64 = 1e-10;

/// slerp 退化阈值
///
/// 两个四元数点积超过此值时夹角极小，`sin(θ)` 接近 0，
/// 此时退化为线性插值+归一化（nlerp），结果差异在浮点噪声量级。
const SLERP_NLERP_THRESHOLD: f64 = 0.9995;

/// 三维位置向量（米）
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position3D {
    /// X 坐标（米）
    pub x: f64,
    /// Y 坐标（米）
    pub y: f64,
    /// Z 坐标（米）
    pub z: f64,
}

impl Position3D {
    /// 创建新的三维位置
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Position3D { x, y, z }
    }

    /// 零向量
    pub const ZERO: Self = Position3D::new(0.0, 0.0, 0.0);

    /// 计算向量长度（范数）
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// 归一化（单位向量）
    pub fn normalize(&self) -> Self {
        let n = self.norm();
        if n < 1e-10 {
            return Position3D::ZERO;
        }
        Position3D {
            x: self.x / n,
            y: self.y / n,
            z: self.z / n,
        }
    }

    /// 点积
    pub fn dot(&self, other: &Position3D) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// 叉积
    pub fn cross(&self, other: &Position3D) -> Position3D {
        Position3D {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// 线性插值，`t ∈ [0, 1]`（超出范围会被截断）
    pub fn lerp(&self, other: &Position3D, t: f64) -> Position3D {
        let t = t.clamp(0.0, 1.0);
        Position3D {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }

    /// 两点间距离
    pub fn distance(&self, other: &Position3D) -> f64 {
        (*self - *other).norm()
    }
}

impl Add for Position3D {
    type Output = Position3D;

    fn add(self, rhs: Position3D) -> Position3D {
        Position3D::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Position3D {
    type Output = Position3D;

    fn sub(self, rhs: Position3D) -> Position3D {
        Position3D::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Position3D {
    type Output = Position3D;

    fn neg(self) -> Position3D {
        Position3D::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f64> for Position3D {
    type Output = Position3D;

    fn mul(self, rhs: f64) -> Position3D {
        Position3D::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl fmt::Display for Position3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

/// 四元数（用于表示3D旋转）
///
/// 四元数是表示3D旋转的数学工具，避免了欧拉角的万向节锁问题。
/// 除构造函数外，所有旋转运算都假定输入已是单位四元数。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quaternion {
    /// 实部
    pub w: f64,
    /// 虚部 i
    pub x: f64,
    /// 虚部 j
    pub y: f64,
    /// 虚部 k
    pub z: f64,
}

impl Quaternion {
    /// 单位四元数（无旋转）
    pub const IDENTITY: Self = Quaternion {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// 从旋转轴和角度创建四元数
    ///
    /// # 参数
    ///
    /// - `axis`: 旋转轴（内部会归一化）
    /// - `angle`: 旋转角（弧度）
    pub fn from_axis_angle(axis: Position3D, angle: f64) -> Self {
        let axis = axis.normalize();
        let half = angle / 2.0;
        let s = half.sin();
        Quaternion {
            w: half.cos(),
            x: axis.x * s,
            y: axis.y * s,
            z: axis.z * s,
        }
    }

    /// 模平方
    pub fn norm_squared(&self) -> f64 {
        self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// 归一化（确保单位四元数）
    ///
    /// # 数值稳定性
    ///
    /// 如果四元数的模接近 0（< 1e-10），返回默认单位四元数 (1, 0, 0, 0)
    /// 以避免除零错误和 NaN 扩散。
    ///
    /// 这种情况理论上不应发生，但在解析损坏的录制文件或数值计算
    /// 累积误差时可能出现。
    pub fn normalize(&self) -> Self {
        let norm_sq = self.norm_squared();

        // ✅ 数值稳定性检查：避免除零
        if norm_sq < QUATERNION_NORM_THRESHOLD {
            // 返回默认单位四元数（无旋转）
            tracing::warn!(
                "Normalizing near-zero quaternion (norm²={:.2e} < {:.2e}): Q({:.3}, {:.3}, {:.3}, {:.3}), returning identity",
                norm_sq,
                QUATERNION_NORM_THRESHOLD,
                self.w,
                self.x,
                self.y,
                self.z
            );
            return Quaternion::IDENTITY;
        }

        let norm = norm_sq.sqrt();
        Quaternion {
            w: self.w / norm,
            x: self.x / norm,
            y: self.y / norm,
            z: self.z / norm,
        }
    }

    /// 四元数乘法（组合旋转）
    pub fn multiply(&self, other: &Quaternion) -> Quaternion {
        Quaternion {
            w: self.w * other.w - self.x * other.x - self.y * other.y - self.z * other.z,
            x: self.w * other.x + self.x * other.w + self.y * other.z - self.z * other.y,
            y: self.w * other.y - self.x * other.z + self.y * other.w + self.z * other.x,
            z: self.w * other.z + self.x * other.y - self.y * other.x + self.z * other.w,
        }
    }

    /// 共轭（单位四元数的逆旋转）
    pub fn conjugate(&self) -> Quaternion {
        Quaternion {
            w: self.w,
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    /// 四维点积（用于最短路径判定）
    pub fn dot(&self, other: &Quaternion) -> f64 {
        self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// 旋转一个向量
    ///
    /// 等价于 `q * (0, v) * q⁻¹`，这里用展开形式避免两次完整乘法：
    /// `v' = v + 2w(u×v) + 2u×(u×v)`，其中 `u` 为虚部向量。
    pub fn rotate(&self, v: Position3D) -> Position3D {
        let u = Position3D::new(self.x, self.y, self.z);
        let uv = u.cross(&v);
        let uuv = u.cross(&uv);
        Position3D {
            x: v.x + 2.0 * (self.w * uv.x + uuv.x),
            y: v.y + 2.0 * (self.w * uv.y + uuv.y),
            z: v.z + 2.0 * (self.w * uv.z + uuv.z),
        }
    }

    /// 球面线性插值，`t ∈ [0, 1]`（超出范围会被截断）
    ///
    /// # 行为
    ///
    /// - 点积为负时翻转终点四元数，保证走最短旋转路径
    /// - 夹角极小时（点积 > 0.9995）退化为 nlerp
    /// - 返回值总是归一化的
    pub fn slerp(&self, other: &Quaternion, t: f64) -> Quaternion {
        let t = t.clamp(0.0, 1.0);
        let mut dot = self.dot(other);
        let mut end = *other;

        // 最短路径：q 和 -q 表示同一旋转
        if dot < 0.0 {
            end = Quaternion {
                w: -other.w,
                x: -other.x,
                y: -other.y,
                z: -other.z,
            };
            dot = -dot;
        }

        if dot > SLERP_NLERP_THRESHOLD {
            let q = Quaternion {
                w: self.w + (end.w - self.w) * t,
                x: self.x + (end.x - self.x) * t,
                y: self.y + (end.y - self.y) * t,
                z: self.z + (end.z - self.z) * t,
            };
            return q.normalize();
        }

        let theta_0 = dot.clamp(-1.0, 1.0).acos();
        let sin_theta_0 = theta_0.sin();
        let s0 = ((1.0 - t) * theta_0).sin() / sin_theta_0;
        let s1 = (t * theta_0).sin() / sin_theta_0;

        Quaternion {
            w: s0 * self.w + s1 * end.w,
            x: s0 * self.x + s1 * end.x,
            y: s0 * self.y + s1 * end.y,
            z: s0 * self.z + s1 * end.z,
        }
        .normalize()
    }
}

impl fmt::Display for Quaternion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Q({:.3}, {:.3}, {:.3}, {:.3})",
            self.w, self.x, self.y, self.z
        )
    }
}

/// 位姿（位置 + 旋转）
///
/// 既可以表示某个帧的世界位姿，也可以表示相对某个锚点的局部位姿，
/// 两种用法通过 [`Pose::compose`] / [`Pose::relative_to`] 互相转换。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    /// 位置（米）
    pub position: Position3D,
    /// 旋转（单位四元数）
    pub rotation: Quaternion,
}

impl Pose {
    /// 单位位姿（原点，无旋转）
    pub const IDENTITY: Self = Pose {
        position: Position3D::ZERO,
        rotation: Quaternion::IDENTITY,
    };

    /// 从位置和四元数创建
    pub const fn new(position: Position3D, rotation: Quaternion) -> Self {
        Pose { position, rotation }
    }

    /// 将局部坐标点变换到本位姿所在坐标系
    pub fn transform_point(&self, local: Position3D) -> Position3D {
        self.rotation.rotate(local) + self.position
    }

    /// 将本坐标系中的点变换回局部坐标
    pub fn inverse_transform_point(&self, point: Position3D) -> Position3D {
        self.rotation.conjugate().rotate(point - self.position)
    }

    /// 位姿复合：`self ∘ local`
    ///
    /// `local` 是以 `self` 为父坐标系的局部位姿，返回其世界位姿。
    pub fn compose(&self, local: &Pose) -> Pose {
        Pose {
            position: self.transform_point(local.position),
            rotation: self.rotation.multiply(&local.rotation).normalize(),
        }
    }

    /// 逆位姿
    ///
    /// 满足 `pose.compose(&pose.inverse()) ≈ IDENTITY`。
    pub fn inverse(&self) -> Pose {
        let inv_rotation = self.rotation.conjugate();
        Pose {
            position: -inv_rotation.rotate(self.position),
            rotation: inv_rotation,
        }
    }

    /// 将本位姿表示到 `anchor` 坐标系中
    ///
    /// 位置取锚点局部坐标，旋转左乘锚点姿态的逆。
    /// 满足 `anchor.compose(&pose.relative_to(&anchor)) ≈ pose`。
    pub fn relative_to(&self, anchor: &Pose) -> Pose {
        Pose {
            position: anchor.inverse_transform_point(self.position),
            rotation: anchor
                .rotation
                .conjugate()
                .multiply(&self.rotation)
                .normalize(),
        }
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pose(pos: {}, quat: {})", self.position, self.rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_pos_eq(a: Position3D, b: Position3D) {
        assert!(
            a.distance(&b) < EPS,
            "position mismatch: {a} vs {b} (d={})",
            a.distance(&b)
        );
    }

    fn assert_quat_eq(a: Quaternion, b: Quaternion) {
        // q 和 -q 表示同一旋转
        let d = a.dot(&b).abs();
        assert!(d > 1.0 - EPS, "quaternion mismatch: {a} vs {b} (|dot|={d})");
    }

    #[test]
    fn test_position3d_basic() {
        let pos = Position3D::new(1.0, 2.0, 3.0);
        assert_eq!(pos.x, 1.0);
        assert_eq!(pos.y, 2.0);
        assert_eq!(pos.z, 3.0);
    }

    #[test]
    fn test_position3d_norm() {
        let pos = Position3D::new(3.0, 4.0, 0.0);
        assert!((pos.norm() - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_position3d_normalize() {
        let pos = Position3D::new(3.0, 4.0, 0.0);
        let normalized = pos.normalize();
        assert!((normalized.norm() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_position3d_dot_cross() {
        let a = Position3D::new(1.0, 2.0, 3.0);
        let b = Position3D::new(4.0, 5.0, 6.0);
        assert_eq!(a.dot(&b), 32.0); // 1*4 + 2*5 + 3*6

        let x = Position3D::new(1.0, 0.0, 0.0);
        let y = Position3D::new(0.0, 1.0, 0.0);
        let z = x.cross(&y);
        assert_pos_eq(z, Position3D::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_position3d_lerp_midpoint() {
        let a = Position3D::new(0.0, 0.0, 0.0);
        let b = Position3D::new(2.0, -4.0, 6.0);
        assert_pos_eq(a.lerp(&b, 0.5), Position3D::new(1.0, -2.0, 3.0));
        // 端点精确命中
        assert_pos_eq(a.lerp(&b, 0.0), a);
        assert_pos_eq(a.lerp(&b, 1.0), b);
        // 截断
        assert_pos_eq(a.lerp(&b, 1.5), b);
    }

    #[test]
    fn test_quaternion_identity() {
        let quat = Quaternion::IDENTITY;
        assert_eq!(quat.w, 1.0);
        assert_eq!(quat.x, 0.0);
    }

    #[test]
    fn test_quaternion_normalization() {
        let quat = Quaternion {
            w: 1.0,
            x: 1.0,
            y: 1.0,
            z: 1.0,
        };
        let normalized = quat.normalize();
        assert!((normalized.norm_squared().sqrt() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_quaternion_near_zero_stability() {
        // 测试近零四元数的数值稳定性
        let near_zero = Quaternion {
            w: 1e-20,
            x: 1e-20,
            y: 1e-20,
            z: 1e-20,
        };
        let normalized = near_zero.normalize();

        // 应该返回单位四元数（无旋转）
        assert_eq!(normalized.w, 1.0);
        assert_eq!(normalized.x, 0.0);

        // 完全为零时不应产生 NaN
        let zero = Quaternion {
            w: 0.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        };
        let normalized_zero = zero.normalize();
        assert!(!normalized_zero.w.is_nan());
        assert_eq!(normalized_zero.w, 1.0);
    }

    #[test]
    fn test_quaternion_multiply_composes_rotations() {
        let axis = Position3D::new(0.0, 0.0, 1.0);
        let q1 = Quaternion::from_axis_angle(axis, 0.1);
        let q2 = Quaternion::from_axis_angle(axis, 0.2);
        let q3 = q1.multiply(&q2);
        let expected = Quaternion::from_axis_angle(axis, 0.3);
        assert_quat_eq(q3, expected);
    }

    #[test]
    fn test_quaternion_conjugate() {
        let quat = Quaternion {
            w: 0.7,
            x: 0.1,
            y: 0.2,
            z: 0.3,
        };
        let conj = quat.conjugate();
        assert_eq!(conj.w, 0.7);
        assert_eq!(conj.x, -0.1);
        assert_eq!(conj.y, -0.2);
        assert_eq!(conj.z, -0.3);
    }

    #[test]
    fn test_quaternion_rotate() {
        // 绕 Z 轴转 90°：X 轴单位向量应落到 Y 轴
        let q = Quaternion::from_axis_angle(
            Position3D::new(0.0, 0.0, 1.0),
            std::f64::consts::FRAC_PI_2,
        );
        let rotated = q.rotate(Position3D::new(1.0, 0.0, 0.0));
        assert_pos_eq(rotated, Position3D::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_quaternion_slerp_midpoint() {
        let axis = Position3D::new(0.0, 1.0, 0.0);
        let a = Quaternion::IDENTITY;
        let b = Quaternion::from_axis_angle(axis, 1.0);
        let mid = a.slerp(&b, 0.5);
        let expected = Quaternion::from_axis_angle(axis, 0.5);
        assert_quat_eq(mid, expected);
    }

    #[test]
    fn test_quaternion_slerp_endpoints() {
        let a = Quaternion::from_axis_angle(Position3D::new(1.0, 0.0, 0.0), 0.4);
        let b = Quaternion::from_axis_angle(Position3D::new(0.0, 1.0, 0.0), 1.2);
        assert_quat_eq(a.slerp(&b, 0.0), a);
        assert_quat_eq(a.slerp(&b, 1.0), b);
    }

    #[test]
    fn test_quaternion_slerp_shortest_path() {
        // b 被取反后仍表示同一旋转，slerp 必须走短弧
        let axis = Position3D::new(0.0, 0.0, 1.0);
        let a = Quaternion::IDENTITY;
        let b = Quaternion::from_axis_angle(axis, 0.8);
        let b_flipped = Quaternion {
            w: -b.w,
            x: -b.x,
            y: -b.y,
            z: -b.z,
        };
        let mid = a.slerp(&b_flipped, 0.5);
        let expected = Quaternion::from_axis_angle(axis, 0.4);
        assert_quat_eq(mid, expected);
    }

    #[test]
    fn test_quaternion_slerp_nearly_identical() {
        // 夹角极小时走 nlerp 分支，不应产生 NaN
        let a = Quaternion::from_axis_angle(Position3D::new(1.0, 0.0, 0.0), 0.5);
        let b = Quaternion::from_axis_angle(Position3D::new(1.0, 0.0, 0.0), 0.5 + 1e-9);
        let mid = a.slerp(&b, 0.5);
        assert!(!mid.w.is_nan());
        assert_quat_eq(mid, a);
    }

    #[test]
    fn test_pose_transform_point_round_trip() {
        let pose = Pose::new(
            Position3D::new(1.0, 2.0, 3.0),
            Quaternion::from_axis_angle(Position3D::new(0.3, 0.5, 0.8), 0.7),
        );
        let local = Position3D::new(-0.4, 0.9, 2.5);
        let world = pose.transform_point(local);
        let back = pose.inverse_transform_point(world);
        assert_pos_eq(back, local);
    }

    #[test]
    fn test_pose_compose_inverse() {
        let pose = Pose::new(
            Position3D::new(0.5, -1.0, 2.0),
            Quaternion::from_axis_angle(Position3D::new(0.0, 1.0, 0.0), 1.1),
        );
        let id = pose.compose(&pose.inverse());
        assert_pos_eq(id.position, Position3D::ZERO);
        assert_quat_eq(id.rotation, Quaternion::IDENTITY);
    }

    #[test]
    fn test_pose_relative_round_trip() {
        let anchor = Pose::new(
            Position3D::new(2.0, 0.5, -1.0),
            Quaternion::from_axis_angle(Position3D::new(0.0, 0.0, 1.0), 0.9),
        );
        let head = Pose::new(
            Position3D::new(2.3, 1.9, -0.2),
            Quaternion::from_axis_angle(Position3D::new(1.0, 1.0, 0.0), 0.4),
        );

        let relative = head.relative_to(&anchor);
        let restored = anchor.compose(&relative);
        assert_pos_eq(restored.position, head.position);
        assert_quat_eq(restored.rotation, head.rotation);
    }

    #[test]
    fn test_pose_relative_to_identity_anchor() {
        // 锚点为单位位姿时，相对位姿就是世界位姿
        let head = Pose::new(
            Position3D::new(0.1, 1.7, 0.3),
            Quaternion::from_axis_angle(Position3D::new(0.0, 1.0, 0.0), 0.2),
        );
        let relative = head.relative_to(&Pose::IDENTITY);
        assert_pos_eq(relative.position, head.position);
        assert_quat_eq(relative.rotation, head.rotation);
    }
}
