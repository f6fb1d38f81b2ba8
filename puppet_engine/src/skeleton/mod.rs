//! 枢轴系统
//!
//! 核心设计思想：
//! - PivotNode: 单个枢轴节点，本地变换 + 父节点引用
//! - PuppetRig: 管理 身体 → 手臂枢轴 → 手枢轴 → 末端执行器 的层次结构
//! - TwoLinkSolver: 两连杆解析 IK（余弦定理）
//! - PuppetPart: 部件统一能力接口

mod ik_solver;
mod part;
mod pivot_node;
mod puppet_rig;

pub use ik_solver::{target_bearing, triangle_angle, IkSolution, TwoLinkSolver};
pub use part::{PartHandle, PartId, PartKind, PartSlot, PartState, PuppetPart};
pub use pivot_node::{PivotFlags, PivotNode};
pub use puppet_rig::{InitialState, LinkLengths, NodePose, PuppetRig};

use glam::{DMat4, DQuat, DVec3, EulerRot};
use serde::Deserialize;

// ============================================================================
// 公共类型定义
// ============================================================================

/// 层次结构中的节点标识
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PivotId {
    Body,
    ArmPivot,
    HandPivot,
    EndEffector,
}

impl PivotId {
    pub const ALL: [PivotId; 4] = [
        PivotId::Body,
        PivotId::ArmPivot,
        PivotId::HandPivot,
        PivotId::EndEffector,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            PivotId::Body => "body",
            PivotId::ArmPivot => "armPivot",
            PivotId::HandPivot => "handPivot",
            PivotId::EndEffector => "endEffector",
        }
    }

    /// 节点所属部件（决定就绪状态）
    pub fn part(self) -> PartId {
        match self {
            PivotId::Body => PartId::Body,
            PivotId::ArmPivot => PartId::Arm,
            PivotId::HandPivot | PivotId::EndEffector => PartId::Hand,
        }
    }
}

/// 坐标轴
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    #[inline]
    pub fn component(self, v: DVec3) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }

    #[inline]
    pub fn set_component(self, v: &mut DVec3, value: f64) {
        match self {
            Axis::X => v.x = value,
            Axis::Y => v.y = value,
            Axis::Z => v.z = value,
        }
    }

    /// 该轴上长度为 amount 的向量
    #[inline]
    pub fn vector(self, amount: f64) -> DVec3 {
        match self {
            Axis::X => DVec3::new(amount, 0.0, 0.0),
            Axis::Y => DVec3::new(0.0, amount, 0.0),
            Axis::Z => DVec3::new(0.0, 0.0, amount),
        }
    }
}

/// 节点本地变换数据（欧拉角，XYZ 顺序）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PivotTransform {
    pub translation: DVec3,
    pub rotation: DVec3,
    pub scale: DVec3,
}

impl Default for PivotTransform {
    fn default() -> Self {
        Self {
            translation: DVec3::ZERO,
            rotation: DVec3::ZERO,
            scale: DVec3::ONE,
        }
    }
}

impl PivotTransform {
    #[inline]
    pub fn quaternion(&self) -> DQuat {
        DQuat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    /// 转换为 4x4 矩阵
    #[inline]
    pub fn to_matrix(&self) -> DMat4 {
        DMat4::from_scale_rotation_translation(self.scale, self.quaternion(), self.translation)
    }
}
