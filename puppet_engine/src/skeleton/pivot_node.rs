//! 枢轴节点
//!
//! PivotNode 是木偶层次中的单个变换节点，
//! 变换计算：local_to_world = parent.local_to_world * local_to_parent

use bitflags::bitflags;
use glam::{DMat4, DVec3};

use super::{PivotId, PivotTransform};

// ============================================================================
// 节点标志
// ============================================================================

bitflags! {
    /// 节点标志位
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct PivotFlags: u32 {
        /// 可旋转
        const ROTATABLE = 1 << 0;
        /// 可移动
        const MOVABLE = 1 << 1;
        /// 平移受 MovementLimits 限制
        const LIMITED = 1 << 2;
        /// 旋转由 IK 写入
        const IK_DRIVEN = 1 << 3;
    }
}

// ============================================================================
// 枢轴节点
// ============================================================================

/// 枢轴节点
///
/// - 静态数据：名称、父节点、标志
/// - 动态数据：本地位置 / 旋转，以及每次变更后重算的矩阵
#[derive(Clone, Debug)]
pub struct PivotNode {
    pub id: PivotId,
    pub parent: Option<PivotId>,
    pub flags: PivotFlags,

    /// 本地变换（相对父节点的偏移与旋转）
    pub transform: PivotTransform,

    /// 本地变换矩阵 (local_to_parent)
    pub local_to_parent: DMat4,

    /// 全局变换矩阵 (local_to_world)
    pub local_to_world: DMat4,
}

impl PivotNode {
    pub fn new(id: PivotId, parent: Option<PivotId>, flags: PivotFlags) -> Self {
        Self {
            id,
            parent,
            flags,
            transform: PivotTransform::default(),
            local_to_parent: DMat4::IDENTITY,
            local_to_world: DMat4::IDENTITY,
        }
    }

    pub fn with_pose(mut self, position: DVec3, rotation: DVec3) -> Self {
        self.transform.translation = position;
        self.transform.rotation = rotation;
        self.compute_local_transform();
        self
    }

    pub fn with_scale(mut self, scale: DVec3) -> Self {
        self.transform.scale = scale;
        self.compute_local_transform();
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    #[inline]
    pub fn position(&self) -> DVec3 {
        self.transform.translation
    }

    #[inline]
    pub fn rotation(&self) -> DVec3 {
        self.transform.rotation
    }

    /// 世界位置
    #[inline]
    pub fn world_position(&self) -> DVec3 {
        self.local_to_world.col(3).truncate()
    }

    /// 计算本地变换 (local_to_parent)
    #[inline]
    pub fn compute_local_transform(&mut self) {
        self.local_to_parent = self.transform.to_matrix();
    }

    #[inline]
    pub fn is_rotatable(&self) -> bool {
        self.flags.contains(PivotFlags::ROTATABLE)
    }

    #[inline]
    pub fn is_movable(&self) -> bool {
        self.flags.contains(PivotFlags::MOVABLE)
    }

    #[inline]
    pub fn is_limited(&self) -> bool {
        self.flags.contains(PivotFlags::LIMITED)
    }

    #[inline]
    pub fn is_ik_driven(&self) -> bool {
        self.flags.contains(PivotFlags::IK_DRIVEN)
    }
}
