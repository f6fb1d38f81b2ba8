//! 木偶层次结构
//!
//! 身体 → 手臂枢轴 → 手枢轴 → 末端执行器。
//! 每个节点只修改自身的本地变换，随后递归刷新子孙节点的全局变换，
//! 不会直接改动兄弟节点。

use glam::{DMat4, DVec3};

use crate::config::{MovementLimits, PuppetConfig};
use crate::geometry::planar_distance;
use crate::{PuppetError, Result};

use super::part::{PartHandle, PartId, PartKind, PartSlot, PartState};
use super::pivot_node::{PivotFlags, PivotNode};
use super::{Axis, PivotId};

// ============================================================================
// 初始状态快照
// ============================================================================

/// 节点位姿（本地位置 + 欧拉角）
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NodePose {
    pub position: DVec3,
    pub rotation: DVec3,
}

/// 初始状态快照，构建时捕获，之后只读
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InitialState {
    body: NodePose,
    arm_pivot: NodePose,
    hand_pivot: NodePose,
}

impl InitialState {
    pub fn from_config(config: &PuppetConfig) -> Self {
        Self {
            body: NodePose {
                position: config.body.position(),
                rotation: config.body.rotation(),
            },
            arm_pivot: NodePose {
                position: config.arm.pivot_position(),
                rotation: config.arm.pivot_rotation(),
            },
            hand_pivot: NodePose {
                position: config.hand.pivot_position(),
                rotation: config.hand.pivot_rotation(),
            },
        }
    }

    /// 从当前 rig 捕获
    pub fn capture(rig: &PuppetRig) -> Self {
        let pose = |id: PivotId| {
            let node = rig.node(id);
            NodePose {
                position: node.position(),
                rotation: node.rotation(),
            }
        };
        Self {
            body: pose(PivotId::Body),
            arm_pivot: pose(PivotId::ArmPivot),
            hand_pivot: pose(PivotId::HandPivot),
        }
    }

    pub fn pose(&self, id: PivotId) -> Option<NodePose> {
        match id {
            PivotId::Body => Some(self.body),
            PivotId::ArmPivot => Some(self.arm_pivot),
            PivotId::HandPivot => Some(self.hand_pivot),
            PivotId::EndEffector => None,
        }
    }
}

// ============================================================================
// 连杆长度
// ============================================================================

/// 每帧根据世界位置重新计算的连杆长度（平面距离）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkLengths {
    /// 手臂枢轴 ↔ 手枢轴
    pub arm: f64,
    /// 手枢轴 ↔ 末端执行器
    pub hand: f64,
    /// 手臂枢轴 ↔ 末端执行器
    pub arm_to_end: f64,
}

impl LinkLengths {
    /// 可达半径
    #[inline]
    pub fn reach(&self) -> f64 {
        self.arm + self.hand
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.arm > 0.0 && self.hand > 0.0 && self.arm.is_finite() && self.hand.is_finite()
    }
}

// ============================================================================
// PuppetRig
// ============================================================================

/// 木偶层次结构
#[derive(Clone, Debug)]
pub struct PuppetRig {
    nodes: Vec<PivotNode>,
    children_cache: Vec<Vec<usize>>,
    parts: Vec<PartSlot>,
    limits: MovementLimits,
    initial_state: InitialState,
}

impl PuppetRig {
    /// 按配置构建层次结构，部件均处于 Unloaded 状态
    pub fn from_config(config: &PuppetConfig) -> Self {
        let initial_state = InitialState::from_config(config);

        let body = PivotNode::new(
            PivotId::Body,
            None,
            PivotFlags::ROTATABLE | PivotFlags::MOVABLE | PivotFlags::LIMITED,
        )
        .with_scale(config.body.scale())
        .with_pose(config.body.position(), config.body.rotation());

        let arm_pivot = PivotNode::new(
            PivotId::ArmPivot,
            Some(PivotId::Body),
            PivotFlags::ROTATABLE | PivotFlags::MOVABLE | PivotFlags::IK_DRIVEN,
        )
        .with_pose(config.arm.pivot_position(), config.arm.pivot_rotation());

        let hand_pivot = PivotNode::new(
            PivotId::HandPivot,
            Some(PivotId::ArmPivot),
            PivotFlags::ROTATABLE | PivotFlags::MOVABLE | PivotFlags::IK_DRIVEN,
        )
        .with_pose(config.hand.pivot_position(), config.hand.pivot_rotation());

        let end_effector = PivotNode::new(
            PivotId::EndEffector,
            Some(PivotId::HandPivot),
            PivotFlags::empty(),
        )
        .with_pose(config.end_effector_offset(), DVec3::ZERO);

        let nodes = vec![body, arm_pivot, hand_pivot, end_effector];

        let mut children_cache = vec![Vec::new(); nodes.len()];
        for node in &nodes {
            if let Some(parent) = node.parent {
                children_cache[parent.index()].push(node.id.index());
            }
        }

        let part_slot = |id: PartId, part: &crate::config::PartConfig| {
            PartSlot::new(
                id,
                PartKind::from_paths(&part.path, part.material.as_deref()),
                part.scale(),
            )
        };
        let parts = vec![
            part_slot(PartId::Body, &config.body),
            part_slot(PartId::Arm, &config.arm),
            part_slot(PartId::Hand, &config.hand),
        ];

        let mut rig = Self {
            nodes,
            children_cache,
            parts,
            limits: config.limits,
            initial_state,
        };
        rig.update_global_transform_recursive(PivotId::Body.index());

        log::info!(
            "[Rig] 层次结构已构建: body={:?}, arm={:?}, hand={:?}",
            rig.parts[0].kind,
            rig.parts[1].kind,
            rig.parts[2].kind
        );
        rig
    }

    /// 构建并直接把所有部件标记为就绪（无渲染环境）
    pub fn assembled(config: &PuppetConfig) -> Self {
        let mut rig = Self::from_config(config);
        for part in PartId::ALL {
            rig.mark_ready(part);
        }
        rig
    }

    // ========================================
    // 访问器
    // ========================================

    #[inline]
    pub fn node(&self, id: PivotId) -> &PivotNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn limits(&self) -> &MovementLimits {
        &self.limits
    }

    #[inline]
    pub fn initial_state(&self) -> &InitialState {
        &self.initial_state
    }

    #[inline]
    pub fn part_slot(&self, part: PartId) -> &PartSlot {
        &self.parts[part.index()]
    }

    /// 获取部件能力句柄
    pub fn part(&mut self, id: PivotId) -> PartHandle<'_> {
        PartHandle { rig: self, id }
    }

    // ========================================
    // 部件就绪状态
    // ========================================

    /// Unloaded → Loading
    pub fn begin_loading(&mut self, part: PartId) -> bool {
        let slot = &mut self.parts[part.index()];
        if slot.state != PartState::Unloaded {
            log::warn!("[Rig] 部件 '{}' 状态为 {:?}，无法开始加载", part.name(), slot.state);
            return false;
        }
        slot.state = PartState::Loading;
        true
    }

    /// Unloaded / Loading → Ready
    pub fn mark_ready(&mut self, part: PartId) -> bool {
        let previous = self.parts[part.index()].state.clone();
        match previous {
            PartState::Ready => true,
            PartState::Failed(_) => {
                log::warn!("[Rig] 部件 '{}' 已加载失败，忽略就绪通知", part.name());
                false
            }
            PartState::Unloaded | PartState::Loading => {
                self.parts[part.index()].state = PartState::Ready;
                log::info!("[Rig] 部件 '{}' 就绪", part.name());
                if self.is_operable() {
                    log::info!("[Rig] 所有部件就绪");
                }
                true
            }
        }
    }

    /// 任意状态 → Failed
    pub fn mark_failed(&mut self, part: PartId, reason: impl Into<String>) {
        let reason = reason.into();
        log::warn!("[Rig] 部件 '{}' 加载失败: {}", part.name(), reason);
        self.parts[part.index()].state = PartState::Failed(reason);
    }

    /// 所有部件均已就绪
    pub fn is_operable(&self) -> bool {
        self.parts.iter().all(PartSlot::is_ready)
    }

    /// 所有部件就绪，否则返回未就绪部件列表
    pub fn ensure_operable(&self) -> Result<()> {
        let pending: Vec<&str> = self
            .parts
            .iter()
            .filter(|slot| !slot.is_ready())
            .map(|slot| slot.id.name())
            .collect();
        if pending.is_empty() {
            Ok(())
        } else {
            Err(PuppetError::PartNotReady(pending.join(", ")))
        }
    }

    /// 节点所属部件及其所有祖先部件均已就绪
    pub fn is_attached(&self, id: PivotId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if !self.parts[node_id.part().index()].is_ready() {
                return false;
            }
            current = self.nodes[node_id.index()].parent;
        }
        true
    }

    // ========================================
    // 节点操作（未就绪或节点标志不允许时为空操作）
    // ========================================

    fn can_move(&self, id: PivotId) -> bool {
        self.is_attached(id) && self.nodes[id.index()].is_movable()
    }

    fn can_rotate(&self, id: PivotId) -> bool {
        self.is_attached(id) && self.nodes[id.index()].is_rotatable()
    }

    pub fn set_position(&mut self, id: PivotId, position: DVec3) {
        if !self.can_move(id) {
            return;
        }
        self.nodes[id.index()].transform.translation = position;
        self.refresh(id);
    }

    pub fn set_rotation(&mut self, id: PivotId, rotation: DVec3) {
        if !self.can_rotate(id) {
            return;
        }
        self.nodes[id.index()].transform.rotation = rotation;
        self.refresh(id);
    }

    /// 设置单轴旋转，其他轴保持不变
    pub fn set_axis_rotation(&mut self, id: PivotId, axis: Axis, angle: f64) {
        if !self.can_rotate(id) {
            return;
        }
        axis.set_component(&mut self.nodes[id.index()].transform.rotation, angle);
        self.refresh(id);
    }

    /// 相对平移；受限节点只在被移动的轴上饱和到范围边界
    pub fn move_by(&mut self, id: PivotId, delta: DVec3) {
        if !self.can_move(id) {
            return;
        }

        let node = &mut self.nodes[id.index()];
        let mut position = node.transform.translation + delta;
        if node.is_limited() {
            let limits = [self.limits.x, self.limits.y, self.limits.z];
            for (axis, limit) in Axis::ALL.into_iter().zip(limits) {
                if axis.component(delta) != 0.0 {
                    let clamped = limit.clamp(axis.component(position));
                    axis.set_component(&mut position, clamped);
                }
            }
        }
        node.transform.translation = position;
        self.refresh(id);
    }

    /// 相对旋转（不受约束）
    pub fn rotate(&mut self, id: PivotId, delta: DVec3) {
        if !self.can_rotate(id) {
            return;
        }
        self.nodes[id.index()].transform.rotation += delta;
        self.refresh(id);
    }

    /// 世界位置（沿祖先链解析）
    pub fn world_position(&self, id: PivotId) -> Option<DVec3> {
        self.is_attached(id).then(|| self.nodes[id.index()].world_position())
    }

    /// 全局变换矩阵
    pub fn world_matrix(&self, id: PivotId) -> Option<DMat4> {
        self.is_attached(id).then(|| self.nodes[id.index()].local_to_world)
    }

    /// 手臂枢轴铰链轴在世界空间中与运动平面法线（Z）的对齐程度
    ///
    /// 返回 |cos|，1 表示铰链垂直于运动平面，此时 IK 旋转不改变平面连杆长度。
    pub fn hinge_alignment(&self, axis: Axis) -> Option<f64> {
        let world_axis = self
            .world_matrix(PivotId::ArmPivot)?
            .transform_vector3(axis.vector(1.0))
            .normalize_or_zero();
        Some(world_axis.z.abs())
    }

    /// 根据当前世界位置计算连杆长度
    pub fn link_lengths(&self) -> Option<LinkLengths> {
        let arm = self.world_position(PivotId::ArmPivot)?;
        let hand = self.world_position(PivotId::HandPivot)?;
        let end = self.world_position(PivotId::EndEffector)?;

        Some(LinkLengths {
            arm: planar_distance(arm, hand),
            hand: planar_distance(hand, end),
            arm_to_end: planar_distance(arm, end),
        })
    }

    /// 原子地恢复身体、手臂枢轴、手枢轴的位置与旋转
    ///
    /// 任一部件未就绪时整体不执行，返回 false。
    pub fn reset_to(&mut self, state: &InitialState) -> bool {
        if !self.is_operable() {
            log::warn!("[Rig] 部件未全部就绪，跳过重置");
            return false;
        }

        for id in [PivotId::Body, PivotId::ArmPivot, PivotId::HandPivot] {
            if let Some(pose) = state.pose(id) {
                let node = &mut self.nodes[id.index()];
                node.transform.translation = pose.position;
                node.transform.rotation = pose.rotation;
                node.compute_local_transform();
            }
        }
        self.update_global_transform_recursive(PivotId::Body.index());
        true
    }

    /// 恢复到构建时捕获的初始状态
    pub fn reset(&mut self) -> bool {
        let state = self.initial_state;
        self.reset_to(&state)
    }

    // ========================================
    // 变换刷新
    // ========================================

    fn refresh(&mut self, id: PivotId) {
        self.nodes[id.index()].compute_local_transform();
        self.update_global_transform_recursive(id.index());
    }

    /// 递归更新全局变换
    fn update_global_transform_recursive(&mut self, idx: usize) {
        if idx >= self.nodes.len() {
            return;
        }

        let parent_global = self.nodes[idx]
            .parent
            .map(|parent| self.nodes[parent.index()].local_to_world)
            .unwrap_or(DMat4::IDENTITY);
        self.nodes[idx].local_to_world = parent_global * self.nodes[idx].local_to_parent;

        // 递归更新子节点
        for child in 0..self.children_cache[idx].len() {
            let child_idx = self.children_cache[idx][child];
            self.update_global_transform_recursive(child_idx);
        }
    }
}
