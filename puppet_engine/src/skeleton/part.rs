//! 部件
//!
//! 身体 / 手臂 / 手三个部件共享同一组能力（设置位姿、平移、旋转、查询世界位置），
//! 通过 PuppetPart trait 分发。资源异步加载，部件状态按
//! Unloaded → Loading → Ready / Failed 推进。

use std::path::Path;

use glam::DVec3;

use super::{PivotId, PuppetRig};

/// 部件标识
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PartId {
    Body,
    Arm,
    Hand,
}

impl PartId {
    pub const ALL: [PartId; 3] = [PartId::Body, PartId::Arm, PartId::Hand];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            PartId::Body => "body",
            PartId::Arm => "arm",
            PartId::Hand => "hand",
        }
    }
}

/// 部件资源类型
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PartKind {
    /// 贴图平面（盒子几何 + 纹理）
    ImagePlane { image: String },
    /// OBJ 模型 + MTL 材质
    ObjMtl { obj: String, mtl: Option<String> },
    /// glTF / GLB 模型
    Gltf { path: String },
}

impl PartKind {
    /// 根据文件扩展名推断类型
    pub fn from_paths(path: &str, material: Option<&str>) -> Self {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "glb" | "gltf" => PartKind::Gltf { path: path.to_string() },
            "png" | "jpg" | "jpeg" | "webp" => PartKind::ImagePlane { image: path.to_string() },
            _ => PartKind::ObjMtl {
                obj: path.to_string(),
                mtl: material.map(str::to_string),
            },
        }
    }
}

/// 部件加载状态
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PartState {
    #[default]
    Unloaded,
    Loading,
    Ready,
    Failed(String),
}

/// 部件槽位
#[derive(Clone, Debug)]
pub struct PartSlot {
    pub id: PartId,
    pub kind: PartKind,
    pub scale: DVec3,
    pub state: PartState,
}

impl PartSlot {
    pub fn new(id: PartId, kind: PartKind, scale: DVec3) -> Self {
        Self {
            id,
            kind,
            scale,
            state: PartState::Unloaded,
        }
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state == PartState::Ready
    }
}

// ============================================================================
// 部件能力接口
// ============================================================================

/// 部件统一能力集合
///
/// 未就绪的部件上所有写操作均为空操作，查询返回 None。
pub trait PuppetPart {
    fn set_position(&mut self, position: DVec3);
    fn set_rotation(&mut self, rotation: DVec3);
    /// 相对平移（身体受移动范围约束）
    fn move_by(&mut self, delta: DVec3);
    /// 相对旋转（不受约束）
    fn rotate(&mut self, delta: DVec3);
    fn world_position(&self) -> Option<DVec3>;
}

/// 指向 rig 中某个节点的可变句柄
pub struct PartHandle<'a> {
    pub(super) rig: &'a mut PuppetRig,
    pub(super) id: PivotId,
}

impl PartHandle<'_> {
    #[inline]
    pub fn id(&self) -> PivotId {
        self.id
    }
}

impl PuppetPart for PartHandle<'_> {
    fn set_position(&mut self, position: DVec3) {
        self.rig.set_position(self.id, position);
    }

    fn set_rotation(&mut self, rotation: DVec3) {
        self.rig.set_rotation(self.id, rotation);
    }

    fn move_by(&mut self, delta: DVec3) {
        self.rig.move_by(self.id, delta);
    }

    fn rotate(&mut self, delta: DVec3) {
        self.rig.rotate(self.id, delta);
    }

    fn world_position(&self) -> Option<DVec3> {
        self.rig.world_position(self.id)
    }
}
