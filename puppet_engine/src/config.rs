//! 木偶配置
//!
//! - PuppetConfig: 部件路径、初始位姿、枢轴偏移与移动限制（来自 JSON）
//! - MotionConfig: 手动模式步长与调度参数（扁平化，直接修改默认值即可）
//! - IkCalibration: 与资源静止姿态绑定的 IK 相位常量

use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, PI};
use std::fs;
use std::path::Path;

use glam::DVec3;
use serde::Deserialize;

use crate::skeleton::Axis;
use crate::{PuppetError, Result};

// ============================================================================
// 移动限制
// ============================================================================

/// 单轴范围
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct AxisLimit {
    pub min: f64,
    pub max: f64,
}

impl AxisLimit {
    pub const UNBOUNDED: Self = Self {
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
    };

    #[inline]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// 身体平移的轴对齐包围范围
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct MovementLimits {
    pub x: AxisLimit,
    pub y: AxisLimit,
    pub z: AxisLimit,
}

impl MovementLimits {
    pub fn unbounded() -> Self {
        Self {
            x: AxisLimit::UNBOUNDED,
            y: AxisLimit::UNBOUNDED,
            z: AxisLimit::UNBOUNDED,
        }
    }

    /// 逐轴饱和到范围内
    pub fn clamp(&self, p: DVec3) -> DVec3 {
        DVec3::new(self.x.clamp(p.x), self.y.clamp(p.y), self.z.clamp(p.z))
    }

    pub fn contains(&self, p: DVec3) -> bool {
        self.x.contains(p.x) && self.y.contains(p.y) && self.z.contains(p.z)
    }

    fn validate(&self) -> Result<()> {
        for (name, limit) in [("x", self.x), ("y", self.y), ("z", self.z)] {
            if limit.min.is_nan() || limit.max.is_nan() || limit.min > limit.max {
                return Err(PuppetError::InvalidConfig(format!(
                    "limits.{name}: min {} > max {}",
                    limit.min, limit.max
                )));
            }
        }
        Ok(())
    }
}

impl Default for MovementLimits {
    fn default() -> Self {
        Self::unbounded()
    }
}

// ============================================================================
// 部件配置
// ============================================================================

fn unit_scale() -> [f64; 3] {
    [1.0, 1.0, 1.0]
}

/// 单个部件（body / arm / hand）的配置记录
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PartConfig {
    /// 模型或图片路径
    pub path: String,
    /// 材质路径（OBJ 部件使用 MTL）
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default = "unit_scale")]
    pub scale: [f64; 3],
    /// 网格相对所属枢轴的位置
    #[serde(default)]
    pub position: [f64; 3],
    #[serde(default)]
    pub rotation: [f64; 3],
    /// 枢轴相对父节点的偏移（arm / hand）
    #[serde(default)]
    pub pivot_position: Option<[f64; 3]>,
    #[serde(default)]
    pub pivot_rotation: Option<[f64; 3]>,
    /// 末端执行器相对手枢轴的偏移（仅 hand）
    #[serde(default)]
    pub end_effector_position: Option<[f64; 3]>,
}

impl PartConfig {
    #[inline]
    pub fn position(&self) -> DVec3 {
        DVec3::from_array(self.position)
    }

    #[inline]
    pub fn rotation(&self) -> DVec3 {
        DVec3::from_array(self.rotation)
    }

    #[inline]
    pub fn scale(&self) -> DVec3 {
        DVec3::from_array(self.scale)
    }

    pub fn pivot_position(&self) -> DVec3 {
        self.pivot_position.map(DVec3::from_array).unwrap_or(DVec3::ZERO)
    }

    pub fn pivot_rotation(&self) -> DVec3 {
        self.pivot_rotation.map(DVec3::from_array).unwrap_or(DVec3::ZERO)
    }

    fn validate(&self, part: &str) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(PuppetError::InvalidConfig(format!("{part}.path is empty")));
        }
        if self.scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(PuppetError::InvalidConfig(format!(
                "{part}.scale must be positive, got {:?}",
                self.scale
            )));
        }

        let vectors = [
            Some(self.position),
            Some(self.rotation),
            self.pivot_position,
            self.pivot_rotation,
            self.end_effector_position,
        ];
        if vectors.iter().flatten().flatten().any(|v| !v.is_finite()) {
            return Err(PuppetError::InvalidConfig(format!("{part} contains non-finite values")));
        }
        Ok(())
    }
}

// ============================================================================
// 目标源配置
// ============================================================================

/// 外部目标记录中坐标所在的空间
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedSpace {
    /// NDC，范围 [-1, 1]，Y 向上
    Ndc,
    /// 图像归一化坐标，范围 [0, 1]，Y 向下
    #[default]
    Normalized,
    /// 已经是世界坐标
    World,
}

/// 外部目标源配置
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct FeedConfig {
    /// 嵌套 `{x, y}` 记录的点分路径，例如 `"hand.tip"`
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub space: FeedSpace,
}

// ============================================================================
// 木偶配置
// ============================================================================

/// 木偶配置记录
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PuppetConfig {
    pub body: PartConfig,
    pub arm: PartConfig,
    pub hand: PartConfig,
    #[serde(default)]
    pub limits: MovementLimits,
    /// 按键覆盖：键标识 → 动作名
    #[serde(default)]
    pub key_bindings: HashMap<String, String>,
    #[serde(default)]
    pub feed: FeedConfig,
}

impl PuppetConfig {
    /// 从 JSON 字符串解析并校验
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        log::info!("[Config] 木偶配置已加载: {}", path.as_ref().display());
        Ok(config)
    }

    /// 按名称加载 `<assets_root>/<name>/<name>.json`
    pub fn load_named<P: AsRef<Path>>(assets_root: P, name: &str) -> Result<Self> {
        let path = assets_root.as_ref().join(name).join(format!("{name}.json"));
        if name.is_empty() || !path.is_file() {
            return Err(PuppetError::UnknownPuppet(name.to_string()));
        }
        Self::load(path)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        self.body.validate("body")?;
        self.arm.validate("arm")?;
        self.hand.validate("hand")?;
        self.limits.validate()?;

        if self.arm.pivot_position.is_none() {
            return Err(PuppetError::InvalidConfig("arm.pivotPosition is required".into()));
        }
        if self.hand.pivot_position.is_none() {
            return Err(PuppetError::InvalidConfig("hand.pivotPosition is required".into()));
        }
        match self.hand.end_effector_position {
            Some(offset) if DVec3::from_array(offset).length() > 0.0 => {}
            Some(_) => {
                return Err(PuppetError::InvalidConfig(
                    "hand.endEffectorPosition must be non-zero".into(),
                ))
            }
            None => {
                return Err(PuppetError::InvalidConfig(
                    "hand.endEffectorPosition is required".into(),
                ))
            }
        }
        if DVec3::from_array(self.hand.pivot_position.unwrap_or_default()).length() == 0.0 {
            return Err(PuppetError::InvalidConfig("hand.pivotPosition must be non-zero".into()));
        }
        Ok(())
    }

    pub fn end_effector_offset(&self) -> DVec3 {
        self.hand
            .end_effector_position
            .map(DVec3::from_array)
            .unwrap_or(DVec3::ZERO)
    }
}

// ============================================================================
// 运行参数
// ============================================================================

/// 手动模式与调度参数（扁平化，不嵌套）
#[derive(Clone, Debug, PartialEq)]
pub struct MotionConfig {
    /// 每帧平移步长，默认 0.01
    pub motion_step: f64,
    /// 每帧旋转步长（弧度），默认 0.1
    pub rotation_step: f64,
    /// 重置键，默认 "q"
    pub reset_key: String,
    /// 需要阻止浏览器默认行为（滚动）的键
    pub prevent_default_keys: Vec<String>,
    /// 逻辑帧率，默认 60
    pub frame_rate: f64,
    /// 每次推进最多执行的帧数，默认 5
    pub max_substeps: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            motion_step: 0.01,
            rotation_step: 0.1,
            reset_key: "q".to_string(),
            prevent_default_keys: ["ArrowUp", "ArrowDown", "ArrowLeft", "ArrowRight"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            frame_rate: 60.0,
            // 与物理子步上限一致，掉帧时不追赶超过 5 帧
            max_substeps: 5,
        }
    }
}

/// IK 标定常量
///
/// 这些相位与资源的中性姿态绑定，不是 IK 理论推导的结果。
/// 换用另一套模型时需要重新标定。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IkCalibration {
    /// 手臂枢轴相位，默认 π/2
    pub arm_phase: f64,
    /// 手枢轴相位，默认 -π（让前臂从肘部指向目标）
    pub hand_phase: f64,
    /// 手臂/手枢轴的铰链轴（枢轴本地坐标）
    pub joint_axis: Axis,
    /// 读取身体平面内旋转所用的轴
    pub parent_axis: Axis,
}

impl Default for IkCalibration {
    fn default() -> Self {
        Self {
            arm_phase: FRAC_PI_2,
            hand_phase: -PI,
            joint_axis: Axis::Y,
            parent_axis: Axis::Y,
        }
    }
}
