//! 按键绑定
//!
//! 键标识使用浏览器 `KeyboardEvent.key` 的取值（如 "ArrowLeft"、"a"）。

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use glam::DVec3;
use once_cell::sync::Lazy;

use crate::config::MotionConfig;
use crate::skeleton::{Axis, PivotId};
use crate::{PuppetError, Result};

/// 手动模式动作
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyAction {
    BodyLeft,
    BodyRight,
    BodyUp,
    BodyDown,
    BodyForward,
    BodyBackward,
    BodyRollLeft,
    BodyRollRight,
    BodyYawLeft,
    BodyYawRight,
    BodyPitchUp,
    BodyPitchDown,
    ArmRotateNegative,
    ArmRotatePositive,
    HandRotateNegative,
    HandRotatePositive,
}

/// 动作对应的每帧增量
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ManualDelta {
    /// 相对平移（身体受移动范围约束）
    Translate(DVec3),
    /// 相对旋转（欧拉角增量）
    Rotate(DVec3),
}

impl KeyAction {
    pub const ALL: [KeyAction; 16] = [
        KeyAction::BodyLeft,
        KeyAction::BodyRight,
        KeyAction::BodyUp,
        KeyAction::BodyDown,
        KeyAction::BodyForward,
        KeyAction::BodyBackward,
        KeyAction::BodyRollLeft,
        KeyAction::BodyRollRight,
        KeyAction::BodyYawLeft,
        KeyAction::BodyYawRight,
        KeyAction::BodyPitchUp,
        KeyAction::BodyPitchDown,
        KeyAction::ArmRotateNegative,
        KeyAction::ArmRotatePositive,
        KeyAction::HandRotateNegative,
        KeyAction::HandRotatePositive,
    ];

    pub fn name(self) -> &'static str {
        match self {
            KeyAction::BodyLeft => "bodyLeft",
            KeyAction::BodyRight => "bodyRight",
            KeyAction::BodyUp => "bodyUp",
            KeyAction::BodyDown => "bodyDown",
            KeyAction::BodyForward => "bodyForward",
            KeyAction::BodyBackward => "bodyBackward",
            KeyAction::BodyRollLeft => "bodyRollLeft",
            KeyAction::BodyRollRight => "bodyRollRight",
            KeyAction::BodyYawLeft => "bodyYawLeft",
            KeyAction::BodyYawRight => "bodyYawRight",
            KeyAction::BodyPitchUp => "bodyPitchUp",
            KeyAction::BodyPitchDown => "bodyPitchDown",
            KeyAction::ArmRotateNegative => "armRotateNegative",
            KeyAction::ArmRotatePositive => "armRotatePositive",
            KeyAction::HandRotateNegative => "handRotateNegative",
            KeyAction::HandRotatePositive => "handRotatePositive",
        }
    }

    /// 动作作用的节点
    pub fn target(self) -> PivotId {
        match self {
            KeyAction::ArmRotateNegative | KeyAction::ArmRotatePositive => PivotId::ArmPivot,
            KeyAction::HandRotateNegative | KeyAction::HandRotatePositive => PivotId::HandPivot,
            _ => PivotId::Body,
        }
    }

    /// 每帧增量
    ///
    /// 身体翻滚使用平移步长，其余旋转使用旋转步长。
    pub fn delta(self, motion: &MotionConfig, joint_axis: Axis) -> ManualDelta {
        let m = motion.motion_step;
        let r = motion.rotation_step;
        match self {
            KeyAction::BodyLeft => ManualDelta::Translate(Axis::X.vector(-m)),
            KeyAction::BodyRight => ManualDelta::Translate(Axis::X.vector(m)),
            KeyAction::BodyUp => ManualDelta::Translate(Axis::Y.vector(m)),
            KeyAction::BodyDown => ManualDelta::Translate(Axis::Y.vector(-m)),
            KeyAction::BodyForward => ManualDelta::Translate(Axis::Z.vector(m)),
            KeyAction::BodyBackward => ManualDelta::Translate(Axis::Z.vector(-m)),
            KeyAction::BodyRollLeft => ManualDelta::Rotate(Axis::Z.vector(m)),
            KeyAction::BodyRollRight => ManualDelta::Rotate(Axis::Z.vector(-m)),
            KeyAction::BodyYawLeft => ManualDelta::Rotate(Axis::Y.vector(r)),
            KeyAction::BodyYawRight => ManualDelta::Rotate(Axis::Y.vector(-r)),
            KeyAction::BodyPitchUp => ManualDelta::Rotate(Axis::X.vector(r)),
            KeyAction::BodyPitchDown => ManualDelta::Rotate(Axis::X.vector(-r)),
            KeyAction::ArmRotateNegative | KeyAction::HandRotateNegative => {
                ManualDelta::Rotate(joint_axis.vector(-r))
            }
            KeyAction::ArmRotatePositive | KeyAction::HandRotatePositive => {
                ManualDelta::Rotate(joint_axis.vector(r))
            }
        }
    }
}

impl fmt::Display for KeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KeyAction {
    type Err = PuppetError;

    fn from_str(s: &str) -> Result<Self> {
        KeyAction::ALL
            .into_iter()
            .find(|action| action.name() == s)
            .ok_or_else(|| PuppetError::InvalidConfig(format!("unknown key action '{s}'")))
    }
}

/// 默认按键表
static DEFAULT_BINDINGS: Lazy<HashMap<&'static str, KeyAction>> = Lazy::new(|| {
    HashMap::from([
        ("ArrowLeft", KeyAction::BodyLeft),
        ("ArrowRight", KeyAction::BodyRight),
        ("ArrowUp", KeyAction::BodyUp),
        ("ArrowDown", KeyAction::BodyDown),
        (".", KeyAction::BodyForward),
        (",", KeyAction::BodyBackward),
        ("a", KeyAction::BodyRollLeft),
        ("d", KeyAction::BodyRollRight),
        ("w", KeyAction::BodyYawLeft),
        ("s", KeyAction::BodyYawRight),
        ("z", KeyAction::BodyPitchUp),
        ("x", KeyAction::BodyPitchDown),
        ("r", KeyAction::ArmRotateNegative),
        ("t", KeyAction::ArmRotatePositive),
        ("f", KeyAction::HandRotateNegative),
        ("g", KeyAction::HandRotatePositive),
    ])
});

/// 键标识 → 动作
#[derive(Clone, Debug, PartialEq)]
pub struct KeyBindings {
    map: HashMap<String, KeyAction>,
}

impl KeyBindings {
    /// 默认表叠加配置中的覆盖项
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Result<Self> {
        let mut bindings = Self::default();
        for (key, action) in overrides {
            bindings.map.insert(key.clone(), action.parse()?);
        }
        Ok(bindings)
    }

    #[inline]
    pub fn action(&self, key: &str) -> Option<KeyAction> {
        self.map.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            map: DEFAULT_BINDINGS
                .iter()
                .map(|(key, action)| (key.to_string(), *action))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let bindings = KeyBindings::default();
        assert_eq!(bindings.len(), 16);
        assert_eq!(bindings.action("ArrowLeft"), Some(KeyAction::BodyLeft));
        assert_eq!(bindings.action("t"), Some(KeyAction::ArmRotatePositive));
        assert_eq!(bindings.action("q"), None);
        assert_eq!(bindings.action("F13"), None);
    }

    #[test]
    fn test_overrides() {
        let overrides = HashMap::from([
            ("h".to_string(), "armRotatePositive".to_string()),
            ("r".to_string(), "handRotateNegative".to_string()),
        ]);
        let bindings = KeyBindings::with_overrides(&overrides).unwrap();
        assert_eq!(bindings.action("h"), Some(KeyAction::ArmRotatePositive));
        assert_eq!(bindings.action("r"), Some(KeyAction::HandRotateNegative));
        assert_eq!(bindings.action("t"), Some(KeyAction::ArmRotatePositive));
    }

    #[test]
    fn test_unknown_action_name_is_rejected() {
        let overrides = HashMap::from([("h".to_string(), "wave".to_string())]);
        assert!(matches!(
            KeyBindings::with_overrides(&overrides),
            Err(PuppetError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_action_names_round_trip() {
        for action in KeyAction::ALL {
            assert_eq!(action.name().parse::<KeyAction>().unwrap(), action);
        }
    }

    #[test]
    fn test_deltas() {
        let motion = MotionConfig::default();
        assert_eq!(
            KeyAction::BodyLeft.delta(&motion, Axis::Y),
            ManualDelta::Translate(DVec3::new(-0.01, 0.0, 0.0))
        );
        assert_eq!(
            KeyAction::BodyYawLeft.delta(&motion, Axis::Y),
            ManualDelta::Rotate(DVec3::new(0.0, 0.1, 0.0))
        );
        assert_eq!(
            KeyAction::ArmRotateNegative.delta(&motion, Axis::Z),
            ManualDelta::Rotate(DVec3::new(0.0, 0.0, -0.1))
        );
        assert_eq!(KeyAction::HandRotatePositive.target(), PivotId::HandPivot);
        assert_eq!(KeyAction::BodyPitchUp.target(), PivotId::Body);
    }
}
