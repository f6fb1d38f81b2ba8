//! 测试夹具

use crate::config::{AxisLimit, MovementLimits, PartConfig, PuppetConfig};

const SAMPLE_JSON: &str = include_str!("../assets/puppet_01/puppet_01.json");

fn part(path: &str) -> PartConfig {
    PartConfig {
        path: path.to_string(),
        material: None,
        scale: [1.0, 1.0, 1.0],
        position: [0.0; 3],
        rotation: [0.0; 3],
        pivot_position: None,
        pivot_rotation: None,
        end_effector_position: None,
    }
}

/// 平面木偶：身体无旋转，上臂长 3，前臂长 2，均沿 +X，铰链轴为 Z
pub(crate) fn flat_config() -> PuppetConfig {
    let mut arm = part("arm.obj");
    arm.pivot_position = Some([1.0, 0.0, 0.0]);
    let mut hand = part("hand.obj");
    hand.pivot_position = Some([3.0, 0.0, 0.0]);
    hand.end_effector_position = Some([2.0, 0.0, 0.0]);

    PuppetConfig {
        body: part("body.obj"),
        arm,
        hand,
        limits: MovementLimits {
            x: AxisLimit { min: -1.0, max: 1.0 },
            y: AxisLimit { min: -0.5, max: 0.5 },
            z: AxisLimit { min: -0.25, max: 0.25 },
        },
        key_bindings: Default::default(),
        feed: Default::default(),
    }
}

/// 随包附带的样例木偶 puppet_01
pub(crate) fn sample_config() -> PuppetConfig {
    PuppetConfig::from_json_str(SAMPLE_JSON).unwrap()
}
