//! 两连杆 IK 求解器
//!
//! 设计原则：
//! - 解析求解（余弦定理），无迭代
//! - 余弦值强制裁剪到 [-1, 1]，保证 acos 有定义
//! - 输出出现 NaN 时回退到上一次有效解

use glam::DVec3;

use crate::config::IkCalibration;

/// 余弦定理求三角形内角
///
/// adjacent1、adjacent2 为夹该角的两边，opposite 为对边。结果位于 [0, π]。
#[inline]
pub fn triangle_angle(adjacent1: f64, adjacent2: f64, opposite: f64) -> f64 {
    let cos_angle = (adjacent1 * adjacent1 + adjacent2 * adjacent2 - opposite * opposite)
        / (2.0 * adjacent1 * adjacent2);
    cos_angle.clamp(-1.0, 1.0).acos()
}

/// 运动平面内从 origin 指向 target 的绝对方位角
#[inline]
pub fn target_bearing(target: DVec3, origin: DVec3) -> f64 {
    (target.y - origin.y).atan2(target.x - origin.x)
}

/// 求解结果
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IkSolution {
    /// 手臂枢轴处的内角
    pub arm_angle: f64,
    /// 手枢轴处的内角
    pub hand_angle: f64,
    /// 写入手臂枢轴铰链轴的旋转
    pub arm_rotation: f64,
    /// 写入手枢轴铰链轴的旋转
    pub hand_rotation: f64,
}

impl IkSolution {
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.arm_rotation.is_finite() && self.hand_rotation.is_finite()
    }
}

// ============================================================================
// 求解器
// ============================================================================

/// 两连杆解析 IK 求解器
#[derive(Clone, Debug)]
pub struct TwoLinkSolver {
    pub calibration: IkCalibration,
    /// 是否启用
    pub enabled: bool,
    /// 最近一次有效解（用于回退）
    last_valid: Option<IkSolution>,
}

impl TwoLinkSolver {
    pub fn new(calibration: IkCalibration) -> Self {
        Self {
            calibration,
            enabled: true,
            last_valid: None,
        }
    }

    /// 求解关节旋转
    ///
    /// 1. arm_angle  = ∠(arm, target_distance | hand)
    /// 2. hand_angle = ∠(hand, arm | target_distance)
    /// 3. arm_rotation  = arm_angle + bearing_offset + arm_phase - parent_rotation
    /// 4. hand_rotation = hand_angle + hand_phase
    pub fn solve(
        &self,
        target_distance: f64,
        arm_length: f64,
        hand_length: f64,
        bearing_offset: f64,
        parent_rotation: f64,
    ) -> IkSolution {
        let arm_angle = triangle_angle(arm_length, target_distance, hand_length);
        let hand_angle = triangle_angle(hand_length, arm_length, target_distance);

        IkSolution {
            arm_angle,
            hand_angle,
            arm_rotation: arm_angle + bearing_offset + self.calibration.arm_phase - parent_rotation,
            hand_rotation: hand_angle + self.calibration.hand_phase,
        }
    }

    /// 求解并检查结果；NaN 时回退到上一次有效解
    pub fn solve_checked(
        &mut self,
        target_distance: f64,
        arm_length: f64,
        hand_length: f64,
        bearing_offset: f64,
        parent_rotation: f64,
    ) -> Option<IkSolution> {
        if !self.enabled {
            return None;
        }

        let solution = self.solve(
            target_distance,
            arm_length,
            hand_length,
            bearing_offset,
            parent_rotation,
        );

        if solution.is_finite() {
            self.last_valid = Some(solution);
            Some(solution)
        } else {
            log::warn!(
                "[IK] 求解结果无效 (d={target_distance}, arm={arm_length}, hand={hand_length})，沿用上一次有效解"
            );
            self.last_valid
        }
    }

    #[inline]
    pub fn last_valid(&self) -> Option<IkSolution> {
        self.last_valid
    }
}

impl Default for TwoLinkSolver {
    fn default() -> Self {
        Self::new(IkCalibration::default())
    }
}
