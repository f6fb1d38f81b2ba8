//! 每帧动画驱动
//!
//! 帧内顺序：
//! 1. 根据当前世界位置重新计算连杆长度
//! 2. 读取并裁剪目标点
//! 3. 调用 IK 求解器，写入手臂/手枢轴的铰链轴旋转
//! 4. 叠加按住按键的手动增量
//! 5. 输出诊断数据

use glam::DVec3;

use crate::config::IkCalibration;
use crate::geometry::{clamp_to_reachable_radius, planar_distance};
use crate::input::{InputController, ManualDelta};
use crate::skeleton::{target_bearing, IkSolution, LinkLengths, PivotId, PuppetRig, TwoLinkSolver};

use super::report::{DiagnosticSink, FrameReport};

/// 驱动模式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriveMode {
    /// 仅手动：手臂/手枢轴由按键直接旋转
    Manual,
    /// 目标跟踪：IK 接管手臂/手枢轴，身体按键仍然生效
    #[default]
    TargetTracking,
}

/// 铰链轴与运动平面法线的最小对齐度，低于该值时平面连杆长度会随 IK 旋转变化
const HINGE_ALIGNMENT_MIN: f64 = 1.0 - 1e-6;

/// 单帧内 IK 阶段的中间结果
struct IkStage {
    raw_target: DVec3,
    clamped_target: DVec3,
    target_distance: f64,
    solution: Option<IkSolution>,
}

/// 动画驱动
pub struct AnimationDriver {
    solver: TwoLinkSolver,
    mode: DriveMode,
    frame: u64,
    sink: Option<Box<dyn DiagnosticSink>>,
    hinge_warned: bool,
}

impl AnimationDriver {
    pub fn new(calibration: IkCalibration) -> Self {
        Self {
            solver: TwoLinkSolver::new(calibration),
            mode: DriveMode::default(),
            frame: 0,
            sink: None,
            hinge_warned: false,
        }
    }

    pub fn with_mode(mut self, mode: DriveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn DiagnosticSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[inline]
    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: DriveMode) {
        if self.mode != mode {
            log::info!("[Driver] 切换模式: {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }

    #[inline]
    pub fn solver(&self) -> &TwoLinkSolver {
        &self.solver
    }

    #[inline]
    pub fn solver_mut(&mut self) -> &mut TwoLinkSolver {
        &mut self.solver
    }

    /// 已执行的帧数
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// 执行一帧
    ///
    /// 部件未全部就绪时不做任何修改，返回 None。
    pub fn tick(&mut self, rig: &mut PuppetRig, input: &InputController) -> Option<FrameReport> {
        if !rig.is_operable() {
            log::debug!("[Driver] 部件未就绪，跳过第 {} 帧", self.frame);
            return None;
        }

        let lengths = rig.link_lengths()?;

        let ik = match (self.mode, input.state().target()) {
            (DriveMode::TargetTracking, Some(target)) => self.apply_ik(rig, lengths, target),
            _ => None,
        };

        self.apply_manual(rig, input);

        let report = FrameReport {
            frame: self.frame,
            mode: self.mode,
            link_lengths: lengths,
            raw_target: ik.as_ref().map(|stage| stage.raw_target),
            clamped_target: ik.as_ref().map(|stage| stage.clamped_target),
            target_distance: ik.as_ref().map(|stage| stage.target_distance),
            solution: ik.and_then(|stage| stage.solution),
            body: rig.world_position(PivotId::Body)?,
            arm_pivot: rig.world_position(PivotId::ArmPivot)?,
            hand_pivot: rig.world_position(PivotId::HandPivot)?,
            end_effector: rig.world_position(PivotId::EndEffector)?,
        };

        if let Some(sink) = self.sink.as_mut() {
            sink.emit(&report);
        }
        self.frame += 1;
        Some(report)
    }

    fn apply_ik(
        &mut self,
        rig: &mut PuppetRig,
        lengths: LinkLengths,
        target: DVec3,
    ) -> Option<IkStage> {
        if !lengths.is_valid() {
            log::warn!("[Driver] 连杆长度无效，跳过 IK: {lengths:?}");
            return None;
        }

        let calibration = self.solver.calibration;
        if !self.hinge_warned {
            if let Some(alignment) = rig.hinge_alignment(calibration.joint_axis) {
                if alignment < HINGE_ALIGNMENT_MIN {
                    log::warn!(
                        "[Driver] 铰链轴 {:?} 与运动平面法线不对齐 (|cos|={alignment:.6})，连杆长度会逐帧变化",
                        calibration.joint_axis
                    );
                    self.hinge_warned = true;
                }
            }
        }

        let origin = rig.world_position(PivotId::ArmPivot)?;
        // 目标投影到手臂枢轴所在平面
        let planar_target = DVec3::new(target.x, target.y, origin.z);
        let clamped_target = clamp_to_reachable_radius(planar_target, origin, lengths.reach());
        let target_distance = planar_distance(clamped_target, origin);

        let bearing = target_bearing(clamped_target, origin);
        let parent_rotation = calibration
            .parent_axis
            .component(rig.node(PivotId::Body).rotation());

        let solution = self.solver.solve_checked(
            target_distance,
            lengths.arm,
            lengths.hand,
            bearing,
            parent_rotation,
        );

        if let Some(solution) = solution {
            let axis = calibration.joint_axis;
            rig.set_axis_rotation(PivotId::ArmPivot, axis, solution.arm_rotation);
            rig.set_axis_rotation(PivotId::HandPivot, axis, solution.hand_rotation);
        }

        Some(IkStage {
            raw_target: target,
            clamped_target,
            target_distance,
            solution,
        })
    }

    fn apply_manual(&self, rig: &mut PuppetRig, input: &InputController) {
        let joint_axis = self.solver.calibration.joint_axis;
        for action in input.held_actions() {
            let target = action.target();
            if self.mode == DriveMode::TargetTracking && rig.node(target).is_ik_driven() {
                continue;
            }
            match action.delta(input.motion(), joint_axis) {
                ManualDelta::Translate(delta) => rig.move_by(target, delta),
                ManualDelta::Rotate(delta) => rig.rotate(target, delta),
            }
        }
    }
}

impl Default for AnimationDriver {
    fn default() -> Self {
        Self::new(IkCalibration::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MotionConfig;
    use crate::geometry::CameraModel;
    use crate::skeleton::{Axis, PartId};
    use crate::test_support::{flat_config, sample_config};
    use std::cell::RefCell;
    use std::f64::consts::{FRAC_PI_2, PI};
    use std::rc::Rc;

    /// 平面木偶的标定：铰链轴 Z，手臂枢轴零相位
    fn flat_calibration() -> IkCalibration {
        IkCalibration {
            arm_phase: 0.0,
            hand_phase: -PI,
            joint_axis: Axis::Z,
            parent_axis: Axis::Z,
        }
    }

    fn setup() -> (AnimationDriver, PuppetRig, InputController) {
        let config = flat_config();
        let controller =
            InputController::new(&config, MotionConfig::default(), CameraModel::default()).unwrap();
        (
            AnimationDriver::new(flat_calibration()),
            PuppetRig::assembled(&config),
            controller,
        )
    }

    fn assert_close(a: DVec3, b: DVec3) {
        assert!((a - b).length() < 1e-9, "{a:?} != {b:?}");
    }

    #[test]
    fn test_end_effector_reaches_target() {
        let (mut driver, mut rig, mut input) = setup();
        input.state_mut().set_target(DVec3::new(3.0, 2.0, 0.0));

        let report = driver.tick(&mut rig, &input).unwrap();
        assert!(report.solution.is_some());
        assert_close(report.end_effector, DVec3::new(3.0, 2.0, 0.0));
        // 连杆长度不因关节旋转而改变
        let lengths = rig.link_lengths().unwrap();
        assert!((lengths.arm - 3.0).abs() < 1e-9);
        assert!((lengths.hand - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_unreachable_target_is_clamped() {
        let (mut driver, mut rig, mut input) = setup();
        input.state_mut().set_target(DVec3::new(20.0, 0.0, 0.0));

        let report = driver.tick(&mut rig, &input).unwrap();
        assert_close(report.clamped_target.unwrap(), DVec3::new(6.0, 0.0, 0.0));
        assert!((report.target_distance.unwrap() - 5.0).abs() < 1e-9);
        assert_close(report.end_effector, DVec3::new(6.0, 0.0, 0.0));
    }

    #[test]
    fn test_rotated_body_is_compensated() {
        let (mut driver, mut rig, mut input) = setup();
        rig.set_rotation(PivotId::Body, DVec3::new(0.0, 0.0, FRAC_PI_2));
        // 手臂枢轴随身体旋转到 (0, 1)
        let target = DVec3::new(-2.0, 3.0, 0.0);
        input.state_mut().set_target(target);

        let report = driver.tick(&mut rig, &input).unwrap();
        assert_close(report.arm_pivot, DVec3::new(0.0, 1.0, 0.0));
        assert_close(report.end_effector, target);
    }

    #[test]
    fn test_repeated_ticks_are_idempotent() {
        let (mut driver, mut rig, mut input) = setup();
        input.state_mut().set_target(DVec3::new(2.0, -2.5, 0.0));

        driver.tick(&mut rig, &input).unwrap();
        let arm_first = rig.node(PivotId::ArmPivot).rotation();
        let hand_first = rig.node(PivotId::HandPivot).rotation();

        driver.tick(&mut rig, &input).unwrap();
        assert_close(rig.node(PivotId::ArmPivot).rotation(), arm_first);
        assert_close(rig.node(PivotId::HandPivot).rotation(), hand_first);
        assert_eq!(driver.frame(), 2);
    }

    #[test]
    fn test_stale_target_is_reused() {
        let (mut driver, mut rig, mut input) = setup();
        input.state_mut().set_target(DVec3::new(1.0, 3.0, 0.0));

        let first = driver.tick(&mut rig, &input).unwrap();
        // 没有新目标：继续朝上一目标求解
        let second = driver.tick(&mut rig, &input).unwrap();
        assert_eq!(first.raw_target, second.raw_target);
        assert_close(second.end_effector, DVec3::new(1.0, 3.0, 0.0));
    }

    #[test]
    fn test_no_target_leaves_joints_untouched() {
        let (mut driver, mut rig, input) = setup();
        let report = driver.tick(&mut rig, &input).unwrap();
        assert!(report.solution.is_none());
        assert_eq!(rig.node(PivotId::ArmPivot).rotation(), DVec3::ZERO);
        assert_close(report.end_effector, DVec3::new(6.0, 0.0, 0.0));
    }

    #[test]
    fn test_body_saturates_at_limit() {
        let (mut driver, mut rig, mut input) = setup();
        input.handle_key_down("ArrowRight", &mut rig);

        for _ in 0..150 {
            driver.tick(&mut rig, &input);
        }
        let position = rig.node(PivotId::Body).position();
        assert_eq!(position.x, 1.0);
        assert_eq!(position.y, 0.0);

        input.handle_key_up("ArrowRight");
        driver.tick(&mut rig, &input);
        assert_eq!(rig.node(PivotId::Body).position().x, 1.0);
    }

    #[test]
    fn test_tracking_ignores_arm_keys() {
        let (mut driver, mut rig, mut input) = setup();
        input.handle_key_down("t", &mut rig);
        input.handle_key_down("w", &mut rig);

        driver.tick(&mut rig, &input);
        assert_eq!(rig.node(PivotId::ArmPivot).rotation(), DVec3::ZERO);
        // 身体按键仍然生效
        assert!((rig.node(PivotId::Body).rotation().y - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_manual_mode_rotates_pivots() {
        let (driver, mut rig, mut input) = setup();
        let mut driver = driver.with_mode(DriveMode::Manual);
        input.state_mut().set_target(DVec3::new(3.0, 2.0, 0.0));
        input.handle_key_down("t", &mut rig);
        input.handle_key_down("f", &mut rig);

        for _ in 0..3 {
            let report = driver.tick(&mut rig, &input).unwrap();
            assert!(report.solution.is_none());
        }
        assert!((rig.node(PivotId::ArmPivot).rotation().z - 0.3).abs() < 1e-12);
        assert!((rig.node(PivotId::HandPivot).rotation().z + 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_unready_rig_is_untouched() {
        let config = flat_config();
        let mut rig = PuppetRig::from_config(&config);
        let mut input =
            InputController::new(&config, MotionConfig::default(), CameraModel::default()).unwrap();
        let mut driver = AnimationDriver::new(flat_calibration());

        input.state_mut().set_target(DVec3::new(3.0, 2.0, 0.0));
        input.handle_key_down("ArrowLeft", &mut rig);
        assert!(driver.tick(&mut rig, &input).is_none());
        assert_eq!(driver.frame(), 0);

        rig.mark_ready(PartId::Body);
        rig.mark_ready(PartId::Arm);
        assert!(driver.tick(&mut rig, &input).is_none());

        rig.mark_ready(PartId::Hand);
        assert!(driver.tick(&mut rig, &input).is_some());
    }

    #[test]
    fn test_sink_receives_reports() {
        struct Collect(Rc<RefCell<Vec<u64>>>);
        impl DiagnosticSink for Collect {
            fn emit(&mut self, report: &FrameReport) {
                self.0.borrow_mut().push(report.frame);
            }
        }

        let (driver, mut rig, input) = setup();
        let frames = Rc::new(RefCell::new(Vec::new()));
        let mut driver = driver.with_sink(Box::new(Collect(frames.clone())));

        driver.tick(&mut rig, &input);
        driver.tick(&mut rig, &input);
        assert_eq!(*frames.borrow(), vec![0, 1]);
    }

    #[test]
    fn test_target_on_arm_pivot_stays_finite() {
        let (mut driver, mut rig, mut input) = setup();
        input.state_mut().set_target(DVec3::new(1.0, 0.0, 0.0));

        let report = driver.tick(&mut rig, &input).unwrap();
        let solution = report.solution.unwrap();
        assert!(solution.is_finite());
        assert_eq!(report.target_distance, Some(0.0));
        assert!(rig.node(PivotId::ArmPivot).rotation().is_finite());
        assert!(rig.node(PivotId::HandPivot).rotation().is_finite());
    }

    #[test]
    fn test_sample_puppet_ticks_are_idempotent() {
        let config = sample_config();
        let mut rig = PuppetRig::assembled(&config);
        let mut input =
            InputController::new(&config, MotionConfig::default(), CameraModel::default()).unwrap();
        let mut driver = AnimationDriver::default();
        input.state_mut().set_target(DVec3::new(-0.1, -0.05, 0.0));

        let first = driver.tick(&mut rig, &input).unwrap();
        let arm_first = rig.node(PivotId::ArmPivot).rotation();
        let hand_first = rig.node(PivotId::HandPivot).rotation();

        for _ in 0..3 {
            let report = driver.tick(&mut rig, &input).unwrap();
            assert_close(rig.node(PivotId::ArmPivot).rotation(), arm_first);
            assert_close(rig.node(PivotId::HandPivot).rotation(), hand_first);
            assert!((report.link_lengths.arm - first.link_lengths.arm).abs() < 1e-9);
            assert!((report.link_lengths.hand - first.link_lengths.hand).abs() < 1e-9);
        }

        // 末端执行器落在目标点（手臂枢轴所在深度）
        let end = rig.world_position(PivotId::EndEffector).unwrap();
        assert!((end.x + 0.1).abs() < 1e-9 && (end.y + 0.05).abs() < 1e-9);
        assert!(!driver.hinge_warned);
    }

    #[test]
    fn test_misaligned_hinge_is_reported_once() {
        let (_, mut rig, mut input) = setup();
        // 平面木偶的铰链是 Z，使用默认 Y 铰链标定
        let mut driver = AnimationDriver::default();
        input.state_mut().set_target(DVec3::new(3.0, 2.0, 0.0));

        driver.tick(&mut rig, &input);
        assert!(driver.hinge_warned);
        driver.tick(&mut rig, &input);
        assert!(driver.hinge_warned);
    }
}
