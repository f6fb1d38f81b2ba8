//! 运行时：把层次结构、输入控制器、动画驱动和调度器组合在一起
//!
//! 宿主每次显示刷新调用一次 `advance`；事件回调只调用
//! `key_down` / `key_up` / `pointer_moved` 等状态更新方法。

use glam::DVec2;

use crate::config::{IkCalibration, MotionConfig, PuppetConfig};
use crate::geometry::CameraModel;
use crate::input::{InputController, KeyOutcome, TargetSource};
use crate::skeleton::PuppetRig;
use crate::Result;

use super::driver::AnimationDriver;
use super::report::{DiagnosticSink, FrameReport};
use super::scheduler::{FixedStepScheduler, FrameClock};

pub struct PuppetRuntime {
    rig: PuppetRig,
    input: InputController,
    driver: AnimationDriver,
    scheduler: FixedStepScheduler,
    feed: Option<Box<dyn TargetSource>>,
}

impl PuppetRuntime {
    /// 构建运行时；部件初始为 Unloaded，需由资源加载方标记就绪
    pub fn new(
        config: &PuppetConfig,
        motion: MotionConfig,
        calibration: IkCalibration,
        camera: CameraModel,
    ) -> Result<Self> {
        config.validate()?;
        let scheduler = FixedStepScheduler::from_config(&motion);
        Ok(Self {
            rig: PuppetRig::from_config(config),
            input: InputController::new(config, motion, camera)?,
            driver: AnimationDriver::new(calibration),
            scheduler,
            feed: None,
        })
    }

    pub fn with_feed(mut self, feed: Box<dyn TargetSource>) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn DiagnosticSink>) -> Self {
        self.driver = self.driver.with_sink(sink);
        self
    }

    #[inline]
    pub fn rig(&self) -> &PuppetRig {
        &self.rig
    }

    #[inline]
    pub fn rig_mut(&mut self) -> &mut PuppetRig {
        &mut self.rig
    }

    #[inline]
    pub fn input(&self) -> &InputController {
        &self.input
    }

    #[inline]
    pub fn input_mut(&mut self) -> &mut InputController {
        &mut self.input
    }

    #[inline]
    pub fn driver(&self) -> &AnimationDriver {
        &self.driver
    }

    #[inline]
    pub fn driver_mut(&mut self) -> &mut AnimationDriver {
        &mut self.driver
    }

    // ========================================
    // 事件
    // ========================================

    pub fn key_down(&mut self, key: &str) -> KeyOutcome {
        self.input.handle_key_down(key, &mut self.rig)
    }

    pub fn key_up(&mut self, key: &str) {
        self.input.handle_key_up(key);
    }

    pub fn pointer_moved(&mut self, ndc: DVec2) -> bool {
        self.input.pointer_moved(ndc)
    }

    // ========================================
    // 帧
    // ========================================

    /// 立即执行一帧（先读取目标源）
    pub fn step(&mut self) -> Option<FrameReport> {
        if let Some(feed) = self.feed.as_mut() {
            self.input.poll_feed(feed.as_mut());
        }
        self.driver.tick(&mut self.rig, &self.input)
    }

    /// 按时钟推进，执行所有到期的帧，返回最后一帧的诊断数据
    pub fn advance(&mut self, clock: &mut dyn FrameClock) -> Option<FrameReport> {
        let due = self.scheduler.pump(clock);
        let mut last = None;
        for _ in 0..due {
            if let Some(report) = self.step() {
                last = Some(report);
            }
        }
        last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::ManualClock;
    use crate::config::FeedSpace;
    use crate::skeleton::{Axis, PartId, PivotId};
    use crate::test_support::flat_config;
    use glam::DVec3;
    use std::f64::consts::PI;
    use std::sync::mpsc;

    fn runtime(config: &PuppetConfig) -> PuppetRuntime {
        let calibration = IkCalibration {
            arm_phase: 0.0,
            hand_phase: -PI,
            joint_axis: Axis::Z,
            parent_axis: Axis::Z,
        };
        let mut runtime =
            PuppetRuntime::new(config, MotionConfig::default(), calibration, CameraModel::default())
                .unwrap();
        for part in PartId::ALL {
            runtime.rig_mut().mark_ready(part);
        }
        runtime
    }

    #[test]
    fn test_advance_runs_due_frames() {
        let mut runtime = runtime(&flat_config());
        let mut clock = ManualClock::new();

        assert!(runtime.advance(&mut clock).is_none());
        clock.advance(3.0 / 60.0);
        let report = runtime.advance(&mut clock).unwrap();
        assert_eq!(report.frame, 2);
        assert_eq!(runtime.driver().frame(), 3);
    }

    #[test]
    fn test_held_key_accumulates_per_frame() {
        let mut runtime = runtime(&flat_config());
        let mut clock = ManualClock::new();
        runtime.advance(&mut clock);

        runtime.key_down("ArrowUp");
        clock.advance(4.0 / 60.0);
        runtime.advance(&mut clock);
        runtime.key_up("ArrowUp");
        clock.advance(2.0 / 60.0);
        runtime.advance(&mut clock);

        let y = runtime.rig().node(PivotId::Body).position().y;
        assert!((y - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_feed_drives_ik() {
        let mut config = flat_config();
        config.feed.space = FeedSpace::World;

        let (tx, rx) = mpsc::channel::<crate::Result<String>>();
        let mut runtime = runtime(&config).with_feed(Box::new(rx));

        tx.send(Ok(r#"{"x": 3, "y": 2}"#.to_string())).unwrap();
        let report = runtime.step().unwrap();
        assert!((report.end_effector - DVec3::new(3.0, 2.0, 0.0)).length() < 1e-9);

        // 获取失败：沿用上一目标
        tx.send(Err(crate::PuppetError::FeedTransport("timeout".into()))).unwrap();
        let report = runtime.step().unwrap();
        assert_eq!(report.raw_target, Some(DVec3::new(3.0, 2.0, 0.0)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = flat_config();
        config.hand.end_effector_position = None;
        assert!(PuppetRuntime::new(
            &config,
            MotionConfig::default(),
            IkCalibration::default(),
            CameraModel::default()
        )
        .is_err());
    }
}
