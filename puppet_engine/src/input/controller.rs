//! 输入与模式控制器
//!
//! 持有 InputState、按键表、相机模型。事件回调只更新状态，
//! 不触发 IK 或渲染；所有计算都在帧内完成。

use glam::DVec2;

use crate::config::{FeedConfig, MotionConfig, PuppetConfig};
use crate::geometry::{ndc_from_client, project_screen_to_world, CameraModel};
use crate::skeleton::PuppetRig;
use crate::Result;

use super::feed::{feed_point_to_world, parse_feed_record, TargetSource};
use super::keys::{KeyAction, KeyBindings};
use super::state::InputState;

/// 视口变化的接收方（渲染器 / 相机协作者）
pub trait ViewportSink {
    fn resize(&mut self, width: u32, height: u32);
}

/// 按键事件处理结果
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyOutcome {
    /// 宿主应阻止默认行为（滚动）
    pub prevent_default: bool,
    /// 本次按键触发了重置
    pub reset: bool,
    /// 按键在绑定表中
    pub recognized: bool,
}

/// 输入与模式控制器
#[derive(Clone, Debug)]
pub struct InputController {
    state: InputState,
    bindings: KeyBindings,
    motion: MotionConfig,
    feed: FeedConfig,
    camera: CameraModel,
    viewport: (u32, u32),
}

impl InputController {
    pub fn new(config: &PuppetConfig, motion: MotionConfig, camera: CameraModel) -> Result<Self> {
        Ok(Self {
            state: InputState::new(),
            bindings: KeyBindings::with_overrides(&config.key_bindings)?,
            motion,
            feed: config.feed.clone(),
            camera,
            viewport: (0, 0),
        })
    }

    // ========================================
    // 访问器
    // ========================================

    #[inline]
    pub fn state(&self) -> &InputState {
        &self.state
    }

    #[inline]
    pub fn state_mut(&mut self) -> &mut InputState {
        &mut self.state
    }

    #[inline]
    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    #[inline]
    pub fn motion(&self) -> &MotionConfig {
        &self.motion
    }

    #[inline]
    pub fn camera(&self) -> &CameraModel {
        &self.camera
    }

    #[inline]
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// 当前按住且已绑定的动作
    pub fn held_actions(&self) -> Vec<KeyAction> {
        let mut actions: Vec<KeyAction> = self
            .state
            .held_keys()
            .filter_map(|key| self.bindings.action(key))
            .collect();
        // HashMap 迭代顺序不固定，按声明顺序应用
        actions.sort_by_key(|action| *action as u8);
        actions.dedup();
        actions
    }

    // ========================================
    // 键盘
    // ========================================

    pub fn handle_key_down(&mut self, key: &str, rig: &mut PuppetRig) -> KeyOutcome {
        let prevent_default = self.motion.prevent_default_keys.iter().any(|k| k == key);

        if key == self.motion.reset_key {
            self.reset(rig);
            return KeyOutcome {
                prevent_default,
                reset: true,
                recognized: true,
            };
        }

        let recognized = self.bindings.action(key).is_some();
        if recognized {
            self.state.press(key);
        }
        KeyOutcome {
            prevent_default,
            reset: false,
            recognized,
        }
    }

    pub fn handle_key_up(&mut self, key: &str) {
        if self.bindings.action(key).is_some() {
            self.state.release(key);
        }
    }

    /// 重置所有关节并清空按键状态
    pub fn reset(&mut self, rig: &mut PuppetRig) -> bool {
        self.state.clear_keys();
        let restored = rig.reset();
        if restored {
            log::info!("[Input] 已重置到初始状态");
        }
        restored
    }

    // ========================================
    // 指针 / 目标
    // ========================================

    /// 指针移动（NDC）；投影失败时本帧不更新目标
    pub fn pointer_moved(&mut self, ndc: DVec2) -> bool {
        self.state.set_pointer_ndc(ndc);
        match project_screen_to_world(ndc, &self.camera) {
            Some(target) => {
                self.state.set_target(target);
                true
            }
            None => {
                log::debug!("[Input] 指针投影无效，保留上一目标: ndc={ndc:?}");
                false
            }
        }
    }

    /// 指针移动（客户端像素坐标 + 画布矩形）
    pub fn pointer_moved_client(
        &mut self,
        client: DVec2,
        rect_origin: DVec2,
        rect_size: DVec2,
    ) -> bool {
        match ndc_from_client(client, rect_origin, rect_size) {
            Some(ndc) => self.pointer_moved(ndc),
            None => false,
        }
    }

    /// 取出目标源中所有已完成的结果，最后一条成功结果生效
    ///
    /// 失败只记录日志，保留之前的目标。返回目标是否被更新。
    pub fn poll_feed(&mut self, source: &mut dyn TargetSource) -> bool {
        let mut updated = false;
        while let Some(result) = source.try_next() {
            let point =
                result.and_then(|text| parse_feed_record(&text, self.feed.field.as_deref()));
            match point {
                Ok(point) => match feed_point_to_world(point, self.feed.space, &self.camera) {
                    Some(target) => {
                        self.state.set_target(target);
                        updated = true;
                    }
                    None => log::warn!("[Feed] 目标点无法投影到世界平面: {point:?}"),
                },
                Err(e) => log::warn!("[Feed] 目标获取失败，沿用上一目标: {e}"),
            }
        }
        updated
    }

    // ========================================
    // 视口
    // ========================================

    /// 视口尺寸变化：更新相机宽高比并转发给渲染协作者
    pub fn handle_resize(&mut self, width: u32, height: u32, sink: &mut dyn ViewportSink) -> bool {
        if width == 0 || height == 0 {
            log::warn!("[Input] 忽略无效视口尺寸: {width}x{height}");
            return false;
        }
        self.viewport = (width, height);
        self.camera.set_aspect(width as f64 / height as f64);
        sink.resize(width, height);
        true
    }
}
