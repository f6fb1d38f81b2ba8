//! 输入状态
//!
//! 事件回调只做字段赋值；每帧由动画驱动同步读取，后写覆盖先写。

use std::collections::HashMap;

use glam::{DVec2, DVec3};

/// 当前输入状态
#[derive(Clone, Debug, Default)]
pub struct InputState {
    /// 键标识 → 是否按住
    held: HashMap<String, bool>,
    /// 最近一次有效的目标点（世界坐标）
    target: Option<DVec3>,
    /// 最近一次指针位置（NDC）
    pointer_ndc: Option<DVec2>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn press(&mut self, key: &str) {
        self.held.insert(key.to_string(), true);
    }

    #[inline]
    pub fn release(&mut self, key: &str) {
        self.held.insert(key.to_string(), false);
    }

    #[inline]
    pub fn is_held(&self, key: &str) -> bool {
        self.held.get(key).copied().unwrap_or(false)
    }

    /// 当前按住的键
    pub fn held_keys(&self) -> impl Iterator<Item = &str> {
        self.held
            .iter()
            .filter(|(_, held)| **held)
            .map(|(key, _)| key.as_str())
    }

    /// 所有已记录的键状态
    pub fn key_states(&self) -> impl Iterator<Item = (&str, bool)> {
        self.held.iter().map(|(key, held)| (key.as_str(), *held))
    }

    /// 所有键置为未按下
    pub fn clear_keys(&mut self) {
        for held in self.held.values_mut() {
            *held = false;
        }
    }

    #[inline]
    pub fn target(&self) -> Option<DVec3> {
        self.target
    }

    #[inline]
    pub fn set_target(&mut self, target: DVec3) {
        self.target = Some(target);
    }

    #[inline]
    pub fn pointer_ndc(&self) -> Option<DVec2> {
        self.pointer_ndc
    }

    #[inline]
    pub(crate) fn set_pointer_ndc(&mut self, ndc: DVec2) {
        self.pointer_ndc = Some(ndc);
    }
}
