//! Puppet Engine - 关节木偶运行时
//!
//! 模块划分：
//! - geometry: 平面距离、屏幕到世界投影、可达半径裁剪
//! - skeleton: 枢轴层次结构（身体 → 手臂枢轴 → 手枢轴 → 末端执行器）与两连杆 IK
//! - input: 按键状态、目标点采集、重置命令
//! - animation: 每帧驱动与固定步长调度
//! - config: 木偶配置记录与运行参数

pub mod animation;
pub mod config;
pub mod geometry;
pub mod input;
pub mod skeleton;

#[cfg(test)]
mod test_support;

pub use animation::{AnimationDriver, DriveMode, FixedStepScheduler, FrameReport, PuppetRuntime};
pub use config::{IkCalibration, MotionConfig, PuppetConfig};
pub use input::{InputController, InputState};
pub use skeleton::{PivotId, PuppetRig, TwoLinkSolver};

use thiserror::Error;

/// 引擎错误类型
#[derive(Debug, Error)]
pub enum PuppetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown puppet: {0}")]
    UnknownPuppet(String),

    #[error("Target feed parse error: {0}")]
    FeedParse(String),

    #[error("Target feed transport error: {0}")]
    FeedTransport(String),

    #[error("Part not ready: {0}")]
    PartNotReady(String),
}

pub type Result<T> = std::result::Result<T, PuppetError>;
