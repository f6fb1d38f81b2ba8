//! 动画系统
//!
//! - AnimationDriver: 每帧重算连杆长度、裁剪目标、求解 IK、叠加手动增量
//! - FixedStepScheduler: 固定步长调度，时钟可注入
//! - PuppetRuntime: 组合以上部件，供宿主每次刷新调用

mod driver;
mod report;
mod runtime;
mod scheduler;

pub use driver::{AnimationDriver, DriveMode};
pub use report::{DiagnosticSink, FrameReport, LogSink};
pub use runtime::PuppetRuntime;
pub use scheduler::{FixedStepScheduler, FrameClock, ManualClock, SystemClock};
