//! 输入系统
//!
//! - InputState: 按键状态与目标点，由控制器持有，每帧传入动画驱动
//! - InputController: 键盘 / 指针 / 外部目标源 / 视口事件
//! - KeyBindings: 键标识到手动动作的映射

mod controller;
mod feed;
mod keys;
mod state;

pub use controller::{InputController, KeyOutcome, ViewportSink};
pub use feed::{feed_point_to_world, parse_feed_record, TargetSource};
pub use keys::{KeyAction, KeyBindings, ManualDelta};
pub use state::InputState;
