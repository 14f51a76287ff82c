//! 应用层：帧生命周期协调器
//!
//! - `session`：会话状态机，驱动后端的 initialize / 帧 / shutdown
//! - `event`：窗口层事件到协调器事件的转换
//! - `pause`：暂停开关及其 C ABI 导出

pub mod event;
pub mod pause;
pub mod session;

pub use event::{AppEvent, LoopAction};
pub use pause::{get_pause_state, global_pause_switch, toggle_pause, PauseSwitch};
pub use session::{wait_for_settled_window, FrameStats, Session, SessionState, DEFAULT_PADDING};
