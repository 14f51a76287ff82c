//! 暂停开关
//!
//! 暂停只停止动画时间的推进，帧仍然完整地 begin / draw / end。
//! 进程级的开关通过 C ABI 导出，供嵌入环境在帧循环之外调用。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// 可共享的暂停标志
#[derive(Debug, Clone, Default)]
pub struct PauseSwitch(Arc<AtomicBool>);

impl PauseSwitch {
    pub fn new(paused: bool) -> Self {
        Self(Arc::new(AtomicBool::new(paused)))
    }

    /// 切换状态，返回切换后的值
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn set_paused(&self, paused: bool) {
        self.0.store(paused, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

static GLOBAL_PAUSE: OnceLock<PauseSwitch> = OnceLock::new();

/// 进程级暂停开关
pub fn global_pause_switch() -> &'static PauseSwitch {
    GLOBAL_PAUSE.get_or_init(PauseSwitch::default)
}

#[no_mangle]
pub extern "C" fn toggle_pause() {
    let paused = global_pause_switch().toggle();
    crate::app_info!(paused, "Pause toggled externally");
}

/// 1 表示暂停，0 表示播放
#[no_mangle]
pub extern "C" fn get_pause_state() -> i32 {
    global_pause_switch().is_paused() as i32
}
