//! 图形后端的统一抽象接口
//!
//! 每个具体后端（OpenGL、Metal）都实现 `GraphicsBackend`。帧协调器只通过
//! 这个接口驱动后端，不关心当前使用的是哪个图形 API。
//!
//! # 帧协议
//!
//! ```text
//! initialize ──► ( resize* | begin_frame ─► 绘制 ─► end_frame )* ──► shutdown
//! ```
//!
//! - `begin_frame` 返回 `FrameStatus::Skipped` 时本帧不绘制、不调用 `end_frame`
//! - `end_frame` 先通过渲染上下文 flush，再凭 flush 回执呈现

use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;
use std::str::FromStr;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::core::error::Result;
use crate::engine::{Factory, FrameOptions, RenderContext, RenderTarget, Renderer};

/// 后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    OpenGl,
    /// 原生 GPU API（Apple Metal）
    Metal,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::OpenGl, BackendKind::Metal];

    /// 显示名称
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::OpenGl => "OpenGL",
            BackendKind::Metal => "Metal",
        }
    }

    /// 配置文件与命令行中使用的名称
    pub fn config_name(&self) -> &'static str {
        match self {
            BackendKind::OpenGl => "opengl",
            BackendKind::Metal => "metal",
        }
    }

    /// 当前构建平台是否编译了该后端
    pub fn is_supported(&self) -> bool {
        match self {
            BackendKind::OpenGl => cfg!(not(target_os = "macos")),
            BackendKind::Metal => cfg!(target_os = "macos"),
        }
    }

    /// 当前构建平台编译进来的默认后端
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            BackendKind::Metal
        } else {
            BackendKind::OpenGl
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 无法识别的后端名称
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBackend(pub String);

impl fmt::Display for UnknownBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown backend '{}'", self.0)
    }
}

impl std::error::Error for UnknownBackend {}

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "opengl" | "gl" => Ok(BackendKind::OpenGl),
            "metal" => Ok(BackendKind::Metal),
            _ => Err(UnknownBackend(s.to_string())),
        }
    }
}

/// 可以交给后端的原生窗口
pub trait NativeWindow: HasWindowHandle + HasDisplayHandle {
    /// 当前可绘制区域的物理像素尺寸
    fn surface_size(&self) -> (u32, u32);
}

impl NativeWindow for winit::window::Window {
    fn surface_size(&self) -> (u32, u32) {
        let size = self.inner_size();
        (size.width, size.height)
    }
}

/// 借出的平台原生句柄（例如 `MTLDevice`）
///
/// 只在后端 shutdown 之前有效。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeHandle(NonNull<c_void>);

impl NativeHandle {
    pub fn new(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(NativeHandle)
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// 跳过本帧的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotInitialized,
    /// 窗口被最小化或尺寸为零
    ZeroSized,
    /// 没有可用的 drawable
    DrawableUnavailable,
    /// drawable 尺寸与当前窗口尺寸不一致（resize 还未生效）
    StaleDrawable,
}

/// `begin_frame` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Ready,
    Skipped(SkipReason),
}

impl FrameStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, FrameStatus::Ready)
    }
}

/// 图形后端的统一接口
pub trait GraphicsBackend {
    /// 创建原生上下文、协商表面格式并构造渲染上下文
    ///
    /// 已初始化时直接返回成功，不重新分配任何资源。
    fn initialize(&mut self, window: &dyn NativeWindow, width: u32, height: u32) -> Result<()>;

    /// 依次释放渲染上下文、原生上下文 / 设备、表面
    ///
    /// 未初始化或重复调用时什么也不做。
    fn shutdown(&mut self);

    /// 准备本帧的渲染目标并开始录制
    fn begin_frame(&mut self) -> FrameStatus;

    /// flush 本帧命令并呈现；必须与一次 `Ready` 的 `begin_frame` 配对
    fn end_frame(&mut self) -> Result<()>;

    /// 更新视口并重建渲染目标；初始化前调用无效果
    fn resize(&mut self, width: u32, height: u32);

    /// 创建绑定到本后端渲染上下文的渲染器，所有权交给调用者
    fn create_renderer(&self) -> Option<Box<dyn Renderer>>;

    /// 借出资源分配能力
    fn create_factory(&self) -> Option<&dyn Factory>;

    fn render_context(&self) -> Option<&dyn RenderContext>;

    /// 当前帧的渲染目标（不在帧内时可能为空）
    fn render_target(&self) -> Option<&RenderTarget>;

    /// 平台原生句柄；不适用的后端返回 `None`
    fn native_handle(&self) -> Option<NativeHandle>;

    fn backend_type(&self) -> BackendKind;

    fn backend_name(&self) -> &'static str {
        self.backend_type().name()
    }

    fn is_initialized(&self) -> bool;

    /// 设置每帧的帧描述参数
    fn set_frame_options(&mut self, options: FrameOptions);

    /// 设置垂直同步，在下一次 `initialize` 时生效
    fn set_vsync(&mut self, enabled: bool);

    /// 初始化前窗口是否必须已经过至少一次事件泵送
    fn requires_settled_window(&self) -> bool {
        false
    }
}
