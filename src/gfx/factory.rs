//! 后端工厂与平台检测
//!
//! `Backend` 只包含当前构建平台编译进来的变体：不支持的后端在类型层面
//! 就不存在，而不是在运行时判断。

use crate::core::error::{GraphicsError, Result};
use crate::engine::{Factory, FrameOptions, RenderContext, RenderTarget, Renderer};

use super::backend::{BackendKind, FrameStatus, GraphicsBackend, NativeHandle, NativeWindow};
#[cfg(target_os = "macos")]
use super::metal::MetalBackend;
#[cfg(not(target_os = "macos"))]
use super::opengl::OpenGlBackend;

/// 当前平台可用的具体后端
pub enum Backend {
    #[cfg(not(target_os = "macos"))]
    OpenGl(OpenGlBackend),
    #[cfg(target_os = "macos")]
    Metal(MetalBackend),
}

/// 当前构建平台的名称
pub fn platform_name() -> &'static str {
    std::env::consts::OS
}

/// 按固定优先级选择后端：支持原生 GPU API 的平台优先使用它，其余使用 OpenGL
pub fn detect_best_backend() -> BackendKind {
    if BackendKind::Metal.is_supported() {
        BackendKind::Metal
    } else {
        BackendKind::OpenGl
    }
}

/// 当前平台编译进来的后端
pub fn supported_backends() -> Vec<BackendKind> {
    BackendKind::ALL
        .iter()
        .copied()
        .filter(BackendKind::is_supported)
        .collect()
}

/// 创建请求的后端；当前平台不支持时返回 `PlatformMismatch`，不做回退
pub fn create_graphics_backend(kind: BackendKind) -> Result<Backend> {
    match kind {
        #[cfg(not(target_os = "macos"))]
        BackendKind::OpenGl => Ok(Backend::OpenGl(OpenGlBackend::new())),
        #[cfg(target_os = "macos")]
        BackendKind::Metal => Ok(Backend::Metal(MetalBackend::new())),
        #[allow(unreachable_patterns)]
        unsupported => {
            crate::engine_error!(
                requested = unsupported.name(),
                platform = platform_name(),
                "Requested backend is not available on this platform"
            );
            Err(GraphicsError::PlatformMismatch {
                requested: unsupported.name(),
                platform: platform_name(),
            }
            .into())
        }
    }
}

impl Backend {
    fn inner(&self) -> &dyn GraphicsBackend {
        match self {
            #[cfg(not(target_os = "macos"))]
            Backend::OpenGl(b) => b,
            #[cfg(target_os = "macos")]
            Backend::Metal(b) => b,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn GraphicsBackend {
        match self {
            #[cfg(not(target_os = "macos"))]
            Backend::OpenGl(b) => b,
            #[cfg(target_os = "macos")]
            Backend::Metal(b) => b,
        }
    }
}

impl GraphicsBackend for Backend {
    fn initialize(&mut self, window: &dyn NativeWindow, width: u32, height: u32) -> Result<()> {
        self.inner_mut().initialize(window, width, height)
    }

    fn shutdown(&mut self) {
        self.inner_mut().shutdown()
    }

    fn begin_frame(&mut self) -> FrameStatus {
        self.inner_mut().begin_frame()
    }

    fn end_frame(&mut self) -> Result<()> {
        self.inner_mut().end_frame()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.inner_mut().resize(width, height)
    }

    fn create_renderer(&self) -> Option<Box<dyn Renderer>> {
        self.inner().create_renderer()
    }

    fn create_factory(&self) -> Option<&dyn Factory> {
        self.inner().create_factory()
    }

    fn render_context(&self) -> Option<&dyn RenderContext> {
        self.inner().render_context()
    }

    fn render_target(&self) -> Option<&RenderTarget> {
        self.inner().render_target()
    }

    fn native_handle(&self) -> Option<NativeHandle> {
        self.inner().native_handle()
    }

    fn backend_type(&self) -> BackendKind {
        self.inner().backend_type()
    }

    fn backend_name(&self) -> &'static str {
        self.inner().backend_name()
    }

    fn is_initialized(&self) -> bool {
        self.inner().is_initialized()
    }

    fn set_frame_options(&mut self, options: FrameOptions) {
        self.inner_mut().set_frame_options(options)
    }

    fn set_vsync(&mut self, enabled: bool) {
        self.inner_mut().set_vsync(enabled)
    }

    fn requires_settled_window(&self) -> bool {
        self.inner().requires_settled_window()
    }
}
