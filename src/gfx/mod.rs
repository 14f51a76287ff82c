//! 图形后端模块
//!
//! 本模块封装了不同图形 API 的底层实现：
//! - OpenGL：非 macOS 平台（glutin 创建上下文，glow 加载函数）
//! - Metal：macOS 平台
//!
//! 所有后端都实现了统一的 `GraphicsBackend` trait，由 `factory`
//! 按平台选择并创建。

pub mod backend;
pub mod factory;

#[cfg(target_os = "macos")]
pub mod metal;
#[cfg(not(target_os = "macos"))]
pub mod opengl;

#[cfg(test)]
pub mod testing;

pub use backend::{
    BackendKind, FrameStatus, GraphicsBackend, NativeHandle, NativeWindow, SkipReason,
};
pub use factory::{create_graphics_backend, detect_best_backend, supported_backends, Backend};
#[cfg(target_os = "macos")]
pub use self::metal::MetalBackend;
#[cfg(not(target_os = "macos"))]
pub use self::opengl::OpenGlBackend;
