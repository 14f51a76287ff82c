//! OpenGL 图形后端模块
//!
//! 在非 macOS 平台上编译。上下文通过 glutin 创建（EGL / WGL），
//! GL 函数通过 glow 加载。

pub mod backend;
pub mod context;

pub use backend::OpenGlBackend;
pub use context::{CurrentSurface, GlLoader, GlSetup, GlSurface, GlutinLoader, GlutinSurface};
