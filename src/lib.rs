//! Vector Player - 多后端矢量动画播放器
//!
//! 在窗口上播放矢量动画，按平台选择原生图形 API（macOS 上使用 Metal，
//! 其他平台使用 OpenGL），帧循环本身不关心当前使用的是哪个 API。
//!
//! # 模块结构
//!
//! - `core`: 核心功能模块（配置、日志、错误处理、二维数学、帧计时）
//! - `engine`: 渲染引擎能力接口（Factory / RenderContext / Renderer / Scene）及内置实现
//! - `gfx`: 图形后端抽象层、OpenGL / Metal 后端、后端工厂
//! - `app`: 帧生命周期协调器
//!
//! # 使用示例
//!
//! ```no_run
//! use vector_player::app::Session;
//! use vector_player::gfx::{create_graphics_backend, detect_best_backend, GraphicsBackend};
//!
//! let backend = create_graphics_backend(detect_best_backend()).unwrap();
//! let session = Session::new(backend).with_padding(0.8);
//! println!("backend: {}", session.backend().backend_name());
//! ```

pub mod app;
pub mod core;
pub mod engine;
pub mod gfx;
