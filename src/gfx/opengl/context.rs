//! OpenGL 上下文创建（glutin + glow）
//!
//! 平台相关部分放在 `GlLoader` / `GlSurface` 之后，
//! 后端本身只依赖这两个 trait。

use std::ffi::CStr;
use std::num::NonZeroU32;
use std::sync::Arc;

use glow::HasContext;
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile as ContextProfile, NotCurrentGlContext,
    PossiblyCurrentContext, Version,
};
use glutin::display::{Display, DisplayApiPreference, GlDisplay};
use glutin::surface::{
    GlSurface as _, Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface,
};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::core::error::{GraphicsError, Result};
use crate::engine::gl::{GlProfile, GlRenderContext};
use crate::engine::RenderContext;
use crate::gfx::backend::NativeWindow;

/// 可呈现的 GL 表面
pub trait GlSurface {
    /// 调整表面大小；零尺寸被忽略
    fn resize(&mut self, width: u32, height: u32);

    /// 交换前后缓冲
    fn swap_buffers(&mut self) -> Result<()>;
}

/// 上下文创建的结果
pub struct GlSetup<S> {
    pub surface: S,
    pub context: Box<dyn RenderContext>,
}

/// 创建 GL 上下文、表面和渲染上下文
pub trait GlLoader {
    type Surface: GlSurface;

    fn load(
        &mut self,
        window: &dyn NativeWindow,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<GlSetup<Self::Surface>>;
}

/// 基于 glutin 的加载器
#[derive(Debug, Clone, Copy)]
pub struct GlutinLoader {
    profile: GlProfile,
}

impl Default for GlutinLoader {
    fn default() -> Self {
        Self {
            profile: GlProfile::for_target(),
        }
    }
}

impl GlutinLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self) -> GlProfile {
        self.profile
    }
}

fn context_error<E: std::fmt::Display>(what: &str) -> impl FnOnce(E) -> GraphicsError + '_ {
    move |e| GraphicsError::ContextCreation(format!("{}: {}", what, e))
}

#[cfg(target_os = "windows")]
fn display_preference(window: RawWindowHandle) -> DisplayApiPreference {
    DisplayApiPreference::WglThenEgl(Some(window))
}

#[cfg(not(target_os = "windows"))]
fn display_preference(_window: RawWindowHandle) -> DisplayApiPreference {
    DisplayApiPreference::Egl
}

fn raw_handles(window: &dyn NativeWindow) -> Result<(RawDisplayHandle, RawWindowHandle)> {
    let display = window
        .display_handle()
        .map_err(context_error("display handle unavailable"))?
        .as_raw();
    let window = window
        .window_handle()
        .map_err(context_error("window handle unavailable"))?
        .as_raw();
    Ok((display, window))
}

impl GlLoader for GlutinLoader {
    type Surface = GlutinSurface;

    fn load(
        &mut self,
        window: &dyn NativeWindow,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<GlSetup<GlutinSurface>> {
        let (Some(surface_width), Some(surface_height)) =
            (NonZeroU32::new(width), NonZeroU32::new(height))
        else {
            return Err(GraphicsError::ContextCreation(format!(
                "cannot create a surface of size {}x{}",
                width, height
            ))
            .into());
        };

        let (raw_display, raw_window) = raw_handles(window)?;
        let display = unsafe { Display::new(raw_display, display_preference(raw_window)) }
            .map_err(context_error("failed to open GL display"))?;

        // 双缓冲 + 24 位深度 + 8 位模板
        let template = ConfigTemplateBuilder::new()
            .with_alpha_size(8)
            .with_depth_size(24)
            .with_stencil_size(8)
            .with_single_buffering(false)
            .compatible_with_native_window(raw_window)
            .build();
        let config = unsafe { display.find_configs(template) }
            .map_err(context_error("failed to query GL configs"))?
            .next()
            .ok_or_else(|| GraphicsError::ContextCreation("no matching GL config".to_string()))?;

        let (major, minor) = self.profile.version();
        let version = Version::new(major, minor);
        let attributes = if self.profile.is_es() {
            ContextAttributesBuilder::new()
                .with_context_api(ContextApi::Gles(Some(version)))
                .build(Some(raw_window))
        } else {
            ContextAttributesBuilder::new()
                .with_context_api(ContextApi::OpenGl(Some(version)))
                .with_profile(ContextProfile::Core)
                .build(Some(raw_window))
        };
        let not_current = unsafe { display.create_context(&config, &attributes) }.map_err(|e| {
            GraphicsError::ContextCreation(format!(
                "OpenGL {}.{} context unavailable: {}",
                major, minor, e
            ))
        })?;

        let surface_attributes = SurfaceAttributesBuilder::<WindowSurface>::new().build(
            raw_window,
            surface_width,
            surface_height,
        );
        let surface = unsafe { display.create_window_surface(&config, &surface_attributes) }
            .map_err(context_error("failed to create window surface"))?;
        let context = not_current
            .make_current(&surface)
            .map_err(context_error("failed to make context current"))?;

        let interval = if vsync {
            SwapInterval::Wait(NonZeroU32::MIN)
        } else {
            SwapInterval::DontWait
        };
        if let Err(e) = surface.set_swap_interval(&context, interval) {
            crate::engine_warn!(error = %e, "Failed to set swap interval");
        }

        let gl = unsafe {
            glow::Context::from_loader_function_cstr(|name: &CStr| display.get_proc_address(name))
        };
        unsafe {
            crate::engine_info!(
                version = %gl.get_parameter_string(glow::VERSION),
                renderer = %gl.get_parameter_string(glow::RENDERER),
                "OpenGL context created"
            );
        }

        let render_context = GlRenderContext::new(Arc::new(gl), self.profile)?;

        Ok(GlSetup {
            surface: CurrentSurface::new(context, surface),
            context: Box::new(render_context),
        })
    }
}

/// 窗口表面及其 current 上下文
///
/// 字段顺序即析构顺序：先释放 GL 上下文，再释放窗口表面。
pub struct CurrentSurface<C, S> {
    context: C,
    surface: S,
}

impl<C, S> CurrentSurface<C, S> {
    pub fn new(context: C, surface: S) -> Self {
        Self { context, surface }
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

/// glutin 窗口表面
pub type GlutinSurface = CurrentSurface<PossiblyCurrentContext, Surface<WindowSurface>>;

impl GlSurface for GlutinSurface {
    fn resize(&mut self, width: u32, height: u32) {
        if let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) {
            self.surface.resize(&self.context, w, h);
        }
    }

    fn swap_buffers(&mut self) -> Result<()> {
        self.surface
            .swap_buffers(&self.context)
            .map_err(|e| GraphicsError::SurfaceAcquire(format!("swap_buffers failed: {}", e)).into())
    }
}
