//! OpenGL 图形后端

use crate::core::error::{GraphicsError, Result};
use crate::engine::{
    FlushReceipt, FrameDescriptor, FrameOptions, FramebufferTarget, Factory, RenderContext,
    RenderTarget, Renderer,
};
use crate::gfx::backend::{
    BackendKind, FrameStatus, GraphicsBackend, NativeHandle, NativeWindow, SkipReason,
};

use super::context::{GlLoader, GlSetup, GlSurface, GlutinLoader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FramePhase {
    Idle,
    Recording,
}

/// OpenGL 后端
///
/// 渲染目标包装默认帧缓冲（id 0），尺寸变化时重建而不是修改。
pub struct OpenGlBackend<L: GlLoader = GlutinLoader> {
    loader: L,
    context: Option<Box<dyn RenderContext>>,
    surface: Option<L::Surface>,
    target: Option<RenderTarget>,
    width: u32,
    height: u32,
    options: FrameOptions,
    vsync: bool,
    phase: FramePhase,
}

impl OpenGlBackend<GlutinLoader> {
    pub fn new() -> Self {
        Self::with_loader(GlutinLoader::new())
    }
}

impl Default for OpenGlBackend<GlutinLoader> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: GlLoader> OpenGlBackend<L> {
    pub fn with_loader(loader: L) -> Self {
        Self {
            loader,
            context: None,
            surface: None,
            target: None,
            width: 0,
            height: 0,
            options: FrameOptions::default(),
            vsync: true,
            phase: FramePhase::Idle,
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// 凭 flush 回执交换缓冲
    fn present(&mut self, receipt: FlushReceipt) -> Result<()> {
        let expected = (self.width, self.height);
        if receipt.size() != expected {
            return Err(GraphicsError::StaleRenderTarget {
                expected,
                flushed: receipt.size(),
            }
            .into());
        }
        let surface = self
            .surface
            .as_mut()
            .ok_or_else(|| GraphicsError::SurfaceAcquire("no surface to present".to_string()))?;
        surface.swap_buffers()
    }
}

impl<L: GlLoader> GraphicsBackend for OpenGlBackend<L> {
    fn initialize(&mut self, window: &dyn NativeWindow, width: u32, height: u32) -> Result<()> {
        if self.is_initialized() {
            crate::engine_info!("OpenGL backend already initialized");
            return Ok(());
        }

        crate::engine_info!(width, height, vsync = self.vsync, "Initializing OpenGL backend");
        let GlSetup { surface, context } = self.loader.load(window, width, height, self.vsync)?;

        self.surface = Some(surface);
        self.context = Some(context);
        self.width = width;
        self.height = height;
        self.target = Some(RenderTarget::Framebuffer(FramebufferTarget::default_framebuffer(
            width, height,
        )));
        self.phase = FramePhase::Idle;

        crate::engine_info!("OpenGL backend initialized");
        Ok(())
    }

    fn shutdown(&mut self) {
        if !self.is_initialized() {
            return;
        }
        // 渲染上下文必须在 GL 上下文之前释放
        self.context = None;
        self.target = None;
        self.surface = None;
        self.phase = FramePhase::Idle;
        crate::engine_info!("OpenGL backend shut down");
    }

    fn begin_frame(&mut self) -> FrameStatus {
        let Some(context) = self.context.as_mut() else {
            return FrameStatus::Skipped(SkipReason::NotInitialized);
        };
        if self.width == 0 || self.height == 0 {
            return FrameStatus::Skipped(SkipReason::ZeroSized);
        }
        if self.phase == FramePhase::Recording {
            tracing::debug!("begin_frame called twice, previous frame discarded");
        }

        context.begin_frame(&FrameDescriptor::new(self.width, self.height, &self.options));
        self.phase = FramePhase::Recording;
        FrameStatus::Ready
    }

    fn end_frame(&mut self) -> Result<()> {
        if self.phase != FramePhase::Recording {
            return Err(GraphicsError::FrameOrder("end_frame without a ready begin_frame".to_string()).into());
        }
        self.phase = FramePhase::Idle;

        let (Some(context), Some(target)) = (self.context.as_mut(), self.target.as_ref()) else {
            return Err(GraphicsError::FrameOrder("backend is not initialized".to_string()).into());
        };
        let receipt = context.flush(target)?;
        self.present(receipt)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if !self.is_initialized() {
            return;
        }
        if (width, height) == (self.width, self.height) {
            return;
        }

        self.width = width;
        self.height = height;
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(width, height);
        }
        self.target = Some(RenderTarget::Framebuffer(FramebufferTarget::default_framebuffer(
            width, height,
        )));
        tracing::debug!(width, height, "OpenGL render target recreated");
    }

    fn create_renderer(&self) -> Option<Box<dyn Renderer>> {
        self.context.as_ref().map(|c| c.make_renderer())
    }

    fn create_factory(&self) -> Option<&dyn Factory> {
        self.context.as_deref().map(|c| c.as_factory())
    }

    fn render_context(&self) -> Option<&dyn RenderContext> {
        self.context.as_deref()
    }

    fn render_target(&self) -> Option<&RenderTarget> {
        self.target.as_ref()
    }

    fn native_handle(&self) -> Option<NativeHandle> {
        None
    }

    fn backend_type(&self) -> BackendKind {
        BackendKind::OpenGl
    }

    fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    fn set_frame_options(&mut self, options: FrameOptions) {
        self.options = options;
    }

    fn set_vsync(&mut self, enabled: bool) {
        self.vsync = enabled;
    }
}

impl<L: GlLoader> Drop for OpenGlBackend<L> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::PlayerError;
    use crate::gfx::testing::{MockWindow, RecordingLoader};

    fn initialized(width: u32, height: u32) -> OpenGlBackend<RecordingLoader> {
        let mut backend = OpenGlBackend::with_loader(RecordingLoader::default());
        backend
            .initialize(&MockWindow::new(width, height), width, height)
            .unwrap();
        backend
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut backend = initialized(640, 480);
        let first = backend.render_context().map(|c| c as *const dyn RenderContext as *const ());

        backend.initialize(&MockWindow::new(640, 480), 640, 480).unwrap();
        let second = backend.render_context().map(|c| c as *const dyn RenderContext as *const ());

        assert_eq!(backend.loader().journal().loads(), 1);
        assert_eq!(first, second);
        assert_eq!(backend.render_target().map(|t| t.size()), Some((640, 480)));
    }

    #[test]
    fn test_initialize_failure_leaves_backend_uninitialized() {
        let mut backend = OpenGlBackend::with_loader(RecordingLoader::failing());
        let result = backend.initialize(&MockWindow::new(640, 480), 640, 480);
        assert!(matches!(
            result,
            Err(PlayerError::Graphics(GraphicsError::ContextCreation(_)))
        ));
        assert!(!backend.is_initialized());
        assert_eq!(backend.begin_frame(), FrameStatus::Skipped(SkipReason::NotInitialized));
    }

    #[test]
    fn test_shutdown_is_idempotent_and_safe_before_initialize() {
        let mut backend = OpenGlBackend::with_loader(RecordingLoader::default());
        backend.shutdown();
        backend.resize(100, 100);
        assert!(!backend.is_initialized());

        let mut backend = initialized(64, 64);
        let journal = backend.loader().journal();
        backend.shutdown();
        backend.shutdown();
        assert!(!backend.is_initialized());
        assert!(backend.create_factory().is_none());
        assert!(backend.render_target().is_none());
        assert_eq!(journal.count("surface dropped"), 1);
    }

    #[test]
    fn test_shutdown_releases_render_context_then_gl_context_then_surface() {
        let mut backend = initialized(64, 64);
        let journal = backend.loader().journal();
        backend.shutdown();
        assert_eq!(
            journal.order(),
            vec!["context dropped", "gl context dropped", "surface dropped"]
        );
    }

    #[test]
    fn test_drop_follows_shutdown_order() {
        let backend = initialized(64, 64);
        let journal = backend.loader().journal();
        drop(backend);
        assert_eq!(
            journal.order(),
            vec!["context dropped", "gl context dropped", "surface dropped"]
        );
    }

    #[test]
    fn test_frame_flushes_before_swap() {
        let mut backend = initialized(320, 240);
        let journal = backend.loader().journal();

        assert_eq!(backend.begin_frame(), FrameStatus::Ready);
        backend.end_frame().unwrap();

        assert_eq!(journal.flushes(), vec![(320, 240)]);
        assert_eq!(journal.swaps(), 1);
        assert_eq!(journal.order(), vec!["begin", "flush", "swap"]);
    }

    #[test]
    fn test_end_frame_requires_begin() {
        let mut backend = initialized(320, 240);
        assert!(matches!(
            backend.end_frame(),
            Err(PlayerError::Graphics(GraphicsError::FrameOrder(_)))
        ));

        backend.begin_frame();
        backend.end_frame().unwrap();
        assert!(matches!(
            backend.end_frame(),
            Err(PlayerError::Graphics(GraphicsError::FrameOrder(_)))
        ));
    }

    #[test]
    fn test_resize_recreates_target_before_next_frame() {
        let mut backend = initialized(320, 240);
        let journal = backend.loader().journal();

        backend.resize(800, 600);
        assert_eq!(backend.render_target().map(|t| t.size()), Some((800, 600)));
        assert_eq!(journal.surface_sizes(), vec![(800, 600)]);

        assert_eq!(backend.begin_frame(), FrameStatus::Ready);
        backend.end_frame().unwrap();
        assert_eq!(journal.flushes(), vec![(800, 600)]);
        assert_eq!(journal.begins(), vec![(800, 600)]);
    }

    #[test]
    fn test_zero_sized_window_skips_frames() {
        let mut backend = initialized(320, 240);
        backend.resize(0, 0);
        assert_eq!(backend.begin_frame(), FrameStatus::Skipped(SkipReason::ZeroSized));
        assert!(backend.end_frame().is_err());
    }

    #[test]
    fn test_frame_options_reach_descriptor() {
        let mut backend = initialized(32, 32);
        let journal = backend.loader().journal();
        backend.set_frame_options(FrameOptions {
            wireframe: true,
            clear_color: 0xFF00_0000,
            ..FrameOptions::default()
        });
        backend.begin_frame();
        backend.end_frame().unwrap();

        let descriptor = journal.last_descriptor().unwrap();
        assert!(descriptor.wireframe);
        assert_eq!(descriptor.clear_color, 0xFF00_0000);
    }

    #[test]
    fn test_identity_and_handles() {
        let backend = initialized(32, 32);
        assert_eq!(backend.backend_type(), BackendKind::OpenGl);
        assert_eq!(backend.backend_name(), "OpenGL");
        assert!(backend.native_handle().is_none());
        assert!(!backend.requires_settled_window());
        assert!(backend.create_renderer().is_some());
    }

    #[test]
    fn test_renderer_poisoned_after_shutdown() {
        let mut backend = initialized(32, 32);
        let renderer = backend.create_renderer().unwrap();
        assert!(renderer.is_attached());

        backend.shutdown();
        assert!(!renderer.is_attached());
    }
}
