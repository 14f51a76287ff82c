//! Metal 图形后端实现

use crate::core::error::{GraphicsError, Result};
use crate::engine::{Factory, FrameDescriptor, FrameOptions, RenderContext, RenderTarget, Renderer};
use crate::gfx::backend::{
    BackendKind, FrameStatus, GraphicsBackend, NativeHandle, NativeWindow, SkipReason,
};

use super::context::{LayerLoader, MetalLoader, MetalPresenter, MetalSetup};

/// Metal 图形后端
///
/// 持有设备、一个命令队列和挂在窗口上的 `CAMetalLayer`（都在 presenter 里）。
/// 每帧从 layer 获取 drawable，获取失败或尺寸过期时跳过本帧。
pub struct MetalBackend<L: MetalLoader = LayerLoader> {
    loader: L,
    context: Option<Box<dyn RenderContext>>,
    target: Option<RenderTarget>,
    presenter: Option<L::Presenter>,
    width: u32,
    height: u32,
    options: FrameOptions,
    vsync: bool,
}

impl MetalBackend<LayerLoader> {
    pub fn new() -> Self {
        Self::with_loader(LayerLoader::new())
    }
}

impl Default for MetalBackend<LayerLoader> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: MetalLoader> MetalBackend<L> {
    pub fn with_loader(loader: L) -> Self {
        Self {
            loader,
            context: None,
            target: None,
            presenter: None,
            width: 0,
            height: 0,
            options: FrameOptions::default(),
            vsync: true,
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    fn acquire(&mut self) -> std::result::Result<RenderTarget, SkipReason> {
        let presenter = self.presenter.as_mut().ok_or(SkipReason::NotInitialized)?;
        let target = presenter
            .next_drawable()
            .ok_or(SkipReason::DrawableUnavailable)?;

        let size = target.size();
        if size != (self.width, self.height) {
            tracing::debug!(
                drawable_width = size.0,
                drawable_height = size.1,
                width = self.width,
                height = self.height,
                "Drawable size does not match window, skipping frame"
            );
            presenter.discard_drawable();
            return Err(SkipReason::StaleDrawable);
        }
        Ok(target)
    }
}

impl<L: MetalLoader> GraphicsBackend for MetalBackend<L> {
    fn initialize(&mut self, window: &dyn NativeWindow, width: u32, height: u32) -> Result<()> {
        if self.is_initialized() {
            crate::engine_info!("Metal backend already initialized");
            return Ok(());
        }

        crate::engine_info!(width, height, "Initializing Metal backend");
        let MetalSetup { presenter, context } = self.loader.load(window, width, height, self.vsync)?;

        self.presenter = Some(presenter);
        self.context = Some(context);
        self.target = None;
        self.width = width;
        self.height = height;

        crate::engine_info!("Metal backend initialized");
        Ok(())
    }

    fn shutdown(&mut self) {
        if !self.is_initialized() {
            return;
        }
        // 渲染上下文 → 设备 / 队列 → layer
        self.context = None;
        self.target = None;
        self.presenter = None;
        crate::engine_info!("Metal backend shut down");
    }

    fn begin_frame(&mut self) -> FrameStatus {
        if !self.is_initialized() {
            return FrameStatus::Skipped(SkipReason::NotInitialized);
        }
        if self.width == 0 || self.height == 0 {
            return FrameStatus::Skipped(SkipReason::ZeroSized);
        }

        self.target = None;
        let target = match self.acquire() {
            Ok(target) => target,
            Err(reason) => {
                if reason == SkipReason::DrawableUnavailable {
                    crate::engine_warn!("No drawable available, skipping frame");
                }
                return FrameStatus::Skipped(reason);
            }
        };

        if let Some(context) = self.context.as_mut() {
            context.begin_frame(&FrameDescriptor::new(self.width, self.height, &self.options));
        }
        self.target = Some(target);
        FrameStatus::Ready
    }

    fn end_frame(&mut self) -> Result<()> {
        let Some(target) = self.target.take() else {
            return Err(GraphicsError::FrameOrder("end_frame without a ready begin_frame".to_string()).into());
        };
        let (Some(context), Some(presenter)) = (self.context.as_mut(), self.presenter.as_mut()) else {
            return Err(GraphicsError::FrameOrder("backend is not initialized".to_string()).into());
        };

        let receipt = context.flush(&target)?;
        let expected = (self.width, self.height);
        if receipt.size() != expected {
            presenter.discard_drawable();
            return Err(GraphicsError::StaleRenderTarget {
                expected,
                flushed: receipt.size(),
            }
            .into());
        }
        presenter.present(&target)
    }

    fn resize(&mut self, width: u32, height: u32) {
        let Some(presenter) = self.presenter.as_mut() else {
            return;
        };
        if (width, height) == (self.width, self.height) {
            return;
        }

        self.width = width;
        self.height = height;
        presenter.resize(width, height);
        self.target = None;
        tracing::debug!(width, height, "Metal drawable size updated");
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
        self.presenter.as_ref()?.native_handle()
    }

    fn backend_type(&self) -> BackendKind {
        BackendKind::Metal
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

    fn requires_settled_window(&self) -> bool {
        true
    }
}

impl<L: MetalLoader> Drop for MetalBackend<L> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
