//! 测试替身：不需要 GPU 或显示器的窗口、渲染上下文和后端

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use lyon::path::Path;
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};

use crate::core::error::{GraphicsError, Result};
use crate::core::math::Matrix3;
use crate::engine::recorder::{FrameRecorder, PathFactory};
use crate::engine::{
    Factory, FlushReceipt, FrameDescriptor, FrameOptions, FramebufferTarget, Paint, RenderContext,
    RenderPaint, RenderPath, RenderTarget, Renderer,
};
use crate::gfx::backend::{
    BackendKind, FrameStatus, GraphicsBackend, NativeHandle, NativeWindow, SkipReason,
};

/// 尺寸可变的假窗口；没有真实的原生句柄
pub struct MockWindow {
    size: Cell<(u32, u32)>,
}

impl MockWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Cell::new((width, height)),
        }
    }

    pub fn set_size(&self, width: u32, height: u32) {
        self.size.set((width, height));
    }
}

impl HasWindowHandle for MockWindow {
    fn window_handle(&self) -> std::result::Result<WindowHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl HasDisplayHandle for MockWindow {
    fn display_handle(&self) -> std::result::Result<DisplayHandle<'_>, HandleError> {
        Err(HandleError::Unavailable)
    }
}

impl NativeWindow for MockWindow {
    fn surface_size(&self) -> (u32, u32) {
        self.size.get()
    }
}

#[derive(Default)]
struct JournalState {
    order: Vec<&'static str>,
    loads: u32,
    begins: Vec<(u32, u32)>,
    flushes: Vec<(u32, u32)>,
    swaps: u32,
    surface_sizes: Vec<(u32, u32)>,
    last_descriptor: Option<FrameDescriptor>,
    last_commands: Vec<(Matrix3, f32)>,
    drawables: VecDeque<Option<(u32, u32)>>,
}

/// 记录后端与渲染上下文调用的共享日志
#[derive(Clone, Default)]
pub struct Journal(Rc<RefCell<JournalState>>);

impl Journal {
    fn push(&self, event: &'static str) {
        self.0.borrow_mut().order.push(event);
    }

    pub fn order(&self) -> Vec<&'static str> {
        self.0.borrow().order.clone()
    }

    pub fn loads(&self) -> u32 {
        self.0.borrow().loads
    }

    pub fn begins(&self) -> Vec<(u32, u32)> {
        self.0.borrow().begins.clone()
    }

    pub fn flushes(&self) -> Vec<(u32, u32)> {
        self.0.borrow().flushes.clone()
    }

    pub fn swaps(&self) -> u32 {
        self.0.borrow().swaps
    }

    pub fn surface_sizes(&self) -> Vec<(u32, u32)> {
        self.0.borrow().surface_sizes.clone()
    }

    pub fn last_descriptor(&self) -> Option<FrameDescriptor> {
        self.0.borrow().last_descriptor
    }

    /// 最近一次 flush 的命令（变换, 不透明度）
    pub fn last_commands(&self) -> Vec<(Matrix3, f32)> {
        self.0.borrow().last_commands.clone()
    }

    /// 安排下一次获取 drawable 的结果：`None` 表示没有可用的 drawable，
    /// `Some(size)` 表示拿到该尺寸的 drawable。未安排时按当前尺寸成功。
    pub fn script_drawable(&self, drawable: Option<(u32, u32)>) {
        self.0.borrow_mut().drawables.push_back(drawable);
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.borrow().order.iter().filter(|e| **e == event).count()
    }
}

/// 记录调用的渲染上下文
///
/// `alive` 在销毁时被清除，测试用它代替真正的解引用来检查悬垂句柄。
pub struct MockRenderContext {
    journal: Journal,
    recorder: FrameRecorder,
    factory: PathFactory,
    alive: Rc<Cell<bool>>,
}

impl MockRenderContext {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            recorder: FrameRecorder::new(),
            factory: PathFactory::new(),
            alive: Rc::new(Cell::new(true)),
        }
    }

    pub fn poison_flag(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.alive)
    }
}

impl Drop for MockRenderContext {
    fn drop(&mut self) {
        self.alive.set(false);
        self.journal.push("context dropped");
    }
}

impl Factory for MockRenderContext {
    fn make_path(&self, path: Path) -> RenderPath {
        self.factory.make_path(path)
    }

    fn make_paint(&self, paint: Paint) -> RenderPaint {
        self.factory.make_paint(paint)
    }

    fn allocations(&self) -> u64 {
        self.factory.allocations()
    }
}

impl RenderContext for MockRenderContext {
    fn as_factory(&self) -> &dyn Factory {
        self
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn begin_frame(&mut self, descriptor: &FrameDescriptor) {
        self.journal.push("begin");
        {
            let mut state = self.journal.0.borrow_mut();
            state
                .begins
                .push((descriptor.render_target_width, descriptor.render_target_height));
            state.last_descriptor = Some(*descriptor);
        }
        self.recorder.begin(descriptor);
    }

    fn make_renderer(&self) -> Box<dyn Renderer> {
        Box::new(self.recorder.renderer())
    }

    fn flush(&mut self, target: &RenderTarget) -> Result<FlushReceipt> {
        let (_, commands) = self.recorder.finish_for(target)?;
        self.journal.push("flush");
        {
            let mut state = self.journal.0.borrow_mut();
            state.flushes.push(target.size());
            state.last_commands = commands.iter().map(|c| (c.transform, c.opacity)).collect();
        }
        Ok(FlushReceipt::new(target, commands.len(), 0))
    }
}

/// 代替原生 GL 上下文，只记录自己何时被释放
pub struct MockGlContext {
    journal: Journal,
}

impl Drop for MockGlContext {
    fn drop(&mut self) {
        self.journal.push("gl context dropped");
    }
}

/// 代替窗口表面，记录 resize / swap 和释放
pub struct MockWindowSurface {
    journal: Journal,
}

impl Drop for MockWindowSurface {
    fn drop(&mut self) {
        self.journal.push("surface dropped");
    }
}

/// 生成 `MockRenderContext` 与假表面的加载器
#[derive(Default)]
pub struct RecordingLoader {
    journal: Journal,
    fail: bool,
}

impl RecordingLoader {
    pub fn failing() -> Self {
        Self {
            journal: Journal::default(),
            fail: true,
        }
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

#[cfg(not(target_os = "macos"))]
mod gl_doubles {
    use super::*;
    use crate::gfx::opengl::{CurrentSurface, GlLoader, GlSetup, GlSurface};

    pub type MockSurface = CurrentSurface<MockGlContext, MockWindowSurface>;

    impl GlSurface for MockSurface {
        fn resize(&mut self, width: u32, height: u32) {
            self.surface().journal.0.borrow_mut().surface_sizes.push((width, height));
        }

        fn swap_buffers(&mut self) -> Result<()> {
            let journal = &self.surface().journal;
            journal.push("swap");
            journal.0.borrow_mut().swaps += 1;
            Ok(())
        }
    }

    impl GlLoader for RecordingLoader {
        type Surface = MockSurface;

        fn load(
            &mut self,
            _window: &dyn NativeWindow,
            _width: u32,
            _height: u32,
            _vsync: bool,
        ) -> Result<GlSetup<MockSurface>> {
            if self.fail {
                return Err(GraphicsError::ContextCreation("OpenGL 3.3 unavailable".to_string()).into());
            }
            self.journal.0.borrow_mut().loads += 1;
            Ok(GlSetup {
                surface: CurrentSurface::new(
                    MockGlContext {
                        journal: self.journal.clone(),
                    },
                    MockWindowSurface {
                        journal: self.journal.clone(),
                    },
                ),
                context: Box::new(MockRenderContext::new(self.journal.clone())),
            })
        }
    }
}

#[cfg(not(target_os = "macos"))]
pub use gl_doubles::MockSurface;

#[cfg(target_os = "macos")]
mod metal_doubles {
    use super::*;
    use crate::gfx::metal::{MetalLoader, MetalPresenter, MetalSetup};

    /// 按 `Journal` 安排的结果交出 drawable 的 presenter
    pub struct MockPresenter {
        journal: Journal,
        size: (u32, u32),
        holding: bool,
    }

    impl Drop for MockPresenter {
        fn drop(&mut self) {
            self.journal.push("presenter dropped");
        }
    }

    impl MetalPresenter for MockPresenter {
        fn next_drawable(&mut self) -> Option<RenderTarget> {
            let scripted = self.journal.0.borrow_mut().drawables.pop_front();
            let Some((width, height)) = scripted.unwrap_or(Some(self.size)) else {
                self.journal.push("drawable unavailable");
                return None;
            };
            self.journal.push("acquire");
            self.holding = true;
            Some(RenderTarget::Framebuffer(FramebufferTarget::default_framebuffer(
                width, height,
            )))
        }

        fn discard_drawable(&mut self) {
            if self.holding {
                self.holding = false;
                self.journal.push("drawable discarded");
            }
        }

        fn present(&mut self, _target: &RenderTarget) -> Result<()> {
            if !self.holding {
                return Err(GraphicsError::SurfaceAcquire("no drawable to present".to_string()).into());
            }
            self.holding = false;
            self.journal.push("present");
            Ok(())
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.holding = false;
            if width > 0 && height > 0 {
                self.size = (width, height);
            }
            self.journal.0.borrow_mut().surface_sizes.push((width, height));
        }

        fn native_handle(&self) -> Option<NativeHandle> {
            None
        }
    }

    impl MetalLoader for RecordingLoader {
        type Presenter = MockPresenter;

        fn load(
            &mut self,
            _window: &dyn NativeWindow,
            width: u32,
            height: u32,
            _vsync: bool,
        ) -> Result<MetalSetup<MockPresenter>> {
            if self.fail {
                return Err(GraphicsError::ContextCreation("No Metal device found".to_string()).into());
            }
            self.journal.0.borrow_mut().loads += 1;
            Ok(MetalSetup {
                presenter: MockPresenter {
                    journal: self.journal.clone(),
                    size: (width, height),
                    holding: false,
                },
                context: Box::new(MockRenderContext::new(self.journal.clone())),
            })
        }
    }
}

#[cfg(target_os = "macos")]
pub use metal_doubles::MockPresenter;

/// 可编排的后端，用于测试帧协调器
pub struct ScriptedBackend {
    journal: Journal,
    context: Option<MockRenderContext>,
    target: Option<RenderTarget>,
    width: u32,
    height: u32,
    options: FrameOptions,
    recording: bool,
    fail_initialize: bool,
    settled: bool,
    skips: VecDeque<SkipReason>,
    initialize_calls: u32,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self {
            journal: Journal::default(),
            context: None,
            target: None,
            width: 0,
            height: 0,
            options: FrameOptions::default(),
            recording: false,
            fail_initialize: false,
            settled: false,
            skips: VecDeque::new(),
            initialize_calls: 0,
        }
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_initialize: true,
            ..Self::default()
        }
    }

    /// 要求窗口在初始化前已就绪（模拟 Metal）
    pub fn requiring_settled_window() -> Self {
        Self {
            settled: true,
            ..Self::default()
        }
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// 让接下来的一次 `begin_frame` 以 `reason` 跳过
    pub fn skip_next(&mut self, reason: SkipReason) {
        self.skips.push_back(reason);
    }

    pub fn initialize_calls(&self) -> u32 {
        self.initialize_calls
    }

    pub fn poison_flag(&self) -> Option<Rc<Cell<bool>>> {
        self.context.as_ref().map(|c| c.poison_flag())
    }
}

impl GraphicsBackend for ScriptedBackend {
    fn initialize(&mut self, _window: &dyn NativeWindow, width: u32, height: u32) -> Result<()> {
        self.initialize_calls += 1;
        if self.context.is_some() {
            return Ok(());
        }
        if self.fail_initialize {
            return Err(GraphicsError::ContextCreation("scripted failure".to_string()).into());
        }
        self.context = Some(MockRenderContext::new(self.journal.clone()));
        self.width = width;
        self.height = height;
        self.target = Some(RenderTarget::Framebuffer(FramebufferTarget::default_framebuffer(
            width, height,
        )));
        self.journal.push("initialize");
        Ok(())
    }

    fn shutdown(&mut self) {
        if self.context.is_none() {
            return;
        }
        self.context = None;
        self.target = None;
        self.recording = false;
        self.journal.push("backend shutdown");
    }

    fn begin_frame(&mut self) -> FrameStatus {
        let Some(context) = self.context.as_mut() else {
            return FrameStatus::Skipped(SkipReason::NotInitialized);
        };
        if let Some(reason) = self.skips.pop_front() {
            self.journal.push("skip");
            return FrameStatus::Skipped(reason);
        }
        if self.width == 0 || self.height == 0 {
            return FrameStatus::Skipped(SkipReason::ZeroSized);
        }
        context.begin_frame(&FrameDescriptor::new(self.width, self.height, &self.options));
        self.recording = true;
        FrameStatus::Ready
    }

    fn end_frame(&mut self) -> Result<()> {
        if !self.recording {
            return Err(GraphicsError::FrameOrder("end_frame without begin_frame".to_string()).into());
        }
        self.recording = false;
        let (Some(context), Some(target)) = (self.context.as_mut(), self.target.as_ref()) else {
            return Err(GraphicsError::FrameOrder("not initialized".to_string()).into());
        };
        let receipt = context.flush(target)?;
        if receipt.size() != (self.width, self.height) {
            return Err(GraphicsError::StaleRenderTarget {
                expected: (self.width, self.height),
                flushed: receipt.size(),
            }
            .into());
        }
        self.journal.push("present");
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.context.is_none() {
            return;
        }
        self.width = width;
        self.height = height;
        self.target = Some(RenderTarget::Framebuffer(FramebufferTarget::default_framebuffer(
            width, height,
        )));
        self.journal.0.borrow_mut().surface_sizes.push((width, height));
    }

    fn create_renderer(&self) -> Option<Box<dyn Renderer>> {
        self.context.as_ref().map(|c| c.make_renderer())
    }

    fn create_factory(&self) -> Option<&dyn Factory> {
        self.context.as_ref().map(|c| c.as_factory())
    }

    fn render_context(&self) -> Option<&dyn RenderContext> {
        self.context.as_ref().map(|c| c as &dyn RenderContext)
    }

    fn render_target(&self) -> Option<&RenderTarget> {
        self.target.as_ref()
    }

    fn native_handle(&self) -> Option<NativeHandle> {
        None
    }

    fn backend_type(&self) -> BackendKind {
        BackendKind::platform_default()
    }

    fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    fn set_frame_options(&mut self, options: FrameOptions) {
        self.options = options;
    }

    fn set_vsync(&mut self, _enabled: bool) {}

    fn requires_settled_window(&self) -> bool {
        self.settled
    }
}
