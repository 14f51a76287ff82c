//! 绘制命令录制
//!
//! 渲染上下文持有 `FrameRecorder`（强引用的绘制列表），
//! 交给调用者的 `PathRenderer` 只持有弱引用。上下文销毁后，
//! 渲染器的绘制调用会被丢弃并计数，而不会访问已释放的资源。

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use lyon::path::Path;

use super::frame::{FrameDescriptor, RenderTarget};
use super::paint::{Paint, RenderPaint, RenderPath};
use super::{Factory, Renderer};
use crate::core::error::{GraphicsError, Result};
use crate::core::math::Matrix3;

/// 一条已录制的绘制命令
#[derive(Debug, Clone)]
pub struct DrawCommand {
    pub path: RenderPath,
    pub paint: RenderPaint,
    pub transform: Matrix3,
    pub opacity: f32,
}

#[derive(Debug, Default)]
struct DrawList {
    commands: Vec<DrawCommand>,
    open: bool,
}

/// 一帧的录制状态
#[derive(Debug, Default)]
pub struct FrameRecorder {
    list: Rc<RefCell<DrawList>>,
    descriptor: Option<FrameDescriptor>,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始新的一帧，丢弃上一帧未 flush 的命令
    pub fn begin(&mut self, descriptor: &FrameDescriptor) {
        let mut list = self.list.borrow_mut();
        if !list.commands.is_empty() {
            tracing::debug!(
                dropped = list.commands.len(),
                "Discarding draw commands from an unflushed frame"
            );
        }
        list.commands.clear();
        list.open = true;
        self.descriptor = Some(*descriptor);
    }

    /// 结束当前帧，取出描述和所有命令
    pub fn finish(&mut self) -> Option<(FrameDescriptor, Vec<DrawCommand>)> {
        let mut list = self.list.borrow_mut();
        list.open = false;
        let commands = std::mem::take(&mut list.commands);
        self.descriptor.take().map(|desc| (desc, commands))
    }

    /// 为 flush 结束当前帧：必须先 begin，且帧描述尺寸与目标一致
    pub fn finish_for(&mut self, target: &RenderTarget) -> Result<(FrameDescriptor, Vec<DrawCommand>)> {
        let (descriptor, commands) = self
            .finish()
            .ok_or_else(|| GraphicsError::FrameOrder("flush called without begin_frame".to_string()))?;
        let recorded = (descriptor.render_target_width, descriptor.render_target_height);
        if recorded != target.size() {
            return Err(GraphicsError::StaleRenderTarget {
                expected: target.size(),
                flushed: recorded,
            }
            .into());
        }
        Ok((descriptor, commands))
    }

    pub fn is_open(&self) -> bool {
        self.list.borrow().open
    }

    pub fn renderer(&self) -> PathRenderer {
        PathRenderer::new(Rc::downgrade(&self.list))
    }
}

/// 基础资源工厂：分配路径与画笔句柄并计数
#[derive(Debug, Default)]
pub struct PathFactory {
    next_id: Cell<u64>,
}

impl PathFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }
}

impl Factory for PathFactory {
    fn make_path(&self, path: Path) -> RenderPath {
        RenderPath::new(self.next(), path)
    }

    fn make_paint(&self, paint: Paint) -> RenderPaint {
        RenderPaint::new(self.next(), paint)
    }

    fn allocations(&self) -> u64 {
        self.next_id.get()
    }
}

#[derive(Debug, Clone, Copy)]
struct RendererState {
    transform: Matrix3,
    opacity: f32,
}

impl Default for RendererState {
    fn default() -> Self {
        Self {
            transform: Matrix3::identity(),
            opacity: 1.0,
        }
    }
}

/// save / transform / draw / restore 风格的渲染器
pub struct PathRenderer {
    target: Weak<RefCell<DrawList>>,
    state: RendererState,
    stack: Vec<RendererState>,
    discarded: u64,
}

impl PathRenderer {
    fn new(target: Weak<RefCell<DrawList>>) -> Self {
        Self {
            target,
            state: RendererState::default(),
            stack: Vec::new(),
            discarded: 0,
        }
    }

    /// 当前累计的变换
    pub fn current_transform(&self) -> Matrix3 {
        self.state.transform
    }

    pub fn current_opacity(&self) -> f32 {
        self.state.opacity
    }
}

impl Renderer for PathRenderer {
    fn save(&mut self) {
        self.stack.push(self.state);
    }

    fn restore(&mut self) {
        match self.stack.pop() {
            Some(state) => self.state = state,
            None => tracing::warn!("Renderer::restore called without a matching save"),
        }
    }

    fn transform(&mut self, matrix: &Matrix3) {
        self.state.transform *= matrix;
    }

    fn modulate_opacity(&mut self, opacity: f32) {
        self.state.opacity *= opacity.clamp(0.0, 1.0);
    }

    fn draw_path(&mut self, path: &RenderPath, paint: &RenderPaint) {
        let Some(list) = self.target.upgrade() else {
            if self.discarded == 0 {
                tracing::warn!("Render context is gone, discarding draw calls");
            }
            self.discarded += 1;
            return;
        };

        let mut list = list.borrow_mut();
        if !list.open {
            self.discarded += 1;
            tracing::debug!("draw_path outside of a frame, discarded");
            return;
        }

        list.commands.push(DrawCommand {
            path: path.clone(),
            paint: *paint,
            transform: self.state.transform,
            opacity: self.state.opacity,
        });
    }

    fn is_attached(&self) -> bool {
        self.target.strong_count() > 0
    }

    fn discarded_draws(&self) -> u64 {
        self.discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::math::{translation, uniform_scale};
    use crate::engine::frame::FrameOptions;
    use lyon::math::{point, Box2D};
    use lyon::path::Winding;

    fn square(factory: &PathFactory) -> RenderPath {
        let mut builder = Path::builder();
        builder.add_rectangle(
            &Box2D::new(point(0.0, 0.0), point(10.0, 10.0)),
            Winding::Positive,
        );
        factory.make_path(builder.build())
    }

    fn descriptor() -> FrameDescriptor {
        FrameDescriptor::new(100, 100, &FrameOptions::default())
    }

    #[test]
    fn test_factory_allocates_unique_ids() {
        let factory = PathFactory::new();
        let a = square(&factory);
        let b = factory.make_paint(Paint::fill(0xFFFF_0000));
        assert_ne!(a.id(), b.id());
        assert_eq!(factory.allocations(), 2);
    }

    #[test]
    fn test_save_restore_transform() {
        let mut recorder = FrameRecorder::new();
        let factory = PathFactory::new();
        let path = square(&factory);
        let paint = factory.make_paint(Paint::fill(0xFF00_FF00));
        let mut renderer = recorder.renderer();

        recorder.begin(&descriptor());
        renderer.save();
        renderer.transform(&translation(5.0, 0.0));
        renderer.transform(&uniform_scale(2.0));
        renderer.modulate_opacity(0.5);
        renderer.draw_path(&path, &paint);
        renderer.restore();
        renderer.draw_path(&path, &paint);

        let (_, commands) = recorder.finish().unwrap();
        assert_eq!(commands.len(), 2);
        let expected = translation(5.0, 0.0) * uniform_scale(2.0);
        assert_eq!(commands[0].transform, expected);
        assert_eq!(commands[0].opacity, 0.5);
        assert_eq!(commands[1].transform, Matrix3::identity());
        assert_eq!(commands[1].opacity, 1.0);
    }

    #[test]
    fn test_draw_outside_frame_is_discarded() {
        let mut recorder = FrameRecorder::new();
        let factory = PathFactory::new();
        let path = square(&factory);
        let paint = factory.make_paint(Paint::fill(0xFF00_00FF));
        let mut renderer = recorder.renderer();

        renderer.draw_path(&path, &paint);
        assert_eq!(renderer.discarded_draws(), 1);
        assert!(recorder.finish().is_none());
    }

    #[test]
    fn test_renderer_detached_after_context_drop() {
        let recorder = FrameRecorder::new();
        let factory = PathFactory::new();
        let path = square(&factory);
        let paint = factory.make_paint(Paint::fill(0xFF00_00FF));
        let mut renderer = recorder.renderer();
        assert!(renderer.is_attached());

        drop(recorder);
        assert!(!renderer.is_attached());
        renderer.draw_path(&path, &paint);
        renderer.draw_path(&path, &paint);
        assert_eq!(renderer.discarded_draws(), 2);
    }

    #[test]
    fn test_finish_for_checks_order_and_size() {
        use crate::core::error::PlayerError;
        use crate::engine::frame::FramebufferTarget;

        let mut recorder = FrameRecorder::new();
        let target = RenderTarget::Framebuffer(FramebufferTarget::default_framebuffer(100, 100));
        assert!(matches!(
            recorder.finish_for(&target),
            Err(PlayerError::Graphics(GraphicsError::FrameOrder(_)))
        ));

        recorder.begin(&FrameDescriptor::new(50, 50, &FrameOptions::default()));
        assert!(matches!(
            recorder.finish_for(&target),
            Err(PlayerError::Graphics(GraphicsError::StaleRenderTarget {
                expected: (100, 100),
                flushed: (50, 50),
            }))
        ));

        recorder.begin(&descriptor());
        assert!(recorder.finish_for(&target).is_ok());
    }

    #[test]
    fn test_begin_discards_unflushed_commands() {
        let mut recorder = FrameRecorder::new();
        let factory = PathFactory::new();
        let path = square(&factory);
        let paint = factory.make_paint(Paint::fill(0xFF00_00FF));
        let mut renderer = recorder.renderer();

        recorder.begin(&descriptor());
        renderer.draw_path(&path, &paint);
        recorder.begin(&descriptor());
        let (_, commands) = recorder.finish().unwrap();
        assert!(commands.is_empty());
        assert!(!recorder.is_open());
    }
}
