//! Metal 设备、命令队列与 layer 的创建
//!
//! 平台相关部分放在 `MetalLoader` / `MetalPresenter` 之后，
//! 后端只负责帧顺序和跳帧判断。

use std::ffi::c_void;

use metal::{CommandQueue, Device, DeviceRef, MetalDrawable, MetalLayer};
use objc::rc::autoreleasepool;

use crate::core::error::{GraphicsError, Result};
use crate::engine::frame::MetalRenderTarget;
use crate::engine::metal::MetalRenderContext;
use crate::engine::{RenderContext, RenderTarget};
use crate::gfx::backend::{NativeHandle, NativeWindow};

use super::layer;

/// drawable 的来源和呈现方
pub trait MetalPresenter {
    /// 取下一个 drawable 并返回对应的渲染目标；暂时没有可用的 drawable 时返回 `None`
    fn next_drawable(&mut self) -> Option<RenderTarget>;

    /// 放弃当前持有的 drawable（尺寸过期等）
    fn discard_drawable(&mut self);

    /// 提交本帧命令并呈现当前 drawable
    fn present(&mut self, target: &RenderTarget) -> Result<()>;

    /// 调整 drawable 尺寸；零尺寸被忽略
    fn resize(&mut self, width: u32, height: u32);

    /// 借出的设备句柄
    fn native_handle(&self) -> Option<NativeHandle>;
}

/// 初始化的结果
pub struct MetalSetup<P> {
    pub presenter: P,
    pub context: Box<dyn RenderContext>,
}

/// 创建设备、命令队列、layer 和渲染上下文
pub trait MetalLoader {
    type Presenter: MetalPresenter;

    fn load(
        &mut self,
        window: &dyn NativeWindow,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<MetalSetup<Self::Presenter>>;
}

/// 使用系统默认设备和 `CAMetalLayer` 的加载器
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerLoader;

impl LayerLoader {
    pub fn new() -> Self {
        Self
    }
}

impl MetalLoader for LayerLoader {
    type Presenter = LayerPresenter;

    fn load(
        &mut self,
        window: &dyn NativeWindow,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<MetalSetup<LayerPresenter>> {
        let device = Device::system_default()
            .ok_or_else(|| GraphicsError::ContextCreation("No Metal device found".to_string()))?;
        crate::engine_info!(device = %device.name(), "Metal device selected");

        let command_queue = device.new_command_queue();

        // 渲染上下文先于 layer 创建：失败时窗口上不会留下挂着的 layer
        let context = MetalRenderContext::new(&device)?;

        let metal_layer = layer::create_layer(&device, vsync);
        layer::attach_layer(&metal_layer, window)?;
        layer::set_drawable_size(&metal_layer, width, height);

        Ok(MetalSetup {
            presenter: LayerPresenter {
                drawable: None,
                command_queue,
                device,
                layer: metal_layer,
            },
            context: Box::new(context),
        })
    }
}

/// 挂在窗口上的 layer 及其设备、命令队列
///
/// 字段顺序即析构顺序：drawable、命令队列、设备，最后是 layer。
pub struct LayerPresenter {
    drawable: Option<MetalDrawable>,
    command_queue: CommandQueue,
    device: Device,
    layer: MetalLayer,
}

impl MetalPresenter for LayerPresenter {
    fn next_drawable(&mut self) -> Option<RenderTarget> {
        self.drawable = None;
        let drawable = autoreleasepool(|| self.layer.next_drawable().map(|d| d.to_owned()))?;

        let texture = drawable.texture().to_owned();
        let command_buffer = self.command_queue.new_command_buffer().to_owned();
        self.drawable = Some(drawable);
        Some(RenderTarget::Metal(MetalRenderTarget::new(texture, command_buffer)))
    }

    fn discard_drawable(&mut self) {
        self.drawable = None;
    }

    fn present(&mut self, target: &RenderTarget) -> Result<()> {
        let drawable = self
            .drawable
            .take()
            .ok_or_else(|| GraphicsError::SurfaceAcquire("no drawable to present".to_string()))?;
        let RenderTarget::Metal(metal_target) = target else {
            return Err(GraphicsError::CommandExecution("unexpected render target".to_string()).into());
        };

        autoreleasepool(|| {
            metal_target.command_buffer.present_drawable(&drawable);
            metal_target.command_buffer.commit();
        });
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        // 旧尺寸的 drawable 不再使用
        self.drawable = None;
        if width > 0 && height > 0 {
            layer::set_drawable_size(&self.layer, width, height);
        }
    }

    /// 借出 `MTLDevice`
    fn native_handle(&self) -> Option<NativeHandle> {
        let device: &DeviceRef = &self.device;
        NativeHandle::new(device as *const DeviceRef as *mut c_void)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::PlayerError;
    use crate::gfx::backend::GraphicsBackend;
    use crate::gfx::metal::MetalBackend;
    use crate::gfx::testing::MockWindow;

    #[test]
    fn test_load_without_appkit_view_leaves_backend_uninitialized() {
        // 没有 NSView 的窗口：要么没有设备，要么在挂载 layer 时失败
        let mut backend = MetalBackend::with_loader(LayerLoader::new());
        let result = backend.initialize(&MockWindow::new(64, 64), 64, 64);
        assert!(matches!(
            result,
            Err(PlayerError::Graphics(
                GraphicsError::ContextCreation(_)
                    | GraphicsError::ResourceCreation(_)
                    | GraphicsError::SurfaceAcquire(_)
            ))
        ));
        assert!(!backend.is_initialized());
        assert!(backend.native_handle().is_none());
        assert!(backend.render_context().is_none());
    }
}
