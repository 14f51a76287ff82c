//! CAMetalLayer 的创建与挂载

use core_graphics_types::geometry::CGSize;
use metal::{Device, MetalLayer};
use objc::runtime::YES;
use raw_window_handle::RawWindowHandle;

use crate::core::error::{GraphicsError, Result};
use crate::engine::metal::COLOR_FORMAT;
use crate::gfx::backend::NativeWindow;

/// 创建并配置 layer
pub fn create_layer(device: &Device, vsync: bool) -> MetalLayer {
    let layer = MetalLayer::new();
    layer.set_device(device);
    layer.set_pixel_format(COLOR_FORMAT);
    layer.set_presents_with_transaction(false);
    layer.set_framebuffer_only(true);
    layer.set_display_sync_enabled(vsync);

    // 三缓冲，避免渲染快于刷新率时 next_drawable() 阻塞
    layer.set_maximum_drawable_count(3);
    layer
}

/// 把 layer 挂到窗口的 NSView 上
///
/// 窗口必须已经过至少一次事件泵送，否则 NSView 可能还没有完成布局。
pub fn attach_layer(layer: &MetalLayer, window: &dyn NativeWindow) -> Result<()> {
    let handle = window
        .window_handle()
        .map_err(|e| GraphicsError::SurfaceAcquire(format!("window handle unavailable: {}", e)))?;

    match handle.as_raw() {
        RawWindowHandle::AppKit(handle) => {
            unsafe {
                use cocoa::appkit::NSView;
                let view = handle.ns_view.as_ptr() as cocoa::base::id;
                view.setWantsLayer(YES);
                view.setLayer(layer.as_ref() as *const _ as _);
            }
            Ok(())
        }
        _ => Err(GraphicsError::SurfaceAcquire(
            "unsupported window handle: Metal requires an AppKit view".to_string(),
        )
        .into()),
    }
}

pub fn set_drawable_size(layer: &MetalLayer, width: u32, height: u32) {
    layer.set_drawable_size(CGSize::new(width as f64, height as f64));
}
