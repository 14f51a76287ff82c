//! 帧描述、渲染目标与 flush 回执

use serde::{Deserialize, Serialize};

/// 每帧开始时对渲染目标的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadAction {
    /// 用清屏颜色清除
    #[default]
    Clear,
    /// 保留上一帧的内容
    PreserveRenderTarget,
}

/// 填充规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

/// 与尺寸无关的帧参数（来自配置）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOptions {
    pub load_action: LoadAction,
    /// 32 位 ARGB
    pub clear_color: u32,
    pub wireframe: bool,
    pub disable_fills: bool,
    pub disable_strokes: bool,
    pub disable_raster_ordering: bool,
    pub fill_rule: FillRule,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            load_action: LoadAction::Clear,
            clear_color: 0xFF33_3333,
            wireframe: false,
            disable_fills: false,
            disable_strokes: false,
            disable_raster_ordering: false,
            fill_rule: FillRule::NonZero,
        }
    }
}

/// 交给 `RenderContext::begin_frame` 的帧描述
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDescriptor {
    pub render_target_width: u32,
    pub render_target_height: u32,
    pub load_action: LoadAction,
    pub clear_color: u32,
    pub wireframe: bool,
    pub disable_fills: bool,
    pub disable_strokes: bool,
    pub disable_raster_ordering: bool,
    pub fill_rule: FillRule,
}

impl FrameDescriptor {
    pub fn new(width: u32, height: u32, options: &FrameOptions) -> Self {
        Self {
            render_target_width: width,
            render_target_height: height,
            load_action: options.load_action,
            clear_color: options.clear_color,
            wireframe: options.wireframe,
            disable_fills: options.disable_fills,
            disable_strokes: options.disable_strokes,
            disable_raster_ordering: options.disable_raster_ordering,
            fill_rule: options.fill_rule,
        }
    }
}

/// ARGB 打包颜色转换为归一化的 RGBA
pub fn argb_to_rgba(color: u32) -> [f32; 4] {
    let a = ((color >> 24) & 0xFF) as f32 / 255.0;
    let r = ((color >> 16) & 0xFF) as f32 / 255.0;
    let g = ((color >> 8) & 0xFF) as f32 / 255.0;
    let b = (color & 0xFF) as f32 / 255.0;
    [r, g, b, a]
}

/// OpenGL 默认帧缓冲（id 0）
///
/// 尺寸不可变：窗口尺寸变化时整个对象重建。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramebufferTarget {
    framebuffer: u32,
    width: u32,
    height: u32,
}

impl FramebufferTarget {
    pub fn default_framebuffer(width: u32, height: u32) -> Self {
        Self {
            framebuffer: 0,
            width,
            height,
        }
    }

    pub fn framebuffer(&self) -> u32 {
        self.framebuffer
    }
}

/// 当前 drawable 纹理的视图，以及本帧使用的命令缓冲
#[cfg(target_os = "macos")]
pub struct MetalRenderTarget {
    pub(crate) texture: metal::Texture,
    pub(crate) command_buffer: metal::CommandBuffer,
    width: u32,
    height: u32,
}

#[cfg(target_os = "macos")]
impl std::fmt::Debug for MetalRenderTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetalRenderTarget")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

#[cfg(target_os = "macos")]
impl MetalRenderTarget {
    pub fn new(texture: metal::Texture, command_buffer: metal::CommandBuffer) -> Self {
        let width = texture.width() as u32;
        let height = texture.height() as u32;
        Self {
            texture,
            command_buffer,
            width,
            height,
        }
    }
}

/// 当前帧的渲染目标
#[derive(Debug)]
pub enum RenderTarget {
    Framebuffer(FramebufferTarget),
    #[cfg(target_os = "macos")]
    Metal(MetalRenderTarget),
}

impl RenderTarget {
    pub fn width(&self) -> u32 {
        match self {
            RenderTarget::Framebuffer(t) => t.width,
            #[cfg(target_os = "macos")]
            RenderTarget::Metal(t) => t.width,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            RenderTarget::Framebuffer(t) => t.height,
            #[cfg(target_os = "macos")]
            RenderTarget::Metal(t) => t.height,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }
}

/// flush 回执
///
/// 只有 flush 之后才能拿到回执，而呈现（swap / present）必须出示回执，
/// 从而保证“先 flush 再呈现”。回执只能由本 crate 的渲染上下文构造：
///
/// ```compile_fail
/// use vector_player::engine::{FlushReceipt, FramebufferTarget, RenderTarget};
///
/// let target = RenderTarget::Framebuffer(FramebufferTarget::default_framebuffer(64, 32));
/// let _receipt = FlushReceipt::new(&target, 0, 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a flush receipt must be handed to the presenter"]
pub struct FlushReceipt {
    width: u32,
    height: u32,
    draw_count: usize,
    vertex_count: usize,
}

impl FlushReceipt {
    pub(crate) fn new(target: &RenderTarget, draw_count: usize, vertex_count: usize) -> Self {
        Self {
            width: target.width(),
            height: target.height(),
            draw_count,
            vertex_count,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn draw_count(&self) -> usize {
        self.draw_count
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argb_unpack() {
        let rgba = argb_to_rgba(0x80FF_0000);
        assert_eq!(rgba[0], 1.0);
        assert_eq!(rgba[1], 0.0);
        assert_eq!(rgba[2], 0.0);
        assert!((rgba[3] - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_descriptor_copies_options() {
        let options = FrameOptions {
            wireframe: true,
            fill_rule: FillRule::EvenOdd,
            ..FrameOptions::default()
        };
        let desc = FrameDescriptor::new(320, 200, &options);
        assert_eq!(desc.render_target_width, 320);
        assert_eq!(desc.render_target_height, 200);
        assert!(desc.wireframe);
        assert_eq!(desc.fill_rule, FillRule::EvenOdd);
        assert_eq!(desc.clear_color, 0xFF33_3333);
    }

    #[test]
    fn test_receipt_records_target_size() {
        let target = RenderTarget::Framebuffer(FramebufferTarget::default_framebuffer(64, 32));
        let receipt = FlushReceipt::new(&target, 3, 18);
        assert_eq!(receipt.size(), (64, 32));
        assert_eq!(receipt.draw_count(), 3);
        assert_eq!(target.size(), (64, 32));
    }
}
