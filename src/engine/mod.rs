//! 矢量渲染引擎接口
//!
//! 帧协调器只通过四个能力点使用渲染引擎：
//!
//! - `Factory`：分配路径和画笔资源
//! - `RenderContext`：按帧描述开始一帧，并把录制的命令 flush 到渲染目标
//! - `Renderer`：save / transform / draw / restore 风格的命令录制器
//! - `Scene`：已加载的动画，按经过的秒数推进
//!
//! 本模块同时提供内置实现：命令用 lyon 三角化，再通过 OpenGL（glow）
//! 或 Metal 用单一的纯色着色器绘制。

pub mod artboard;
pub mod frame;
pub mod paint;
pub mod recorder;
pub mod tessellate;

#[cfg(not(target_os = "macos"))]
pub mod gl;
#[cfg(target_os = "macos")]
pub mod metal;

use lyon::path::Path;

use crate::core::error::Result;
use crate::core::math::Matrix3;

pub use artboard::Artboard;
pub use frame::{
    argb_to_rgba, FillRule, FlushReceipt, FrameDescriptor, FrameOptions, FramebufferTarget,
    LoadAction, RenderTarget,
};
pub use paint::{Paint, PaintStyle, RenderPaint, RenderPath};

/// 资源分配能力
pub trait Factory {
    fn make_path(&self, path: Path) -> RenderPath;

    fn make_paint(&self, paint: Paint) -> RenderPaint;

    /// 已分配的资源数量
    fn allocations(&self) -> u64;
}

/// 渲染上下文
///
/// 由后端创建并独占持有；外部只能借用。
pub trait RenderContext: Factory {
    /// 以 `Factory` 的形式借出自身
    fn as_factory(&self) -> &dyn Factory;

    fn name(&self) -> &str;

    /// 开始一帧；未 flush 的上一帧命令被丢弃
    fn begin_frame(&mut self, descriptor: &FrameDescriptor);

    /// 创建绑定到本上下文的渲染器，所有权交给调用者
    fn make_renderer(&self) -> Box<dyn Renderer>;

    /// 把本帧录制的命令提交到渲染目标
    fn flush(&mut self, target: &RenderTarget) -> Result<FlushReceipt>;
}

/// 绘制命令录制器
pub trait Renderer {
    fn save(&mut self);

    fn restore(&mut self);

    /// 右乘到当前变换
    fn transform(&mut self, matrix: &Matrix3);

    fn modulate_opacity(&mut self, opacity: f32);

    fn draw_path(&mut self, path: &RenderPath, paint: &RenderPaint);

    /// 绑定的渲染上下文是否仍然存在
    fn is_attached(&self) -> bool;

    /// 因上下文不存在或不在帧内而被丢弃的绘制次数
    fn discarded_draws(&self) -> u64;
}

/// 已加载的动画场景
pub trait Scene {
    fn name(&self) -> &str;

    /// 内容尺寸（宽, 高）
    fn bounds(&self) -> (f32, f32);

    /// 推进动画时间
    fn advance(&mut self, elapsed_seconds: f32);

    /// 当前动画时间（秒）
    fn time(&self) -> f32;

    fn draw(&self, renderer: &mut dyn Renderer);
}
