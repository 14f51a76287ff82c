//! 路径与画笔资源
//!
//! 由 `Factory` 分配，只包含 CPU 侧数据，可以在帧之间共享。

use std::rc::Rc;

use lyon::path::Path;

/// 画笔样式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaintStyle {
    Fill,
    Stroke { thickness: f32 },
}

/// 画笔描述
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    /// 32 位 ARGB
    pub color: u32,
    pub style: PaintStyle,
}

impl Paint {
    pub fn fill(color: u32) -> Self {
        Self {
            color,
            style: PaintStyle::Fill,
        }
    }

    pub fn stroke(color: u32, thickness: f32) -> Self {
        Self {
            color,
            style: PaintStyle::Stroke { thickness },
        }
    }

    pub fn is_stroke(&self) -> bool {
        matches!(self.style, PaintStyle::Stroke { .. })
    }
}

/// 已分配的路径句柄
#[derive(Debug, Clone)]
pub struct RenderPath {
    id: u64,
    path: Rc<Path>,
}

impl RenderPath {
    pub(crate) fn new(id: u64, path: Path) -> Self {
        Self {
            id,
            path: Rc::new(path),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// 已分配的画笔句柄
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPaint {
    id: u64,
    paint: Paint,
}

impl RenderPaint {
    pub(crate) fn new(id: u64, paint: Paint) -> Self {
        Self { id, paint }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn paint(&self) -> &Paint {
        &self.paint
    }
}
