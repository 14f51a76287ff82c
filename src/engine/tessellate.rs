//! 把录制的绘制命令三角化为 GPU 顶点
//!
//! 路径先按命令的变换矩阵变换到像素空间再三角化，
//! 这样容差以像素为单位，描边宽度随变换缩放。

use bytemuck::{Pod, Zeroable};
use lyon::math::Transform;
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillRule as LyonFillRule, FillTessellator, FillVertex,
    StrokeOptions, StrokeTessellator, StrokeVertex, TessellationError, VertexBuffers,
};

use super::frame::{argb_to_rgba, FillRule, FrameDescriptor};
use super::paint::PaintStyle;
use super::recorder::DrawCommand;
use crate::core::error::{GraphicsError, Result};
use crate::core::math::{scale_factor, Matrix3};

/// 像素空间容差
const TOLERANCE: f32 = 0.25;

/// 位置（像素）+ 颜色（RGBA，预乘前）
///
/// 布局与 GLSL 的 `vec2 + vec4`、MSL 的 `packed_float2 + packed_float4` 一致。
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

/// 图元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Triangles,
    Lines,
}

/// 一帧的顶点数据
#[derive(Debug, Clone)]
pub struct FrameMesh {
    pub topology: Topology,
    pub vertices: Vec<ColorVertex>,
}

impl FrameMesh {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// 命令三角化器，复用 lyon 的内部缓冲
pub struct MeshBuilder {
    fill: FillTessellator,
    stroke: StrokeTessellator,
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self {
            fill: FillTessellator::new(),
            stroke: StrokeTessellator::new(),
        }
    }

    /// 按帧描述中的开关三角化所有命令
    pub fn build(&mut self, descriptor: &FrameDescriptor, commands: &[DrawCommand]) -> Result<FrameMesh> {
        let mut triangles = Vec::new();

        for command in commands {
            match command.paint.paint().style {
                PaintStyle::Fill if descriptor.disable_fills => continue,
                PaintStyle::Stroke { .. } if descriptor.disable_strokes => continue,
                _ => {}
            }

            self.append(descriptor.fill_rule, command, &mut triangles)
                .map_err(|e| {
                    GraphicsError::CommandExecution(format!(
                        "tessellation of path {} failed: {:?}",
                        command.path.id(),
                        e
                    ))
                })?;
        }

        if descriptor.wireframe {
            Ok(FrameMesh {
                topology: Topology::Lines,
                vertices: triangles_to_lines(&triangles),
            })
        } else {
            Ok(FrameMesh {
                topology: Topology::Triangles,
                vertices: triangles,
            })
        }
    }

    fn append(
        &mut self,
        fill_rule: FillRule,
        command: &DrawCommand,
        out: &mut Vec<ColorVertex>,
    ) -> std::result::Result<(), TessellationError> {
        let paint = command.paint.paint();
        let mut color = argb_to_rgba(paint.color);
        color[3] *= command.opacity;
        if color[3] <= 0.0 {
            return Ok(());
        }

        let path = command
            .path
            .path()
            .clone()
            .transformed(&to_lyon_transform(&command.transform));

        let mut geometry: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
        match paint.style {
            PaintStyle::Fill => {
                let options = FillOptions::tolerance(TOLERANCE).with_fill_rule(match fill_rule {
                    FillRule::NonZero => LyonFillRule::NonZero,
                    FillRule::EvenOdd => LyonFillRule::EvenOdd,
                });
                self.fill.tessellate_path(
                    &path,
                    &options,
                    &mut BuffersBuilder::new(&mut geometry, |v: FillVertex| v.position().to_array()),
                )?;
            }
            PaintStyle::Stroke { thickness } => {
                let width = thickness * scale_factor(&command.transform);
                if width <= 0.0 {
                    return Ok(());
                }
                let options = StrokeOptions::tolerance(TOLERANCE).with_line_width(width);
                self.stroke.tessellate_path(
                    &path,
                    &options,
                    &mut BuffersBuilder::new(&mut geometry, |v: StrokeVertex| v.position().to_array()),
                )?;
            }
        }

        out.extend(geometry.indices.iter().map(|&i| ColorVertex {
            position: geometry.vertices[i as usize],
            color,
        }));
        Ok(())
    }
}

/// nalgebra（列向量）到 euclid（行向量）矩阵的转换
pub fn to_lyon_transform(m: &Matrix3) -> Transform {
    Transform::new(
        m[(0, 0)],
        m[(1, 0)],
        m[(0, 1)],
        m[(1, 1)],
        m[(0, 2)],
        m[(1, 2)],
    )
}

/// 三角形列表转为边的线段列表
fn triangles_to_lines(triangles: &[ColorVertex]) -> Vec<ColorVertex> {
    let mut lines = Vec::with_capacity(triangles.len() * 2);
    for tri in triangles.chunks_exact(3) {
        lines.extend_from_slice(&[tri[0], tri[1], tri[1], tri[2], tri[2], tri[0]]);
    }
    lines
}
