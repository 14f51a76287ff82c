//! 动画内容（artboard）
//!
//! 动画文件使用 TOML 描述：画板尺寸、循环时长，以及若干形状。
//! 每个形状有填充 / 描边画笔，以及按时间线性插值的关键帧。
//!
//! ```toml
//! name = "Pulse"
//! width = 100.0
//! height = 100.0
//! duration = 2.0
//!
//! [[shapes]]
//! kind = "rect"
//! x = 25.0
//! y = 25.0
//! width = 50.0
//! height = 50.0
//! fill = 0xFFE63946
//!
//! [[shapes.keys]]
//! time = 0.0
//! rotation = 0.0
//!
//! [[shapes.keys]]
//! time = 2.0
//! rotation = 360.0
//! ```

use std::path::Path as FsPath;

use lyon::math::{point, vector, Angle, Box2D};
use lyon::path::{Path, Winding};
use serde::Deserialize;

use super::paint::{Paint, RenderPaint, RenderPath};
use super::{Factory, Renderer, Scene};
use crate::core::error::{ContentError, Result};
use crate::core::math::{lerp, rotation, translation, uniform_scale, Matrix3};

#[derive(Debug, Deserialize)]
struct ArtboardFile {
    #[serde(default = "default_name")]
    name: String,
    width: f32,
    height: f32,
    #[serde(default = "default_duration")]
    duration: f32,
    #[serde(default)]
    shapes: Vec<ShapeDef>,
}

#[derive(Debug, Deserialize)]
struct ShapeDef {
    #[serde(flatten)]
    geometry: Geometry,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    fill: Option<u32>,
    #[serde(default)]
    stroke: Option<u32>,
    #[serde(default = "default_stroke_width")]
    stroke_width: f32,
    /// 旋转 / 缩放的中心点，缺省为几何中心
    #[serde(default)]
    origin: Option<[f32; 2]>,
    #[serde(default)]
    keys: Vec<Keyframe>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum Geometry {
    Rect { x: f32, y: f32, width: f32, height: f32 },
    Ellipse { cx: f32, cy: f32, rx: f32, ry: f32 },
    Polygon { points: Vec<[f32; 2]> },
}

/// 一个关键帧
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Keyframe {
    pub time: f32,
    #[serde(default)]
    pub offset: [f32; 2],
    /// 角度（度）
    #[serde(default)]
    pub rotation: f32,
    #[serde(default = "default_one")]
    pub scale: f32,
    #[serde(default = "default_one")]
    pub opacity: f32,
}

fn default_name() -> String { "artboard".to_string() }
fn default_duration() -> f32 { 1.0 }
fn default_stroke_width() -> f32 { 1.0 }
fn default_one() -> f32 { 1.0 }

/// 某一时刻的形状姿态
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub offset: [f32; 2],
    pub rotation: f32,
    pub scale: f32,
    pub opacity: f32,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            offset: [0.0, 0.0],
            rotation: 0.0,
            scale: 1.0,
            opacity: 1.0,
        }
    }
}

impl Pose {
    fn from_key(key: &Keyframe) -> Self {
        Self {
            offset: key.offset,
            rotation: key.rotation,
            scale: key.scale,
            opacity: key.opacity,
        }
    }

    fn interpolate(a: &Keyframe, b: &Keyframe, t: f32) -> Self {
        Self {
            offset: [lerp(a.offset[0], b.offset[0], t), lerp(a.offset[1], b.offset[1], t)],
            rotation: lerp(a.rotation, b.rotation, t),
            scale: lerp(a.scale, b.scale, t),
            opacity: lerp(a.opacity, b.opacity, t),
        }
    }
}

struct Shape {
    name: String,
    path: RenderPath,
    fill: Option<RenderPaint>,
    stroke: Option<RenderPaint>,
    origin: [f32; 2],
    keys: Vec<Keyframe>,
}

impl Shape {
    fn pose_at(&self, time: f32) -> Pose {
        let keys = &self.keys;
        match keys.len() {
            0 => Pose::default(),
            1 => Pose::from_key(&keys[0]),
            _ => {
                if time <= keys[0].time {
                    return Pose::from_key(&keys[0]);
                }
                for pair in keys.windows(2) {
                    let (a, b) = (&pair[0], &pair[1]);
                    if time <= b.time {
                        let span = b.time - a.time;
                        let t = if span > 0.0 { (time - a.time) / span } else { 1.0 };
                        return Pose::interpolate(a, b, t);
                    }
                }
                Pose::from_key(&keys[keys.len() - 1])
            }
        }
    }

    fn transform(&self, pose: &Pose) -> Matrix3 {
        let [ox, oy] = self.origin;
        translation(ox + pose.offset[0], oy + pose.offset[1])
            * rotation(pose.rotation.to_radians())
            * uniform_scale(pose.scale)
            * translation(-ox, -oy)
    }
}

/// 内置动画场景
pub struct Artboard {
    name: String,
    width: f32,
    height: f32,
    duration: f32,
    time: f32,
    shapes: Vec<Shape>,
}

impl Artboard {
    /// 从文件加载，资源通过 `factory` 分配
    pub fn load<P: AsRef<FsPath>>(path: P, factory: &dyn Factory) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|_| ContentError::FileNotFound(path.to_path_buf()))?;
        Self::from_toml_str(&contents, factory)
    }

    pub fn from_toml_str(contents: &str, factory: &dyn Factory) -> Result<Self> {
        let file: ArtboardFile =
            toml::from_str(contents).map_err(|e| ContentError::ParseError(e.to_string()))?;

        if !(file.width > 0.0 && file.height > 0.0) {
            return Err(invalid("artboard width and height must be positive"));
        }
        if !(file.duration > 0.0) {
            return Err(invalid("duration must be positive"));
        }

        let mut shapes = Vec::with_capacity(file.shapes.len());
        for (index, def) in file.shapes.into_iter().enumerate() {
            let name = def.name.clone().unwrap_or_else(|| format!("shape{}", index));
            shapes.push(build_shape(name, def, factory)?);
        }

        tracing::debug!(
            name = %file.name,
            shapes = shapes.len(),
            allocations = factory.allocations(),
            "Artboard loaded"
        );

        Ok(Self {
            name: file.name,
            width: file.width,
            height: file.height,
            duration: file.duration,
            time: 0.0,
            shapes,
        })
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn shape_name(&self, index: usize) -> Option<&str> {
        self.shapes.get(index).map(|s| s.name.as_str())
    }

    /// 当前时间下第 `index` 个形状的姿态
    pub fn pose(&self, index: usize) -> Option<Pose> {
        self.shapes.get(index).map(|s| s.pose_at(self.time))
    }
}

fn invalid(msg: &str) -> crate::core::error::PlayerError {
    ContentError::InvalidContent(msg.to_string()).into()
}

fn build_shape(name: String, def: ShapeDef, factory: &dyn Factory) -> Result<Shape> {
    if def.keys.windows(2).any(|w| w[1].time < w[0].time) {
        return Err(invalid(&format!("keyframes of '{}' are not sorted by time", name)));
    }
    if def.fill.is_none() && def.stroke.is_none() {
        tracing::warn!(shape = %name, "Shape has neither fill nor stroke");
    }

    let mut builder = Path::builder();
    let center = match &def.geometry {
        Geometry::Rect { x, y, width, height } => {
            if !(*width > 0.0 && *height > 0.0) {
                return Err(invalid(&format!("rect '{}' must have a positive size", name)));
            }
            builder.add_rectangle(
                &Box2D::new(point(*x, *y), point(x + width, y + height)),
                Winding::Positive,
            );
            [x + width / 2.0, y + height / 2.0]
        }
        Geometry::Ellipse { cx, cy, rx, ry } => {
            if !(*rx > 0.0 && *ry > 0.0) {
                return Err(invalid(&format!("ellipse '{}' must have positive radii", name)));
            }
            builder.add_ellipse(
                point(*cx, *cy),
                vector(*rx, *ry),
                Angle::radians(0.0),
                Winding::Positive,
            );
            [*cx, *cy]
        }
        Geometry::Polygon { points } => {
            if points.len() < 3 {
                return Err(invalid(&format!("polygon '{}' needs at least 3 points", name)));
            }
            builder.begin(point(points[0][0], points[0][1]));
            for p in &points[1..] {
                builder.line_to(point(p[0], p[1]));
            }
            builder.end(true);
            let n = points.len() as f32;
            let (sx, sy) = points
                .iter()
                .fold((0.0, 0.0), |(sx, sy), p| (sx + p[0], sy + p[1]));
            [sx / n, sy / n]
        }
    };

    Ok(Shape {
        path: factory.make_path(builder.build()),
        fill: def.fill.map(|c| factory.make_paint(Paint::fill(c))),
        stroke: def
            .stroke
            .map(|c| factory.make_paint(Paint::stroke(c, def.stroke_width))),
        origin: def.origin.unwrap_or(center),
        keys: def.keys,
        name,
    })
}

impl Scene for Artboard {
    fn name(&self) -> &str {
        &self.name
    }

    fn bounds(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn advance(&mut self, elapsed_seconds: f32) {
        if elapsed_seconds <= 0.0 {
            return;
        }
        self.time = (self.time + elapsed_seconds).rem_euclid(self.duration);
    }

    fn time(&self) -> f32 {
        self.time
    }

    fn draw(&self, renderer: &mut dyn Renderer) {
        for shape in &self.shapes {
            let pose = shape.pose_at(self.time);
            renderer.save();
            renderer.transform(&shape.transform(&pose));
            renderer.modulate_opacity(pose.opacity);
            if let Some(fill) = &shape.fill {
                renderer.draw_path(&shape.path, fill);
            }
            if let Some(stroke) = &shape.stroke {
                renderer.draw_path(&shape.path, stroke);
            }
            renderer.restore();
        }
    }
}
