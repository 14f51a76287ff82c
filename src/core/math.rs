//! 二维数学工具
//!
//! 基于 `nalgebra`，以 3x3 齐次矩阵表示二维仿射变换（列向量约定）。

pub use nalgebra::{Matrix3 as Mat3, Point2 as Pt2, Vector2 as Vec2};

pub type Matrix3 = Mat3<f32>;
pub type Point2 = Pt2<f32>;
pub type Vector2 = Vec2<f32>;

/// 平移矩阵
pub fn translation(x: f32, y: f32) -> Matrix3 {
    Matrix3::new_translation(&Vector2::new(x, y))
}

/// 等比缩放矩阵
pub fn uniform_scale(s: f32) -> Matrix3 {
    Matrix3::new_scaling(s)
}

/// 绕原点旋转（弧度）
pub fn rotation(radians: f32) -> Matrix3 {
    Matrix3::new_rotation(radians)
}

/// 用仿射矩阵变换一个点
pub fn transform_point(m: &Matrix3, x: f32, y: f32) -> Point2 {
    m.transform_point(&Point2::new(x, y))
}

/// 仿射矩阵的平均缩放系数（用于描边宽度）
pub fn scale_factor(m: &Matrix3) -> f32 {
    let det = m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)];
    det.abs().sqrt()
}

/// 线性插值
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// 内容适配窗口的变换：居中并等比缩放
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitTransform {
    pub scale: f32,
    pub offset: (f32, f32),
    pub scaled_size: (f32, f32),
}

impl FitTransform {
    /// `scale = padding * min(Ww/Cw, Wh/Ch)`，偏移量使缩放后的内容居中。
    ///
    /// 内容或窗口尺寸为零时返回单位变换。
    pub fn compute(content: (f32, f32), window: (f32, f32), padding: f32) -> Self {
        let (cw, ch) = content;
        let (ww, wh) = window;
        if cw <= 0.0 || ch <= 0.0 || ww <= 0.0 || wh <= 0.0 {
            return Self {
                scale: 1.0,
                offset: (0.0, 0.0),
                scaled_size: (cw.max(0.0), ch.max(0.0)),
            };
        }

        let scale = padding * (ww / cw).min(wh / ch);
        let scaled_size = (cw * scale, ch * scale);
        let offset = ((ww - scaled_size.0) / 2.0, (wh - scaled_size.1) / 2.0);

        Self {
            scale,
            offset,
            scaled_size,
        }
    }

    /// translate ∘ scale
    pub fn matrix(&self) -> Matrix3 {
        translation(self.offset.0, self.offset.1) * uniform_scale(self.scale)
    }
}
