//! Geometry and per-draw types shared by the mesh builder and renderers.

use bytemuck::{Pod, Zeroable};
use lyon::math::{Point, Transform};

use crate::color::{self, Color};
use crate::settings::StrokeSettings;

/// A sample point of a slider curve in playfield coordinates.
///
/// Produced by the curve sampler; the mesh builder only reads these.
pub type CurvePoint = Point;

/// A vertex of a circle template or stamped stroke mesh, ready for the GPU.
///
/// `edge` is `1.0` for vertices on the circumference and `0.0` for the stamp
/// center. It is interpolated across each wedge and read by the stroke
/// shader as the normalized distance from the stamp center.
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct StrokeVertex {
    /// Position in playfield units (template vertices: unit-disc units).
    pub position: [f32; 2],
    /// Circumference flag, `0.0` or `1.0`.
    pub edge: f32,
}

impl StrokeVertex {
    /// A center vertex at the origin.
    pub const CENTER: Self = Self {
        position: [0.0, 0.0],
        edge: 0.0,
    };

    /// A circumference vertex at `(x, y)`.
    #[must_use]
    pub const fn rim(x: f32, y: f32) -> Self {
        Self {
            position: [x, y],
            edge: 1.0,
        }
    }

    /// Whether this vertex lies on the circumference.
    #[must_use]
    pub fn is_edge(&self) -> bool {
        self.edge > 0.5
    }
}

/// Uniform values for stroke draws, set between `begin` and `end`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DrawState {
    /// Body color.
    pub fill: Color,
    /// Border band color.
    pub border: Color,
    /// Uniform scale applied to mesh positions before the camera.
    pub scale: f32,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            fill: [1.0, 1.0, 1.0, 1.0],
            border: [1.0, 1.0, 1.0, 1.0],
            scale: 1.0,
        }
    }
}

impl DrawState {
    /// Store the colors for the next draws.
    ///
    /// With a configured gradient offset the caller's border color is ignored
    /// and the fill color, hue-shifted by the offset, is used instead.
    pub fn set_color(&mut self, fill: Color, border: Color, settings: &StrokeSettings) {
        self.fill = fill;
        self.border = match settings.border_gradient_offset {
            Some(offset) => color::shift_hue(fill, offset),
            None => border,
        };
    }

    /// Model transform for the current scale.
    #[must_use]
    pub fn model(&self) -> Transform {
        Transform::scale(self.scale, self.scale)
    }
}

/// Camera mapping pixel-space coordinates (origin top-left, y down) of a
/// `width` x `height` target to normalized device coordinates.
#[must_use]
pub fn orthographic(width: f32, height: f32) -> Transform {
    Transform::scale(2.0 / width, -2.0 / height).then_translate(lyon::math::vector(-1.0, 1.0))
}

/// Expand a 2D affine transform into a column-major 4x4 matrix for a
/// `mat4` uniform. Z passes through unchanged.
#[must_use]
pub fn to_mat4(t: &Transform) -> [f32; 16] {
    [
        t.m11, t.m12, 0.0, 0.0, //
        t.m21, t.m22, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        t.m31, t.m32, 0.0, 1.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyon::math::point;

    fn assert_point_eq(actual: Point, expected: Point) {
        assert!(
            (actual - expected).length() < 1e-5,
            "expected {expected:?}, got {actual:?}",
        );
    }

    #[test]
    fn orthographic_maps_corners_to_ndc() {
        let camera = orthographic(640.0, 480.0);
        assert_point_eq(camera.transform_point(point(0.0, 0.0)), point(-1.0, 1.0));
        assert_point_eq(camera.transform_point(point(640.0, 480.0)), point(1.0, -1.0));
        assert_point_eq(camera.transform_point(point(320.0, 240.0)), point(0.0, 0.0));
    }

    #[test]
    fn mat4_matches_affine_transform() {
        let t = orthographic(100.0, 50.0);
        let m = to_mat4(&t);
        let p = point(30.0, 10.0);
        let x = m[0] * p.x + m[4] * p.y + m[12];
        let y = m[1] * p.x + m[5] * p.y + m[13];
        assert_point_eq(point(x, y), t.transform_point(p));
    }

    #[test]
    fn gradient_offset_overrides_border_color() {
        let settings = StrokeSettings {
            border_gradient_offset: Some(120.0),
            ..StrokeSettings::default()
        };
        let mut state = DrawState::default();
        state.set_color([1.0, 0.0, 0.0, 1.0], [0.0, 0.0, 0.0, 1.0], &settings);
        assert!((state.border[1] - 1.0).abs() < 1e-5);
        assert!(state.border[0].abs() < 1e-5);
    }

    #[test]
    fn border_color_is_used_without_offset() {
        let mut state = DrawState::default();
        let border = [0.1, 0.2, 0.3, 0.4];
        state.set_color([1.0, 0.0, 0.0, 1.0], border, &StrokeSettings::default());
        assert_eq!(state.border, border);
    }

    #[test]
    fn vertex_layout_is_three_floats() {
        assert_eq!(std::mem::size_of::<StrokeVertex>(), 12);
        assert!(StrokeVertex::rim(0.0, 1.0).is_edge());
        assert!(!StrokeVertex::CENTER.is_edge());
    }
}
