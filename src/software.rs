//! CPU reference implementation of opaque-stamp compositing.
//!
//! [`SoftwareRenderer`] follows the same begin/draw/end protocol as the GL
//! renderer and produces the same image: stamps are rasterized without
//! blending into an offscreen color buffer, a depth test keeps the fragment
//! closest to any stamp center, and the finished buffer is alpha-composited
//! once onto the caller's target. It needs no GPU, which makes it suitable
//! for headless rendering and for checking compositing behavior in tests.

use image::{Rgba, Rgba32FImage};
use lyon::math::{point, Box2D, Point, Transform};

use crate::color::Color;
use crate::error::{Result, StrokeError};
use crate::mesh::{MeshBuilder, StrokeMesh};
use crate::settings::{validate_target_size, StrokeSettings};
use crate::state::PassState;
use crate::types::{CurvePoint, DrawState, StrokeVertex};

/// Width of the antialiased falloff at the stamp rim, as a fraction of the
/// radius. Mirrors the stroke fragment shader.
pub const EDGE_FEATHER: f32 = 0.02;

/// Brightness of the body color where it meets the border. Mirrors the
/// stroke fragment shader.
pub const BODY_EDGE_SHADE: f32 = 0.7;

/// Depth written by the clear at `begin`; every stamp fragment passes against
/// it.
const CLEAR_DEPTH: f32 = 1.0;

/// Color of a stroke fragment at normalized distance `dist` from its stamp
/// center.
#[must_use]
pub fn shade(dist: f32, state: &DrawState, border_width: f32) -> Color {
    if dist >= 1.0 - border_width {
        let mut color = state.border;
        color[3] *= 1.0 - smoothstep(1.0 - EDGE_FEATHER, 1.0, dist);
        color
    } else {
        let t = dist / (1.0 - border_width);
        let k = 1.0 + (BODY_EDGE_SHADE - 1.0) * t;
        let [r, g, b, a] = state.fill;
        [r * k, g * k, b * k, a]
    }
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Twice the signed area of `(a, b, p)`.
fn edge_function(a: Point, b: Point, p: Point) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// A vertex after the camera, in pixel coordinates with its depth.
#[derive(Clone, Copy)]
struct ScreenVertex {
    pos: Point,
    depth: f32,
}

/// Stroke renderer that rasterizes on the CPU.
///
/// # Example
///
/// ```
/// use image::Rgba32FImage;
/// use lyon::math::point;
/// use slider_renderer_glow::{orthographic, SoftwareRenderer, StrokeSettings};
///
/// let mut renderer = SoftwareRenderer::new(StrokeSettings::default(), [128, 128]).unwrap();
/// renderer.set_camera(orthographic(128.0, 128.0));
/// let mesh = renderer.build_mesh(&[point(40.0, 64.0), point(88.0, 64.0)]).unwrap();
///
/// let mut target = Rgba32FImage::new(128, 128);
/// renderer.begin().unwrap();
/// renderer.set_color([1.0, 0.5, 0.0, 0.8], [1.0, 1.0, 1.0, 1.0]).unwrap();
/// renderer.draw(&mesh).unwrap();
/// renderer.end(&mut target).unwrap();
/// ```
pub struct SoftwareRenderer {
    settings: StrokeSettings,
    meshes: MeshBuilder,
    state: PassState,
    draw_state: DrawState,
    camera: Transform,
    size: [u32; 2],
    /// Offscreen color attachment, row-major from the top-left.
    color: Vec<Color>,
    /// Offscreen depth attachment.
    depth: Vec<f32>,
}

impl SoftwareRenderer {
    /// Create a renderer with an offscreen target of `width` x `height`
    /// pixels. The camera starts as the identity (playfield units are NDC).
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidConfiguration`] if the settings are
    /// invalid or either dimension is zero, and
    /// [`StrokeError::ResourceInitialization`] if the target cannot be
    /// allocated.
    pub fn new(settings: StrokeSettings, [width, height]: [u32; 2]) -> Result<Self> {
        settings.validate()?;
        let meshes = MeshBuilder::new(&settings)?;
        let mut renderer = Self {
            settings,
            meshes,
            state: PassState::Idle,
            draw_state: DrawState::default(),
            camera: Transform::identity(),
            size: [0, 0],
            color: Vec::new(),
            depth: Vec::new(),
        };
        renderer.resize(width, height)?;
        Ok(renderer)
    }

    /// Reallocate the offscreen target for a new viewport size.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidState`] while a pass is open,
    /// [`StrokeError::InvalidConfiguration`] for a zero dimension, and
    /// [`StrokeError::ResourceInitialization`] if the buffers cannot be
    /// allocated. The previous target is kept on error.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.state.require_idle("resize")?;
        validate_target_size(width, height)?;

        let pixels = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| target_too_large(width, height))?;
        let color = allocate(pixels, [0.0; 4]).ok_or_else(|| target_too_large(width, height))?;
        let depth = allocate(pixels, CLEAR_DEPTH).ok_or_else(|| target_too_large(width, height))?;

        self.color = color;
        self.depth = depth;
        self.size = [width, height];
        tracing::debug!(width, height, "software offscreen target reallocated");
        Ok(())
    }

    /// Offscreen target size in pixels.
    #[must_use]
    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// Current protocol state.
    #[must_use]
    pub fn state(&self) -> PassState {
        self.state
    }

    /// Build a mesh for `curve` with the configured template and radius.
    ///
    /// # Errors
    ///
    /// See [`MeshBuilder::build`].
    pub fn build_mesh(&self, curve: &[CurvePoint]) -> Result<StrokeMesh> {
        self.meshes.build(curve)
    }

    /// Mutable access to the template cache and radius.
    pub fn mesh_builder(&mut self) -> &mut MeshBuilder {
        &mut self.meshes
    }

    /// Open the offscreen pass: clear color to transparent and depth to far.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidState`] if a pass is already open.
    pub fn begin(&mut self) -> Result<()> {
        self.state.begin()?;
        self.color.fill([0.0; 4]);
        self.depth.fill(CLEAR_DEPTH);
        Ok(())
    }

    /// Set fill and border colors for subsequent draws.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidState`] outside a pass.
    pub fn set_color(&mut self, fill: Color, border: Color) -> Result<()> {
        self.state.require_recording("set color")?;
        self.draw_state.set_color(fill, border, &self.settings);
        Ok(())
    }

    /// Set the uniform mesh scale for subsequent draws.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidState`] outside a pass.
    pub fn set_scale(&mut self, scale: f32) -> Result<()> {
        self.state.require_recording("set scale")?;
        self.draw_state.scale = scale;
        Ok(())
    }

    /// Replace the camera. Allowed at any time; takes effect on the next
    /// draw.
    pub fn set_camera(&mut self, camera: Transform) {
        self.camera = camera;
    }

    /// Rasterize every stamp of `mesh` into the offscreen target.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidState`] outside a pass.
    pub fn draw(&mut self, mesh: &StrokeMesh) -> Result<()> {
        self.state.require_recording("draw")?;
        if mesh.is_empty() {
            return Ok(());
        }

        let transform = self.draw_state.model().then(&self.camera);
        #[expect(clippy::cast_precision_loss)]
        let [w, h] = [self.size[0] as f32, self.size[1] as f32];
        let to_screen = |v: &StrokeVertex| {
            let ndc = transform.transform_point(point(v.position[0], v.position[1]));
            ScreenVertex {
                pos: point((ndc.x + 1.0) * 0.5 * w, (1.0 - ndc.y) * 0.5 * h),
                depth: v.edge,
            }
        };

        for triangle in mesh.vertices().chunks_exact(3) {
            let a = to_screen(&triangle[0]);
            let b = to_screen(&triangle[1]);
            let c = to_screen(&triangle[2]);
            self.rasterize(a, b, c);
        }
        Ok(())
    }

    /// Close the pass and alpha-composite the offscreen image onto `target`
    /// with `src * src.a + dst * (1 - src.a)` on every channel.
    ///
    /// Only the region both images cover is written.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidState`] if no pass is open.
    pub fn end(&mut self, target: &mut Rgba32FImage) -> Result<()> {
        self.state.end()?;
        tracing::trace!(width = self.size[0], height = self.size[1], "compositing software stroke pass");

        let width = self.size[0].min(target.width());
        let height = self.size[1].min(target.height());
        for y in 0..height {
            for x in 0..width {
                let src = self.color[self.index(x, y)];
                let dst = target.get_pixel_mut(x, y);
                let a = src[3];
                for (d, s) in dst.0.iter_mut().zip(src) {
                    *d = s * a + *d * (1.0 - a);
                }
            }
        }
        Ok(())
    }

    /// Copy of the offscreen color target.
    #[must_use]
    pub fn offscreen(&self) -> Rgba32FImage {
        Rgba32FImage::from_fn(self.size[0], self.size[1], |x, y| {
            Rgba(self.color[self.index(x, y)])
        })
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.size[0] as usize + x as usize
    }

    /// Fill the pixels whose centers fall inside the triangle, keeping the
    /// fragment nearest a stamp center. No blending.
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn rasterize(&mut self, a: ScreenVertex, b: ScreenVertex, c: ScreenVertex) {
        let area = edge_function(a.pos, b.pos, c.pos);
        if area.abs() <= f32::EPSILON {
            // Wedge padding and other zero-area triangles cover no pixels.
            return;
        }

        #[expect(clippy::cast_precision_loss)]
        let viewport = Box2D::new(
            point(0.0, 0.0),
            point(self.size[0] as f32, self.size[1] as f32),
        );
        let Some(bounds) = Box2D::from_points([a.pos, b.pos, c.pos]).intersection(&viewport)
        else {
            return;
        };

        let x0 = bounds.min.x.floor() as u32;
        let y0 = bounds.min.y.floor() as u32;
        let x1 = (bounds.max.x.ceil() as u32).min(self.size[0]);
        let y1 = (bounds.max.y.ceil() as u32).min(self.size[1]);

        for y in y0..y1 {
            for x in x0..x1 {
                #[expect(clippy::cast_precision_loss)]
                let p = point(x as f32 + 0.5, y as f32 + 0.5);
                let wa = edge_function(b.pos, c.pos, p) / area;
                let wb = edge_function(c.pos, a.pos, p) / area;
                let wc = edge_function(a.pos, b.pos, p) / area;
                if wa < 0.0 || wb < 0.0 || wc < 0.0 {
                    continue;
                }

                let depth = wa * a.depth + wb * b.depth + wc * c.depth;
                let index = self.index(x, y);
                if depth <= self.depth[index] {
                    self.depth[index] = depth;
                    self.color[index] = shade(depth, &self.draw_state, self.settings.border_width);
                }
            }
        }
    }
}

/// A buffer of `len` copies of `value`, or `None` if it cannot be allocated.
fn allocate<T: Clone>(len: usize, value: T) -> Option<Vec<T>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).ok()?;
    buffer.resize(len, value);
    Some(buffer)
}

fn target_too_large(width: u32, height: u32) -> StrokeError {
    tracing::error!(width, height, "software offscreen target allocation failed");
    StrokeError::ResourceInitialization(format!(
        "cannot allocate a {width}x{height} offscreen target"
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::orthographic;

    const SIZE: u32 = 64;
    const RED: Color = [1.0, 0.0, 0.0, 1.0];
    const GREEN: Color = [0.0, 1.0, 0.0, 1.0];
    const BLUE: Color = [0.0, 0.0, 1.0, 1.0];

    fn renderer() -> SoftwareRenderer {
        let settings = StrokeSettings {
            level_of_detail: 32,
            radius: 10.0,
            ..StrokeSettings::default()
        };
        let mut renderer = SoftwareRenderer::new(settings, [SIZE, SIZE]).unwrap();
        #[expect(clippy::cast_precision_loss)]
        let size = SIZE as f32;
        renderer.set_camera(orthographic(size, size));
        renderer
    }

    fn pixel(image: &Rgba32FImage, x: u32, y: u32) -> Color {
        image.get_pixel(x, y).0
    }

    fn render(renderer: &mut SoftwareRenderer, draws: &[(&StrokeMesh, Color)]) -> Rgba32FImage {
        let mut target = Rgba32FImage::from_pixel(SIZE, SIZE, Rgba([0.0, 0.0, 0.0, 1.0]));
        renderer.begin().unwrap();
        for (mesh, fill) in draws {
            renderer.set_color(*fill, BLUE).unwrap();
            renderer.draw(mesh).unwrap();
        }
        renderer.end(&mut target).unwrap();
        target
    }

    #[test]
    fn protocol_violations_are_rejected() {
        let mut renderer = renderer();
        let mesh = renderer.build_mesh(&[point(32.0, 32.0)]).unwrap();
        let mut target = Rgba32FImage::new(SIZE, SIZE);

        assert!(matches!(
            renderer.draw(&mesh),
            Err(StrokeError::InvalidState { operation: "draw", .. })
        ));
        assert!(renderer.set_color(RED, RED).is_err());
        assert!(renderer.set_scale(2.0).is_err());
        assert!(renderer.end(&mut target).is_err());

        renderer.begin().unwrap();
        assert!(matches!(
            renderer.begin(),
            Err(StrokeError::InvalidState { operation: "begin", .. })
        ));
        assert!(renderer.resize(32, 32).is_err());
        renderer.end(&mut target).unwrap();
        assert_eq!(renderer.state(), PassState::Idle);
    }

    #[test]
    fn oversized_target_is_an_allocation_error() {
        assert!(matches!(
            SoftwareRenderer::new(StrokeSettings::default(), [u32::MAX, u32::MAX]),
            Err(StrokeError::ResourceInitialization(_))
        ));

        let mut renderer = renderer();
        assert!(matches!(
            renderer.resize(u32::MAX, u32::MAX),
            Err(StrokeError::ResourceInitialization(_))
        ));
        assert_eq!(renderer.size(), [SIZE, SIZE]);

        // The old target still renders.
        let mesh = renderer.build_mesh(&[point(32.0, 32.0)]).unwrap();
        let image = render(&mut renderer, &[(&mesh, RED)]);
        assert!(pixel(&image, 32, 32)[0] > 0.9);
    }

    #[test]
    fn empty_mesh_draw_is_a_no_op() {
        let mut renderer = renderer();
        let mesh = renderer.build_mesh(&[]).unwrap();
        renderer.begin().unwrap();
        renderer.draw(&mesh).unwrap();
        assert!(renderer.offscreen().pixels().all(|p| p.0 == [0.0; 4]));
        let mut target = Rgba32FImage::new(SIZE, SIZE);
        renderer.end(&mut target).unwrap();
    }

    #[test]
    fn stamp_has_body_border_and_transparent_outside() {
        let mut renderer = renderer();
        let mesh = renderer.build_mesh(&[point(32.0, 32.0)]).unwrap();
        renderer.begin().unwrap();
        renderer.set_color(RED, BLUE).unwrap();
        renderer.draw(&mesh).unwrap();
        let offscreen = renderer.offscreen();

        let center = pixel(&offscreen, 32, 32);
        assert!(center[0] > 0.9 && center[2] == 0.0 && center[3] == 1.0);

        let border = pixel(&offscreen, 41, 32);
        assert_eq!(border, BLUE);

        assert_eq!(pixel(&offscreen, 50, 32), [0.0; 4]);
        assert_eq!(pixel(&offscreen, 2, 2), [0.0; 4]);
    }

    #[test]
    fn body_darkens_toward_the_border() {
        let mut renderer = renderer();
        let mesh = renderer.build_mesh(&[point(32.0, 32.0)]).unwrap();
        renderer.begin().unwrap();
        renderer.set_color(RED, BLUE).unwrap();
        renderer.draw(&mesh).unwrap();
        let offscreen = renderer.offscreen();
        assert!(pixel(&offscreen, 32, 32)[0] > pixel(&offscreen, 37, 32)[0]);
    }

    #[test]
    fn fully_overlapping_stamps_composite_like_one() {
        let fill = [0.2, 0.4, 0.8, 0.5];
        let mut renderer = renderer();
        let mesh = renderer.build_mesh(&[point(30.0, 33.0)]).unwrap();

        let once = render(&mut renderer, &[(&mesh, fill)]);
        let twice = render(&mut renderer, &[(&mesh, fill), (&mesh, fill)]);
        assert_eq!(once, twice);

        // A stroke that stamps the same point repeatedly is no darker either.
        let stacked = renderer
            .build_mesh(&[point(30.0, 33.0), point(30.0, 33.0), point(30.0, 33.0)])
            .unwrap();
        assert_eq!(render(&mut renderer, &[(&stacked, fill)]), once);
    }

    #[test]
    fn overlap_alpha_matches_single_stamp_alpha() {
        let fill = [0.2, 0.4, 0.8, 0.5];
        let mut renderer = renderer();
        let mesh = renderer
            .build_mesh(&[point(26.0, 32.0), point(38.0, 32.0)])
            .unwrap();
        renderer.begin().unwrap();
        renderer.set_color(fill, BLUE).unwrap();
        renderer.draw(&mesh).unwrap();

        let offscreen = renderer.offscreen();
        // Pixel 32 lies inside both stamps' bodies, pixel 20 inside one.
        assert!((pixel(&offscreen, 32, 32)[3] - 0.5).abs() < f32::EPSILON);
        assert!((pixel(&offscreen, 20, 32)[3] - 0.5).abs() < f32::EPSILON);

        let mut target = Rgba32FImage::from_pixel(SIZE, SIZE, Rgba([0.0, 0.0, 0.0, 1.0]));
        renderer.end(&mut target).unwrap();
        let overlap = pixel(&target, 32, 32)[3];
        let single = pixel(&target, 20, 32)[3];
        assert!((overlap - single).abs() < f32::EPSILON);
    }

    #[test]
    fn nearest_stamp_center_wins_regardless_of_draw_order() {
        let mut renderer = renderer();
        let left = renderer.build_mesh(&[point(26.0, 32.0)]).unwrap();
        let right = renderer.build_mesh(&[point(38.0, 32.0)]).unwrap();

        for draws in [
            [(&left, RED), (&right, GREEN)],
            [(&right, GREEN), (&left, RED)],
        ] {
            let image = render(&mut renderer, &draws);
            let near_left = pixel(&image, 28, 32);
            let near_right = pixel(&image, 36, 32);
            assert!(near_left[0] > 0.5 && near_left[1] == 0.0);
            assert!(near_right[1] > 0.5 && near_right[0] == 0.0);
        }
    }

    #[test]
    fn composite_blends_with_source_alpha() {
        let fill = [1.0, 1.0, 1.0, 0.25];
        let mut renderer = renderer();
        let mesh = renderer.build_mesh(&[point(32.0, 32.0)]).unwrap();
        renderer.begin().unwrap();
        renderer.set_color(fill, BLUE).unwrap();
        renderer.draw(&mesh).unwrap();
        let src = pixel(&renderer.offscreen(), 32, 32);

        let mut target = Rgba32FImage::from_pixel(SIZE, SIZE, Rgba([0.0, 0.0, 0.0, 1.0]));
        renderer.end(&mut target).unwrap();
        let out = pixel(&target, 32, 32);
        assert!((out[0] - src[0] * 0.25).abs() < 1e-6);
        assert!((out[3] - (0.25 * 0.25 + 0.75)).abs() < 1e-6);
        // Untouched pixels keep the background.
        assert_eq!(pixel(&target, 0, 0), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn begin_discards_the_previous_cycle() {
        let mut renderer = renderer();
        let mesh = renderer.build_mesh(&[point(32.0, 32.0)]).unwrap();
        render(&mut renderer, &[(&mesh, RED)]);
        renderer.begin().unwrap();
        assert!(renderer.offscreen().pixels().all(|p| p.0 == [0.0; 4]));
    }

    #[test]
    fn scale_and_camera_move_the_stamp() {
        let mut renderer = renderer();
        let mesh = renderer.build_mesh(&[point(16.0, 16.0)]).unwrap();
        renderer.begin().unwrap();
        renderer.set_color(RED, RED).unwrap();
        renderer.set_scale(2.0).unwrap();
        renderer.draw(&mesh).unwrap();
        let offscreen = renderer.offscreen();
        assert!(pixel(&offscreen, 32, 32)[3] > 0.0);
        assert_eq!(pixel(&offscreen, 16, 16), [0.0; 4]);

        // Camera changes mid-pass apply to the next draw.
        renderer.set_scale(1.0).unwrap();
        renderer.set_camera(
            orthographic(64.0, 64.0).pre_translate(lyon::math::vector(30.0, 0.0)),
        );
        renderer.draw(&mesh).unwrap();
        assert!(pixel(&renderer.offscreen(), 46, 16)[3] > 0.0);
    }

    #[test]
    fn gradient_offset_replaces_border_color() {
        let settings = StrokeSettings {
            level_of_detail: 32,
            radius: 10.0,
            border_gradient_offset: Some(120.0),
            ..StrokeSettings::default()
        };
        let mut renderer = SoftwareRenderer::new(settings, [SIZE, SIZE]).unwrap();
        renderer.set_camera(orthographic(64.0, 64.0));
        let mesh = renderer.build_mesh(&[point(32.0, 32.0)]).unwrap();
        renderer.begin().unwrap();
        renderer.set_color(RED, BLUE).unwrap();
        renderer.draw(&mesh).unwrap();
        let border = pixel(&renderer.offscreen(), 41, 32);
        assert!(border[1] > 0.99 && border[2] < 1e-5);
    }

    #[test]
    fn resize_reallocates_the_target() {
        let mut renderer = renderer();
        renderer.resize(16, 8).unwrap();
        assert_eq!(renderer.size(), [16, 8]);
        assert_eq!(renderer.offscreen().dimensions(), (16, 8));
        assert!(matches!(
            renderer.resize(0, 8),
            Err(StrokeError::InvalidConfiguration(_))
        ));
        assert_eq!(renderer.size(), [16, 8]);
    }

    #[test]
    fn shade_bands() {
        let state = DrawState {
            fill: RED,
            border: BLUE,
            scale: 1.0,
        };
        assert_eq!(shade(0.0, &state, 0.2), RED);
        assert_eq!(shade(0.9, &state, 0.2), BLUE);
        assert_eq!(shade(1.0, &state, 0.2)[3], 0.0);
        let edge_of_body = shade(0.79, &state, 0.2);
        assert!((edge_of_body[0] - (1.0 + (BODY_EDGE_SHADE - 1.0) * 0.79 / 0.8)).abs() < 1e-6);
    }
}
