//! The stroke renderer: owns GL state for the opaque-stamp pass and issues
//! draw calls.

use glow::{HasContext, PixelPackData};
use image::RgbaImage;
use lyon::math::Transform;
use std::sync::Arc;

use crate::{
    color::Color,
    error::{Result, StrokeError},
    framebuffer::{CompositeQuad, OffscreenTarget},
    mesh::{MeshBuilder, StrokeMesh},
    settings::{validate_target_size, StrokeSettings},
    shaders,
    state::PassState,
    types::{to_mat4, CurvePoint, DrawState, StrokeVertex},
};

/// Cached uniform locations for the stroke shader program.
struct StrokeUniforms {
    /// `u_camera`: playfield to NDC transform.
    camera: glow::UniformLocation,
    /// `u_scale`: uniform mesh scale.
    scale: glow::UniformLocation,
    /// `u_fill`: body color.
    fill: glow::UniformLocation,
    /// `u_border`: border color.
    border: glow::UniformLocation,
    /// `u_border_width`: border band as a fraction of the radius.
    border_width: glow::UniformLocation,
}

/// Cached uniform locations for the compositing shader program.
struct CompositeUniforms {
    /// `u_texture`: texture unit index (always 0).
    texture: glow::UniformLocation,
}

/// Draw framebuffer and viewport that were bound when the pass began.
struct CallerTarget {
    framebuffer: Option<glow::Framebuffer>,
    viewport: [i32; 4],
}

/// A stroke mesh resident on the GPU.
///
/// Upload once with [`StrokeRenderer::upload_mesh`], draw every frame, and
/// free with [`StrokeRenderer::release_mesh`].
pub struct UploadedMesh {
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    vertex_count: i32,
    template_generation: u64,
}

impl UploadedMesh {
    /// Number of vertices uploaded.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        usize::try_from(self.vertex_count).unwrap_or_default()
    }

    /// Whether the mesh has no vertices; drawing it does nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0
    }

    /// Generation of the circle template the mesh was stamped from.
    #[must_use]
    pub fn template_generation(&self) -> u64 {
        self.template_generation
    }
}

/// The `ACTIVE_TEXTURE` query as a unit enum, falling back to unit 0 if the
/// driver reports garbage.
fn texture_unit(raw: i32) -> u32 {
    u32::try_from(raw)
        .ok()
        .filter(|unit| *unit >= glow::TEXTURE0)
        .unwrap_or(glow::TEXTURE0)
}

fn gpu_error(err: String) -> StrokeError {
    tracing::error!(error = %err, "stroke renderer GPU resource failure");
    StrokeError::ResourceInitialization(err)
}

/// Point both stroke vertex attributes of the bound VAO at the bound
/// buffer.
unsafe fn bind_stroke_attributes(gl: &glow::Context) {
    // StrokeVertex is 12 bytes, well within i32 range.
    #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let stride = std::mem::size_of::<StrokeVertex>() as i32;
    unsafe {
        gl.enable_vertex_attrib_array(shaders::STROKE_POSITION_LOCATION);
        gl.vertex_attrib_pointer_f32(
            shaders::STROKE_POSITION_LOCATION,
            2,
            glow::FLOAT,
            false,
            stride,
            0,
        );
        gl.enable_vertex_attrib_array(shaders::STROKE_EDGE_LOCATION);
        gl.vertex_attrib_pointer_f32(shaders::STROKE_EDGE_LOCATION, 1, glow::FLOAT, false, stride, 8);
    }
}

/// Renders thick, round slider strokes by stamping a circle at every curve
/// sample into an offscreen target and compositing the result once.
///
/// # Pass contract
///
/// [`StrokeRenderer::begin`] records the caller's draw framebuffer and
/// viewport, binds the offscreen target as the draw framebuffer only, clears
/// it to transparent with depth at the far plane, then leaves GL with:
///
/// - blending disabled,
/// - depth test enabled with `LEQUAL`, depth writes on,
/// - the stroke program bound with the camera, scale, and colors uploaded.
///
/// Every stamp is written opaquely; the depth test keeps the fragment nearest
/// a stamp center, so overlaps never accumulate.
///
/// [`StrokeRenderer::end`] restores the caller's draw framebuffer and
/// viewport, leaves GL with depth test off and depth writes off, composites
/// the offscreen color with `SRC_ALPHA, ONE_MINUS_SRC_ALPHA`, and finally
/// sets blending to the premultiplied `ONE, ONE_MINUS_SRC_ALPHA` mode used
/// for the rest of the frame.
///
/// The read framebuffer binding is never touched. The active texture unit
/// and the `TEXTURE_2D` binding on unit 0 are restored to what the caller
/// had. No program is left bound.
///
/// # Example
///
/// ```no_run
/// # use slider_renderer_glow::{orthographic, StrokeRenderer, StrokeSettings};
/// # use lyon::math::point;
/// # use std::sync::Arc;
/// # fn example(gl: Arc<glow::Context>) -> slider_renderer_glow::Result<()> {
/// // During setup (with a current GL context):
/// let mut renderer = unsafe { StrokeRenderer::new(gl, StrokeSettings::default(), [1280, 720]) }?;
/// unsafe { renderer.set_camera(orthographic(1280.0, 720.0)) };
///
/// // At beatmap load:
/// let mesh = renderer.build_mesh(&[point(100.0, 100.0), point(104.0, 102.0)])?;
/// let slider = unsafe { renderer.upload_mesh(&mesh) }?;
///
/// // Each frame:
/// unsafe {
///     renderer.begin()?;
///     renderer.set_color([0.9, 0.3, 0.3, 0.8], [1.0, 1.0, 1.0, 1.0])?;
///     renderer.draw(&slider)?;
///     renderer.end()?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct StrokeRenderer {
    /// The OpenGL context, shared via [`Arc`] so it can be stored alongside
    /// resources that reference it.
    gl: Arc<glow::Context>,

    settings: StrokeSettings,
    meshes: MeshBuilder,

    state: PassState,
    draw_state: DrawState,
    camera: Transform,
    /// Set while a pass with a usable offscreen target is open.
    caller_target: Option<CallerTarget>,

    stroke_program: glow::Program,
    stroke_uniforms: StrokeUniforms,
    composite_program: glow::Program,
    composite_uniforms: CompositeUniforms,

    /// Vertex array and buffer for [`draw_streamed`](Self::draw_streamed).
    stream_vao: glow::VertexArray,
    stream_vbo: glow::Buffer,

    offscreen: OffscreenTarget,
    quad: CompositeQuad,
}

impl StrokeRenderer {
    /// Create a renderer with an offscreen target of `width` x `height`.
    ///
    /// Compiles both shader programs, builds the circle template, and
    /// allocates the offscreen target and compositing quad.
    ///
    /// # Safety
    ///
    /// The `gl` context must be current and valid. The caller must ensure
    /// that [`destroy`](Self::destroy) is called before the context is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidConfiguration`] for invalid settings or
    /// a zero dimension,
    /// and [`StrokeError::ResourceInitialization`] if shader compilation or
    /// GL resource creation fails. The caller decides whether to continue
    /// without strokes.
    pub unsafe fn new(
        gl: Arc<glow::Context>,
        settings: StrokeSettings,
        [width, height]: [u32; 2],
    ) -> Result<Self> {
        settings.validate()?;
        validate_target_size(width, height)?;
        let meshes = MeshBuilder::new(&settings)?;

        let stroke_program = unsafe {
            shaders::compile_program(
                &gl,
                shaders::STROKE_VERTEX_SRC,
                shaders::STROKE_FRAGMENT_SRC,
                &[
                    (shaders::STROKE_POSITION_LOCATION, "a_position"),
                    (shaders::STROKE_EDGE_LOCATION, "a_edge"),
                ],
            )
        }
        .map_err(gpu_error)?;
        let composite_program = unsafe {
            shaders::compile_program(
                &gl,
                shaders::COMPOSITE_VERTEX_SRC,
                shaders::COMPOSITE_FRAGMENT_SRC,
                &[
                    (shaders::QUAD_POSITION_LOCATION, "a_position"),
                    (shaders::QUAD_UV_LOCATION, "a_uv"),
                ],
            )
        }
        .map_err(gpu_error)?;

        let stroke_uniforms = unsafe {
            StrokeUniforms {
                camera: shaders::uniform(&gl, stroke_program, "u_camera").map_err(gpu_error)?,
                scale: shaders::uniform(&gl, stroke_program, "u_scale").map_err(gpu_error)?,
                fill: shaders::uniform(&gl, stroke_program, "u_fill").map_err(gpu_error)?,
                border: shaders::uniform(&gl, stroke_program, "u_border").map_err(gpu_error)?,
                border_width: shaders::uniform(&gl, stroke_program, "u_border_width")
                    .map_err(gpu_error)?,
            }
        };
        let composite_uniforms = unsafe {
            CompositeUniforms {
                texture: shaders::uniform(&gl, composite_program, "u_texture")
                    .map_err(gpu_error)?,
            }
        };

        let (stream_vao, stream_vbo) = unsafe {
            let vao = gl.create_vertex_array().map_err(gpu_error)?;
            let vbo = gl.create_buffer().map_err(gpu_error)?;
            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            bind_stroke_attributes(&gl);
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            (vao, vbo)
        };

        let mut offscreen = unsafe { OffscreenTarget::new(&gl) }.map_err(gpu_error)?;
        unsafe { offscreen.resize(&gl, width, height) }.map_err(gpu_error)?;
        let quad = unsafe { CompositeQuad::new(&gl) }.map_err(gpu_error)?;

        tracing::info!(
            width,
            height,
            level_of_detail = settings.level_of_detail,
            radius = settings.radius,
            "stroke renderer initialized"
        );

        Ok(Self {
            gl,
            settings,
            meshes,
            state: PassState::Idle,
            draw_state: DrawState::default(),
            camera: Transform::identity(),
            caller_target: None,
            stroke_program,
            stroke_uniforms,
            composite_program,
            composite_uniforms,
            stream_vao,
            stream_vbo,
            offscreen,
            quad,
        })
    }

    /// Current protocol state.
    #[must_use]
    pub fn state(&self) -> PassState {
        self.state
    }

    /// Settings the renderer was created with.
    #[must_use]
    pub fn settings(&self) -> &StrokeSettings {
        &self.settings
    }

    /// Offscreen target size; `[0, 0]` while the target is unavailable.
    #[must_use]
    pub fn size(&self) -> [u32; 2] {
        self.offscreen.size()
    }

    /// Build a mesh for `curve` with the current template and radius.
    ///
    /// # Errors
    ///
    /// See [`MeshBuilder::build`].
    pub fn build_mesh(&self, curve: &[CurvePoint]) -> Result<StrokeMesh> {
        self.meshes.build(curve)
    }

    /// Change the stroke radius for meshes built from now on.
    ///
    /// # Errors
    ///
    /// See [`MeshBuilder::set_radius`].
    pub fn set_radius(&mut self, radius: f32) -> Result<()> {
        self.meshes.set_radius(radius)
    }

    /// Change the circle template level of detail for meshes built from now
    /// on.
    ///
    /// # Errors
    ///
    /// See [`MeshBuilder::set_level_of_detail`].
    pub fn set_level_of_detail(&mut self, segments: u32) -> Result<()> {
        self.meshes.set_level_of_detail(segments)
    }

    /// Recreate the offscreen attachments for a new viewport size.
    ///
    /// A zero dimension is rejected up front and the current target is kept.
    /// If allocation fails the renderer stays usable but skips all stroke
    /// drawing until a later resize succeeds.
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidState`] while a pass is open,
    /// [`StrokeError::InvalidConfiguration`] for a zero dimension, and
    /// [`StrokeError::ResourceInitialization`] if allocation fails.
    pub unsafe fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.state.require_idle("resize")?;
        validate_target_size(width, height)?;
        if self.offscreen.is_complete() && self.offscreen.size() == [width, height] {
            return Ok(());
        }

        unsafe { self.offscreen.resize(&self.gl, width, height) }.map_err(|e| {
            if !self.offscreen.is_complete() {
                tracing::warn!("stroke drawing disabled until the next successful resize");
            }
            gpu_error(e)
        })?;
        tracing::info!(width, height, "stroke offscreen target reallocated");
        Ok(())
    }

    /// Open the offscreen pass.
    ///
    /// See the [pass contract](Self#pass-contract) for the GL state left behind.
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidState`] if a pass is already open.
    pub unsafe fn begin(&mut self) -> Result<()> {
        self.state.begin()?;

        if !self.offscreen.is_complete() {
            tracing::warn!("offscreen target unavailable; skipping stroke pass");
            return Ok(());
        }

        let gl = &self.gl;
        let [w, h] = self.offscreen.viewport();

        unsafe {
            let framebuffer = gl.get_parameter_framebuffer(glow::DRAW_FRAMEBUFFER_BINDING);
            let mut viewport = [0; 4];
            gl.get_parameter_i32_slice(glow::VIEWPORT, &mut viewport);
            self.caller_target = Some(CallerTarget {
                framebuffer,
                viewport,
            });

            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, Some(self.offscreen.framebuffer()));
            gl.viewport(0, 0, w, h);

            gl.disable(glow::BLEND);
            gl.enable(glow::DEPTH_TEST);
            gl.depth_func(glow::LEQUAL);
            gl.depth_mask(true);

            gl.clear_color(0.0, 0.0, 0.0, 0.0);
            gl.clear_depth_f32(1.0);
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);

            gl.use_program(Some(self.stroke_program));
            self.upload_camera();
            self.upload_draw_state();
        }

        Ok(())
    }

    /// Set fill and border colors for subsequent draws.
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidState`] outside a pass.
    pub unsafe fn set_color(&mut self, fill: Color, border: Color) -> Result<()> {
        self.state.require_recording("set color")?;
        self.draw_state.set_color(fill, border, &self.settings);
        if self.caller_target.is_some() {
            unsafe { self.upload_draw_state() };
        }
        Ok(())
    }

    /// Set the uniform mesh scale for subsequent draws.
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidState`] outside a pass.
    pub unsafe fn set_scale(&mut self, scale: f32) -> Result<()> {
        self.state.require_recording("set scale")?;
        self.draw_state.scale = scale;
        if self.caller_target.is_some() {
            unsafe { self.upload_draw_state() };
        }
        Ok(())
    }

    /// Replace the camera transform.
    ///
    /// Allowed at any time. Inside a pass the uniform is re-uploaded
    /// immediately; otherwise it is uploaded by the next
    /// [`begin`](Self::begin).
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    pub unsafe fn set_camera(&mut self, camera: Transform) {
        self.camera = camera;
        if self.caller_target.is_some() {
            // The stroke program is bound for the whole pass.
            unsafe { self.upload_camera() };
        }
    }

    /// Upload a mesh so it can be drawn every frame without re-uploading.
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::ResourceInitialization`] if the buffers cannot
    /// be created, and [`StrokeError::InvalidConfiguration`] if the mesh has
    /// more vertices than GL can address in one draw.
    pub unsafe fn upload_mesh(&self, mesh: &StrokeMesh) -> Result<UploadedMesh> {
        let vertex_count = i32::try_from(mesh.len()).map_err(|_| {
            StrokeError::InvalidConfiguration(format!("mesh of {} vertices is too large", mesh.len()))
        })?;
        let gl = &self.gl;

        let (vao, vbo) = unsafe {
            let vao = gl.create_vertex_array().map_err(gpu_error)?;
            let vbo = match gl.create_buffer() {
                Ok(vbo) => vbo,
                Err(e) => {
                    gl.delete_vertex_array(vao);
                    return Err(gpu_error(e));
                }
            };
            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(mesh.vertices()),
                glow::STATIC_DRAW,
            );
            bind_stroke_attributes(gl);
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            (vao, vbo)
        };

        tracing::debug!(
            vertices = mesh.len(),
            stamps = mesh.stamp_count(),
            "uploaded stroke mesh"
        );

        Ok(UploadedMesh {
            vao,
            vbo,
            vertex_count,
            template_generation: mesh.template_generation(),
        })
    }

    /// Free an uploaded mesh.
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    pub unsafe fn release_mesh(&self, mesh: UploadedMesh) {
        tracing::debug!(vertices = mesh.vertex_count, "released stroke mesh");
        unsafe {
            self.gl.delete_vertex_array(mesh.vao);
            self.gl.delete_buffer(mesh.vbo);
        }
    }

    /// Draw an uploaded mesh into the offscreen target.
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidState`] outside a pass.
    pub unsafe fn draw(&self, mesh: &UploadedMesh) -> Result<()> {
        self.state.require_recording("draw")?;
        if mesh.is_empty() || self.caller_target.is_none() {
            return Ok(());
        }

        let gl = &self.gl;
        unsafe {
            gl.bind_vertex_array(Some(mesh.vao));
            gl.draw_arrays(glow::TRIANGLES, 0, mesh.vertex_count);
            gl.bind_vertex_array(None);
        }
        Ok(())
    }

    /// Draw a CPU-side mesh by streaming it through a shared buffer.
    ///
    /// Suited to strokes drawn once; use [`upload_mesh`](Self::upload_mesh)
    /// for strokes drawn every frame.
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidState`] outside a pass and
    /// [`StrokeError::InvalidConfiguration`] if the mesh is too large for
    /// one draw.
    pub unsafe fn draw_streamed(&self, mesh: &StrokeMesh) -> Result<()> {
        self.state.require_recording("draw")?;
        if mesh.is_empty() || self.caller_target.is_none() {
            return Ok(());
        }
        let vertex_count = i32::try_from(mesh.len()).map_err(|_| {
            StrokeError::InvalidConfiguration(format!("mesh of {} vertices is too large", mesh.len()))
        })?;

        let gl = &self.gl;
        unsafe {
            gl.bind_vertex_array(Some(self.stream_vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.stream_vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(mesh.vertices()),
                glow::STREAM_DRAW,
            );
            gl.draw_arrays(glow::TRIANGLES, 0, vertex_count);
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
        Ok(())
    }

    /// Close the pass and composite the offscreen image onto the caller's
    /// framebuffer.
    ///
    /// See the [pass contract](Self#pass-contract) for the GL state left behind.
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidState`] if no pass is open.
    pub unsafe fn end(&mut self) -> Result<()> {
        self.state.end()?;
        let Some(caller) = self.caller_target.take() else {
            return Ok(());
        };

        tracing::trace!("compositing stroke pass");
        let gl = &self.gl;
        let [x, y, w, h] = caller.viewport;

        unsafe {
            gl.use_program(None);
            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, caller.framebuffer);
            gl.viewport(x, y, w, h);

            gl.disable(glow::DEPTH_TEST);
            gl.depth_mask(false);
            gl.enable(glow::BLEND);
            gl.blend_equation(glow::FUNC_ADD);
            gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);

            let caller_unit = texture_unit(gl.get_parameter_i32(glow::ACTIVE_TEXTURE));
            gl.active_texture(glow::TEXTURE0);
            let caller_texture = gl.get_parameter_texture(glow::TEXTURE_BINDING_2D);

            gl.use_program(Some(self.composite_program));
            gl.bind_texture(glow::TEXTURE_2D, self.offscreen.color_texture());
            gl.uniform_1_i32(Some(&self.composite_uniforms.texture), 0);
            self.quad.draw(gl);
            gl.use_program(None);

            gl.bind_texture(glow::TEXTURE_2D, caller_texture);
            gl.active_texture(caller_unit);

            gl.blend_func(glow::ONE, glow::ONE_MINUS_SRC_ALPHA);
        }

        Ok(())
    }

    /// Read the offscreen color attachment back into an image, top row
    /// first.
    ///
    /// Holds the strokes of the last completed pass until the next
    /// [`begin`](Self::begin).
    ///
    /// # Safety
    ///
    /// Requires the context passed to [`new`](Self::new) to be current.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidState`] inside a pass and
    /// [`StrokeError::ResourceInitialization`] if the target is unavailable.
    pub unsafe fn read_offscreen(&self) -> Result<RgbaImage> {
        self.state.require_idle("read offscreen")?;
        if !self.offscreen.is_complete() {
            return Err(StrokeError::ResourceInitialization(
                "offscreen target unavailable".to_owned(),
            ));
        }

        let [width, height] = self.offscreen.size();
        let [w, h] = self.offscreen.viewport();
        let mut pixels = vec![0_u8; width as usize * height as usize * 4];
        let gl = &self.gl;

        unsafe {
            let previous = gl.get_parameter_framebuffer(glow::READ_FRAMEBUFFER_BINDING);
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(self.offscreen.framebuffer()));
            gl.read_pixels(
                0,
                0,
                w,
                h,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                PixelPackData::Slice(Some(&mut pixels)),
            );
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, previous);
        }

        let mut image = RgbaImage::from_raw(width, height, pixels).ok_or_else(|| {
            StrokeError::ResourceInitialization("readback size mismatch".to_owned())
        })?;
        // GL rows run bottom-up.
        image::imageops::flip_vertical_in_place(&mut image);
        Ok(image)
    }

    /// Upload the camera uniform. The stroke program must be bound.
    unsafe fn upload_camera(&self) {
        unsafe {
            self.gl.uniform_matrix_4_f32_slice(
                Some(&self.stroke_uniforms.camera),
                false,
                &to_mat4(&self.camera),
            );
        }
    }

    /// Upload scale, colors, and border width. The stroke program must be
    /// bound.
    unsafe fn upload_draw_state(&self) {
        let gl = &self.gl;
        let u = &self.stroke_uniforms;
        let DrawState {
            fill,
            border,
            scale,
        } = self.draw_state;

        unsafe {
            gl.uniform_1_f32(Some(&u.scale), scale);
            gl.uniform_4_f32(Some(&u.fill), fill[0], fill[1], fill[2], fill[3]);
            gl.uniform_4_f32(Some(&u.border), border[0], border[1], border[2], border[3]);
            gl.uniform_1_f32(Some(&u.border_width), self.settings.border_width);
        }
    }

    /// Clean up all GL resources owned by this renderer.
    ///
    /// Meshes from [`upload_mesh`](Self::upload_mesh) are owned by the caller
    /// and must be released separately.
    ///
    /// # Safety
    ///
    /// Must be called with the same GL context that was used to create the
    /// renderer, and must be called exactly once.
    pub unsafe fn destroy(&mut self) {
        let gl = &self.gl;
        unsafe {
            gl.delete_program(self.stroke_program);
            gl.delete_program(self.composite_program);
            gl.delete_vertex_array(self.stream_vao);
            gl.delete_buffer(self.stream_vbo);
            self.quad.destroy(gl);
            self.offscreen.destroy(gl);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_texture_unit_is_restored_verbatim() {
        let unit = i32::try_from(glow::TEXTURE3).unwrap_or_default();
        assert_eq!(texture_unit(unit), glow::TEXTURE3);
    }

    #[test]
    fn invalid_texture_unit_falls_back_to_unit_zero() {
        assert_eq!(texture_unit(-1), glow::TEXTURE0);
        assert_eq!(texture_unit(0), glow::TEXTURE0);
    }
}
