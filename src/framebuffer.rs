//! Offscreen color+depth target and the quad that composites it.

use bytemuck::{Pod, Zeroable};
use glow::{HasContext, PixelUnpackData};

use crate::shaders::{QUAD_POSITION_LOCATION, QUAD_UV_LOCATION};

/// GL internal format for the RGBA8 color attachment, pre-cast to the `i32`
/// that `tex_image_2d` expects.
#[expect(clippy::cast_possible_wrap)]
const RGBA8_INTERNAL_FORMAT: i32 = glow::RGBA8 as i32;

/// Convert a `u32` dimension to the `i32` GL expects.
fn gl_size(value: u32) -> Result<i32, String> {
    i32::try_from(value).map_err(|_| format!("dimension {value} exceeds i32::MAX"))
}

/// Check a requested attachment size and convert it for GL.
fn attachment_size(width: u32, height: u32) -> Result<[i32; 2], String> {
    if width == 0 || height == 0 {
        return Err(format!("offscreen target must be non-empty, got {width}x{height}"));
    }
    Ok([gl_size(width)?, gl_size(height)?])
}

/// A framebuffer with a texture color attachment and a depth renderbuffer,
/// sized to the viewport.
///
/// Attachments are recreated, never reused, whenever the size changes.
pub struct OffscreenTarget {
    fbo: glow::Framebuffer,
    color: Option<glow::Texture>,
    depth: Option<glow::Renderbuffer>,
    size: [u32; 2],
    viewport: [i32; 2],
}

impl OffscreenTarget {
    /// Create the framebuffer object. Attachments are allocated by
    /// [`resize`](Self::resize).
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Returns the driver's message if the framebuffer cannot be created.
    pub unsafe fn new(gl: &glow::Context) -> Result<Self, String> {
        let fbo = unsafe { gl.create_framebuffer() }?;
        Ok(Self {
            fbo,
            color: None,
            depth: None,
            size: [0, 0],
            viewport: [0, 0],
        })
    }

    /// Drop the current attachments and allocate new ones of `width` x
    /// `height`.
    ///
    /// A zero or oversized dimension is rejected before anything is
    /// released. Any later failure leaves the target without attachments
    /// and [`is_complete`](Self::is_complete) returns `false`.
    ///
    /// # Safety
    ///
    /// Requires the context used in [`new`](Self::new) to be current.
    ///
    /// # Errors
    ///
    /// Returns a description of the failure if a dimension is zero or too
    /// large, an attachment cannot be created, or the framebuffer is
    /// incomplete.
    pub unsafe fn resize(&mut self, gl: &glow::Context, width: u32, height: u32) -> Result<(), String> {
        let [w, h] = attachment_size(width, height)?;
        unsafe { self.release_attachments(gl) };

        unsafe {
            let color = gl.create_texture()?;
            self.color = Some(color);
            gl.bind_texture(glow::TEXTURE_2D, Some(color));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                RGBA8_INTERNAL_FORMAT,
                w,
                h,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                PixelUnpackData::Slice(None),
            );
            // GL constant values are small enough that the cast is always safe.
            #[expect(clippy::cast_possible_wrap)]
            {
                gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::NEAREST as i32);
                gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::NEAREST as i32);
                gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
                gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            }
            gl.bind_texture(glow::TEXTURE_2D, None);

            let depth = gl.create_renderbuffer()?;
            self.depth = Some(depth);
            gl.bind_renderbuffer(glow::RENDERBUFFER, Some(depth));
            gl.renderbuffer_storage(glow::RENDERBUFFER, glow::DEPTH_COMPONENT24, w, h);
            gl.bind_renderbuffer(glow::RENDERBUFFER, None);

            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(self.fbo));
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(color),
                0,
            );
            gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::DEPTH_ATTACHMENT,
                glow::RENDERBUFFER,
                Some(depth),
            );
            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);

            if status != glow::FRAMEBUFFER_COMPLETE {
                self.release_attachments(gl);
                return Err(format!("offscreen framebuffer incomplete (status {status:#x})"));
            }
        }

        self.size = [width, height];
        self.viewport = [w, h];
        Ok(())
    }

    /// Whether both attachments are allocated and the framebuffer is usable.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.color.is_some() && self.depth.is_some()
    }

    /// Attachment size in pixels; `[0, 0]` when incomplete.
    #[must_use]
    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// Attachment size as GL viewport dimensions.
    #[must_use]
    pub fn viewport(&self) -> [i32; 2] {
        self.viewport
    }

    /// The framebuffer object.
    #[must_use]
    pub fn framebuffer(&self) -> glow::Framebuffer {
        self.fbo
    }

    /// The color attachment, sampled by the compositing pass.
    #[must_use]
    pub fn color_texture(&self) -> Option<glow::Texture> {
        self.color
    }

    unsafe fn release_attachments(&mut self, gl: &glow::Context) {
        unsafe {
            if let Some(color) = self.color.take() {
                gl.delete_texture(color);
            }
            if let Some(depth) = self.depth.take() {
                gl.delete_renderbuffer(depth);
            }
        }
        self.size = [0, 0];
        self.viewport = [0, 0];
    }

    /// Delete the framebuffer and its attachments.
    ///
    /// # Safety
    ///
    /// Must be called once, with the context used in [`new`](Self::new).
    pub unsafe fn destroy(&mut self, gl: &glow::Context) {
        unsafe {
            self.release_attachments(gl);
            gl.delete_framebuffer(self.fbo);
        }
    }
}

/// A vertex of the compositing quad.
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct QuadVertex {
    /// Position in normalized device coordinates.
    pub position: [f32; 2],
    /// Texture coordinate into the offscreen color attachment.
    pub uv: [f32; 2],
}

const fn quad_vertex(x: f32, y: f32, u: f32, v: f32) -> QuadVertex {
    QuadVertex {
        position: [x, y],
        uv: [u, v],
    }
}

/// Two triangles covering the whole render target.
pub const COMPOSITE_QUAD: [QuadVertex; 6] = [
    quad_vertex(-1.0, -1.0, 0.0, 0.0),
    quad_vertex(1.0, -1.0, 1.0, 0.0),
    quad_vertex(-1.0, 1.0, 0.0, 1.0),
    quad_vertex(1.0, -1.0, 1.0, 0.0),
    quad_vertex(1.0, 1.0, 1.0, 1.0),
    quad_vertex(-1.0, 1.0, 0.0, 1.0),
];

/// GPU copy of [`COMPOSITE_QUAD`], written once at creation.
pub struct CompositeQuad {
    vao: glow::VertexArray,
    vbo: glow::Buffer,
}

impl CompositeQuad {
    /// Upload the quad.
    ///
    /// # Safety
    ///
    /// Requires a valid, current OpenGL context.
    ///
    /// # Errors
    ///
    /// Returns the driver's message if the buffers cannot be created.
    pub unsafe fn new(gl: &glow::Context) -> Result<Self, String> {
        // QuadVertex is 16 bytes, well within i32 range.
        #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let stride = std::mem::size_of::<QuadVertex>() as i32;

        unsafe {
            let vao = gl.create_vertex_array()?;
            let vbo = gl.create_buffer()?;

            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&COMPOSITE_QUAD),
                glow::STATIC_DRAW,
            );
            gl.enable_vertex_attrib_array(QUAD_POSITION_LOCATION);
            gl.vertex_attrib_pointer_f32(QUAD_POSITION_LOCATION, 2, glow::FLOAT, false, stride, 0);
            gl.enable_vertex_attrib_array(QUAD_UV_LOCATION);
            gl.vertex_attrib_pointer_f32(QUAD_UV_LOCATION, 2, glow::FLOAT, false, stride, 8);
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);

            Ok(Self { vao, vbo })
        }
    }

    /// Draw the quad with whatever program and texture are bound.
    ///
    /// # Safety
    ///
    /// Requires the context used in [`new`](Self::new) to be current.
    pub unsafe fn draw(&self, gl: &glow::Context) {
        #[expect(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let count = COMPOSITE_QUAD.len() as i32;
        unsafe {
            gl.bind_vertex_array(Some(self.vao));
            gl.draw_arrays(glow::TRIANGLES, 0, count);
            gl.bind_vertex_array(None);
        }
    }

    /// Delete the quad's buffers.
    ///
    /// # Safety
    ///
    /// Must be called once, with the context used in [`new`](Self::new).
    pub unsafe fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_vertex_array(self.vao);
            gl.delete_buffer(self.vbo);
        }
    }
}
