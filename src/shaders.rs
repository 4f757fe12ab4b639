//! GLSL shader sources and compilation helpers.
//!
//! All shaders target GLSL 1.40 (OpenGL 3.1), which is widely supported on
//! desktop platforms.

use glow::HasContext;

/// Attribute location of the stroke vertex position.
pub const STROKE_POSITION_LOCATION: u32 = 0;
/// Attribute location of the stroke vertex edge flag.
pub const STROKE_EDGE_LOCATION: u32 = 1;
/// Attribute location of the compositing quad position.
pub const QUAD_POSITION_LOCATION: u32 = 0;
/// Attribute location of the compositing quad texture coordinate.
pub const QUAD_UV_LOCATION: u32 = 1;

/// Vertex shader for stroke stamps.
///
/// The edge flag doubles as the normalized distance from the stamp center
/// and is written as depth: centers land on the near plane, rims on the far
/// plane, so the depth test keeps whichever stamp's center is closest.
///
/// # Uniforms
///
/// | Name       | Type    | Description                               |
/// |------------|---------|-------------------------------------------|
/// | `u_camera` | `mat4`  | Playfield to normalized device transform  |
/// | `u_scale`  | `float` | Uniform mesh scale applied before camera  |
pub const STROKE_VERTEX_SRC: &str = r"#version 140

in vec2 a_position;
in float a_edge;

uniform mat4 u_camera;
uniform float u_scale;

out float v_dist;

void main() {
    v_dist = a_edge;

    gl_Position = u_camera * vec4(a_position * u_scale, 0.0, 1.0);
    // Map distance [0, 1] onto clip depth [-w, w].
    gl_Position.z = (a_edge * 2.0 - 1.0) * gl_Position.w;
}
";

/// Fragment shader for stroke stamps.
///
/// The outer `u_border_width` fraction of the radius is painted with
/// `u_border`, fading out over the last 2% for antialiasing. The body uses
/// `u_fill`, darkening toward the border. Output is straight alpha; the
/// offscreen pass runs with blending disabled.
///
/// Keep in sync with [`crate::software::shade`].
///
/// # Uniforms
///
/// | Name             | Type    | Description                          |
/// |------------------|---------|--------------------------------------|
/// | `u_fill`         | `vec4`  | Body color                           |
/// | `u_border`       | `vec4`  | Border color                         |
/// | `u_border_width` | `float` | Border band width, fraction of radius |
pub const STROKE_FRAGMENT_SRC: &str = r"#version 140

in float v_dist;

uniform vec4 u_fill;
uniform vec4 u_border;
uniform float u_border_width;

out vec4 frag_color;

const float EDGE_FEATHER = 0.02;
const float BODY_EDGE_SHADE = 0.7;

void main() {
    if (v_dist >= 1.0 - u_border_width) {
        frag_color = u_border;
        frag_color.a *= 1.0 - smoothstep(1.0 - EDGE_FEATHER, 1.0, v_dist);
    } else {
        float t = v_dist / (1.0 - u_border_width);
        frag_color = vec4(u_fill.rgb * mix(1.0, BODY_EDGE_SHADE, t), u_fill.a);
    }
}
";

/// Vertex shader for the compositing quad. Positions are already in
/// normalized device coordinates.
pub const COMPOSITE_VERTEX_SRC: &str = r"#version 140

in vec2 a_position;
in vec2 a_uv;

out vec2 v_uv;

void main() {
    v_uv = a_uv;
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

/// Fragment shader for the compositing quad.
///
/// Passes the offscreen color through unchanged; blending with
/// `SRC_ALPHA, ONE_MINUS_SRC_ALPHA` is configured by the caller.
///
/// # Uniforms
///
/// | Name        | Type        | Description                  |
/// |-------------|-------------|------------------------------|
/// | `u_texture` | `sampler2D` | Offscreen color attachment   |
pub const COMPOSITE_FRAGMENT_SRC: &str = r"#version 140

in vec2 v_uv;

uniform sampler2D u_texture;

out vec4 frag_color;

void main() {
    frag_color = texture(u_texture, v_uv);
}
";

/// Compile a shader program from vertex and fragment source strings,
/// binding each named attribute to its location before linking.
///
/// The compiled shader objects are detached and deleted after successful
/// linking, so only the program handle needs to be cleaned up by the caller.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
///
/// # Errors
///
/// Returns a descriptive error string if shader compilation or program
/// linking fails.
pub unsafe fn compile_program(
    gl: &glow::Context,
    vertex_src: &str,
    fragment_src: &str,
    attributes: &[(u32, &str)],
) -> Result<glow::Program, String> {
    let program = unsafe { gl.create_program() }?;

    let vs = match unsafe { compile_stage(gl, glow::VERTEX_SHADER, vertex_src) } {
        Ok(vs) => vs,
        Err(e) => {
            unsafe { gl.delete_program(program) };
            return Err(e);
        }
    };
    let fs = match unsafe { compile_stage(gl, glow::FRAGMENT_SHADER, fragment_src) } {
        Ok(fs) => fs,
        Err(e) => {
            unsafe {
                gl.delete_shader(vs);
                gl.delete_program(program);
            }
            return Err(e);
        }
    };

    unsafe {
        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        for &(location, name) in attributes {
            gl.bind_attrib_location(program, location, name);
        }
        gl.link_program(program);

        if !gl.get_program_link_status(program) {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            return Err(format!("shader program failed to link: {}", log.trim()));
        }

        gl.detach_shader(program, vs);
        gl.detach_shader(program, fs);
        gl.delete_shader(vs);
        gl.delete_shader(fs);
    }

    Ok(program)
}

/// Look up a uniform that the shader source is known to declare.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
///
/// # Errors
///
/// Returns an error naming the uniform if the driver does not report it.
pub unsafe fn uniform(
    gl: &glow::Context,
    program: glow::Program,
    name: &str,
) -> Result<glow::UniformLocation, String> {
    unsafe { gl.get_uniform_location(program, name) }
        .ok_or_else(|| format!("uniform {name} missing from shader program"))
}

fn stage_name(stage: u32) -> &'static str {
    match stage {
        glow::VERTEX_SHADER => "vertex",
        glow::FRAGMENT_SHADER => "fragment",
        _ => "unknown",
    }
}

/// Compile one stage. The error names the stage and carries the trimmed
/// driver log.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
unsafe fn compile_stage(gl: &glow::Context, stage: u32, source: &str) -> Result<glow::Shader, String> {
    let shader = unsafe { gl.create_shader(stage) }?;
    let compiled = unsafe {
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        gl.get_shader_compile_status(shader)
    };
    if compiled {
        return Ok(shader);
    }

    let log = unsafe { gl.get_shader_info_log(shader) };
    unsafe { gl.delete_shader(shader) };
    Err(format!("{} shader failed to compile: {}", stage_name(stage), log.trim()))
}
