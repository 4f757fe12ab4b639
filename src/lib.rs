//! Thick, round, antialiased slider strokes for rhythm game overlays.
//!
//! A slider curve arrives as a polyline of sample points. Every sample is
//! stamped with a full disc from a shared [`CircleTemplate`], producing one
//! [`StrokeMesh`] per slider at load time. Each frame, the stamps are drawn
//! into an offscreen target with blending disabled and a depth test that
//! keeps the fragment nearest any stamp center, then the finished image is
//! alpha-blended onto the screen in a single pass. Overlapping stamps never
//! double-blend.
//!
//! # Features
//!
//! - **`glow`** (default): [`StrokeRenderer`], the OpenGL implementation via
//!   [glow].
//! - [`SoftwareRenderer`] is always available. It rasterizes the same
//!   algorithm on the CPU into [`image`] buffers, for headless use and
//!   testing.
//!
//! # Safety
//!
//! Creating and using a [`StrokeRenderer`] requires a valid, current OpenGL
//! context. Its rendering methods are `unsafe` because they issue raw GL
//! calls.
//!
//! [glow]: https://docs.rs/glow
//! [`image`]: https://docs.rs/image

mod color;
mod error;
#[cfg(feature = "glow")]
mod framebuffer;
mod mesh;
#[cfg(feature = "glow")]
mod render;
mod settings;
#[cfg(feature = "glow")]
mod shaders;
mod software;
mod state;
mod template;
mod types;

pub use color::{shift_hue, Color};
pub use error::{Result, StrokeError};
pub use mesh::{build_stroke_mesh, MeshBuilder, StrokeMesh};
#[cfg(feature = "glow")]
pub use render::{StrokeRenderer, UploadedMesh};
pub use settings::StrokeSettings;
pub use software::SoftwareRenderer;
pub use state::PassState;
pub use template::{CircleTemplate, TemplateCache};
pub use types::{orthographic, to_mat4, CurvePoint, DrawState, StrokeVertex};
