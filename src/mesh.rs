//! Stamped stroke meshes.
//!
//! A stroke is drawn as one full circle template per curve sample, scaled to
//! the stroke radius and translated onto the sample. Overlapping stamps give
//! the stroke its thickness and round caps and joins without any offset
//! geometry.

use std::sync::Arc;

use lyon::math::{point, Box2D};

use crate::error::Result;
use crate::settings::{validate_radius, StrokeSettings};
use crate::template::{CircleTemplate, TemplateCache};
use crate::types::{CurvePoint, StrokeVertex};

/// Vertex data for a whole stroke, ready for upload.
///
/// Stamp `i` occupies `vertices()[i * stamp_len() .. (i + 1) * stamp_len()]`.
/// Cloning is cheap; the vertex buffer is shared.
#[derive(Clone, Debug)]
pub struct StrokeMesh {
    vertices: Arc<Vec<StrokeVertex>>,
    stamp_len: usize,
    template_generation: u64,
}

impl StrokeMesh {
    /// All vertices, in curve order then template order.
    #[must_use]
    pub fn vertices(&self) -> &[StrokeVertex] {
        &self.vertices
    }

    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Whether the mesh has no vertices (built from an empty curve).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Vertices per stamp, equal to the template length.
    #[must_use]
    pub fn stamp_len(&self) -> usize {
        self.stamp_len
    }

    /// Number of stamps, equal to the number of curve points.
    #[must_use]
    pub fn stamp_count(&self) -> usize {
        self.vertices.len() / self.stamp_len
    }

    /// The vertices of stamp `index`, or `None` past the end.
    #[must_use]
    pub fn stamp(&self, index: usize) -> Option<&[StrokeVertex]> {
        let start = index.checked_mul(self.stamp_len)?;
        let end = start.checked_add(self.stamp_len)?;
        self.vertices.get(start..end)
    }

    /// Generation of the template the mesh was stamped from.
    #[must_use]
    pub fn template_generation(&self) -> u64 {
        self.template_generation
    }

    /// Axis-aligned bounds of all vertices, `None` for an empty mesh.
    #[must_use]
    pub fn bounds(&self) -> Option<Box2D> {
        if self.vertices.is_empty() {
            return None;
        }
        Some(Box2D::from_points(
            self.vertices
                .iter()
                .map(|v| point(v.position[0], v.position[1])),
        ))
    }
}

/// Stamp `template`, scaled by `radius`, at every point of `curve`.
///
/// Only positions are scaled and translated; edge flags are copied as-is. An
/// empty curve yields an empty mesh.
///
/// # Errors
///
/// Returns [`StrokeError::InvalidConfiguration`] if `radius` is not positive
/// and finite.
///
/// [`StrokeError::InvalidConfiguration`]: crate::StrokeError::InvalidConfiguration
pub fn build_stroke_mesh(
    curve: &[CurvePoint],
    radius: f32,
    template: &CircleTemplate,
) -> Result<StrokeMesh> {
    validate_radius(radius)?;

    let mut vertices = Vec::with_capacity(curve.len() * template.len());
    for p in curve {
        vertices.extend(template.vertices().iter().map(|v| StrokeVertex {
            position: [
                v.position[0] * radius + p.x,
                v.position[1] * radius + p.y,
            ],
            edge: v.edge,
        }));
    }

    Ok(StrokeMesh {
        vertices: Arc::new(vertices),
        stamp_len: template.len(),
        template_generation: template.generation(),
    })
}

/// Owns the circle template cache and the current stroke radius.
#[derive(Debug)]
pub struct MeshBuilder {
    templates: TemplateCache,
    template: Arc<CircleTemplate>,
    radius: f32,
}

impl MeshBuilder {
    /// Create a builder for the template level of detail and radius in
    /// `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidConfiguration`] for a zero level of
    /// detail or a non-positive radius.
    ///
    /// [`StrokeError::InvalidConfiguration`]: crate::StrokeError::InvalidConfiguration
    pub fn new(settings: &StrokeSettings) -> Result<Self> {
        validate_radius(settings.radius)?;
        let mut templates = TemplateCache::new();
        let template = templates.ensure(settings.level_of_detail)?;
        Ok(Self {
            templates,
            template,
            radius: settings.radius,
        })
    }

    /// Switch the template level of detail. A no-op if unchanged.
    ///
    /// Meshes built earlier keep the old template's geometry.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidConfiguration`] if `segments` is zero;
    /// the current template is kept.
    ///
    /// [`StrokeError::InvalidConfiguration`]: crate::StrokeError::InvalidConfiguration
    pub fn set_level_of_detail(&mut self, segments: u32) -> Result<()> {
        self.template = self.templates.ensure(segments)?;
        Ok(())
    }

    /// Change the stroke radius for subsequently built meshes.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidConfiguration`] if `radius` is not
    /// positive and finite; the current radius is kept.
    ///
    /// [`StrokeError::InvalidConfiguration`]: crate::StrokeError::InvalidConfiguration
    pub fn set_radius(&mut self, radius: f32) -> Result<()> {
        validate_radius(radius)?;
        self.radius = radius;
        Ok(())
    }

    /// Current stroke radius.
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Current circle template.
    #[must_use]
    pub fn template(&self) -> &Arc<CircleTemplate> {
        &self.template
    }

    /// Build the mesh for `curve` with the current template and radius.
    ///
    /// The radius was validated when it was set, so this only fails if
    /// [`build_stroke_mesh`] does.
    ///
    /// # Errors
    ///
    /// See [`build_stroke_mesh`].
    pub fn build(&self, curve: &[CurvePoint]) -> Result<StrokeMesh> {
        build_stroke_mesh(curve, self.radius, &self.template)
    }
}
