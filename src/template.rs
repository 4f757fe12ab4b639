//! Circle template generation and caching.
//!
//! A template is a unit disc split into `segments` wedges. Every wedge is
//! stored as two triangles: the filled wedge `(rim, center, rim)` followed by
//! a zero-area triangle made of three center vertices. The fixed six-vertex
//! stride gives wedge `k` the slice `[6k, 6k + 6)`.
//!
//! The degenerate triangle rasterizes nothing.

use std::f32::consts::TAU;
use std::sync::Arc;

use crate::error::Result;
use crate::settings::validate_level_of_detail;
use crate::types::StrokeVertex;

/// Vertices emitted per wedge.
pub const VERTICES_PER_WEDGE: usize = 6;

/// A triangulated unit disc.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleTemplate {
    segments: u32,
    generation: u64,
    vertices: Vec<StrokeVertex>,
}

impl CircleTemplate {
    /// Build a template with `segments` wedges.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidConfiguration`] if `segments` is zero.
    ///
    /// [`StrokeError::InvalidConfiguration`]: crate::StrokeError::InvalidConfiguration
    pub fn build(segments: u32) -> Result<Self> {
        validate_level_of_detail(segments)?;

        #[expect(clippy::cast_precision_loss)]
        let rim = |i: u32| {
            let angle = i as f32 / segments as f32 * TAU;
            StrokeVertex::rim(angle.cos(), angle.sin())
        };

        let mut vertices = Vec::with_capacity(segments as usize * VERTICES_PER_WEDGE);
        for i in 0..segments {
            let p1 = rim(i);
            // The last wedge closes onto the first rim sample exactly.
            let p2 = if i + 1 == segments { rim(0) } else { rim(i + 1) };
            let c = StrokeVertex::CENTER;
            vertices.extend_from_slice(&[p1, c, p2, c, c, c]);
        }

        Ok(Self {
            segments,
            generation: 0,
            vertices,
        })
    }

    /// Number of wedges.
    #[must_use]
    pub fn segments(&self) -> u32 {
        self.segments
    }

    /// Cache generation this template was stamped with. Templates built
    /// outside a [`TemplateCache`] have generation `0`.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Template vertices, three per triangle.
    #[must_use]
    pub fn vertices(&self) -> &[StrokeVertex] {
        &self.vertices
    }

    /// Number of vertices, always `6 * segments`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Templates always hold at least one wedge.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Holds the current circle template and rebuilds it only when the requested
/// level of detail changes.
///
/// Every rebuild bumps the generation. A new template is fully built before
/// it replaces the old one, and callers holding the previous [`Arc`] keep a
/// consistent copy.
#[derive(Debug, Default)]
pub struct TemplateCache {
    current: Option<Arc<CircleTemplate>>,
    generation: u64,
}

impl TemplateCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the template for `segments`, building it if the cached one has
    /// a different segment count or none exists yet.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidConfiguration`] if `segments` is zero.
    /// The cached template is left in place.
    ///
    /// [`StrokeError::InvalidConfiguration`]: crate::StrokeError::InvalidConfiguration
    pub fn ensure(&mut self, segments: u32) -> Result<Arc<CircleTemplate>> {
        if let Some(current) = &self.current {
            if current.segments == segments {
                return Ok(Arc::clone(current));
            }
        }

        let mut template = CircleTemplate::build(segments)?;
        self.generation += 1;
        template.generation = self.generation;
        tracing::debug!(
            segments,
            generation = self.generation,
            vertices = template.len(),
            "rebuilt circle template"
        );

        let template = Arc::new(template);
        self.current = Some(Arc::clone(&template));
        Ok(template)
    }

    /// The cached template, if any.
    #[must_use]
    pub fn current(&self) -> Option<&Arc<CircleTemplate>> {
        self.current.as_ref()
    }

    /// Number of rebuilds performed so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::StrokeError;

    fn radius(v: &StrokeVertex) -> f32 {
        v.position[0].hypot(v.position[1])
    }

    #[test]
    fn vertex_count_is_six_per_segment() {
        for segments in [1, 2, 3, 4, 7, 30, 128] {
            let template = CircleTemplate::build(segments).unwrap();
            assert_eq!(template.len(), 6 * segments as usize);
            assert_eq!(template.segments(), segments);
        }
    }

    #[test]
    fn vertices_are_center_or_unit_rim() {
        let template = CircleTemplate::build(17).unwrap();
        for v in template.vertices() {
            assert!(v.edge == 0.0 || v.edge == 1.0);
            if v.is_edge() {
                assert!((radius(v) - 1.0).abs() < 1e-5, "rim vertex {v:?}");
            } else {
                assert_eq!(v.position, [0.0, 0.0]);
            }
        }
    }

    #[test]
    fn wedges_follow_the_fixed_layout() {
        let template = CircleTemplate::build(4).unwrap();
        for wedge in template.vertices().chunks_exact(VERTICES_PER_WEDGE) {
            assert!(wedge[0].is_edge());
            assert_eq!(wedge[1], StrokeVertex::CENTER);
            assert!(wedge[2].is_edge());
            assert!(wedge[3..].iter().all(|v| *v == StrokeVertex::CENTER));
        }
    }

    #[test]
    fn wedges_chain_around_the_circle_and_close() {
        let template = CircleTemplate::build(8).unwrap();
        let wedges: Vec<_> = template.vertices().chunks_exact(VERTICES_PER_WEDGE).collect();
        for pair in wedges.windows(2) {
            assert_eq!(pair[0][2], pair[1][0]);
        }
        assert_eq!(wedges[wedges.len() - 1][2], wedges[0][0]);
        assert_eq!(wedges[0][0].position, [1.0, 0.0]);
    }

    #[test]
    fn four_segments_hit_the_axes() {
        let template = CircleTemplate::build(4).unwrap();
        let rims: Vec<_> = template
            .vertices()
            .chunks_exact(VERTICES_PER_WEDGE)
            .map(|w| w[0].position)
            .collect();
        let expected = [[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], [0.0, -1.0]];
        for (actual, expected) in rims.iter().zip(expected) {
            assert!((actual[0] - expected[0]).abs() < 1e-6);
            assert!((actual[1] - expected[1]).abs() < 1e-6);
        }
    }

    #[test]
    fn zero_segments_is_invalid() {
        assert!(matches!(
            CircleTemplate::build(0),
            Err(StrokeError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn cache_reuses_matching_template() {
        let mut cache = TemplateCache::new();
        let a = cache.ensure(12).unwrap();
        let b = cache.ensure(12).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.generation(), 1);
        assert_eq!(a.generation(), 1);
    }

    #[test]
    fn cache_replaces_template_on_new_lod() {
        let mut cache = TemplateCache::new();
        let low = cache.ensure(4).unwrap();
        let high = cache.ensure(16).unwrap();
        assert_eq!(high.len(), 96);
        assert_eq!(high.generation(), 2);
        assert!(Arc::ptr_eq(cache.current().unwrap(), &high));
        // Holders of the old template still see a complete one.
        assert_eq!(low.len(), 24);
    }

    #[test]
    fn cache_keeps_template_after_invalid_request() {
        let mut cache = TemplateCache::new();
        let template = cache.ensure(6).unwrap();
        assert!(cache.ensure(0).is_err());
        assert!(Arc::ptr_eq(cache.current().unwrap(), &template));
        assert_eq!(cache.generation(), 1);
    }
}
