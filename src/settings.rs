//! Stroke rendering settings.
//!
//! Settings are plain data and can be deserialized from JSON. Any field left
//! out of the document takes its default.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StrokeError};

/// Default circle template segment count.
pub const DEFAULT_LEVEL_OF_DETAIL: u32 = 30;

/// Default stroke radius in playfield units.
pub const DEFAULT_RADIUS: f32 = 23.05;

/// Default fraction of the radius painted with the border color.
pub const DEFAULT_BORDER_WIDTH: f32 = 0.128;

/// Configuration for stroke geometry and shading.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct StrokeSettings {
    /// Number of wedges in the circle template.
    pub level_of_detail: u32,
    /// Stroke radius in playfield units.
    pub radius: f32,
    /// Fraction of the radius, measured inward from the rim, that is painted
    /// with the border color.
    pub border_width: f32,
    /// When set, the border color is derived from the fill color by shifting
    /// its hue by this many degrees instead of using the caller's color.
    pub border_gradient_offset: Option<f32>,
}

impl Default for StrokeSettings {
    fn default() -> Self {
        Self {
            level_of_detail: DEFAULT_LEVEL_OF_DETAIL,
            radius: DEFAULT_RADIUS,
            border_width: DEFAULT_BORDER_WIDTH,
            border_gradient_offset: None,
        }
    }
}

impl StrokeSettings {
    /// Parse settings from a JSON document and validate them.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidConfiguration`] if the document is not
    /// valid JSON for this type or if [`validate`](Self::validate) fails.
    pub fn from_json(src: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(src)
            .map_err(|e| StrokeError::InvalidConfiguration(format!("stroke settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check every field is in range. Values are never clamped.
    ///
    /// # Errors
    ///
    /// Returns [`StrokeError::InvalidConfiguration`] naming the first bad
    /// field.
    pub fn validate(&self) -> Result<()> {
        validate_level_of_detail(self.level_of_detail)?;
        validate_radius(self.radius)?;
        if !(0.0..1.0).contains(&self.border_width) {
            return Err(StrokeError::InvalidConfiguration(format!(
                "border width must be in [0, 1), got {}",
                self.border_width
            )));
        }
        if let Some(offset) = self.border_gradient_offset {
            if !offset.is_finite() {
                return Err(StrokeError::InvalidConfiguration(format!(
                    "border gradient offset must be finite, got {offset}"
                )));
            }
        }
        Ok(())
    }
}

/// Reject a zero segment count.
pub(crate) fn validate_level_of_detail(segments: u32) -> Result<()> {
    if segments == 0 {
        return Err(StrokeError::InvalidConfiguration(
            "circle template needs at least one segment".to_owned(),
        ));
    }
    Ok(())
}

/// Reject a radius that is not a positive finite number.
pub(crate) fn validate_radius(radius: f32) -> Result<()> {
    if !(radius.is_finite() && radius > 0.0) {
        return Err(StrokeError::InvalidConfiguration(format!(
            "stroke radius must be positive and finite, got {radius}"
        )));
    }
    Ok(())
}

/// Reject an offscreen target with a zero dimension.
pub(crate) fn validate_target_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(StrokeError::InvalidConfiguration(format!(
            "offscreen target must be non-empty, got {width}x{height}"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(StrokeSettings::default().validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings = StrokeSettings::from_json(r#"{ "level_of_detail": 12 }"#).unwrap();
        assert_eq!(settings.level_of_detail, 12);
        assert!((settings.radius - DEFAULT_RADIUS).abs() < f32::EPSILON);
        assert_eq!(settings.border_gradient_offset, None);
    }

    #[test]
    fn gradient_offset_round_trips_through_json() {
        let settings = StrokeSettings {
            border_gradient_offset: Some(-40.0),
            ..StrokeSettings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert_eq!(StrokeSettings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn zero_level_of_detail_is_rejected() {
        let err = StrokeSettings::from_json(r#"{ "level_of_detail": 0 }"#).unwrap_err();
        assert!(matches!(err, StrokeError::InvalidConfiguration(_)));
    }

    #[test]
    fn negative_level_of_detail_fails_to_parse() {
        let err = StrokeSettings::from_json(r#"{ "level_of_detail": -4 }"#).unwrap_err();
        assert!(matches!(err, StrokeError::InvalidConfiguration(_)));
    }

    #[test]
    fn non_positive_radius_is_rejected() {
        for radius in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let settings = StrokeSettings {
                radius,
                ..StrokeSettings::default()
            };
            assert!(settings.validate().is_err(), "radius {radius} accepted");
        }
    }

    #[test]
    fn border_width_must_leave_a_body() {
        let settings = StrokeSettings {
            border_width: 1.0,
            ..StrokeSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn empty_target_size_is_rejected() {
        assert!(validate_target_size(1280, 720).is_ok());
        for [w, h] in [[0, 720], [1280, 0], [0, 0]] {
            assert!(matches!(
                validate_target_size(w, h),
                Err(StrokeError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn malformed_json_is_a_configuration_error() {
        let err = StrokeSettings::from_json("{ radius: }").unwrap_err();
        assert!(matches!(err, StrokeError::InvalidConfiguration(_)));
    }
}
