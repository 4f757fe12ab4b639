//! RGBA color helpers.
//!
//! Colors are straight (non-premultiplied) linear RGBA in `[0, 1]`, the same
//! `[f32; 4]` layout that is uploaded to shader uniforms.

/// Straight-alpha RGBA color.
pub type Color = [f32; 4];

/// Rotate the hue of `color` by `degrees`, keeping saturation, value, and
/// alpha.
///
/// Used to derive a border color from the fill color when a custom border
/// gradient offset is configured.
#[must_use]
pub fn shift_hue(color: Color, degrees: f32) -> Color {
    let [r, g, b, a] = color;
    let (h, s, v) = rgb_to_hsv(r, g, b);
    let [r, g, b] = hsv_to_rgb((h + degrees).rem_euclid(360.0), s, v);
    [r, g, b, a]
}

/// Returns hue in degrees `[0, 360)`, saturation and value in `[0, 1]`.
fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta <= 0.0 {
        0.0
    } else if (max - r).abs() <= f32::EPSILON {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if (max - g).abs() <= f32::EPSILON {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let s = if max <= 0.0 { 0.0 } else { delta / max };

    (h, s, max)
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [f32; 3] {
    let c = v * s;
    let sector = h / 60.0;
    let x = c * (1.0 - (sector.rem_euclid(2.0) - 1.0).abs());
    let m = v - c;

    // `sector` is in [0, 6); truncation picks the hue sextant.
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (r, g, b) = match sector as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    [r + m, g + m, b + m]
}
