// Procedural wave pattern: the "reset to pattern" fill.
//
// For each paintable cell, a sin/cos interference value picks a blend point
// between two base colors. The fill is fully deterministic for a fixed base
// pair and mask; only the base-color choice draws on the RNG.

use crate::color::Color;
use crate::rng::CanvasRng;

/// Spatial frequency of the interference waves, in radians per cell.
pub const WAVE_FREQUENCY: f64 = 0.2;

/// Amplitude applied to `sin(x·f) + cos(y·f)` before normalizing.
pub const WAVE_AMPLITUDE: f64 = 0.5;

/// Pick two random base colors for a pattern fill.
pub fn random_base_colors(rng: &mut CanvasRng) -> (Color, Color) {
    let color = |rng: &mut CanvasRng| {
        Color::new(rng.next_channel(), rng.next_channel(), rng.next_channel())
    };
    (color(rng), color(rng))
}

/// Compute the wave-pattern fill for a mask.
///
/// Paintable cells get `base_a.lerp(base_b, t)` where
/// `t = ((sin(x·f) + cos(y·f)) · amplitude + 1) / 2`; unpaintable cells stay
/// `None`. Same bases + same mask ⇒ same matrix, always.
pub fn wave_pattern(mask: &[Vec<bool>], base_a: Color, base_b: Color) -> Vec<Vec<Option<Color>>> {
    mask.iter()
        .enumerate()
        .map(|(y, row)| {
            row.iter()
                .enumerate()
                .map(|(x, &paintable)| {
                    if !paintable {
                        return None;
                    }
                    #[expect(clippy::cast_precision_loss)]
                    let wave = ((x as f64 * WAVE_FREQUENCY).sin()
                        + (y as f64 * WAVE_FREQUENCY).cos())
                        * WAVE_AMPLITUDE;
                    // wave is in [-1, 1]; normalize to [0, 1].
                    #[expect(clippy::cast_possible_truncation)]
                    let t = ((wave + 1.0) / 2.0) as f32;
                    Some(base_a.lerp(base_b, t))
                })
                .collect()
        })
        .collect()
}
