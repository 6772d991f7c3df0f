// Color → tone mapping: the deterministic bridge from visual to audio state.
//
// Hue maps linearly onto a frequency band, HSV value (brightness) onto a
// gain band. The constants are a configuration surface, not invariants —
// but everything this module emits stays inside them, which is the caller
// contract the sequencer relies on.
//
// Degenerate inputs never error: averaging an all-empty matrix yields the
// midpoint of both bands.

use std::time::Duration;

use eggshell_canvas::Color;

/// Lowest frequency a color can map to, in Hz.
pub const F_MIN: f32 = 100.0;
/// Highest frequency a color can map to, in Hz.
pub const F_MAX: f32 = 500.0;
/// Gain of a fully dark color.
pub const G_MIN: f32 = 0.1;
/// Gain of a fully bright color.
pub const G_MAX: f32 = 0.5;

/// Default length of a single scheduled note.
pub const DEFAULT_NOTE_DURATION: Duration = Duration::from_millis(500);

/// A single schedulable unit of sound.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tone {
    pub frequency: f32,
    pub gain: f32,
    pub duration: Duration,
}

impl Tone {
    pub fn new(frequency: f32, gain: f32) -> Self {
        Self {
            frequency,
            gain,
            duration: DEFAULT_NOTE_DURATION,
        }
    }
}

fn map_range(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    (value - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Map one color to a tone: hue `[0, 360)` → `[F_MIN, F_MAX]`, brightness
/// `[0, 1]` → `[G_MIN, G_MAX]`.
pub fn color_to_tone(color: Color) -> Tone {
    let (hue, _, value) = color.hsv();
    Tone::new(
        map_range(hue, 0.0, 360.0, F_MIN, F_MAX),
        map_range(value, 0.0, 1.0, G_MIN, G_MAX),
    )
}

/// Average the hue and brightness of all painted cells, then map. An
/// all-empty matrix yields the midpoint of both bands — a defined default,
/// not an error.
pub fn average_tone(matrix: &[Vec<Option<Color>>]) -> Tone {
    let mut hue_sum = 0.0f32;
    let mut value_sum = 0.0f32;
    let mut count = 0u32;

    for color in matrix.iter().flatten().flatten() {
        let (hue, _, value) = color.hsv();
        hue_sum += hue;
        value_sum += value;
        count += 1;
    }

    if count == 0 {
        return Tone::new((F_MIN + F_MAX) / 2.0, (G_MIN + G_MAX) / 2.0);
    }

    #[expect(clippy::cast_precision_loss)]
    let count = count as f32;
    Tone::new(
        map_range(hue_sum / count, 0.0, 360.0, F_MIN, F_MAX),
        map_range(value_sum / count, 0.0, 1.0, G_MIN, G_MAX),
    )
}

/// The color with the highest occurrence count among painted cells, ties
/// broken by first-seen order. `None` if nothing is painted.
pub fn most_prevalent_color(matrix: &[Vec<Option<Color>>]) -> Option<Color> {
    // First-seen order matters for ties, so count into an order-preserving
    // vec rather than a map; matrices are small.
    let mut counts: Vec<(Color, usize)> = Vec::new();
    for color in matrix.iter().flatten().flatten() {
        match counts.iter_mut().find(|(c, _)| c == color) {
            Some((_, n)) => *n += 1,
            None => counts.push((*color, 1)),
        }
    }
    // Strictly-greater comparison keeps the first-seen color on ties.
    let mut best: Option<(Color, usize)> = None;
    for (color, n) in counts {
        if best.is_none_or(|(_, best_n)| n > best_n) {
            best = Some((color, n));
        }
    }
    best.map(|(color, _)| color)
}

/// The whole canvas as an ordered melody: one tone per painted cell,
/// left-to-right, top-to-bottom. Empty cells contribute nothing.
pub fn grid_melody(matrix: &[Vec<Option<Color>>]) -> Vec<Tone> {
    matrix
        .iter()
        .flatten()
        .flatten()
        .map(|&color| color_to_tone(color))
        .collect()
}
