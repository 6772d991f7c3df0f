// eggshell_audio — turning the canvas into sound.
//
// Three layers, loosely coupled:
// - `mapping.rs`:   Stateless color → tone math. Hue picks the frequency,
//                   brightness picks the gain; averaging and prevalence
//                   helpers summarize a whole matrix.
// - `sequencer.rs`: The melody sequencer — a pure, double-buffered `Melody`
//                   core plus a driver thread that schedules one pass at a
//                   time into a `ToneSink`.
// - `synth.rs`:     The cpal-backed sink: an `AudioContext` with an explicit
//                   init/shutdown lifecycle mixing delayed-start sine
//                   voices, plus sustained drone voices.
//
// The sequencer never validates frequencies or gains; `mapping.rs` is the
// contract-keeper that only ever produces values inside the configured
// ranges. Feeding the sequencer by hand means keeping that promise by hand.

pub mod mapping;
pub mod sequencer;
pub mod synth;

pub use mapping::{
    F_MAX, F_MIN, G_MAX, G_MIN, Tone, average_tone, color_to_tone, grid_melody,
    most_prevalent_color,
};
pub use sequencer::{DEFAULT_NOTE_SPACING, Melody, PlaybackState, Sequencer, ToneSink};
pub use synth::{AudioContext, DroneHandle, SynthSink};
