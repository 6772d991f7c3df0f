// eggshell_canvas — canvas data model and pure canvas logic for Eggshell.
//
// This crate owns everything about the shared grid that doesn't touch a
// socket or a speaker: the color type, the egg-shaped paintable mask, the
// paint store that every participant's view funnels through, and the
// procedural pattern fill. It is shared by the relay (authoritative matrix),
// the sync channel (local store), and the audio crate (color extraction).
//
// Module overview:
// - `color.rs`:   `Color` — hex-encoded RGB with HSV extraction and Oklab
//                 interpolation.
// - `mask.rs`:    The fixed ellipse mask deciding which cells are paintable.
// - `store.rs`:   `CanvasStore` — grid ownership, paint application (local,
//                 remote, snapshot), observer notification.
// - `pattern.rs`: Deterministic sin/cos wave fill between two base colors.
// - `rng.rs`:     Small xoshiro256++ generator for base-color choice.
//
// Design decisions:
// - **No rendering here.** The store exposes subscribe/notify hooks; how a
//   cell ends up on a screen is someone else's problem.
// - **All mutation through three entry points.** `paint_local`,
//   `apply_remote`, and `apply_snapshot` are the only ways a cell changes
//   color, which is what makes the origin-tagging rules enforceable.

pub mod color;
pub mod mask;
pub mod pattern;
pub mod rng;
pub mod store;

pub use color::Color;
pub use mask::{DEFAULT_GRID_SIZE, egg_mask};
pub use pattern::{random_base_colors, wave_pattern};
pub use rng::CanvasRng;
pub use store::{CanvasStore, CellChange, Origin, PaintEvent};
