// eggshell_protocol — wire protocol for canvas relay communication.
//
// This crate defines the message types and framing used by the relay
// coordinator (`eggshell_relay`) and painter clients to communicate over
// TCP. It is shared between both sides and has no networking code of its
// own.
//
// Module overview:
// - `types.rs`:   `PainterId` and the protocol version constant.
// - `message.rs`: Painter-to-relay and relay-to-painter message enums, plus
//                 `PainterInfo`.
// - `framing.rs`: Length-delimited framing over any `Read`/`Write` stream:
//                 4-byte big-endian length prefix, then JSON payload.
//
// Design decisions:
// - **JSON serialization.** Paint traffic is tiny (a coordinate pair and a
//   hex color string per event) and snapshots are rare, so readability wins
//   over density.
// - **Colors from the canvas crate.** `eggshell_canvas::Color` already
//   serializes as `#RRGGBB`; reusing it keeps the relay's matrix and every
//   client's store byte-compatible.
// - **No async runtime.** `std::io::Read`/`Write` framing works with plain
//   blocking TCP streams and buffered wrappers.

pub mod framing;
pub mod message;
pub mod types;

pub use framing::{MAX_MESSAGE_SIZE, read_frame, write_frame};
pub use message::{ClientMessage, PainterInfo, ServerMessage};
pub use types::{PROTOCOL_VERSION, PainterId};
