// eggshell_relay — canvas relay coordinator for Eggshell.
//
// The relay is a thin message broker with one piece of state: the
// authoritative color matrix. It accepts TCP connections from painter
// clients, sends each new painter a full snapshot of the canvas, applies
// incoming paint events to its matrix, and rebroadcasts each event to every
// other painter. It performs no rendering and no audio.
//
// Module overview:
// - `session.rs`: Session state — painter roster, the authoritative matrix,
//                 snapshot-on-join, paint broadcast. The core data structure
//                 that `server.rs` drives.
// - `server.rs`:  TCP listener, reader threads (one per painter), and the
//                 main event loop. Uses `std::net` with a thread-per-reader
//                 architecture and an `mpsc` channel to funnel events into
//                 the single-threaded `Session`.
// - `client.rs`:  `NetClient`, the TCP client side used by the sync channel
//                 and by integration tests.
//
// Dependencies: `eggshell_protocol` (shared message types and framing),
// `eggshell_canvas` (the egg mask the relay validates paints against).
//
// The relay can run as a standalone binary (`main.rs`) or be embedded in
// another process via the library API (`start_relay`).

pub mod client;
pub mod server;
pub mod session;

pub use client::NetClient;
pub use server::start_relay;
