// Core ID types for the canvas protocol.
//
// The relay assigns each connection a compact integer ID. It identifies a
// painter only for the lifetime of one connection; reconnecting yields a
// fresh ID and a fresh snapshot.

use serde::{Deserialize, Serialize};

/// Protocol version spoken in the `Hello` handshake.
pub const PROTOCOL_VERSION: u32 = 1;

/// Relay-assigned painter ID (per-connection, not persistent).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PainterId(pub u32);
