// Protocol messages for painter-relay communication.
//
// Two enums define the full protocol vocabulary:
// - `ClientMessage`: sent by painters to the relay.
// - `ServerMessage`: sent by the relay to painters.
//
// Paint events travel as plain `{x, y, color}` triples in both directions;
// the `origin` tag from the canvas crate is a client-local concept and
// never serialized. Joining is the TCP connection plus `Hello`, answered by
// `Init` (the one-shot full snapshot) or `Rejected`; leaving is `Goodbye`
// or simply dropping the stream.
//
// Colors serialize as `#RRGGBB` strings and unpainted cells as JSON `null`
// (see `eggshell_canvas::Color`), so an `Init` matrix is human-readable on
// the wire.

use eggshell_canvas::Color;
use serde::{Deserialize, Serialize};

use crate::types::PainterId;

/// Messages sent by a painter to the relay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Join the canvas (handshake).
    Hello {
        protocol_version: u32,
        painter_name: String,
    },
    /// Paint one cell.
    Paint { x: usize, y: usize, color: Color },
    /// Painter is leaving gracefully.
    Goodbye,
}

/// Messages sent by the relay to a painter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Handshake accepted: the one-shot full-state snapshot. Sent exactly
    /// once per successful connection, before any `Paint`.
    Init {
        painter_id: PainterId,
        size: usize,
        cells: Vec<Vec<Option<Color>>>,
        painters: Vec<PainterInfo>,
    },
    /// Handshake rejected.
    Rejected { reason: String },
    /// Another painter painted one cell.
    Paint { x: usize, y: usize, color: Color },
    /// A painter connected.
    PainterJoined { painter: PainterInfo },
    /// A painter disconnected.
    PainterLeft { painter_id: PainterId, name: String },
}

/// Public identity of a connected painter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PainterInfo {
    pub id: PainterId,
    pub name: String,
}
