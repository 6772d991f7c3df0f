// Session state for the relay coordinator.
//
// `Session` is the central data structure that `server.rs` drives. It owns
// the painter roster and the authoritative color matrix. All mutation
// happens through methods called from the server's single-threaded main
// loop — no internal locking.
//
// Key responsibilities:
// - Painter management: add/remove painters, assign IDs, protocol-version
//   check on join, `Init` snapshot to each joiner.
// - Paint application: validate a paint against the canvas bounds and the
//   egg mask, record it in the matrix, and rebroadcast it to every painter
//   except the sender. The matrix resolves conflicts last-write-wins in the
//   order events reach the relay, and it is what late joiners snapshot from.
//
// Writing to painter streams: `Session` holds cloned `TcpStream` write
// halves wrapped in `BufWriter`. Write errors on a single painter are
// ignored rather than propagated — the reader thread for that painter will
// detect the broken pipe and send a `Disconnected` event.

use std::collections::BTreeMap;
use std::io::BufWriter;
use std::net::TcpStream;

use eggshell_canvas::{Color, egg_mask};
use eggshell_protocol::framing::write_frame;
use eggshell_protocol::message::{PainterInfo, ServerMessage};
use eggshell_protocol::types::{PROTOCOL_VERSION, PainterId};

/// Relay session managing a single shared canvas.
pub struct Session {
    pub name: String,
    grid_size: usize,
    mask: Vec<Vec<bool>>,
    cells: Vec<Vec<Option<Color>>>,
    painters: BTreeMap<PainterId, PainterState>,
    next_painter_id: u32,
    max_painters: u32,
}

struct PainterState {
    name: String,
    writer: BufWriter<TcpStream>,
}

impl Session {
    pub fn new(name: String, grid_size: usize, max_painters: u32) -> Self {
        Self {
            name,
            grid_size,
            mask: egg_mask(grid_size),
            cells: vec![vec![None; grid_size]; grid_size],
            painters: BTreeMap::new(),
            next_painter_id: 0,
            max_painters,
        }
    }

    /// Attempt to add a painter. On success the joiner receives an `Init`
    /// snapshot and everyone else a `PainterJoined`; returns the assigned ID.
    /// On failure returns an error reason string.
    ///
    /// The returned `PainterId` should be used to tag the reader thread for
    /// this connection so that subsequent `InternalEvent::MessageFrom`
    /// events carry the correct ID.
    pub fn add_painter(
        &mut self,
        painter_name: String,
        protocol_version: u32,
        stream: TcpStream,
    ) -> Result<PainterId, String> {
        if protocol_version != PROTOCOL_VERSION {
            return Err(format!(
                "protocol version mismatch: relay speaks {PROTOCOL_VERSION}, painter spoke {protocol_version}"
            ));
        }

        if self.painters.len() as u32 >= self.max_painters {
            return Err("canvas is full".into());
        }

        let id = PainterId(self.next_painter_id);
        self.next_painter_id += 1;

        // Painter list for Init (includes the new painter).
        let mut painter_list: Vec<PainterInfo> = self
            .painters
            .iter()
            .map(|(pid, ps)| PainterInfo {
                id: *pid,
                name: ps.name.clone(),
            })
            .collect();
        painter_list.push(PainterInfo {
            id,
            name: painter_name.clone(),
        });

        // Broadcast PainterJoined to existing painters before adding the
        // new one.
        let joined = ServerMessage::PainterJoined {
            painter: PainterInfo {
                id,
                name: painter_name.clone(),
            },
        };
        self.broadcast(&joined);

        self.painters.insert(
            id,
            PainterState {
                name: painter_name,
                writer: BufWriter::new(stream),
            },
        );

        // The one-shot snapshot. This is the only full-state transfer the
        // painter will ever receive on this connection.
        let init = ServerMessage::Init {
            painter_id: id,
            size: self.grid_size,
            cells: self.cells.clone(),
            painters: painter_list,
        };
        self.send_to(id, &init);

        Ok(id)
    }

    /// Remove a painter and broadcast their departure.
    pub fn remove_painter(&mut self, painter_id: PainterId) {
        if let Some(ps) = self.painters.remove(&painter_id) {
            let msg = ServerMessage::PainterLeft {
                painter_id,
                name: ps.name,
            };
            self.broadcast(&msg);
        }
    }

    /// Apply a paint event from a painter: validate against bounds and the
    /// egg mask, record it, and rebroadcast to everyone except the sender.
    /// Invalid targets are silently dropped (the client already enforces the
    /// mask; a mismatch here means a stale or misbehaving client).
    pub fn apply_paint(&mut self, from: PainterId, x: usize, y: usize, color: Color) {
        if y >= self.grid_size || x >= self.grid_size || !self.mask[y][x] {
            log::debug!("dropping paint outside mask from {from:?}: ({x}, {y})");
            return;
        }
        self.cells[y][x] = Some(color);
        self.broadcast_except(from, &ServerMessage::Paint { x, y, color });
    }

    /// Current color of one cell (relay's authoritative view).
    pub fn cell(&self, x: usize, y: usize) -> Option<Color> {
        if y < self.grid_size && x < self.grid_size {
            self.cells[y][x]
        } else {
            None
        }
    }

    /// Number of connected painters.
    pub fn painter_count(&self) -> usize {
        self.painters.len()
    }

    /// Info about all connected painters.
    pub fn painter_list(&self) -> Vec<PainterInfo> {
        self.painters
            .iter()
            .map(|(pid, ps)| PainterInfo {
                id: *pid,
                name: ps.name.clone(),
            })
            .collect()
    }

    /// Send a message to a specific painter. Silently ignores write errors
    /// (the reader thread will detect the broken pipe).
    fn send_to(&mut self, painter_id: PainterId, msg: &ServerMessage) {
        if let Some(ps) = self.painters.get_mut(&painter_id) {
            let _ = send_message(&mut ps.writer, msg);
        }
    }

    /// Broadcast a message to all connected painters.
    fn broadcast(&mut self, msg: &ServerMessage) {
        let ids: Vec<PainterId> = self.painters.keys().copied().collect();
        for id in ids {
            self.send_to(id, msg);
        }
    }

    /// Broadcast to everyone except `skip` — used for paint events so the
    /// originator never sees its own event echoed back.
    fn broadcast_except(&mut self, skip: PainterId, msg: &ServerMessage) {
        let ids: Vec<PainterId> = self.painters.keys().copied().collect();
        for id in ids {
            if id != skip {
                self.send_to(id, msg);
            }
        }
    }
}

/// Serialize a `ServerMessage` to JSON and write it with length-delimited
/// framing. Returns any I/O error (caller decides whether to log or ignore).
fn send_message(
    writer: &mut BufWriter<TcpStream>,
    msg: &ServerMessage,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_vec(msg)?;
    write_frame(writer, &json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::BufReader;
    use std::net::TcpListener;

    use eggshell_protocol::framing::read_frame;

    use super::*;

    const RED: Color = Color::new(255, 0, 0);
    const BLUE: Color = Color::new(0, 0, 255);

    /// Create a TCP pair: (client_stream, server_stream) on localhost.
    fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    /// Read a ServerMessage from a TCP stream.
    fn recv_server_msg(stream: &mut BufReader<TcpStream>) -> ServerMessage {
        let bytes = read_frame(stream).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn session() -> Session {
        Session::new("test".into(), 20, 8)
    }

    #[test]
    fn add_painter_sends_init_snapshot() {
        let (client, server) = tcp_pair();
        let mut s = session();

        let id = s
            .add_painter("Mabel".into(), PROTOCOL_VERSION, server)
            .unwrap();
        assert_eq!(id, PainterId(0));
        assert_eq!(s.painter_count(), 1);

        let mut reader = BufReader::new(client);
        match recv_server_msg(&mut reader) {
            ServerMessage::Init {
                painter_id,
                size,
                cells,
                painters,
            } => {
                assert_eq!(painter_id, PainterId(0));
                assert_eq!(size, 20);
                assert_eq!(cells.len(), 20);
                assert!(cells.iter().all(|row| row.iter().all(Option::is_none)));
                assert_eq!(painters.len(), 1);
                assert_eq!(painters[0].name, "Mabel");
            }
            other => panic!("expected Init, got {other:?}"),
        }
    }

    #[test]
    fn init_carries_previously_painted_cells() {
        let (_client1, server1) = tcp_pair();
        let (client2, server2) = tcp_pair();
        let mut s = session();

        let first = s
            .add_painter("First".into(), PROTOCOL_VERSION, server1)
            .unwrap();
        s.apply_paint(first, 10, 10, RED);
        s.apply_paint(first, 11, 10, BLUE);

        s.add_painter("Second".into(), PROTOCOL_VERSION, server2)
            .unwrap();

        let mut reader = BufReader::new(client2);
        match recv_server_msg(&mut reader) {
            ServerMessage::Init { cells, .. } => {
                assert_eq!(cells[10][10], Some(RED));
                assert_eq!(cells[10][11], Some(BLUE));
            }
            other => panic!("expected Init, got {other:?}"),
        }
    }

    #[test]
    fn version_mismatch_rejected() {
        let (_client, server) = tcp_pair();
        let mut s = session();
        let result = s.add_painter("Old".into(), PROTOCOL_VERSION + 1, server);
        assert!(result.unwrap_err().contains("version mismatch"));
    }

    #[test]
    fn full_canvas_rejected() {
        let (_c1, server1) = tcp_pair();
        let (_c2, server2) = tcp_pair();
        let mut s = Session::new("test".into(), 20, 1);

        s.add_painter("A".into(), PROTOCOL_VERSION, server1)
            .unwrap();
        let result = s.add_painter("B".into(), PROTOCOL_VERSION, server2);
        assert_eq!(result.unwrap_err(), "canvas is full");
    }

    #[test]
    fn second_join_broadcasts_painter_joined() {
        let (client1, server1) = tcp_pair();
        let (_client2, server2) = tcp_pair();
        let mut s = session();

        s.add_painter("First".into(), PROTOCOL_VERSION, server1)
            .unwrap();
        let mut reader1 = BufReader::new(client1);
        let _init = recv_server_msg(&mut reader1);

        s.add_painter("Second".into(), PROTOCOL_VERSION, server2)
            .unwrap();

        match recv_server_msg(&mut reader1) {
            ServerMessage::PainterJoined { painter } => {
                assert_eq!(painter.id, PainterId(1));
                assert_eq!(painter.name, "Second");
            }
            other => panic!("expected PainterJoined, got {other:?}"),
        }
    }

    #[test]
    fn paint_broadcasts_to_everyone_but_the_sender() {
        let (client1, server1) = tcp_pair();
        let (client2, server2) = tcp_pair();
        let mut s = session();

        let first = s
            .add_painter("First".into(), PROTOCOL_VERSION, server1)
            .unwrap();
        s.add_painter("Second".into(), PROTOCOL_VERSION, server2)
            .unwrap();

        s.apply_paint(first, 10, 10, RED);
        // Sender disconnects; if it had been echoed its own paint, the next
        // read below would see Paint before PainterLeft.
        s.remove_painter(first);

        let mut reader2 = BufReader::new(client2);
        let _init = recv_server_msg(&mut reader2);
        match recv_server_msg(&mut reader2) {
            ServerMessage::Paint { x, y, color } => {
                assert_eq!((x, y, color), (10, 10, RED));
            }
            other => panic!("expected Paint, got {other:?}"),
        }

        let mut reader1 = BufReader::new(client1);
        let _init = recv_server_msg(&mut reader1);
        let _joined = recv_server_msg(&mut reader1);
        match recv_server_msg(&mut reader1) {
            ServerMessage::PainterLeft { .. } => {}
            other => panic!("sender should not receive its own paint, got {other:?}"),
        }
    }

    #[test]
    fn paint_outside_mask_is_dropped() {
        let (_client1, server1) = tcp_pair();
        let mut s = session();
        let id = s
            .add_painter("First".into(), PROTOCOL_VERSION, server1)
            .unwrap();

        s.apply_paint(id, 0, 0, RED); // corner, outside the egg
        s.apply_paint(id, 99, 0, RED); // out of bounds
        assert_eq!(s.cell(0, 0), None);
        assert_eq!(s.cell(99, 0), None);
    }

    #[test]
    fn matrix_resolves_conflicts_last_write_wins() {
        let (_c1, server1) = tcp_pair();
        let (_c2, server2) = tcp_pair();
        let mut s = session();

        let a = s.add_painter("A".into(), PROTOCOL_VERSION, server1).unwrap();
        let b = s.add_painter("B".into(), PROTOCOL_VERSION, server2).unwrap();

        s.apply_paint(a, 10, 10, RED);
        s.apply_paint(b, 10, 10, BLUE);
        assert_eq!(s.cell(10, 10), Some(BLUE));
    }

    #[test]
    fn remove_painter_broadcasts_painter_left() {
        let (client1, server1) = tcp_pair();
        let (_client2, server2) = tcp_pair();
        let mut s = session();

        s.add_painter("First".into(), PROTOCOL_VERSION, server1)
            .unwrap();
        s.add_painter("Second".into(), PROTOCOL_VERSION, server2)
            .unwrap();

        let mut reader1 = BufReader::new(client1);
        let _init = recv_server_msg(&mut reader1);
        let _joined = recv_server_msg(&mut reader1);

        s.remove_painter(PainterId(1));

        match recv_server_msg(&mut reader1) {
            ServerMessage::PainterLeft { painter_id, name } => {
                assert_eq!(painter_id, PainterId(1));
                assert_eq!(name, "Second");
            }
            other => panic!("expected PainterLeft, got {other:?}"),
        }
        assert_eq!(s.painter_count(), 1);
        assert_eq!(s.painter_list().len(), 1);
    }
}
