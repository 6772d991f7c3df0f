// TCP client for connecting to the canvas relay.
//
// Provides a non-blocking interface for the main thread to communicate
// with the relay server. Architecture:
// - `connect()` performs TCP connect + Hello handshake on the calling
//   thread, reads the `Init` snapshot, then spawns a background reader
//   thread.
// - The reader thread calls `read_frame()` in a loop, deserializes
//   `ServerMessage`, and pushes into an `mpsc` channel.
// - The main thread holds a `BufWriter<TcpStream>` for sending.
// - `poll()` drains the inbox non-blocking, returning all queued messages.
//
// This separation ensures the main thread never blocks on network I/O. The
// reader thread handles the blocking reads, and the writer flushes
// synchronously (acceptable for the small messages we send).
//
// This module lives in the relay crate (not the sync crate) because it is
// purely std TCP + protocol framing + mpsc: any crate, including the
// relay's own integration tests, can use it without pulling in canvas
// store logic.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use eggshell_canvas::Color;
use eggshell_protocol::framing::{read_frame, write_frame};
use eggshell_protocol::message::{ClientMessage, PainterInfo, ServerMessage};
use eggshell_protocol::types::{PROTOCOL_VERSION, PainterId};

/// The snapshot returned by a successful `connect()` handshake.
pub struct InitInfo {
    pub painter_id: PainterId,
    pub size: usize,
    pub cells: Vec<Vec<Option<Color>>>,
    pub painters: Vec<PainterInfo>,
}

/// TCP client for relay communication.
pub struct NetClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<ServerMessage>,
    _reader_thread: Option<JoinHandle<()>>,
    pub painter_id: PainterId,
}

impl NetClient {
    /// Connect to a relay, perform the Hello handshake, and spawn a reader
    /// thread. Returns the client and the Init snapshot on success.
    pub fn connect(addr: &str, painter_name: &str) -> Result<(Self, InitInfo), String> {
        let stream = TcpStream::connect(addr).map_err(|e| format!("connect failed: {e}"))?;

        // Set a read timeout for the handshake.
        stream
            .set_read_timeout(Some(std::time::Duration::from_secs(5)))
            .ok();

        let reader_stream = stream
            .try_clone()
            .map_err(|e| format!("clone failed: {e}"))?;
        let mut writer = BufWriter::new(stream);

        // Send Hello.
        let hello = ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
            painter_name: painter_name.into(),
        };
        send_msg(&mut writer, &hello).map_err(|e| format!("send Hello failed: {e}"))?;

        // Read Init or Rejected.
        let mut reader = BufReader::new(reader_stream);
        let response_bytes =
            read_frame(&mut reader).map_err(|e| format!("read Init failed: {e}"))?;
        let response: ServerMessage = serde_json::from_slice(&response_bytes)
            .map_err(|e| format!("parse Init failed: {e}"))?;

        let init = match response {
            ServerMessage::Init {
                painter_id,
                size,
                cells,
                painters,
            } => InitInfo {
                painter_id,
                size,
                cells,
                painters,
            },
            ServerMessage::Rejected { reason } => {
                return Err(format!("rejected: {reason}"));
            }
            other => {
                return Err(format!("unexpected response: {other:?}"));
            }
        };

        // Clear read timeout for the long-lived reader loop.
        if let Ok(inner) = reader.get_ref().try_clone() {
            inner.set_read_timeout(None).ok();
        }

        // Spawn reader thread.
        let (tx, rx) = mpsc::channel();
        let painter_id = init.painter_id;
        let reader_thread = thread::spawn(move || {
            reader_loop(reader, tx);
        });

        Ok((
            Self {
                writer,
                inbox: rx,
                _reader_thread: Some(reader_thread),
                painter_id,
            },
            init,
        ))
    }

    /// Send one paint event to the relay.
    pub fn send_paint(&mut self, x: usize, y: usize, color: Color) -> Result<(), String> {
        let msg = ClientMessage::Paint { x, y, color };
        send_msg(&mut self.writer, &msg).map_err(|e| format!("send Paint failed: {e}"))
    }

    /// Send Goodbye and close the connection.
    pub fn disconnect(&mut self) {
        let _ = send_msg(&mut self.writer, &ClientMessage::Goodbye);
    }

    /// Drain all queued server messages (non-blocking).
    pub fn poll(&self) -> Vec<ServerMessage> {
        self.drain().0
    }

    /// Drain all queued server messages and report liveness: `false` means
    /// the reader thread has exited (EOF or read error) and no further
    /// messages will ever arrive on this connection.
    pub fn drain(&self) -> (Vec<ServerMessage>, bool) {
        let mut messages = Vec::new();
        loop {
            match self.inbox.try_recv() {
                Ok(msg) => messages.push(msg),
                Err(mpsc::TryRecvError::Empty) => return (messages, true),
                Err(mpsc::TryRecvError::Disconnected) => return (messages, false),
            }
        }
    }
}

/// Serialize a `ClientMessage` to JSON and write with length-delimited
/// framing.
fn send_msg(writer: &mut BufWriter<TcpStream>, msg: &ClientMessage) -> Result<(), String> {
    let json = serde_json::to_vec(msg).map_err(|e| e.to_string())?;
    write_frame(writer, &json).map_err(|e| e.to_string())
}

/// Reader thread: read framed messages in a loop, push to channel.
fn reader_loop(mut reader: BufReader<TcpStream>, tx: mpsc::Sender<ServerMessage>) {
    while let Ok(bytes) = read_frame(&mut reader) {
        match serde_json::from_slice::<ServerMessage>(&bytes) {
            Ok(msg) => {
                if tx.send(msg).is_err() {
                    break; // Main thread dropped the receiver
                }
            }
            Err(_) => break, // Malformed message
        }
    }
}
