// TCP server and main event loop for the relay coordinator.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts new TCP
//   connections and sends `InternalEvent::NewConnection` to the main thread.
// - **Reader threads** (one per painter): call `framing::read_frame()` in a
//   loop, deserialize `ClientMessage`, and send `InternalEvent::MessageFrom`
//   to the main thread. On error/EOF, send `InternalEvent::Disconnected`.
// - **Main thread**: owns the `Session`, receives events from the channel,
//   and dispatches them. Paint events are relayed the moment they arrive;
//   there is no batching cadence, so the loop's `recv_timeout` exists only
//   to re-check the shutdown flag.
//
// The main thread is the only writer to painter TCP streams (via
// `Session::broadcast`/`send_to`). Reader threads only read from streams.
// This avoids concurrent read/write on the same `TcpStream`, which is safe
// on most platforms but fragile.
//
// Shutdown: the main thread checks a `keep_running` flag (set to false by
// `RelayHandle::stop`) and breaks out of the event loop.

use std::io::BufReader;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use eggshell_canvas::mask::DEFAULT_GRID_SIZE;
use eggshell_protocol::framing::{read_frame, write_frame};
use eggshell_protocol::message::{ClientMessage, ServerMessage};
use eggshell_protocol::types::PainterId;

use crate::session::Session;

/// How often the main loop wakes to re-check the shutdown flag when no
/// events are arriving.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Events sent from listener/reader threads to the main thread.
enum InternalEvent {
    NewConnection {
        stream: TcpStream,
    },
    MessageFrom {
        painter_id: PainterId,
        message: ClientMessage,
    },
    Disconnected {
        painter_id: PainterId,
    },
}

/// Handle returned by `start_relay` to control the running server.
pub struct RelayHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RelayHandle {
    /// Signal the relay to stop and wait for it to shut down.
    pub fn stop(self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread {
            let _ = handle.join();
        }
    }
}

/// Configuration for starting a relay server.
pub struct RelayConfig {
    pub port: u16,
    pub canvas_name: String,
    pub grid_size: usize,
    pub max_painters: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: 7878,
            canvas_name: "eggshell-canvas".into(),
            grid_size: DEFAULT_GRID_SIZE,
            max_painters: 16,
        }
    }
}

/// Start the relay server on a background thread. Returns a handle for
/// stopping it and the actual bound address (useful when port 0 is used
/// to let the OS pick a free port).
pub fn start_relay(config: RelayConfig) -> std::io::Result<(RelayHandle, std::net::SocketAddr)> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", config.port))?;
    let addr = listener.local_addr()?;
    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();

    log::info!("relay for canvas {:?} listening on {addr}", config.canvas_name);

    let thread = thread::spawn(move || {
        run_relay(listener, config, keep_running_clone);
    });

    Ok((
        RelayHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Main relay loop. Runs until `keep_running` is set to false.
fn run_relay(listener: TcpListener, config: RelayConfig, keep_running: Arc<AtomicBool>) {
    let mut session = Session::new(config.canvas_name, config.grid_size, config.max_painters);

    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    // Set the listener to non-blocking so the accept thread can check
    // keep_running periodically.
    listener.set_nonblocking(true).ok();

    // Listener thread: accepts new connections.
    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || {
        while keep_running_listener.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, _addr)) => {
                    stream.set_nonblocking(false).ok();
                    let _ = tx_listener.send(InternalEvent::NewConnection { stream });
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(50));
                }
                Err(_) => break,
            }
        }
    });

    // Main event loop.
    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(SHUTDOWN_POLL) {
            Ok(event) => {
                handle_event(&mut session, event, &tx, &keep_running);
                // Drain any additional events that arrived during handling.
                while let Ok(event) = rx.try_recv() {
                    handle_event(&mut session, event, &tx, &keep_running);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Dispatch a single event to the session.
fn handle_event(
    session: &mut Session,
    event: InternalEvent,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    match event {
        InternalEvent::NewConnection { stream } => {
            handle_new_connection(session, stream, tx, keep_running);
        }
        InternalEvent::MessageFrom {
            painter_id,
            message,
        } => {
            handle_message(session, painter_id, message);
        }
        InternalEvent::Disconnected { painter_id } => {
            log::info!("painter {painter_id:?} disconnected");
            session.remove_painter(painter_id);
        }
    }
}

/// Handle a new TCP connection: read the Hello handshake, add the painter
/// to the session (which sends the Init snapshot), and spawn a reader
/// thread.
fn handle_new_connection(
    session: &mut Session,
    stream: TcpStream,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    // Set a read timeout so the handshake doesn't block forever.
    stream.set_read_timeout(Some(Duration::from_secs(5))).ok();

    let mut reader = BufReader::new(match stream.try_clone() {
        Ok(s) => s,
        Err(_) => return,
    });

    let hello_bytes = match read_frame(&mut reader) {
        Ok(bytes) => bytes,
        Err(_) => return,
    };

    let hello: ClientMessage = match serde_json::from_slice(&hello_bytes) {
        Ok(msg) => msg,
        Err(_) => return,
    };

    match hello {
        ClientMessage::Hello {
            protocol_version,
            painter_name,
        } => {
            // Clone the stream for the session's write half.
            let write_stream = match stream.try_clone() {
                Ok(s) => s,
                Err(_) => return,
            };

            match session.add_painter(painter_name.clone(), protocol_version, write_stream) {
                Ok(painter_id) => {
                    log::info!("painter {painter_id:?} ({painter_name:?}) joined");

                    // Clear read timeout for the long-lived reader loop.
                    stream.set_read_timeout(None).ok();

                    let tx_reader = tx.clone();
                    let keep_running_reader = keep_running.clone();
                    thread::spawn(move || {
                        reader_loop(reader, painter_id, tx_reader, keep_running_reader);
                    });
                }
                Err(reason) => {
                    log::warn!("rejected painter {painter_name:?}: {reason}");
                    let rejected = ServerMessage::Rejected { reason };
                    if let Ok(json) = serde_json::to_vec(&rejected) {
                        let mut writer = std::io::BufWriter::new(stream);
                        let _ = write_frame(&mut writer, &json);
                    }
                }
            }
        }
        _ => {
            // Expected Hello as first message — drop the connection.
        }
    }
}

/// Reader loop for a single painter. Runs in its own thread.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    painter_id: PainterId,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match read_frame(&mut reader) {
            Ok(bytes) => match serde_json::from_slice::<ClientMessage>(&bytes) {
                Ok(ClientMessage::Goodbye) => {
                    let _ = tx.send(InternalEvent::Disconnected { painter_id });
                    break;
                }
                Ok(message) => {
                    let _ = tx.send(InternalEvent::MessageFrom {
                        painter_id,
                        message,
                    });
                }
                Err(e) => {
                    // Malformed message — disconnect.
                    log::warn!("malformed message from {painter_id:?}: {e}");
                    let _ = tx.send(InternalEvent::Disconnected { painter_id });
                    break;
                }
            },
            Err(_) => {
                // Read error or EOF — disconnect.
                let _ = tx.send(InternalEvent::Disconnected { painter_id });
                break;
            }
        }
    }
}

/// Handle a client message that isn't Hello or Goodbye (those are handled
/// during connection setup and in the reader loop respectively).
fn handle_message(session: &mut Session, painter_id: PainterId, message: ClientMessage) {
    match message {
        ClientMessage::Paint { x, y, color } => {
            log::debug!("paint from {painter_id:?}: ({x}, {y}) = {color}");
            session.apply_paint(painter_id, x, y, color);
        }
        ClientMessage::Hello { .. } | ClientMessage::Goodbye => {
            // Hello is handled during connection setup, Goodbye in the
            // reader loop.
        }
    }
}
