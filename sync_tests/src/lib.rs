// Test-only painter client for sync integration tests.
//
// Wraps a real `SyncChannel` (from `eggshell_sync`) — which itself wraps
// the real `NetClient` and `CanvasStore` — to provide a synchronous,
// test-friendly API for exercising the full pipeline:
// connect → snapshot → paint → relay → remote apply → verify store.
//
// The only test-specific code here is the blocking polling wrappers
// (loops around `SyncChannel::pump()`). All networking and canvas logic
// uses the same code paths as the live painter.
//
// See also: `tests/full_pipeline.rs` for the integration test scenarios.

use std::thread;
use std::time::{Duration, Instant};

use eggshell_canvas::Color;
use eggshell_sync::{ChannelState, SyncChannel};

/// Default timeout for blocking poll operations.
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep duration between poll attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A test painter wrapping a real SyncChannel.
pub struct TestPainter {
    pub channel: SyncChannel,
}

impl TestPainter {
    /// Connect to a relay and complete the snapshot handshake.
    pub fn connect(addr: std::net::SocketAddr, name: &str, grid_size: usize) -> Self {
        let mut channel = SyncChannel::new(grid_size);
        channel
            .connect(&addr.to_string(), name)
            .expect("TestPainter::connect failed");
        Self { channel }
    }

    /// Create an offline painter (no relay connection).
    pub fn offline(grid_size: usize) -> Self {
        Self {
            channel: SyncChannel::new(grid_size),
        }
    }

    pub fn paint(&mut self, x: usize, y: usize, color: Color) -> bool {
        self.channel.paint(x, y, color)
    }

    pub fn color(&self, x: usize, y: usize) -> Option<Color> {
        self.channel.store().color(x, y)
    }

    /// Blocking pump until `(x, y)` holds `expected`.
    pub fn wait_for_cell(&mut self, x: usize, y: usize, expected: Color) {
        let start = Instant::now();
        loop {
            self.channel.pump();
            if self.channel.store().color(x, y) == Some(expected) {
                return;
            }
            assert!(
                start.elapsed() < POLL_TIMEOUT,
                "timed out waiting for cell ({x}, {y}) to become {expected}, is {:?}",
                self.channel.store().color(x, y)
            );
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Blocking pump until the peer roster has exactly `count` entries
    /// (the roster includes this painter while connected).
    pub fn wait_for_peer_count(&mut self, count: usize) {
        let start = Instant::now();
        loop {
            self.channel.pump();
            if self.channel.peers().len() == count {
                return;
            }
            assert!(
                start.elapsed() < POLL_TIMEOUT,
                "timed out waiting for {count} peers, have {:?}",
                self.channel.peers()
            );
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Blocking pump until the channel notices its connection is gone.
    pub fn wait_for_offline(&mut self) {
        let start = Instant::now();
        loop {
            self.channel.pump();
            if self.channel.state() == ChannelState::Disconnected {
                return;
            }
            assert!(
                start.elapsed() < POLL_TIMEOUT,
                "timed out waiting for the channel to go offline"
            );
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Pump for a fixed settle window and return how many remote paint
    /// events were applied. For asserting that nothing arrives.
    pub fn settle(&mut self, window: Duration) -> usize {
        let start = Instant::now();
        let mut applied = 0;
        while start.elapsed() < window {
            applied += self.channel.pump();
            thread::sleep(POLL_INTERVAL);
        }
        applied
    }

    /// Send Goodbye and close the connection.
    pub fn disconnect(&mut self) {
        self.channel.disconnect();
    }
}
