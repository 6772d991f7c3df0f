// End-to-end integration tests for the sync pipeline.
//
// Each test starts a real relay server and connects real SyncChannel
// instances (via TestPainter), verifying the full path:
// connect → snapshot → paint → relay → remote apply → identical stores.
//
// These tests exercise the same code paths as the live painter (NetClient
// from the relay crate, CanvasStore from the canvas crate) — the only
// test-specific code is the blocking polling wrappers in TestPainter.

use std::thread;
use std::time::Duration;

use eggshell_canvas::Color;
use eggshell_relay::server::{RelayConfig, RelayHandle, start_relay};
use sync_tests::TestPainter;

/// Small canvas for tests. 8×8 still has a meaningful egg interior and
/// masked corners.
const TEST_GRID_SIZE: usize = 8;

const RED: Color = Color::new(255, 0, 0);
const GREEN: Color = Color::new(0, 255, 0);
const BLUE: Color = Color::new(0, 0, 255);

/// Window long enough for anything already in flight to arrive when
/// asserting that nothing does.
const SETTLE: Duration = Duration::from_millis(200);

/// Start a relay on a random port, connect two painters, and wait until
/// the first painter has seen the second join.
fn start_test_session() -> (RelayHandle, TestPainter, TestPainter) {
    let (handle, addr) = start_relay(test_config()).unwrap();
    thread::sleep(Duration::from_millis(50));

    let mut first = TestPainter::connect(addr, "Mabel", TEST_GRID_SIZE);
    let second = TestPainter::connect(addr, "Dipper", TEST_GRID_SIZE);
    first.wait_for_peer_count(2);

    (handle, first, second)
}

fn test_config() -> RelayConfig {
    RelayConfig {
        port: 0,
        canvas_name: "integration-test".into(),
        grid_size: TEST_GRID_SIZE,
        max_painters: 4,
    }
}

/// Two painters connect, paint in both directions, and end up with
/// identical canvases.
#[test]
fn two_painter_lifecycle() {
    let (handle, mut first, mut second) = start_test_session();

    assert!(first.paint(3, 3, RED));
    second.wait_for_cell(3, 3, RED);

    assert!(second.paint(4, 4, GREEN));
    first.wait_for_cell(4, 4, GREEN);

    assert_eq!(
        first.channel.store().matrix(),
        second.channel.store().matrix(),
        "stores should be identical after both directions"
    );

    first.disconnect();
    second.disconnect();
    handle.stop();
}

/// A painter that joins late receives the relay's canvas as a snapshot
/// and starts with exactly the state the earlier painter built.
#[test]
fn snapshot_on_join_reproduces_existing_state() {
    let (handle, addr) = start_relay(test_config()).unwrap();
    thread::sleep(Duration::from_millis(50));

    let mut early = TestPainter::connect(addr, "Mabel", TEST_GRID_SIZE);
    assert!(early.paint(3, 3, RED));
    assert!(early.paint(4, 3, GREEN));
    assert!(early.paint(3, 4, BLUE));
    // Let the relay record all three before the second connect.
    thread::sleep(Duration::from_millis(100));

    let late = TestPainter::connect(addr, "Dipper", TEST_GRID_SIZE);
    assert_eq!(late.color(3, 3), Some(RED));
    assert_eq!(late.color(4, 3), Some(GREEN));
    assert_eq!(late.color(3, 4), Some(BLUE));
    assert_eq!(
        early.channel.store().matrix(),
        late.channel.store().matrix(),
        "snapshot should reproduce the earlier painter's canvas exactly"
    );

    handle.stop();
}

/// A paint never comes back to its own sender: the sender applies it
/// locally once and receives no remote copy.
#[test]
fn no_echo_back_to_sender() {
    let (handle, mut first, mut second) = start_test_session();

    assert!(first.paint(3, 3, RED));
    second.wait_for_cell(3, 3, RED);

    let applied = first.settle(SETTLE);
    assert_eq!(applied, 0, "sender should never receive its own paint");
    assert_eq!(first.color(3, 3), Some(RED));

    first.disconnect();
    second.disconnect();
    handle.stop();
}

/// Cells outside the egg outline are rejected locally and nothing
/// reaches the other painter.
#[test]
fn masked_cells_never_propagate() {
    let (handle, mut first, mut second) = start_test_session();

    // (0, 0) lies outside the ellipse on any grid size.
    assert!(!first.paint(0, 0, RED));
    assert_eq!(first.color(0, 0), None);

    let applied = second.settle(SETTLE);
    assert_eq!(applied, 0, "rejected paints must not propagate");
    assert_eq!(second.color(0, 0), None);

    first.disconnect();
    second.disconnect();
    handle.stop();
}

/// Two writes to the same cell, one after the other: everyone ends on
/// the later one.
#[test]
fn sequential_writes_converge_to_last() {
    let (handle, mut first, mut second) = start_test_session();

    assert!(first.paint(3, 3, RED));
    second.wait_for_cell(3, 3, RED);

    assert!(second.paint(3, 3, BLUE));
    first.wait_for_cell(3, 3, BLUE);

    assert_eq!(first.color(3, 3), Some(BLUE));
    assert_eq!(second.color(3, 3), Some(BLUE));

    first.disconnect();
    second.disconnect();
    handle.stop();
}

/// Paints made while offline stay local: they are not queued for the
/// relay, and connecting afterwards merges the snapshot without
/// discarding them.
#[test]
fn offline_paints_stay_local_across_connect() {
    let (handle, addr) = start_relay(test_config()).unwrap();
    thread::sleep(Duration::from_millis(50));

    let mut online = TestPainter::connect(addr, "Mabel", TEST_GRID_SIZE);
    assert!(online.paint(3, 3, RED));
    thread::sleep(Duration::from_millis(100));

    let mut offline = TestPainter::offline(TEST_GRID_SIZE);
    assert!(offline.paint(4, 4, GREEN));

    // Connecting applies the snapshot over the local canvas; cells the
    // snapshot leaves empty keep their local color.
    offline
        .channel
        .connect(&addr.to_string(), "Dipper")
        .expect("late connect failed");
    assert_eq!(offline.color(3, 3), Some(RED));
    assert_eq!(offline.color(4, 4), Some(GREEN));

    // The offline-era paint was never forwarded.
    let applied = online.settle(SETTLE);
    assert_eq!(applied, 0, "offline paints must not be replayed on connect");
    assert_eq!(online.color(4, 4), None);

    offline.disconnect();
    online.disconnect();
    handle.stop();
}

/// Roster bookkeeping: a departing painter disappears from the other
/// painter's peer list.
#[test]
fn painter_left_updates_roster() {
    let (handle, mut first, mut second) = start_test_session();

    let names: Vec<&str> = first.channel.peers().iter().map(|p| p.name.as_str()).collect();
    assert!(names.contains(&"Mabel") && names.contains(&"Dipper"));

    second.disconnect();
    first.wait_for_peer_count(1);
    assert_eq!(first.channel.peers()[0].name, "Mabel");

    first.disconnect();
    handle.stop();
}
