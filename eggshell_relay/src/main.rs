// CLI entry point for the Eggshell canvas relay.
//
// Starts a standalone relay that painter clients connect to. The relay owns
// the authoritative color matrix, snapshots it to each new painter, and
// rebroadcasts paint events — it never renders and never makes sound. See
// `server.rs` for the networking architecture and `session.rs` for the
// session state.
//
// Usage:
//   relay [OPTIONS]
//     --port <PORT>           Listen port (default: 7878)
//     --name <NAME>           Canvas name (default: eggshell-canvas)
//     --grid-size <N>         Cells per side (default: 20)
//     --max-painters <N>      Max connected painters (default: 16)

use eggshell_relay::server::{RelayConfig, start_relay};

fn main() {
    env_logger::init();
    let config = parse_args();

    let (handle, addr) = match start_relay(config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Failed to start relay: {e}");
            std::process::exit(1);
        }
    };

    println!("Relay listening on {addr}");
    println!("Press Ctrl+C to stop.");

    // The process exits on SIGINT/SIGTERM; the relay holds no state that
    // needs flushing on the way out.
    let running = std::sync::atomic::AtomicBool::new(true);
    while running.load(std::sync::atomic::Ordering::SeqCst) {
        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    handle.stop();
}

/// Parse command-line arguments into a `RelayConfig`. Uses simple
/// `std::env::args()` matching — no clap dependency.
fn parse_args() -> RelayConfig {
    let mut config = RelayConfig::default();
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                i += 1;
                config.port = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--port requires a valid port number");
                    std::process::exit(1);
                });
            }
            "--name" => {
                i += 1;
                config.canvas_name = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--name requires a value");
                    std::process::exit(1);
                });
            }
            "--grid-size" => {
                i += 1;
                config.grid_size = args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--grid-size requires a valid number");
                    std::process::exit(1);
                });
            }
            "--max-painters" => {
                i += 1;
                config.max_painters =
                    args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                        eprintln!("--max-painters requires a valid number");
                        std::process::exit(1);
                    });
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    config
}

fn print_usage() {
    println!("Usage: relay [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --port <PORT>           Listen port (default: 7878)");
    println!("  --name <NAME>           Canvas name (default: eggshell-canvas)");
    println!("  --grid-size <N>         Cells per side (default: 20)");
    println!("  --max-painters <N>      Max connected painters (default: 16)");
    println!("  --help, -h              Show this help");
}
