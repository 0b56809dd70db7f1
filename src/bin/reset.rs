// ABOUTME: hotcue-reset binary
// ABOUTME: Asks a running cue forwarder to forget which cues it already reported

use clap::Parser;
use hotcue_bridge::bridge::cli::init_tracing;
use hotcue_bridge::forwarder::{send_reset, RESET_PORT};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "hotcue-reset")]
#[command(author, version, about = "Clear the hot cue forwarder's notified-cue set", long_about = None)]
struct Args {
    /// Loopback port of the forwarder's reset listener
    #[arg(short, long, default_value_t = RESET_PORT)]
    port: u16,

    /// Connect timeout in milliseconds
    #[arg(long, default_value = "1000")]
    timeout_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, args.port));
    send_reset(addr, Duration::from_millis(args.timeout_ms))?;
    tracing::info!("Reset sent to {}", addr);
    Ok(())
}
