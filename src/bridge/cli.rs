// ABOUTME: Shared CLI argument parsing and bridge builder utilities
// ABOUTME: Maps command-line flags onto BridgeConfig and sets up tracing

use crate::bridge::config::{BridgeConfig, EVENT_PORT, STATE_PORT};
use crate::bridge::host::MemoryScene;
use clap::Args;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Bridge arguments shared between binaries
///
/// Use with `#[command(flatten)]` in your binary's Args struct:
/// ```ignore
/// #[derive(Parser)]
/// struct MyArgs {
///     #[command(flatten)]
///     bridge: BridgeArgs,
/// }
/// ```
#[derive(Args, Debug, Clone)]
pub struct BridgeArgs {
    /// Loopback port for the hot cue line protocol
    #[arg(long, default_value_t = EVENT_PORT)]
    pub event_port: u16,

    /// Loopback port for the scene state HTTP endpoint
    #[arg(long, default_value_t = STATE_PORT)]
    pub state_port: u16,

    /// JSON scene layout for the in-memory renderer host
    #[arg(long)]
    pub scene_file: Option<PathBuf>,

    /// Consumer tick interval in milliseconds
    #[arg(long, default_value = "16", value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Install the tracing subscriber (also captures `log` records)
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = if verbose {
        "hotcue_bridge=debug,hotcue_reset=debug"
    } else {
        "hotcue_bridge=info,hotcue_reset=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

impl BridgeArgs {
    /// Initialize tracing based on verbosity flag
    pub fn init_tracing(&self) {
        init_tracing(self.verbose);
    }

    /// Log startup information
    pub fn log_startup_info(&self) {
        tracing::info!("hotcue-bridge v{}", env!("CARGO_PKG_VERSION"));
        tracing::info!("Events: tcp://127.0.0.1:{}", self.event_port);
        tracing::info!("State:  http://127.0.0.1:{}/", self.state_port);
    }

    /// Build BridgeConfig from these args (always loopback)
    pub fn build_config(&self) -> BridgeConfig {
        BridgeConfig::new()
            .event_addr(SocketAddr::from((Ipv4Addr::LOCALHOST, self.event_port)))
            .state_addr(SocketAddr::from((Ipv4Addr::LOCALHOST, self.state_port)))
            .tick_interval_ms(self.tick_ms)
    }

    /// Create the in-memory host, from `--scene-file` when given
    pub fn create_scene_host(&self) -> crate::Result<MemoryScene> {
        match &self.scene_file {
            Some(path) => {
                let host = MemoryScene::load(path)?;
                tracing::info!("Scene layout loaded from '{}'", path.display());
                Ok(host)
            }
            None => {
                tracing::info!("No scene layout given, starting with an empty host");
                Ok(MemoryScene::default())
            }
        }
    }
}
