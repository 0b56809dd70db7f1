// ABOUTME: Receiver side of the bridge
// ABOUTME: Event queue, line protocol listener, per-tick consumer and scene state endpoint

/// Command-line arguments shared by the binaries
pub mod cli;
mod config;
mod consumer;
mod host;
mod listener;
mod queue;
mod state_server;

pub use cli::BridgeArgs;
pub use config::{BridgeConfig, EVENT_PORT, STATE_PORT};
pub use consumer::{dispatch, spawn_tick_consumer, DrainStats, EventConsumer, MIN_TICK};
pub use host::{
    HostSource, MemoryFilter, MemoryScene, MemorySceneEntry, MemorySource, SceneController,
    SceneFile, SceneProvider, Switch,
};
pub use listener::{pump_connection, ConnectionEnd, ListenerState, TcpEventListener};
pub use queue::EventQueue;
pub use state_server::{build_scene_tree, serve_connection, StateServer, MAX_GROUP_DEPTH};
