// ABOUTME: Cue forwarding side of the bridge
// ABOUTME: Dedup gate, deck poller, notification egress and reset control channel

mod config;
mod dedup;
mod info;
mod poller;
mod reset;
mod runner;
mod sender;

pub use config::{CueSenderConfig, ForwarderConfig, EGRESS_PORT, RESET_PORT};
pub use dedup::{CueKey, DedupGate, GateDecision, SharedDedupGate};
pub use info::{InfoSource, MemoryInfo};
pub use poller::{CuePoller, PollerHandle, CUES_PER_DECK, DECKS};
pub use reset::{send_reset, ResetListener};
pub use runner::CueForwarder;
pub use sender::{CueSink, TcpCueSender};
