// ABOUTME: Main library entry point for hotcue-bridge
// ABOUTME: Exports the event ingress, scene state endpoint and cue forwarding APIs

//! # hotcue-bridge
//!
//! Bridges real-time hot cue events from a DJ application to a rendering/broadcast
//! application over loopback TCP.
//!
//! ## Features
//!
//! - **Ingress**: a line-protocol TCP listener feeding a closeable event queue that the
//!   host drains once per tick
//! - **State**: a minimal HTTP/1.1 endpoint serving the host scene tree as JSON
//! - **Forwarder**: a deck poller that fires one notification per passed cue, with a
//!   resettable dedup gate
//!
//! ## Example: Running the ingress side
//!
//! ```no_run
//! use hotcue_bridge::bridge::{EventConsumer, EventQueue, MemoryScene, TcpEventListener};
//! use std::sync::Arc;
//!
//! let queue = Arc::new(EventQueue::new());
//! let mut listener = TcpEventListener::new("127.0.0.1:7779".parse().unwrap());
//! listener.start(Arc::clone(&queue)).unwrap();
//!
//! let host = MemoryScene::default();
//! let consumer = EventConsumer::new(queue);
//! // Call once per host frame
//! consumer.drain(&host);
//!
//! listener.stop();
//! ```

#![warn(missing_docs)]

/// Receiver side: event queue, line listener, per-tick consumer, state endpoint
pub mod bridge;
/// Cue forwarding side: dedup gate, deck poller, egress sender, reset channel
pub mod forwarder;
/// Wire formats: line framing, event grammar, HTTP classification, JSON messages
pub mod protocol;

pub use bridge::{BridgeConfig, EventQueue, TcpEventListener};
pub use forwarder::{CueForwarder, CuePoller, DedupGate, ForwarderConfig};
pub use protocol::event::{Event, EventKind};

/// Result type for hotcue-bridge operations
pub type Result<T> = std::result::Result<T, error::Error>;

/// Error types for hotcue-bridge
pub mod error {
    use std::net::SocketAddr;
    use thiserror::Error;

    /// Error types for hotcue-bridge operations
    #[derive(Error, Debug)]
    pub enum Error {
        /// Binding a listening socket failed
        #[error("Failed to bind {addr}: {source}")]
        Bind {
            /// Address the bind was attempted on
            addr: SocketAddr,
            /// Underlying socket error
            #[source]
            source: std::io::Error,
        },

        /// Socket or file I/O error
        #[error("I/O error: {0}")]
        Io(#[from] std::io::Error),

        /// JSON encoding or decoding error
        #[error("JSON error: {0}")]
        Json(#[from] serde_json::Error),

        /// The host rejected an operation
        #[error("Host error: {0}")]
        Host(String),

        /// A line named an event type outside the protocol table
        #[error("Unknown event type '{0}'")]
        UnknownEvent(String),

        /// An event lacked an argument its kind requires
        #[error("{event} requires -{key}")]
        MissingArgument {
            /// Event type token
            event: &'static str,
            /// Missing key name
            key: &'static str,
        },

        /// Sending a cue notification failed
        #[error("Egress error: {0}")]
        Egress(String),
    }
}
