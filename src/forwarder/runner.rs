// ABOUTME: Cue forwarder lifecycle
// ABOUTME: Wires the dedup gate, egress sender, reset listener and deck poller together

use crate::forwarder::config::ForwarderConfig;
use crate::forwarder::dedup::{DedupGate, SharedDedupGate};
use crate::forwarder::info::InfoSource;
use crate::forwarder::poller::{CuePoller, PollerHandle};
use crate::forwarder::reset::ResetListener;
use crate::forwarder::sender::{CueSink, TcpCueSender};
use std::net::SocketAddr;
use std::sync::Arc;

/// A running forwarder: poller thread plus reset listener sharing one gate
pub struct CueForwarder {
    gate: SharedDedupGate,
    poller: PollerHandle,
    reset: ResetListener,
}

impl CueForwarder {
    /// Start forwarding cues read from `info` to the configured egress address.
    ///
    /// A reset listener that fails to bind is logged and left off; polling still
    /// runs.
    pub fn start(config: ForwarderConfig, info: Arc<dyn InfoSource>) -> crate::Result<Self> {
        let sink: Arc<dyn CueSink> = Arc::new(TcpCueSender::new(config.sender.clone()));
        Self::start_with_sink(config, info, sink)
    }

    /// Start with a custom notification sink
    pub fn start_with_sink(
        config: ForwarderConfig,
        info: Arc<dyn InfoSource>,
        sink: Arc<dyn CueSink>,
    ) -> crate::Result<Self> {
        let gate = DedupGate::shared();

        let mut reset = ResetListener::new(config.reset_addr, config.reset_poll_interval);
        if let Err(e) = reset.start(Arc::clone(&gate)) {
            log::error!("Reset channel disabled: {}", e);
        }

        let poller = CuePoller::new(info, Arc::clone(&gate), sink)
            .spawn(config.poll_interval, config.sleep_slice)?;

        log::info!("Cue forwarder sending to {}", config.sender.addr);
        Ok(Self {
            gate,
            poller,
            reset,
        })
    }

    /// The dedup gate shared by the poller and the reset listener
    pub fn gate(&self) -> &SharedDedupGate {
        &self.gate
    }

    /// Bound reset address, if the reset listener is up
    pub fn reset_addr(&self) -> Option<SocketAddr> {
        self.reset.local_addr()
    }

    /// Stop polling and the reset listener. Idempotent.
    pub fn stop(&mut self) {
        self.poller.stop();
        self.reset.stop();
    }
}
