// ABOUTME: Bridge configuration
// ABOUTME: Loopback addresses and timing for the ingress listener, consumer tick and state endpoint

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default line protocol port
pub const EVENT_PORT: u16 = 7779;
/// Default scene state HTTP port
pub const STATE_PORT: u16 = 7780;

/// Bridge configuration
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Address the line protocol listener binds to
    pub event_addr: SocketAddr,
    /// Address the scene state endpoint binds to
    pub state_addr: SocketAddr,
    /// How often the consumer drains the event queue
    pub tick_interval: Duration,
    /// Receive timeout on an accepted ingress connection
    pub read_timeout: Duration,
    /// Sleep between accept attempts while no client is waiting
    pub accept_poll_interval: Duration,
    /// How long the state endpoint waits for a request head
    pub request_timeout: Duration,
}

impl BridgeConfig {
    /// Create a configuration with the default loopback ports
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the line protocol address
    pub fn event_addr(mut self, addr: SocketAddr) -> Self {
        self.event_addr = addr;
        self
    }

    /// Set the scene state endpoint address
    pub fn state_addr(mut self, addr: SocketAddr) -> Self {
        self.state_addr = addr;
        self
    }

    /// Set the consumer tick interval in milliseconds (at least 1)
    pub fn tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval = Duration::from_millis(ms.max(1));
        self
    }

    /// Set the ingress receive timeout in milliseconds
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.read_timeout = Duration::from_millis(ms);
        self
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            event_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, EVENT_PORT)),
            state_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, STATE_PORT)),
            tick_interval: Duration::from_millis(16),
            read_timeout: Duration::from_millis(250),
            accept_poll_interval: Duration::from_millis(25),
            request_timeout: Duration::from_secs(2),
        }
    }
}
