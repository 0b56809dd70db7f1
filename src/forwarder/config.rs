// ABOUTME: Cue forwarder configuration
// ABOUTME: Egress address and retry policy, reset port, and polling cadence

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default cue notification egress port
pub const EGRESS_PORT: u16 = 8112;
/// Default reset control port
pub const RESET_PORT: u16 = 5029;

/// Egress connection and retry behaviour
#[derive(Clone, Debug)]
pub struct CueSenderConfig {
    /// Where notifications are sent
    pub addr: SocketAddr,
    /// Connect timeout per attempt
    pub connect_timeout: Duration,
    /// Pause between attempts of one send
    pub retry_delay: Duration,
    /// Attempts per send before giving up
    pub max_retries: u32,
    /// After a failed send, further sends are refused for this long
    pub retry_cooldown: Duration,
}

impl Default for CueSenderConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::LOCALHOST, EGRESS_PORT)),
            connect_timeout: Duration::from_millis(500),
            retry_delay: Duration::from_millis(100),
            max_retries: 3,
            retry_cooldown: Duration::from_millis(5000),
        }
    }
}

/// Forwarder configuration
#[derive(Clone, Debug)]
pub struct ForwarderConfig {
    /// Egress settings
    pub sender: CueSenderConfig,
    /// Address the reset listener binds to
    pub reset_addr: SocketAddr,
    /// Time between deck scans
    pub poll_interval: Duration,
    /// Sleep granularity while waiting for the next scan
    pub sleep_slice: Duration,
    /// Accept poll interval of the reset listener
    pub reset_poll_interval: Duration,
}

impl ForwarderConfig {
    /// Create a configuration with the default loopback ports
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the egress address
    pub fn egress_addr(mut self, addr: SocketAddr) -> Self {
        self.sender.addr = addr;
        self
    }

    /// Set the reset listener address
    pub fn reset_addr(mut self, addr: SocketAddr) -> Self {
        self.reset_addr = addr;
        self
    }

    /// Set the polling interval in milliseconds
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval = Duration::from_millis(ms);
        self
    }
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            sender: CueSenderConfig::default(),
            reset_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, RESET_PORT)),
            poll_interval: Duration::from_millis(100),
            sleep_slice: Duration::from_millis(10),
            reset_poll_interval: Duration::from_millis(100),
        }
    }
}
