// ABOUTME: Cue notification egress
// ABOUTME: One short TCP connection per notification, with bounded retries and a failure cooldown

use crate::error::Error;
use crate::forwarder::config::CueSenderConfig;
use crate::protocol::messages::CueNotification;
use parking_lot::Mutex;
use std::io::Write;
use std::net::{Shutdown, TcpStream};
use std::thread;
use std::time::Instant;

/// Destination for cue notifications
pub trait CueSink: Send + Sync {
    /// Deliver one notification
    fn send(&self, notification: &CueNotification) -> crate::Result<()>;
}

/// Sends each notification as a JSON document over its own TCP connection
#[derive(Debug)]
pub struct TcpCueSender {
    config: CueSenderConfig,
    /// When the last send gave up, if it did
    failed_at: Mutex<Option<Instant>>,
}

impl TcpCueSender {
    /// Create a sender
    pub fn new(config: CueSenderConfig) -> Self {
        Self {
            config,
            failed_at: Mutex::new(None),
        }
    }

    /// Whether sends are currently refused after a failure
    pub fn cooling_down(&self) -> bool {
        self.failed_at
            .lock()
            .is_some_and(|at| at.elapsed() < self.config.retry_cooldown)
    }

    /// Send `message`, retrying up to `max_retries` times unless cooling down
    pub fn send_with_retry(&self, message: &str) -> crate::Result<()> {
        let mut failed_at = self.failed_at.lock();
        if failed_at.is_some_and(|at| at.elapsed() < self.config.retry_cooldown) {
            return Err(Error::Egress(format!(
                "{} unreachable, cooling down",
                self.config.addr
            )));
        }

        let mut last_error = None;
        for attempt in 0..self.config.max_retries {
            match self.send_once(message) {
                Ok(()) => {
                    *failed_at = None;
                    return Ok(());
                }
                Err(e) => {
                    log::debug!(
                        "Cue send attempt {} to {} failed: {}",
                        attempt + 1,
                        self.config.addr,
                        e
                    );
                    last_error = Some(e);
                    if attempt + 1 < self.config.max_retries {
                        thread::sleep(self.config.retry_delay);
                    }
                }
            }
        }

        *failed_at = Some(Instant::now());
        Err(Error::Egress(match last_error {
            Some(e) => format!("{} unreachable: {}", self.config.addr, e),
            None => format!("{} unreachable: no attempts configured", self.config.addr),
        }))
    }

    fn send_once(&self, message: &str) -> std::io::Result<()> {
        let mut stream =
            TcpStream::connect_timeout(&self.config.addr, self.config.connect_timeout)?;
        stream.write_all(message.as_bytes())?;
        stream.flush()?;
        let _ = stream.shutdown(Shutdown::Write);
        Ok(())
    }
}

impl CueSink for TcpCueSender {
    fn send(&self, notification: &CueNotification) -> crate::Result<()> {
        let json = serde_json::to_string(notification)?;
        self.send_with_retry(&json)
    }
}
