// ABOUTME: Reset control channel for the dedup gate
// ABOUTME: Any loopback connection whose payload contains `reset` clears the notified set

use crate::error::Error;
use crate::forwarder::dedup::SharedDedupGate;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const RESET_TOKEN: &str = "reset";
const MAX_PAYLOAD: usize = 255;
const PAYLOAD_TIMEOUT: Duration = Duration::from_millis(500);

/// Accepts one-shot reset connections on a worker thread
#[derive(Debug)]
pub struct ResetListener {
    addr: SocketAddr,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
    local_addr: Option<SocketAddr>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ResetListener {
    /// Create an idle listener for `addr`
    pub fn new(addr: SocketAddr, poll_interval: Duration) -> Self {
        Self {
            addr,
            poll_interval,
            running: Arc::new(AtomicBool::new(false)),
            local_addr: None,
            handle: None,
        }
    }

    /// Bind and start serving reset requests against `gate`
    pub fn start(&mut self, gate: SharedDedupGate) -> crate::Result<SocketAddr> {
        self.stop();

        let listener = TcpListener::bind(self.addr).map_err(|source| {
            log::error!("Reset listener bind failed on {}: {}", self.addr, source);
            Error::Bind {
                addr: self.addr,
                source,
            }
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        self.running.store(true, Ordering::Release);
        let running = Arc::clone(&self.running);
        let poll_interval = self.poll_interval;
        let handle = thread::Builder::new()
            .name("hotcue-reset".to_string())
            .spawn(move || accept_loop(listener, gate, running, poll_interval))?;

        log::info!("Reset listener on {}", local_addr);
        self.local_addr = Some(local_addr);
        self.handle = Some(handle);
        Ok(local_addr)
    }

    /// Stop and join the worker. Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Reset listener thread panicked");
            }
        }
    }

    /// Address actually bound
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

impl Drop for ResetListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(
    listener: TcpListener,
    gate: SharedDedupGate,
    running: Arc<AtomicBool>,
    poll_interval: Duration,
) {
    while running.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((stream, peer)) => match read_payload(stream) {
                Ok(payload) if payload.contains(RESET_TOKEN) => {
                    let mut gate = gate.lock();
                    let cleared = gate.len();
                    gate.reset();
                    log::info!("Reset from {} cleared {} notified cue(s)", peer, cleared);
                }
                Ok(payload) => log::debug!("Ignoring control payload from {}: {:?}", peer, payload),
                Err(e) => log::debug!("Reset connection from {} failed: {}", peer, e),
            },
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(poll_interval),
            Err(e) => {
                log::warn!("Reset listener accept failed: {}", e);
                thread::sleep(poll_interval);
            }
        }
    }
}

fn read_payload(mut stream: TcpStream) -> io::Result<String> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(PAYLOAD_TIMEOUT))?;

    let mut buffer = [0u8; MAX_PAYLOAD];
    let n = stream.read(&mut buffer)?;
    let _ = stream.shutdown(Shutdown::Both);
    Ok(String::from_utf8_lossy(&buffer[..n]).into_owned())
}

/// Ask the forwarder at `addr` to clear its dedup gate
pub fn send_reset(addr: SocketAddr, timeout: Duration) -> crate::Result<()> {
    let mut stream = TcpStream::connect_timeout(&addr, timeout)?;
    stream.write_all(RESET_TOKEN.as_bytes())?;
    stream.shutdown(Shutdown::Write)?;
    Ok(())
}
