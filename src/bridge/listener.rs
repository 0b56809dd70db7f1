// ABOUTME: Line protocol TCP listener feeding the event queue
// ABOUTME: Serves one connection at a time on a worker thread with prompt, idempotent shutdown

use crate::bridge::config::BridgeConfig;
use crate::bridge::queue::EventQueue;
use crate::error::Error;
use crate::protocol::framer::LineFramer;
use parking_lot::Mutex;
use std::io::{self, Read};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const READ_BUFFER_SIZE: usize = 4096;

/// Listener lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Never started
    Idle,
    /// Waiting for a client
    Listening,
    /// Reading from a connected client
    Serving,
    /// Worker thread has exited
    Stopped,
}

/// Why a connection's read loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEnd {
    /// Peer closed the stream
    Eof,
    /// Read failed with something other than a timeout
    ReadError,
    /// Shutdown was requested
    Stopped,
    /// The queue refused a line; the listener must stop
    QueueClosed,
}

/// State shared between the owner and the worker thread
#[derive(Debug)]
struct Shared {
    stop: AtomicBool,
    /// Clone of the active client socket so `stop` can unblock a pending read
    client: Mutex<Option<TcpStream>>,
    state: Mutex<ListenerState>,
}

/// Accepts line protocol clients on a loopback port and queues every framed line.
///
/// Only one client is served at a time; further connection attempts wait in the
/// OS backlog. Dropping the listener stops it.
#[derive(Debug)]
pub struct TcpEventListener {
    addr: SocketAddr,
    read_timeout: Duration,
    accept_poll_interval: Duration,
    shared: Arc<Shared>,
    local_addr: Option<SocketAddr>,
    handle: Option<thread::JoinHandle<()>>,
}

impl TcpEventListener {
    /// Create an idle listener for `addr` with default timings
    pub fn new(addr: SocketAddr) -> Self {
        Self::with_config(&BridgeConfig::default().event_addr(addr))
    }

    /// Create an idle listener from bridge configuration
    pub fn with_config(config: &BridgeConfig) -> Self {
        Self {
            addr: config.event_addr,
            read_timeout: config.read_timeout,
            accept_poll_interval: config.accept_poll_interval,
            shared: Arc::new(Shared {
                stop: AtomicBool::new(false),
                client: Mutex::new(None),
                state: Mutex::new(ListenerState::Idle),
            }),
            local_addr: None,
            handle: None,
        }
    }

    /// Bind and start the worker thread.
    ///
    /// A listener that is already running is stopped first. Bind failures are
    /// logged and returned; no thread is left behind.
    pub fn start(&mut self, queue: Arc<EventQueue>) -> crate::Result<SocketAddr> {
        self.stop();

        let listener = TcpListener::bind(self.addr).map_err(|source| {
            log::error!("Event listener bind failed on {}: {}", self.addr, source);
            Error::Bind {
                addr: self.addr,
                source,
            }
        })?;
        // Non-blocking accept lets the worker observe the stop flag between polls
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        self.shared.stop.store(false, Ordering::Release);
        *self.shared.state.lock() = ListenerState::Listening;

        let worker = Worker {
            shared: Arc::clone(&self.shared),
            queue,
            read_timeout: self.read_timeout,
            accept_poll_interval: self.accept_poll_interval,
        };
        let handle = thread::Builder::new()
            .name("hotcue-ingress".to_string())
            .spawn(move || worker.run(listener))
            .map_err(|e| {
                *self.shared.state.lock() = ListenerState::Stopped;
                e
            })?;

        log::info!("Listening for hot cue events on {}", local_addr);
        self.local_addr = Some(local_addr);
        self.handle = Some(handle);
        Ok(local_addr)
    }

    /// Stop the worker: set the flag, force-close the active client, join.
    ///
    /// Safe to call repeatedly and on a listener that never started.
    pub fn stop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);

        if let Some(client) = self.shared.client.lock().take() {
            let _ = client.shutdown(Shutdown::Both);
        }

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Event listener thread panicked");
            }
            log::info!("Event listener on {:?} stopped", self.local_addr);
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ListenerState {
        *self.shared.state.lock()
    }

    /// Whether the worker thread is still alive
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

impl Drop for TcpEventListener {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    shared: Arc<Shared>,
    queue: Arc<EventQueue>,
    read_timeout: Duration,
    accept_poll_interval: Duration,
}

impl Worker {
    fn stopping(&self) -> bool {
        self.shared.stop.load(Ordering::Acquire)
    }

    fn run(self, listener: TcpListener) {
        while !self.stopping() {
            match listener.accept() {
                Ok((stream, peer)) => {
                    log::debug!("Event client connected from {}", peer);
                    let end = self.serve(stream);
                    log::debug!("Event client {} finished: {:?}", peer, end);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(self.accept_poll_interval);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    log::warn!("Event listener accept failed: {}", e);
                    thread::sleep(self.accept_poll_interval);
                }
            }
        }

        *self.shared.state.lock() = ListenerState::Stopped;
        log::debug!("Event listener thread exiting");
        // `listener` drops here, closing the listening socket
    }

    fn serve(&self, mut stream: TcpStream) -> ConnectionEnd {
        let configured = stream
            .set_nonblocking(false)
            .and_then(|_| stream.set_read_timeout(Some(self.read_timeout)));
        if let Err(e) = configured {
            log::warn!("Failed to configure event connection: {}", e);
            return ConnectionEnd::ReadError;
        }

        *self.shared.client.lock() = stream.try_clone().ok();
        *self.shared.state.lock() = ListenerState::Serving;

        let end = pump_connection(&mut stream, &self.queue, &self.shared.stop);

        if let Some(client) = self.shared.client.lock().take() {
            let _ = client.shutdown(Shutdown::Both);
        }
        if end == ConnectionEnd::QueueClosed {
            self.shared.stop.store(true, Ordering::Release);
        } else if !self.stopping() {
            *self.shared.state.lock() = ListenerState::Listening;
        }
        end
    }
}

/// Read `reader` until EOF, error or shutdown, queueing every framed line.
///
/// Timeouts are retried. At EOF the unterminated remainder is flushed unless a
/// stop was requested. A refused push sets `stop` and ends the loop at once.
pub fn pump_connection<R: Read>(
    reader: &mut R,
    queue: &EventQueue,
    stop: &AtomicBool,
) -> ConnectionEnd {
    let mut framer = LineFramer::new();
    let mut buffer = [0u8; READ_BUFFER_SIZE];

    let end = loop {
        if stop.load(Ordering::Acquire) {
            return ConnectionEnd::Stopped;
        }

        match reader.read(&mut buffer) {
            Ok(0) => break ConnectionEnd::Eof,
            Ok(n) => {
                for line in framer.feed(&buffer[..n]) {
                    if !queue.push(line) {
                        return refuse(stop);
                    }
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => {
                log::debug!("Event connection read failed: {}", e);
                break ConnectionEnd::ReadError;
            }
        }
    };

    if stop.load(Ordering::Acquire) {
        return ConnectionEnd::Stopped;
    }
    if let Some(line) = framer.finish() {
        if !queue.push(line) {
            return refuse(stop);
        }
    }
    end
}

fn refuse(stop: &AtomicBool) -> ConnectionEnd {
    log::warn!("Event queue closed, stopping listener");
    stop.store(true, Ordering::Release);
    ConnectionEnd::QueueClosed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Reader that replays chunks and errors, then reports EOF
    struct ScriptedReader {
        steps: VecDeque<io::Result<Vec<u8>>>,
    }

    impl ScriptedReader {
        fn new() -> Self {
            Self {
                steps: VecDeque::new(),
            }
        }

        fn chunk(mut self, bytes: &[u8]) -> Self {
            self.steps.push_back(Ok(bytes.to_vec()));
            self
        }

        fn error(mut self, kind: io::ErrorKind) -> Self {
            self.steps.push_back(Err(io::Error::from(kind)));
            self
        }
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.steps.pop_front() {
                None => Ok(0),
                Some(Err(e)) => Err(e),
                Some(Ok(bytes)) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
            }
        }
    }

    fn drain(queue: &EventQueue) -> Vec<String> {
        std::iter::from_fn(|| queue.try_pop()).collect()
    }

    #[test]
    fn test_lines_across_reads_and_timeouts() {
        let queue = EventQueue::new();
        let stop = AtomicBool::new(false);
        let mut reader = ScriptedReader::new()
            .chunk(b"show_source -sou")
            .error(io::ErrorKind::TimedOut)
            .chunk(b"rce_name Cam\r\nhide_")
            .error(io::ErrorKind::WouldBlock)
            .chunk(b"source -source_name Cam\n");

        let end = pump_connection(&mut reader, &queue, &stop);
        assert_eq!(end, ConnectionEnd::Eof);
        assert_eq!(
            drain(&queue),
            vec!["show_source -source_name Cam", "hide_source -source_name Cam"]
        );
        assert!(!stop.load(Ordering::Acquire));
    }

    #[test]
    fn test_remainder_flushed_at_eof() {
        let queue = EventQueue::new();
        let stop = AtomicBool::new(false);
        let mut reader = ScriptedReader::new().chunk(b"a\nswitch_scene -scene_name End");

        pump_connection(&mut reader, &queue, &stop);
        assert_eq!(drain(&queue), vec!["a", "switch_scene -scene_name End"]);
    }

    #[test]
    fn test_read_error_ends_connection_and_flushes() {
        let queue = EventQueue::new();
        let stop = AtomicBool::new(false);
        let mut reader = ScriptedReader::new()
            .chunk(b"tail")
            .error(io::ErrorKind::ConnectionReset)
            .chunk(b"never read\n");

        let end = pump_connection(&mut reader, &queue, &stop);
        assert_eq!(end, ConnectionEnd::ReadError);
        assert_eq!(drain(&queue), vec!["tail"]);
    }

    #[test]
    fn test_closed_queue_stops_listener() {
        let queue = EventQueue::new();
        queue.close();
        let stop = AtomicBool::new(false);
        let mut reader = ScriptedReader::new().chunk(b"one\ntwo\n");

        let end = pump_connection(&mut reader, &queue, &stop);
        assert_eq!(end, ConnectionEnd::QueueClosed);
        assert!(stop.load(Ordering::Acquire));
    }

    #[test]
    fn test_stop_flag_skips_flush() {
        let queue = EventQueue::new();
        let stop = AtomicBool::new(true);
        let mut reader = ScriptedReader::new().chunk(b"partial");

        let end = pump_connection(&mut reader, &queue, &stop);
        assert_eq!(end, ConnectionEnd::Stopped);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let mut listener = TcpEventListener::new("127.0.0.1:0".parse().unwrap());
        listener.stop();
        listener.stop();
        assert_eq!(listener.state(), ListenerState::Idle);
        assert!(!listener.is_running());
        assert_eq!(listener.local_addr(), None);
    }

    #[test]
    fn test_bind_conflict_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap();

        let mut listener = TcpEventListener::new(addr);
        let result = listener.start(Arc::new(EventQueue::new()));
        assert!(matches!(result, Err(Error::Bind { .. })));
        assert!(!listener.is_running());
    }
}
