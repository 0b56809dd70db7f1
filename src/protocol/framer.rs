// ABOUTME: Line framing for the event ingress stream
// ABOUTME: Reassembles newline-terminated lines from arbitrarily split reads

/// Longest line accepted before the partial content is dropped
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Splits a raw byte stream into logical lines.
///
/// Lines end at `\n`; one `\r` directly before the terminator is dropped. Content
/// without a terminator is buffered until the next [`feed`](Self::feed) or until
/// [`finish`](Self::finish) flushes it at end of stream. Blank lines are never
/// emitted. A line longer than the limit is dropped up to its terminator.
#[derive(Debug)]
pub struct LineFramer {
    pending: Vec<u8>,
    max_line: usize,
    /// Skipping the rest of an oversized line
    discarding: bool,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineFramer {
    /// Create an empty framer with the default line limit
    pub fn new() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }

    /// Create an empty framer dropping lines longer than `max_line` bytes
    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            pending: Vec::with_capacity(256),
            max_line: max_line.max(1),
            discarding: false,
        }
    }

    /// Feed one chunk of bytes, returning every line it completes in stream order
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut segment_start = 0;

        for (i, &byte) in chunk.iter().enumerate() {
            if byte != b'\n' {
                continue;
            }
            if self.discarding {
                self.discarding = false;
            } else if self.append(&chunk[segment_start..i]) {
                if let Some(line) = take_line(&mut self.pending) {
                    lines.push(line);
                }
            } else {
                // Oversized and terminated here, nothing left to skip
                self.discarding = false;
            }
            segment_start = i + 1;
        }

        if !self.discarding {
            self.append(&chunk[segment_start..]);
        }
        lines
    }

    /// Buffer `bytes`, dropping the partial line if it outgrows the limit
    fn append(&mut self, bytes: &[u8]) -> bool {
        if self.pending.len() + bytes.len() > self.max_line {
            log::warn!("Dropping event line longer than {} bytes", self.max_line);
            self.pending.clear();
            self.discarding = true;
            return false;
        }
        self.pending.extend_from_slice(bytes);
        true
    }

    /// Flush the unterminated remainder at end of stream
    pub fn finish(&mut self) -> Option<String> {
        self.discarding = false;
        take_line(&mut self.pending)
    }

    /// Discard any buffered partial line (start of a new connection)
    pub fn reset(&mut self) {
        self.pending.clear();
        self.discarding = false;
    }

    /// Number of buffered bytes not yet terminated
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn take_line(pending: &mut Vec<u8>) -> Option<String> {
    if pending.last() == Some(&b'\r') {
        pending.pop();
    }
    let line = String::from_utf8_lossy(pending).into_owned();
    pending.clear();

    if line.trim().is_empty() {
        None
    } else {
        Some(line)
    }
}
