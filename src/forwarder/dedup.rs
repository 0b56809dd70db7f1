// ABOUTME: Fire-once gate for cue notifications
// ABOUTME: Tracks which (track, cue) pairs were already reported, re-arming on seek-back

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Identity of a cue within a track
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CueKey {
    /// Track identity (the host reports the title)
    pub track: String,
    /// Cue index as text
    pub cue: String,
}

impl CueKey {
    /// Create a key
    pub fn new(track: impl Into<String>, cue: impl Into<String>) -> Self {
        Self {
            track: track.into(),
            cue: cue.into(),
        }
    }
}

/// What the gate decided for one observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Cue passed for the first time: notify
    Fire,
    /// Cue passed and already notified
    Suppressed,
    /// Cursor is before the cue and the key was removed
    Rearmed,
    /// Cursor is before the cue, nothing to do
    Ahead,
}

/// Set of cues already notified
#[derive(Debug, Default)]
pub struct DedupGate {
    sent: HashSet<CueKey>,
}

/// Gate shared between the poller and the reset listener
pub type SharedDedupGate = Arc<Mutex<DedupGate>>;

impl DedupGate {
    /// Create an empty gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty gate wrapped for sharing
    pub fn shared() -> SharedDedupGate {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Record one observation of a cue at `cue_percent` with playback at `cursor_percent`
    pub fn observe(&mut self, key: CueKey, cursor_percent: f64, cue_percent: f64) -> GateDecision {
        if cursor_percent < cue_percent {
            if self.sent.remove(&key) {
                GateDecision::Rearmed
            } else {
                GateDecision::Ahead
            }
        } else if self.sent.insert(key) {
            GateDecision::Fire
        } else {
            GateDecision::Suppressed
        }
    }

    /// Forget every notified cue
    pub fn reset(&mut self) {
        self.sent.clear();
    }

    /// Whether a cue is currently marked as notified
    pub fn contains(&self, key: &CueKey) -> bool {
        self.sent.contains(key)
    }

    /// Number of notified cues
    pub fn len(&self) -> usize {
        self.sent.len()
    }

    /// Check if no cue is marked
    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }
}
