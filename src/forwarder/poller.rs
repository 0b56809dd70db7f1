// ABOUTME: Deck poller detecting passed cues
// ABOUTME: Samples the DJ host at a fixed cadence and emits one notification per passed cue

use crate::forwarder::dedup::{CueKey, GateDecision, SharedDedupGate};
use crate::forwarder::info::InfoSource;
use crate::forwarder::sender::CueSink;
use crate::protocol::messages::{CueNotification, HotCueType};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Decks scanned on every poll
pub const DECKS: std::ops::RangeInclusive<u8> = 1..=4;
/// Cue slots scanned per deck
pub const CUES_PER_DECK: std::ops::RangeInclusive<u16> = 1..=128;

/// Scans every audible deck and forwards cues the playback cursor has passed
pub struct CuePoller {
    info: Arc<dyn InfoSource>,
    gate: SharedDedupGate,
    sink: Arc<dyn CueSink>,
}

impl CuePoller {
    /// Create a poller
    pub fn new(info: Arc<dyn InfoSource>, gate: SharedDedupGate, sink: Arc<dyn CueSink>) -> Self {
        Self { info, gate, sink }
    }

    /// Run one scan over all decks, returning the notifications handed to the sink
    pub fn poll_once(&self) -> Vec<CueNotification> {
        let mut fired = Vec::new();
        for deck in DECKS {
            self.scan_deck(deck, &mut fired);
        }

        for notification in &fired {
            if let Err(e) = self.sink.send(notification) {
                log::warn!(
                    "Failed to forward cue '{}' on deck mask {}: {}",
                    notification.cue_name,
                    notification.deck,
                    e
                );
            }
        }
        fired
    }

    fn scan_deck(&self, deck: u8, fired: &mut Vec<CueNotification>) {
        let query = |what: &str| format!("deck {deck} {what}");

        let audible = self
            .info
            .get_string(&query("is_audible"))
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !matches!(audible.as_str(), "on" | "yes" | "true") {
            return;
        }

        let title = self.info.get_string(&query("get_title")).unwrap_or_default();
        if title.is_empty() {
            return;
        }

        let cursor = match self.info.get_double(&query("get_position")) {
            Some(pos) if pos >= 0.0 => pos,
            _ => return,
        };

        let mut gate = self.gate.lock();
        for cue in CUES_PER_DECK {
            let has_cue = self
                .info
                .get_string(&query(&format!("has_cue {cue}")))
                .unwrap_or_default();
            if !has_cue.eq_ignore_ascii_case("on") {
                continue;
            }

            // A failed or negative position lookup leaves the cue alone
            let cue_pos = match self.info.get_double(&query(&format!("cue_pos {cue}"))) {
                Some(pos) if pos >= 0.0 => pos,
                _ => continue,
            };

            let key = CueKey::new(title.clone(), cue.to_string());
            if gate.observe(key, cursor, cue_pos) == GateDecision::Fire {
                fired.push(self.describe(deck, cue, &query));
            }
        }
    }

    fn describe(&self, deck: u8, cue: u16, query: &dyn Fn(&str) -> String) -> CueNotification {
        let text = |what: &str| {
            self.info
                .get_string(&query(&format!("{what} {cue}")))
                .unwrap_or_default()
        };

        CueNotification::new(
            deck,
            text("cue_name"),
            text("cue_color"),
            HotCueType::from_host(&text("cue_type")),
            text("cue_display"),
        )
    }

    /// Run the poller on its own thread every `interval`, sleeping in `slice` steps
    pub fn spawn(self, interval: Duration, slice: Duration) -> std::io::Result<PollerHandle> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("hotcue-poller".to_string())
            .spawn(move || {
                log::info!("Cue poller started ({}ms cadence)", interval.as_millis());
                while flag.load(Ordering::Acquire) {
                    let fired = self.poll_once();
                    if !fired.is_empty() {
                        log::debug!("Forwarded {} cue(s)", fired.len());
                    }
                    sleep_while(&flag, interval, slice);
                }
                log::info!("Cue poller stopped");
            })?;

        Ok(PollerHandle {
            running,
            handle: Some(handle),
        })
    }
}

fn sleep_while(flag: &AtomicBool, total: Duration, slice: Duration) {
    let mut remaining = total;
    while flag.load(Ordering::Acquire) && !remaining.is_zero() {
        let step = remaining.min(slice);
        thread::sleep(step);
        remaining -= step;
    }
}

/// Handle to a running poller thread
#[derive(Debug)]
pub struct PollerHandle {
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl PollerHandle {
    /// Signal the poller and join it. Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Cue poller thread panicked");
            }
        }
    }

    /// Whether the thread is still alive
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forwarder::dedup::DedupGate;
    use crate::forwarder::info::MemoryInfo;
    use parking_lot::Mutex;
    use std::time::Instant;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<CueNotification>>,
    }

    impl CueSink for RecordingSink {
        fn send(&self, notification: &CueNotification) -> crate::Result<()> {
            self.sent.lock().push(notification.clone());
            Ok(())
        }
    }

    fn deck_with_cue(info: &MemoryInfo, deck: u8, cursor: f64) {
        info.set_string(format!("deck {deck} is_audible"), "ON");
        info.set_string(format!("deck {deck} get_title"), "Track A");
        info.set_double(format!("deck {deck} get_position"), cursor);
        info.set_string(format!("deck {deck} has_cue 2"), "on");
        info.set_double(format!("deck {deck} cue_pos 2"), 0.5);
        info.set_string(format!("deck {deck} cue_name 2"), "Drop");
        info.set_string(format!("deck {deck} cue_color 2"), "0x40");
        info.set_string(format!("deck {deck} cue_type 2"), "saved loop");
        info.set_string(format!("deck {deck} cue_display 2"), "1:02");
    }

    fn poller(info: Arc<MemoryInfo>) -> (CuePoller, SharedDedupGate, Arc<RecordingSink>) {
        let gate = DedupGate::shared();
        let sink = Arc::new(RecordingSink::default());
        let poller = CuePoller::new(info, Arc::clone(&gate), sink.clone());
        (poller, gate, sink)
    }

    #[test]
    fn test_passed_cue_fires_once() {
        let info = Arc::new(MemoryInfo::new());
        deck_with_cue(&info, 2, 0.7);
        let (poller, _gate, sink) = poller(Arc::clone(&info));

        let fired = poller.poll_once();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].deck, 2);
        assert_eq!(fired[0].cue_name, "Drop");
        assert_eq!(fired[0].cue_color, "0x40");
        assert_eq!(fired[0].hot_cue_type, HotCueType::SavedLoop);
        assert_eq!(fired[0].meta, "1:02");

        assert!(poller.poll_once().is_empty());
        assert_eq!(sink.sent.lock().len(), 1);
    }

    #[test]
    fn test_seek_back_rearms() {
        let info = Arc::new(MemoryInfo::new());
        deck_with_cue(&info, 1, 0.7);
        let (poller, _gate, sink) = poller(Arc::clone(&info));

        poller.poll_once();
        info.set_double("deck 1 get_position", 0.1);
        poller.poll_once();
        info.set_double("deck 1 get_position", 0.9);
        poller.poll_once();
        poller.poll_once();

        assert_eq!(sink.sent.lock().len(), 2);
    }

    #[test]
    fn test_reset_allows_refire() {
        let info = Arc::new(MemoryInfo::new());
        deck_with_cue(&info, 1, 0.7);
        let (poller, gate, sink) = poller(Arc::clone(&info));

        poller.poll_once();
        gate.lock().reset();
        poller.poll_once();
        assert_eq!(sink.sent.lock().len(), 2);
    }

    #[test]
    fn test_silent_or_untitled_decks_skipped() {
        let info = Arc::new(MemoryInfo::new());
        deck_with_cue(&info, 1, 0.7);
        info.set_string("deck 1 is_audible", "off");
        deck_with_cue(&info, 3, 0.7);
        info.set_string("deck 3 get_title", "");
        deck_with_cue(&info, 4, 0.7);
        info.remove("deck 4 get_position");
        let (poller, gate, _sink) = poller(Arc::clone(&info));

        assert!(poller.poll_once().is_empty());
        assert!(gate.lock().is_empty());
    }

    #[test]
    fn test_failed_cue_lookup_is_noop() {
        let info = Arc::new(MemoryInfo::new());
        deck_with_cue(&info, 1, 0.7);
        let (poller, gate, _sink) = poller(Arc::clone(&info));

        poller.poll_once();
        // Cursor regresses but the cue position can no longer be read
        info.set_double("deck 1 get_position", 0.1);
        info.remove("deck 1 cue_pos 2");
        poller.poll_once();
        assert!(gate.lock().contains(&CueKey::new("Track A", "2")));

        info.set_double("deck 1 cue_pos 2", -1.0);
        poller.poll_once();
        assert_eq!(gate.lock().len(), 1);
    }

    #[test]
    fn test_spawned_poller_stops_within_a_slice() {
        let info = Arc::new(MemoryInfo::new());
        deck_with_cue(&info, 1, 0.7);
        let (poller, _gate, sink) = poller(info);

        let mut handle = poller
            .spawn(Duration::from_secs(10), Duration::from_millis(10))
            .unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(handle.is_running());

        let started = Instant::now();
        handle.stop();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!handle.is_running());
        handle.stop();
        assert_eq!(sink.sent.lock().len(), 1);
    }
}
