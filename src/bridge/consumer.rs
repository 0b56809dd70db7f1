// ABOUTME: Per-tick consumer draining the event queue into the renderer host
// ABOUTME: Parses each queued line and dispatches recognized events, logging the rest

use crate::bridge::host::{SceneController, Switch};
use crate::bridge::queue::EventQueue;
use crate::error::Error;
use crate::protocol::event::{parse_line, Event, EventKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

/// Outcome of one drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Lines taken from the queue
    pub lines: usize,
    /// Events applied to the host
    pub dispatched: usize,
    /// Events dropped (unknown type, missing argument, host error)
    pub skipped: usize,
}

/// Drains the event queue without ever blocking the host tick
#[derive(Debug, Clone)]
pub struct EventConsumer {
    queue: Arc<EventQueue>,
}

impl EventConsumer {
    /// Create a consumer for `queue`
    pub fn new(queue: Arc<EventQueue>) -> Self {
        Self { queue }
    }

    /// Take every line currently queued and dispatch its events to `host`
    pub fn drain(&self, host: &dyn SceneController) -> DrainStats {
        let mut stats = DrainStats::default();

        while let Some(line) = self.queue.try_pop() {
            stats.lines += 1;
            log::debug!("Received event line: {}", line);

            for event in parse_line(&line) {
                match dispatch(&event, host) {
                    Ok(()) => stats.dispatched += 1,
                    Err(e) => {
                        stats.skipped += 1;
                        log::warn!("Dropped event from '{}': {}", line, e);
                    }
                }
            }
        }

        stats
    }
}

/// Apply one event to the host
pub fn dispatch(event: &Event, host: &dyn SceneController) -> crate::Result<()> {
    match event.kind {
        EventKind::ShowSource => source_switch(event, host, Switch::On),
        EventKind::HideSource => source_switch(event, host, Switch::Off),
        EventKind::ToggleSource => source_switch(event, host, Switch::Toggle),
        EventKind::ShowFilter => filter_switch(event, host, Switch::On),
        EventKind::HideFilter => filter_switch(event, host, Switch::Off),
        EventKind::ToggleFilter => filter_switch(event, host, Switch::Toggle),
        EventKind::SwitchScene => {
            let scene = required(event, event.scene_name.as_deref(), "scene_name")?;
            host.switch_scene(scene)
        }
        EventKind::Unknown => Err(Error::UnknownEvent(event.token.clone())),
    }
}

fn source_switch(event: &Event, host: &dyn SceneController, switch: Switch) -> crate::Result<()> {
    let source = required(event, event.source_name.as_deref(), "source_name")?;
    let scene = event.scene_name.as_deref().filter(|s| !s.is_empty());
    host.set_source_visible(scene, source, switch)
}

fn filter_switch(event: &Event, host: &dyn SceneController, switch: Switch) -> crate::Result<()> {
    let source = required(event, event.source_name.as_deref(), "source_name")?;
    let filter = required(event, event.filter_name.as_deref(), "filter_name")?;
    host.set_filter_enabled(source, filter, switch)
}

fn required<'a>(
    event: &Event,
    value: Option<&'a str>,
    key: &'static str,
) -> crate::Result<&'a str> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(Error::MissingArgument {
            event: event.kind.as_str(),
            key,
        })
}

/// Shortest tick the consumer task runs at
pub const MIN_TICK: Duration = Duration::from_millis(1);

/// Spawn a tokio task that drains the queue every `tick`.
///
/// Stands in for a renderer's per-frame callback. Returns the task handle and a
/// shutdown sender; sending `true` ends the task after one final drain. Ticks
/// shorter than [`MIN_TICK`] are raised to it.
pub fn spawn_tick_consumer(
    consumer: EventConsumer,
    host: Arc<dyn SceneController>,
    tick: Duration,
) -> (tokio::task::JoinHandle<()>, watch::Sender<bool>) {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        let mut ticker = interval(tick.max(MIN_TICK));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let stats = consumer.drain(host.as_ref());
                    if stats.lines > 0 {
                        log::debug!("Tick drained {:?}", stats);
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        consumer.drain(host.as_ref());
                        log::info!("Event consumer shutting down");
                        break;
                    }
                }
            }
        }
    });

    (handle, shutdown_tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::host::{MemoryScene, MemorySource};

    fn host() -> MemoryScene {
        MemoryScene::default()
            .with_scene(
                "Main",
                vec![MemorySource::new("Cam").with_filter("Blur", "blur_filter")],
            )
            .with_scene("Break", vec![MemorySource::new("Cam")])
    }

    #[test]
    fn test_drain_dispatches_in_order() {
        let queue = Arc::new(EventQueue::new());
        queue.push("hide_source -source_name Cam");
        queue.push(
            "toggle_source -scene_name Main -source_name Cam; switch_scene -scene_name Break",
        );
        let host = host();

        let stats = EventConsumer::new(Arc::clone(&queue)).drain(&host);
        assert_eq!(
            stats,
            DrainStats {
                lines: 2,
                dispatched: 3,
                skipped: 0
            }
        );
        assert_eq!(host.is_visible("Main", "Cam"), Some(true));
        assert_eq!(host.current_scene().as_deref(), Some("Break"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_unknown_and_invalid_events_skipped() {
        let queue = Arc::new(EventQueue::new());
        queue.push("frobnicate -x 1; show_filter -source_name Cam");
        queue.push("hide_filter -source_name Cam -filter_name Blur");
        let host = host();

        let stats = EventConsumer::new(queue).drain(&host);
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.skipped, 2);
        assert_eq!(host.is_filter_enabled("Cam", "Blur"), Some(false));
    }

    #[test]
    fn test_unknown_event_error() {
        let host = host();
        let event = &parse_line("frobnicate -x 1")[0];
        let err = dispatch(event, &host).unwrap_err();
        assert!(matches!(err, Error::UnknownEvent(ref token) if token == "frobnicate"));
        assert_eq!(err.to_string(), "Unknown event type 'frobnicate'");
    }

    #[test]
    fn test_empty_scene_name_means_current() {
        let host = host();
        let event = &parse_line("hide_source -scene_name -source_name Cam")[0];
        dispatch(event, &host).unwrap();
        assert_eq!(host.is_visible("Main", "Cam"), Some(false));
        assert_eq!(host.is_visible("Break", "Cam"), Some(true));
    }

    #[test]
    fn test_missing_argument_error() {
        let host = host();
        let event = &parse_line("switch_scene -scene_name")[0];
        let err = dispatch(event, &host).unwrap_err();
        assert_eq!(err.to_string(), "switch_scene requires -scene_name");
    }

    #[test]
    fn test_drain_on_closed_queue() {
        let queue = Arc::new(EventQueue::new());
        queue.push("show_source -source_name Cam");
        queue.close();

        let consumer = EventConsumer::new(Arc::clone(&queue));
        assert_eq!(consumer.drain(&host()).lines, 1);
        assert_eq!(consumer.drain(&host()).lines, 0);
    }

    #[tokio::test]
    async fn test_tick_task_drains_and_stops() {
        let queue = Arc::new(EventQueue::new());
        let host = Arc::new(host());
        let (handle, shutdown) = spawn_tick_consumer(
            EventConsumer::new(Arc::clone(&queue)),
            host.clone(),
            Duration::from_millis(5),
        );

        queue.push("switch_scene -scene_name Break");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(host.current_scene().as_deref(), Some("Break"));

        shutdown.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_zero_tick_still_drains() {
        let queue = Arc::new(EventQueue::new());
        let host = Arc::new(host());
        let (handle, shutdown) = spawn_tick_consumer(
            EventConsumer::new(Arc::clone(&queue)),
            host.clone(),
            Duration::ZERO,
        );

        queue.push("switch_scene -scene_name Break");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(host.current_scene().as_deref(), Some("Break"));

        shutdown.send(true).unwrap();
        assert!(handle.await.is_ok());
    }
}
