// ABOUTME: Line protocol event grammar
// ABOUTME: Parses `type -key value` segments separated by semicolons into typed events

use std::fmt;

/// Event type named by the first token of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Make a source visible
    ShowSource,
    /// Make a source invisible
    HideSource,
    /// Flip a source's visibility
    ToggleSource,
    /// Enable a filter on a source
    ShowFilter,
    /// Disable a filter on a source
    HideFilter,
    /// Flip a filter's enabled state
    ToggleFilter,
    /// Change the program scene
    SwitchScene,
    /// Type token not in the table
    Unknown,
}

impl EventKind {
    /// Match a type token (case-sensitive)
    pub fn from_token(token: &str) -> Self {
        match token {
            "show_source" => EventKind::ShowSource,
            "hide_source" => EventKind::HideSource,
            "toggle_source" => EventKind::ToggleSource,
            "show_filter" => EventKind::ShowFilter,
            "hide_filter" => EventKind::HideFilter,
            "toggle_filter" => EventKind::ToggleFilter,
            "switch_scene" => EventKind::SwitchScene,
            _ => EventKind::Unknown,
        }
    }

    /// Convert to protocol token
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ShowSource => "show_source",
            EventKind::HideSource => "hide_source",
            EventKind::ToggleSource => "toggle_source",
            EventKind::ShowFilter => "show_filter",
            EventKind::HideFilter => "hide_filter",
            EventKind::ToggleFilter => "toggle_filter",
            EventKind::SwitchScene => "switch_scene",
            EventKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed event segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Event type
    pub kind: EventKind,
    /// Verbatim type token (kept for diagnostics on unknown types)
    pub token: String,
    /// `-scene_name` argument
    pub scene_name: Option<String>,
    /// `-source_name` argument
    pub source_name: Option<String>,
    /// `-filter_name` argument
    pub filter_name: Option<String>,
}

impl Event {
    fn new(token: &str) -> Self {
        Self {
            kind: EventKind::from_token(token),
            token: token.to_string(),
            scene_name: None,
            source_name: None,
            filter_name: None,
        }
    }

    /// Whether the type token was recognized
    pub fn is_known(&self) -> bool {
        self.kind != EventKind::Unknown
    }

    fn set(&mut self, key: &str, value: &str) {
        let slot = match key {
            "scene_name" => &mut self.scene_name,
            "source_name" => &mut self.source_name,
            "filter_name" => &mut self.filter_name,
            _ => return,
        };
        *slot = Some(value.to_string());
    }
}

/// Parse one framed line into zero or more events, one per non-empty `;` segment.
///
/// Unknown type tokens still produce an event (kind [`EventKind::Unknown`]) so the
/// caller can report them; they never stop the remaining segments from parsing.
pub fn parse_line(line: &str) -> Vec<Event> {
    line.split(';').filter_map(parse_segment).collect()
}

/// Parse a single segment. Returns `None` for a blank segment.
pub fn parse_segment(segment: &str) -> Option<Event> {
    let mut tokens = segment.split_ascii_whitespace().peekable();
    let mut event = Event::new(tokens.next()?);

    while let Some(token) = tokens.next() {
        let Some(key) = token.strip_prefix('-') else {
            // Stray value with no key
            continue;
        };

        match tokens.peek() {
            Some(next) if next.starts_with('-') => event.set(key, ""),
            Some(_) => {
                if let Some(value) = tokens.next() {
                    event.set(key, value);
                }
            }
            // Dangling key at end of input stays unset
            None => {}
        }
    }

    Some(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_filter() {
        let events = parse_line("toggle_filter -source_name Cam -filter_name Blur");
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.kind, EventKind::ToggleFilter);
        assert_eq!(event.source_name.as_deref(), Some("Cam"));
        assert_eq!(event.filter_name.as_deref(), Some("Blur"));
        assert_eq!(event.scene_name, None);
    }

    #[test]
    fn test_unknown_type_does_not_stop_line() {
        let events = parse_line("frobnicate -x 1; show_source -source_name A");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Unknown);
        assert_eq!(events[0].token, "frobnicate");
        assert!(!events[0].is_known());
        assert_eq!(events[1].kind, EventKind::ShowSource);
        assert_eq!(events[1].source_name.as_deref(), Some("A"));
    }

    #[test]
    fn test_dangling_flag_mid_line() {
        let events = parse_line("show_source -source_name -filter_name F");
        assert_eq!(events[0].source_name.as_deref(), Some(""));
        assert_eq!(events[0].filter_name.as_deref(), Some("F"));
    }

    #[test]
    fn test_dangling_flag_at_end() {
        let events = parse_line("switch_scene -scene_name");
        assert_eq!(events[0].kind, EventKind::SwitchScene);
        assert_eq!(events[0].scene_name, None);
    }

    #[test]
    fn test_empty_segments_discarded() {
        assert!(parse_line("").is_empty());
        assert!(parse_line(" ; ;\t").is_empty());
        let events = parse_line(";hide_source -source_name B;;");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::HideSource);
    }

    #[test]
    fn test_type_is_case_sensitive() {
        let events = parse_line("Show_Source -source_name A");
        assert_eq!(events[0].kind, EventKind::Unknown);
        assert_eq!(events[0].token, "Show_Source");
    }

    #[test]
    fn test_stray_values_and_unknown_keys_skipped() {
        let events = parse_line("show_source stray -color red -source_name Cam extra");
        assert_eq!(events[0].source_name.as_deref(), Some("Cam"));
        assert_eq!(events[0].scene_name, None);
    }

    #[test]
    fn test_whitespace_runs() {
        let events = parse_line("  switch_scene \t -scene_name\t\tIntro  ");
        assert_eq!(events[0].scene_name.as_deref(), Some("Intro"));
    }

    #[test]
    fn test_later_value_overrides() {
        let events = parse_line("show_source -source_name A -source_name B");
        assert_eq!(events[0].source_name.as_deref(), Some("B"));
    }

    #[test]
    fn test_kind_round_trip_tokens() {
        for kind in [
            EventKind::ShowSource,
            EventKind::HideSource,
            EventKind::ToggleSource,
            EventKind::ShowFilter,
            EventKind::HideFilter,
            EventKind::ToggleFilter,
            EventKind::SwitchScene,
        ] {
            assert_eq!(EventKind::from_token(kind.as_str()), kind);
        }
    }
}
