// ABOUTME: Wire format module for hotcue-bridge
// ABOUTME: Line framing, event grammar, HTTP request classification and JSON messages

/// Byte stream to line framing
pub mod framer;
/// Line protocol event grammar
pub mod event;
/// Minimal HTTP/1.1 request classifier and response writer
pub mod http;
/// JSON message types (scene tree, cue notifications)
pub mod messages;

pub use event::{parse_line, Event, EventKind};
pub use framer::LineFramer;
pub use http::{classify_request, RequestKind};
pub use messages::{CueNotification, FilterNode, HotCueType, SceneNode, SceneTree, SourceNode};
