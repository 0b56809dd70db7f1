// ABOUTME: JSON message type definitions and serialization
// ABOUTME: Scene state tree served over HTTP and cue notifications sent to the egress port

use serde::{Deserialize, Serialize};

/// Root of the scene state document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneTree {
    /// Scenes in host enumeration order
    pub scenes: Vec<SceneNode>,
}

/// A scene and its top-level sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    /// Scene name
    pub name: String,
    /// Sources in host enumeration order
    pub sources: Vec<SourceNode>,
}

/// A source placed in a scene or group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceNode {
    /// Source name
    pub name: String,
    /// Ancestry joined with `/`, starting at the scene
    pub path: String,
    /// Whether the source is a group
    #[serde(rename = "isGroup")]
    pub is_group: bool,
    /// Filters attached to the source
    pub filters: Vec<FilterNode>,
    /// Nested sources (groups only)
    pub sources: Vec<SourceNode>,
}

/// A filter attached to a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterNode {
    /// Filter name
    pub name: String,
    /// Host filter type identifier
    pub kind: String,
}

/// Hot cue type as reported to the orchestration side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HotCueType {
    /// Plain hot cue
    #[serde(rename = "Hot_Cue")]
    HotCue,
    /// Saved loop
    #[serde(rename = "Saved_Loop")]
    SavedLoop,
    /// Action cue
    #[serde(rename = "Action")]
    Action,
    /// Remix point
    #[serde(rename = "Remix_Point")]
    RemixPoint,
    /// Beat grid anchor
    #[serde(rename = "BeatGrid_Anchor")]
    BeatGridAnchor,
    /// Automix point
    #[serde(rename = "Automix_Point")]
    AutomixPoint,
    /// Load point
    #[serde(rename = "Load_Point")]
    LoadPoint,
}

impl HotCueType {
    const ALL: [HotCueType; 7] = [
        HotCueType::HotCue,
        HotCueType::SavedLoop,
        HotCueType::Action,
        HotCueType::RemixPoint,
        HotCueType::BeatGridAnchor,
        HotCueType::AutomixPoint,
        HotCueType::LoadPoint,
    ];

    /// Bit value used by the trigger mappings
    pub fn bit(&self) -> u8 {
        match self {
            HotCueType::HotCue => 1,
            HotCueType::SavedLoop => 2,
            HotCueType::Action => 4,
            HotCueType::RemixPoint => 8,
            HotCueType::BeatGridAnchor => 16,
            HotCueType::AutomixPoint => 32,
            HotCueType::LoadPoint => 64,
        }
    }

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            HotCueType::HotCue => "Hot_Cue",
            HotCueType::SavedLoop => "Saved_Loop",
            HotCueType::Action => "Action",
            HotCueType::RemixPoint => "Remix_Point",
            HotCueType::BeatGridAnchor => "BeatGrid_Anchor",
            HotCueType::AutomixPoint => "Automix_Point",
            HotCueType::LoadPoint => "Load_Point",
        }
    }

    /// Normalize the host's raw cue type text.
    ///
    /// Accepts the wire name, the same name with a space instead of the underscore
    /// (both case-insensitive) or the decimal bit value. Anything else is a plain
    /// hot cue.
    pub fn from_host(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace(' ', "_");
        Self::ALL
            .into_iter()
            .find(|t| {
                t.as_str().eq_ignore_ascii_case(&normalized) || t.bit().to_string() == normalized
            })
            .unwrap_or(HotCueType::HotCue)
    }
}

/// Outbound notification emitted once per passed cue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CueNotification {
    /// Always `"None"`; matching happens downstream
    #[serde(rename = "CueMatchType")]
    pub cue_match_type: String,
    /// Cue label
    #[serde(rename = "CueName")]
    pub cue_name: String,
    /// Raw host cue colour
    #[serde(rename = "CueColor")]
    pub cue_color: String,
    /// Deck bitmask, `1 << (deck - 1)`
    #[serde(rename = "Deck")]
    pub deck: u8,
    /// Normalized cue type
    #[serde(rename = "HotCueType")]
    pub hot_cue_type: HotCueType,
    /// Host display text for the cue
    pub meta: String,
}

impl CueNotification {
    /// Build a notification for a cue on `deck` (1-based)
    pub fn new(
        deck: u8,
        cue_name: impl Into<String>,
        cue_color: impl Into<String>,
        hot_cue_type: HotCueType,
        meta: impl Into<String>,
    ) -> Self {
        Self {
            cue_match_type: "None".to_string(),
            cue_name: cue_name.into(),
            cue_color: cue_color.into(),
            deck: deck_mask(deck),
            hot_cue_type,
            meta: meta.into(),
        }
    }
}

/// Deck bitmask for decks 1..=4, 0 otherwise
pub fn deck_mask(deck: u8) -> u8 {
    if (1..=4).contains(&deck) {
        1 << (deck - 1)
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_tree_schema() {
        let tree = SceneTree {
            scenes: vec![SceneNode {
                name: "Main".to_string(),
                sources: vec![SourceNode {
                    name: "Cams".to_string(),
                    path: "Main/Cams".to_string(),
                    is_group: true,
                    filters: vec![],
                    sources: vec![SourceNode {
                        name: "Cam \"A\"".to_string(),
                        path: "Main/Cams/Cam \"A\"".to_string(),
                        is_group: false,
                        filters: vec![FilterNode {
                            name: "Blur".to_string(),
                            kind: "blur_filter".to_string(),
                        }],
                        sources: vec![],
                    }],
                }],
            }],
        };

        let value = serde_json::to_value(&tree).unwrap();
        let group = &value["scenes"][0]["sources"][0];
        assert_eq!(group["isGroup"], true);
        assert_eq!(group["sources"][0]["name"], "Cam \"A\"");
        assert_eq!(group["sources"][0]["filters"][0]["kind"], "blur_filter");

        let json = serde_json::to_string(&tree).unwrap();
        assert!(json.contains(r#""name":"Cam \"A\"""#));
    }

    #[test]
    fn test_cue_notification_serialization() {
        let event = CueNotification::new(3, "Drop", "0x40", HotCueType::SavedLoop, "1:02");
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"CueMatchType":"None","CueName":"Drop","CueColor":"0x40","Deck":4,"HotCueType":"Saved_Loop","meta":"1:02"}"#
        );
    }

    #[test]
    fn test_hot_cue_type_normalization() {
        assert_eq!(HotCueType::from_host("saved loop"), HotCueType::SavedLoop);
        assert_eq!(HotCueType::from_host("Remix_Point"), HotCueType::RemixPoint);
        assert_eq!(HotCueType::from_host("BEATGRID ANCHOR"), HotCueType::BeatGridAnchor);
        assert_eq!(HotCueType::from_host("32"), HotCueType::AutomixPoint);
        assert_eq!(HotCueType::from_host("64"), HotCueType::LoadPoint);
        assert_eq!(HotCueType::from_host("4"), HotCueType::Action);
        assert_eq!(HotCueType::from_host(""), HotCueType::HotCue);
        assert_eq!(HotCueType::from_host("mystery"), HotCueType::HotCue);
    }

    #[test]
    fn test_deck_mask() {
        assert_eq!(deck_mask(1), 1);
        assert_eq!(deck_mask(2), 2);
        assert_eq!(deck_mask(4), 8);
        assert_eq!(deck_mask(0), 0);
        assert_eq!(deck_mask(5), 0);
    }
}
