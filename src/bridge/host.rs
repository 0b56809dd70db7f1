// ABOUTME: Renderer host capabilities used by the bridge
// ABOUTME: Scene graph enumeration, scene mutation, and an in-memory host backed by JSON

use crate::error::Error;
use crate::protocol::messages::FilterNode;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A source as enumerated by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSource {
    /// Source name
    pub name: String,
    /// Whether the source is a group with nested sources
    pub is_group: bool,
}

/// Read access to the host scene graph.
///
/// Every method returns items in the host's own enumeration order.
pub trait SceneProvider: Send + Sync {
    /// All scene names
    fn scene_names(&self) -> Vec<String>;

    /// Sources placed directly in `scene`, or inside `group` when given
    fn scene_items(&self, scene: &str, group: Option<&str>) -> Vec<HostSource>;

    /// Filters attached to a source
    fn source_filters(&self, source: &str) -> Vec<FilterNode>;
}

/// How an event changes an on/off property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    /// Set to on
    On,
    /// Set to off
    Off,
    /// Flip the current value
    Toggle,
}

impl Switch {
    /// Resulting value given the current one
    pub fn apply(&self, current: bool) -> bool {
        match self {
            Switch::On => true,
            Switch::Off => false,
            Switch::Toggle => !current,
        }
    }
}

/// Mutations the line protocol can request from the host
pub trait SceneController: Send + Sync {
    /// Change a source's visibility in `scene` (the current scene when `None`)
    fn set_source_visible(&self, scene: Option<&str>, source: &str, switch: Switch)
        -> crate::Result<()>;

    /// Change whether a filter on a source is enabled
    fn set_filter_enabled(&self, source: &str, filter: &str, switch: Switch) -> crate::Result<()>;

    /// Make `scene` the program scene
    fn switch_scene(&self, scene: &str) -> crate::Result<()>;
}

/// Filter entry in a scene file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryFilter {
    /// Filter name
    pub name: String,
    /// Filter type identifier
    #[serde(default)]
    pub kind: String,
    /// Whether the filter is active
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

/// Source entry in a scene file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySource {
    /// Source name
    pub name: String,
    /// Whether the source is shown
    #[serde(default = "enabled_default")]
    pub visible: bool,
    /// Treat as a group even without children
    #[serde(default)]
    pub group: bool,
    /// Attached filters
    #[serde(default)]
    pub filters: Vec<MemoryFilter>,
    /// Nested sources of a group
    #[serde(default)]
    pub sources: Vec<MemorySource>,
}

impl MemorySource {
    /// Create a visible leaf source
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            group: false,
            filters: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Add a filter
    pub fn with_filter(mut self, name: impl Into<String>, kind: impl Into<String>) -> Self {
        self.filters.push(MemoryFilter {
            name: name.into(),
            kind: kind.into(),
            enabled: true,
        });
        self
    }

    /// Add a nested source, turning this source into a group
    pub fn with_child(mut self, child: MemorySource) -> Self {
        self.group = true;
        self.sources.push(child);
        self
    }

    fn is_group(&self) -> bool {
        self.group || !self.sources.is_empty()
    }
}

/// Scene entry in a scene file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySceneEntry {
    /// Scene name
    pub name: String,
    /// Top-level sources
    #[serde(default)]
    pub sources: Vec<MemorySource>,
}

/// Scene file layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneFile {
    /// Initial program scene (first scene when absent)
    #[serde(default)]
    pub current: Option<String>,
    /// Scenes in order
    #[serde(default)]
    pub scenes: Vec<MemorySceneEntry>,
}

fn enabled_default() -> bool {
    true
}

/// In-memory renderer host.
///
/// Stands in for a real renderer in the standalone binary and in tests: it serves
/// its scene graph through [`SceneProvider`] and applies [`SceneController`]
/// mutations to itself.
#[derive(Debug, Default)]
pub struct MemoryScene {
    state: RwLock<SceneFile>,
}

impl MemoryScene {
    /// Create a host from a scene layout
    pub fn new(file: SceneFile) -> Self {
        Self {
            state: RwLock::new(file),
        }
    }

    /// Load a scene layout from a JSON file
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::new(serde_json::from_str(&text)?))
    }

    /// Add a scene (builder style)
    pub fn with_scene(self, name: impl Into<String>, sources: Vec<MemorySource>) -> Self {
        self.state.write().scenes.push(MemorySceneEntry {
            name: name.into(),
            sources,
        });
        self
    }

    /// Program scene name
    pub fn current_scene(&self) -> Option<String> {
        let state = self.state.read();
        state
            .current
            .clone()
            .or_else(|| state.scenes.first().map(|s| s.name.clone()))
    }

    /// Visibility of a source in a scene
    pub fn is_visible(&self, scene: &str, source: &str) -> Option<bool> {
        let state = self.state.read();
        let entry = state.scenes.iter().find(|s| s.name == scene)?;
        find_source(&entry.sources, source).map(|s| s.visible)
    }

    /// Enabled state of a filter (first source with that name)
    pub fn is_filter_enabled(&self, source: &str, filter: &str) -> Option<bool> {
        let state = self.state.read();
        state
            .scenes
            .iter()
            .find_map(|s| find_source(&s.sources, source))
            .and_then(|s| s.filters.iter().find(|f| f.name == filter))
            .map(|f| f.enabled)
    }
}

fn find_source<'a>(sources: &'a [MemorySource], name: &str) -> Option<&'a MemorySource> {
    sources.iter().find_map(|s| {
        if s.name == name {
            Some(s)
        } else {
            find_source(&s.sources, name)
        }
    })
}

fn find_source_mut<'a>(
    sources: &'a mut [MemorySource],
    name: &str,
) -> Option<&'a mut MemorySource> {
    for source in sources.iter_mut() {
        if source.name == name {
            return Some(source);
        }
        if let Some(found) = find_source_mut(&mut source.sources, name) {
            return Some(found);
        }
    }
    None
}

fn for_each_source_mut(sources: &mut [MemorySource], f: &mut dyn FnMut(&mut MemorySource)) {
    for source in sources.iter_mut() {
        f(source);
        for_each_source_mut(&mut source.sources, f);
    }
}

impl SceneProvider for MemoryScene {
    fn scene_names(&self) -> Vec<String> {
        self.state.read().scenes.iter().map(|s| s.name.clone()).collect()
    }

    fn scene_items(&self, scene: &str, group: Option<&str>) -> Vec<HostSource> {
        let state = self.state.read();
        let Some(entry) = state.scenes.iter().find(|s| s.name == scene) else {
            return Vec::new();
        };
        let items = match group {
            None => &entry.sources,
            Some(group) => match find_source(&entry.sources, group) {
                Some(source) => &source.sources,
                None => return Vec::new(),
            },
        };
        items
            .iter()
            .map(|s| HostSource {
                name: s.name.clone(),
                is_group: s.is_group(),
            })
            .collect()
    }

    fn source_filters(&self, source: &str) -> Vec<FilterNode> {
        let state = self.state.read();
        state
            .scenes
            .iter()
            .find_map(|s| find_source(&s.sources, source))
            .map(|s| {
                s.filters
                    .iter()
                    .map(|f| FilterNode {
                        name: f.name.clone(),
                        kind: f.kind.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl SceneController for MemoryScene {
    fn set_source_visible(
        &self,
        scene: Option<&str>,
        source: &str,
        switch: Switch,
    ) -> crate::Result<()> {
        let scene = match scene {
            Some(name) => name.to_string(),
            None => self
                .current_scene()
                .ok_or_else(|| Error::Host("no scenes loaded".to_string()))?,
        };

        let mut state = self.state.write();
        let entry = state
            .scenes
            .iter_mut()
            .find(|s| s.name == scene)
            .ok_or_else(|| Error::Host(format!("unknown scene '{scene}'")))?;
        let item = find_source_mut(&mut entry.sources, source)
            .ok_or_else(|| Error::Host(format!("no source '{source}' in scene '{scene}'")))?;
        item.visible = switch.apply(item.visible);
        Ok(())
    }

    fn set_filter_enabled(&self, source: &str, filter: &str, switch: Switch) -> crate::Result<()> {
        let mut state = self.state.write();
        let mut found = false;
        for scene in state.scenes.iter_mut() {
            for_each_source_mut(&mut scene.sources, &mut |item| {
                if item.name != source {
                    return;
                }
                if let Some(f) = item.filters.iter_mut().find(|f| f.name == filter) {
                    f.enabled = switch.apply(f.enabled);
                    found = true;
                }
            });
        }

        if found {
            Ok(())
        } else {
            Err(Error::Host(format!("no filter '{filter}' on source '{source}'")))
        }
    }

    fn switch_scene(&self, scene: &str) -> crate::Result<()> {
        let mut state = self.state.write();
        if !state.scenes.iter().any(|s| s.name == scene) {
            return Err(Error::Host(format!("unknown scene '{scene}'")));
        }
        state.current = Some(scene.to_string());
        Ok(())
    }
}
