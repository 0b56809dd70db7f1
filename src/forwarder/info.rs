// ABOUTME: DJ host query capability
// ABOUTME: String and numeric lookups keyed by host command text, plus an in-memory table

use parking_lot::RwLock;
use std::collections::HashMap;

/// The DJ application's property query interface.
///
/// Commands are the host's own script text (`deck 1 get_title`,
/// `deck 2 cue_pos 5`, ...). `None` means the lookup failed.
pub trait InfoSource: Send + Sync {
    /// Query a text value
    fn get_string(&self, command: &str) -> Option<String>;

    /// Query a numeric value
    fn get_double(&self, command: &str) -> Option<f64>;
}

/// Query table held in memory, for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryInfo {
    strings: RwLock<HashMap<String, String>>,
    doubles: RwLock<HashMap<String, f64>>,
}

impl MemoryInfo {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the answer to a text query
    pub fn set_string(&self, command: impl Into<String>, value: impl Into<String>) {
        self.strings.write().insert(command.into(), value.into());
    }

    /// Set the answer to a numeric query
    pub fn set_double(&self, command: impl Into<String>, value: f64) {
        self.doubles.write().insert(command.into(), value);
    }

    /// Make a query fail again
    pub fn remove(&self, command: &str) {
        self.strings.write().remove(command);
        self.doubles.write().remove(command);
    }
}

impl InfoSource for MemoryInfo {
    fn get_string(&self, command: &str) -> Option<String> {
        self.strings.read().get(command).cloned()
    }

    fn get_double(&self, command: &str) -> Option<f64> {
        self.doubles.read().get(command).copied()
    }
}
