// Data models
use serde::{Deserialize, Serialize};

/// A saved resume position. `filename` is the case-insensitive key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playback {
    pub filename: String,
    pub position: f64,
    pub duration: f64,
}

impl Playback {
    pub fn new(filename: impl Into<String>, position: f64, duration: f64) -> Self {
        Self {
            filename: filename.into(),
            position,
            duration,
        }
    }

    /// True when `filename` names the same file, ignoring case.
    pub fn matches(&self, filename: &str) -> bool {
        self.filename.to_lowercase() == filename.to_lowercase()
    }
}
