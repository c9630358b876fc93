pub const RATE_PLAYING: f32 = 1.0;
pub const RATE_PAUSED: f32 = 0.0;

/// Transport state of the active media handle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportState {
    pub filename: Option<String>,
    pub position: f64,
    pub duration: f64,
    pub rate: f32,
}

impl TransportState {
    /// Fresh state for a newly loaded file: paused at the start.
    pub fn for_file(filename: &str) -> Self {
        Self {
            filename: Some(filename.to_string()),
            ..Self::default()
        }
    }

    pub fn is_playing(&self) -> bool {
        self.rate > RATE_PAUSED
    }
}
