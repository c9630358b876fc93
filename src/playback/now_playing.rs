// Now-playing descriptor published to the system media overlay
use std::path::{Path, PathBuf};

use crate::error::NowPlayingError;

/// Lock-screen artwork with its pixel bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artwork {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl Artwork {
    /// Read the image bounds. Missing or unreadable images yield `None`.
    pub fn load(path: &Path) -> Option<Self> {
        match image::image_dimensions(path) {
            Ok((width, height)) => Some(Self {
                path: path.to_path_buf(),
                width,
                height,
            }),
            Err(e) => {
                log::warn!("[NowPlaying] Artwork {:?} unavailable: {}", path, e);
                None
            }
        }
    }
}

/// Exactly the fields the system overlay shows.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlayingInfo {
    pub title: String,
    pub artwork: Option<Artwork>,
    /// Elapsed time in seconds.
    pub elapsed: f64,
    pub duration: f64,
    pub rate: f32,
}

/// System now-playing integration.
pub trait NowPlaying: Send {
    fn publish(&mut self, info: &NowPlayingInfo) -> Result<(), NowPlayingError>;
}
