// Resume-position log kept under a single storage key
use std::sync::Arc;

use crate::db::models::Playback;
use crate::db::operations::KeyValueStore;
use crate::error::StorageError;

pub const PLAYBACKS_KEY: &str = "playbacks";

/// Most-recent-first list of resume records, at most one per filename.
#[derive(Clone)]
pub struct ResumeLog {
    storage: Arc<dyn KeyValueStore>,
}

impl ResumeLog {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Read the persisted list. A missing key is an empty list.
    pub fn load(&self) -> Result<Vec<Playback>, StorageError> {
        match self.storage.get(PLAYBACKS_KEY)? {
            Some(bytes) => decode(&bytes),
            None => Ok(Vec::new()),
        }
    }

    /// Like [`ResumeLog::load`], but unreadable data counts as empty.
    pub fn load_or_empty(&self) -> Vec<Playback> {
        self.load().unwrap_or_else(|e| {
            log::warn!("[Resume] Discarding unreadable playbacks: {}", e);
            Vec::new()
        })
    }

    /// Move `filename` to the front with the given position and persist the
    /// whole list. Returns the list as written. A corrupt payload is replaced;
    /// a failed read aborts without writing.
    pub fn record(
        &self,
        filename: &str,
        position: f64,
        duration: f64,
    ) -> Result<Vec<Playback>, StorageError> {
        let mut playbacks = match self.load() {
            Ok(playbacks) => playbacks,
            Err(e @ StorageError::Decode { .. }) => {
                log::warn!("[Resume] Discarding unreadable playbacks: {}", e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        playbacks.retain(|p| !p.matches(filename));
        playbacks.insert(0, Playback::new(filename, position, duration));

        self.storage.set(PLAYBACKS_KEY, &encode(&playbacks)?)?;
        log::debug!(
            "[Resume] Saved {} at {:.3}/{:.3}s ({} records)",
            filename,
            position,
            duration,
            playbacks.len()
        );

        Ok(playbacks)
    }

    pub fn find(&self, filename: &str) -> Option<Playback> {
        self.load_or_empty()
            .into_iter()
            .find(|p| p.matches(filename))
    }
}

pub fn encode(playbacks: &[Playback]) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(playbacks).map_err(StorageError::Encode)
}

pub fn decode(bytes: &[u8]) -> Result<Vec<Playback>, StorageError> {
    serde_json::from_slice(bytes).map_err(|source| StorageError::Decode {
        key: PLAYBACKS_KEY.to_string(),
        source,
    })
}
