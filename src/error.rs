// Error types shared across the player core
use thiserror::Error;

/// Failures reading or writing durable key-value storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to decode stored payload for key `{key}`: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Audio output session could not be set up.
#[derive(Debug, Error)]
#[error("audio session: {0}")]
pub struct SessionError(pub String);

/// Media backend could not open a handle.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to open {path}: {reason}")]
    Open { path: String, reason: String },
    #[error("unsupported media: {0}")]
    Unsupported(String),
}

#[derive(Debug, Error)]
#[error("now playing: {0}")]
pub struct NowPlayingError(pub String);

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("audio session configuration failed: {0}")]
    SessionConfig(#[from] SessionError),
    #[error("media source could not be resolved: {0}")]
    SourceNotFound(String),
    #[error("failed to load media: {0}")]
    MediaLoad(#[from] EngineError),
    #[error("no media loaded")]
    NoMedia,
    #[error("seek to {target}s failed")]
    SeekFailure { target: f64 },
    #[error(transparent)]
    Storage(#[from] StorageError),
}
