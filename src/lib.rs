// Slothplayer - personal media player core
// Module declarations
pub mod audio;
pub mod commands;
pub mod db;
pub mod error;
pub mod metadata;
pub mod playback;
pub mod settings;
pub mod smtc;
pub mod state;
pub mod store;

pub use error::{PlayerError, StorageError};
pub use playback::PlaybackController;
pub use state::AppState;
pub use store::PlaybackStore;
