// Settings module

#[allow(clippy::module_inception)]
pub mod settings;

pub use settings::{default_app_dir, PlayerSettings, StorageBackend};
