// Settings management and persistence
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where resume records are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Json,
    Memory,
}

/// Main player settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    pub version: i32, // Settings schema version for future migrations
    pub storage: StorageBackend,
    /// Directory searched for bundled media. Defaults to `<app_dir>/media`.
    pub resources_dir: Option<PathBuf>,
    /// Lock-screen artwork. Defaults to `<app_dir>/lockscreen.png`.
    pub artwork_path: Option<PathBuf>,
    pub position_tick_ms: u64,
    pub resume_on_load: bool,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            version: 1,
            storage: StorageBackend::default(),
            resources_dir: None,
            artwork_path: None,
            position_tick_ms: 1000,
            resume_on_load: true,
        }
    }
}

impl PlayerSettings {
    pub fn get_settings_path(app_dir: &Path) -> PathBuf {
        app_dir.join("settings.json")
    }

    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load(app_dir: &Path) -> Result<Self> {
        let path = Self::get_settings_path(app_dir);

        if !path.exists() {
            log::info!("[Settings] No settings file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;
        let settings: PlayerSettings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings {:?}", path))?;

        log::info!("[Settings] Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, app_dir: &Path) -> Result<()> {
        fs::create_dir_all(app_dir).context("Failed to create settings directory")?;

        let path = Self::get_settings_path(app_dir);
        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write settings file {:?}", path))?;

        log::info!("[Settings] Saved settings to {:?}", path);
        Ok(())
    }

    pub fn resources_dir(&self, app_dir: &Path) -> PathBuf {
        self.resources_dir
            .clone()
            .unwrap_or_else(|| app_dir.join("media"))
    }

    pub fn artwork_path(&self, app_dir: &Path) -> PathBuf {
        self.artwork_path
            .clone()
            .unwrap_or_else(|| app_dir.join("lockscreen.png"))
    }
}

/// Default per-user data directory for the player.
pub fn default_app_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("slothplayer"))
}
