// Application state management
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audio::{ClockBackend, DesktopAudioSession, DirectoryBundle};
use crate::db::{DatabaseConnection, JsonFileStore, KeyValueStore, MemoryStore, ResumeLog};
use crate::playback::{Artwork, Collaborators, PlaybackController};
use crate::settings::{PlayerSettings, StorageBackend};
use crate::smtc::SmtcManager;
use crate::store::PlaybackStore;

/// Application root: owns the controller and hands the store to the UI.
pub struct AppState {
    pub controller: Arc<Mutex<PlaybackController>>,
    pub store: Arc<PlaybackStore>,
    pub smtc: SmtcManager,
    pub settings: PlayerSettings,
    pub app_dir: PathBuf,
}

impl AppState {
    pub fn new(
        controller: PlaybackController,
        smtc: SmtcManager,
        settings: PlayerSettings,
        app_dir: PathBuf,
    ) -> Self {
        let store = Arc::clone(controller.store());
        Self {
            controller: Arc::new(Mutex::new(controller)),
            store,
            smtc,
            settings,
            app_dir,
        }
    }

    /// Wire up the default desktop collaborators from the settings in `app_dir`.
    pub fn bootstrap(app_dir: PathBuf) -> Result<Self> {
        let settings = PlayerSettings::load(&app_dir)?;
        let storage = open_storage(settings.storage, &app_dir)?;
        let smtc = SmtcManager::new().context("Failed to initialize media transport controls")?;

        let artwork_path = settings.artwork_path(&app_dir);
        let artwork = if artwork_path.exists() {
            Artwork::load(&artwork_path)
        } else {
            None
        };

        let store = Arc::new(PlaybackStore::new());
        let mut controller = PlaybackController::new(
            Collaborators {
                backend: Box::new(ClockBackend),
                session: Box::new(DesktopAudioSession::default()),
                now_playing: Box::new(smtc.clone()),
                command_center: Box::new(smtc.clone()),
                bundle: Box::new(DirectoryBundle::new(settings.resources_dir(&app_dir))),
            },
            ResumeLog::new(storage),
            store,
        )
        .with_artwork(artwork);

        // Populate observers with what previous launches saved
        if let Err(e) = controller.reload_playbacks() {
            log::warn!("[State] Starting with an empty resume list: {}", e);
        }

        Ok(Self::new(controller, smtc, settings, app_dir))
    }
}

fn open_storage(backend: StorageBackend, app_dir: &Path) -> Result<Arc<dyn KeyValueStore>> {
    let storage: Arc<dyn KeyValueStore> = match backend {
        StorageBackend::Sqlite => Arc::new(
            DatabaseConnection::new(app_dir.join("slothplayer.db"))
                .context("Failed to initialize database")?,
        ),
        StorageBackend::Json => Arc::new(JsonFileStore::new(app_dir.join("state"))),
        StorageBackend::Memory => Arc::new(MemoryStore::default()),
    };
    log::info!("[State] Using {:?} storage in {:?}", backend, app_dir);
    Ok(storage)
}
