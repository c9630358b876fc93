// UI-facing command handlers
use serde::Serialize;
use std::path::PathBuf;

use crate::audio::MediaSource;
use crate::db::models::Playback;
use crate::playback::{ControllerUpdate, PlaybackController, SeekOutcome};
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStateResponse {
    pub is_playing: bool,
    pub current_file: Option<String>,
    pub position: f64,
    pub duration: f64,
    pub rate: f32,
}

impl PlayerStateResponse {
    fn from_controller(controller: &PlaybackController) -> Self {
        let transport = controller.transport();
        Self {
            is_playing: transport.is_playing(),
            current_file: transport.filename.clone(),
            position: transport.position,
            duration: transport.duration,
            rate: transport.rate,
        }
    }
}

pub fn play_file(file_path: String, state: &AppState) -> Result<PlayerStateResponse, String> {
    open_and_play(MediaSource::Locator(PathBuf::from(file_path)), state)
}

pub fn play_bundled(
    name: String,
    ext: Option<String>,
    state: &AppState,
) -> Result<PlayerStateResponse, String> {
    open_and_play(MediaSource::Bundled { name, ext }, state)
}

fn open_and_play(source: MediaSource, state: &AppState) -> Result<PlayerStateResponse, String> {
    let mut controller = state.controller.lock();

    controller
        .load_media(&source)
        .map_err(|e| format!("Failed to load media: {}", e))?;

    if state.settings.resume_on_load {
        controller
            .resume_saved()
            .map_err(|e| format!("Failed to resume: {}", e))?;
        controller.pump();
    }

    controller
        .play()
        .map_err(|e| format!("Failed to play: {}", e))?;

    Ok(PlayerStateResponse::from_controller(&controller))
}

pub fn pause_playback(state: &AppState) -> Result<PlayerStateResponse, String> {
    let mut controller = state.controller.lock();
    controller
        .pause()
        .map_err(|e| format!("Failed to pause: {}", e))?;
    Ok(PlayerStateResponse::from_controller(&controller))
}

pub fn resume_playback(state: &AppState) -> Result<PlayerStateResponse, String> {
    let mut controller = state.controller.lock();
    controller
        .play()
        .map_err(|e| format!("Failed to play: {}", e))?;
    Ok(PlayerStateResponse::from_controller(&controller))
}

/// Seek the loaded file. Completions that arrive later are applied by the
/// next call that pumps the controller.
pub fn seek_to(seconds: f64, state: &AppState) -> Result<PlayerStateResponse, String> {
    let mut controller = state.controller.lock();
    let filename = controller
        .current_filename()
        .ok_or_else(|| "No media loaded".to_string())?
        .to_string();

    let ticket = controller
        .seek(seconds, &filename)
        .map_err(|e| format!("Failed to seek: {}", e))?;

    let failed = controller.pump().into_iter().any(|update| {
        update
            == ControllerUpdate::Seek {
                generation: ticket.generation,
                outcome: SeekOutcome::Failed,
            }
    });
    if failed {
        return Err(format!("Seek to {}s failed", seconds));
    }

    Ok(PlayerStateResponse::from_controller(&controller))
}

pub fn get_player_state(state: &AppState) -> PlayerStateResponse {
    PlayerStateResponse::from_controller(&state.controller.lock())
}

/// Called when the UI comes back to the foreground.
pub fn refresh_now_playing(state: &AppState) -> Result<PlayerStateResponse, String> {
    let mut controller = state.controller.lock();
    controller.pump();
    controller
        .refresh_if_loaded()
        .map_err(|e| format!("Failed to refresh: {}", e))?;
    Ok(PlayerStateResponse::from_controller(&controller))
}

pub fn get_playbacks(state: &AppState) -> Vec<Playback> {
    state.store.playbacks()
}

pub fn reload_playbacks(state: &AppState) -> Result<Vec<Playback>, String> {
    state
        .controller
        .lock()
        .reload_playbacks()
        .map_err(|e| format!("Failed to read saved playbacks: {}", e))
}
