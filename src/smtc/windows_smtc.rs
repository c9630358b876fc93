// Windows SMTC implementation using windows-rs crate

use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::oneshot;
use windows::core::HSTRING;
use windows::Foundation::{TimeSpan, TypedEventHandler};
use windows::Media::Playback::MediaPlayer;
use windows::Media::{
    MediaPlaybackStatus, MediaPlaybackType, PlaybackPositionChangeRequestedEventArgs,
    SystemMediaTransportControls, SystemMediaTransportControlsButton,
    SystemMediaTransportControlsButtonPressedEventArgs,
    SystemMediaTransportControlsTimelineProperties,
};
use windows::Storage::StorageFile;
use windows::Storage::Streams::RandomAccessStreamReference;

use super::{dispatch_to, SharedTable};
use crate::error::NowPlayingError;
use crate::playback::now_playing::{NowPlaying, NowPlayingInfo};
use crate::playback::remote::{CommandCenter, CommandStatus, CommandTable, RemoteCommand};

// SMTC timestamps are in 100ns ticks
const TICKS_PER_SECOND: f64 = 10_000_000.0;

fn err(context: &str, e: windows::core::Error) -> NowPlayingError {
    NowPlayingError(format!("{}: {}", context, e))
}

fn to_ticks(seconds: f64) -> TimeSpan {
    TimeSpan {
        Duration: (seconds.max(0.0) * TICKS_PER_SECOND) as i64,
    }
}

/// Manager for Windows System Media Transport Controls
#[derive(Clone)]
pub struct SmtcManager {
    _media_player: MediaPlayer,
    smtc: SystemMediaTransportControls,
    table: SharedTable,
}

impl SmtcManager {
    pub fn new() -> Result<Self, NowPlayingError> {
        // Create a MediaPlayer to get access to SMTC
        let media_player = MediaPlayer::new().map_err(|e| err("create MediaPlayer", e))?;

        // Take manual control of SMTC instead of the player's command manager
        media_player
            .CommandManager()
            .map_err(|e| err("get CommandManager", e))?
            .SetIsEnabled(false)
            .map_err(|e| err("disable CommandManager", e))?;

        let smtc = media_player
            .SystemMediaTransportControls()
            .map_err(|e| err("get SMTC", e))?;
        smtc.SetIsEnabled(true).map_err(|e| err("enable SMTC", e))?;
        smtc.SetIsPlayEnabled(true)
            .map_err(|e| err("enable play button", e))?;
        smtc.SetIsPauseEnabled(true)
            .map_err(|e| err("enable pause button", e))?;

        let table: SharedTable = Arc::new(Mutex::new(None));

        let buttons = table.clone();
        let button_handler = TypedEventHandler::new(
            move |_sender: &Option<SystemMediaTransportControls>,
                  args: &Option<SystemMediaTransportControlsButtonPressedEventArgs>| {
                if let Some(args) = args {
                    let command = match args.Button()? {
                        SystemMediaTransportControlsButton::Play => Some(RemoteCommand::Play),
                        SystemMediaTransportControlsButton::Pause => Some(RemoteCommand::Pause),
                        _ => None,
                    };
                    if let Some(command) = command {
                        // Status is only observable by the overlay, nothing to wait on
                        let _ = dispatch_to(&buttons, command);
                    }
                }
                Ok(())
            },
        );
        smtc.ButtonPressed(&button_handler)
            .map_err(|e| err("register button handler", e))?;

        let scrubber = table.clone();
        let position_handler = TypedEventHandler::new(
            move |_sender: &Option<SystemMediaTransportControls>,
                  args: &Option<PlaybackPositionChangeRequestedEventArgs>| {
                if let Some(args) = args {
                    let requested = args.RequestedPlaybackPosition()?;
                    let seconds = requested.Duration as f64 / TICKS_PER_SECOND;
                    let _ = dispatch_to(&scrubber, RemoteCommand::ChangePlaybackPosition(seconds));
                }
                Ok(())
            },
        );
        smtc.PlaybackPositionChangeRequested(&position_handler)
            .map_err(|e| err("register position handler", e))?;

        Ok(Self {
            _media_player: media_player,
            smtc,
            table,
        })
    }

    pub fn installed(&self) -> Option<CommandTable> {
        self.table.lock().clone()
    }

    pub fn press(&self, command: RemoteCommand) -> Option<oneshot::Receiver<CommandStatus>> {
        dispatch_to(&self.table, command)
    }

    fn set_thumbnail(
        &self,
        updater: &windows::Media::SystemMediaTransportControlsDisplayUpdater,
        artwork_path: &Path,
    ) {
        let path_str = artwork_path.to_string_lossy().to_string();

        // Use StorageFile to load the file, which properly handles Windows paths
        let stream_ref = StorageFile::GetFileFromPathAsync(&HSTRING::from(&path_str))
            .and_then(|op| op.get())
            .and_then(|file| RandomAccessStreamReference::CreateFromFile(&file));

        match stream_ref {
            Ok(stream_ref) => {
                if let Err(e) = updater.SetThumbnail(&stream_ref) {
                    log::warn!("[SMTC] Failed to set thumbnail: {}", e);
                }
            }
            Err(e) => log::warn!("[SMTC] Failed to load artwork {}: {}", path_str, e),
        }
    }

    fn update_timeline(&self, info: &NowPlayingInfo) -> Result<(), NowPlayingError> {
        let timeline = SystemMediaTransportControlsTimelineProperties::new()
            .map_err(|e| err("create timeline", e))?;
        timeline
            .SetStartTime(to_ticks(0.0))
            .and_then(|_| timeline.SetEndTime(to_ticks(info.duration)))
            .and_then(|_| timeline.SetMinSeekTime(to_ticks(0.0)))
            .and_then(|_| timeline.SetMaxSeekTime(to_ticks(info.duration)))
            .and_then(|_| timeline.SetPosition(to_ticks(info.elapsed)))
            .map_err(|e| err("fill timeline", e))?;

        self.smtc
            .UpdateTimelineProperties(&timeline)
            .map_err(|e| err("update timeline", e))
    }
}

impl NowPlaying for SmtcManager {
    fn publish(&mut self, info: &NowPlayingInfo) -> Result<(), NowPlayingError> {
        let updater = self
            .smtc
            .DisplayUpdater()
            .map_err(|e| err("get display updater", e))?;
        updater
            .SetType(MediaPlaybackType::Music)
            .map_err(|e| err("set type", e))?;
        updater
            .MusicProperties()
            .and_then(|props| props.SetTitle(&HSTRING::from(info.title.as_str())))
            .map_err(|e| err("set title", e))?;

        if let Some(artwork) = info.artwork.as_ref() {
            self.set_thumbnail(&updater, &artwork.path);
        }

        updater.Update().map_err(|e| err("update display", e))?;

        let status = if info.rate > 0.0 {
            MediaPlaybackStatus::Playing
        } else {
            MediaPlaybackStatus::Paused
        };
        self.smtc
            .SetPlaybackStatus(status)
            .map_err(|e| err("set playback status", e))?;
        self.smtc
            .SetPlaybackRate(f64::from(info.rate))
            .map_err(|e| err("set playback rate", e))?;

        self.update_timeline(info)
    }
}

impl CommandCenter for SmtcManager {
    fn install(&mut self, table: CommandTable) {
        log::debug!("[SMTC] Command handlers bound to {}", table.filename());
        *self.table.lock() = Some(table);
    }
}

// Ensure SmtcManager can be sent between threads
unsafe impl Send for SmtcManager {}
unsafe impl Sync for SmtcManager {}
