// Playback controller: transport commands, now-playing sync, resume records
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::audio::player::{MediaBackend, MediaHandle};
use crate::audio::session::AudioSession;
use crate::audio::source::{filename_of, BundleResolver, MediaSource};
use crate::db::models::Playback;
use crate::db::resume::ResumeLog;
use crate::error::PlayerError;
use crate::playback::now_playing::{Artwork, NowPlaying, NowPlayingInfo};
use crate::playback::remote::{
    CommandCenter, CommandStatus, CommandTable, ControllerEvent, RemoteCommand,
};
use crate::playback::transport::{TransportState, RATE_PAUSED, RATE_PLAYING};
use crate::store::{PlaybackStore, PlayerHandle};

/// Seek targets are quantised to this many steps per second.
pub const SEEK_TIMESCALE: f64 = 1000.0;

/// Host collaborators the controller drives.
pub struct Collaborators {
    pub backend: Box<dyn MediaBackend>,
    pub session: Box<dyn AudioSession>,
    pub now_playing: Box<dyn NowPlaying>,
    pub command_center: Box<dyn CommandCenter>,
    pub bundle: Box<dyn BundleResolver>,
}

/// Identifies an issued seek; its outcome arrives through the event queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekTicket {
    pub generation: u64,
    pub target: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    /// The seek landed and the pre-seek rate was restored.
    Applied,
    /// The handle reported failure; transport state is unchanged.
    Failed,
    /// The seek landed but a later command owns the transport now.
    Superseded,
}

/// Result of handling one queued event.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerUpdate {
    Command {
        command: RemoteCommand,
        status: CommandStatus,
    },
    /// A system seek was issued; its status is sent when it completes.
    SeekStarted { ticket: SeekTicket },
    Seek { generation: u64, outcome: SeekOutcome },
    Ignored,
}

struct PendingSeek {
    filename: String,
    restore_rate: f32,
    reply: Option<oneshot::Sender<CommandStatus>>,
}

pub struct PlaybackController {
    backend: Box<dyn MediaBackend>,
    session: Box<dyn AudioSession>,
    now_playing: Box<dyn NowPlaying>,
    command_center: Box<dyn CommandCenter>,
    bundle: Box<dyn BundleResolver>,
    resume: ResumeLog,
    store: Arc<PlaybackStore>,
    artwork: Option<Artwork>,

    handle: Option<Box<dyn MediaHandle>>,
    transport: TransportState,
    // Bumped by every load; handlers from older loads are rejected
    load_generation: u64,
    // Bumped by every load, play, pause and seek; older seek completions are stale
    transport_generation: u64,
    pending_seeks: HashMap<u64, PendingSeek>,

    events_tx: mpsc::UnboundedSender<ControllerEvent>,
    events_rx: mpsc::UnboundedReceiver<ControllerEvent>,
}

impl PlaybackController {
    pub fn new(parts: Collaborators, resume: ResumeLog, store: Arc<PlaybackStore>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            backend: parts.backend,
            session: parts.session,
            now_playing: parts.now_playing,
            command_center: parts.command_center,
            bundle: parts.bundle,
            resume,
            store,
            artwork: None,
            handle: None,
            transport: TransportState::default(),
            load_generation: 0,
            transport_generation: 0,
            pending_seeks: HashMap::new(),
            events_tx,
            events_rx,
        }
    }

    pub fn with_artwork(mut self, artwork: Option<Artwork>) -> Self {
        self.artwork = artwork;
        self
    }

    pub fn transport(&self) -> &TransportState {
        &self.transport
    }

    pub fn current_filename(&self) -> Option<&str> {
        self.transport.filename.as_deref()
    }

    pub fn store(&self) -> &Arc<PlaybackStore> {
        &self.store
    }

    /// Stop the current media and load `source`. Returns the derived filename.
    ///
    /// On failure the previous media stays loaded, paused, with its command
    /// table still installed.
    pub fn load_media(&mut self, source: &MediaSource) -> Result<String, PlayerError> {
        if let Some(handle) = self.handle.as_mut() {
            handle.pause();
            self.transport.rate = RATE_PAUSED;
            // Seeks issued before the load must not resume the old media
            self.transport_generation += 1;
        }

        let (locator, filename, handle) = match self.open_source(source) {
            Ok(opened) => opened,
            Err(e) => {
                if let Err(snapshot_err) = self.refresh_if_loaded() {
                    log::warn!("[Player] Snapshot after failed load: {}", snapshot_err);
                }
                return Err(e);
            }
        };

        self.handle = Some(handle);
        self.load_generation += 1;
        self.transport_generation += 1;
        self.transport = TransportState::for_file(&filename);
        self.cancel_pending_seeks();
        log::info!("[Player] Loaded {} from {:?}", filename, locator);

        self.command_center.install(CommandTable::new(
            &filename,
            self.load_generation,
            &self.events_tx,
        ));
        self.store.set_player(Some(PlayerHandle {
            generation: self.load_generation,
            locator,
            filename: filename.clone(),
        }));
        self.store.set_title(Some(filename.clone()));

        self.push_snapshot(&filename)?;
        Ok(filename)
    }

    pub fn play(&mut self) -> Result<NowPlayingInfo, PlayerError> {
        let filename = self.loaded_filename()?;
        self.apply_rate(RATE_PLAYING, &filename)
    }

    pub fn pause(&mut self) -> Result<NowPlayingInfo, PlayerError> {
        let filename = self.loaded_filename()?;
        self.apply_rate(RATE_PAUSED, &filename)
    }

    /// Start an asynchronous seek. The pre-seek rate is restored when the
    /// completion is handled by [`PlaybackController::pump`] or
    /// [`PlaybackController::next_event`].
    pub fn seek(&mut self, to_seconds: f64, filename: &str) -> Result<SeekTicket, PlayerError> {
        self.start_seek(to_seconds, filename, None)
    }

    /// Seek to the saved resume position of the loaded file, if there is one.
    pub fn resume_saved(&mut self) -> Result<Option<SeekTicket>, PlayerError> {
        let filename = self.loaded_filename()?;
        match self.saved_position(&filename) {
            Some(saved) if saved.position > 0.0 => {
                log::info!("[Player] Resuming {} at {:.3}s", filename, saved.position);
                self.seek(saved.position, &filename).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Publish the current state for `filename` and record a resume position
    /// once playback has moved past the start.
    pub fn push_snapshot(&mut self, filename: &str) -> Result<NowPlayingInfo, PlayerError> {
        let (position, duration) = match self.handle.as_ref() {
            Some(handle) => (finite_or_zero(handle.position()), finite_or_zero(handle.duration())),
            None => (0.0, 0.0),
        };
        self.transport.position = position;
        self.transport.duration = duration;

        let info = NowPlayingInfo {
            title: filename.to_string(),
            artwork: self.artwork.clone(),
            elapsed: position,
            duration,
            rate: self.transport.rate,
        };
        log::debug!(
            "[Player] Snapshot {} {:.3}/{:.3}s rate {}",
            info.title,
            info.elapsed,
            info.duration,
            info.rate
        );

        if let Err(e) = self.now_playing.publish(&info) {
            log::warn!("[Player] Now-playing update failed: {}", e);
        }

        if self.store.title().as_deref() != Some(filename) {
            self.store.set_title(Some(filename.to_string()));
        }

        if position > 0.0 {
            let playbacks = self.resume.record(filename, position, duration)?;
            self.store.set_playbacks(playbacks);
        }

        Ok(info)
    }

    /// Re-push the snapshot for the loaded file; `None` when nothing is loaded.
    pub fn refresh_if_loaded(&mut self) -> Result<Option<NowPlayingInfo>, PlayerError> {
        match self.transport.filename.clone() {
            Some(filename) => self.push_snapshot(&filename).map(Some),
            None => Ok(None),
        }
    }

    /// Refresh the store's resume list from storage without writing.
    /// Unreadable data empties the list and is returned as an error.
    pub fn reload_playbacks(&mut self) -> Result<Vec<Playback>, PlayerError> {
        match self.resume.load() {
            Ok(playbacks) => {
                self.store.set_playbacks(playbacks.clone());
                Ok(playbacks)
            }
            Err(e) => {
                log::warn!("[Player] Stored playbacks unreadable: {}", e);
                self.store.set_playbacks(Vec::new());
                Err(e.into())
            }
        }
    }

    pub fn saved_position(&self, filename: &str) -> Option<Playback> {
        self.resume.find(filename)
    }

    /// Handle every queued event without waiting.
    pub fn pump(&mut self) -> Vec<ControllerUpdate> {
        let mut updates = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            updates.push(self.handle_event(event));
        }
        updates
    }

    /// Wait for the next queued event and handle it.
    pub async fn next_event(&mut self) -> Option<ControllerUpdate> {
        let event = self.events_rx.recv().await?;
        Some(self.handle_event(event))
    }

    fn open_source(
        &mut self,
        source: &MediaSource,
    ) -> Result<(PathBuf, String, Box<dyn MediaHandle>), PlayerError> {
        if let Err(e) = self.session.configure() {
            log::error!("[Player] Could not configure audio session: {}", e);
            return Err(PlayerError::SessionConfig(e));
        }

        let locator = source
            .resolve(self.bundle.as_ref())
            .ok_or_else(|| PlayerError::SourceNotFound(source.to_string()))?;
        let filename =
            filename_of(&locator).ok_or_else(|| PlayerError::SourceNotFound(source.to_string()))?;

        let handle = self.backend.open(&locator)?;
        Ok((locator, filename, handle))
    }

    // Seeks on a replaced handle never complete; fail any system seek waiting on one
    fn cancel_pending_seeks(&mut self) {
        for (generation, pending) in self.pending_seeks.drain() {
            log::debug!("[Player] Dropping seek #{} on {}", generation, pending.filename);
            if let Some(reply) = pending.reply {
                let _ = reply.send(CommandStatus::CommandFailed);
            }
        }
    }

    fn loaded_filename(&self) -> Result<String, PlayerError> {
        match (&self.handle, &self.transport.filename) {
            (Some(_), Some(filename)) => Ok(filename.clone()),
            _ => Err(PlayerError::NoMedia),
        }
    }

    fn apply_rate(&mut self, rate: f32, filename: &str) -> Result<NowPlayingInfo, PlayerError> {
        let handle = self.handle.as_mut().ok_or(PlayerError::NoMedia)?;
        if rate > RATE_PAUSED {
            handle.play();
        } else {
            handle.pause();
        }
        handle.set_rate(rate);

        self.transport.rate = rate;
        self.transport_generation += 1;
        log::info!("[Player] {} {}", if rate > RATE_PAUSED { "Playing" } else { "Paused" }, filename);

        self.push_snapshot(filename)
    }

    fn start_seek(
        &mut self,
        to_seconds: f64,
        filename: &str,
        reply: Option<oneshot::Sender<CommandStatus>>,
    ) -> Result<SeekTicket, PlayerError> {
        let (target, handle) = match (quantise_seek_target(to_seconds), self.handle.as_mut()) {
            (Ok(target), Some(handle)) => (target, handle),
            (checked, _) => {
                if let Some(reply) = reply {
                    let _ = reply.send(CommandStatus::CommandFailed);
                }
                return Err(checked.err().unwrap_or(PlayerError::NoMedia));
            }
        };
        self.transport_generation += 1;
        let generation = self.transport_generation;

        self.pending_seeks.insert(
            generation,
            PendingSeek {
                filename: filename.to_string(),
                restore_rate: self.transport.rate,
                reply,
            },
        );

        let events = self.events_tx.clone();
        handle.seek(
            target,
            Box::new(move |success| {
                let _ = events.send(ControllerEvent::SeekFinished {
                    generation,
                    success,
                });
            }),
        );
        log::debug!("[Player] Seek #{} to {:.3}s issued", generation, target);

        Ok(SeekTicket { generation, target })
    }

    fn handle_event(&mut self, event: ControllerEvent) -> ControllerUpdate {
        match event {
            ControllerEvent::SeekFinished {
                generation,
                success,
            } => self.finish_seek(generation, success),
            ControllerEvent::Remote {
                load_generation,
                filename,
                command,
                reply,
            } => {
                if load_generation != self.load_generation {
                    log::debug!("[Remote] Ignoring {:?} bound to an earlier load", command);
                    let _ = reply.send(CommandStatus::CommandFailed);
                    return ControllerUpdate::Command {
                        command,
                        status: CommandStatus::CommandFailed,
                    };
                }
                self.handle_remote(command, &filename, reply)
            }
        }
    }

    fn handle_remote(
        &mut self,
        command: RemoteCommand,
        filename: &str,
        reply: oneshot::Sender<CommandStatus>,
    ) -> ControllerUpdate {
        let rate = match command {
            RemoteCommand::Play => RATE_PLAYING,
            RemoteCommand::Pause => RATE_PAUSED,
            RemoteCommand::ChangePlaybackPosition(target) => {
                // A rejected seek has already answered the reply
                return match self.start_seek(target, filename, Some(reply)) {
                    Ok(ticket) => ControllerUpdate::SeekStarted { ticket },
                    Err(e) => {
                        log::warn!("[Remote] Seek to {}s rejected: {}", target, e);
                        ControllerUpdate::Command {
                            command,
                            status: CommandStatus::CommandFailed,
                        }
                    }
                };
            }
        };

        // Play and pause always report success to the system
        if let Err(e) = self.apply_rate(rate, filename) {
            log::warn!("[Remote] {:?} for {} did not complete: {}", command, filename, e);
        }
        let _ = reply.send(CommandStatus::Success);
        ControllerUpdate::Command {
            command,
            status: CommandStatus::Success,
        }
    }

    fn finish_seek(&mut self, generation: u64, success: bool) -> ControllerUpdate {
        let Some(pending) = self.pending_seeks.remove(&generation) else {
            log::debug!("[Player] Completion for unknown seek #{}", generation);
            return ControllerUpdate::Ignored;
        };

        if let Some(reply) = pending.reply {
            let status = if success {
                CommandStatus::Success
            } else {
                CommandStatus::CommandFailed
            };
            let _ = reply.send(status);
        }

        if !success {
            log::warn!("[Player] Seek #{} failed", generation);
            return ControllerUpdate::Seek {
                generation,
                outcome: SeekOutcome::Failed,
            };
        }

        if generation != self.transport_generation {
            log::debug!(
                "[Player] Seek #{} superseded by #{}",
                generation,
                self.transport_generation
            );
            return ControllerUpdate::Seek {
                generation,
                outcome: SeekOutcome::Superseded,
            };
        }

        if let Some(handle) = self.handle.as_mut() {
            handle.set_rate(pending.restore_rate);
        }
        self.transport.rate = pending.restore_rate;
        if let Err(e) = self.push_snapshot(&pending.filename) {
            log::error!("[Player] Snapshot after seek failed: {}", e);
        }

        ControllerUpdate::Seek {
            generation,
            outcome: SeekOutcome::Applied,
        }
    }
}

fn quantise_seek_target(to_seconds: f64) -> Result<f64, PlayerError> {
    if !to_seconds.is_finite() || to_seconds < 0.0 {
        return Err(PlayerError::SeekFailure { target: to_seconds });
    }
    Ok((to_seconds * SEEK_TIMESCALE).round() / SEEK_TIMESCALE)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::player::SeekCallback;
    use crate::db::operations::{KeyValueStore, MemoryStore};
    use crate::db::resume::PLAYBACKS_KEY;
    use crate::error::{EngineError, NowPlayingError, SessionError};
    use crate::playback::remote::CommandKind;
    use parking_lot::Mutex;
    use std::path::{Path, PathBuf};

    #[derive(Default)]
    struct FakeMedia {
        position: f64,
        duration: f64,
        rate: f32,
        // `Some(ok)` completes seeks immediately, `None` parks them
        auto_complete: Option<bool>,
        parked: Vec<(f64, SeekCallback)>,
        opened: Vec<PathBuf>,
    }

    type Shared<T> = Arc<Mutex<T>>;

    struct FakeHandle(Shared<FakeMedia>);

    impl MediaHandle for FakeHandle {
        fn play(&mut self) {
            self.0.lock().rate = 1.0;
        }
        fn pause(&mut self) {
            self.0.lock().rate = 0.0;
        }
        fn set_rate(&mut self, rate: f32) {
            self.0.lock().rate = rate;
        }
        fn rate(&self) -> f32 {
            self.0.lock().rate
        }
        fn position(&self) -> f64 {
            self.0.lock().position
        }
        fn duration(&self) -> f64 {
            self.0.lock().duration
        }
        fn seek(&mut self, to_seconds: f64, on_complete: SeekCallback) {
            let mut media = self.0.lock();
            let auto_complete = media.auto_complete;
            match auto_complete {
                Some(ok) => {
                    if ok {
                        media.position = to_seconds;
                    }
                    drop(media);
                    on_complete(ok);
                }
                None => media.parked.push((to_seconds, on_complete)),
            }
        }
    }

    struct FakeBackend(Shared<FakeMedia>);

    impl MediaBackend for FakeBackend {
        fn open(&mut self, locator: &Path) -> Result<Box<dyn MediaHandle>, EngineError> {
            let mut media = self.0.lock();
            media.opened.push(locator.to_path_buf());
            media.position = 0.0;
            media.rate = 0.0;
            Ok(Box::new(FakeHandle(self.0.clone())))
        }
    }

    struct FakeSession(Shared<bool>);

    impl AudioSession for FakeSession {
        fn configure(&mut self) -> Result<(), SessionError> {
            if *self.0.lock() {
                Err(SessionError("category rejected".into()))
            } else {
                Ok(())
            }
        }
    }

    struct FakeNowPlaying(Shared<Vec<NowPlayingInfo>>);

    impl NowPlaying for FakeNowPlaying {
        fn publish(&mut self, info: &NowPlayingInfo) -> Result<(), NowPlayingError> {
            self.0.lock().push(info.clone());
            Ok(())
        }
    }

    struct FakeCommandCenter(Shared<Option<CommandTable>>);

    impl CommandCenter for FakeCommandCenter {
        fn install(&mut self, table: CommandTable) {
            *self.0.lock() = Some(table);
        }
    }

    struct FakeBundle;

    impl BundleResolver for FakeBundle {
        fn resolve(&self, name: &str, ext: Option<&str>) -> Option<PathBuf> {
            (name == "intro").then(|| PathBuf::from(format!("/bundle/{}.{}", name, ext.unwrap_or("mp4"))))
        }
    }

    struct Harness {
        controller: PlaybackController,
        media: Shared<FakeMedia>,
        session_fails: Shared<bool>,
        published: Shared<Vec<NowPlayingInfo>>,
        table: Shared<Option<CommandTable>>,
        storage: Arc<MemoryStore>,
        store: Arc<PlaybackStore>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_storage(Arc::new(MemoryStore::default()))
        }

        fn with_storage(storage: Arc<MemoryStore>) -> Self {
            let media: Shared<FakeMedia> = Arc::new(Mutex::new(FakeMedia {
                duration: 180.0,
                auto_complete: Some(true),
                ..FakeMedia::default()
            }));
            let session_fails = Arc::new(Mutex::new(false));
            let published = Arc::new(Mutex::new(Vec::new()));
            let table = Arc::new(Mutex::new(None));
            let store = Arc::new(PlaybackStore::new());

            let controller = PlaybackController::new(
                Collaborators {
                    backend: Box::new(FakeBackend(media.clone())),
                    session: Box::new(FakeSession(session_fails.clone())),
                    now_playing: Box::new(FakeNowPlaying(published.clone())),
                    command_center: Box::new(FakeCommandCenter(table.clone())),
                    bundle: Box::new(FakeBundle),
                },
                ResumeLog::new(storage.clone()),
                store.clone(),
            );

            Self {
                controller,
                media,
                session_fails,
                published,
                table,
                storage,
                store,
            }
        }

        fn load(&mut self, path: &str) -> String {
            self.controller
                .load_media(&MediaSource::Locator(PathBuf::from(path)))
                .unwrap()
        }

        fn persisted(&self) -> Vec<Playback> {
            ResumeLog::new(self.storage.clone()).load().unwrap()
        }

        fn set_position(&self, position: f64) {
            self.media.lock().position = position;
        }

        fn dispatch(&self, command: RemoteCommand) -> oneshot::Receiver<CommandStatus> {
            self.table
                .lock()
                .as_ref()
                .expect("command table installed")
                .dispatch(command)
        }
    }

    #[test]
    fn load_derives_filename_and_publishes_initial_snapshot() {
        let mut h = Harness::new();
        let filename = h.load("/music/song.mp3");

        assert_eq!(filename, "song.mp3");
        assert_eq!(h.controller.current_filename(), Some("song.mp3"));
        assert_eq!(h.store.title().as_deref(), Some("song.mp3"));
        assert_eq!(
            h.store.player().map(|p| p.locator),
            Some(PathBuf::from("/music/song.mp3"))
        );

        let published = h.published.lock();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].title, "song.mp3");
        assert_eq!(published[0].rate, 0.0);
        assert_eq!(published[0].duration, 180.0);
    }

    #[test]
    fn bundled_source_resolves_through_bundle() {
        let mut h = Harness::new();
        let filename = h
            .controller
            .load_media(&MediaSource::bundled("intro", Some("mov")))
            .unwrap();

        assert_eq!(filename, "intro.mov");
        assert_eq!(h.media.lock().opened, vec![PathBuf::from("/bundle/intro.mov")]);

        let missing = h.controller.load_media(&MediaSource::bundled("outro", None));
        assert!(matches!(missing, Err(PlayerError::SourceNotFound(_))));
    }

    #[test]
    fn session_failure_is_reported_and_loads_nothing() {
        let mut h = Harness::new();
        *h.session_fails.lock() = true;

        let result = h
            .controller
            .load_media(&MediaSource::Locator(PathBuf::from("/music/song.mp3")));

        assert!(matches!(result, Err(PlayerError::SessionConfig(_))));
        assert!(h.media.lock().opened.is_empty());
        assert!(h.table.lock().is_none());
        assert!(matches!(h.controller.play(), Err(PlayerError::NoMedia)));
    }

    #[test]
    fn play_and_pause_drive_rate() {
        let mut h = Harness::new();
        h.load("/music/song.mp3");

        let info = h.controller.play().unwrap();
        assert_eq!(info.rate, 1.0);
        assert!(h.controller.transport().is_playing());
        assert_eq!(h.media.lock().rate, 1.0);

        let info = h.controller.pause().unwrap();
        assert_eq!(info.rate, 0.0);
        assert_eq!(h.media.lock().rate, 0.0);
    }

    #[test]
    fn snapshot_at_zero_writes_no_record() {
        let mut h = Harness::new();
        h.load("/music/song.mp3");
        h.controller.play().unwrap();

        assert!(h.storage.get(PLAYBACKS_KEY).unwrap().is_none());
        assert!(h.store.playbacks().is_empty());
    }

    #[test]
    fn snapshot_after_progress_persists_record() {
        let mut h = Harness::new();
        h.load("/music/song.mp3");
        h.controller.play().unwrap();

        h.set_position(5.0);
        h.controller.refresh_if_loaded().unwrap();

        let expected = vec![Playback::new("song.mp3", 5.0, 180.0)];
        assert_eq!(h.persisted(), expected);
        assert_eq!(h.store.playbacks(), expected);
    }

    #[test]
    fn reloading_with_other_case_replaces_saved_record() {
        let mut h = Harness::new();
        h.load("/music/song.mp3");
        h.set_position(40.0);
        h.controller.refresh_if_loaded().unwrap();

        h.load("/music/Song.mp3");
        h.set_position(3.0);
        h.controller.refresh_if_loaded().unwrap();

        assert_eq!(h.persisted(), vec![Playback::new("Song.mp3", 3.0, 180.0)]);
    }

    #[test]
    fn refresh_without_media_does_nothing() {
        let mut h = Harness::new();
        assert_eq!(h.controller.refresh_if_loaded().unwrap(), None);
        assert!(h.published.lock().is_empty());
    }

    #[test]
    fn seek_while_playing_resumes_playing() {
        let mut h = Harness::new();
        h.load("/music/song.mp3");
        h.controller.play().unwrap();

        let ticket = h.controller.seek(42.0, "song.mp3").unwrap();
        let updates = h.controller.pump();

        assert_eq!(
            updates,
            vec![ControllerUpdate::Seek {
                generation: ticket.generation,
                outcome: SeekOutcome::Applied
            }]
        );
        assert_eq!(h.controller.transport().rate, 1.0);
        assert_eq!(h.media.lock().rate, 1.0);
        assert_eq!(h.controller.transport().position, 42.0);
    }

    #[test]
    fn seek_while_paused_stays_paused() {
        let mut h = Harness::new();
        h.load("/music/song.mp3");

        h.controller.seek(42.0, "song.mp3").unwrap();
        h.controller.pump();

        assert_eq!(h.controller.transport().rate, 0.0);
        assert_eq!(h.media.lock().rate, 0.0);
        assert_eq!(h.persisted(), vec![Playback::new("song.mp3", 42.0, 180.0)]);
    }

    #[test]
    fn seek_target_is_quantised_to_milliseconds() {
        let mut h = Harness::new();
        h.load("/music/song.mp3");

        let ticket = h.controller.seek(1.23456, "song.mp3").unwrap();
        assert_eq!(ticket.target, 1.235);
    }

    #[test]
    fn invalid_seek_targets_fail_immediately() {
        let mut h = Harness::new();
        h.load("/music/song.mp3");

        assert!(matches!(
            h.controller.seek(-1.0, "song.mp3"),
            Err(PlayerError::SeekFailure { .. })
        ));
        assert!(matches!(
            h.controller.seek(f64::NAN, "song.mp3"),
            Err(PlayerError::SeekFailure { .. })
        ));
    }

    #[test]
    fn failed_seek_leaves_state_unchanged() {
        let mut h = Harness::new();
        h.load("/music/song.mp3");
        h.controller.play().unwrap();
        h.media.lock().auto_complete = Some(false);
        let published_before = h.published.lock().len();

        let ticket = h.controller.seek(500.0, "song.mp3").unwrap();
        let updates = h.controller.pump();

        assert_eq!(
            updates,
            vec![ControllerUpdate::Seek {
                generation: ticket.generation,
                outcome: SeekOutcome::Failed
            }]
        );
        assert_eq!(h.controller.transport().rate, 1.0);
        assert_eq!(h.published.lock().len(), published_before);
    }

    #[test]
    fn stale_seek_completion_does_not_restore_rate() {
        let mut h = Harness::new();
        h.load("/music/song.mp3");
        h.controller.play().unwrap();
        h.media.lock().auto_complete = None;

        let ticket = h.controller.seek(30.0, "song.mp3").unwrap();
        h.controller.pause().unwrap();

        // Complete the parked seek after the pause
        let (_, callback) = h.media.lock().parked.pop().unwrap();
        callback(true);
        let updates = h.controller.pump();

        assert_eq!(
            updates,
            vec![ControllerUpdate::Seek {
                generation: ticket.generation,
                outcome: SeekOutcome::Superseded
            }]
        );
        assert_eq!(h.controller.transport().rate, 0.0);
        assert_eq!(h.media.lock().rate, 0.0);
    }

    #[test]
    fn only_latest_of_overlapping_seeks_applies() {
        let mut h = Harness::new();
        h.load("/music/song.mp3");
        h.controller.play().unwrap();
        h.media.lock().auto_complete = None;

        let first = h.controller.seek(10.0, "song.mp3").unwrap();
        let second = h.controller.seek(20.0, "song.mp3").unwrap();

        // Second lands first, then the first straggles in
        let parked: Vec<_> = h.media.lock().parked.drain(..).collect();
        let mut parked = parked.into_iter();
        let (_, first_cb) = parked.next().unwrap();
        let (_, second_cb) = parked.next().unwrap();
        second_cb(true);
        first_cb(true);

        let updates = h.controller.pump();
        assert_eq!(
            updates,
            vec![
                ControllerUpdate::Seek {
                    generation: second.generation,
                    outcome: SeekOutcome::Applied
                },
                ControllerUpdate::Seek {
                    generation: first.generation,
                    outcome: SeekOutcome::Superseded
                },
            ]
        );
        assert_eq!(h.controller.transport().rate, 1.0);
    }

    #[test]
    fn load_installs_table_bound_to_filename() {
        let mut h = Harness::new();
        h.load("/music/song.mp3");

        let table = h.table.lock().clone().unwrap();
        assert_eq!(table.filename(), "song.mp3");
        assert!(table.handler(CommandKind::Play).is_some());
        assert!(table.handler(CommandKind::Pause).is_some());
        assert!(table.handler(CommandKind::ChangePlaybackPosition).is_some());

        h.load("/music/other.mp3");
        let replaced = h.table.lock().clone().unwrap();
        assert_eq!(replaced.filename(), "other.mp3");
        assert!(replaced.load_generation() > table.load_generation());
    }

    #[test]
    fn remote_play_and_pause_report_success() {
        let mut h = Harness::new();
        h.load("/music/song.mp3");

        let mut status = h.dispatch(RemoteCommand::Play);
        h.controller.pump();
        assert_eq!(status.try_recv().unwrap(), CommandStatus::Success);
        assert!(h.controller.transport().is_playing());

        let mut status = h.dispatch(RemoteCommand::Pause);
        h.controller.pump();
        assert_eq!(status.try_recv().unwrap(), CommandStatus::Success);
        assert!(!h.controller.transport().is_playing());
    }

    #[test]
    fn remote_seek_reports_underlying_result() {
        let mut h = Harness::new();
        h.load("/music/song.mp3");
        h.controller.play().unwrap();

        let mut status = h.dispatch(RemoteCommand::ChangePlaybackPosition(60.0));
        // First pump issues the seek, the queued completion lands on the same pass
        h.controller.pump();
        assert_eq!(status.try_recv().unwrap(), CommandStatus::Success);
        assert_eq!(h.controller.transport().rate, 1.0);
        assert_eq!(h.controller.transport().position, 60.0);

        h.media.lock().auto_complete = Some(false);
        let mut status = h.dispatch(RemoteCommand::ChangePlaybackPosition(900.0));
        h.controller.pump();
        assert_eq!(status.try_recv().unwrap(), CommandStatus::CommandFailed);
    }

    #[test]
    fn remote_seek_to_invalid_target_fails() {
        let mut h = Harness::new();
        h.load("/music/song.mp3");

        let mut status = h.dispatch(RemoteCommand::ChangePlaybackPosition(-5.0));
        let updates = h.controller.pump();

        assert_eq!(status.try_recv().unwrap(), CommandStatus::CommandFailed);
        assert_eq!(
            updates,
            vec![ControllerUpdate::Command {
                command: RemoteCommand::ChangePlaybackPosition(-5.0),
                status: CommandStatus::CommandFailed
            }]
        );
    }

    #[test]
    fn handler_from_earlier_load_is_rejected() {
        let mut h = Harness::new();
        h.load("/music/first.mp3");
        let stale = h.table.lock().clone().unwrap();
        h.load("/music/second.mp3");

        let mut status = stale.dispatch(RemoteCommand::Play);
        h.controller.pump();

        assert_eq!(status.try_recv().unwrap(), CommandStatus::CommandFailed);
        assert!(!h.controller.transport().is_playing());
    }

    #[test]
    fn resume_saved_seeks_to_recorded_position() {
        let storage = Arc::new(MemoryStore::default());
        ResumeLog::new(storage.clone())
            .record("Song.mp3", 77.0, 180.0)
            .unwrap();
        let mut h = Harness::with_storage(storage);
        h.load("/music/song.mp3");

        let ticket = h.controller.resume_saved().unwrap().unwrap();
        h.controller.pump();

        assert_eq!(ticket.target, 77.0);
        assert_eq!(h.controller.transport().position, 77.0);
    }

    #[test]
    fn resume_saved_without_record_is_none() {
        let mut h = Harness::new();
        h.load("/music/song.mp3");
        assert_eq!(h.controller.resume_saved().unwrap(), None);
    }

    #[test]
    fn reload_playbacks_mirrors_storage_into_store() {
        let storage = Arc::new(MemoryStore::default());
        ResumeLog::new(storage.clone())
            .record("a.mp3", 1.0, 2.0)
            .unwrap();
        let mut h = Harness::with_storage(storage);

        let playbacks = h.controller.reload_playbacks().unwrap();
        assert_eq!(playbacks, vec![Playback::new("a.mp3", 1.0, 2.0)]);
        assert_eq!(h.store.playbacks(), playbacks);
    }

    #[test]
    fn reload_playbacks_reports_corrupt_storage() {
        let storage = Arc::new(MemoryStore::default());
        storage.set(PLAYBACKS_KEY, b"{broken").unwrap();
        let mut h = Harness::with_storage(storage);
        h.store.set_playbacks(vec![Playback::new("stale.mp3", 1.0, 1.0)]);

        let result = h.controller.reload_playbacks();

        assert!(matches!(result, Err(PlayerError::Storage(_))));
        assert!(h.store.playbacks().is_empty());
    }

    #[test]
    fn non_finite_duration_is_published_as_zero() {
        let mut h = Harness::new();
        h.media.lock().duration = f64::NAN;
        h.load("/music/live.mp3");
        h.set_position(2.0);

        let info = h.controller.refresh_if_loaded().unwrap().unwrap();
        assert_eq!(info.duration, 0.0);
        assert_eq!(h.persisted(), vec![Playback::new("live.mp3", 2.0, 0.0)]);
    }

    #[test]
    fn failed_load_keeps_earlier_seek_from_resuming_old_media() {
        let mut h = Harness::new();
        h.load("/music/song.mp3");
        h.controller.play().unwrap();
        h.media.lock().auto_complete = None;

        let ticket = h.controller.seek(30.0, "song.mp3").unwrap();
        *h.session_fails.lock() = true;
        let result = h
            .controller
            .load_media(&MediaSource::Locator(PathBuf::from("/music/next.mp3")));
        assert!(matches!(result, Err(PlayerError::SessionConfig(_))));
        assert_eq!(h.media.lock().rate, 0.0);

        let last = h.published.lock().last().cloned().unwrap();
        assert_eq!(last.title, "song.mp3");
        assert_eq!(last.rate, 0.0);

        let (_, callback) = h.media.lock().parked.pop().unwrap();
        callback(true);
        let updates = h.controller.pump();

        assert_eq!(
            updates,
            vec![ControllerUpdate::Seek {
                generation: ticket.generation,
                outcome: SeekOutcome::Superseded
            }]
        );
        assert_eq!(h.media.lock().rate, 0.0);
        assert_eq!(h.controller.transport().rate, 0.0);
        assert_eq!(h.controller.current_filename(), Some("song.mp3"));
    }

    #[test]
    fn new_load_fails_remote_seek_left_on_old_media() {
        let mut h = Harness::new();
        h.load("/music/song.mp3");
        h.media.lock().auto_complete = None;

        let mut status = h.dispatch(RemoteCommand::ChangePlaybackPosition(60.0));
        let updates = h.controller.pump();
        assert!(matches!(updates[..], [ControllerUpdate::SeekStarted { .. }]));
        assert!(status.try_recv().is_err());

        h.load("/music/other.mp3");
        assert_eq!(status.try_recv().unwrap(), CommandStatus::CommandFailed);

        // The old handle finishing late changes nothing
        let (_, callback) = h.media.lock().parked.pop().unwrap();
        callback(true);
        assert_eq!(h.controller.pump(), vec![ControllerUpdate::Ignored]);
        assert_eq!(h.controller.current_filename(), Some("other.mp3"));
    }

    #[tokio::test]
    async fn next_event_waits_for_completion_from_another_thread() {
        let mut h = Harness::new();
        h.load("/music/song.mp3");
        h.controller.play().unwrap();
        h.media.lock().auto_complete = None;

        let ticket = h.controller.seek(15.0, "song.mp3").unwrap();
        let (_, callback) = h.media.lock().parked.pop().unwrap();
        let media = h.media.clone();
        std::thread::spawn(move || {
            media.lock().position = 15.0;
            callback(true);
        });

        let update = h.controller.next_event().await;
        assert_eq!(
            update,
            Some(ControllerUpdate::Seek {
                generation: ticket.generation,
                outcome: SeekOutcome::Applied
            })
        );
        assert_eq!(h.controller.transport().position, 15.0);
    }
}
