// Media handles and the wall-clock backend
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::error::EngineError;
use crate::metadata::extractor::probe_duration;

/// Called once when a seek finishes; `true` if the seek landed.
/// May be invoked from any thread.
pub type SeekCallback = Box<dyn FnOnce(bool) + Send + 'static>;

/// One opened piece of media, as handed out by the host media framework.
pub trait MediaHandle: Send {
    fn play(&mut self);
    fn pause(&mut self);
    fn set_rate(&mut self, rate: f32);
    fn rate(&self) -> f32;
    /// Current position in seconds.
    fn position(&self) -> f64;
    /// Total duration in seconds, 0.0 when unknown.
    fn duration(&self) -> f64;
    fn seek(&mut self, to_seconds: f64, on_complete: SeekCallback);
}

/// Factory for media handles.
pub trait MediaBackend: Send {
    fn open(&mut self, locator: &Path) -> Result<Box<dyn MediaHandle>, EngineError>;
}

/// Backend that produces no sound: position advances with the wall clock
/// at the current rate. Durations come from the file's metadata.
#[derive(Debug, Default)]
pub struct ClockBackend;

impl MediaBackend for ClockBackend {
    fn open(&mut self, locator: &Path) -> Result<Box<dyn MediaHandle>, EngineError> {
        if !locator.is_file() {
            return Err(EngineError::Open {
                path: locator.display().to_string(),
                reason: "no such file".to_string(),
            });
        }

        let duration = probe_duration(locator).unwrap_or(0.0);
        log::debug!("[Clock] Opened {:?} ({:.3}s)", locator, duration);
        Ok(Box::new(ClockHandle::new(locator.to_path_buf(), duration)))
    }
}

pub struct ClockHandle {
    path: PathBuf,
    duration: f64,
    rate: f32,
    // Position at `anchor`; the anchor is only set while the rate is non-zero
    base_position: f64,
    anchor: Option<Instant>,
}

impl ClockHandle {
    pub fn new(path: PathBuf, duration: f64) -> Self {
        Self {
            path,
            duration,
            rate: 0.0,
            base_position: 0.0,
            anchor: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn clamp(&self, position: f64) -> f64 {
        if self.duration > 0.0 {
            position.clamp(0.0, self.duration)
        } else {
            position.max(0.0)
        }
    }
}

impl MediaHandle for ClockHandle {
    fn play(&mut self) {
        self.set_rate(1.0);
    }

    fn pause(&mut self) {
        self.set_rate(0.0);
    }

    fn set_rate(&mut self, rate: f32) {
        self.base_position = self.position();
        self.rate = rate;
        self.anchor = (rate != 0.0).then(Instant::now);
    }

    fn rate(&self) -> f32 {
        self.rate
    }

    fn position(&self) -> f64 {
        let advanced = self
            .anchor
            .map(|anchor| anchor.elapsed().as_secs_f64() * f64::from(self.rate))
            .unwrap_or(0.0);
        self.clamp(self.base_position + advanced)
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn seek(&mut self, to_seconds: f64, on_complete: SeekCallback) {
        if to_seconds < 0.0 || (self.duration > 0.0 && to_seconds > self.duration) {
            on_complete(false);
            return;
        }

        self.base_position = to_seconds;
        if self.anchor.is_some() {
            self.anchor = Some(Instant::now());
        }
        on_complete(true);
    }
}
