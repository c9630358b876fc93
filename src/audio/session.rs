// Audio output session configuration
use crate::error::SessionError;

/// Host audio session that must be configured before media is loaded.
pub trait AudioSession: Send {
    /// Select the playback category, default mode, and activate the session.
    fn configure(&mut self) -> Result<(), SessionError>;
}

/// Desktop hosts have no session negotiation; activation always succeeds.
#[derive(Debug, Default)]
pub struct DesktopAudioSession {
    active: bool,
}

impl DesktopAudioSession {
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl AudioSession for DesktopAudioSession {
    fn configure(&mut self) -> Result<(), SessionError> {
        if !self.active {
            log::info!("[Session] Activated audio session (category: playback, mode: default)");
        }
        self.active = true;
        Ok(())
    }
}
