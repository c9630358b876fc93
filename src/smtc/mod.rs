// System media transport integration
// Windows publishes to SMTC; other platforms log the descriptor and keep the
// installed command table so the host can press buttons itself.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::playback::remote::{CommandStatus, CommandTable, RemoteCommand};

#[cfg(windows)]
mod windows_smtc;

#[cfg(windows)]
pub use windows_smtc::*;

/// Command table slot shared between the manager and its button callbacks.
type SharedTable = Arc<Mutex<Option<CommandTable>>>;

fn dispatch_to(
    table: &SharedTable,
    command: RemoteCommand,
) -> Option<oneshot::Receiver<CommandStatus>> {
    let guard = table.lock();
    match guard.as_ref() {
        Some(table) => Some(table.dispatch(command)),
        None => {
            log::debug!("[SMTC] {:?} pressed with nothing loaded", command);
            None
        }
    }
}

// Logging stand-in for non-Windows platforms
#[cfg(not(windows))]
mod stub {
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::sync::oneshot;

    use super::{dispatch_to, SharedTable};
    use crate::error::NowPlayingError;
    use crate::playback::now_playing::{NowPlaying, NowPlayingInfo};
    use crate::playback::remote::{CommandCenter, CommandStatus, CommandTable, RemoteCommand};

    /// Clones share the same published state and command table.
    #[derive(Clone, Default)]
    pub struct SmtcManager {
        last: Arc<Mutex<Option<NowPlayingInfo>>>,
        table: SharedTable,
    }

    impl SmtcManager {
        pub fn new() -> Result<Self, NowPlayingError> {
            Ok(Self::default())
        }

        pub fn last_published(&self) -> Option<NowPlayingInfo> {
            self.last.lock().clone()
        }

        pub fn installed(&self) -> Option<CommandTable> {
            self.table.lock().clone()
        }

        /// Simulate a system button press.
        pub fn press(&self, command: RemoteCommand) -> Option<oneshot::Receiver<CommandStatus>> {
            dispatch_to(&self.table, command)
        }
    }

    impl NowPlaying for SmtcManager {
        fn publish(&mut self, info: &NowPlayingInfo) -> Result<(), NowPlayingError> {
            log::debug!(
                "[SMTC] {} {:.1}/{:.1}s rate {}",
                info.title,
                info.elapsed,
                info.duration,
                info.rate
            );
            *self.last.lock() = Some(info.clone());
            Ok(())
        }
    }

    impl CommandCenter for SmtcManager {
        fn install(&mut self, table: CommandTable) {
            log::debug!("[SMTC] Command handlers bound to {}", table.filename());
            *self.table.lock() = Some(table);
        }
    }
}

#[cfg(not(windows))]
pub use stub::*;
