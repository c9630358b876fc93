// System transport commands (lock screen, media keys, overlay scrubber)
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Play,
    Pause,
    ChangePlaybackPosition,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemoteCommand {
    Play,
    Pause,
    /// Target position in seconds.
    ChangePlaybackPosition(f64),
}

impl RemoteCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Play => CommandKind::Play,
            Self::Pause => CommandKind::Pause,
            Self::ChangePlaybackPosition(_) => CommandKind::ChangePlaybackPosition,
        }
    }
}

/// Status reported back to the system for one command invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    CommandFailed,
}

/// Work queued for the controller's owning context.
#[derive(Debug)]
pub(crate) enum ControllerEvent {
    Remote {
        load_generation: u64,
        filename: String,
        command: RemoteCommand,
        reply: oneshot::Sender<CommandStatus>,
    },
    SeekFinished {
        generation: u64,
        success: bool,
    },
}

/// Handler for one command slot, bound to the file loaded when it was made.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    kind: CommandKind,
    filename: String,
    load_generation: u64,
    events: mpsc::UnboundedSender<ControllerEvent>,
}

impl CommandHandler {
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Queue `command` for the controller. The receiver resolves once the
    /// controller has handled it; it closes if the controller is gone.
    pub fn invoke(&self, command: RemoteCommand) -> oneshot::Receiver<CommandStatus> {
        let (reply, status) = oneshot::channel();

        if command.kind() != self.kind {
            let _ = reply.send(CommandStatus::CommandFailed);
            return status;
        }

        let event = ControllerEvent::Remote {
            load_generation: self.load_generation,
            filename: self.filename.clone(),
            command,
            reply,
        };
        if self.events.send(event).is_err() {
            log::warn!("[Remote] Controller gone, dropping {:?}", command);
        }
        status
    }
}

/// The full set of handlers installed for one load. Installing a new table
/// replaces every slot at once.
#[derive(Debug, Clone)]
pub struct CommandTable {
    filename: String,
    load_generation: u64,
    handlers: HashMap<CommandKind, CommandHandler>,
}

impl CommandTable {
    pub(crate) fn new(
        filename: &str,
        load_generation: u64,
        events: &mpsc::UnboundedSender<ControllerEvent>,
    ) -> Self {
        let handlers = [
            CommandKind::Play,
            CommandKind::Pause,
            CommandKind::ChangePlaybackPosition,
        ]
        .into_iter()
        .map(|kind| {
            let handler = CommandHandler {
                kind,
                filename: filename.to_string(),
                load_generation,
                events: events.clone(),
            };
            (kind, handler)
        })
        .collect();

        Self {
            filename: filename.to_string(),
            load_generation,
            handlers,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn load_generation(&self) -> u64 {
        self.load_generation
    }

    pub fn handler(&self, kind: CommandKind) -> Option<&CommandHandler> {
        self.handlers.get(&kind)
    }

    /// Route `command` to the handler for its slot.
    pub fn dispatch(&self, command: RemoteCommand) -> oneshot::Receiver<CommandStatus> {
        match self.handler(command.kind()) {
            Some(handler) => handler.invoke(command),
            None => {
                let (reply, status) = oneshot::channel();
                let _ = reply.send(CommandStatus::CommandFailed);
                status
            }
        }
    }
}

/// Host registry for the play, pause and seek command slots.
pub trait CommandCenter: Send {
    fn install(&mut self, table: CommandTable);
}
