// Playback module
// Transport state, now-playing publication and system command handling

pub mod controller;
pub mod now_playing;
pub mod remote;
pub mod transport;

pub use controller::{
    Collaborators, ControllerUpdate, PlaybackController, SeekOutcome, SeekTicket,
};
pub use now_playing::{Artwork, NowPlaying, NowPlayingInfo};
pub use remote::{CommandCenter, CommandKind, CommandStatus, CommandTable, RemoteCommand};
pub use transport::TransportState;
