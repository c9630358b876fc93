// Audio/video playback seams
// Media handles, the audio session, and source resolution

pub mod player;
pub mod session;
pub mod source;

pub use player::{ClockBackend, MediaBackend, MediaHandle, SeekCallback};
pub use session::{AudioSession, DesktopAudioSession};
pub use source::{filename_of, BundleResolver, DirectoryBundle, MediaSource};
