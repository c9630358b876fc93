// Durable storage module
// Key-value backends and the resume-position log built on top of them

pub mod connection;
pub mod migrations;
pub mod models;
pub mod operations;
pub mod resume;

pub use connection::DatabaseConnection;
pub use models::Playback;
pub use operations::{JsonFileStore, KeyValueStore, MemoryStore};
pub use resume::ResumeLog;
