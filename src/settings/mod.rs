// Settings module
// Application configuration loaded from the app data directory

#[allow(clippy::module_inception)]
pub mod settings;

pub use settings::{AppSettings, AudioSettings, ExportSettings, SpeechSettings};
