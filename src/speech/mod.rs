// Speech generation collaborator
// Style model, prompt building and the remote API client

pub mod gemini;
pub mod prompt;
pub mod style;

pub use gemini::{GeminiClient, SpeechApi, SpeechRequest, SpeechResponse};
pub use prompt::build_prompt;
pub use style::{Age, Gender, Mood, PresetId, StyleOptions, StyleParameters, VoicePreset};
