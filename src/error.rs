// Error types shared across the audio pipeline and the generation flow
use thiserror::Error;

/// Failures while turning a payload into audio bytes or parsing a WAV container
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid base64 audio payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid WAV data: {0}")]
    InvalidWav(&'static str),
}

/// Failures reported by (or while talking to) the remote speech API
#[derive(Debug, Error)]
pub enum RemoteApiError {
    #[error("No API key configured. Set {0} and restart the application.")]
    MissingApiKey(String),

    #[error("failed to create HTTP client: {0}")]
    Client(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("speech API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response from speech API: {0}")]
    InvalidResponse(String),

    #[error("No audio data received from API")]
    NoAudioPayload,
}

/// Failures opening or driving the audio output device
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("No output device available")]
    NoOutputDevice,

    #[error("failed to get output config: {0}")]
    DeviceConfig(String),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("audio stream error: {0}")]
    Stream(String),

    #[error("audio output thread exited before the device was ready")]
    DeviceThread,

    #[error("audio output requires the `device` feature")]
    DeviceUnavailable,

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Misuse of a node in the render graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("source has already ended")]
    SourceEnded,

    #[error("source was already started")]
    AlreadyStarted,

    #[error("node {0} is not part of this graph")]
    NodeMissing(usize),
}

/// Everything that can go wrong during one generation attempt
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("text to speak is empty")]
    InvalidInput,

    #[error("The returned audio could not be decoded ({0})")]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Remote(#[from] RemoteApiError),

    #[error("Audio playback failed: {0}")]
    Playback(#[from] PlaybackError),
}

impl GenerationError {
    /// Message shown in the UI error banner
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Remote(RemoteApiError::Network(_)) => {
                "Could not reach the speech service. Check your connection and try again."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}
