// Audio pipeline module
// PCM codec, render graph and playback; cpal output behind the `device` feature

pub mod codec;
pub mod context;
pub mod graph;
#[cfg(feature = "device")]
pub mod output;
pub mod player;

pub use codec::{DecodedAudioBuffer, RawAudioBytes, WavBlob};
pub use context::{AudioContext, ContextHandle};
pub use player::Player;
