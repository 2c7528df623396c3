// Generation orchestrator
// Turns text + style into audio: remote request, decode, store, play.
// Holds the last successful clip for replay and download.
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

use crate::audio::codec::{self, RawAudioBytes, WavBlob};
use crate::audio::player::Player;
use crate::error::GenerationError;
use crate::speech::gemini::{SpeechApi, SpeechRequest, DEFAULT_MODEL};
use crate::speech::prompt::build_prompt;
use crate::speech::style::StyleParameters;

pub const MIN_SPEED: f32 = 0.5;
pub const MAX_SPEED: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GenerationStatus {
    Idle,
    Requesting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyText,
    Busy,
}

/// What a call to `generate` ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// Nothing was sent
    Skipped(SkipReason),
    /// Audio was stored and is playing
    Succeeded,
    /// Message for the error banner
    Failed(String),
    /// A reset happened while the request was in flight; the response was dropped
    Superseded,
}

/// State exposed to the UI
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSnapshot {
    pub status: GenerationStatus,
    pub error: Option<String>,
    pub has_result: bool,
    pub generation: u64,
    pub volume: f32,
    pub speed: f32,
    pub is_playing: bool,
    /// A request is still waiting on the API, even if a reset made it stale
    pub request_in_flight: bool,
}

struct OrchestratorState {
    status: GenerationStatus,
    /// Bumped on every request and on reset; responses for an older value are dropped
    generation: u64,
    /// Set while a `generate` call awaits the API; only that call clears it
    in_flight: bool,
    last_result: Option<RawAudioBytes>,
    last_error: Option<String>,
    volume: f32,
    speed: f32,
}

pub struct Orchestrator {
    api: Arc<dyn SpeechApi>,
    player: Arc<Player>,
    model_id: String,
    inner: Mutex<OrchestratorState>,
}

impl Orchestrator {
    pub fn new(api: Arc<dyn SpeechApi>, player: Arc<Player>) -> Self {
        Self {
            api,
            player,
            model_id: DEFAULT_MODEL.to_string(),
            inner: Mutex::new(OrchestratorState {
                status: GenerationStatus::Idle,
                generation: 0,
                in_flight: false,
                last_result: None,
                last_error: None,
                volume: 1.0,
                speed: 1.0,
            }),
        }
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Starting volume and speed, clamped like the setters
    pub fn with_playback_defaults(self, volume: f32, speed: f32) -> Self {
        {
            let mut inner = self.inner.lock();
            inner.volume = clamp_volume(volume);
            inner.speed = clamp_speed(speed);
        }
        self
    }

    pub fn player(&self) -> &Arc<Player> {
        &self.player
    }

    /// Request speech for `text` and play it.
    ///
    /// Blank text and calls made while a request is in flight are ignored,
    /// including after a `reset` that made that request stale.
    pub async fn generate(&self, text: &str, style: &StyleParameters) -> GenerateOutcome {
        if text.trim().is_empty() {
            return GenerateOutcome::Skipped(SkipReason::EmptyText);
        }

        let generation = {
            let mut inner = self.inner.lock();
            if inner.in_flight {
                return GenerateOutcome::Skipped(SkipReason::Busy);
            }
            inner.in_flight = true;
            inner.status = GenerationStatus::Requesting;
            inner.last_error = None;
            inner.last_result = None;
            inner.generation += 1;
            inner.generation
        };

        let request = SpeechRequest {
            model_id: self.model_id.clone(),
            prompt: build_prompt(text, style),
            voice_name: style.voice_name().to_string(),
        };
        tracing::info!(
            "Generating speech #{} ({} chars, voice {})",
            generation,
            text.chars().count(),
            request.voice_name
        );

        let result = self.fetch(&request).await;

        let (bytes, volume, speed) = {
            let mut inner = self.inner.lock();
            inner.in_flight = false;
            if inner.generation != generation {
                tracing::info!("Dropping response for superseded generation #{}", generation);
                return GenerateOutcome::Superseded;
            }

            let bytes = match result {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("Generation #{} failed: {}", generation, e);
                    let message = e.user_message();
                    inner.status = GenerationStatus::Failed;
                    inner.last_error = Some(message.clone());
                    return GenerateOutcome::Failed(message);
                }
            };

            tracing::info!(
                "Generation #{} produced {:.2}s of audio",
                generation,
                bytes.duration_secs(codec::SAMPLE_RATE)
            );
            inner.last_result = Some(bytes.clone());
            inner.status = GenerationStatus::Succeeded;
            (bytes, inner.volume, inner.speed)
        };

        // Opening the device can block, so play without holding the state lock.
        // The clip stays available for replay and download even if playback fails.
        if let Err(e) = self.player.play(&bytes, volume, speed) {
            let e = GenerationError::from(e);
            tracing::error!("Playback of generation #{} failed: {}", generation, e);
            let message = e.user_message();
            let mut inner = self.inner.lock();
            if inner.generation == generation {
                inner.status = GenerationStatus::Failed;
                inner.last_error = Some(message.clone());
            }
            return GenerateOutcome::Failed(message);
        }

        GenerateOutcome::Succeeded
    }

    async fn fetch(&self, request: &SpeechRequest) -> Result<RawAudioBytes, GenerationError> {
        let response = self.api.synthesize(request).await?;
        let bytes = codec::decode_base64(&response.audio_base64)?;
        tracing::debug!("Decoded {} bytes of PCM", bytes.len());
        Ok(bytes)
    }

    /// Play the last clip again without a network call. Returns false if there is none.
    pub fn replay(&self) -> Result<bool, GenerationError> {
        let (bytes, volume, speed) = {
            let inner = self.inner.lock();
            let Some(bytes) = inner.last_result.clone() else {
                return Ok(false);
            };
            (bytes, inner.volume, inner.speed)
        };
        self.player.play(&bytes, volume, speed)?;
        Ok(true)
    }

    /// The last clip as a WAV file
    pub fn download(&self) -> Option<WavBlob> {
        self.inner
            .lock()
            .last_result
            .as_ref()
            .map(|bytes| codec::encode_wav(bytes, codec::SAMPLE_RATE))
    }

    /// Store the level and glide the live gain towards it
    pub fn set_volume(&self, level: f32) -> f32 {
        let volume = clamp_volume(level);
        self.inner.lock().volume = volume;
        self.player.set_volume(volume);
        volume
    }

    /// Takes effect on the next play
    pub fn set_speed(&self, speed: f32) -> f32 {
        let mut inner = self.inner.lock();
        inner.speed = clamp_speed(speed);
        inner.speed
    }

    pub fn stop(&self) {
        self.player.stop();
    }

    /// Back to Idle: stops playback, forgets the last clip and error,
    /// and makes any in-flight response stale. A request already sent keeps
    /// blocking new ones until its response arrives.
    pub fn reset(&self) {
        {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.status = GenerationStatus::Idle;
            inner.last_result = None;
            inner.last_error = None;
        }
        self.player.stop();
        tracing::info!("Generation state reset");
    }

    pub fn status(&self) -> GenerationStatus {
        self.inner.lock().status
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.lock().last_error.clone()
    }

    pub fn last_result(&self) -> Option<RawAudioBytes> {
        self.inner.lock().last_result.clone()
    }

    pub fn snapshot(&self) -> GenerationSnapshot {
        let is_playing = self.player.is_playing();
        let inner = self.inner.lock();
        GenerationSnapshot {
            status: inner.status,
            error: inner.last_error.clone(),
            has_result: inner.last_result.is_some(),
            generation: inner.generation,
            volume: inner.volume,
            speed: inner.speed,
            is_playing,
            request_in_flight: inner.in_flight,
        }
    }
}

fn clamp_volume(level: f32) -> f32 {
    if level.is_nan() {
        return 1.0;
    }
    level.clamp(0.0, 1.0)
}

fn clamp_speed(speed: f32) -> f32 {
    if speed.is_nan() {
        return 1.0;
    }
    speed.clamp(MIN_SPEED, MAX_SPEED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamps() {
        assert_eq!(clamp_volume(1.5), 1.0);
        assert_eq!(clamp_volume(-0.2), 0.0);
        assert_eq!(clamp_volume(f32::NAN), 1.0);
        assert_eq!(clamp_speed(0.1), MIN_SPEED);
        assert_eq!(clamp_speed(3.0), MAX_SPEED);
        assert_eq!(clamp_speed(1.25), 1.25);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let snapshot = GenerationSnapshot {
            status: GenerationStatus::Succeeded,
            error: None,
            has_result: true,
            generation: 3,
            volume: 0.5,
            speed: 1.0,
            is_playing: false,
            request_in_flight: false,
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["status"], "succeeded");
        assert_eq!(value["hasResult"], true);
        assert_eq!(value["isPlaying"], false);
        assert_eq!(value["requestInFlight"], false);
        assert!(value["error"].is_null());
    }
}
