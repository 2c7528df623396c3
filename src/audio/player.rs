// Audio player implementation
// One playback session at a time, routed through a gain node that lives as
// long as the output context
use parking_lot::Mutex;
use std::sync::Arc;

use super::codec::{self, RawAudioBytes};
use super::context::{AudioContext, ContextHandle};
use super::graph::{GainNode, SourceNode};
use crate::error::PlaybackError;

/// Time constant of the volume glide, in seconds
pub const DEFAULT_VOLUME_RAMP_SECS: f64 = 0.1;

#[derive(Default)]
struct PlaybackState {
    session: Option<SourceNode>,
    gain: Option<GainNode>,
}

pub struct Player {
    context: ContextHandle,
    state: Mutex<PlaybackState>,
    volume_ramp_secs: f64,
}

impl Player {
    pub fn new(context: ContextHandle) -> Self {
        Self::with_volume_ramp(context, DEFAULT_VOLUME_RAMP_SECS)
    }

    pub fn with_volume_ramp(context: ContextHandle, volume_ramp_secs: f64) -> Self {
        Self {
            context,
            state: Mutex::new(PlaybackState::default()),
            volume_ramp_secs,
        }
    }

    /// Play 24 kHz mono PCM, replacing whatever is currently playing.
    ///
    /// `speed` scales the playback rate, so pitch moves with it.
    pub fn play(
        &self,
        bytes: &RawAudioBytes,
        volume: f32,
        speed: f32,
    ) -> Result<(), PlaybackError> {
        // Opening the device may block; keep the session lock free meanwhile
        let context = self.context.get_or_init()?;
        let buffer = codec::to_playable_buffer(bytes, codec::SAMPLE_RATE, codec::CHANNELS);

        let mut state = self.state.lock();

        // Stop current playback if any
        Self::stop_session(&mut state);

        let gain = Self::gain_node(&mut state, &context);
        gain.set_value_at_time(volume.clamp(0.0, 1.0), context.current_time());

        let source = context.create_buffer_source(&buffer);
        source.set_playback_rate(speed)?;
        source.connect(gain)?;
        source.start()?;

        tracing::debug!(
            "Playing {:.2}s of audio at {:.2}x speed, volume {:.2}",
            buffer.duration_secs(),
            speed,
            volume
        );

        state.session = Some(source);
        Ok(())
    }

    /// Glide towards `level` instead of jumping, to avoid clicks
    pub fn set_volume(&self, level: f32) {
        let Some(context) = self.context.get() else {
            return;
        };
        let state = self.state.lock();
        let Some(gain) = state.gain.as_ref() else {
            return;
        };
        gain.set_target_at_time(
            level.clamp(0.0, 1.0),
            context.current_time(),
            self.volume_ramp_secs,
        );
    }

    pub fn stop(&self) {
        Self::stop_session(&mut self.state.lock());
    }

    /// Whether the current session still has audio left to play
    pub fn is_playing(&self) -> bool {
        self.state
            .lock()
            .session
            .as_ref()
            .map(|s| !s.has_ended())
            .unwrap_or(false)
    }

    /// Current gain, if a gain node was created
    pub fn volume(&self) -> Option<f32> {
        self.state.lock().gain.as_ref().map(|g| g.value())
    }

    /// The shared context, if playback has happened at least once
    pub fn context(&self) -> Option<Arc<AudioContext>> {
        self.context.get()
    }

    fn stop_session(state: &mut PlaybackState) {
        if let Some(session) = state.session.take() {
            // Finishing naturally is not an error
            if let Err(e) = session.stop() {
                tracing::debug!("Ignoring stop on finished source: {}", e);
            }
        }
    }

    fn gain_node<'a>(state: &'a mut PlaybackState, context: &AudioContext) -> &'a GainNode {
        state.gain.get_or_insert_with(|| {
            let gain = context.create_gain();
            gain.connect_to_destination();
            gain
        })
    }
}
