// Output context
// Owns the render graph and, with the `device` feature, the hardware stream
// that pulls from it.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use super::codec::DecodedAudioBuffer;
use super::graph::{GainNode, Graph, SourceNode};
use crate::error::PlaybackError;

#[cfg(feature = "device")]
use super::output::DeviceOutput;

pub struct AudioContext {
    graph: Arc<Mutex<Graph>>,
    #[cfg(feature = "device")]
    _output: Option<DeviceOutput>,
}

impl AudioContext {
    /// A context whose clock only advances through explicit `render` calls
    pub fn offline(sample_rate: u32) -> Self {
        Self {
            graph: Arc::new(Mutex::new(Graph::new(sample_rate))),
            #[cfg(feature = "device")]
            _output: None,
        }
    }

    /// A context rendering to the default output device.
    ///
    /// The device is asked for `sample_rate`; if it cannot run at that rate the
    /// graph runs at the device rate and resamples buffers on the fly.
    #[cfg(feature = "device")]
    pub fn open_default(sample_rate: u32) -> Result<Self, PlaybackError> {
        let graph = Arc::new(Mutex::new(Graph::new(sample_rate)));
        let output = DeviceOutput::open(Arc::clone(&graph), sample_rate)?;
        tracing::info!(
            "Output device running at {} Hz with {} channel(s)",
            output.sample_rate(),
            output.channels()
        );
        Ok(Self {
            graph,
            _output: Some(output),
        })
    }

    #[cfg(not(feature = "device"))]
    pub fn open_default(_sample_rate: u32) -> Result<Self, PlaybackError> {
        Err(PlaybackError::DeviceUnavailable)
    }

    pub fn sample_rate(&self) -> u32 {
        self.graph.lock().sample_rate()
    }

    /// Seconds of audio rendered since the context was created
    pub fn current_time(&self) -> f64 {
        self.graph.lock().current_time()
    }

    pub fn create_gain(&self) -> GainNode {
        GainNode::create(&self.graph, 1.0)
    }

    pub fn create_buffer_source(&self, buffer: &DecodedAudioBuffer) -> SourceNode {
        SourceNode::create(&self.graph, buffer)
    }

    /// Number of sources currently producing sound
    pub fn playing_sources(&self) -> usize {
        self.graph.lock().playing_sources()
    }

    /// Pull mono frames from the graph. Used by offline contexts and tests;
    /// device-backed contexts are driven by the audio callback instead.
    pub fn render(&self, out: &mut [f32]) {
        self.graph.lock().render(out);
    }
}

impl fmt::Debug for AudioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioContext")
            .field("sample_rate", &self.sample_rate())
            .field("current_time", &self.current_time())
            .finish()
    }
}

type ContextFactory = Box<dyn Fn() -> Result<AudioContext, PlaybackError> + Send + Sync>;

/// Process-wide handle to the shared output context.
///
/// The context is built by the factory on first use and then reused for the
/// lifetime of the handle. A failed build is not cached, so the next call
/// retries (e.g. after a device is plugged in).
pub struct ContextHandle {
    context: Mutex<Option<Arc<AudioContext>>>,
    factory: ContextFactory,
}

impl ContextHandle {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<AudioContext, PlaybackError> + Send + Sync + 'static,
    {
        Self {
            context: Mutex::new(None),
            factory: Box::new(factory),
        }
    }

    /// Headless context, used for tests and when no device is wanted
    pub fn offline(sample_rate: u32) -> Self {
        Self::new(move || Ok(AudioContext::offline(sample_rate)))
    }

    /// Default output device, opened on first playback
    pub fn default_device(sample_rate: u32) -> Self {
        Self::new(move || AudioContext::open_default(sample_rate))
    }

    pub fn get_or_init(&self) -> Result<Arc<AudioContext>, PlaybackError> {
        let mut slot = self.context.lock();
        if let Some(context) = slot.as_ref() {
            return Ok(Arc::clone(context));
        }

        let context = Arc::new((self.factory)()?);
        tracing::info!("Audio context created at {} Hz", context.sample_rate());
        *slot = Some(Arc::clone(&context));
        Ok(context)
    }

    /// The context if it was already created
    pub fn get(&self) -> Option<Arc<AudioContext>> {
        self.context.lock().clone()
    }
}
