// Audio output using cpal
// Runs the device stream on its own thread and pulls frames from the render graph

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig, SupportedStreamConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

use super::graph::Graph;
use crate::error::PlaybackError;

/// Keeps the output stream alive. cpal streams are not `Send` on every
/// platform, so the stream lives on a dedicated thread until this is dropped.
pub struct DeviceOutput {
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    sample_rate: u32,
    channels: u16,
}

impl DeviceOutput {
    /// Open the default output device and start pulling from `graph`
    pub fn open(graph: Arc<Mutex<Graph>>, requested_rate: u32) -> Result<Self, PlaybackError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread = std::thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let stream = match Self::start_stream(graph, requested_rate) {
                    Ok((stream, sample_rate, channels)) => {
                        let _ = ready_tx.send(Ok((sample_rate, channels)));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                while !shutdown_clone.load(Ordering::SeqCst) {
                    std::thread::park();
                }
                drop(stream);
                tracing::debug!("Audio output stream closed");
            })
            .map_err(|e| PlaybackError::Stream(format!("failed to spawn output thread: {}", e)))?;

        let (sample_rate, channels) = ready_rx.recv().map_err(|_| PlaybackError::DeviceThread)??;

        Ok(Self {
            shutdown,
            thread: Some(thread),
            sample_rate,
            channels,
        })
    }

    fn start_stream(
        graph: Arc<Mutex<Graph>>,
        requested_rate: u32,
    ) -> Result<(Stream, u32, u16), PlaybackError> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or(PlaybackError::NoOutputDevice)?;

        tracing::info!(
            "Using output device: {}",
            device.name().unwrap_or_default()
        );

        let config = Self::pick_config(&device, requested_rate)?;
        let sample_rate = config.sample_rate().0;
        let channels = config.channels();

        if sample_rate != requested_rate {
            tracing::info!(
                "Device does not support {} Hz, rendering at {} Hz",
                requested_rate,
                sample_rate
            );
            graph.lock().set_sample_rate(sample_rate);
        }

        let sample_format = config.sample_format();
        let stream_config: StreamConfig = config.into();

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &stream_config, graph)?,
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &stream_config, graph)?,
            SampleFormat::U16 => Self::build_stream::<u16>(&device, &stream_config, graph)?,
            format => return Err(PlaybackError::UnsupportedFormat(format!("{:?}", format))),
        };

        stream
            .play()
            .map_err(|e| PlaybackError::Stream(format!("failed to start stream: {}", e)))?;

        Ok((stream, sample_rate, channels))
    }

    /// Prefer a config that runs at the requested rate, else the device default
    fn pick_config(
        device: &cpal::Device,
        requested_rate: u32,
    ) -> Result<SupportedStreamConfig, PlaybackError> {
        if let Ok(mut ranges) = device.supported_output_configs() {
            let matching = ranges.find(|range| {
                range.min_sample_rate().0 <= requested_rate
                    && range.max_sample_rate().0 >= requested_rate
                    && matches!(
                        range.sample_format(),
                        SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16
                    )
            });
            if let Some(range) = matching {
                return Ok(range.with_sample_rate(cpal::SampleRate(requested_rate)));
            }
        }

        device
            .default_output_config()
            .map_err(|e| PlaybackError::DeviceConfig(e.to_string()))
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &StreamConfig,
        graph: Arc<Mutex<Graph>>,
    ) -> Result<Stream, PlaybackError> {
        let channels = usize::from(config.channels.max(1));
        let mut mono: Vec<f32> = Vec::new();

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels;
                    mono.resize(frames, 0.0);
                    graph.lock().render(&mut mono);

                    // The graph is mono; copy each frame to every device channel
                    for (frame, &value) in data.chunks_mut(channels).zip(mono.iter()) {
                        let sample = T::from_sample(value.clamp(-1.0, 1.0));
                        for out in frame.iter_mut() {
                            *out = sample;
                        }
                    }
                },
                move |err| {
                    tracing::error!("Audio output error: {}", err);
                },
                None,
            )
            .map_err(|e| PlaybackError::Stream(format!("failed to build output stream: {}", e)))
    }

    /// Rate the device actually runs at
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl Drop for DeviceOutput {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            let _ = thread.join();
        }
    }
}
