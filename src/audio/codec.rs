// PCM codec
// Converts between base64 payloads, raw 16-bit PCM bytes, normalized f32
// samples and the canonical 44-byte WAV container

use base64::{engine::general_purpose, Engine as _};
use std::borrow::Cow;
use std::sync::Arc;

use crate::error::DecodeError;

/// Sample rate of the audio returned by the speech API
pub const SAMPLE_RATE: u32 = 24_000;

/// The speech API returns mono audio
pub const CHANNELS: u16 = 1;

pub const BITS_PER_SAMPLE: u16 = 16;

pub const WAV_HEADER_LEN: usize = 44;

/// Largest whole-sample data chunk whose RIFF size still fits in 32 bits
pub const MAX_WAV_DATA_LEN: usize = ((u32::MAX - 36) & !1) as usize;

const PCM_FORMAT: u16 = 1;

/// Immutable 16-bit signed little-endian PCM, shared without copying
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAudioBytes(Arc<[u8]>);

impl RawAudioBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of whole 16-bit samples in the buffer
    pub fn sample_count(&self) -> usize {
        self.0.len() / 2
    }

    /// Duration in seconds for mono audio at the given rate
    pub fn duration_secs(&self, sample_rate: u32) -> f64 {
        self.sample_count() as f64 / sample_rate as f64
    }
}

impl From<Vec<u8>> for RawAudioBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

/// Planar f32 samples ready to be rendered by the playback graph
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl DecodedAudioBuffer {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn number_of_channels(&self) -> usize {
        self.channels.len()
    }

    /// Frames per channel
    pub fn length(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn duration_secs(&self) -> f64 {
        self.length() as f64 / self.sample_rate as f64
    }

    pub fn channel_data(&self, channel: usize) -> Option<&[f32]> {
        self.channels.get(channel).map(|c| c.as_slice())
    }

    /// Average all channels into one. Mono buffers are borrowed as-is.
    pub fn mixdown(&self) -> Cow<'_, [f32]> {
        match self.channels.as_slice() {
            [] => Cow::Borrowed(&[]),
            [mono] => Cow::Borrowed(mono.as_slice()),
            planes => {
                let scale = 1.0 / planes.len() as f32;
                let mixed = (0..self.length())
                    .map(|i| planes.iter().map(|p| p[i]).sum::<f32>() * scale)
                    .collect();
                Cow::Owned(mixed)
            }
        }
    }
}

/// A complete WAV file held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavBlob {
    bytes: Vec<u8>,
}

impl WavBlob {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Header fields read back from a WAV container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    /// 1 = PCM
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    /// Size of the data chunk in bytes
    pub data_size: u32,
    /// Offset of the first data byte
    pub data_offset: usize,
}

/// Decode a standard (padded) base64 payload into raw bytes.
///
/// ASCII whitespace is skipped the way browsers' `atob` does; anything else
/// outside the alphabet, or bad padding, is an error.
pub fn decode_base64(payload: &str) -> Result<RawAudioBytes, DecodeError> {
    let compact: Cow<'_, str> = if payload.bytes().any(|b| b.is_ascii_whitespace()) {
        Cow::Owned(payload.chars().filter(|c| !c.is_ascii_whitespace()).collect())
    } else {
        Cow::Borrowed(payload)
    };

    let bytes = general_purpose::STANDARD.decode(compact.as_bytes())?;
    Ok(RawAudioBytes::new(bytes))
}

/// Interpret bytes as little-endian i16 samples and normalize them to [-1, 1).
///
/// Interleaved input is split into `channel_count` planes. A trailing odd byte
/// or incomplete frame is dropped; a channel count of 0 is treated as mono.
pub fn to_playable_buffer(
    bytes: &RawAudioBytes,
    sample_rate: u32,
    channel_count: u16,
) -> DecodedAudioBuffer {
    let channel_count = usize::from(channel_count.max(1));
    let frames = bytes.sample_count() / channel_count;

    let mut channels: Vec<Vec<f32>> = (0..channel_count)
        .map(|_| Vec::with_capacity(frames))
        .collect();

    for (i, chunk) in bytes
        .as_bytes()
        .chunks_exact(2)
        .take(frames * channel_count)
        .enumerate()
    {
        let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
        channels[i % channel_count].push(sample as f32 / 32768.0);
    }

    DecodedAudioBuffer::new(sample_rate, channels)
}

/// Wrap mono 16-bit PCM in a canonical 44-byte-header WAV container.
/// The sample bytes are copied unchanged, up to `MAX_WAV_DATA_LEN`;
/// anything past that limit cannot be described by the header and is dropped.
pub fn encode_wav(bytes: &RawAudioBytes, sample_rate: u32) -> WavBlob {
    let data = &bytes.as_bytes()[..wav_data_len(bytes.len())];
    let data_len = u32::try_from(data.len()).unwrap_or(u32::MAX);
    let block_align = CHANNELS * (BITS_PER_SAMPLE / 8);
    let byte_rate = u32::try_from(u64::from(sample_rate) * u64::from(block_align))
        .unwrap_or(u32::MAX);

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + data.len());

    // RIFF chunk descriptor
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    // fmt sub-chunk
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&PCM_FORMAT.to_le_bytes());
    out.extend_from_slice(&CHANNELS.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data sub-chunk
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(data);

    WavBlob { bytes: out }
}

fn wav_data_len(len: usize) -> usize {
    len.min(MAX_WAV_DATA_LEN)
}

/// Read the format and data chunk headers of a RIFF/WAVE file.
/// Unknown chunks between "fmt " and "data" are skipped.
pub fn parse_wav_header(bytes: &[u8]) -> Result<WavHeader, DecodeError> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(DecodeError::InvalidWav("missing RIFF/WAVE descriptor"));
    }

    let mut fmt: Option<(u16, u16, u32, u32, u16, u16)> = None;
    let mut pos = 12;

    while pos + 8 <= bytes.len() {
        let chunk_id = &bytes[pos..pos + 4];
        let chunk_size = read_u32(bytes, pos + 4) as usize;
        let body = pos + 8;

        match chunk_id {
            b"fmt " => {
                if chunk_size < 16 || body + 16 > bytes.len() {
                    return Err(DecodeError::InvalidWav("truncated fmt chunk"));
                }
                fmt = Some((
                    read_u16(bytes, body),
                    read_u16(bytes, body + 2),
                    read_u32(bytes, body + 4),
                    read_u32(bytes, body + 8),
                    read_u16(bytes, body + 12),
                    read_u16(bytes, body + 14),
                ));
            }
            b"data" => {
                let fmt = fmt.ok_or(DecodeError::InvalidWav("data chunk before fmt chunk"))?;
                return Ok(WavHeader {
                    audio_format: fmt.0,
                    channels: fmt.1,
                    sample_rate: fmt.2,
                    byte_rate: fmt.3,
                    block_align: fmt.4,
                    bits_per_sample: fmt.5,
                    data_size: chunk_size as u32,
                    data_offset: body,
                });
            }
            _ => {}
        }

        // Chunks are word aligned
        pos = body + chunk_size + (chunk_size & 1);
    }

    Err(DecodeError::InvalidWav("missing data chunk"))
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
