// WAV export
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::codec::WavBlob;

/// `<prefix>-<unix millis>.wav`
pub fn wav_file_name(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}.wav", prefix, now.timestamp_millis())
}

/// Write `blob` to `path`, creating parent directories as needed
pub fn save_wav(path: &Path, blob: &WavBlob) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    fs::write(path, blob.as_bytes()).with_context(|| format!("Failed to write {:?}", path))?;
    tracing::info!("Saved {} bytes of WAV to {:?}", blob.len(), path);
    Ok(())
}

/// Write `blob` into `dir` under a timestamped name and return the full path
pub fn write_wav(dir: &Path, blob: &WavBlob, prefix: &str, now: DateTime<Utc>) -> Result<PathBuf> {
    let path = dir.join(wav_file_name(prefix, now));
    save_wav(&path, blob)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::codec::{encode_wav, parse_wav_header, RawAudioBytes, SAMPLE_RATE};
    use chrono::TimeZone;

    #[test]
    fn test_file_name() {
        let now = Utc.timestamp_millis_opt(1_718_000_000_123).unwrap();
        assert_eq!(wav_file_name("voxgemini", now), "voxgemini-1718000000123.wav");
    }

    #[test]
    fn test_write_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("clips");
        let blob = encode_wav(&RawAudioBytes::new(vec![0x00, 0x40, 0x00, 0xC0]), SAMPLE_RATE);
        let now = Utc.timestamp_millis_opt(42).unwrap();

        let path = write_wav(&target, &blob, "voxgemini", now).unwrap();

        assert_eq!(path, target.join("voxgemini-42.wav"));
        let written = fs::read(&path).unwrap();
        assert_eq!(written, blob.as_bytes());
        let header = parse_wav_header(&written).unwrap();
        assert_eq!(header.sample_rate, SAMPLE_RATE);
        assert_eq!(header.data_size, 4);
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        fs::write(&path, b"old").unwrap();

        let blob = encode_wav(&RawAudioBytes::new(Vec::new()), SAMPLE_RATE);
        save_wav(&path, &blob).unwrap();
        assert_eq!(fs::read(&path).unwrap().len(), 44);
    }
}
