// Settings loading
// Read-only: defaults are used when no settings file exists, nothing is written back
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audio::codec;
use crate::speech::gemini::{DEFAULT_ENDPOINT, DEFAULT_MODEL};

/// Fallback variable checked when the configured one is unset
pub const FALLBACK_API_KEY_ENV: &str = "API_KEY";

/// Remote speech API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub model_id: String,
    pub endpoint: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub request_timeout_secs: u64,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl SpeechSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// API key from the configured variable, falling back to `API_KEY`
    pub fn api_key(&self) -> Option<String> {
        self.api_key_from(|name| std::env::var(name).ok())
    }

    fn api_key_from(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        [self.api_key_env.as_str(), FALLBACK_API_KEY_ENV]
            .into_iter()
            .filter_map(|name| lookup(name))
            .find(|key| !key.trim().is_empty())
    }
}

/// Playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub default_volume: f32, // 0.0-1.0
    pub default_speed: f32,  // 0.5-2.0
    pub volume_ramp_secs: f64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: codec::SAMPLE_RATE,
            default_volume: 1.0,
            default_speed: 1.0,
            volume_ramp_secs: 0.1,
        }
    }
}

/// Download settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub file_prefix: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            file_prefix: "voxgemini".to_string(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub speech: SpeechSettings,
    pub audio: AudioSettings,
    pub export: ExportSettings,
}

impl AppSettings {
    /// Get the settings file path
    pub fn get_settings_path(app_dir: &Path) -> PathBuf {
        app_dir.join("settings.json")
    }

    /// Load settings from file, or return defaults if the file doesn't exist
    pub fn load(app_dir: &Path) -> Result<Self> {
        let path = Self::get_settings_path(app_dir);

        if !path.exists() {
            tracing::info!("No settings file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;

        let settings: AppSettings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file {:?}", path))?;

        tracing::info!("Loaded settings from {:?}", path);
        Ok(settings)
    }
}
