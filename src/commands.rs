// Tauri command handlers
use std::path::{Path, PathBuf};
use tauri::{AppHandle, State};
use tauri_plugin_dialog::DialogExt;

use crate::audio::codec::WavBlob;
use crate::generation::export;
use crate::generation::GenerationSnapshot;
use crate::speech::style::{PresetId, StyleOptions, StyleParameters, VoicePreset, VOICE_PRESETS};
use crate::state::AppState;

/// Generate speech for `text` and start playing it.
/// Failures end up in the returned snapshot's `error` field.
#[tauri::command]
pub async fn generate_speech(
    text: String,
    style: StyleParameters,
    state: State<'_, AppState>,
) -> Result<GenerationSnapshot, String> {
    let orchestrator = state.orchestrator.clone();
    let outcome = orchestrator.generate(&text, &style).await;
    tracing::debug!("generate_speech finished: {:?}", outcome);
    Ok(orchestrator.snapshot())
}

#[tauri::command]
pub fn replay_audio(state: State<'_, AppState>) -> Result<bool, String> {
    state
        .orchestrator
        .replay()
        .map_err(|e| e.user_message())
}

#[tauri::command]
pub fn stop_playback(state: State<'_, AppState>) -> Result<(), String> {
    state.orchestrator.stop();
    Ok(())
}

#[tauri::command]
pub fn set_volume(volume: f32, state: State<'_, AppState>) -> Result<f32, String> {
    Ok(state.orchestrator.set_volume(volume))
}

#[tauri::command]
pub fn set_speed(speed: f32, state: State<'_, AppState>) -> Result<f32, String> {
    Ok(state.orchestrator.set_speed(speed))
}

/// Save the last clip as WAV. Writes into `directory` when given,
/// otherwise asks for a location. Returns the saved path, or None
/// if there was nothing to save or the dialog was cancelled.
#[tauri::command]
pub async fn download_audio(
    directory: Option<String>,
    app: AppHandle,
    state: State<'_, AppState>,
) -> Result<Option<String>, String> {
    let Some(blob) = state.orchestrator.download() else {
        return Ok(None);
    };
    let prefix = state.settings.export.file_prefix.as_str();
    let now = chrono::Utc::now();

    if let Some(directory) = directory {
        let path = export::write_wav(&PathBuf::from(directory), &blob, prefix, now)
            .map_err(|e| format!("Failed to save audio: {:#}", e))?;
        return Ok(Some(path.to_string_lossy().to_string()));
    }

    let picked = app
        .dialog()
        .file()
        .set_file_name(export::wav_file_name(prefix, now))
        .add_filter("WAV audio", &["wav"])
        .blocking_save_file();

    let Some(picked) = picked else {
        return Ok(None);
    };
    let path = picked
        .into_path()
        .map_err(|e| format!("Invalid save location: {}", e))?;
    save(&path, &blob)?;
    Ok(Some(path.to_string_lossy().to_string()))
}

fn save(path: &Path, blob: &WavBlob) -> Result<(), String> {
    export::save_wav(path, blob).map_err(|e| format!("Failed to save audio: {:#}", e))
}

#[tauri::command]
pub fn get_generation_state(state: State<'_, AppState>) -> Result<GenerationSnapshot, String> {
    Ok(state.orchestrator.snapshot())
}

#[tauri::command]
pub fn reset_generation(state: State<'_, AppState>) -> Result<GenerationSnapshot, String> {
    state.orchestrator.reset();
    Ok(state.orchestrator.snapshot())
}

#[tauri::command]
pub fn get_voice_presets() -> Result<Vec<VoicePreset>, String> {
    Ok(VOICE_PRESETS.to_vec())
}

#[tauri::command]
pub fn get_style_options() -> Result<StyleOptions, String> {
    Ok(StyleOptions::all())
}

/// Select `preset`, or deselect it if it is already selected
#[tauri::command]
pub fn toggle_preset(
    mut style: StyleParameters,
    preset: String,
) -> Result<StyleParameters, String> {
    let id = PresetId::from_id(&preset).ok_or_else(|| format!("Unknown preset: {}", preset))?;
    style.toggle_preset(id);
    Ok(style)
}
