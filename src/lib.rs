// VoxGemini - Desktop Text-to-Speech Studio
// Module declarations
pub mod audio;
pub mod error;
pub mod generation;
pub mod settings;
pub mod speech;

#[cfg(feature = "desktop")]
mod commands;
#[cfg(feature = "desktop")]
mod state;

/// Install the global log subscriber (`RUST_LOG`, default `info`).
/// Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use std::sync::Arc;
    use tauri::Manager;

    use audio::{ContextHandle, Player};
    use generation::Orchestrator;
    use settings::AppSettings;
    use speech::GeminiClient;
    use state::AppState;

    init_tracing();

    let result = tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            // Get app data directory
            let app_dir = app.path().app_data_dir()?;

            let settings = AppSettings::load(&app_dir).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable settings: {:#}", e);
                AppSettings::default()
            });

            let api_key = settings.speech.api_key();
            if api_key.is_none() {
                tracing::warn!(
                    "No API key found in {} or API_KEY; generation will fail until one is set",
                    settings.speech.api_key_env
                );
            }

            let client = GeminiClient::new(
                settings.speech.endpoint.clone(),
                api_key,
                settings.speech.api_key_env.clone(),
                settings.speech.request_timeout(),
            )?;

            // The output device is opened on first playback
            let player = Player::with_volume_ramp(
                ContextHandle::default_device(settings.audio.sample_rate),
                settings.audio.volume_ramp_secs,
            );

            let orchestrator = Orchestrator::new(Arc::new(client), Arc::new(player))
                .with_model(settings.speech.model_id.clone())
                .with_playback_defaults(
                    settings.audio.default_volume,
                    settings.audio.default_speed,
                );

            app.manage(AppState::new(orchestrator, settings));

            tracing::info!("VoxGemini started");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::generate_speech,
            commands::replay_audio,
            commands::stop_playback,
            commands::set_volume,
            commands::set_speed,
            commands::download_audio,
            commands::get_generation_state,
            commands::reset_generation,
            commands::get_voice_presets,
            commands::get_style_options,
            commands::toggle_preset,
        ])
        .run(tauri::generate_context!());

    if let Err(e) = result {
        tracing::error!("error while running tauri application: {}", e);
        std::process::exit(1);
    }
}
