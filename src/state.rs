// Application state management
use std::sync::Arc;

use crate::generation::Orchestrator;
use crate::settings::AppSettings;

pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub settings: AppSettings,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, settings: AppSettings) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            settings,
        }
    }
}
