// Generation module
// Request/decode/play flow and WAV export

pub mod export;
pub mod orchestrator;

pub use orchestrator::{
    GenerateOutcome, GenerationSnapshot, GenerationStatus, Orchestrator, SkipReason,
};
