//! Soil health estimation from a single camera still.

pub mod orchestrator;
pub mod prompt;

pub use orchestrator::{SoilAnalysisResult, SoilError, SoilOrchestrator, SOIL_FAILED_MESSAGE};
