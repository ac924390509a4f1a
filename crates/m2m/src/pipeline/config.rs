use std::path::PathBuf;

use crate::config::Config;

/// The executor's view of the service configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub work_directory: PathBuf,
    pub transcriber_program: String,
    pub renderer_program: String,
    pub soundbank: PathBuf,
    pub sample_rate: u32,
    /// Fixed ETA shown while rendering; the renderer reports no progress.
    pub render_eta_seconds: u64,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            work_directory: PathBuf::from(&config.work_directory),
            transcriber_program: config.transcriber.program.clone(),
            renderer_program: config.renderer.program.clone(),
            soundbank: PathBuf::from(&config.renderer.soundbank),
            sample_rate: config.renderer.sample_rate,
            render_eta_seconds: config.renderer.eta_seconds,
        }
    }
}
