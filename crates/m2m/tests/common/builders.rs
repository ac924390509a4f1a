//! Builder for test configurations.

#![allow(dead_code)]

use std::path::Path;

use m2m::config::{Config, RendererConfig, TranscriberConfig};

/// Builder for creating `Config` instances.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Defaults suitable for tests: two concurrent jobs, no database.
    pub fn new() -> Self {
        Self {
            config: Config {
                max_concurrent_jobs: 2,
                ..Config::default()
            },
        }
    }

    pub fn upload_directory(mut self, path: &Path) -> Self {
        self.config.upload_directory = path.display().to_string();
        self
    }

    pub fn work_directory(mut self, path: &Path) -> Self {
        self.config.work_directory = path.display().to_string();
        self
    }

    pub fn database_path(mut self, path: &Path) -> Self {
        self.config.database_path = Some(path.display().to_string());
        self
    }

    pub fn max_concurrent_jobs(mut self, count: usize) -> Self {
        self.config.max_concurrent_jobs = count;
        self
    }

    pub fn accepted_extensions(mut self, extensions: &[&str]) -> Self {
        self.config.accepted_extensions = extensions.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn transcriber(mut self, program: &Path) -> Self {
        self.config.transcriber = TranscriberConfig {
            program: program.display().to_string(),
        };
        self
    }

    pub fn renderer(mut self, program: &Path, soundbank: &Path) -> Self {
        self.config.renderer = RendererConfig {
            program: program.display().to_string(),
            soundbank: soundbank.display().to_string(),
            ..RendererConfig::default()
        };
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
