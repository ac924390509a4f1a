use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_upload_directory")]
    pub upload_directory: String,
    #[serde(default = "default_work_directory")]
    pub work_directory: String,
    /// SQLite file mirroring the job store; in-memory only when absent.
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
    #[serde(default = "default_accepted_extensions")]
    pub accepted_extensions: Vec<String>,
    #[serde(default)]
    pub transcriber: TranscriberConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_upload_directory() -> String {
    "/tmp/uploads".to_string()
}

fn default_work_directory() -> String {
    "/tmp/m2m".to_string()
}

fn default_max_concurrent_jobs() -> usize {
    num_cpus::get()
}

fn default_accepted_extensions() -> Vec<String> {
    vec!["mp3".to_string(), "wav".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            upload_directory: default_upload_directory(),
            work_directory: default_work_directory(),
            database_path: None,
            max_concurrent_jobs: default_max_concurrent_jobs(),
            accepted_extensions: default_accepted_extensions(),
            transcriber: TranscriberConfig::default(),
            renderer: RendererConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    #[serde(default = "default_transcriber_program")]
    pub program: String,
}

fn default_transcriber_program() -> String {
    "transkun".to_string()
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            program: default_transcriber_program(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    #[serde(default = "default_renderer_program")]
    pub program: String,
    #[serde(default = "default_soundbank")]
    pub soundbank: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// ETA reported for the whole rendering stage.
    #[serde(default = "default_render_eta")]
    pub eta_seconds: u64,
}

fn default_renderer_program() -> String {
    "fluidsynth".to_string()
}

fn default_soundbank() -> String {
    "/usr/share/sounds/sf2/FluidR3_GM.sf2".to_string()
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_render_eta() -> u64 {
    15
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            program: default_renderer_program(),
            soundbank: default_soundbank(),
            sample_rate: default_sample_rate(),
            eta_seconds: default_render_eta(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upload requests with a larger body are refused with 413.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_bytes() -> usize {
    100 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            format: LogFormat::default(),
        }
    }
}
