pub mod config;
pub mod context;
pub mod error;
pub mod eta;
pub mod extract;
pub mod process;
pub mod progress;
pub mod runner;

pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use error::{PipelineError, Stage, StageError};
pub use eta::estimate_eta;
pub use extract::{parse_progress, ParsedProgress, PROGRESS_EPSILON};
pub use progress::{NoopProgress, ProgressEvent, ProgressReporter};
pub use runner::Pipeline;
