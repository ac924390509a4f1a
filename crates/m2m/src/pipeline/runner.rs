use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::jobs::{JobArtifacts, JobFailure, JobStep};
use crate::sanitize;

use super::config::PipelineConfig;
use super::context::PipelineContext;
use super::error::{PipelineError, Stage, StageError};
use super::eta::estimate_eta;
use super::extract::parse_progress;
use super::process::run_process;
use super::progress::{ProgressEvent, ProgressReporter};

const PREPROCESS_PROGRESS: f64 = 0.1;
const TRANSCRIBE_PROGRESS: f64 = 0.4;
/// Share of overall progress covered by the transcriber's own ratio.
const TRANSCRIBE_SPAN: f64 = 0.3;
const RENDER_PROGRESS: f64 = 0.75;

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

pub struct Pipeline {
    config: Arc<PipelineConfig>,
}

impl Pipeline {
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }

    /// Runs every stage for one job.
    ///
    /// The outcome is always reported through `progress` (completed or
    /// failed) before returning; callers only need the return value for
    /// logging.
    pub async fn run(
        &self,
        job_id: &str,
        input_path: &Path,
        progress: &dyn ProgressReporter,
    ) -> Result<JobArtifacts, StageError> {
        let span = info_span!("pipeline",
            job_id = %job_id,
            input = %sanitize::redact_path(input_path),
        );

        async {
            match self.execute(job_id, input_path, progress).await {
                Ok(artifacts) => {
                    info!("Pipeline completed");
                    progress.report(ProgressEvent::Completed(artifacts.clone()));
                    Ok(artifacts)
                }
                Err(e) => {
                    warn!(error = %e, "Pipeline failed");
                    progress.report(ProgressEvent::Failed(
                        JobFailure::new(e.to_string()).with_trace(e.trace()),
                    ));
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        job_id: &str,
        input_path: &Path,
        progress: &dyn ProgressReporter,
    ) -> Result<JobArtifacts, StageError> {
        // Step 1: Prepare working directory
        progress.report(ProgressEvent::Phase {
            step: JobStep::Preprocessing,
            progress: PREPROCESS_PROGRESS,
            message: "Preparing audio".to_string(),
            eta_seconds: None,
        });
        let ctx = self
            .step_prepare(job_id, input_path)
            .instrument(info_span!("preprocess"))
            .await
            .map_err(|e| StageError::new(Stage::Preprocessing, e))?;

        // Step 2: Audio → MIDI
        progress.report(ProgressEvent::Phase {
            step: JobStep::Transcribing,
            progress: TRANSCRIBE_PROGRESS,
            message: "Running transcription (audio → MIDI)".to_string(),
            eta_seconds: None,
        });
        self.step_transcribe(&ctx, progress)
            .instrument(info_span!("transcribe"))
            .await
            .map_err(|e| StageError::new(Stage::Transcription, e))?;

        // Step 3: MIDI → audio
        progress.report(ProgressEvent::Phase {
            step: JobStep::Rendering,
            progress: RENDER_PROGRESS,
            message: "Rendering MIDI to audio".to_string(),
            eta_seconds: Some(self.config.render_eta_seconds),
        });
        self.step_render(&ctx)
            .instrument(info_span!("render"))
            .await
            .map_err(|e| StageError::new(Stage::Rendering, e))?;

        // Step 4: Verify artifacts
        self.step_finalize(&ctx)
            .await
            .map_err(|e| StageError::new(Stage::Finalize, e))
    }

    async fn step_prepare(
        &self,
        job_id: &str,
        input_path: &Path,
    ) -> Result<PipelineContext, PipelineError> {
        let meta = tokio::fs::metadata(input_path)
            .await
            .map_err(|e| PipelineError::io(input_path, e))?;
        if !meta.is_file() {
            return Err(PipelineError::InvalidInput(format!(
                "not a regular file: {}",
                input_path.display()
            )));
        }

        let ctx = PipelineContext::new(&self.config.work_directory, job_id, input_path)?;
        tokio::fs::create_dir_all(&ctx.job_directory)
            .await
            .map_err(|e| PipelineError::io(&ctx.job_directory, e))?;

        debug!(
            midi = %sanitize::redact_path(&ctx.midi_path),
            wav = %sanitize::redact_path(&ctx.wav_path),
            "Resolved artifact paths"
        );
        Ok(ctx)
    }

    async fn step_transcribe(
        &self,
        ctx: &PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        let started = Instant::now();
        let args = [ctx.input_path.as_os_str(), ctx.midi_path.as_os_str()];

        run_process(&self.config.transcriber_program, args, |line| {
            debug!(target: "m2m::transcriber", "{}", line);

            let Some(parsed) = parse_progress(line) else {
                return;
            };
            if !parsed.is_significant() {
                progress.report(ProgressEvent::Message(parsed.message));
                return;
            }

            let eta_seconds = estimate_eta(started.elapsed(), parsed.ratio);
            debug!(
                ratio = parsed.ratio,
                eta_seconds = ?eta_seconds,
                "Transcription progress"
            );
            progress.report(ProgressEvent::Progress {
                progress: round3(TRANSCRIBE_PROGRESS + parsed.ratio * TRANSCRIBE_SPAN),
                message: parsed.message,
                eta_seconds,
            });
        })
        .await?;

        info!(elapsed_ms = started.elapsed().as_millis() as u64, "Transcription finished");
        Ok(())
    }

    async fn step_render(&self, ctx: &PipelineContext) -> Result<(), PipelineError> {
        let soundbank = &self.config.soundbank;
        let soundbank_present = tokio::fs::try_exists(soundbank)
            .await
            .map_err(|e| PipelineError::io(soundbank, e))?;
        if !soundbank_present {
            return Err(PipelineError::MissingSoundbank(soundbank.clone()));
        }

        let args: Vec<OsString> = vec![
            "-ni".into(),
            soundbank.clone().into_os_string(),
            ctx.midi_path.clone().into_os_string(),
            "-F".into(),
            ctx.wav_path.clone().into_os_string(),
            "-r".into(),
            self.config.sample_rate.to_string().into(),
        ];

        let started = Instant::now();
        run_process(&self.config.renderer_program, args, |line| {
            debug!(target: "m2m::renderer", "{}", line);
        })
        .await?;

        info!(elapsed_ms = started.elapsed().as_millis() as u64, "Rendering finished");
        Ok(())
    }

    async fn step_finalize(&self, ctx: &PipelineContext) -> Result<JobArtifacts, PipelineError> {
        for path in [&ctx.midi_path, &ctx.wav_path] {
            let exists = tokio::fs::try_exists(path)
                .await
                .map_err(|e| PipelineError::io(path, e))?;
            if !exists {
                return Err(PipelineError::MissingArtifact(path.clone()));
            }
        }

        Ok(JobArtifacts {
            midi_path: ctx.midi_path.clone(),
            audio_path: ctx.wav_path.clone(),
        })
    }
}
