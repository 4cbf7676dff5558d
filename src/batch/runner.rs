//! Batch Driver
//!
//! Fans jobs out over a bounded worker pool. Each job runs on its own task,
//! so a failure (or panic) is confined to that job and recorded in the
//! report. A run never aborts because one job failed.

use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

use super::job::{BatchReport, Job, JobOutcome, plan_jobs};
use super::writer::write_transcript_atomic;
use crate::ai::{CompletionRequest, ImageInput, TranscriptValidator};
use crate::types::Result;

pub struct BatchRunner {
    validator: Arc<TranscriptValidator>,
    prompt: Arc<str>,
}

impl BatchRunner {
    pub fn new(validator: Arc<TranscriptValidator>, prompt: impl Into<Arc<str>>) -> Self {
        Self {
            validator,
            prompt: prompt.into(),
        }
    }

    #[instrument(skip_all, fields(inputs = inputs.len(), workers = workers))]
    pub async fn run(
        &self,
        inputs: Vec<PathBuf>,
        output_dir: &Path,
        workers: usize,
        resume: bool,
    ) -> BatchReport {
        if let Err(e) = std::fs::create_dir_all(output_dir) {
            warn!(
                "Failed to create output directory {}: {}",
                output_dir.display(),
                e
            );
        }

        let mut report = BatchReport::default();
        let (jobs, rejected) = plan_jobs(inputs, output_dir, resume);
        for outcome in rejected {
            warn!(
                file = %outcome.input.display(),
                kind = outcome.error_kind.unwrap_or_default(),
                "Job failed: {}",
                outcome.error_message.as_deref().unwrap_or_default()
            );
            report.record(outcome);
        }

        let mut stream = stream::iter(jobs)
            .map(|job| {
                let validator = Arc::clone(&self.validator);
                let prompt = Arc::clone(&self.prompt);
                async move { dispatch(validator, prompt, job).await }
            })
            .buffer_unordered(workers.max(1));

        while let Some(outcome) = stream.next().await {
            report.record(outcome);
        }
        report.finish();

        info!(
            succeeded = report.succeeded(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Batch complete"
        );

        report
    }
}

async fn dispatch(validator: Arc<TranscriptValidator>, prompt: Arc<str>, job: Job) -> JobOutcome {
    if job.already_complete() {
        info!(file = %job.input.display(), "Skipping, artifact exists");
        return JobOutcome::skipped(job.input);
    }

    let input = job.input.clone();
    let start = Instant::now();

    let result = match tokio::spawn(process(validator, prompt, job)).await {
        Ok(result) => result,
        Err(join_err) => Err(join_err.into()),
    };

    match result {
        Ok(output) => {
            info!(
                file = %input.display(),
                output = %output.display(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Transcribed"
            );
            JobOutcome::completed(input, start.elapsed())
        }
        Err(e) => {
            warn!(
                file = %input.display(),
                kind = e.kind(),
                "Job failed: {}",
                e
            );
            JobOutcome::failed(input, &e, start.elapsed())
        }
    }
}

/// Image in, artifact out
async fn process(validator: Arc<TranscriptValidator>, prompt: Arc<str>, job: Job) -> Result<PathBuf> {
    let image = ImageInput::load(&job.input).await?;
    let request = CompletionRequest::new(prompt.as_ref(), image);
    let transcript = validator.run(request).await?;

    let output = job.output;
    let path = output.clone();
    tokio::task::spawn_blocking(move || write_transcript_atomic(&path, &transcript)).await??;

    Ok(output)
}
