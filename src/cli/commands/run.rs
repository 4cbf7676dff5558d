//! Run Command
//!
//! Transcribe every image in the input directory.
//!
//! Usage:
//!   docscribe run [INPUT_DIR] [-o OUTPUT_DIR] [--limit N] [--workers N] [--resume] [--model M]

use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::ai::{
    BackoffRetrier, RateLimiter, RetryPolicy, TranscriptValidator, create_provider,
    create_shared_metrics, load_prompt,
};
use crate::batch::{BatchReport, BatchRunner, InputScanner};
use crate::cli::Output;
use crate::config::Config;
use crate::types::Result;

/// Command-line overrides applied on top of the resolved config
#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub limit: Option<usize>,
    pub workers: Option<usize>,
    pub resume: bool,
    pub model: Option<String>,
}

impl RunOptions {
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.input_dir {
            config.batch.input_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.batch.output_dir = dir.clone();
        }
        if let Some(limit) = self.limit {
            config.batch.max_files = limit;
        }
        if let Some(workers) = self.workers {
            config.batch.workers = workers;
        }
        if self.resume {
            config.batch.resume = true;
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
    }
}

pub async fn run(mut config: Config, options: RunOptions) -> Result<BatchReport> {
    options.apply(&mut config);
    config.validate()?;

    let out = Output::new();
    let batch = &config.batch;

    let inputs = InputScanner::new(&batch.input_dir)
        .with_extensions(&batch.extensions)
        .with_limit(batch.max_files)
        .scan()?;

    if inputs.is_empty() {
        out.warning(&format!(
            "No images found in {}",
            batch.input_dir.display()
        ));
        return Ok(BatchReport::default());
    }

    let provider = create_provider(&config.llm)?;
    let prompt = load_prompt(&config.llm)?;
    let metrics = create_shared_metrics("run");

    info!(
        provider = provider.name(),
        model = provider.model(),
        inputs = inputs.len(),
        workers = batch.workers,
        resume = batch.resume,
        "Starting batch"
    );

    let retrier = BackoffRetrier::new(
        RateLimiter::shared(&config.limits),
        RetryPolicy::from_config(&config.retry),
        config.llm.timeout(),
    )
    .with_metrics(Arc::clone(&metrics));

    let validator = TranscriptValidator::new(
        provider,
        Arc::new(retrier),
        config.validation.max_repair_rounds,
    )
    .with_metrics(Arc::clone(&metrics));

    let runner = BatchRunner::new(Arc::new(validator), prompt);
    let report = runner
        .run(inputs, &batch.output_dir, batch.workers, batch.resume)
        .await;

    out.batch_report(&report);
    out.metrics(&metrics.summary());

    if report.failed() == 0 {
        out.success(&format!(
            "Transcripts written to {}",
            batch.output_dir.display()
        ));
    }

    Ok(report)
}
