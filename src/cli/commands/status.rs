//! Status Command
//!
//! Report how many inputs already have artifacts. Makes no inference calls.

use serde::Serialize;
use std::path::PathBuf;

use crate::batch::{InputScanner, Job, output_path_for};
use crate::config::Config;
use crate::types::Result;

#[derive(Debug, Serialize)]
pub struct BatchStatus {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub inputs: usize,
    pub complete: usize,
    pub pending: Vec<PathBuf>,
}

/// Count complete and pending inputs using the same artifact check as resume
pub fn collect(config: &Config) -> Result<BatchStatus> {
    let batch = &config.batch;
    let inputs = InputScanner::new(&batch.input_dir)
        .with_extensions(&batch.extensions)
        .with_limit(batch.max_files)
        .scan()?;

    let total = inputs.len();
    let pending: Vec<PathBuf> = inputs
        .into_iter()
        .map(|input| Job::new(input, &batch.output_dir, true))
        .filter(|job| !job.already_complete())
        .map(|job| job.input)
        .collect();

    Ok(BatchStatus {
        input_dir: batch.input_dir.clone(),
        output_dir: batch.output_dir.clone(),
        inputs: total,
        complete: total - pending.len(),
        pending,
    })
}

pub fn run(
    mut config: Config,
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    format: &str,
) -> Result<()> {
    if let Some(dir) = input_dir {
        config.batch.input_dir = dir;
    }
    if let Some(dir) = output_dir {
        config.batch.output_dir = dir;
    }

    let status = collect(&config)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Docscribe Status");
    println!("══════════════════════════════════════");
    println!("Input:   {}", status.input_dir.display());
    println!("Output:  {}", status.output_dir.display());
    println!();
    println!("Images:   {}", status.inputs);
    println!("Complete: {}", status.complete);
    println!("Pending:  {}", status.pending.len());

    for input in status.pending.iter().take(10) {
        println!(
            "  {} -> {}",
            input.display(),
            output_path_for(input, &status.output_dir).display()
        );
    }
    if status.pending.len() > 10 {
        println!("  ... and {} more", status.pending.len() - 10);
    }

    Ok(())
}
