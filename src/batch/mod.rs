//! Batch Transcription
//!
//! Scans an input directory, runs every page through the validator on a
//! bounded worker pool, and writes one JSON artifact per page.

mod job;
mod runner;
mod scanner;
mod writer;

pub use job::{BatchReport, Job, JobOutcome, JobStatus, output_path_for};
pub use runner::BatchRunner;
pub use scanner::InputScanner;
pub use writer::write_transcript_atomic;
