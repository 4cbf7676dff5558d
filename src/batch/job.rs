//! Jobs and their outcomes

use serde::Serialize;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::batch::ARTIFACT_EXTENSION;
use crate::types::ScribeError;

/// One input image and where its transcript goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub input: PathBuf,
    pub output: PathBuf,
    pub resume: bool,
}

impl Job {
    pub fn new(input: PathBuf, output_dir: &Path, resume: bool) -> Self {
        let output = output_path_for(&input, output_dir);
        Self {
            input,
            output,
            resume,
        }
    }

    /// Resuming and the artifact already exists. Its content is not checked.
    pub fn already_complete(&self) -> bool {
        self.resume && self.output.exists()
    }
}

/// Build one job per input, in input order.
///
/// An input whose artifact path is already claimed by an earlier input
/// (same stem, different extension) gets no job; it comes back as a failed
/// outcome naming that earlier input.
pub fn plan_jobs(
    inputs: Vec<PathBuf>,
    output_dir: &Path,
    resume: bool,
) -> (Vec<Job>, Vec<JobOutcome>) {
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut jobs = Vec::with_capacity(inputs.len());
    let mut rejected = Vec::new();

    for input in inputs {
        let job = Job::new(input, output_dir, resume);
        if let Some(first) = claimed.get(&job.output) {
            let err = ScribeError::OutputCollision {
                output: job.output.clone(),
                first: first.clone(),
            };
            rejected.push(JobOutcome::failed(job.input, &err, Duration::ZERO));
            continue;
        }
        claimed.insert(job.output.clone(), job.input.clone());
        jobs.push(job);
    }

    (jobs, rejected)
}

/// `<output_dir>/<input stem>.json`
pub fn output_path_for(input: &Path, output_dir: &Path) -> PathBuf {
    let mut name: OsString = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(ARTIFACT_EXTENSION);
    output_dir.join(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Completed,
    Skipped,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    pub input: PathBuf,
    pub status: JobStatus,
    /// Short error label (see [`ScribeError::kind`])
    pub error_kind: Option<&'static str>,
    pub error_message: Option<String>,
    #[serde(skip)]
    pub duration: Duration,
}

impl JobOutcome {
    pub fn completed(input: PathBuf, duration: Duration) -> Self {
        Self {
            input,
            status: JobStatus::Completed,
            error_kind: None,
            error_message: None,
            duration,
        }
    }

    pub fn skipped(input: PathBuf) -> Self {
        Self {
            input,
            status: JobStatus::Skipped,
            error_kind: None,
            error_message: None,
            duration: Duration::ZERO,
        }
    }

    pub fn failed(input: PathBuf, error: &ScribeError, duration: Duration) -> Self {
        Self {
            input,
            status: JobStatus::Failed,
            error_kind: Some(error.kind()),
            error_message: Some(error.to_string()),
            duration,
        }
    }
}

/// Per-job outcomes of one batch run, sorted by input path
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<JobOutcome>,
}

impl BatchReport {
    pub fn record(&mut self, outcome: JobOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn finish(&mut self) {
        self.outcomes.sort_by(|a, b| a.input.cmp(&b.input));
    }

    fn count(&self, status: JobStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(JobStatus::Completed)
    }

    pub fn skipped(&self) -> usize {
        self.count(JobStatus::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(JobStatus::Failed)
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == JobStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LlmError;

    #[test]
    fn test_output_path_keeps_inner_dots() {
        let out = output_path_for(Path::new("in/cable.1976.05.jpg"), Path::new("out"));
        assert_eq!(out, PathBuf::from("out/cable.1976.05.json"));
    }

    #[test]
    fn test_plan_rejects_later_input_with_same_stem() {
        let inputs = vec![
            PathBuf::from("in/a.jpg"),
            PathBuf::from("in/a.png"),
            PathBuf::from("in/b.png"),
        ];

        let (jobs, rejected) = plan_jobs(inputs, Path::new("out"), false);

        let planned: Vec<_> = jobs.iter().map(|j| j.input.clone()).collect();
        assert_eq!(planned, vec![PathBuf::from("in/a.jpg"), PathBuf::from("in/b.png")]);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].input, PathBuf::from("in/a.png"));
        assert_eq!(rejected[0].error_kind, Some("output_collision"));
        assert!(rejected[0].error_message.as_deref().unwrap().contains("in/a.jpg"));
    }

    #[test]
    fn test_already_complete_requires_resume() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("page.json"), "{}").unwrap();

        let input = PathBuf::from("in/page.png");
        assert!(Job::new(input.clone(), dir.path(), true).already_complete());
        assert!(!Job::new(input, dir.path(), false).already_complete());
    }

    #[test]
    fn test_report_counts() {
        let mut report = BatchReport::default();
        report.record(JobOutcome::completed("b.png".into(), Duration::from_secs(1)));
        report.record(JobOutcome::skipped("a.png".into()));
        report.record(JobOutcome::failed(
            "c.png".into(),
            &LlmError::rate_limited("429").into(),
            Duration::from_secs(2),
        ));
        report.finish();

        assert_eq!(
            (report.succeeded(), report.skipped(), report.failed()),
            (1, 1, 1)
        );
        assert_eq!(report.outcomes[0].input, PathBuf::from("a.png"));
        let failure = report.failures().next().unwrap();
        assert_eq!(failure.error_kind, Some("rate_limit"));
    }
}
