use console::style;
use std::path::Path;

use crate::ai::MetricsSummary;
use crate::batch::BatchReport;

/// Console printer for command results
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        println!("  {:<12} {}", style(format!("{}:", label)).dim(), value);
    }

    /// Counts, then one line per failed file
    pub fn batch_report(&self, report: &BatchReport) {
        self.section("Batch");
        self.field("Total", report.total());
        self.field("Succeeded", style(report.succeeded()).green());
        self.field("Skipped", report.skipped());
        let failed = report.failed();
        if failed > 0 {
            self.field("Failed", style(failed).red());
        } else {
            self.field("Failed", failed);
        }

        for outcome in report.failures() {
            self.error(&format!(
                "{} [{}] {}",
                display_name(&outcome.input),
                outcome.error_kind.unwrap_or("unknown"),
                outcome.error_message.as_deref().unwrap_or_default()
            ));
        }
    }

    pub fn metrics(&self, summary: &MetricsSummary) {
        self.section("Inference");
        println!("  {}", summary.display());
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
