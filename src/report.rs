//! Output formatting for batch results.
//!
//! Two formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

use crate::batch::{BatchReport, SubjectResult, Summary};
use crate::generate::{FileOutcome, OutcomeStatus};

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub command: String,
    pub test_path: String,
    pub passed: bool,
    pub summary: JsonSummary,
    pub subjects: Vec<JsonSubject>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonSummary {
    pub subjects: usize,
    pub failed_subjects: usize,
    pub created: usize,
    pub overwritten: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonSubject {
    pub kind: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub files: Vec<JsonFile>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonFile {
    pub path: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<Summary> for JsonSummary {
    fn from(s: Summary) -> Self {
        Self {
            subjects: s.subjects,
            failed_subjects: s.failed_subjects,
            created: s.created,
            overwritten: s.overwritten,
            skipped: s.skipped,
            failed: s.failed,
        }
    }
}

pub fn build_json(command: &str, test_path: &Path, report: &BatchReport) -> JsonReport {
    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        command: command.to_string(),
        test_path: test_path.display().to_string(),
        passed: !report.has_failures(),
        summary: report.summary().into(),
        subjects: report
            .results
            .iter()
            .map(|r| JsonSubject {
                kind: r.kind.to_string(),
                subject: r.subject.clone(),
                error: r.error.clone(),
                files: r.files.iter().map(|f| file_to_json(test_path, f)).collect(),
            })
            .collect(),
        notes: report.notes.clone(),
    }
}

/// Write results in JSON format.
pub fn write_json(command: &str, test_path: &Path, report: &BatchReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&build_json(command, test_path, report))?;
    println!("{}", json);
    Ok(())
}

fn file_to_json(test_path: &Path, file: &FileOutcome) -> JsonFile {
    JsonFile {
        path: display_path(test_path, &file.path),
        status: file.status.as_str().to_string(),
        reason: file.reason.clone(),
    }
}

/// Path relative to the test root when it lies beneath it.
fn display_path(test_path: &Path, path: &Path) -> String {
    path.strip_prefix(test_path)
        .unwrap_or(path)
        .display()
        .to_string()
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write results as colored terminal output.
pub fn write_pretty(command: &str, test_path: &Path, report: &BatchReport) {
    print!("{}", render_pretty(command, test_path, report));
}

pub fn render_pretty(command: &str, test_path: &Path, report: &BatchReport) -> String {
    let mut out = String::new();

    // Header
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  {} v{}",
        "gentests".cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "  {}{}", "Command: ".dimmed(), command);
    let _ = writeln!(out, "  {}{}", "Output:  ".dimmed(), test_path.display());
    let _ = writeln!(out);

    for note in &report.notes {
        let _ = writeln!(out, "  {} {}", "!".yellow(), note);
    }
    if !report.notes.is_empty() {
        let _ = writeln!(out);
    }

    if report.results.is_empty() {
        let _ = writeln!(out, "  {}", "No subjects found.".dimmed());
        let _ = writeln!(out);
    }
    for result in &report.results {
        write_subject(&mut out, test_path, result);
    }

    write_summary(&mut out, &report.summary());
    let _ = writeln!(out);
    if report.has_failures() {
        let _ = writeln!(out, "  {}", "✗ Some subjects failed".red().bold());
    } else {
        let _ = writeln!(out, "  {}", "✓ Done".green().bold());
    }
    let _ = writeln!(out);
    out
}

fn write_subject(out: &mut String, test_path: &Path, result: &SubjectResult) {
    let mark = if result.is_failure() {
        "✗".red()
    } else {
        "✓".green()
    };
    let _ = writeln!(
        out,
        "  {} {} {}",
        mark,
        format!("[{}]", result.kind).dimmed(),
        result.subject.bold()
    );

    if let Some(error) = &result.error {
        let _ = writeln!(out, "      {}", error.red());
    }
    for file in &result.files {
        let path = display_path(test_path, &file.path);
        let _ = write!(out, "      {} {}", colored_status(file.status), path);
        if let Some(reason) = &file.reason {
            let _ = write!(out, " {}", format!("({})", reason).dimmed());
        }
        let _ = writeln!(out);
    }
    let _ = writeln!(out);
}

fn colored_status(status: OutcomeStatus) -> ColoredString {
    let label = format!("{:<11}", status.as_str());
    match status {
        OutcomeStatus::Created => label.green(),
        OutcomeStatus::Overwritten => label.yellow(),
        OutcomeStatus::Skipped => label.dimmed(),
        OutcomeStatus::Failed => label.red(),
    }
}

fn write_summary(out: &mut String, summary: &Summary) {
    let _ = writeln!(
        out,
        "  {} subject(s): {} created, {} overwritten, {} skipped, {} failed",
        summary.subjects,
        summary.created.to_string().green(),
        summary.overwritten.to_string().yellow(),
        summary.skipped,
        summary.failed.to_string().red()
    );
    if summary.failed_subjects > 0 {
        let _ = writeln!(
            out,
            "  {}",
            format!("{} subject(s) failed", summary.failed_subjects).red()
        );
    }
}
