//! Tests for the JSON report format.
//!
//! These tests run a batch over the testdata snapshot and check the shape
//! of the machine-readable report consumers depend on.

use std::path::PathBuf;

use gentests::analyze::{Conventions, ModelAnalyzer};
use gentests::batch::{Batch, BatchReport};
use gentests::generate::{OutputWriter, Settings};
use gentests::introspect::AppSnapshot;
use gentests::report::{build_json, JsonReport};
use gentests::stub::StubSet;

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

/// Generate model tests for the snapshot plus one unknown model and return
/// the JSON report.
fn run_and_get_json() -> JsonReport {
    let app = AppSnapshot::parse_file(testdata_path().join("app.yaml")).expect("should parse snapshot");
    let conventions = Conventions::default();
    let analyzer = ModelAnalyzer::new(&app, &conventions);

    let mut names = analyzer.discover();
    names.push("App\\Models\\Ghost".to_string());

    let dir = tempfile::tempdir().expect("temp dir");
    let stubs = StubSet::builtin();
    let settings = Settings::default();
    let mut report = BatchReport::new();
    Batch::new(&stubs, &settings, OutputWriter::new(dir.path())).run(&analyzer, &names, &mut report);

    build_json("model", dir.path(), &report)
}

#[test]
fn test_json_report_structure() {
    let report = run_and_get_json();

    assert!(!report.version.is_empty(), "version should not be empty");
    assert_eq!(report.command, "model");
    assert!(!report.test_path.is_empty(), "test_path should not be empty");
    assert!(!report.passed, "an unknown model should fail the run");
    assert_eq!(report.subjects.len(), 3);
}

#[test]
fn test_json_summary_counts_files() {
    let report = run_and_get_json();

    let files: usize = report.subjects.iter().map(|s| s.files.len()).sum();
    let s = &report.summary;
    assert_eq!(s.subjects, 3);
    assert_eq!(s.failed_subjects, 1);
    assert_eq!(s.created + s.overwritten + s.skipped + s.failed, files);
    assert_eq!(s.skipped, 0);
}

#[test]
fn test_json_subject_format() {
    let report = run_and_get_json();

    for subject in &report.subjects {
        assert_eq!(subject.kind, "model");
        assert!(!subject.subject.is_empty(), "subject should not be empty");

        for file in &subject.files {
            assert!(file.path.ends_with("Test.php"), "unexpected path {}", file.path);
            assert!(!file.path.starts_with('/'), "paths are relative to the test root");
            assert!(
                ["created", "overwritten", "skipped", "failed"].contains(&file.status.as_str()),
                "unknown status: {}",
                file.status
            );
        }
    }

    let ghost = report
        .subjects
        .iter()
        .find(|s| s.subject.ends_with("Ghost"))
        .expect("ghost subject reported");
    assert!(ghost.files.is_empty());
    assert!(ghost.error.as_deref().unwrap().contains("does not exist"));
}

#[test]
fn test_json_serialization() {
    let report = run_and_get_json();

    let json = serde_json::to_string_pretty(&report).expect("should serialize to JSON");
    let parsed: JsonReport = serde_json::from_str(&json).expect("should deserialize from JSON");

    assert_eq!(parsed.summary, report.summary);
    assert_eq!(parsed.subjects.len(), report.subjects.len());
    assert_eq!(parsed.passed, report.passed);
}

#[test]
fn test_json_field_names() {
    let report = run_and_get_json();
    let json = serde_json::to_string(&report).expect("should serialize");

    for field in [
        "version", "command", "test_path", "passed", "summary", "subjects",
        "failed_subjects", "created", "overwritten", "skipped", "kind", "subject",
        "files", "path", "status", "error",
    ] {
        assert!(
            json.contains(&format!("\"{}\"", field)),
            "should have '{}' field",
            field
        );
    }
    assert!(!json.contains("\"notes\""), "empty notes are omitted");
}
