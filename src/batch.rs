//! Batch driver.
//!
//! Runs analyze then generate for each subject in turn. A subject that fails
//! to analyze or generate is recorded and the batch moves on.

use serde::Serialize;
use tracing::{info_span, warn};

use crate::analyze::Analyzer;
use crate::descriptor::SubjectKind;
use crate::generate::{self, FileOutcome, OutcomeStatus, OutputWriter, Settings};
use crate::stub::StubSet;

/// Result of one subject.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectResult {
    pub kind: SubjectKind,
    pub subject: String,
    pub files: Vec<FileOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubjectResult {
    pub fn failed(kind: SubjectKind, subject: &str, error: impl ToString) -> Self {
        Self {
            kind,
            subject: subject.to_string(),
            files: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    /// The subject errored or one of its files could not be written.
    pub fn is_failure(&self) -> bool {
        self.error.is_some() || self.files.iter().any(|f| f.status == OutcomeStatus::Failed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub subjects: usize,
    pub failed_subjects: usize,
    pub created: usize,
    pub overwritten: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub results: Vec<SubjectResult>,
    /// Informational messages (e.g. an optional subsystem not installed)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: SubjectResult) {
        self.results.push(result);
    }

    pub fn note(&mut self, message: impl Into<String>) {
        self.notes.push(message.into());
    }

    pub fn has_failures(&self) -> bool {
        self.results.iter().any(SubjectResult::is_failure)
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            subjects: self.results.len(),
            failed_subjects: self.results.iter().filter(|r| r.is_failure()).count(),
            ..Summary::default()
        };
        for file in self.results.iter().flat_map(|r| &r.files) {
            match file.status {
                OutcomeStatus::Created => summary.created += 1,
                OutcomeStatus::Overwritten => summary.overwritten += 1,
                OutcomeStatus::Skipped => summary.skipped += 1,
                OutcomeStatus::Failed => summary.failed += 1,
            }
        }
        summary
    }
}

/// Called before each subject is processed.
pub type SubjectHook<'a> = Box<dyn FnMut(SubjectKind, &str) + 'a>;

pub struct Batch<'a> {
    stubs: &'a StubSet,
    settings: &'a Settings,
    out: OutputWriter<'a>,
    on_subject: Option<SubjectHook<'a>>,
}

impl<'a> Batch<'a> {
    pub fn new(stubs: &'a StubSet, settings: &'a Settings, out: OutputWriter<'a>) -> Self {
        Self {
            stubs,
            settings,
            out,
            on_subject: None,
        }
    }

    pub fn on_subject(mut self, hook: impl FnMut(SubjectKind, &str) + 'a) -> Self {
        self.on_subject = Some(Box::new(hook));
        self
    }

    /// Analyze and generate every identifier, appending to `report`.
    pub fn run<S: AsRef<str>>(
        &mut self,
        analyzer: &dyn Analyzer,
        identifiers: &[S],
        report: &mut BatchReport,
    ) {
        for identifier in identifiers {
            let result = self.run_one(analyzer, identifier.as_ref());
            report.push(result);
        }
    }

    pub fn run_one(&mut self, analyzer: &dyn Analyzer, identifier: &str) -> SubjectResult {
        let kind = analyzer.kind();
        let _span = info_span!("subject", kind = %kind, name = identifier).entered();
        if let Some(hook) = self.on_subject.as_mut() {
            hook(kind, identifier);
        }

        let descriptor = match analyzer.analyze(identifier) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                warn!(error = %err, "analysis failed");
                return SubjectResult::failed(kind, identifier, err);
            }
        };

        match generate::generate(&descriptor, self.stubs, self.settings, &mut self.out) {
            Ok(files) => {
                for file in files.iter().filter(|f| f.status == OutcomeStatus::Failed) {
                    warn!(path = %file.path.display(), reason = ?file.reason, "test file not written");
                }
                SubjectResult {
                    kind,
                    subject: descriptor.qualified_name().to_string(),
                    files,
                    error: None,
                }
            }
            Err(err) => {
                warn!(error = %err, "generation failed");
                SubjectResult::failed(kind, identifier, err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::{AnalyzeError, Conventions, ModelAnalyzer};
    use crate::descriptor::Descriptor;
    use crate::introspect::{AppSnapshot, ClassRecord};

    fn class(name: &str, parent: Option<&str>) -> ClassRecord {
        ClassRecord {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            ..Default::default()
        }
    }

    fn snapshot() -> AppSnapshot {
        AppSnapshot::from_classes(vec![
            class("Illuminate\\Database\\Eloquent\\Model", None),
            class("App\\Models\\User", Some("Illuminate\\Database\\Eloquent\\Model")),
            class("App\\Support\\Money", None),
        ])
    }

    #[test]
    fn test_batch_continues_after_failures() {
        let dir = tempfile::tempdir().unwrap();
        let registry = snapshot();
        let conventions = Conventions::default();
        let analyzer = ModelAnalyzer::new(&registry, &conventions);
        let stubs = StubSet::builtin();
        let settings = Settings::default();

        let mut seen = Vec::new();
        let mut report = BatchReport::new();
        {
            let mut batch = Batch::new(&stubs, &settings, OutputWriter::new(dir.path()))
                .on_subject(|_, name| seen.push(name.to_string()));
            batch.run(
                &analyzer,
                &["App\\Models\\Missing", "App\\Support\\Money", "App\\Models\\User"],
                &mut report,
            );
        }

        assert_eq!(seen.len(), 3);
        assert_eq!(report.results.len(), 3);
        assert!(report.results[0].error.as_deref().unwrap().contains("does not exist"));
        assert!(report.results[1].is_failure());
        assert!(!report.results[2].is_failure());
        assert!(report.has_failures());
        assert!(dir.path().join("Unit/Models/UserTest.php").exists());

        let summary = report.summary();
        assert_eq!(summary.subjects, 3);
        assert_eq!(summary.failed_subjects, 2);
        assert_eq!(summary.created, 1);
    }

    struct Fixed(Descriptor);

    impl Analyzer for Fixed {
        fn kind(&self) -> SubjectKind {
            SubjectKind::Model
        }

        fn analyze(&self, _identifier: &str) -> Result<Descriptor, AnalyzeError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_second_run_skips_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let stubs = StubSet::builtin();
        let settings = Settings::default();
        let model = crate::descriptor::ModelDescriptor::with_defaults(
            crate::descriptor::SubjectName::parse("App\\Models\\Post"),
        );
        let analyzer = Fixed(Descriptor::Model(model));

        let mut report = BatchReport::new();
        Batch::new(&stubs, &settings, OutputWriter::new(dir.path())).run(
            &analyzer,
            &["App\\Models\\Post"],
            &mut report,
        );
        Batch::new(&stubs, &settings, OutputWriter::new(dir.path())).run(
            &analyzer,
            &["App\\Models\\Post"],
            &mut report,
        );

        let summary = report.summary();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped, 1);
        assert!(!report.has_failures());
    }
}
