//! Test generators.
//!
//! A generator turns one descriptor into one or more test files. Paths are
//! derived from the subject's short name under a fixed directory per kind;
//! content comes from rendering a stub with substitutions built from the
//! descriptor. Every file produces a [`FileOutcome`]: a failure to write one
//! file never stops its siblings.

mod component;
mod controller;
mod model;
mod resource;

pub use component::ComponentGenerator;
pub use controller::ControllerGenerator;
pub use model::ModelGenerator;
pub use resource::ResourceGenerator;

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::descriptor::{Descriptor, SubjectKind};
use crate::render::{render, Substitutions};
use crate::stub::{StubError, StubKind, StubSet};

/// Indentation of statements inside a generated test body.
pub(crate) const BODY_INDENT: &str = "\n    ";
/// Indentation of chained calls (`->assert...`) inside a test body.
pub(crate) const CHAIN_INDENT: &str = "\n        ";

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Stub(#[from] StubError),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{expected} generator cannot generate from a {found} descriptor")]
    WrongDescriptor {
        expected: SubjectKind,
        found: SubjectKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Created,
    Overwritten,
    Skipped,
    Failed,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Created => "created",
            OutcomeStatus::Overwritten => "overwritten",
            OutcomeStatus::Skipped => "skipped",
            OutcomeStatus::Failed => "failed",
        }
    }

    /// Whether a file was written.
    pub fn is_written(&self) -> bool {
        matches!(self, OutcomeStatus::Created | OutcomeStatus::Overwritten)
    }
}

/// What happened to one output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: OutcomeStatus,
    /// Set for failed outcomes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl FileOutcome {
    fn new(path: PathBuf, status: OutcomeStatus) -> Self {
        Self {
            path,
            status,
            reason: None,
        }
    }

    fn failed(path: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            path,
            status: OutcomeStatus::Failed,
            reason: Some(reason.into()),
        }
    }
}

/// Asked before replacing an existing file; `true` allows the overwrite.
pub type ConfirmHook<'a> = Box<dyn FnMut(&str) -> bool + 'a>;

/// Writes generated files under a test root, honouring the overwrite policy.
///
/// An existing file is replaced when `force` is set or the confirmation hook
/// agrees. With no hook it is left alone and reported as skipped.
pub struct OutputWriter<'a> {
    root: PathBuf,
    force: bool,
    extension: String,
    confirm: Option<ConfirmHook<'a>>,
}

impl<'a> OutputWriter<'a> {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            force: false,
            extension: "php".to_string(),
            confirm: None,
        }
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn confirm_with(mut self, hook: impl FnMut(&str) -> bool + 'a) -> Self {
        self.confirm = Some(Box::new(hook));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<dirs...>/<stem>Test.<ext>`
    pub fn test_path(&self, dirs: &[&str], stem: &str) -> PathBuf {
        let mut path = self.root.clone();
        for dir in dirs {
            path.push(dir);
        }
        path.push(format!("{}Test.{}", stem, self.extension));
        path
    }

    /// Write the text produced by `content` to `path`.
    ///
    /// `content` is only evaluated when the file will actually be written.
    pub fn write<F>(&mut self, path: PathBuf, content: F) -> FileOutcome
    where
        F: FnOnce() -> Result<String, GenerateError>,
    {
        let existed = path.exists();
        if existed && !self.force {
            let question = format!(
                "The file {} already exists. Do you want to overwrite it?",
                path.display()
            );
            let allowed = match self.confirm.as_mut() {
                Some(confirm) => confirm(&question),
                None => false,
            };
            if !allowed {
                info!(path = %path.display(), "skipped existing test file");
                return FileOutcome::new(path, OutcomeStatus::Skipped);
            }
        }

        let text = match content() {
            Ok(text) => text,
            Err(err) => return FileOutcome::failed(path, err.to_string()),
        };

        if let Some(parent) = path.parent() {
            if let Err(source) = std::fs::create_dir_all(parent) {
                let err = GenerateError::Io {
                    path: parent.to_path_buf(),
                    source,
                };
                return FileOutcome::failed(path, err.to_string());
            }
        }
        if let Err(source) = std::fs::write(&path, text) {
            let err = GenerateError::Io {
                path: path.clone(),
                source,
            };
            return FileOutcome::failed(path, err.to_string());
        }

        info!(path = %path.display(), "test file written");
        let status = if existed {
            OutcomeStatus::Overwritten
        } else {
            OutcomeStatus::Created
        };
        FileOutcome::new(path, status)
    }
}

/// Values generators need beyond the descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Namespace of the ORM relation classes
    pub relation_namespace: String,
    /// Namespace models live in (used for table-derived models)
    pub model_namespace: String,
    /// Admin panel URL prefix
    pub route_prefix: String,
    /// Class the generated tests authenticate as
    pub user_model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            relation_namespace: "Illuminate\\Database\\Eloquent\\Relations".to_string(),
            model_namespace: "App\\Models".to_string(),
            route_prefix: "admin".to_string(),
            user_model: "App\\Models\\User".to_string(),
        }
    }
}

/// A per-kind generator.
pub trait Generator {
    fn kind(&self) -> SubjectKind;

    /// Fails only when handed a descriptor of another kind; file-level
    /// failures are reported in the outcomes.
    fn generate(
        &self,
        descriptor: &Descriptor,
        out: &mut OutputWriter<'_>,
    ) -> Result<Vec<FileOutcome>, GenerateError>;
}

/// Generator responsible for a descriptor kind. Tables go through the model
/// generator.
pub fn generator_for<'a>(
    kind: SubjectKind,
    stubs: &'a StubSet,
    settings: &'a Settings,
) -> Box<dyn Generator + 'a> {
    match kind {
        SubjectKind::Model | SubjectKind::Table => Box::new(ModelGenerator::new(stubs, settings)),
        SubjectKind::Controller => Box::new(ControllerGenerator::new(stubs, settings)),
        SubjectKind::Component => Box::new(ComponentGenerator::new(stubs)),
        SubjectKind::Resource => Box::new(ResourceGenerator::new(stubs, settings)),
    }
}

/// Generate the files for any descriptor with the matching generator.
pub fn generate(
    descriptor: &Descriptor,
    stubs: &StubSet,
    settings: &Settings,
    out: &mut OutputWriter<'_>,
) -> Result<Vec<FileOutcome>, GenerateError> {
    generator_for(descriptor.kind(), stubs, settings).generate(descriptor, out)
}

pub(crate) fn render_stub(
    stubs: &StubSet,
    kind: StubKind,
    substitutions: &Substitutions,
) -> Result<String, GenerateError> {
    let stub = stubs.load(kind)?;
    Ok(render(&stub, substitutions))
}

/// Escape text for a single-quoted PHP string.
pub(crate) fn escape_php(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// `'text'`
pub(crate) fn php_string(s: &str) -> String {
    format!("'{}'", escape_php(s))
}

/// `['a', 'b']`
pub(crate) fn php_list<S: AsRef<str>>(items: &[S]) -> String {
    let inner: Vec<String> = items.iter().map(|s| php_string(s.as_ref())).collect();
    format!("[{}]", inner.join(", "))
}

/// PHP source for a JSON-like value.
pub(crate) fn php_literal(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => php_string(s),
        serde_json::Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(php_literal).collect();
            format!("[{}]", inner.join(", "))
        }
        serde_json::Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{} => {}", php_string(k), php_literal(v)))
                .collect();
            format!("[{}]", inner.join(", "))
        }
    }
}

/// Fully qualified class reference usable from a file without a namespace.
pub(crate) fn class_ref(class: &str) -> String {
    format!("\\{}", class.trim_start_matches('\\'))
}

/// `$this->actingAs(...)` preamble for authenticated tests.
pub(crate) fn auth_setup(settings: &Settings) -> String {
    format!(
        "$user = {}::factory()->create();{}$this->actingAs($user);",
        class_ref(&settings.user_model),
        BODY_INDENT
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = OutputWriter::new(dir.path());
        let path = out.test_path(&["Unit", "Models"], "User");
        assert!(path.ends_with("Unit/Models/UserTest.php"));

        let outcome = out.write(path.clone(), || Ok("<?php".to_string()));
        assert_eq!(outcome.status, OutcomeStatus::Created);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<?php");
    }

    #[test]
    fn test_existing_file_without_hook_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("UserTest.php");
        std::fs::write(&path, "original").unwrap();

        let mut out = OutputWriter::new(dir.path());
        let mut rendered = false;
        let outcome = out.write(path.clone(), || {
            rendered = true;
            Ok("new".to_string())
        });

        assert_eq!(outcome.status, OutcomeStatus::Skipped);
        assert!(!rendered);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
    }

    #[test]
    fn test_hook_decides_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("UserTest.php");
        std::fs::write(&path, "original").unwrap();

        let mut asked = Vec::new();
        {
            let mut out = OutputWriter::new(dir.path()).confirm_with(|q: &str| {
                asked.push(q.to_string());
                true
            });
            let outcome = out.write(path.clone(), || Ok("new".to_string()));
            assert_eq!(outcome.status, OutcomeStatus::Overwritten);
        }
        assert_eq!(asked.len(), 1);
        assert!(asked[0].contains("UserTest.php"));

        let mut out = OutputWriter::new(dir.path()).confirm_with(|_| false);
        let outcome = out.write(path.clone(), || Ok("newer".to_string()));
        assert_eq!(outcome.status, OutcomeStatus::Skipped);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn test_force_skips_the_hook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("UserTest.php");
        std::fs::write(&path, "original").unwrap();

        let mut out = OutputWriter::new(dir.path())
            .force(true)
            .confirm_with(|_| panic!("force must not ask"));
        let outcome = out.write(path.clone(), || Ok("new".to_string()));
        assert_eq!(outcome.status, OutcomeStatus::Overwritten);
    }

    #[test]
    fn test_render_failure_is_a_failed_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = OutputWriter::new(dir.path());
        let path = out.test_path(&[], "Broken");
        let outcome = out.write(path.clone(), || {
            Err(GenerateError::WrongDescriptor {
                expected: SubjectKind::Model,
                found: SubjectKind::Table,
            })
        });
        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert!(outcome.reason.is_some());
        assert!(!path.exists());
    }

    #[test]
    fn test_extension_is_configurable() {
        let out = OutputWriter::new("/tmp/t").extension(".spec.php");
        assert!(out
            .test_path(&["Feature"], "Home")
            .ends_with("Feature/HomeTest.spec.php"));
    }

    #[test]
    fn test_php_literals() {
        assert_eq!(php_string("it's"), "'it\\'s'");
        assert_eq!(php_list(&["a", "b"]), "['a', 'b']");
        assert_eq!(php_literal(&json!(null)), "null");
        assert_eq!(php_literal(&json!({"except": 1})), "['except' => 1]");
        assert_eq!(php_literal(&json!([true, "x"])), "[true, 'x']");
        assert_eq!(class_ref("\\App\\Models\\User"), "\\App\\Models\\User");
    }
}
