//! Stub templates.
//!
//! Every stub is compiled into the binary. A stubs directory, when
//! configured, overrides individual stubs by file name; stubs it does not
//! contain fall back to the built-in text.

use serde::Serialize;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StubError {
    #[error("failed to read stub {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write stub {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The role a stub plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StubKind {
    Model,
    ModelRelationships,
    ModelScopes,
    ModelValidation,
    Controller,
    ApiController,
    Livewire,
    FilamentResource,
    FilamentPage,
    FilamentListPage,
    FilamentCreatePage,
    FilamentEditPage,
    FilamentViewPage,
}

struct Builtin {
    file_name: &'static str,
    content: &'static str,
}

/// Indexed by `StubKind` discriminant.
static BUILTINS: &[Builtin] = &[
    Builtin {
        file_name: "model.stub",
        content: include_str!("templates/model.stub"),
    },
    Builtin {
        file_name: "model_relationships.stub",
        content: include_str!("templates/model_relationships.stub"),
    },
    Builtin {
        file_name: "model_scopes.stub",
        content: include_str!("templates/model_scopes.stub"),
    },
    Builtin {
        file_name: "model_validation.stub",
        content: include_str!("templates/model_validation.stub"),
    },
    Builtin {
        file_name: "controller.stub",
        content: include_str!("templates/controller.stub"),
    },
    Builtin {
        file_name: "api_controller.stub",
        content: include_str!("templates/api_controller.stub"),
    },
    Builtin {
        file_name: "livewire.stub",
        content: include_str!("templates/livewire.stub"),
    },
    Builtin {
        file_name: "filament_resource.stub",
        content: include_str!("templates/filament_resource.stub"),
    },
    Builtin {
        file_name: "filament_page.stub",
        content: include_str!("templates/filament_page.stub"),
    },
    Builtin {
        file_name: "filament_list_page.stub",
        content: include_str!("templates/filament_list_page.stub"),
    },
    Builtin {
        file_name: "filament_create_page.stub",
        content: include_str!("templates/filament_create_page.stub"),
    },
    Builtin {
        file_name: "filament_edit_page.stub",
        content: include_str!("templates/filament_edit_page.stub"),
    },
    Builtin {
        file_name: "filament_view_page.stub",
        content: include_str!("templates/filament_view_page.stub"),
    },
];

impl StubKind {
    pub const ALL: [StubKind; 13] = [
        StubKind::Model,
        StubKind::ModelRelationships,
        StubKind::ModelScopes,
        StubKind::ModelValidation,
        StubKind::Controller,
        StubKind::ApiController,
        StubKind::Livewire,
        StubKind::FilamentResource,
        StubKind::FilamentPage,
        StubKind::FilamentListPage,
        StubKind::FilamentCreatePage,
        StubKind::FilamentEditPage,
        StubKind::FilamentViewPage,
    ];

    fn builtin(&self) -> &'static Builtin {
        &BUILTINS[*self as usize]
    }

    /// File name used for overrides and when publishing.
    pub fn file_name(&self) -> &'static str {
        self.builtin().file_name
    }

    pub fn builtin_content(&self) -> &'static str {
        self.builtin().content
    }
}

/// Where stubs are loaded from.
#[derive(Debug, Clone, Default)]
pub struct StubSet {
    overrides: Option<PathBuf>,
}

impl StubSet {
    /// Only the compiled-in stubs.
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Compiled-in stubs, overridden by same-named files in `dir`.
    pub fn with_overrides(dir: impl Into<PathBuf>) -> Self {
        Self {
            overrides: Some(dir.into()),
        }
    }

    pub fn overrides(&self) -> Option<&Path> {
        self.overrides.as_deref()
    }

    pub fn load(&self, kind: StubKind) -> Result<Cow<'static, str>, StubError> {
        if let Some(dir) = &self.overrides {
            let path = dir.join(kind.file_name());
            if path.is_file() {
                debug!(stub = kind.file_name(), path = %path.display(), "using stub override");
                return std::fs::read_to_string(&path)
                    .map(Cow::Owned)
                    .map_err(|source| StubError::Read { path, source });
            }
        }
        Ok(Cow::Borrowed(kind.builtin_content()))
    }
}

/// Write every built-in stub into `dir` for customisation.
///
/// Existing files are kept unless `force` is set. Returns the paths written.
pub fn publish(dir: &Path, force: bool) -> Result<Vec<PathBuf>, StubError> {
    std::fs::create_dir_all(dir).map_err(|source| StubError::Write {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::new();
    for kind in StubKind::ALL {
        let path = dir.join(kind.file_name());
        if path.exists() && !force {
            debug!(path = %path.display(), "stub already published");
            continue;
        }
        std::fs::write(&path, kind.builtin_content())
            .map_err(|source| StubError::Write {
                path: path.clone(),
                source,
            })?;
        written.push(path);
    }
    Ok(written)
}
