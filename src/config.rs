//! `gentests.yaml` configuration.
//!
//! Every field is optional; a missing file is the same as an empty one.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::analyze::{Conventions, TableSelection};
use crate::generate::Settings;
use crate::stub::StubSet;

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = "gentests.yaml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid exclude pattern {pattern:?}: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error("extension must not be empty")]
    EmptyExtension,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Root directory generated tests are written under
    pub test_path: PathBuf,
    /// Directory whose stubs override the built-in ones
    pub stubs_path: Option<PathBuf>,
    /// Extension of generated files, without the dot
    pub extension: String,
    pub namespaces: Namespaces,
    pub base_classes: BaseClasses,
    pub relation_namespace: String,
    /// Class generated tests authenticate as
    pub user_model: String,
    /// URL prefix of the admin panel
    pub route_prefix: String,
    pub database: DatabaseConfig,
}

impl Default for Config {
    fn default() -> Self {
        let conventions = Conventions::default();
        let settings = Settings::default();
        Self {
            test_path: PathBuf::from("tests"),
            stubs_path: None,
            extension: "php".to_string(),
            namespaces: Namespaces {
                models: conventions.model_namespace,
                controllers: conventions.controller_namespace,
                livewire: conventions.livewire_namespace,
                filament: conventions.filament_namespace,
            },
            base_classes: BaseClasses {
                model: conventions.model_base,
                controller: conventions.controller_base,
                livewire: conventions.livewire_base,
                filament: conventions.filament_base,
            },
            relation_namespace: conventions.relation_namespace,
            user_model: settings.user_model,
            route_prefix: settings.route_prefix,
            database: DatabaseConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Namespaces {
    pub models: String,
    pub controllers: String,
    pub livewire: String,
    pub filament: String,
}

impl Default for Namespaces {
    fn default() -> Self {
        Config::default().namespaces
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BaseClasses {
    pub model: String,
    pub controller: String,
    pub livewire: String,
    pub filament: String,
}

impl Default for BaseClasses {
    fn default() -> Self {
        Config::default().base_classes
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file to introspect
    pub path: Option<PathBuf>,
    /// Driver name; only `sqlite` can be opened directly
    pub driver: Option<String>,
    /// Tables to analyze (empty means all)
    pub include: Vec<String>,
    /// Glob patterns of tables to skip
    pub exclude: Vec<String>,
}

impl Config {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Load `gentests.yaml` from `dir` if present, defaults otherwise.
    ///
    /// Relative paths in the file are resolved against `dir`.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        if !path.is_file() {
            tracing::debug!(dir = %dir.display(), "no configuration file, using defaults");
            return Ok(Self::default().relative_to(dir));
        }
        tracing::debug!(path = %path.display(), "loading configuration");
        Ok(Self::parse_file(&path)?.relative_to(dir))
    }

    /// Resolve relative paths against `dir`.
    pub fn relative_to(mut self, dir: &Path) -> Self {
        let resolve = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                dir.join(p)
            }
        };
        self.test_path = resolve(&self.test_path);
        self.stubs_path = self.stubs_path.as_deref().map(resolve);
        self.database.path = self.database.path.as_deref().map(resolve);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extension.trim_start_matches('.').trim().is_empty() {
            return Err(ConfigError::EmptyExtension);
        }
        for pattern in &self.database.exclude {
            globset::Glob::new(pattern).map_err(|source| ConfigError::Glob {
                pattern: pattern.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn conventions(&self) -> Conventions {
        Conventions {
            model_namespace: self.namespaces.models.clone(),
            controller_namespace: self.namespaces.controllers.clone(),
            livewire_namespace: self.namespaces.livewire.clone(),
            filament_namespace: self.namespaces.filament.clone(),
            model_base: self.base_classes.model.clone(),
            controller_base: self.base_classes.controller.clone(),
            livewire_base: self.base_classes.livewire.clone(),
            filament_base: self.base_classes.filament.clone(),
            relation_namespace: self.relation_namespace.clone(),
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            relation_namespace: self.relation_namespace.clone(),
            model_namespace: self.namespaces.models.clone(),
            route_prefix: self.route_prefix.clone(),
            user_model: self.user_model.clone(),
        }
    }

    pub fn table_selection(&self) -> Result<TableSelection, ConfigError> {
        TableSelection::new(&self.database.include, &self.database.exclude).map_err(|source| {
            ConfigError::Glob {
                pattern: self.database.exclude.join(", "),
                source,
            }
        })
    }

    pub fn stubs(&self) -> StubSet {
        match &self.stubs_path {
            Some(dir) => StubSet::with_overrides(dir),
            None => StubSet::builtin(),
        }
    }
}

/// Commented configuration written by `init`.
pub const DEFAULT_CONFIG: &str = r#"# gentests configuration

# Where generated tests are written.
test_path: tests

# Directory of customised stubs (see `gentests init --publish-stubs`).
# stubs_path: stubs/gentests

extension: php

namespaces:
  models: App\Models
  controllers: App\Http\Controllers
  livewire: App\Livewire
  filament: App\Filament\Resources

base_classes:
  model: Illuminate\Database\Eloquent\Model
  controller: Illuminate\Routing\Controller
  livewire: Livewire\Component
  filament: Filament\Resources\Resource

relation_namespace: Illuminate\Database\Eloquent\Relations
user_model: App\Models\User
route_prefix: admin

database:
  # SQLite file to read the schema from.
  # path: database/database.sqlite
  driver: sqlite
  include: []
  exclude:
    - failed_jobs
    - password_reset*
    - personal_access_tokens
"#;
