//! gentests - test scaffold generator for Laravel applications.
//!
//! gentests inspects an application's models, controllers, Livewire
//! components, Filament resources and database tables, and writes Pest test
//! files that exercise what it found.
//!
//! # Architecture
//!
//! Every subject goes through the same three stages:
//!
//! - `analyze`: resolve an identifier through the `introspect` capabilities
//!   and build a `descriptor::Descriptor`
//! - `render`: fill a `stub` template with single-pass placeholder substitution
//! - `generate`: decide the output paths for a descriptor and write the files
//!   through an overwrite-aware `generate::OutputWriter`
//!
//! `batch` drives many subjects and keeps going when one fails; `report`
//! prints the outcome. `config` reads `gentests.yaml`.
//!
//! # Adding a New Subject Kind
//!
//! Add a descriptor variant, implement `analyze::Analyzer` for it, implement
//! `generate::Generator`, and register the generator in `generate::generator_for`.

pub mod analyze;
pub mod batch;
pub mod cli;
pub mod config;
pub mod descriptor;
pub mod generate;
pub mod introspect;
pub mod naming;
pub mod render;
pub mod report;
pub mod stub;

pub use analyze::{AnalyzeError, Analyzer, Conventions};
pub use batch::{Batch, BatchReport, SubjectResult};
pub use config::Config;
pub use descriptor::{Descriptor, SubjectKind, SubjectName};
pub use generate::{generate, FileOutcome, GenerateError, OutcomeStatus, OutputWriter, Settings};
pub use introspect::{AppSnapshot, Capabilities};
pub use render::{render, Substitutions};
pub use stub::{StubKind, StubSet};
