//! Analyzers turn a subject identifier into a [`Descriptor`].
//!
//! Each analyzer resolves the subject through the collaborator traits in
//! [`crate::introspect`], validates its kind, and fills the descriptor from
//! members declared directly on the subject. Malformed requests (unknown
//! identifier, wrong kind, unsupported driver) fail; missing information about
//! a valid subject degrades to empty fields.

mod component;
mod controller;
pub mod database;
mod model;
mod resource;

pub use component::{ComponentAnalyzer, EmissionDetector, RegexEmissionDetector};
pub use controller::ControllerAnalyzer;
pub use database::{TableAnalyzer, TableSelection};
pub use model::ModelAnalyzer;
pub use resource::ResourceAnalyzer;

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

use crate::descriptor::{Descriptor, Method, SubjectKind, SubjectName, TraitRef};
use crate::introspect::{ClassRegistry, MethodInfo, PropertyInfo};
use crate::naming;

pub use database::QueryError;

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("{kind} {name} does not exist")]
    NotFound { kind: SubjectKind, name: String },
    #[error("{name} is not a valid {kind} (expected a subclass of {base})")]
    KindMismatch {
        kind: SubjectKind,
        name: String,
        base: String,
    },
    #[error("unsupported database driver: {0}")]
    UnsupportedDriver(String),
    #[error("could not determine model for resource {0}")]
    ModelUnresolved(String),
    #[error("schema query failed: {0}")]
    Query(#[from] QueryError),
}

/// One analyzer per subject kind.
pub trait Analyzer {
    fn kind(&self) -> SubjectKind;

    fn analyze(&self, identifier: &str) -> Result<Descriptor, AnalyzeError>;
}

/// Namespaces and base classes of the host framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conventions {
    pub model_namespace: String,
    pub controller_namespace: String,
    pub livewire_namespace: String,
    pub filament_namespace: String,
    pub model_base: String,
    pub controller_base: String,
    pub livewire_base: String,
    pub filament_base: String,
    pub relation_namespace: String,
}

impl Default for Conventions {
    fn default() -> Self {
        Self {
            model_namespace: "App\\Models".to_string(),
            controller_namespace: "App\\Http\\Controllers".to_string(),
            livewire_namespace: "App\\Livewire".to_string(),
            filament_namespace: "App\\Filament\\Resources".to_string(),
            model_base: "Illuminate\\Database\\Eloquent\\Model".to_string(),
            controller_base: "Illuminate\\Routing\\Controller".to_string(),
            livewire_base: "Livewire\\Component".to_string(),
            filament_base: "Filament\\Resources\\Resource".to_string(),
            relation_namespace: "Illuminate\\Database\\Eloquent\\Relations".to_string(),
        }
    }
}

/// Subjects found under a namespace for an optional subsystem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Discovery {
    pub installed: bool,
    pub subjects: Vec<String>,
}

impl Discovery {
    pub fn not_installed() -> Self {
        Self::default()
    }
}

/// Resolve `identifier` and check it descends from `base`.
pub(crate) fn resolve_subject(
    registry: &dyn ClassRegistry,
    identifier: &str,
    kind: SubjectKind,
    base: &str,
) -> Result<SubjectName, AnalyzeError> {
    let name = naming::canonical(identifier);
    if !registry.exists(&name) {
        return Err(AnalyzeError::NotFound { kind, name });
    }
    if !registry.is_subclass_of(&name, base) {
        return Err(AnalyzeError::KindMismatch {
            kind,
            name,
            base: naming::canonical(base),
        });
    }
    Ok(SubjectName::parse(&name))
}

/// Public methods declared on `class` itself.
pub(crate) fn declared_methods(registry: &dyn ClassRegistry, class: &str) -> Vec<MethodInfo> {
    registry
        .public_methods(class)
        .into_iter()
        .filter(|m| m.declaring_class == class)
        .collect()
}

/// Public properties declared on `class` itself.
pub(crate) fn declared_properties(registry: &dyn ClassRegistry, class: &str) -> Vec<PropertyInfo> {
    registry
        .public_properties(class)
        .into_iter()
        .filter(|p| p.declaring_class == class)
        .collect()
}

pub(crate) fn to_method(info: &MethodInfo) -> Method {
    Method {
        name: info.name.clone(),
        parameters: info.parameters.clone(),
        return_type: info.return_type.clone(),
        doc: info.doc.clone(),
    }
}

/// Traits composed into the class, its traits (recursively) and every
/// ancestor, de-duplicated by qualified name in discovery order.
pub(crate) fn aggregate_traits(registry: &dyn ClassRegistry, class: &str) -> Vec<TraitRef> {
    let mut seen = HashSet::new();
    let mut traits = Vec::new();
    for owner in registry.lineage(class) {
        collect_traits(registry, &owner, &mut seen, &mut traits);
    }
    traits
}

fn collect_traits(
    registry: &dyn ClassRegistry,
    owner: &str,
    seen: &mut HashSet<String>,
    out: &mut Vec<TraitRef>,
) {
    let Some(info) = registry.class(owner) else {
        return;
    };
    let direct: Vec<String> = info.traits().to_vec();
    for name in direct {
        let name = naming::canonical(&name);
        if !seen.insert(name.clone()) {
            continue;
        }
        out.push(TraitRef::new(&name));
        collect_traits(registry, &name, seen, out);
    }
}

/// Classes under `namespace` descending from `base`.
pub(crate) fn discover(registry: &dyn ClassRegistry, namespace: &str, base: &str) -> Vec<String> {
    let prefix = format!("{}{}", naming::canonical(namespace), naming::SEPARATOR);
    let mut found: Vec<String> = registry
        .class_names()
        .into_iter()
        .filter(|name| name.starts_with(&prefix))
        .filter(|name| registry.is_subclass_of(name, base))
        .collect();
    found.sort();
    found
}

/// String list from a property default (`['a', 'b']`). Anything else is empty.
pub(crate) fn string_list(value: Option<&serde_json::Value>) -> Vec<String> {
    match value {
        Some(serde_json::Value::Array(items)) => items.iter().filter_map(scalar_string).collect(),
        Some(serde_json::Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// String map from a property default (`['a' => 'x']`).
pub(crate) fn string_map(value: Option<&serde_json::Value>) -> BTreeMap<String, String> {
    match value {
        Some(serde_json::Value::Object(map)) => map
            .iter()
            .filter_map(|(k, v)| scalar_string(v).map(|v| (k.clone(), v)))
            .collect(),
        _ => BTreeMap::new(),
    }
}

/// Validation rules keyed by field. Lists join with `|`; nested groups
/// flatten to dotted keys.
pub(crate) fn rule_map(value: Option<&serde_json::Value>) -> BTreeMap<String, String> {
    let mut rules = BTreeMap::new();
    if let Some(serde_json::Value::Object(map)) = value {
        flatten_rules("", map, &mut rules);
    }
    rules
}

fn flatten_rules(
    prefix: &str,
    map: &serde_json::Map<String, serde_json::Value>,
    out: &mut BTreeMap<String, String>,
) {
    for (field, rule) in map {
        let key = if prefix.is_empty() {
            field.clone()
        } else {
            format!("{}.{}", prefix, field)
        };
        match rule {
            serde_json::Value::Object(nested) => flatten_rules(&key, nested, out),
            serde_json::Value::Array(parts) => {
                let joined = parts
                    .iter()
                    .filter_map(scalar_string)
                    .collect::<Vec<_>>()
                    .join("|");
                out.insert(key, joined);
            }
            other => {
                if let Some(s) = scalar_string(other) {
                    out.insert(key, s);
                }
            }
        }
    }
}

pub(crate) fn scalar_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
