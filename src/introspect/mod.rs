//! Capabilities the analyzers consume from the introspected application.
//!
//! The analyzers never talk to a live application directly. They ask:
//! - a [`ClassRegistry`] for classes, members, defaults and probe results
//! - a [`RouteTable`] for registered routes
//! - a [`SchemaProvider`] for admin-panel form and table schemas
//! - an [`Environment`] for optional subsystems (resolved once into [`Capabilities`])
//!
//! [`AppSnapshot`] implements all four from a YAML export.

mod snapshot;

pub use snapshot::{AppSnapshot, ClassRecord, ProbeRecord};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

use crate::descriptor::{FormField, Parameter, TableColumn};
use crate::naming;

/// Capability names understood by the analyzers.
pub const CAPABILITY_LIVEWIRE: &str = "livewire";
pub const CAPABILITY_FILAMENT: &str = "filament";

/// A speculative invocation or schema lookup that did not produce a value.
///
/// Always recovered by the caller; the candidate is dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    #[error("{class}::{method} is not invocable")]
    NotInvocable { class: String, method: String },
    #[error("{class}::{method} threw: {message}")]
    Threw {
        class: String,
        method: String,
        message: String,
    },
    #[error("no recorded result for {class}::{method}")]
    Unrecorded { class: String, method: String },
    #[error("no schema available for {0}")]
    NoSchema(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

/// A method visible on a class, tagged with the class that declares it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodInfo {
    pub name: String,
    #[serde(default)]
    pub declaring_class: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub doc: Option<String>,
    /// Body text, when the exporter captured it
    #[serde(default)]
    pub source: Option<String>,
}

/// A property visible on a class, tagged with the class that declares it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub name: String,
    #[serde(default)]
    pub declaring_class: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

/// Result of a successful probe.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeValue {
    /// An object; `related` is set when the object points at another class
    /// (the related model of a relation, for instance).
    Object {
        class: String,
        related: Option<String>,
    },
    Scalar(serde_json::Value),
}

impl RuntimeValue {
    pub fn class(&self) -> Option<&str> {
        match self {
            RuntimeValue::Object { class, .. } => Some(class),
            RuntimeValue::Scalar(_) => None,
        }
    }
}

/// Declared shape of one class.
pub trait ClassInfo {
    fn name(&self) -> &str;
    fn parent(&self) -> Option<&str>;
    /// Traits composed directly into this class
    fn traits(&self) -> &[String];
    /// Members declared on this class only
    fn declared_methods(&self) -> &[MethodInfo];
    fn declared_properties(&self) -> &[PropertyInfo];
}

/// Resolve-by-name access to the application's classes.
pub trait ClassRegistry {
    fn class(&self, name: &str) -> Option<&dyn ClassInfo>;

    /// Qualified names of every known class.
    fn class_names(&self) -> Vec<String>;

    /// Speculatively invoke `method` on a fresh instance of `class` with no
    /// arguments.
    fn invoke(&self, class: &str, method: &str) -> Result<RuntimeValue, ProbeFailure>;

    fn exists(&self, name: &str) -> bool {
        self.class(name).is_some()
    }

    /// Parent chain, nearest first. Stops on unknown parents and on cycles.
    fn ancestors(&self, name: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(naming::canonical(name));

        let mut current = self.class(name).and_then(|c| c.parent().map(naming::canonical));
        while let Some(parent) = current {
            if !seen.insert(parent.clone()) {
                break;
            }
            current = self
                .class(&parent)
                .and_then(|c| c.parent().map(naming::canonical));
            chain.push(parent);
        }
        chain
    }

    fn is_subclass_of(&self, name: &str, base: &str) -> bool {
        let base = naming::canonical(base);
        self.ancestors(name).iter().any(|a| *a == base)
    }

    /// Public methods including inherited ones. A method overridden lower in
    /// the hierarchy is reported once, for the most derived declaration.
    fn public_methods(&self, name: &str) -> Vec<MethodInfo> {
        let mut seen = HashSet::new();
        let mut methods = Vec::new();
        for class in self.lineage(name) {
            let Some(info) = self.class(&class) else {
                continue;
            };
            for method in info.declared_methods() {
                if method.visibility != Visibility::Public {
                    continue;
                }
                if seen.insert(method.name.clone()) {
                    let mut method = method.clone();
                    method.declaring_class = class.clone();
                    methods.push(method);
                }
            }
        }
        methods
    }

    /// Public properties including inherited ones, most derived first.
    fn public_properties(&self, name: &str) -> Vec<PropertyInfo> {
        let mut seen = HashSet::new();
        let mut properties = Vec::new();
        for class in self.lineage(name) {
            let Some(info) = self.class(&class) else {
                continue;
            };
            for property in info.declared_properties() {
                if property.visibility != Visibility::Public {
                    continue;
                }
                if seen.insert(property.name.clone()) {
                    let mut property = property.clone();
                    property.declaring_class = class.clone();
                    properties.push(property);
                }
            }
        }
        properties
    }

    /// Default value of a property of any visibility, walking ancestors.
    fn property_default(&self, name: &str, property: &str) -> Option<serde_json::Value> {
        self.lineage(name).into_iter().find_map(|class| {
            self.class(&class)?
                .declared_properties()
                .iter()
                .find(|p| p.name == property)
                .and_then(|p| p.default.clone())
        })
    }

    /// Whether a method of any visibility exists on the class or an ancestor.
    fn has_method(&self, name: &str, method: &str) -> bool {
        self.lineage(name).into_iter().any(|class| {
            self.class(&class)
                .map(|c| c.declared_methods().iter().any(|m| m.name == method))
                .unwrap_or(false)
        })
    }

    /// The class itself followed by its ancestors.
    fn lineage(&self, name: &str) -> Vec<String> {
        let mut chain = vec![naming::canonical(name)];
        chain.extend(self.ancestors(name));
        chain
    }
}

/// A route as registered in the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub uri: String,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// `Class@method`, or a closure marker
    pub action: String,
    #[serde(default)]
    pub middleware: Vec<String>,
}

pub trait RouteTable {
    fn routes(&self) -> Vec<RouteInfo>;
}

/// Form and table schemas of admin-panel resources.
pub trait SchemaProvider {
    fn describe_form(&self, resource: &str) -> Result<Vec<FormField>, ProbeFailure>;
    fn describe_table(&self, resource: &str) -> Result<Vec<TableColumn>, ProbeFailure>;
}

/// Optional subsystems installed in the application.
pub trait Environment {
    fn has_capability(&self, name: &str) -> bool;
}

/// Capabilities resolved once at the start of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    names: BTreeSet<String>,
}

impl Capabilities {
    /// Every capability the analyzers know about, as reported by `env`.
    pub fn resolve(env: &dyn Environment) -> Self {
        Self::resolve_names(env, &[CAPABILITY_LIVEWIRE, CAPABILITY_FILAMENT])
    }

    pub fn resolve_names(env: &dyn Environment, names: &[&str]) -> Self {
        Self {
            names: names
                .iter()
                .filter(|n| env.has_capability(n))
                .map(|n| n.to_string())
                .collect(),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Capabilities {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}
