//! Subject descriptors.
//!
//! A descriptor is the structured, read-only description of one analyzed
//! subject. Analyzers build them fresh per call; generators only read them.

mod component;
mod controller;
mod model;
mod resource;
mod table;

pub use component::{ComponentDescriptor, EmittedEvent, Listener, Property};
pub use controller::{
    AssociatedModel, ControllerDescriptor, Route, RESOURCEFUL_THRESHOLD, REST_ACTIONS,
};
pub use model::{ModelDescriptor, RelationKind, Relationship, Scope};
pub use resource::{FormField, Page, PageRole, ResourceDescriptor, TableColumn};
pub use table::{has_soft_deletes, has_timestamps, Column, ForeignKey, Index, TableDescriptor};

use serde::{Deserialize, Serialize};

use crate::naming;

/// Fields shared by every descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectName {
    pub qualified_name: String,
    pub short_name: String,
    pub namespace: String,
}

impl SubjectName {
    /// Split a qualified name into its parts.
    pub fn parse(qualified: &str) -> Self {
        let canonical = naming::canonical(qualified);
        Self {
            short_name: naming::short_name(&canonical).to_string(),
            namespace: naming::namespace_of(&canonical).to_string(),
            qualified_name: canonical,
        }
    }
}

/// Subject kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Model,
    Controller,
    Table,
    Component,
    Resource,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Model => "model",
            SubjectKind::Controller => "controller",
            SubjectKind::Table => "table",
            SubjectKind::Component => "component",
            SubjectKind::Resource => "resource",
        }
    }
}

impl std::fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SubjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "model" => Ok(SubjectKind::Model),
            "controller" => Ok(SubjectKind::Controller),
            "table" => Ok(SubjectKind::Table),
            "component" | "livewire" => Ok(SubjectKind::Component),
            "resource" | "filament" => Ok(SubjectKind::Resource),
            _ => Err(format!("unknown subject kind: {}", s)),
        }
    }
}

/// One analyzed subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Descriptor {
    Model(ModelDescriptor),
    Controller(ControllerDescriptor),
    Table(TableDescriptor),
    Component(ComponentDescriptor),
    Resource(ResourceDescriptor),
}

impl Descriptor {
    pub fn kind(&self) -> SubjectKind {
        match self {
            Descriptor::Model(_) => SubjectKind::Model,
            Descriptor::Controller(_) => SubjectKind::Controller,
            Descriptor::Table(_) => SubjectKind::Table,
            Descriptor::Component(_) => SubjectKind::Component,
            Descriptor::Resource(_) => SubjectKind::Resource,
        }
    }

    pub fn subject(&self) -> &SubjectName {
        match self {
            Descriptor::Model(d) => &d.subject,
            Descriptor::Controller(d) => &d.subject,
            Descriptor::Table(d) => &d.subject,
            Descriptor::Component(d) => &d.subject,
            Descriptor::Resource(d) => &d.subject,
        }
    }

    pub fn qualified_name(&self) -> &str {
        &self.subject().qualified_name
    }
}

/// A declared method parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

/// A public method declared directly on the subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub doc: Option<String>,
}

impl Method {
    /// Number of parameters without a default value.
    pub fn required_arity(&self) -> usize {
        self.parameters.iter().filter(|p| !p.optional).count()
    }
}

/// A trait composed into the subject or one of its ancestors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitRef {
    /// Short name (`HasFactory`)
    pub name: String,
    /// Qualified name
    pub class: String,
}

impl TraitRef {
    pub fn new(qualified: &str) -> Self {
        Self {
            name: naming::short_name(qualified).to_string(),
            class: naming::canonical(qualified),
        }
    }
}
