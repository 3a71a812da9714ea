//! Reactive UI component descriptor.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Method, SubjectName};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    #[serde(flatten)]
    pub subject: SubjectName,
    /// Component alias used in `Livewire::test()` and views (`user-profile`)
    pub component_name: String,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub methods: Vec<Method>,
    #[serde(default)]
    pub events: Vec<EmittedEvent>,
    #[serde(default)]
    pub listeners: Vec<Listener>,
    #[serde(default)]
    pub validation_rules: BTreeMap<String, String>,
    #[serde(default)]
    pub validation_attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub query_string: Vec<String>,
}

impl ComponentDescriptor {
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Methods callable without arguments.
    pub fn nullary_methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter().filter(|m| m.required_arity() == 0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

/// An event emitted from a component method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedEvent {
    pub event: String,
    pub method: String,
}

/// An event listener and the method that handles it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub event: String,
    pub handler: String,
}
