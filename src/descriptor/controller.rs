//! HTTP controller descriptor.

use serde::{Deserialize, Serialize};

use super::{Method, SubjectName, TraitRef};

/// The seven canonical REST actions.
pub const REST_ACTIONS: [&str; 7] = [
    "index", "create", "store", "show", "edit", "update", "destroy",
];

/// Minimum number of REST actions for a controller to count as resourceful.
pub const RESOURCEFUL_THRESHOLD: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerDescriptor {
    #[serde(flatten)]
    pub subject: SubjectName,
    #[serde(default)]
    pub methods: Vec<Method>,
    #[serde(default)]
    pub traits: Vec<TraitRef>,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub model: Option<AssociatedModel>,
    pub is_api: bool,
    pub is_resourceful: bool,
    #[serde(default)]
    pub middleware: Vec<String>,
}

impl ControllerDescriptor {
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// REST actions this controller declares, in canonical order.
    pub fn rest_actions(&self) -> Vec<&'static str> {
        REST_ACTIONS
            .iter()
            .copied()
            .filter(|action| self.method(action).is_some())
            .collect()
    }

    /// Routes dispatching to `action`.
    pub fn routes_for(&self, action: &str) -> impl Iterator<Item = &Route> {
        let action = action.to_string();
        self.routes.iter().filter(move |r| r.action == action)
    }
}

/// A route dispatching to this controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub uri: String,
    pub methods: Vec<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Controller method name
    pub action: String,
    #[serde(default)]
    pub middleware: Vec<String>,
}

impl Route {
    /// Primary verb, preferring anything over `HEAD`.
    pub fn primary_method(&self) -> &str {
        self.methods
            .iter()
            .find(|m| !m.eq_ignore_ascii_case("HEAD"))
            .or_else(|| self.methods.first())
            .map(String::as_str)
            .unwrap_or("GET")
    }

    /// Names of `{param}` segments in the URI.
    pub fn parameters(&self) -> Vec<String> {
        self.uri
            .split('/')
            .filter_map(|seg| seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
            .map(|s| s.trim_end_matches('?').to_string())
            .collect()
    }
}

/// Model the controller operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociatedModel {
    pub class: String,
    pub short_name: String,
}
