//! YAML export of an introspected application.
//!
//! ```yaml
//! capabilities: [livewire, filament]
//! classes:
//!   - name: App\Models\User
//!     parent: Illuminate\Database\Eloquent\Model
//!     traits: [Illuminate\Database\Eloquent\Factories\HasFactory]
//!     properties:
//!       - { name: fillable, visibility: protected, default: [name, email] }
//!     methods:
//!       - { name: posts, return_type: Illuminate\Database\Eloquent\Relations\HasMany }
//!     probes:
//!       posts: { class: Illuminate\Database\Eloquent\Relations\HasMany, related: App\Models\Post }
//! routes:
//!   - { uri: users, methods: [GET, HEAD], action: App\Http\Controllers\UserController@index }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use super::{
    ClassInfo, ClassRegistry, Environment, MethodInfo, ProbeFailure, PropertyInfo, RouteInfo,
    RouteTable, RuntimeValue, SchemaProvider,
};
use crate::descriptor::{FormField, TableColumn};
use crate::naming;

/// Recorded outcome of invoking a method with no arguments.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ProbeRecord {
    /// Class of the returned object
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub related: Option<String>,
    /// Scalar return value
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    /// Message of the exception thrown, if any
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClassRecord {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub methods: Vec<MethodInfo>,
    #[serde(default)]
    pub properties: Vec<PropertyInfo>,
    #[serde(default)]
    pub probes: BTreeMap<String, ProbeRecord>,
    /// Admin-panel form schema
    #[serde(default)]
    pub form: Option<Vec<FormField>>,
    /// Admin-panel table schema
    #[serde(default)]
    pub table: Option<Vec<TableColumn>>,
}

impl ClassInfo for ClassRecord {
    fn name(&self) -> &str {
        &self.name
    }

    fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    fn traits(&self) -> &[String] {
        &self.traits
    }

    fn declared_methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    fn declared_properties(&self) -> &[PropertyInfo] {
        &self.properties
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppSnapshot {
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub classes: Vec<ClassRecord>,
    #[serde(default)]
    pub routes: Vec<RouteInfo>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl AppSnapshot {
    /// Parse a snapshot from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let snapshot: AppSnapshot = serde_yaml::from_str(content)?;
        Ok(snapshot.indexed())
    }

    /// Build a snapshot from class records directly.
    pub fn from_classes(classes: Vec<ClassRecord>) -> Self {
        AppSnapshot {
            classes,
            ..Default::default()
        }
        .indexed()
    }

    pub fn with_routes(mut self, routes: Vec<RouteInfo>) -> Self {
        self.routes = routes;
        self
    }

    pub fn with_capabilities<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.capabilities = names.into_iter().map(Into::into).collect();
        self
    }

    /// Canonicalise names and tag members with their declaring class.
    fn indexed(mut self) -> Self {
        self.index.clear();
        for (i, class) in self.classes.iter_mut().enumerate() {
            class.name = naming::canonical(&class.name);
            class.parent = class.parent.as_deref().map(naming::canonical);
            for t in class.traits.iter_mut() {
                *t = naming::canonical(t);
            }
            for m in class.methods.iter_mut() {
                m.declaring_class = class.name.clone();
            }
            for p in class.properties.iter_mut() {
                p.declaring_class = class.name.clone();
            }
            self.index.insert(class.name.clone(), i);
        }
        self
    }

    fn record(&self, name: &str) -> Option<&ClassRecord> {
        self.index
            .get(&naming::canonical(name))
            .and_then(|&i| self.classes.get(i))
    }
}

impl ClassRegistry for AppSnapshot {
    fn class(&self, name: &str) -> Option<&dyn ClassInfo> {
        self.record(name).map(|c| c as &dyn ClassInfo)
    }

    fn class_names(&self) -> Vec<String> {
        self.classes.iter().map(|c| c.name.clone()).collect()
    }

    fn invoke(&self, class: &str, method: &str) -> Result<RuntimeValue, ProbeFailure> {
        let not_invocable = || ProbeFailure::NotInvocable {
            class: class.to_string(),
            method: method.to_string(),
        };

        let record = self.record(class).ok_or_else(not_invocable)?;
        if !self.public_methods(class).iter().any(|m| m.name == method) {
            return Err(not_invocable());
        }

        let probe = record
            .probes
            .get(method)
            .ok_or_else(|| ProbeFailure::Unrecorded {
                class: class.to_string(),
                method: method.to_string(),
            })?;

        if let Some(message) = &probe.error {
            return Err(ProbeFailure::Threw {
                class: class.to_string(),
                method: method.to_string(),
                message: message.clone(),
            });
        }

        match &probe.class {
            Some(returned) => Ok(RuntimeValue::Object {
                class: naming::canonical(returned),
                related: probe.related.as_deref().map(naming::canonical),
            }),
            None => Ok(RuntimeValue::Scalar(
                probe.value.clone().unwrap_or(serde_json::Value::Null),
            )),
        }
    }
}

impl RouteTable for AppSnapshot {
    fn routes(&self) -> Vec<RouteInfo> {
        self.routes.clone()
    }
}

impl SchemaProvider for AppSnapshot {
    fn describe_form(&self, resource: &str) -> Result<Vec<FormField>, ProbeFailure> {
        self.record(resource)
            .and_then(|c| c.form.clone())
            .ok_or_else(|| ProbeFailure::NoSchema(resource.to_string()))
    }

    fn describe_table(&self, resource: &str) -> Result<Vec<TableColumn>, ProbeFailure> {
        self.record(resource)
            .and_then(|c| c.table.clone())
            .ok_or_else(|| ProbeFailure::NoSchema(resource.to_string()))
    }
}

impl Environment for AppSnapshot {
    fn has_capability(&self, name: &str) -> bool {
        self.capabilities.iter().any(|c| c.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::{Capabilities, Visibility};

    const SNAPSHOT: &str = r#"
capabilities: [livewire]
classes:
  - name: Base
    methods:
      - name: inherited
      - name: shared
    properties:
      - name: primaryKey
        visibility: protected
        default: uuid
  - name: \App\Child
    parent: Base
    methods:
      - name: own
      - name: shared
      - name: hidden
        visibility: private
    probes:
      own:
        class: Illuminate\Database\Eloquent\Relations\HasMany
        related: App\Post
      shared:
        error: boom
  - name: LoopA
    parent: LoopB
  - name: LoopB
    parent: LoopA
"#;

    fn snapshot() -> AppSnapshot {
        AppSnapshot::from_yaml(SNAPSHOT).unwrap()
    }

    #[test]
    fn test_lookup_is_canonical() {
        let snap = snapshot();
        assert!(snap.exists("App\\Child"));
        assert!(snap.exists("\\App\\Child"));
        assert!(!snap.exists("App\\Missing"));
    }

    #[test]
    fn test_public_methods_tag_declaring_class() {
        let snap = snapshot();
        let methods = snap.public_methods("App\\Child");
        let names: Vec<_> = methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["own", "shared", "inherited"]);

        let shared = methods.iter().find(|m| m.name == "shared").unwrap();
        assert_eq!(shared.declaring_class, "App\\Child");
        let inherited = methods.iter().find(|m| m.name == "inherited").unwrap();
        assert_eq!(inherited.declaring_class, "Base");
        assert!(methods.iter().all(|m| m.visibility == Visibility::Public));
    }

    #[test]
    fn test_property_default_walks_ancestors() {
        let snap = snapshot();
        assert_eq!(
            snap.property_default("App\\Child", "primaryKey"),
            Some(serde_json::json!("uuid"))
        );
        assert_eq!(snap.property_default("App\\Child", "table"), None);
    }

    #[test]
    fn test_ancestors_guard_cycles() {
        let snap = snapshot();
        assert_eq!(snap.ancestors("LoopA"), vec!["LoopB".to_string()]);
        assert!(snap.is_subclass_of("App\\Child", "Base"));
        assert!(!snap.is_subclass_of("Base", "App\\Child"));
    }

    #[test]
    fn test_invoke_outcomes() {
        let snap = snapshot();
        match snap.invoke("App\\Child", "own").unwrap() {
            RuntimeValue::Object { class, related } => {
                assert_eq!(class, "Illuminate\\Database\\Eloquent\\Relations\\HasMany");
                assert_eq!(related.as_deref(), Some("App\\Post"));
            }
            other => panic!("unexpected value {:?}", other),
        }
        assert!(matches!(
            snap.invoke("App\\Child", "shared"),
            Err(ProbeFailure::Threw { .. })
        ));
        assert!(matches!(
            snap.invoke("App\\Child", "hidden"),
            Err(ProbeFailure::NotInvocable { .. })
        ));
        assert!(matches!(
            snap.invoke("App\\Child", "inherited"),
            Err(ProbeFailure::Unrecorded { .. })
        ));
    }

    #[test]
    fn test_capabilities_resolved_from_snapshot() {
        let caps = Capabilities::resolve(&snapshot());
        assert!(caps.has("livewire"));
        assert!(!caps.has("filament"));
    }

    #[test]
    fn test_missing_schema_is_probe_failure() {
        let snap = snapshot();
        assert!(snap.describe_form("App\\Child").is_err());
    }
}
