use tracing::debug;

use super::{
    aggregate_traits, declared_methods, discover, resolve_subject, rule_map, string_list,
    string_map, to_method, AnalyzeError, Analyzer, Conventions,
};
use crate::descriptor::{Descriptor, ModelDescriptor, RelationKind, Relationship, Scope, SubjectKind};
use crate::introspect::{ClassRegistry, MethodInfo, RuntimeValue};
use crate::naming;

/// Lifecycle hooks that are never relationships.
const NON_RELATION_METHODS: &[&str] = &["__construct", "boot", "booted"];

const SCOPE_PREFIX: &str = "scope";

pub struct ModelAnalyzer<'a> {
    registry: &'a dyn ClassRegistry,
    conventions: &'a Conventions,
}

impl<'a> ModelAnalyzer<'a> {
    pub fn new(registry: &'a dyn ClassRegistry, conventions: &'a Conventions) -> Self {
        Self {
            registry,
            conventions,
        }
    }

    /// Models under the configured namespace.
    pub fn discover(&self) -> Vec<String> {
        discover(
            self.registry,
            &self.conventions.model_namespace,
            &self.conventions.model_base,
        )
    }

    pub fn analyze_model(&self, identifier: &str) -> Result<ModelDescriptor, AnalyzeError> {
        let subject = resolve_subject(
            self.registry,
            identifier,
            SubjectKind::Model,
            &self.conventions.model_base,
        )?;
        let class = subject.qualified_name.clone();
        let reg = self.registry;
        let mut model = ModelDescriptor::with_defaults(subject);

        let text = |prop: &str| {
            reg.property_default(&class, prop)
                .and_then(|v| v.as_str().map(String::from))
        };
        let flag = |prop: &str| reg.property_default(&class, prop).and_then(|v| v.as_bool());

        if let Some(table) = text("table") {
            model.table = table;
        }
        if let Some(key) = text("primaryKey") {
            model.primary_key = key;
        }
        if let Some(key_type) = text("keyType") {
            model.key_type = key_type;
        }
        if let Some(incrementing) = flag("incrementing") {
            model.incrementing = incrementing;
        }
        if let Some(timestamps) = flag("timestamps") {
            model.timestamps = timestamps;
        }

        model.fillable = string_list(reg.property_default(&class, "fillable").as_ref());
        model.guarded = string_list(reg.property_default(&class, "guarded").as_ref());
        model.hidden = string_list(reg.property_default(&class, "hidden").as_ref());
        model.visible = string_list(reg.property_default(&class, "visible").as_ref());
        model.casts = string_map(reg.property_default(&class, "casts").as_ref());
        model.dates = string_list(reg.property_default(&class, "dates").as_ref());
        model.validation_rules = rule_map(reg.property_default(&class, "rules").as_ref());

        let methods = declared_methods(reg, &class);
        model.relationships =
            detect_relationships(reg, &class, &methods, &self.conventions.relation_namespace);
        model.scopes = scopes(&methods);
        model.traits = aggregate_traits(reg, &class);
        model.has_factory = reg.has_method(&class, "factory")
            || model.traits.iter().any(|t| t.name == "HasFactory");
        model.uses_uuid = reg.has_method(&class, "getUuidColumnName")
            || model
                .traits
                .iter()
                .any(|t| t.name.contains("Uuid") || t.name.contains("UUID"));

        debug!(
            model = %class,
            relationships = model.relationships.len(),
            scopes = model.scopes.len(),
            "analyzed model"
        );
        Ok(model)
    }
}

impl Analyzer for ModelAnalyzer<'_> {
    fn kind(&self) -> SubjectKind {
        SubjectKind::Model
    }

    fn analyze(&self, identifier: &str) -> Result<Descriptor, AnalyzeError> {
        self.analyze_model(identifier).map(Descriptor::Model)
    }
}

/// Relationship methods among `methods`, in declaration order.
///
/// A declared return type inside the relation namespace decides first. Without
/// one, nullary methods are probed and kept when the returned object is a
/// relation. Probe failures drop the candidate.
pub(crate) fn detect_relationships(
    registry: &dyn ClassRegistry,
    class: &str,
    methods: &[MethodInfo],
    relation_namespace: &str,
) -> Vec<Relationship> {
    let mut relationships = Vec::new();
    for method in methods {
        if NON_RELATION_METHODS.contains(&method.name.as_str()) || method.is_static {
            continue;
        }

        if let Some(declared) = method.return_type.as_deref() {
            if declared.contains(relation_namespace) {
                relationships.push(Relationship {
                    name: method.name.clone(),
                    kind: RelationKind::parse(naming::short_name(declared)),
                    related: None,
                });
                continue;
            }
        }

        if to_method(method).required_arity() > 0 {
            continue;
        }

        match registry.invoke(class, &method.name) {
            Ok(value) => {
                if let RuntimeValue::Object { class: returned, related } = value {
                    if returned.contains(relation_namespace) {
                        relationships.push(Relationship {
                            name: method.name.clone(),
                            kind: RelationKind::parse(naming::short_name(&returned)),
                            related,
                        });
                    }
                }
            }
            Err(failure) => {
                debug!(class, method = %method.name, %failure, "relationship probe failed");
            }
        }
    }
    relationships
}

fn scopes(methods: &[MethodInfo]) -> Vec<Scope> {
    methods
        .iter()
        .filter_map(|m| {
            let suffix = m.name.strip_prefix(SCOPE_PREFIX)?;
            if suffix.is_empty() {
                return None;
            }
            Some(Scope {
                name: naming::lcfirst(suffix),
                method: m.name.clone(),
                parameters: m.parameters.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::AppSnapshot;

    const APP: &str = r#"
classes:
  - name: Illuminate\Database\Eloquent\Model
    methods:
      - name: save
    properties:
      - { name: guarded, visibility: protected, default: ["*"] }
  - name: App\Models\BaseModel
    parent: Illuminate\Database\Eloquent\Model
    traits: [App\Concerns\HasUuids]
    methods:
      - name: inheritedRelation
        return_type: Illuminate\Database\Eloquent\Relations\HasMany
  - name: App\Concerns\HasUuids
  - name: Illuminate\Database\Eloquent\Factories\HasFactory
  - name: App\Models\User
    parent: App\Models\BaseModel
    traits: [Illuminate\Database\Eloquent\Factories\HasFactory]
    properties:
      - { name: fillable, visibility: protected, default: [name, email] }
      - { name: hidden, visibility: protected, default: [password] }
      - { name: casts, visibility: protected, default: { email_verified_at: datetime } }
      - { name: rules, visibility: public, is_static: true, default: { name: [required, string] } }
    methods:
      - name: posts
        return_type: Illuminate\Database\Eloquent\Relations\HasMany
      - name: team
      - name: broken
      - name: fullName
      - name: boot
        is_static: true
      - name: scopeActive
        parameters: [{ name: query }]
      - name: scopeOfType
        parameters: [{ name: query }, { name: type }]
    probes:
      team:
        class: Illuminate\Database\Eloquent\Relations\BelongsTo
        related: App\Models\Team
      broken:
        error: "Call to undefined relationship"
      fullName:
        value: "Jane Doe"
  - name: App\Models\Plain
    parent: Illuminate\Database\Eloquent\Model
    properties:
      - { name: table, visibility: protected, default: legacy_plain }
      - { name: timestamps, visibility: public, default: false }
      - { name: keyType, visibility: protected, default: string }
      - { name: incrementing, visibility: public, default: false }
  - name: App\Support\NotAModel
"#;

    fn analyze(name: &str) -> Result<ModelDescriptor, AnalyzeError> {
        let snapshot = AppSnapshot::from_yaml(APP).unwrap();
        let conventions = Conventions::default();
        ModelAnalyzer::new(&snapshot, &conventions).analyze_model(name)
    }

    #[test]
    fn test_model_fields_and_defaults() {
        let model = analyze("App\\Models\\User").unwrap();
        assert_eq!(model.subject.qualified_name, "App\\Models\\User");
        assert_eq!(model.table, "users");
        assert_eq!(model.primary_key, "id");
        assert!(model.incrementing);
        assert_eq!(model.key_type, "int");
        assert!(model.timestamps);
        assert_eq!(model.fillable, vec!["name", "email"]);
        assert_eq!(model.guarded, vec!["*"]);
        assert_eq!(model.hidden, vec!["password"]);
        assert_eq!(model.casts["email_verified_at"], "datetime");
        assert_eq!(model.validation_rules["name"], "required|string");
    }

    #[test]
    fn test_model_property_overrides() {
        let model = analyze("App\\Models\\Plain").unwrap();
        assert_eq!(model.table, "legacy_plain");
        assert!(!model.timestamps);
        assert!(!model.incrementing);
        assert_eq!(model.key_type, "string");
        assert!(!model.has_factory);
    }

    #[test]
    fn test_relationships_declared_and_probed() {
        let model = analyze("App\\Models\\User").unwrap();
        let names: Vec<_> = model.relationships.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["posts", "team"]);
        assert_eq!(model.relationships[0].kind, RelationKind::HasMany);
        assert_eq!(model.relationships[1].kind, RelationKind::BelongsTo);
        assert_eq!(model.relationships[1].related.as_deref(), Some("App\\Models\\Team"));
    }

    #[test]
    fn test_scopes_from_declared_methods() {
        let model = analyze("App\\Models\\User").unwrap();
        let names: Vec<_> = model.scopes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["active", "ofType"]);
        assert_eq!(model.scopes[1].parameters.len(), 2);
    }

    #[test]
    fn test_traits_factory_and_uuid() {
        let model = analyze("App\\Models\\User").unwrap();
        assert!(model.has_factory);
        assert!(model.uses_uuid);
        assert_eq!(model.traits.len(), 2);
    }

    #[test]
    fn test_kind_mismatch_and_not_found() {
        assert!(matches!(
            analyze("App\\Support\\NotAModel"),
            Err(AnalyzeError::KindMismatch { .. })
        ));
        assert!(matches!(
            analyze("App\\Models\\Ghost"),
            Err(AnalyzeError::NotFound { .. })
        ));
    }
}
