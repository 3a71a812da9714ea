//! Reactive component test generation.

use super::{
    php_literal, php_string, render_stub, FileOutcome, GenerateError, Generator, OutputWriter,
    CHAIN_INDENT,
};
use crate::descriptor::{ComponentDescriptor, Descriptor, SubjectKind};
use crate::render::{join_fragments, Substitutions};
use crate::stub::{StubKind, StubSet};

/// Framework hooks that are never invoked directly.
const LIFECYCLE: [&str; 8] = [
    "mount", "boot", "booted", "hydrate", "dehydrate", "render", "rendering", "rendered",
];

/// Actions tried, in order, to trigger validation.
const SUBMIT_ACTIONS: [&str; 5] = ["save", "submit", "store", "create", "update"];

const QUERY_VALUE: &str = "test";

fn is_lifecycle(name: &str) -> bool {
    LIFECYCLE.contains(&name)
        || name.starts_with("updated")
        || name.starts_with("updating")
        || name.starts_with("hydrate")
        || name.starts_with("dehydrate")
}

pub struct ComponentGenerator<'a> {
    stubs: &'a StubSet,
}

impl<'a> ComponentGenerator<'a> {
    pub fn new(stubs: &'a StubSet) -> Self {
        Self { stubs }
    }

    pub fn generate_component(
        &self,
        component: &ComponentDescriptor,
        out: &mut OutputWriter<'_>,
    ) -> Vec<FileOutcome> {
        let path = out.test_path(&["Feature", "Livewire"], &component.subject.short_name);
        vec![out.write(path, || {
            render_stub(self.stubs, StubKind::Livewire, &substitutions(component))
        })]
    }
}

impl Generator for ComponentGenerator<'_> {
    fn kind(&self) -> SubjectKind {
        SubjectKind::Component
    }

    fn generate(
        &self,
        descriptor: &Descriptor,
        out: &mut OutputWriter<'_>,
    ) -> Result<Vec<FileOutcome>, GenerateError> {
        match descriptor {
            Descriptor::Component(component) => Ok(self.generate_component(component, out)),
            other => Err(GenerateError::WrongDescriptor {
                expected: self.kind(),
                found: other.kind(),
            }),
        }
    }
}

/// A `test(...)` block driving the component through `chain`.
fn livewire_test(title: &str, start: &str, chain: &[String]) -> String {
    let mut body = format!("    {}", start);
    for call in chain {
        body.push_str(CHAIN_INDENT);
        body.push_str(call);
    }
    format!(
        "test({}, function () {{\n{};\n}});",
        php_string(title),
        body
    )
}

fn substitutions(component: &ComponentDescriptor) -> Substitutions {
    let class = component.subject.short_name.as_str();
    let start = format!("Livewire::test({}::class)", class);

    let defaults: Vec<_> = component
        .properties
        .iter()
        .filter_map(|p| p.default.as_ref().map(|d| (p, d)))
        .collect();
    let property_assertions = if defaults.is_empty() {
        "->assertOk()".to_string()
    } else {
        join_fragments(defaults, CHAIN_INDENT, |(p, default)| {
            format!("->assertSet({}, {})", php_string(&p.name), php_literal(default))
        })
    };

    let callable = component
        .nullary_methods()
        .filter(|m| !is_lifecycle(&m.name) && !m.name.starts_with("__"));
    let method_tests = join_fragments(callable, "\n\n", |m| {
        livewire_test(
            &format!("{} can call {}", class, m.name),
            &start,
            &[
                format!("->call({})", php_string(&m.name)),
                "->assertOk()".to_string(),
            ],
        )
    });

    let event_tests = join_fragments(&component.events, "\n\n", |e| {
        livewire_test(
            &format!("{} dispatches {} from {}", class, e.event, e.method),
            &start,
            &[
                format!("->call({})", php_string(&e.method)),
                format!("->assertDispatched({})", php_string(&e.event)),
            ],
        )
    });

    let listener_tests = join_fragments(&component.listeners, "\n\n", |l| {
        livewire_test(
            &format!("{} handles {} with {}", class, l.event, l.handler),
            &start,
            &[
                format!("->dispatch({})", php_string(&l.event)),
                "->assertOk()".to_string(),
            ],
        )
    });

    let query_string_tests = join_fragments(&component.query_string, "\n\n", |name| {
        livewire_test(
            &format!("{} reads {} from the query string", class, name),
            &format!(
                "Livewire::withQueryParams([{} => {}])",
                php_string(name),
                php_string(QUERY_VALUE)
            ),
            &[
                format!("->test({}::class)", class),
                format!("->assertSet({}, {})", php_string(name), php_string(QUERY_VALUE)),
            ],
        )
    });

    Substitutions::new()
        .with("componentNamespace", component.subject.namespace.as_str())
        .with("componentClass", class)
        .with("componentName", component.component_name.as_str())
        .with("propertyAssertions", property_assertions)
        .with("methodTests", method_tests)
        .with("eventTests", event_tests)
        .with("listenerTests", listener_tests)
        .with("validationTests", validation_tests(component, &start))
        .with("queryStringTests", query_string_tests)
}

/// One test per `required` field, submitted empty through the first submit
/// action the component declares. Nothing is generated without one.
fn validation_tests(component: &ComponentDescriptor, start: &str) -> String {
    let class = component.subject.short_name.as_str();
    let Some(action) = SUBMIT_ACTIONS
        .iter()
        .find(|a| component.methods.iter().any(|m| m.name == **a))
    else {
        return String::new();
    };

    let required = component
        .validation_rules
        .iter()
        .filter(|(_, rules)| rules.split('|').any(|r| r.trim() == "required"));
    join_fragments(required, "\n\n", |(field, _)| {
        let label = component
            .validation_attributes
            .get(field)
            .map(String::as_str)
            .unwrap_or(field.as_str());
        livewire_test(
            &format!("{} requires {}", class, label),
            start,
            &[
                format!("->set({}, null)", php_string(field)),
                format!("->call({})", php_string(action)),
                format!("->assertHasErrors([{} => 'required'])", php_string(field)),
            ],
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{EmittedEvent, Listener, Method, Property, SubjectName};
    use serde_json::json;

    fn method(name: &str) -> Method {
        Method {
            name: name.to_string(),
            parameters: vec![],
            return_type: None,
            doc: None,
        }
    }

    fn profile() -> ComponentDescriptor {
        ComponentDescriptor {
            subject: SubjectName::parse("App\\Livewire\\UserProfile"),
            component_name: "user-profile".to_string(),
            properties: vec![
                Property {
                    name: "name".to_string(),
                    type_name: Some("string".to_string()),
                    doc: None,
                    default: Some(json!("")),
                },
                Property {
                    name: "search".to_string(),
                    type_name: None,
                    doc: None,
                    default: None,
                },
            ],
            methods: vec![method("mount"), method("save"), method("updatedName")],
            events: vec![EmittedEvent {
                event: "profile-saved".to_string(),
                method: "save".to_string(),
            }],
            listeners: vec![Listener {
                event: "refresh".to_string(),
                handler: "reload".to_string(),
            }],
            validation_rules: [
                ("name".to_string(), "required|min:3".to_string()),
                ("bio".to_string(), "nullable".to_string()),
            ]
            .into_iter()
            .collect(),
            validation_attributes: [("name".to_string(), "full name".to_string())]
                .into_iter()
                .collect(),
            query_string: vec!["search".to_string()],
        }
    }

    #[test]
    fn test_component_file() {
        let dir = tempfile::tempdir().unwrap();
        let stubs = StubSet::builtin();
        let mut out = OutputWriter::new(dir.path());

        let outcomes = ComponentGenerator::new(&stubs).generate_component(&profile(), &mut out);
        assert_eq!(outcomes.len(), 1);

        let text =
            std::fs::read_to_string(dir.path().join("Feature/Livewire/UserProfileTest.php")).unwrap();
        assert!(text.contains("use App\\Livewire\\UserProfile;"));
        assert!(text.contains("Livewire::test('user-profile')"));
        assert!(text.contains("Livewire::test(UserProfile::class)\n        ->assertSet('name', '');"));
        assert!(text.contains("test('UserProfile can call save'"));
        assert!(!text.contains("can call mount"));
        assert!(!text.contains("can call updatedName"));
        assert!(text.contains("->assertDispatched('profile-saved');"));
        assert!(text.contains("->dispatch('refresh')"));
        assert!(text.contains("test('UserProfile requires full name'"));
        assert!(text.contains("->assertHasErrors(['name' => 'required']);"));
        assert!(!text.contains("requires bio"));
        assert!(text.contains("Livewire::withQueryParams(['search' => 'test'])"));
        assert!(!text.contains("{{"));
    }

    #[test]
    fn test_component_without_defaults_or_submit_action() {
        let mut component = profile();
        component.properties.clear();
        component.methods = vec![method("render")];

        let subs = substitutions(&component);
        assert_eq!(subs.get("propertyAssertions"), Some("->assertOk()"));
        assert_eq!(subs.get("methodTests"), Some(""));
        assert_eq!(subs.get("validationTests"), Some(""));
    }

    #[test]
    fn test_lifecycle_hooks() {
        assert!(is_lifecycle("mount"));
        assert!(is_lifecycle("updatingSearch"));
        assert!(!is_lifecycle("update"));
    }
}
