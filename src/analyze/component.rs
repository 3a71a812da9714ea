use regex::Regex;
use tracing::debug;

use super::{
    declared_methods, declared_properties, discover, resolve_subject, rule_map, scalar_string,
    string_list, string_map, to_method, AnalyzeError, Analyzer, Conventions, Discovery,
};
use crate::descriptor::{
    ComponentDescriptor, Descriptor, EmittedEvent, Listener, Property, SubjectKind,
};
use crate::introspect::{Capabilities, ClassRegistry, MethodInfo, RuntimeValue, CAPABILITY_LIVEWIRE};
use crate::naming;

lazy_static::lazy_static! {
    static ref EMIT_CALL: Regex =
        Regex::new(r#"\$this->(?:emit|dispatch)\(\s*['"]([^'"]+)['"]"#).unwrap();
}

/// Finds events a method emits.
///
/// Detection is textual. Implementations may miss emissions built at runtime
/// and may report calls that sit inside comments or strings.
pub trait EmissionDetector {
    fn detect(&self, method: &MethodInfo) -> Vec<String>;
}

/// Matches `$this->emit('event')` and `$this->dispatch('event')` in the
/// method body.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexEmissionDetector;

impl EmissionDetector for RegexEmissionDetector {
    fn detect(&self, method: &MethodInfo) -> Vec<String> {
        let Some(source) = method.source.as_deref() else {
            return Vec::new();
        };
        EMIT_CALL
            .captures_iter(source)
            .map(|caps| caps[1].to_string())
            .collect()
    }
}

pub struct ComponentAnalyzer<'a> {
    registry: &'a dyn ClassRegistry,
    conventions: &'a Conventions,
    detector: Box<dyn EmissionDetector + 'a>,
}

impl<'a> ComponentAnalyzer<'a> {
    pub fn new(registry: &'a dyn ClassRegistry, conventions: &'a Conventions) -> Self {
        Self {
            registry,
            conventions,
            detector: Box::new(RegexEmissionDetector),
        }
    }

    pub fn with_detector(mut self, detector: impl EmissionDetector + 'a) -> Self {
        self.detector = Box::new(detector);
        self
    }

    /// Components under the configured namespace.
    pub fn discover(&self, capabilities: &Capabilities) -> Discovery {
        if !capabilities.has(CAPABILITY_LIVEWIRE) {
            return Discovery::not_installed();
        }
        Discovery {
            installed: true,
            subjects: discover(
                self.registry,
                &self.conventions.livewire_namespace,
                &self.conventions.livewire_base,
            ),
        }
    }

    pub fn analyze_component(&self, identifier: &str) -> Result<ComponentDescriptor, AnalyzeError> {
        let subject = resolve_subject(
            self.registry,
            identifier,
            SubjectKind::Component,
            &self.conventions.livewire_base,
        )?;
        let class = subject.qualified_name.clone();
        let reg = self.registry;

        let declared = declared_methods(reg, &class);
        let methods = declared
            .iter()
            .filter(|m| !m.name.starts_with("__"))
            .map(to_method)
            .collect();

        let mut events = Vec::new();
        for method in &declared {
            for event in self.detector.detect(method) {
                if !events.iter().any(|e: &EmittedEvent| e.event == event) {
                    events.push(EmittedEvent {
                        event,
                        method: method.name.clone(),
                    });
                }
            }
        }

        let properties = declared_properties(reg, &class)
            .into_iter()
            .filter(|p| !p.is_static)
            .map(|p| Property {
                name: p.name,
                type_name: p.type_name,
                doc: p.doc,
                default: p.default,
            })
            .collect();

        let component = ComponentDescriptor {
            component_name: self.component_name(&class, &subject.short_name),
            listeners: self.listeners(&class),
            validation_rules: rule_map(reg.property_default(&class, "rules").as_ref()),
            validation_attributes: string_map(
                reg.property_default(&class, "validationAttributes").as_ref(),
            ),
            query_string: query_string(reg.property_default(&class, "queryString").as_ref()),
            subject,
            properties,
            methods,
            events,
        };

        debug!(
            component = %class,
            events = component.events.len(),
            listeners = component.listeners.len(),
            "analyzed component"
        );
        Ok(component)
    }

    /// A `getName` probe wins over the kebab-cased short name.
    fn component_name(&self, class: &str, short_name: &str) -> String {
        if self.registry.has_method(class, "getName") {
            if let Ok(RuntimeValue::Scalar(serde_json::Value::String(name))) =
                self.registry.invoke(class, "getName")
            {
                return name;
            }
        }
        naming::kebab(short_name)
    }

    /// `$listeners` property, else the result of probing `getListeners`.
    fn listeners(&self, class: &str) -> Vec<Listener> {
        let value = self
            .registry
            .property_default(class, "listeners")
            .or_else(|| match self.registry.invoke(class, "getListeners") {
                Ok(RuntimeValue::Scalar(value)) => Some(value),
                Ok(_) => None,
                Err(failure) => {
                    debug!(class, %failure, "listener probe failed");
                    None
                }
            });

        match value {
            Some(serde_json::Value::Object(map)) => map
                .iter()
                .filter_map(|(event, handler)| {
                    scalar_string(handler).map(|handler| Listener {
                        event: event.clone(),
                        handler,
                    })
                })
                .collect(),
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(scalar_string)
                .map(|event| Listener {
                    handler: event.clone(),
                    event,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Query-string bound properties: `['search', 'page' => ['except' => 1]]`.
fn query_string(value: Option<&serde_json::Value>) -> Vec<String> {
    match value {
        Some(serde_json::Value::Object(map)) => map.keys().cloned().collect(),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .flat_map(|item| match item {
                serde_json::Value::Object(map) => map.keys().cloned().collect::<Vec<_>>(),
                other => scalar_string(other).into_iter().collect::<Vec<_>>(),
            })
            .collect(),
        other => string_list(other),
    }
}

impl Analyzer for ComponentAnalyzer<'_> {
    fn kind(&self) -> SubjectKind {
        SubjectKind::Component
    }

    fn analyze(&self, identifier: &str) -> Result<Descriptor, AnalyzeError> {
        self.analyze_component(identifier).map(Descriptor::Component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::AppSnapshot;

    const APP: &str = r#"
capabilities: [livewire]
classes:
  - name: Livewire\Component
    methods:
      - name: render
      - name: __call
  - name: App\Livewire\UserProfile
    parent: Livewire\Component
    properties:
      - { name: name, type_name: string, default: "" }
      - { name: count, type_name: int, default: 0 }
      - { name: cache, is_static: true }
      - { name: secret, visibility: protected }
      - { name: rules, visibility: protected, default: { name: "required|min:3" } }
      - { name: validationAttributes, visibility: protected, default: { name: full name } }
      - { name: queryString, visibility: protected, default: [search, { page: { except: 1 } }] }
      - { name: listeners, visibility: protected, default: { userSaved: refresh, reset: reset } }
    methods:
      - name: save
        source: |
          $this->validate();
          $this->emit('saved');
          $this->dispatch("notify", message: 'ok');
      - name: refresh
      - name: __get
  - name: App\Livewire\Admin\Counter
    parent: Livewire\Component
    methods:
      - name: increment
        source: "$this->emit('saved'); $this->emit('saved');"
  - name: App\Other\Widget
    parent: Livewire\Component
"#;

    fn snapshot() -> AppSnapshot {
        AppSnapshot::from_yaml(APP).unwrap()
    }

    #[test]
    fn test_component_members() {
        let snap = snapshot();
        let conventions = Conventions::default();
        let component = ComponentAnalyzer::new(&snap, &conventions)
            .analyze_component("App\\Livewire\\UserProfile")
            .unwrap();

        assert_eq!(component.component_name, "user-profile");
        let props: Vec<_> = component.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(props, vec!["name", "count"]);
        let methods: Vec<_> = component.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(methods, vec!["save", "refresh"]);
        assert_eq!(component.validation_rules["name"], "required|min:3");
        assert_eq!(component.validation_attributes["name"], "full name");
        assert_eq!(component.query_string, vec!["search", "page"]);
        assert_eq!(component.listeners.len(), 2);
    }

    #[test]
    fn test_regex_detector_finds_emit_and_dispatch() {
        let snap = snapshot();
        let conventions = Conventions::default();
        let component = ComponentAnalyzer::new(&snap, &conventions)
            .analyze_component("App\\Livewire\\UserProfile")
            .unwrap();
        let events: Vec<_> = component.events.iter().map(|e| e.event.as_str()).collect();
        assert_eq!(events, vec!["saved", "notify"]);
        assert!(component.events.iter().all(|e| e.method == "save"));
    }

    #[test]
    fn test_events_are_unique() {
        let snap = snapshot();
        let conventions = Conventions::default();
        let component = ComponentAnalyzer::new(&snap, &conventions)
            .analyze_component("App\\Livewire\\Admin\\Counter")
            .unwrap();
        assert_eq!(component.events.len(), 1);
    }

    struct NoEvents;

    impl EmissionDetector for NoEvents {
        fn detect(&self, _method: &MethodInfo) -> Vec<String> {
            Vec::new()
        }
    }

    #[test]
    fn test_detector_is_pluggable() {
        let snap = snapshot();
        let conventions = Conventions::default();
        let component = ComponentAnalyzer::new(&snap, &conventions)
            .with_detector(NoEvents)
            .analyze_component("App\\Livewire\\UserProfile")
            .unwrap();
        assert!(component.events.is_empty());
    }

    #[test]
    fn test_discovery_respects_capability() {
        let snap = snapshot();
        let conventions = Conventions::default();
        let analyzer = ComponentAnalyzer::new(&snap, &conventions);

        let found = analyzer.discover(&Capabilities::resolve(&snap));
        assert!(found.installed);
        assert_eq!(
            found.subjects,
            vec!["App\\Livewire\\Admin\\Counter", "App\\Livewire\\UserProfile"]
        );

        let missing = analyzer.discover(&Capabilities::default());
        assert!(!missing.installed);
        assert!(missing.subjects.is_empty());
    }
}
