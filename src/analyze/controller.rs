use tracing::debug;

use super::{
    aggregate_traits, declared_methods, discover, resolve_subject, string_list, to_method,
    AnalyzeError, Analyzer, Conventions,
};
use crate::descriptor::{
    AssociatedModel, ControllerDescriptor, Descriptor, Route, SubjectKind, TraitRef,
    RESOURCEFUL_THRESHOLD, REST_ACTIONS,
};
use crate::introspect::{ClassRegistry, RouteTable};
use crate::naming;

pub struct ControllerAnalyzer<'a> {
    registry: &'a dyn ClassRegistry,
    routes: &'a dyn RouteTable,
    conventions: &'a Conventions,
}

impl<'a> ControllerAnalyzer<'a> {
    pub fn new(
        registry: &'a dyn ClassRegistry,
        routes: &'a dyn RouteTable,
        conventions: &'a Conventions,
    ) -> Self {
        Self {
            registry,
            routes,
            conventions,
        }
    }

    /// Controllers under the configured namespace.
    pub fn discover(&self) -> Vec<String> {
        discover(
            self.registry,
            &self.conventions.controller_namespace,
            &self.conventions.controller_base,
        )
    }

    pub fn analyze_controller(&self, identifier: &str) -> Result<ControllerDescriptor, AnalyzeError> {
        let subject = resolve_subject(
            self.registry,
            identifier,
            SubjectKind::Controller,
            &self.conventions.controller_base,
        )?;
        let class = subject.qualified_name.clone();

        let methods: Vec<_> = declared_methods(self.registry, &class)
            .iter()
            .filter(|m| m.name != "__construct")
            .map(to_method)
            .collect();
        let traits = aggregate_traits(self.registry, &class);

        let public: Vec<String> = self
            .registry
            .public_methods(&class)
            .into_iter()
            .map(|m| m.name)
            .collect();
        let rest_count = REST_ACTIONS
            .iter()
            .filter(|action| public.iter().any(|m| m == *action))
            .count();

        let controller = ControllerDescriptor {
            routes: self.routes_for(&class),
            model: self.associated_model(&class, &subject.short_name),
            is_api: self.is_api(&class, &traits),
            is_resourceful: rest_count >= RESOURCEFUL_THRESHOLD,
            middleware: string_list(self.registry.property_default(&class, "middleware").as_ref()),
            subject,
            methods,
            traits,
        };

        debug!(
            controller = %class,
            routes = controller.routes.len(),
            api = controller.is_api,
            "analyzed controller"
        );
        Ok(controller)
    }

    /// Routes whose action is `Class@method`, or the bare class for an
    /// invokable controller.
    fn routes_for(&self, class: &str) -> Vec<Route> {
        self.routes
            .routes()
            .into_iter()
            .filter_map(|route| {
                let action = naming::canonical(&route.action);
                let method = match action.strip_prefix(class)? {
                    "" => "__invoke".to_string(),
                    rest => rest.strip_prefix('@')?.to_string(),
                };
                Some(Route {
                    uri: route.uri,
                    methods: route.methods,
                    name: route.name,
                    action: method,
                    middleware: route.middleware,
                })
            })
            .collect()
    }

    fn associated_model(&self, class: &str, short_name: &str) -> Option<AssociatedModel> {
        let declared = self
            .registry
            .property_default(class, "model")
            .and_then(|v| v.as_str().map(naming::canonical))
            .filter(|m| !m.is_empty());
        if let Some(model) = declared {
            return Some(AssociatedModel {
                short_name: naming::short_name(&model).to_string(),
                class: model,
            });
        }

        let guessed = naming::singular(&short_name.replace("Controller", ""));
        if guessed.is_empty() {
            return None;
        }
        let model = naming::qualify(&self.conventions.model_namespace, &guessed);
        if self.registry.exists(&model) {
            Some(AssociatedModel {
                class: model,
                short_name: guessed,
            })
        } else {
            None
        }
    }

    fn is_api(&self, class: &str, traits: &[TraitRef]) -> bool {
        if let Some(flag) = self.registry.property_default(class, "isAPI") {
            return match flag {
                serde_json::Value::Bool(b) => b,
                serde_json::Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
                serde_json::Value::String(s) => !s.is_empty() && s != "0",
                serde_json::Value::Null => false,
                _ => true,
            };
        }
        class.contains("Api")
            || traits
                .iter()
                .any(|t| t.class.contains("Api") || t.class.contains("API"))
    }
}

impl Analyzer for ControllerAnalyzer<'_> {
    fn kind(&self) -> SubjectKind {
        SubjectKind::Controller
    }

    fn analyze(&self, identifier: &str) -> Result<Descriptor, AnalyzeError> {
        self.analyze_controller(identifier).map(Descriptor::Controller)
    }
}
