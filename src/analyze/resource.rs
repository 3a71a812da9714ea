use std::collections::BTreeMap;
use tracing::debug;

use super::model::detect_relationships;
use super::{
    declared_methods, discover, resolve_subject, AnalyzeError, Analyzer, Conventions, Discovery,
};
use crate::descriptor::{AssociatedModel, Descriptor, Page, ResourceDescriptor, SubjectKind};
use crate::introspect::{
    Capabilities, ClassRegistry, RuntimeValue, SchemaProvider, CAPABILITY_FILAMENT,
};
use crate::naming;

pub struct ResourceAnalyzer<'a> {
    registry: &'a dyn ClassRegistry,
    schemas: &'a dyn SchemaProvider,
    conventions: &'a Conventions,
}

impl<'a> ResourceAnalyzer<'a> {
    pub fn new(
        registry: &'a dyn ClassRegistry,
        schemas: &'a dyn SchemaProvider,
        conventions: &'a Conventions,
    ) -> Self {
        Self {
            registry,
            schemas,
            conventions,
        }
    }

    /// Resources under the configured namespace, skipping their `Pages`.
    pub fn discover(&self, capabilities: &Capabilities) -> Discovery {
        if !capabilities.has(CAPABILITY_FILAMENT) {
            return Discovery::not_installed();
        }
        let subjects = discover(
            self.registry,
            &self.conventions.filament_namespace,
            &self.conventions.filament_base,
        )
        .into_iter()
        .filter(|name| !name.split(naming::SEPARATOR).any(|segment| segment == "Pages"))
        .collect();
        Discovery {
            installed: true,
            subjects,
        }
    }

    pub fn analyze_resource(&self, identifier: &str) -> Result<ResourceDescriptor, AnalyzeError> {
        let subject = resolve_subject(
            self.registry,
            identifier,
            SubjectKind::Resource,
            &self.conventions.filament_base,
        )?;
        let class = subject.qualified_name.clone();
        let model = self.model(&class, &subject.short_name)?;

        let form_fields = self.schemas.describe_form(&class).unwrap_or_else(|failure| {
            debug!(resource = %class, %failure, "form schema unavailable");
            Vec::new()
        });
        let table_columns = self.schemas.describe_table(&class).unwrap_or_else(|failure| {
            debug!(resource = %class, %failure, "table schema unavailable");
            Vec::new()
        });

        let model_relationships = if self.registry.exists(&model.class) {
            let methods = declared_methods(self.registry, &model.class);
            detect_relationships(
                self.registry,
                &model.class,
                &methods,
                &self.conventions.relation_namespace,
            )
            .into_iter()
            .map(|r| r.name)
            .collect()
        } else {
            Vec::new()
        };

        let resource = ResourceDescriptor {
            pages: self.pages(&class),
            navigation_group: self.navigation_group(&class),
            subject,
            model,
            form_fields,
            table_columns,
            model_relationships,
        };

        debug!(
            resource = %class,
            pages = resource.pages.len(),
            fields = resource.form_fields.len(),
            "analyzed resource"
        );
        Ok(resource)
    }

    fn model(&self, class: &str, short_name: &str) -> Result<AssociatedModel, AnalyzeError> {
        let declared = self
            .static_value(class, "model", "getModel")
            .and_then(|v| v.as_str().map(naming::canonical))
            .filter(|m| !m.is_empty());

        let model = match declared {
            Some(model) => model,
            None => {
                let guessed = naming::qualify(
                    &self.conventions.model_namespace,
                    naming::before_last(short_name, "Resource"),
                );
                if !self.registry.exists(&guessed) {
                    return Err(AnalyzeError::ModelUnresolved(class.to_string()));
                }
                guessed
            }
        };

        Ok(AssociatedModel {
            short_name: naming::short_name(&model).to_string(),
            class: model,
        })
    }

    fn pages(&self, class: &str) -> BTreeMap<String, Page> {
        match self.static_value(class, "pages", "getPages") {
            Some(serde_json::Value::Object(map)) => map
                .iter()
                .filter_map(|(key, page)| {
                    let page_class = match page {
                        serde_json::Value::String(s) => s.clone(),
                        serde_json::Value::Object(route) => {
                            route.get("class")?.as_str()?.to_string()
                        }
                        _ => return None,
                    };
                    Some((key.clone(), Page::new(key, &page_class)))
                })
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    fn navigation_group(&self, class: &str) -> Option<String> {
        self.static_value(class, "navigationGroup", "getNavigationGroup")
            .and_then(|v| v.as_str().map(String::from))
    }

    /// A property default, else the scalar result of probing `getter`.
    fn static_value(&self, class: &str, property: &str, getter: &str) -> Option<serde_json::Value> {
        if let Some(value) = self.registry.property_default(class, property) {
            return Some(value);
        }
        match self.registry.invoke(class, getter) {
            Ok(RuntimeValue::Scalar(value)) if !value.is_null() => Some(value),
            Ok(_) => None,
            Err(failure) => {
                debug!(class, %failure, "resource probe failed");
                None
            }
        }
    }
}

impl Analyzer for ResourceAnalyzer<'_> {
    fn kind(&self) -> SubjectKind {
        SubjectKind::Resource
    }

    fn analyze(&self, identifier: &str) -> Result<Descriptor, AnalyzeError> {
        self.analyze_resource(identifier).map(Descriptor::Resource)
    }
}
