//! Model test generation.
//!
//! Writes `Unit/Models/<Short>Test` and, when the model has them, the
//! relationships, scopes and validation siblings. Each sibling is checked
//! against the overwrite policy on its own.

use super::{
    class_ref, php_list, php_string, render_stub, FileOutcome, GenerateError, Generator,
    OutputWriter, Settings, BODY_INDENT,
};
use crate::descriptor::{
    Descriptor, ModelDescriptor, Relationship, Scope, SubjectKind, SubjectName, TableDescriptor,
};
use crate::naming;
use crate::render::{join_fragments, Substitutions};
use crate::stub::{StubKind, StubSet};

const MODEL_DIRS: [&str; 2] = ["Unit", "Models"];

/// Separates whole `test(...)` blocks.
const TEST_SEPARATOR: &str = "\n\n";

pub struct ModelGenerator<'a> {
    stubs: &'a StubSet,
    settings: &'a Settings,
}

impl<'a> ModelGenerator<'a> {
    pub fn new(stubs: &'a StubSet, settings: &'a Settings) -> Self {
        Self { stubs, settings }
    }

    pub fn generate_model(
        &self,
        model: &ModelDescriptor,
        out: &mut OutputWriter<'_>,
    ) -> Vec<FileOutcome> {
        let short = &model.subject.short_name;
        let mut outcomes = Vec::new();

        let path = out.test_path(&MODEL_DIRS, short);
        outcomes.push(out.write(path, || {
            render_stub(self.stubs, StubKind::Model, &self.model_substitutions(model))
        }));

        if !model.relationships.is_empty() {
            let path = out.test_path(&MODEL_DIRS, &format!("{}Relationships", short));
            outcomes.push(out.write(path, || {
                render_stub(
                    self.stubs,
                    StubKind::ModelRelationships,
                    &self.relationship_substitutions(model),
                )
            }));
        }

        if !model.scopes.is_empty() {
            let path = out.test_path(&MODEL_DIRS, &format!("{}Scopes", short));
            outcomes.push(out.write(path, || {
                render_stub(self.stubs, StubKind::ModelScopes, &scope_substitutions(model))
            }));
        }

        if !model.validation_rules.is_empty() {
            let path = out.test_path(&MODEL_DIRS, &format!("{}Validation", short));
            outcomes.push(out.write(path, || {
                render_stub(
                    self.stubs,
                    StubKind::ModelValidation,
                    &validation_substitutions(model),
                )
            }));
        }

        outcomes
    }

    /// Generate model tests for the model a table is expected to back.
    pub fn generate_from_table(
        &self,
        table: &TableDescriptor,
        out: &mut OutputWriter<'_>,
    ) -> Vec<FileOutcome> {
        let model = self.model_for_table(table);
        self.generate_model(&model, out)
    }

    fn model_for_table(&self, table: &TableDescriptor) -> ModelDescriptor {
        let class = naming::qualify(&self.settings.model_namespace, &table.model_name);
        let mut model = ModelDescriptor::with_defaults(SubjectName::parse(&class));

        model.table = table.table.clone();
        model.fillable = table.column_names();
        model.timestamps = table.has_timestamps;
        if let Some(pk) = &table.primary_key {
            model.primary_key = pk.clone();
        }
        if let Some(column) = table.column(&model.primary_key) {
            model.incrementing = column.auto_increment;
            let ty = column.type_name.as_str();
            if ty.contains("char") || ty.contains("uuid") || ty == "text" {
                model.key_type = "string".to_string();
            }
        }
        model
    }

    fn model_substitutions(&self, model: &ModelDescriptor) -> Substitutions {
        let class = &model.subject.short_name;

        let incrementing_check = if model.incrementing {
            "expect($this->model->getIncrementing())->toBeTrue();"
        } else {
            "expect($this->model->getIncrementing())->toBeFalse();"
        };
        let timestamps_check = if model.timestamps {
            "expect($this->model->usesTimestamps())->toBeTrue();"
        } else {
            "expect($this->model->usesTimestamps())->toBeFalse();"
        };

        let cast_assertions = if model.casts.is_empty() {
            "expect($this->model->getCasts())->toBeArray();".to_string()
        } else {
            join_fragments(&model.casts, BODY_INDENT, |(field, cast)| {
                format!(
                    "expect($this->model->getCasts())->toHaveKey({}, {});",
                    php_string(field),
                    php_string(cast)
                )
            })
        };

        let trait_tests = join_fragments(&model.traits, TEST_SEPARATOR, |t| {
            format!(
                "test('{} uses the {} trait', function () {{\n    expect(class_uses_recursive($this->model))->toHaveKey({}::class);\n}});",
                class,
                t.name,
                class_ref(&t.class)
            )
        });

        Substitutions::new()
            .with("modelNamespace", model.subject.namespace.as_str())
            .with("modelClass", class.as_str())
            .with("factorySetup", factory_setup(model))
            .with("tableName", model.table.as_str())
            .with("primaryKey", model.primary_key.as_str())
            .with("keyType", model.key_type.as_str())
            .with("incrementingCheck", incrementing_check)
            .with("timestampsCheck", timestamps_check)
            .with("fillable", php_list(&model.fillable))
            .with("hidden", php_list(&model.hidden))
            .with("castAssertions", cast_assertions)
            .with("traitTests", trait_tests)
    }

    fn relationship_substitutions(&self, model: &ModelDescriptor) -> Substitutions {
        let checks = join_fragments(&model.relationships, BODY_INDENT, |r| {
            format!(
                "expect(method_exists($this->model, {}))->toBeTrue();",
                php_string(&r.name)
            )
        });
        let tests = join_fragments(&model.relationships, TEST_SEPARATOR, |r| {
            self.relationship_test(&model.subject.short_name, r)
        });

        Substitutions::new()
            .with("modelNamespace", model.subject.namespace.as_str())
            .with("modelClass", model.subject.short_name.as_str())
            .with("factorySetup", factory_setup(model))
            .with("relationshipMethodChecks", checks)
            .with("individualRelationshipTests", tests)
    }

    fn relationship_test(&self, class: &str, relationship: &Relationship) -> String {
        let kind = relationship.kind.as_str();
        let relation_class = class_ref(&naming::qualify(&self.settings.relation_namespace, kind));
        let name = &relationship.name;

        let mut body = format!(
            "    expect(method_exists($this->model, '{name}'))\n        ->toBeTrue();\n\n    $relationship = $this->model->{name}();\n    expect($relationship)\n        ->toBeInstanceOf({relation_class}::class);",
        );

        let title = match &relationship.related {
            Some(related) => {
                body.push_str(&format!(
                    "\n\n    expect($relationship->getRelated())\n        ->toBeInstanceOf({}::class);",
                    class_ref(related)
                ));
                format!(
                    "{} has {} relationship with {}",
                    class,
                    kind,
                    naming::short_name(related)
                )
            }
            None => format!("{} has {} relationship named {}", class, kind, name),
        };

        format!("test('{}', function () {{\n{}\n}});", title, body)
    }
}

impl Generator for ModelGenerator<'_> {
    fn kind(&self) -> SubjectKind {
        SubjectKind::Model
    }

    fn generate(
        &self,
        descriptor: &Descriptor,
        out: &mut OutputWriter<'_>,
    ) -> Result<Vec<FileOutcome>, GenerateError> {
        match descriptor {
            Descriptor::Model(model) => Ok(self.generate_model(model, out)),
            Descriptor::Table(table) => Ok(self.generate_from_table(table, out)),
            other => Err(GenerateError::WrongDescriptor {
                expected: self.kind(),
                found: other.kind(),
            }),
        }
    }
}

fn factory_setup(model: &ModelDescriptor) -> String {
    let create = format!(
        "$this->factoryModel = {}::factory()->create();",
        model.subject.short_name
    );
    if model.has_factory {
        create
    } else {
        format!(
            "try {{\n        {}\n    }} catch (\\Throwable $e) {{\n        // no factory for this model\n    }}",
            create
        )
    }
}

fn scope_test(class: &str, scope: &Scope) -> String {
    format!(
        "test('{class} has {name} scope', function () {{\n    expect(method_exists($this->model, '{method}'))\n        ->toBeTrue();\n\n    $query = {class}::query();\n    expect(method_exists($query, '{name}'))\n        ->toBeTrue();\n}});",
        class = class,
        name = scope.name,
        method = scope.method,
    )
}

fn scope_substitutions(model: &ModelDescriptor) -> Substitutions {
    let class = &model.subject.short_name;
    Substitutions::new()
        .with("modelNamespace", model.subject.namespace.as_str())
        .with("modelClass", class.as_str())
        .with(
            "scopeTests",
            join_fragments(&model.scopes, TEST_SEPARATOR, |s| scope_test(class, s)),
        )
}

fn validation_substitutions(model: &ModelDescriptor) -> Substitutions {
    let class = &model.subject.short_name;

    let entries = join_fragments(&model.validation_rules, "", |(field, rules)| {
        format!("\n        {} => {},", php_string(field), php_string(rules))
    });
    let rules = format!("[{}\n    ]", entries);

    let tests = join_fragments(&model.validation_rules, TEST_SEPARATOR, |(field, rules)| {
        format!(
            "test('{class} validates {field}', function () {{\n    $rules = $this->model->getValidationRules();\n    expect($rules)\n        ->toHaveKey({key});\n\n    expect($rules[{key}])\n        ->toBe({rules});\n}});",
            class = class,
            field = field,
            key = php_string(field),
            rules = php_string(rules),
        )
    });

    Substitutions::new()
        .with("modelNamespace", model.subject.namespace.as_str())
        .with("modelClass", class.as_str())
        .with("validationRules", rules)
        .with("validationTests", tests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Column, RelationKind, TraitRef};
    use crate::generate::OutcomeStatus;

    fn user() -> ModelDescriptor {
        let mut model = ModelDescriptor::with_defaults(SubjectName::parse("App\\Models\\User"));
        model.fillable = vec!["name".to_string(), "email".to_string()];
        model.hidden = vec!["password".to_string()];
        model.relationships.push(Relationship {
            name: "posts".to_string(),
            kind: RelationKind::HasMany,
            related: Some("App\\Models\\Post".to_string()),
        });
        model.scopes.push(Scope {
            name: "active".to_string(),
            method: "scopeActive".to_string(),
            parameters: vec![],
        });
        model
    }

    fn read(path: &std::path::Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_model_with_relationship_and_scope_writes_three_files() {
        let dir = tempfile::tempdir().unwrap();
        let stubs = StubSet::builtin();
        let settings = Settings::default();
        let mut out = OutputWriter::new(dir.path());

        let outcomes = ModelGenerator::new(&stubs, &settings).generate_model(&user(), &mut out);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| o.status == OutcomeStatus::Created));

        let models = dir.path().join("Unit/Models");
        let main = read(&models.join("UserTest.php"));
        assert!(main.contains("use App\\Models\\User;"));
        assert!(main.contains("toBe(['name', 'email'])"));
        assert!(main.contains("toBe(['password'])"));
        assert!(main.contains("getTable())->toBe('users')"));
        assert!(main.contains("catch (\\Throwable $e)"));
        assert!(!main.contains("{{"));

        let relationships = read(&models.join("UserRelationshipsTest.php"));
        assert!(relationships.contains("method_exists($this->model, 'posts')"));
        assert!(relationships
            .contains("toBeInstanceOf(\\Illuminate\\Database\\Eloquent\\Relations\\HasMany::class)"));
        assert!(relationships.contains("User has HasMany relationship with Post"));

        let scopes = read(&models.join("UserScopesTest.php"));
        assert!(scopes.contains("'scopeActive'"));
        assert!(scopes.contains("method_exists($query, 'active')"));

        assert!(!models.join("UserValidationTest.php").exists());
    }

    #[test]
    fn test_validation_file_lists_rules() {
        let dir = tempfile::tempdir().unwrap();
        let stubs = StubSet::builtin();
        let settings = Settings::default();
        let mut model = ModelDescriptor::with_defaults(SubjectName::parse("App\\Models\\Post"));
        model.has_factory = true;
        model
            .validation_rules
            .insert("title".to_string(), "required|max:255".to_string());

        let mut out = OutputWriter::new(dir.path());
        let outcomes = ModelGenerator::new(&stubs, &settings).generate_model(&model, &mut out);
        assert_eq!(outcomes.len(), 2);

        let main = read(&dir.path().join("Unit/Models/PostTest.php"));
        assert!(main.contains("$this->factoryModel = Post::factory()->create();"));
        assert!(!main.contains("catch"));

        let validation = read(&dir.path().join("Unit/Models/PostValidationTest.php"));
        assert!(validation.contains("$expected = [\n        'title' => 'required|max:255',\n    ];"));
        assert!(validation.contains("Post validates title"));
    }

    #[test]
    fn test_relationship_without_related_model() {
        let stubs = StubSet::builtin();
        let settings = Settings::default();
        let generator = ModelGenerator::new(&stubs, &settings);
        let test = generator.relationship_test(
            "Comment",
            &Relationship {
                name: "commentable".to_string(),
                kind: RelationKind::MorphTo,
                related: None,
            },
        );
        assert!(test.starts_with("test('Comment has MorphTo relationship named commentable'"));
        assert!(!test.contains("getRelated"));
    }

    #[test]
    fn test_trait_and_cast_fragments() {
        let stubs = StubSet::builtin();
        let settings = Settings::default();
        let mut model = user();
        model
            .casts
            .insert("email_verified_at".to_string(), "datetime".to_string());
        model
            .traits
            .push(TraitRef::new("Illuminate\\Database\\Eloquent\\SoftDeletes"));

        let subs = ModelGenerator::new(&stubs, &settings).model_substitutions(&model);
        assert_eq!(
            subs.get("castAssertions"),
            Some("expect($this->model->getCasts())->toHaveKey('email_verified_at', 'datetime');")
        );
        assert!(subs
            .get("traitTests")
            .unwrap()
            .contains("toHaveKey(\\Illuminate\\Database\\Eloquent\\SoftDeletes::class)"));
    }

    #[test]
    fn test_model_from_table() {
        let dir = tempfile::tempdir().unwrap();
        let stubs = StubSet::builtin();
        let settings = Settings::default();
        let column = |name: &str, ty: &str, auto: bool| Column {
            name: name.to_string(),
            type_name: ty.to_string(),
            nullable: false,
            default: None,
            auto_increment: auto,
            unsigned: false,
            length: None,
        };
        let table = TableDescriptor {
            subject: SubjectName::parse("order_items"),
            table: "order_items".to_string(),
            model_name: "OrderItem".to_string(),
            primary_key: Some("uuid".to_string()),
            columns: vec![column("uuid", "char", false), column("qty", "int", false)],
            foreign_keys: Default::default(),
            indexes: Default::default(),
            has_timestamps: false,
            has_soft_deletes: false,
        };

        let mut out = OutputWriter::new(dir.path());
        let generator = ModelGenerator::new(&stubs, &settings);
        let outcomes = generator
            .generate(&Descriptor::Table(table), &mut out)
            .unwrap();
        assert_eq!(outcomes.len(), 1);

        let main = read(&dir.path().join("Unit/Models/OrderItemTest.php"));
        assert!(main.contains("use App\\Models\\OrderItem;"));
        assert!(main.contains("getTable())->toBe('order_items')"));
        assert!(main.contains("getKeyName())->toBe('uuid')"));
        assert!(main.contains("getKeyType())->toBe('string')"));
        assert!(main.contains("getIncrementing())->toBeFalse()"));
        assert!(main.contains("usesTimestamps())->toBeFalse()"));
        assert!(main.contains("toBe(['uuid', 'qty'])"));
    }
}
