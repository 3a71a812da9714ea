//! Admin resource test generation.
//!
//! One file for the resource itself under `Feature/Filament`, then one per
//! registered page under `Feature/Filament/<Resource>/`, using the stub that
//! matches the page's role.

use super::{
    auth_setup, php_string, render_stub, FileOutcome, GenerateError, Generator, OutputWriter,
    Settings, BODY_INDENT, CHAIN_INDENT,
};
use crate::descriptor::{Descriptor, Page, PageRole, ResourceDescriptor, SubjectKind};
use crate::naming;
use crate::render::{join_fragments, Substitutions};
use crate::stub::{StubKind, StubSet};

const SEARCH_TERM: &str = "test";

/// Interpolated into double-quoted URLs in place of `{record}`.
const RECORD_KEY: &str = "{$model->getRouteKey()}";

fn page_stub(role: PageRole) -> StubKind {
    match role {
        PageRole::List => StubKind::FilamentListPage,
        PageRole::Create => StubKind::FilamentCreatePage,
        PageRole::Edit => StubKind::FilamentEditPage,
        PageRole::View => StubKind::FilamentViewPage,
        PageRole::Generic => StubKind::FilamentPage,
    }
}

pub struct ResourceGenerator<'a> {
    stubs: &'a StubSet,
    settings: &'a Settings,
}

impl<'a> ResourceGenerator<'a> {
    pub fn new(stubs: &'a StubSet, settings: &'a Settings) -> Self {
        Self { stubs, settings }
    }

    pub fn generate_resource(
        &self,
        resource: &ResourceDescriptor,
        out: &mut OutputWriter<'_>,
    ) -> Vec<FileOutcome> {
        let short = resource.subject.short_name.as_str();
        let mut outcomes = Vec::with_capacity(resource.pages.len() + 1);

        let path = out.test_path(&["Feature", "Filament"], short);
        outcomes.push(out.write(path, || {
            render_stub(
                self.stubs,
                StubKind::FilamentResource,
                &self.resource_substitutions(resource),
            )
        }));

        for page in resource.pages.values() {
            let path = out.test_path(&["Feature", "Filament", short], &page.short_name);
            outcomes.push(out.write(path, || {
                render_stub(
                    self.stubs,
                    page_stub(page.role),
                    &self.page_substitutions(resource, page),
                )
            }));
        }

        outcomes
    }

    /// Placeholders shared by the resource file and every page file.
    fn common(&self, resource: &ResourceDescriptor) -> Substitutions {
        Substitutions::new()
            .with("resourceNamespace", resource.subject.namespace.as_str())
            .with("resourceClass", resource.subject.short_name.as_str())
            .with("modelNamespace", naming::namespace_of(&resource.model.class))
            .with("modelClass", resource.model.short_name.as_str())
            .with("routePrefix", self.settings.route_prefix.as_str())
            .with("resourceSlug", resource.slug())
            .with("authSetup", auth_setup(self.settings))
            .with("customTests", "")
    }

    fn resource_substitutions(&self, resource: &ResourceDescriptor) -> Substitutions {
        let page_assertions = if resource.pages.is_empty() {
            format!(
                "expect($pages)->toBeArray();{}expect($pages)->not()->toBeEmpty();",
                BODY_INDENT
            )
        } else {
            join_fragments(resource.pages.keys(), BODY_INDENT, |key| {
                format!("expect($pages)->toHaveKey({});", php_string(key))
            })
        };

        let form_assertions = component_names(
            "$form->getComponents()",
            resource.form_fields.iter().map(|f| f.name.as_str()),
        );
        let table_assertions = component_names(
            "$table->getColumns()",
            resource.table_columns.iter().map(|c| c.name.as_str()),
        );

        let navigation_tests = match &resource.navigation_group {
            Some(group) => format!(
                "test('{class} is grouped under {group}', function () {{\n    expect({class}::getNavigationGroup())->toBe({literal});\n}});",
                class = resource.subject.short_name,
                group = group.replace('\'', "\\'"),
                literal = php_string(group),
            ),
            None => String::new(),
        };

        let mut subs = self.common(resource);
        subs.set("resourceName", resource.resource_name());
        subs.set("pageAssertions", page_assertions);
        subs.set("formAssertions", form_assertions);
        subs.set("tableAssertions", table_assertions);
        subs.set("navigationTests", navigation_tests);
        subs
    }

    fn page_substitutions(&self, resource: &ResourceDescriptor, page: &Page) -> Substitutions {
        let model = resource.model.short_name.as_str();
        let fields = &resource.form_fields;
        let first_required = resource.required_fields().next();

        let form_field_assertions = if fields.is_empty() {
            "->assertFormExists()".to_string()
        } else {
            join_fragments(fields, CHAIN_INDENT, |f| {
                format!("->assertFormFieldExists({})", php_string(&f.name))
            })
        };

        let form_data_assertions = join_fragments(resource.required_fields(), CHAIN_INDENT, |f| {
            format!("->assertFormSet({}, {})", php_string(&f.name), model_value(&f.name))
        });

        let form_fill = if fields.is_empty() {
            "->fillForm($data)".to_string()
        } else {
            join_fragments(fields, CHAIN_INDENT, |f| {
                fill_form(&php_string(&f.name), &format!("$data[{}]", php_string(&f.name)))
            })
        };

        // Nothing can be left invalid when the form has fields but none is required.
        let invalid = match (fields.is_empty(), first_required) {
            (true, _) => Some((
                "->fillForm(['name' => null])".to_string(),
                "['name']".to_string(),
            )),
            (false, Some(field)) => Some((
                fill_form(&php_string(&field.name), "null"),
                format!("[{}]", php_string(&field.name)),
            )),
            (false, None) => None,
        };
        let validation_tests = invalid
            .as_ref()
            .map(|(fill, errors)| validation_test(page, model, fill, errors))
            .unwrap_or_default();
        let (invalid_fill, form_errors) = invalid.unwrap_or_default();

        let database_assertions = if fields.is_empty() {
            "$data".to_string()
        } else {
            let pairs = join_fragments(fields, ", ", |f| {
                let key = php_string(&f.name);
                format!("{} => $data[{}]", key, key)
            });
            format!("[{}]", pairs)
        };

        let table_column_assertions = join_fragments(&resource.table_columns, CHAIN_INDENT, |c| {
            format!("->assertCanSeeTableColumn({})", php_string(&c.name))
        });

        let sort_assertions = resource
            .sortable_columns()
            .next()
            .map(|c| {
                format!(
                    "->sortTable({}){}->assertCanSeeTableRecords([$model])",
                    php_string(&c.name),
                    CHAIN_INDENT
                )
            })
            .unwrap_or_default();

        let relationship_tests = if page.role == PageRole::View {
            join_fragments(&resource.model_relationships, "\n\n", |name| {
                relationship_test(name)
            })
        } else {
            String::new()
        };

        let factory_create = format!("$model = {}::factory()->create();", model);
        let factory_make = format!("$data = {}::factory()->make()->toArray();", model);

        let mut subs = self.common(resource);
        subs.set("pageNamespace", naming::namespace_of(&page.class));
        subs.set("pageClass", page.short_name.as_str());
        subs.set("pageRoute", page.role.route_suffix().replace("{record}", RECORD_KEY));
        subs.set("modelFactorySetup", factory_create);
        subs.set("modelFactoryDataSetup", factory_make.clone());
        subs.set("modelFactoryUpdateDataSetup", factory_make);
        subs.set("formFieldAssertions", form_field_assertions);
        subs.set("formDataAssertions", form_data_assertions);
        subs.set("formFillAssertions", form_fill);
        subs.set("invalidFormFillAssertions", invalid_fill);
        subs.set("formErrorAssertions", form_errors);
        subs.set("validationTests", validation_tests);
        subs.set("databaseAssertions", database_assertions);
        subs.set("tableColumnAssertions", table_column_assertions);
        subs.set("sortAssertions", sort_assertions);
        subs.set("relationshipTests", relationship_tests);
        subs.set("searchTerm", SEARCH_TERM);
        subs.set(
            "tableName",
            naming::table_name_for_model(resource.resource_name()),
        );
        subs
    }
}

impl Generator for ResourceGenerator<'_> {
    fn kind(&self) -> SubjectKind {
        SubjectKind::Resource
    }

    fn generate(
        &self,
        descriptor: &Descriptor,
        out: &mut OutputWriter<'_>,
    ) -> Result<Vec<FileOutcome>, GenerateError> {
        match descriptor {
            Descriptor::Resource(resource) => Ok(self.generate_resource(resource, out)),
            other => Err(GenerateError::WrongDescriptor {
                expected: self.kind(),
                found: other.kind(),
            }),
        }
    }
}

/// Assert a schema contains components with the given names.
fn component_names<'n>(collection: &str, names: impl Iterator<Item = &'n str>) -> String {
    let names: Vec<&str> = names.collect();
    if names.is_empty() {
        return format!(
            "expect({c})->toBeArray();{}expect({c})->not()->toBeEmpty();",
            BODY_INDENT,
            c = collection
        );
    }
    join_fragments(names, BODY_INDENT, |name| {
        format!(
            "expect(collect({})->map->getName())->toContain({});",
            collection,
            php_string(name)
        )
    })
}

fn fill_form(key: &str, value: &str) -> String {
    format!(
        "->fillForm([\n            {} => {},\n        ])",
        key, value
    )
}

/// Form state for `name`, reading nested fields like `author.name` through relations.
fn model_value(name: &str) -> String {
    if name.contains('.') {
        format!("data_get($model, {})", php_string(name))
    } else {
        format!("$model->{}", name)
    }
}

/// A test that submits the form with a required field cleared.
///
/// Only create and edit pages submit forms, so other roles get nothing.
fn validation_test(page: &Page, model: &str, fill: &str, errors: &str) -> String {
    let class = page.short_name.as_str();
    let (setup, params, action) = match page.role {
        PageRole::Create => (String::new(), String::new(), "create"),
        PageRole::Edit => (
            format!("    $model = {}::factory()->create();\n\n", model),
            ", ['record' => $model->getRouteKey()]".to_string(),
            "save",
        ),
        _ => return String::new(),
    };
    format!(
        "test('{class} validates input', function () {{\n{setup}    Livewire::test({class}::class{params})\n        {fill}\n        ->call('{action}')\n        ->assertHasFormErrors({errors});\n}});",
        class = class,
        setup = setup,
        params = params,
        fill = fill,
        action = action,
        errors = errors,
    )
}

fn relationship_test(name: &str) -> String {
    format!(
        "test('View page displays {name} relationship', function () {{\n    $model = $this->model;\n\n    Livewire::test($this->pageClass, [\n        'record' => $model->getRouteKey(),\n    ])\n        ->assertSuccessful()\n        ->assertSeeHtml({literal});\n}})->group('filament', 'relationships');",
        name = name,
        literal = php_string(name),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{AssociatedModel, FormField, SubjectName, TableColumn};
    use crate::generate::OutcomeStatus;

    fn field(name: &str, required: bool) -> FormField {
        FormField {
            name: name.to_string(),
            type_name: "TextInput".to_string(),
            label: None,
            required,
        }
    }

    fn blog_posts() -> ResourceDescriptor {
        let ns = "App\\Filament\\Resources\\BlogPostResource\\Pages";
        let pages = [
            ("index", "ListBlogPosts"),
            ("create", "CreateBlogPost"),
            ("edit", "EditBlogPost"),
            ("view", "ViewBlogPost"),
            ("stats", "BlogPostStats"),
        ]
        .iter()
        .map(|(key, class)| (key.to_string(), Page::new(key, &format!("{}\\{}", ns, class))))
        .collect();

        ResourceDescriptor {
            subject: SubjectName::parse("App\\Filament\\Resources\\BlogPostResource"),
            model: AssociatedModel {
                class: "App\\Models\\BlogPost".to_string(),
                short_name: "BlogPost".to_string(),
            },
            pages,
            form_fields: vec![field("title", true), field("body", false)],
            table_columns: vec![TableColumn {
                name: "title".to_string(),
                type_name: "TextColumn".to_string(),
                label: None,
                sortable: true,
                searchable: true,
            }],
            navigation_group: Some("Content".to_string()),
            model_relationships: vec!["comments".to_string()],
        }
    }

    #[test]
    fn test_resource_and_page_files() {
        let dir = tempfile::tempdir().unwrap();
        let stubs = StubSet::builtin();
        let settings = Settings::default();
        let mut out = OutputWriter::new(dir.path());

        let outcomes = ResourceGenerator::new(&stubs, &settings)
            .generate_resource(&blog_posts(), &mut out);
        assert_eq!(outcomes.len(), 6);
        assert!(outcomes.iter().all(|o| o.status == OutcomeStatus::Created));

        let base = dir.path().join("Feature/Filament");
        let read = |rel: &str| std::fs::read_to_string(base.join(rel)).unwrap();

        let resource = read("BlogPostResourceTest.php");
        assert!(resource.contains("expect($pages)->toHaveKey('create');"));
        assert!(resource.contains("$this->get('/admin/blog-post')"));
        assert!(resource.contains("test('BlogPost index is reachable'"));
        assert!(resource.contains("->toContain('title');"));
        assert!(resource.contains("getNavigationGroup())->toBe('Content')"));
        assert!(!resource.contains("{{"));

        let list = read("BlogPostResource/ListBlogPostsTest.php");
        assert!(list.contains("test('ListBlogPosts lists blog_posts'"));
        assert!(list.contains("->assertCanSeeTableColumn('title')"));
        assert!(list.contains("->sortTable('title')\n        ->assertCanSeeTableRecords([$model])"));

        let create = read("BlogPostResource/CreateBlogPostTest.php");
        assert!(create.contains("$this->get(\"/admin/blog-post/create\")"));
        assert!(create.contains("->fillForm([\n            'title' => $data['title'],\n        ])"));
        assert!(create.contains("->fillForm([\n            'title' => null,\n        ])"));
        assert!(create.contains("->assertHasFormErrors(['title']);"));
        assert!(create.contains(
            "assertDatabaseHas('blog_posts', ['title' => $data['title'], 'body' => $data['body']]);"
        ));

        let edit = read("BlogPostResource/EditBlogPostTest.php");
        assert!(edit.contains("$this->get(\"/admin/blog-post/{$model->getRouteKey()}/edit\")"));
        assert!(edit.contains("->assertFormSet('title', $model->title)"));
        assert!(!edit.contains("->assertFormSet('body'"));

        let view = read("BlogPostResource/ViewBlogPostTest.php");
        assert!(view.contains("$this->get(\"/admin/blog-post/{$model->getRouteKey()}\")"));
        assert!(view.contains("test('View page displays comments relationship'"));

        let generic = read("BlogPostResource/BlogPostStatsTest.php");
        assert!(generic.contains("test('BlogPostStats renders'"));
    }

    #[test]
    fn test_empty_schemas_use_fallbacks() {
        let stubs = StubSet::builtin();
        let settings = Settings::default();
        let generator = ResourceGenerator::new(&stubs, &settings);
        let mut resource = blog_posts();
        resource.form_fields.clear();
        resource.table_columns.clear();
        resource.pages.clear();
        resource.navigation_group = None;

        let subs = generator.resource_substitutions(&resource);
        assert_eq!(
            subs.get("pageAssertions"),
            Some("expect($pages)->toBeArray();\n    expect($pages)->not()->toBeEmpty();")
        );
        assert_eq!(subs.get("navigationTests"), Some(""));
        assert!(subs
            .get("formAssertions")
            .unwrap()
            .starts_with("expect($form->getComponents())->toBeArray();"));

        let page = Page::new("create", "App\\Filament\\Pages\\CreateBlogPost");
        let subs = generator.page_substitutions(&resource, &page);
        assert_eq!(subs.get("formFieldAssertions"), Some("->assertFormExists()"));
        assert_eq!(subs.get("formFillAssertions"), Some("->fillForm($data)"));
        assert_eq!(subs.get("invalidFormFillAssertions"), Some("->fillForm(['name' => null])"));
        assert_eq!(subs.get("formErrorAssertions"), Some("['name']"));
        assert_eq!(subs.get("databaseAssertions"), Some("$data"));
        assert_eq!(subs.get("sortAssertions"), Some(""));
        assert_eq!(subs.get("relationshipTests"), Some(""));
    }

    #[test]
    fn test_form_without_required_fields() {
        let stubs = StubSet::builtin();
        let settings = Settings::default();
        let mut resource = blog_posts();
        resource.form_fields = vec![field("body", false)];

        let page = Page::new("create", "App\\Filament\\Pages\\CreateBlogPost");
        let subs = ResourceGenerator::new(&stubs, &settings).page_substitutions(&resource, &page);
        assert_eq!(subs.get("invalidFormFillAssertions"), Some(""));
        assert_eq!(subs.get("formErrorAssertions"), Some(""));
        assert_eq!(subs.get("validationTests"), Some(""));
        assert_eq!(subs.get("formDataAssertions"), Some(""));
    }

    #[test]
    fn test_optional_only_form_has_no_validation_test() {
        let dir = tempfile::tempdir().unwrap();
        let stubs = StubSet::builtin();
        let settings = Settings::default();
        let mut resource = blog_posts();
        resource.form_fields = vec![field("body", false)];

        let mut out = OutputWriter::new(dir.path());
        ResourceGenerator::new(&stubs, &settings).generate_resource(&resource, &mut out);

        let base = dir.path().join("Feature/Filament/BlogPostResource");
        for file in ["CreateBlogPostTest.php", "EditBlogPostTest.php"] {
            let text = std::fs::read_to_string(base.join(file)).unwrap();
            assert!(!text.contains("validates input"), "{}", file);
            assert!(!text.contains("assertHasFormErrors("), "{}", file);
            assert!(!text.contains("{{"), "{}", file);
        }
    }

    #[test]
    fn test_nested_field_reads_through_relation() {
        let stubs = StubSet::builtin();
        let settings = Settings::default();
        let mut resource = blog_posts();
        resource.form_fields = vec![field("title", true), field("author.name", true)];

        let page = Page::new("edit", "App\\Filament\\Pages\\EditBlogPost");
        let subs = ResourceGenerator::new(&stubs, &settings).page_substitutions(&resource, &page);
        let assertions = subs.get("formDataAssertions").unwrap();
        assert!(assertions.contains("->assertFormSet('title', $model->title)"));
        assert!(assertions.contains("->assertFormSet('author.name', data_get($model, 'author.name'))"));
        assert!(!assertions.contains("$model->author.name"));

        let validation = subs.get("validationTests").unwrap();
        assert!(validation.starts_with("test('EditBlogPost validates input'"));
        assert!(validation.contains("['record' => $model->getRouteKey()]"));
        assert!(validation.contains("->call('save')"));
    }

    #[test]
    fn test_route_prefix_comes_from_settings() {
        let stubs = StubSet::builtin();
        let settings = Settings {
            route_prefix: "backoffice".to_string(),
            ..Settings::default()
        };
        let subs = ResourceGenerator::new(&stubs, &settings).common(&blog_posts());
        assert_eq!(subs.get("routePrefix"), Some("backoffice"));
        assert_eq!(subs.get("resourceSlug"), Some("blog-post"));
        assert_eq!(subs.get("modelNamespace"), Some("App\\Models"));
    }
}
