//! Controller test generation.

use super::{
    auth_setup, php_string, render_stub, FileOutcome, GenerateError, Generator, OutputWriter,
    Settings, BODY_INDENT,
};
use crate::descriptor::{ControllerDescriptor, Descriptor, Route, SubjectKind};
use crate::render::{join_fragments, Substitutions};
use crate::stub::{StubKind, StubSet};

pub struct ControllerGenerator<'a> {
    stubs: &'a StubSet,
    settings: &'a Settings,
}

/// Whether any of the middleware names requires an authenticated user.
fn requires_auth<'m>(mut middleware: impl Iterator<Item = &'m String>) -> bool {
    middleware.any(|m| m == "auth" || m.starts_with("auth:"))
}

impl<'a> ControllerGenerator<'a> {
    pub fn new(stubs: &'a StubSet, settings: &'a Settings) -> Self {
        Self { stubs, settings }
    }

    pub fn generate_controller(
        &self,
        controller: &ControllerDescriptor,
        out: &mut OutputWriter<'_>,
    ) -> Vec<FileOutcome> {
        let (dirs, stub) = if controller.is_api {
            (["Feature", "Api"], StubKind::ApiController)
        } else {
            (["Feature", "Controllers"], StubKind::Controller)
        };
        let path = out.test_path(&dirs, &controller.subject.short_name);
        vec![out.write(path, || {
            render_stub(self.stubs, stub, &self.substitutions(controller))
        })]
    }

    fn substitutions(&self, controller: &ControllerDescriptor) -> Substitutions {
        let class = &controller.subject.short_name;

        let model_import = controller
            .model
            .as_ref()
            .map(|m| format!("use {};", m.class))
            .unwrap_or_default();

        let method_checks = if controller.methods.is_empty() {
            format!("expect(class_exists({}::class))->toBeTrue();", class)
        } else {
            join_fragments(&controller.methods, BODY_INDENT, |m| {
                format!(
                    "expect(method_exists({}::class, {}))->toBeTrue();",
                    class,
                    php_string(&m.name)
                )
            })
        };

        let route_tests = join_fragments(&controller.routes, "\n\n", |r| {
            self.route_test(controller, r)
        });

        Substitutions::new()
            .with("controllerNamespace", controller.subject.namespace.as_str())
            .with("controllerClass", class.as_str())
            .with("modelImport", model_import)
            .with("methodChecks", method_checks)
            .with("routeTests", route_tests)
            .with("guestTests", guest_test(controller))
    }

    fn route_test(&self, controller: &ControllerDescriptor, route: &Route) -> String {
        let verb = route.primary_method().to_uppercase();
        let title = format!("{} {} responds without a server error", verb, display_uri(route));

        let mut setup = Vec::new();
        if requires_auth(route.middleware.iter().chain(controller.middleware.iter())) {
            setup.push(auth_setup(self.settings));
        }
        let model = controller
            .model
            .as_ref()
            .filter(|_| !route.parameters().is_empty());
        if let Some(model) = model {
            setup.push(format!("$model = {}::factory()->create();", model.short_name));
        }
        let key = if model.is_some() {
            "{$model->getRouteKey()}"
        } else {
            "1"
        };

        let mut body = String::new();
        for line in &setup {
            body.push_str("    ");
            body.push_str(line);
            body.push('\n');
        }
        if !setup.is_empty() {
            body.push('\n');
        }

        format!(
            "test({}, function () {{\n{}    $response = $this->{}(\"{}\");\n\n    expect($response->status())->toBeLessThan(500);\n}});",
            php_string(&title),
            body,
            request_method(&verb, controller.is_api),
            request_uri(route, key)
        )
    }
}

impl Generator for ControllerGenerator<'_> {
    fn kind(&self) -> SubjectKind {
        SubjectKind::Controller
    }

    fn generate(
        &self,
        descriptor: &Descriptor,
        out: &mut OutputWriter<'_>,
    ) -> Result<Vec<FileOutcome>, GenerateError> {
        match descriptor {
            Descriptor::Controller(controller) => Ok(self.generate_controller(controller, out)),
            other => Err(GenerateError::WrongDescriptor {
                expected: self.kind(),
                found: other.kind(),
            }),
        }
    }
}

/// One test for the first authenticated GET route, asserting guests are
/// turned away.
fn guest_test(controller: &ControllerDescriptor) -> String {
    let guarded = controller.routes.iter().find(|r| {
        r.primary_method().eq_ignore_ascii_case("GET")
            && requires_auth(r.middleware.iter().chain(controller.middleware.iter()))
    });
    let Some(route) = guarded else {
        return String::new();
    };

    let statuses = if controller.is_api {
        "[401, 403]"
    } else {
        "[302, 401, 403]"
    };
    format!(
        "test({}, function () {{\n    $response = $this->{}(\"{}\");\n\n    expect($response->status())->toBeIn({});\n}});",
        php_string(&format!("guests cannot reach GET {}", display_uri(route))),
        request_method("GET", controller.is_api),
        request_uri(route, "1"),
        statuses
    )
}

fn display_uri(route: &Route) -> String {
    format!("/{}", route.uri.trim_start_matches('/'))
}

/// URI with every `{param}` segment replaced by `key`.
fn request_uri(route: &Route, key: &str) -> String {
    let segments: Vec<&str> = route
        .uri
        .trim_start_matches('/')
        .split('/')
        .map(|seg| {
            if seg.starts_with('{') && seg.ends_with('}') {
                key
            } else {
                seg
            }
        })
        .collect();
    format!("/{}", segments.join("/"))
}

fn request_method(verb: &str, json: bool) -> String {
    let base = match verb {
        "GET" => "get",
        "POST" => "post",
        "PUT" => "put",
        "PATCH" => "patch",
        "DELETE" => "delete",
        "OPTIONS" => "options",
        _ => "get",
    };
    if json {
        format!("{}Json", base)
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{AssociatedModel, Method, SubjectName};

    fn route(uri: &str, verb: &str, action: &str, middleware: &[&str]) -> Route {
        Route {
            uri: uri.to_string(),
            methods: vec![verb.to_string()],
            name: None,
            action: action.to_string(),
            middleware: middleware.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn posts_controller(is_api: bool) -> ControllerDescriptor {
        let qualified = if is_api {
            "App\\Http\\Controllers\\Api\\PostController"
        } else {
            "App\\Http\\Controllers\\PostController"
        };
        ControllerDescriptor {
            subject: SubjectName::parse(qualified),
            methods: ["index", "show"]
                .iter()
                .map(|n| Method {
                    name: n.to_string(),
                    parameters: vec![],
                    return_type: None,
                    doc: None,
                })
                .collect(),
            traits: vec![],
            routes: vec![
                route("posts", "GET", "index", &["web", "auth"]),
                route("/posts/{post}", "GET", "show", &["web"]),
            ],
            model: Some(AssociatedModel {
                class: "App\\Models\\Post".to_string(),
                short_name: "Post".to_string(),
            }),
            is_api,
            is_resourceful: false,
            middleware: vec![],
        }
    }

    #[test]
    fn test_web_controller_file() {
        let dir = tempfile::tempdir().unwrap();
        let stubs = StubSet::builtin();
        let settings = Settings::default();
        let mut out = OutputWriter::new(dir.path());

        let outcomes =
            ControllerGenerator::new(&stubs, &settings).generate_controller(&posts_controller(false), &mut out);
        assert_eq!(outcomes.len(), 1);

        let text =
            std::fs::read_to_string(dir.path().join("Feature/Controllers/PostControllerTest.php"))
                .unwrap();
        assert!(text.contains("use App\\Http\\Controllers\\PostController;"));
        assert!(text.contains("use App\\Models\\Post;"));
        assert!(text.contains("method_exists(PostController::class, 'show')"));
        assert!(text.contains("test('GET /posts responds without a server error'"));
        assert!(text.contains("$this->actingAs($user);"));
        assert!(text.contains("$model = Post::factory()->create();"));
        assert!(text.contains("$this->get(\"/posts/{$model->getRouteKey()}\")"));
        assert!(text.contains("test('guests cannot reach GET /posts'"));
        assert!(text.contains("toBeIn([302, 401, 403])"));
        assert!(!text.contains("group('api')"));
    }

    #[test]
    fn test_api_controller_uses_json_requests() {
        let dir = tempfile::tempdir().unwrap();
        let stubs = StubSet::builtin();
        let settings = Settings::default();
        let mut out = OutputWriter::new(dir.path());

        ControllerGenerator::new(&stubs, &settings)
            .generate(&Descriptor::Controller(posts_controller(true)), &mut out)
            .unwrap();

        let text =
            std::fs::read_to_string(dir.path().join("Feature/Api/PostControllerTest.php")).unwrap();
        assert!(text.contains("uses()->group('api');"));
        assert!(text.contains("$this->getJson(\"/posts\")"));
        assert!(text.contains("toBeIn([401, 403])"));
    }

    #[test]
    fn test_controller_without_routes_or_model() {
        let stubs = StubSet::builtin();
        let settings = Settings::default();
        let mut controller = posts_controller(false);
        controller.routes.clear();
        controller.methods.clear();
        controller.model = None;

        let subs = ControllerGenerator::new(&stubs, &settings).substitutions(&controller);
        assert_eq!(subs.get("modelImport"), Some(""));
        assert_eq!(subs.get("routeTests"), Some(""));
        assert_eq!(subs.get("guestTests"), Some(""));
        assert_eq!(
            subs.get("methodChecks"),
            Some("expect(class_exists(PostController::class))->toBeTrue();")
        );
    }

    #[test]
    fn test_request_uri_without_model_uses_literal_key() {
        let r = route("users/{user}/posts/{post?}", "DELETE", "destroy", &[]);
        assert_eq!(request_uri(&r, "1"), "/users/1/posts/1");
        assert_eq!(request_method("DELETE", true), "deleteJson");
    }

    #[test]
    fn test_controller_generator_rejects_other_descriptors() {
        let stubs = StubSet::builtin();
        let settings = Settings::default();
        let dir = tempfile::tempdir().unwrap();
        let mut out = OutputWriter::new(dir.path());
        let model = crate::descriptor::ModelDescriptor::with_defaults(SubjectName::parse(
            "App\\Models\\Post",
        ));

        let err = ControllerGenerator::new(&stubs, &settings)
            .generate(&Descriptor::Model(model), &mut out)
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::WrongDescriptor {
                expected: SubjectKind::Controller,
                found: SubjectKind::Model
            }
        ));
    }
}
