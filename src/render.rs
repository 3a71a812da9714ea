//! Placeholder substitution for stub templates.
//!
//! Placeholders are `{{ name }}` tokens (inner whitespace optional). Every
//! token whose name is declared in the substitution map is replaced; all
//! other tokens pass through untouched. Replacement is a single scan over the
//! original template, so replacement text is never itself re-scanned.

use regex::{Captures, Regex};
use std::collections::BTreeMap;

lazy_static::lazy_static! {
    static ref PLACEHOLDER: Regex =
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*\}\}").unwrap();
}

/// Named placeholder values for one render call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitutions {
    values: BTreeMap<String, String>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Placeholder names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Substitutions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut subs = Substitutions::new();
        for (k, v) in iter {
            subs.set(k, v);
        }
        subs
    }
}

/// Render `template`, replacing every declared placeholder.
pub fn render(template: &str, substitutions: &Substitutions) -> String {
    if substitutions.is_empty() {
        return template.to_string();
    }

    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match substitutions.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Placeholder names referenced by a template, in order of first appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(template) {
        let name = caps[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Join per-item fragments into one block, separating items with `separator`.
///
/// Generators build repeated sections (one assertion per field, one test per
/// relationship) with this before substitution.
pub fn join_fragments<I, F>(items: I, separator: &str, mut fragment: F) -> String
where
    I: IntoIterator,
    F: FnMut(I::Item) -> String,
{
    items
        .into_iter()
        .map(&mut fragment)
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_identity_without_substitutions() {
        let template = "test('{{ modelClass }}', function () {\n    {{ body }}\n});\n";
        assert_eq!(render(template, &Substitutions::new()), template);
    }

    #[test]
    fn test_render_replaces_every_occurrence() {
        let subs = Substitutions::new().with("name", "User");
        let out = render("{{ name }} and {{name}} and {{  name  }}", &subs);
        assert_eq!(out, "User and User and User");
    }

    #[test]
    fn test_render_is_single_pass() {
        let subs = Substitutions::new().with("a", "{{b}}").with("b", "X");
        assert_eq!(render("{{a}}", &subs), "{{b}}");
    }

    #[test]
    fn test_render_leaves_undeclared_placeholders() {
        let subs = Substitutions::new().with("known", "yes");
        let out = render("{{ known }} {{ unknown }}", &subs);
        assert_eq!(out, "yes {{ unknown }}");
    }

    #[test]
    fn test_render_ignores_non_placeholder_braces() {
        let subs = Substitutions::new().with("uri", "/users");
        let out = render("fn() { return '{{ uri }}/{record}'; }", &subs);
        assert_eq!(out, "fn() { return '/users/{record}'; }");
    }

    #[test]
    fn test_placeholders_in_order() {
        let names = placeholders("{{ b }} {{ a }} {{ b }}");
        assert_eq!(names, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_join_fragments() {
        let out = join_fragments(["a", "b"], "\n", |s| format!("- {}", s));
        assert_eq!(out, "- a\n- b");
    }
}
