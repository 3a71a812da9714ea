//! Admin-panel resource descriptor.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{AssociatedModel, SubjectName};
use crate::naming;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    #[serde(flatten)]
    pub subject: SubjectName,
    pub model: AssociatedModel,
    /// Page key (`index`, `create`, ...) to page
    #[serde(default)]
    pub pages: BTreeMap<String, Page>,
    #[serde(default)]
    pub form_fields: Vec<FormField>,
    #[serde(default)]
    pub table_columns: Vec<TableColumn>,
    #[serde(default)]
    pub navigation_group: Option<String>,
    /// Relationship method names of the associated model
    #[serde(default)]
    pub model_relationships: Vec<String>,
}

impl ResourceDescriptor {
    /// Short name without the `Resource` suffix.
    pub fn resource_name(&self) -> &str {
        naming::before_last(&self.subject.short_name, "Resource")
    }

    /// URL slug of the resource (`BlogPostResource` -> `blog-post`).
    pub fn slug(&self) -> String {
        naming::kebab(self.resource_name())
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FormField> {
        self.form_fields.iter().filter(|f| f.required)
    }

    pub fn sortable_columns(&self) -> impl Iterator<Item = &TableColumn> {
        self.table_columns.iter().filter(|c| c.sortable)
    }

    pub fn searchable_columns(&self) -> impl Iterator<Item = &TableColumn> {
        self.table_columns.iter().filter(|c| c.searchable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub key: String,
    pub class: String,
    pub short_name: String,
    pub role: PageRole,
}

impl Page {
    pub fn new(key: &str, class: &str) -> Self {
        let class = naming::canonical(class);
        let short_name = naming::short_name(&class).to_string();
        let role = PageRole::from_page(key, &short_name);
        Self {
            key: key.to_string(),
            class,
            short_name,
            role,
        }
    }
}

/// What an admin page does, derived from its key or class name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageRole {
    List,
    Create,
    Edit,
    View,
    Generic,
}

impl PageRole {
    /// Match the page key first, then tokens inside the short class name.
    pub fn from_page(key: &str, short_name: &str) -> Self {
        match key.to_lowercase().as_str() {
            "index" | "list" => return PageRole::List,
            "create" | "new" => return PageRole::Create,
            "edit" | "update" => return PageRole::Edit,
            "view" | "show" | "detail" => return PageRole::View,
            _ => {}
        }

        let contains_any = |tokens: &[&str]| tokens.iter().any(|t| short_name.contains(t));
        if contains_any(&["List", "Index"]) {
            PageRole::List
        } else if contains_any(&["Create", "New"]) {
            PageRole::Create
        } else if contains_any(&["Edit", "Update"]) {
            PageRole::Edit
        } else if contains_any(&["View", "Show", "Detail"]) {
            PageRole::View
        } else {
            PageRole::Generic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PageRole::List => "List",
            PageRole::Create => "Create",
            PageRole::Edit => "Edit",
            PageRole::View => "View",
            PageRole::Generic => "Page",
        }
    }

    /// Route suffix appended to the resource URL.
    pub fn route_suffix(&self) -> &'static str {
        match self {
            PageRole::Create => "/create",
            PageRole::Edit => "/{record}/edit",
            PageRole::View => "/{record}",
            PageRole::List | PageRole::Generic => "",
        }
    }

    /// Whether the page operates on an existing record.
    pub fn needs_record(&self) -> bool {
        matches!(self, PageRole::Edit | PageRole::View)
    }
}

impl std::fmt::Display for PageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub searchable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_role_from_key() {
        assert_eq!(PageRole::from_page("index", "Whatever"), PageRole::List);
        assert_eq!(PageRole::from_page("create", "Whatever"), PageRole::Create);
        assert_eq!(PageRole::from_page("edit", "Whatever"), PageRole::Edit);
        assert_eq!(PageRole::from_page("view", "Whatever"), PageRole::View);
    }

    #[test]
    fn test_page_role_from_short_name() {
        assert_eq!(PageRole::from_page("all", "ListUsers"), PageRole::List);
        assert_eq!(PageRole::from_page("add", "NewUser"), PageRole::Create);
        assert_eq!(PageRole::from_page("change", "UpdateUser"), PageRole::Edit);
        assert_eq!(PageRole::from_page("detail-page", "UserDetail"), PageRole::View);
        assert_eq!(PageRole::from_page("stats", "UserStats"), PageRole::Generic);
    }

    #[test]
    fn test_route_suffix() {
        assert_eq!(PageRole::Create.route_suffix(), "/create");
        assert_eq!(PageRole::Edit.route_suffix(), "/{record}/edit");
        assert_eq!(PageRole::View.route_suffix(), "/{record}");
        assert_eq!(PageRole::List.route_suffix(), "");
    }

    #[test]
    fn test_page_new_derives_role() {
        let page = Page::new("edit", "App\\Filament\\Resources\\UserResource\\Pages\\EditUser");
        assert_eq!(page.short_name, "EditUser");
        assert_eq!(page.role, PageRole::Edit);
    }
}
