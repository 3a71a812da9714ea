//! Database table descriptor.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::SubjectName;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Qualified name is the table name itself; namespace is the connection.
    #[serde(flatten)]
    pub subject: SubjectName,
    pub table: String,
    pub model_name: String,
    #[serde(default)]
    pub primary_key: Option<String>,
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Local column to foreign key
    #[serde(default)]
    pub foreign_keys: BTreeMap<String, ForeignKey>,
    /// Index name to index
    #[serde(default)]
    pub indexes: BTreeMap<String, Index>,
    pub has_timestamps: bool,
    pub has_soft_deletes: bool,
}

impl TableDescriptor {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
    pub auto_increment: bool,
    pub unsigned: bool,
    #[serde(default)]
    pub length: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub local_column: String,
    pub foreign_table: String,
    pub foreign_column: String,
    #[serde(default)]
    pub on_delete: Option<String>,
    #[serde(default)]
    pub on_update: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub primary: bool,
}

/// Whether the column set carries `created_at` and `updated_at`.
pub fn has_timestamps<S: AsRef<str>>(columns: &[S]) -> bool {
    columns.iter().any(|c| c.as_ref() == "created_at")
        && columns.iter().any(|c| c.as_ref() == "updated_at")
}

/// Whether the column set carries `deleted_at`.
pub fn has_soft_deletes<S: AsRef<str>>(columns: &[S]) -> bool {
    columns.iter().any(|c| c.as_ref() == "deleted_at")
}
