//! ORM model descriptor.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Parameter, SubjectName, TraitRef};

/// Description of one ORM model class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    #[serde(flatten)]
    pub subject: SubjectName,
    pub table: String,
    pub primary_key: String,
    pub incrementing: bool,
    pub key_type: String,
    pub timestamps: bool,
    #[serde(default)]
    pub fillable: Vec<String>,
    #[serde(default)]
    pub guarded: Vec<String>,
    #[serde(default)]
    pub hidden: Vec<String>,
    #[serde(default)]
    pub visible: Vec<String>,
    #[serde(default)]
    pub casts: BTreeMap<String, String>,
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub scopes: Vec<Scope>,
    #[serde(default)]
    pub traits: Vec<TraitRef>,
    #[serde(default)]
    pub has_factory: bool,
    #[serde(default)]
    pub uses_uuid: bool,
    /// Field (or `group.field`) to rule string
    #[serde(default)]
    pub validation_rules: BTreeMap<String, String>,
}

impl ModelDescriptor {
    /// Model with host-framework defaults and no members.
    pub fn with_defaults(subject: SubjectName) -> Self {
        let table = crate::naming::table_name_for_model(&subject.short_name);
        Self {
            subject,
            table,
            primary_key: "id".to_string(),
            incrementing: true,
            key_type: "int".to_string(),
            timestamps: true,
            fillable: Vec::new(),
            guarded: Vec::new(),
            hidden: Vec::new(),
            visible: Vec::new(),
            casts: BTreeMap::new(),
            dates: Vec::new(),
            relationships: Vec::new(),
            scopes: Vec::new(),
            traits: Vec::new(),
            has_factory: false,
            uses_uuid: false,
            validation_rules: BTreeMap::new(),
        }
    }
}

/// Relation kinds known to the ORM.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RelationKind {
    HasOne,
    HasMany,
    BelongsTo,
    BelongsToMany,
    HasOneThrough,
    HasManyThrough,
    MorphOne,
    MorphMany,
    MorphTo,
    MorphToMany,
    Other(String),
}

impl RelationKind {
    pub fn as_str(&self) -> &str {
        match self {
            RelationKind::HasOne => "HasOne",
            RelationKind::HasMany => "HasMany",
            RelationKind::BelongsTo => "BelongsTo",
            RelationKind::BelongsToMany => "BelongsToMany",
            RelationKind::HasOneThrough => "HasOneThrough",
            RelationKind::HasManyThrough => "HasManyThrough",
            RelationKind::MorphOne => "MorphOne",
            RelationKind::MorphMany => "MorphMany",
            RelationKind::MorphTo => "MorphTo",
            RelationKind::MorphToMany => "MorphToMany",
            RelationKind::Other(name) => name,
        }
    }

    /// Parse the short class name of a relation type.
    pub fn parse(s: &str) -> Self {
        match s {
            "HasOne" => RelationKind::HasOne,
            "HasMany" => RelationKind::HasMany,
            "BelongsTo" => RelationKind::BelongsTo,
            "BelongsToMany" => RelationKind::BelongsToMany,
            "HasOneThrough" => RelationKind::HasOneThrough,
            "HasManyThrough" => RelationKind::HasManyThrough,
            "MorphOne" => RelationKind::MorphOne,
            "MorphMany" => RelationKind::MorphMany,
            "MorphTo" => RelationKind::MorphTo,
            "MorphToMany" => RelationKind::MorphToMany,
            other => RelationKind::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for RelationKind {
    fn from(s: String) -> Self {
        RelationKind::parse(&s)
    }
}

impl From<RelationKind> for String {
    fn from(kind: RelationKind) -> Self {
        kind.as_str().to_string()
    }
}

/// A relationship method declared on the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub name: String,
    pub kind: RelationKind,
    /// Qualified name of the related model, when the probe revealed it
    #[serde(default)]
    pub related: Option<String>,
}

/// A query scope (`scopeActive` exposes scope `active`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    pub name: String,
    pub method: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}
