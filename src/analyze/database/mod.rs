//! Database table analysis.
//!
//! There is no portable metadata API, so every lookup goes through a
//! [`Dialect`] chosen from the connection's driver name. Listing tables is the
//! only query whose failure propagates; every other metadata query that fails
//! yields the field's zero value and the rest of the table is still analyzed.

mod mysql;
mod postgres;
mod sqlite;
#[cfg(feature = "sqlite")]
mod sqlite_conn;
mod sqlsrv;

#[cfg(feature = "sqlite")]
pub use sqlite_conn::SqliteConnection;

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use super::{AnalyzeError, Analyzer};
use crate::descriptor::{
    has_soft_deletes, has_timestamps, Column, Descriptor, ForeignKey, Index, SubjectKind,
    SubjectName, TableDescriptor,
};
use crate::naming;

/// Table every Laravel application keeps for its own bookkeeping.
const MIGRATIONS_TABLE: &str = "migrations";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("query failed: {0}")]
    Failed(String),
    #[error("connection error: {0}")]
    Connection(String),
}

/// One result row, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(BTreeMap<String, serde_json::Value>);

impl Row {
    pub fn new(values: BTreeMap<String, serde_json::Value>) -> Self {
        Row(values)
    }

    /// Column lookup, ignoring case (`IS_NULLABLE` vs `is_nullable`).
    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.0.get(column).or_else(|| {
            self.0
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(column))
                .map(|(_, v)| v)
        })
    }

    pub fn get_str(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            serde_json::Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Truthiness the way drivers report flags (`1`, `t`, `true`, `YES`).
    pub fn get_bool(&self, column: &str) -> bool {
        match self.get(column) {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
            Some(serde_json::Value::String(s)) => {
                matches!(s.to_lowercase().as_str(), "1" | "t" | "true" | "yes" | "y")
            }
            _ => false,
        }
    }

    /// First column value as text, for single-column results like `SHOW TABLES`.
    pub fn first_str(&self) -> Option<String> {
        self.0.keys().next().and_then(|k| self.get_str(k))
    }
}

impl<K: Into<String>> FromIterator<(K, serde_json::Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, serde_json::Value)>>(iter: I) -> Self {
        Row(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// A live connection to the application's database.
pub trait SchemaConnection {
    /// Driver name as the framework reports it (`mysql`, `pgsql`, ...).
    fn driver_name(&self) -> &str;

    fn select(&self, sql: &str) -> Result<Vec<Row>, QueryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Driver {
    MySql,
    Postgres,
    Sqlite,
    SqlServer,
}

impl Driver {
    pub fn parse(name: &str) -> Result<Self, AnalyzeError> {
        match name.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Driver::MySql),
            "pgsql" | "postgres" | "postgresql" => Ok(Driver::Postgres),
            "sqlite" => Ok(Driver::Sqlite),
            "sqlsrv" | "mssql" => Ok(Driver::SqlServer),
            _ => Err(AnalyzeError::UnsupportedDriver(name.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::MySql => "mysql",
            Driver::Postgres => "pgsql",
            Driver::Sqlite => "sqlite",
            Driver::SqlServer => "sqlsrv",
        }
    }

    fn dialect(&self) -> Box<dyn Dialect> {
        match self {
            Driver::MySql => Box::new(mysql::MySql),
            Driver::Postgres => Box::new(postgres::Postgres),
            Driver::Sqlite => Box::new(sqlite::Sqlite),
            Driver::SqlServer => Box::new(sqlsrv::SqlServer),
        }
    }
}

impl std::fmt::Display for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Engine-specific metadata queries.
pub(crate) trait Dialect {
    fn tables(&self, conn: &dyn SchemaConnection) -> Result<Vec<String>, QueryError>;

    /// Column names with their raw types, in table order.
    fn columns(&self, conn: &dyn SchemaConnection, table: &str)
        -> Result<Vec<(String, String)>, QueryError>;

    fn primary_key(&self, conn: &dyn SchemaConnection, table: &str)
        -> Result<Option<String>, QueryError>;

    fn foreign_keys(&self, conn: &dyn SchemaConnection, table: &str)
        -> Result<Vec<ForeignKey>, QueryError>;

    fn indexes(&self, conn: &dyn SchemaConnection, table: &str) -> Result<Vec<Index>, QueryError>;

    fn nullable(&self, conn: &dyn SchemaConnection, table: &str, column: &str)
        -> Result<bool, QueryError>;

    fn default_value(&self, conn: &dyn SchemaConnection, table: &str, column: &str)
        -> Result<Option<String>, QueryError>;

    fn auto_increment(&self, conn: &dyn SchemaConnection, table: &str, column: &str)
        -> Result<bool, QueryError>;

    fn unsigned(&self, conn: &dyn SchemaConnection, table: &str, column: &str)
        -> Result<bool, QueryError>;

    fn length(&self, conn: &dyn SchemaConnection, table: &str, column: &str)
        -> Result<Option<u32>, QueryError>;
}

/// Escape a name for use inside a single-quoted SQL literal.
pub(crate) fn quote_literal(name: &str) -> String {
    name.replace('\'', "''")
}

/// Group `(index, column, unique, primary)` rows into indexes, keeping the
/// order indexes first appear in.
pub(crate) fn group_indexes(rows: impl IntoIterator<Item = (String, String, bool, bool)>) -> Vec<Index> {
    let mut indexes: Vec<Index> = Vec::new();
    for (name, column, unique, primary) in rows {
        match indexes.iter_mut().find(|i| i.name == name) {
            Some(index) => index.columns.push(column),
            None => indexes.push(Index {
                name,
                columns: vec![column],
                unique,
                primary,
            }),
        }
    }
    indexes
}

/// Lower-case base type name: `VARCHAR(255)` -> `varchar`, `int unsigned` -> `int`.
pub(crate) fn normalize_type(raw: &str) -> String {
    raw.trim()
        .split(|c: char| c == '(' || c.is_whitespace())
        .next()
        .unwrap_or("")
        .to_lowercase()
}

/// Which tables of a connection to analyze.
#[derive(Debug, Clone)]
pub struct TableSelection {
    include: Vec<String>,
    exclude: GlobSet,
}

impl Default for TableSelection {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: GlobSet::empty(),
        }
    }
}

impl TableSelection {
    /// `include` empty means every table. `exclude` entries are glob patterns.
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for pattern in exclude {
            builder.add(Glob::new(pattern.as_ref())?);
        }
        Ok(Self {
            include: include.iter().map(|s| s.as_ref().to_string()).collect(),
            exclude: builder.build()?,
        })
    }

    pub fn accepts(&self, table: &str) -> bool {
        if table == MIGRATIONS_TABLE {
            return false;
        }
        if !self.include.is_empty() && !self.include.iter().any(|t| t == table) {
            return false;
        }
        !self.exclude.is_match(table)
    }
}

pub struct TableAnalyzer<'a> {
    conn: &'a dyn SchemaConnection,
    driver: Driver,
    dialect: Box<dyn Dialect>,
}

impl<'a> TableAnalyzer<'a> {
    /// Fails with `UnsupportedDriver` when no dialect matches the connection.
    pub fn new(conn: &'a dyn SchemaConnection) -> Result<Self, AnalyzeError> {
        let driver = Driver::parse(conn.driver_name())?;
        Ok(Self {
            conn,
            driver,
            dialect: driver.dialect(),
        })
    }

    pub fn driver(&self) -> Driver {
        self.driver
    }

    /// Tables on the connection accepted by `selection`, sorted.
    pub fn tables(&self, selection: &TableSelection) -> Result<Vec<String>, AnalyzeError> {
        let mut tables: Vec<String> = self
            .dialect
            .tables(self.conn)?
            .into_iter()
            .filter(|t| selection.accepts(t))
            .collect();
        tables.sort();
        tables.dedup();
        Ok(tables)
    }

    pub fn analyze_table(&self, table: &str) -> Result<TableDescriptor, AnalyzeError> {
        if !self.dialect.tables(self.conn)?.iter().any(|t| t == table) {
            return Err(AnalyzeError::NotFound {
                kind: SubjectKind::Table,
                name: table.to_string(),
            });
        }

        let raw_columns = self.absorb(table, "columns", self.dialect.columns(self.conn, table));
        let names: Vec<&str> = raw_columns.iter().map(|(n, _)| n.as_str()).collect();

        let columns = raw_columns
            .iter()
            .map(|(name, raw_type)| self.column(table, name, raw_type))
            .collect();

        let foreign_keys = self
            .absorb(table, "foreign keys", self.dialect.foreign_keys(self.conn, table))
            .into_iter()
            .map(|fk| (fk.local_column.clone(), fk))
            .collect();
        let indexes = self
            .absorb(table, "indexes", self.dialect.indexes(self.conn, table))
            .into_iter()
            .map(|ix| (ix.name.clone(), ix))
            .collect();

        let descriptor = TableDescriptor {
            subject: SubjectName {
                qualified_name: table.to_string(),
                short_name: table.to_string(),
                namespace: self.driver.as_str().to_string(),
            },
            table: table.to_string(),
            model_name: naming::model_name_for_table(table),
            primary_key: self.absorb(
                table,
                "primary key",
                self.dialect.primary_key(self.conn, table),
            ),
            has_timestamps: has_timestamps(&names),
            has_soft_deletes: has_soft_deletes(&names),
            columns,
            foreign_keys,
            indexes,
        };

        debug!(
            table,
            driver = %self.driver,
            columns = descriptor.columns.len(),
            "analyzed table"
        );
        Ok(descriptor)
    }

    fn column(&self, table: &str, name: &str, raw_type: &str) -> Column {
        let d = &self.dialect;
        let c = self.conn;
        Column {
            name: name.to_string(),
            type_name: normalize_type(raw_type),
            nullable: self.absorb(table, "nullable", d.nullable(c, table, name)),
            default: self.absorb(table, "default", d.default_value(c, table, name)),
            auto_increment: self.absorb(table, "auto increment", d.auto_increment(c, table, name)),
            unsigned: self.absorb(table, "unsigned", d.unsigned(c, table, name)),
            length: self.absorb(table, "length", d.length(c, table, name)),
        }
    }

    /// Zero value for a failed metadata query.
    fn absorb<T: Default>(&self, table: &str, what: &str, result: Result<T, QueryError>) -> T {
        result.unwrap_or_else(|err| {
            debug!(table, what, error = %err, "metadata query failed");
            T::default()
        })
    }
}

impl Analyzer for TableAnalyzer<'_> {
    fn kind(&self) -> SubjectKind {
        SubjectKind::Table
    }

    fn analyze(&self, identifier: &str) -> Result<Descriptor, AnalyzeError> {
        self.analyze_table(identifier).map(Descriptor::Table)
    }
}
