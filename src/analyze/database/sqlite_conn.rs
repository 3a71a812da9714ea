//! [`SchemaConnection`] over a local SQLite file.

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::path::Path;
use tracing::debug;

use super::{QueryError, Row, SchemaConnection};

pub struct SqliteConnection {
    conn: Connection,
}

impl SqliteConnection {
    pub fn open(path: &Path) -> Result<Self, QueryError> {
        debug!(path = %path.display(), "opening sqlite database");
        let conn = Connection::open(path).map_err(|e| QueryError::Connection(e.to_string()))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, QueryError> {
        let conn =
            Connection::open_in_memory().map_err(|e| QueryError::Connection(e.to_string()))?;
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Run DDL or seed statements.
    pub fn execute_batch(&self, sql: &str) -> Result<(), QueryError> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| QueryError::Failed(e.to_string()))
    }
}

fn to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Value::from(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

impl SchemaConnection for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    fn select(&self, sql: &str) -> Result<Vec<Row>, QueryError> {
        let failed = |e: rusqlite::Error| QueryError::Failed(e.to_string());

        let mut stmt = self.conn.prepare(sql).map_err(failed)?;
        let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();
        let mut rows = stmt.query([]).map_err(failed)?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(failed)? {
            let mut values = Vec::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                values.push((name.clone(), to_json(row.get_ref(i).map_err(failed)?)));
            }
            out.push(values.into_iter().collect());
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_maps_value_types() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (i INTEGER, r REAL, s TEXT, n TEXT); INSERT INTO t VALUES (7, 1.5, 'x', NULL);")
            .unwrap();
        let rows = conn.select("SELECT i, r, s, n FROM t").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_i64("i"), Some(7));
        assert_eq!(rows[0].get("r"), Some(&serde_json::json!(1.5)));
        assert_eq!(rows[0].get_str("s").as_deref(), Some("x"));
        assert_eq!(rows[0].get("n"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn test_bad_sql_is_a_query_error() {
        let conn = SqliteConnection::open_in_memory().unwrap();
        assert!(matches!(
            conn.select("SELECT * FROM nowhere"),
            Err(QueryError::Failed(_))
        ));
    }
}
