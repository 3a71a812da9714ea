//! SQLite, read through its pragmas and the stored `CREATE TABLE` text.

use regex::RegexBuilder;

use super::{quote_literal, Dialect, QueryError, Row, SchemaConnection};
use crate::descriptor::{ForeignKey, Index};

pub(crate) struct Sqlite;

fn table_info(conn: &dyn SchemaConnection, table: &str) -> Result<Vec<Row>, QueryError> {
    conn.select(&format!("PRAGMA table_info('{}')", quote_literal(table)))
}

fn column_info(
    conn: &dyn SchemaConnection,
    table: &str,
    column: &str,
) -> Result<Option<Row>, QueryError> {
    Ok(table_info(conn, table)?
        .into_iter()
        .find(|r| r.get_str("name").as_deref() == Some(column)))
}

fn create_sql(conn: &dyn SchemaConnection, table: &str) -> Result<Option<String>, QueryError> {
    let sql = format!(
        "SELECT sql FROM sqlite_master WHERE type='table' AND name='{}'",
        quote_literal(table)
    );
    Ok(conn.select(&sql)?.first().and_then(|r| r.get_str("sql")))
}

impl Dialect for Sqlite {
    fn tables(&self, conn: &dyn SchemaConnection) -> Result<Vec<String>, QueryError> {
        Ok(conn
            .select("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")?
            .iter()
            .filter_map(|r| r.get_str("name"))
            .collect())
    }

    fn columns(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
    ) -> Result<Vec<(String, String)>, QueryError> {
        Ok(table_info(conn, table)?
            .iter()
            .filter_map(|r| Some((r.get_str("name")?, r.get_str("type").unwrap_or_default())))
            .collect())
    }

    fn primary_key(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
    ) -> Result<Option<String>, QueryError> {
        let rows = table_info(conn, table)?;
        let mut keyed: Vec<&Row> = rows
            .iter()
            .filter(|r| r.get_i64("pk").unwrap_or(0) > 0)
            .collect();
        keyed.sort_by_key(|r| r.get_i64("pk").unwrap_or(0));
        Ok(keyed.first().and_then(|r| r.get_str("name")))
    }

    fn foreign_keys(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
    ) -> Result<Vec<ForeignKey>, QueryError> {
        let sql = format!("PRAGMA foreign_key_list('{}')", quote_literal(table));
        Ok(conn
            .select(&sql)?
            .iter()
            .filter_map(|r| {
                Some(ForeignKey {
                    local_column: r.get_str("from")?,
                    foreign_table: r.get_str("table")?,
                    foreign_column: r.get_str("to").unwrap_or_else(|| "id".to_string()),
                    on_delete: r.get_str("on_delete"),
                    on_update: r.get_str("on_update"),
                })
            })
            .collect())
    }

    fn indexes(&self, conn: &dyn SchemaConnection, table: &str) -> Result<Vec<Index>, QueryError> {
        let autoindex = format!("sqlite_autoindex_{}_1", table);
        let list = conn.select(&format!("PRAGMA index_list('{}')", quote_literal(table)))?;

        let mut indexes = Vec::with_capacity(list.len());
        for entry in &list {
            let Some(name) = entry.get_str("name") else {
                continue;
            };
            let columns = conn
                .select(&format!("PRAGMA index_info('{}')", quote_literal(&name)))?
                .iter()
                .filter_map(|r| r.get_str("name"))
                .collect();
            let primary = entry.get_str("origin").as_deref() == Some("pk") || name == autoindex;
            indexes.push(Index {
                unique: entry.get_bool("unique"),
                primary,
                name,
                columns,
            });
        }
        Ok(indexes)
    }

    fn nullable(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
        column: &str,
    ) -> Result<bool, QueryError> {
        Ok(column_info(conn, table, column)?
            .map(|r| r.get_i64("notnull") == Some(0))
            .unwrap_or(false))
    }

    fn default_value(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
        column: &str,
    ) -> Result<Option<String>, QueryError> {
        Ok(column_info(conn, table, column)?.and_then(|r| r.get_str("dflt_value")))
    }

    /// Only a single-column `INTEGER PRIMARY KEY` aliases the rowid.
    fn auto_increment(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
        column: &str,
    ) -> Result<bool, QueryError> {
        let rows = table_info(conn, table)?;
        let key_columns = rows
            .iter()
            .filter(|r| r.get_i64("pk").unwrap_or(0) > 0)
            .count();
        if key_columns != 1 {
            return Ok(false);
        }
        Ok(rows
            .iter()
            .find(|r| r.get_str("name").as_deref() == Some(column))
            .map(|r| {
                r.get_i64("pk") == Some(1)
                    && r.get_str("type")
                        .map(|t| t.eq_ignore_ascii_case("INTEGER"))
                        .unwrap_or(false)
            })
            .unwrap_or(false))
    }

    fn unsigned(
        &self,
        _conn: &dyn SchemaConnection,
        _table: &str,
        _column: &str,
    ) -> Result<bool, QueryError> {
        Ok(false)
    }

    /// Read from the declared type in the stored `CREATE TABLE`, e.g. `varchar(120)`.
    fn length(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
        column: &str,
    ) -> Result<Option<u32>, QueryError> {
        let Some(sql) = create_sql(conn, table)? else {
            return Ok(None);
        };
        let pattern = format!(
            r#"(?:^|[(,\s])[`"\[]?{}[`"\]]?\s+\w+\((\d+)\)"#,
            regex::escape(column)
        );
        let Ok(re) = RegexBuilder::new(&pattern).case_insensitive(true).build() else {
            return Ok(None);
        };
        Ok(re
            .captures(&sql)
            .and_then(|caps| caps[1].parse::<u32>().ok()))
    }
}
