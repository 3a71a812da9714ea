//! MySQL and MariaDB.

use super::{group_indexes, quote_literal, Dialect, QueryError, Row, SchemaConnection};
use crate::descriptor::{ForeignKey, Index};

pub(crate) struct MySql;

/// Escape a name for use inside backticks.
fn quote_ident(name: &str) -> String {
    name.replace('`', "``")
}

fn column_info(
    conn: &dyn SchemaConnection,
    select: &str,
    table: &str,
    column: &str,
) -> Result<Option<Row>, QueryError> {
    let sql = format!(
        "SELECT {} FROM INFORMATION_SCHEMA.COLUMNS \
         WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = '{}' AND COLUMN_NAME = '{}'",
        select,
        quote_literal(table),
        quote_literal(column)
    );
    Ok(conn.select(&sql)?.into_iter().next())
}

impl Dialect for MySql {
    fn tables(&self, conn: &dyn SchemaConnection) -> Result<Vec<String>, QueryError> {
        Ok(conn
            .select("SHOW TABLES")?
            .iter()
            .filter_map(Row::first_str)
            .collect())
    }

    fn columns(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
    ) -> Result<Vec<(String, String)>, QueryError> {
        let sql = format!(
            "SELECT COLUMN_NAME, COLUMN_TYPE FROM INFORMATION_SCHEMA.COLUMNS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = '{}' ORDER BY ORDINAL_POSITION",
            quote_literal(table)
        );
        Ok(conn
            .select(&sql)?
            .iter()
            .filter_map(|r| Some((r.get_str("COLUMN_NAME")?, r.get_str("COLUMN_TYPE")?)))
            .collect())
    }

    fn primary_key(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
    ) -> Result<Option<String>, QueryError> {
        let sql = format!(
            "SHOW KEYS FROM `{}` WHERE Key_name = 'PRIMARY'",
            quote_ident(table)
        );
        Ok(conn
            .select(&sql)?
            .first()
            .and_then(|r| r.get_str("Column_name")))
    }

    fn foreign_keys(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
    ) -> Result<Vec<ForeignKey>, QueryError> {
        let sql = format!(
            "SELECT k.COLUMN_NAME AS local_column, k.REFERENCED_TABLE_NAME AS foreign_table, \
             k.REFERENCED_COLUMN_NAME AS foreign_column, r.DELETE_RULE AS on_delete, \
             r.UPDATE_RULE AS on_update \
             FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE k \
             LEFT JOIN INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS r \
             ON r.CONSTRAINT_SCHEMA = k.TABLE_SCHEMA AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME \
             WHERE k.TABLE_SCHEMA = DATABASE() AND k.TABLE_NAME = '{}' \
             AND k.REFERENCED_TABLE_NAME IS NOT NULL",
            quote_literal(table)
        );
        Ok(conn
            .select(&sql)?
            .iter()
            .filter_map(|r| {
                Some(ForeignKey {
                    local_column: r.get_str("local_column")?,
                    foreign_table: r.get_str("foreign_table")?,
                    foreign_column: r.get_str("foreign_column")?,
                    on_delete: r.get_str("on_delete"),
                    on_update: r.get_str("on_update"),
                })
            })
            .collect())
    }

    fn indexes(&self, conn: &dyn SchemaConnection, table: &str) -> Result<Vec<Index>, QueryError> {
        let sql = format!("SHOW INDEX FROM `{}`", quote_ident(table));
        let rows = conn.select(&sql)?;
        Ok(group_indexes(rows.iter().filter_map(|r| {
            let name = r.get_str("Key_name")?;
            let column = r.get_str("Column_name")?;
            let unique = r.get_i64("Non_unique") == Some(0);
            let primary = name == "PRIMARY";
            Some((name, column, unique, primary))
        })))
    }

    fn nullable(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
        column: &str,
    ) -> Result<bool, QueryError> {
        Ok(column_info(conn, "IS_NULLABLE", table, column)?
            .and_then(|r| r.get_str("IS_NULLABLE"))
            .map(|v| v.eq_ignore_ascii_case("YES"))
            .unwrap_or(false))
    }

    fn default_value(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
        column: &str,
    ) -> Result<Option<String>, QueryError> {
        Ok(column_info(conn, "COLUMN_DEFAULT", table, column)?
            .and_then(|r| r.get_str("COLUMN_DEFAULT")))
    }

    fn auto_increment(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
        column: &str,
    ) -> Result<bool, QueryError> {
        Ok(column_info(conn, "EXTRA", table, column)?
            .and_then(|r| r.get_str("EXTRA"))
            .map(|v| v.to_lowercase().contains("auto_increment"))
            .unwrap_or(false))
    }

    fn unsigned(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
        column: &str,
    ) -> Result<bool, QueryError> {
        Ok(column_info(conn, "COLUMN_TYPE", table, column)?
            .and_then(|r| r.get_str("COLUMN_TYPE"))
            .map(|v| v.to_lowercase().contains("unsigned"))
            .unwrap_or(false))
    }

    fn length(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
        column: &str,
    ) -> Result<Option<u32>, QueryError> {
        let row = column_info(
            conn,
            "CHARACTER_MAXIMUM_LENGTH, NUMERIC_PRECISION, DATA_TYPE",
            table,
            column,
        )?;
        let Some(row) = row else {
            return Ok(None);
        };
        if let Some(len) = row.get_i64("CHARACTER_MAXIMUM_LENGTH") {
            return Ok(u32::try_from(len).ok());
        }
        let integer_type = row
            .get_str("DATA_TYPE")
            .map(|t| {
                matches!(
                    t.to_lowercase().as_str(),
                    "int" | "bigint" | "mediumint" | "smallint" | "tinyint"
                )
            })
            .unwrap_or(false);
        if integer_type {
            return Ok(row
                .get_i64("NUMERIC_PRECISION")
                .and_then(|p| u32::try_from(p).ok()));
        }
        Ok(None)
    }
}
