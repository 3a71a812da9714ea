use super::{group_indexes, quote_literal, Dialect, QueryError, Row, SchemaConnection};
use crate::descriptor::{ForeignKey, Index};

/// SQL Server through `INFORMATION_SCHEMA` and the `sys` catalog views.
pub(crate) struct SqlServer;

fn column_info(
    conn: &dyn SchemaConnection,
    select: &str,
    table: &str,
    column: &str,
) -> Result<Option<Row>, QueryError> {
    let sql = format!(
        "SELECT {} FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = '{}' AND COLUMN_NAME = '{}'",
        select,
        quote_literal(table),
        quote_literal(column)
    );
    Ok(conn.select(&sql)?.into_iter().next())
}

impl Dialect for SqlServer {
    fn tables(&self, conn: &dyn SchemaConnection) -> Result<Vec<String>, QueryError> {
        Ok(conn
            .select("SELECT table_name FROM information_schema.tables WHERE table_type = 'BASE TABLE'")?
            .iter()
            .filter_map(|r| r.get_str("table_name"))
            .collect())
    }

    fn columns(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
    ) -> Result<Vec<(String, String)>, QueryError> {
        let sql = format!(
            "SELECT COLUMN_NAME, DATA_TYPE FROM INFORMATION_SCHEMA.COLUMNS \
             WHERE TABLE_NAME = '{}' ORDER BY ORDINAL_POSITION",
            quote_literal(table)
        );
        Ok(conn
            .select(&sql)?
            .iter()
            .filter_map(|r| Some((r.get_str("COLUMN_NAME")?, r.get_str("DATA_TYPE")?)))
            .collect())
    }

    fn primary_key(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
    ) -> Result<Option<String>, QueryError> {
        let sql = format!(
            "SELECT column_name FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE \
             WHERE OBJECTPROPERTY(OBJECT_ID(constraint_name), 'IsPrimaryKey') = 1 \
             AND table_name = '{}'",
            quote_literal(table)
        );
        Ok(conn
            .select(&sql)?
            .first()
            .and_then(|r| r.get_str("column_name")))
    }

    fn foreign_keys(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
    ) -> Result<Vec<ForeignKey>, QueryError> {
        let sql = format!(
            "SELECT c1.name AS column_name, OBJECT_NAME(fk.referenced_object_id) AS foreign_table_name, \
             c2.name AS foreign_column_name, fk.delete_referential_action_desc AS on_delete, \
             fk.update_referential_action_desc AS on_update \
             FROM sys.foreign_keys fk \
             INNER JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id \
             INNER JOIN sys.columns c1 ON fkc.parent_column_id = c1.column_id AND fkc.parent_object_id = c1.object_id \
             INNER JOIN sys.columns c2 ON fkc.referenced_column_id = c2.column_id AND fkc.referenced_object_id = c2.object_id \
             WHERE OBJECT_NAME(fk.parent_object_id) = '{}'",
            quote_literal(table)
        );
        Ok(conn
            .select(&sql)?
            .iter()
            .filter_map(|r| {
                Some(ForeignKey {
                    local_column: r.get_str("column_name")?,
                    foreign_table: r.get_str("foreign_table_name")?,
                    foreign_column: r.get_str("foreign_column_name")?,
                    // sys views spell rules with underscores (NO_ACTION, SET_NULL)
                    on_delete: r.get_str("on_delete").map(|s| s.replace('_', " ")),
                    on_update: r.get_str("on_update").map(|s| s.replace('_', " ")),
                })
            })
            .collect())
    }

    fn indexes(&self, conn: &dyn SchemaConnection, table: &str) -> Result<Vec<Index>, QueryError> {
        let sql = format!(
            "SELECT i.name AS index_name, c.name AS column_name, i.is_unique, i.is_primary_key \
             FROM sys.indexes i \
             INNER JOIN sys.index_columns ic ON i.object_id = ic.object_id AND i.index_id = ic.index_id \
             INNER JOIN sys.columns c ON ic.object_id = c.object_id AND ic.column_id = c.column_id \
             INNER JOIN sys.tables t ON i.object_id = t.object_id \
             WHERE t.name = '{}' ORDER BY i.name, ic.key_ordinal",
            quote_literal(table)
        );
        let rows = conn.select(&sql)?;
        Ok(group_indexes(rows.iter().filter_map(|r| {
            Some((
                r.get_str("index_name")?,
                r.get_str("column_name")?,
                r.get_bool("is_unique"),
                r.get_bool("is_primary_key"),
            ))
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
        let sql = format!(
            "SELECT COLUMNPROPERTY(OBJECT_ID('{}'), '{}', 'IsIdentity') AS is_identity",
            quote_literal(table),
            quote_literal(column)
        );
        Ok(conn
            .select(&sql)?
            .first()
            .map(|r| r.get_bool("is_identity"))
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

    fn length(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
        column: &str,
    ) -> Result<Option<u32>, QueryError> {
        // -1 marks (max) columns
        Ok(
            column_info(conn, "CHARACTER_MAXIMUM_LENGTH", table, column)?
                .and_then(|r| r.get_i64("CHARACTER_MAXIMUM_LENGTH"))
                .and_then(|len| u32::try_from(len).ok()),
        )
    }
}
