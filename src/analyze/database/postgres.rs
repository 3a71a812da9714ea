//! PostgreSQL, limited to the `public` schema for table listing.

use regex::Regex;

use super::{group_indexes, quote_literal, Dialect, QueryError, Row, SchemaConnection};
use crate::descriptor::{ForeignKey, Index};

pub(crate) struct Postgres;

fn column_info(
    conn: &dyn SchemaConnection,
    select: &str,
    table: &str,
    column: &str,
) -> Result<Option<Row>, QueryError> {
    let sql = format!(
        "SELECT {} FROM information_schema.columns \
         WHERE table_name = '{}' AND column_name = '{}'",
        select,
        quote_literal(table),
        quote_literal(column)
    );
    Ok(conn.select(&sql)?.into_iter().next())
}

impl Dialect for Postgres {
    fn tables(&self, conn: &dyn SchemaConnection) -> Result<Vec<String>, QueryError> {
        Ok(conn
            .select("SELECT table_name FROM information_schema.tables WHERE table_schema = 'public'")?
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
            "SELECT column_name, data_type FROM information_schema.columns \
             WHERE table_name = '{}' ORDER BY ordinal_position",
            quote_literal(table)
        );
        Ok(conn
            .select(&sql)?
            .iter()
            .filter_map(|r| Some((r.get_str("column_name")?, r.get_str("data_type")?)))
            .collect())
    }

    fn primary_key(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
    ) -> Result<Option<String>, QueryError> {
        let sql = format!(
            "SELECT a.attname FROM pg_index i \
             JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey) \
             WHERE i.indrelid = '{}'::regclass AND i.indisprimary",
            quote_literal(table)
        );
        Ok(conn
            .select(&sql)?
            .first()
            .and_then(|r| r.get_str("attname")))
    }

    fn foreign_keys(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
    ) -> Result<Vec<ForeignKey>, QueryError> {
        let sql = format!(
            "SELECT kcu.column_name AS local_column, ccu.table_name AS foreign_table, \
             ccu.column_name AS foreign_column, rc.delete_rule AS on_delete, \
             rc.update_rule AS on_update \
             FROM information_schema.table_constraints AS tc \
             JOIN information_schema.key_column_usage AS kcu \
             ON tc.constraint_name = kcu.constraint_name \
             JOIN information_schema.constraint_column_usage AS ccu \
             ON ccu.constraint_name = tc.constraint_name \
             LEFT JOIN information_schema.referential_constraints AS rc \
             ON rc.constraint_name = tc.constraint_name \
             WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_name = '{}'",
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
        let sql = format!(
            "SELECT i.relname AS index_name, a.attname AS column_name, \
             ix.indisunique AS is_unique, ix.indisprimary AS is_primary \
             FROM pg_class t, pg_class i, pg_index ix, pg_attribute a \
             WHERE t.oid = ix.indrelid AND i.oid = ix.indexrelid \
             AND a.attrelid = t.oid AND a.attnum = ANY(ix.indkey) \
             AND t.relkind = 'r' AND t.relname = '{}' \
             ORDER BY i.relname, a.attnum",
            quote_literal(table)
        );
        let rows = conn.select(&sql)?;
        Ok(group_indexes(rows.iter().filter_map(|r| {
            Some((
                r.get_str("index_name")?,
                r.get_str("column_name")?,
                r.get_bool("is_unique"),
                r.get_bool("is_primary"),
            ))
        })))
    }

    fn nullable(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
        column: &str,
    ) -> Result<bool, QueryError> {
        Ok(column_info(conn, "is_nullable", table, column)?
            .map(|r| r.get_bool("is_nullable"))
            .unwrap_or(false))
    }

    fn default_value(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
        column: &str,
    ) -> Result<Option<String>, QueryError> {
        Ok(column_info(conn, "column_default", table, column)?
            .and_then(|r| r.get_str("column_default")))
    }

    fn auto_increment(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
        column: &str,
    ) -> Result<bool, QueryError> {
        let sql = format!(
            "SELECT pg_get_serial_sequence('{}', '{}') IS NOT NULL AS is_auto_increment",
            quote_literal(table),
            quote_literal(column)
        );
        Ok(conn
            .select(&sql)?
            .first()
            .map(|r| r.get_bool("is_auto_increment"))
            .unwrap_or(false))
    }

    /// No unsigned types; a `CHECK ((col >= 0))` constraint counts as one.
    fn unsigned(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
        column: &str,
    ) -> Result<bool, QueryError> {
        let sql = format!(
            "SELECT pg_get_constraintdef(c.oid) AS constraint_def FROM pg_constraint c \
             JOIN pg_namespace n ON n.oid = c.connamespace \
             JOIN pg_class t ON t.oid = c.conrelid \
             JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(c.conkey) \
             WHERE n.nspname = current_schema() AND t.relname = '{}' \
             AND a.attname = '{}' AND c.contype = 'c'",
            quote_literal(table),
            quote_literal(column)
        );
        let pattern = format!(r"\(\({} >= 0\)\)", regex::escape(column));
        let Ok(check) = Regex::new(&pattern) else {
            return Ok(false);
        };
        Ok(conn
            .select(&sql)?
            .iter()
            .filter_map(|r| r.get_str("constraint_def"))
            .any(|def| check.is_match(&def)))
    }

    fn length(
        &self,
        conn: &dyn SchemaConnection,
        table: &str,
        column: &str,
    ) -> Result<Option<u32>, QueryError> {
        Ok(
            column_info(conn, "character_maximum_length", table, column)?
                .and_then(|r| r.get_i64("character_maximum_length"))
                .and_then(|len| u32::try_from(len).ok()),
        )
    }
}
