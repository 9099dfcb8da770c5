//! Schema Inspector
//!
//! Reads base tables of the `public` schema and their columns from
//! `information_schema`. One column query is issued per table; output is
//! ordered by table name, then by ordinal position.

use crate::database::schema::{ColumnInfo, TableInfo};
use crate::error::Result;
use sqlx::{postgres::PgPool, Row};

// information_schema exposes domain types (sql_identifier, yes_or_no, ...);
// cast to text so they decode as String.
const TABLES_QUERY: &str = r#"
    SELECT table_name::text AS table_name
    FROM information_schema.tables
    WHERE table_schema = 'public' AND table_type = 'BASE TABLE'
    ORDER BY table_name
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT
        column_name::text AS column_name,
        data_type::text AS data_type,
        is_nullable::text AS is_nullable,
        column_default::text AS column_default
    FROM information_schema.columns
    WHERE table_schema = 'public' AND table_name = $1
    ORDER BY ordinal_position
"#;

/// Describe every base table in the public schema
///
/// An empty schema yields an empty list.
pub async fn describe_public_schema(pool: &PgPool) -> Result<Vec<TableInfo>> {
    let table_rows = sqlx::query(TABLES_QUERY).fetch_all(pool).await?;

    let mut tables = Vec::with_capacity(table_rows.len());
    for row in table_rows {
        let table_name: String = row.try_get("table_name")?;
        let columns = describe_columns(pool, &table_name).await?;
        tables.push(TableInfo {
            table_name,
            columns,
        });
    }

    Ok(tables)
}

/// Columns of one public table in ordinal order
pub async fn describe_columns(pool: &PgPool, table_name: &str) -> Result<Vec<ColumnInfo>> {
    let rows = sqlx::query(COLUMNS_QUERY)
        .bind(table_name)
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| -> Result<ColumnInfo> {
            let column_name: String = row.try_get("column_name")?;
            let data_type: String = row.try_get("data_type")?;
            let is_nullable: String = row.try_get("is_nullable")?;
            let column_default: Option<String> = row.try_get("column_default")?;
            Ok(ColumnInfo::from_catalog(
                column_name,
                data_type,
                &is_nullable,
                column_default,
            ))
        })
        .collect()
}
