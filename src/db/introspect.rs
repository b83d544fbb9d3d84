//! MySQL schema introspection via INFORMATION_SCHEMA.
//!
//! Opens one connection, reads tables, columns and foreign-key edges for a
//! single named schema, and closes the connection before returning. Any
//! connectivity or permission failure propagates; there is no retry.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use sqlx::mysql::MySqlConnection;
use sqlx::{Connection, Row};
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    /// "YES" or "NO", as reported by INFORMATION_SCHEMA.
    pub nullable: String,
    pub default: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
    pub constraint_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Vec<ColumnInfo>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub tables: BTreeMap<String, TableSchema>,
}

/// Introspect the named schema over a fresh connection.
pub async fn introspect_schema(database_url: &str, schema_name: &str) -> Result<DatabaseSchema> {
    let mut conn = MySqlConnection::connect(database_url).await?;
    let result = introspect_with(&mut conn, schema_name).await;
    let _ = conn.close().await;
    let schema = result?;
    info!(tables = schema.tables.len(), "introspected database schema");
    Ok(schema)
}

async fn introspect_with(conn: &mut MySqlConnection, schema_name: &str) -> Result<DatabaseSchema> {
    let mut schema = DatabaseSchema::default();

    let table_rows = sqlx::query(
        r#"
        SELECT TABLE_NAME
        FROM INFORMATION_SCHEMA.TABLES
        WHERE TABLE_SCHEMA = ?
        "#,
    )
    .bind(schema_name)
    .fetch_all(&mut *conn)
    .await?;

    for row in &table_rows {
        let name: String = row.try_get("TABLE_NAME")?;
        schema.tables.insert(name, TableSchema::default());
    }

    let col_rows = sqlx::query(
        r#"
        SELECT TABLE_NAME, COLUMN_NAME, DATA_TYPE, IS_NULLABLE,
               COLUMN_KEY, COLUMN_DEFAULT
        FROM INFORMATION_SCHEMA.COLUMNS
        WHERE TABLE_SCHEMA = ?
        ORDER BY TABLE_NAME, ORDINAL_POSITION
        "#,
    )
    .bind(schema_name)
    .fetch_all(&mut *conn)
    .await?;

    for row in &col_rows {
        let table: String = row.try_get("TABLE_NAME")?;
        let Some(entry) = schema.tables.get_mut(&table) else {
            continue;
        };
        let column = ColumnInfo {
            name: row.try_get("COLUMN_NAME")?,
            data_type: row.try_get("DATA_TYPE")?,
            nullable: row.try_get("IS_NULLABLE")?,
            default: row.try_get("COLUMN_DEFAULT")?,
        };
        let key: String = row.try_get("COLUMN_KEY")?;
        if key == "PRI" {
            entry.primary_key.push(column.name.clone());
        }
        entry.columns.push(column);
    }

    let fk_rows = sqlx::query(
        r#"
        SELECT TABLE_NAME, COLUMN_NAME, CONSTRAINT_NAME,
               REFERENCED_TABLE_NAME, REFERENCED_COLUMN_NAME
        FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE
        WHERE TABLE_SCHEMA = ?
          AND REFERENCED_TABLE_NAME IS NOT NULL
        "#,
    )
    .bind(schema_name)
    .fetch_all(&mut *conn)
    .await?;

    for row in &fk_rows {
        let table: String = row.try_get("TABLE_NAME")?;
        let Some(entry) = schema.tables.get_mut(&table) else {
            continue;
        };
        entry.foreign_keys.push(ForeignKey {
            column: row.try_get("COLUMN_NAME")?,
            references_table: row.try_get("REFERENCED_TABLE_NAME")?,
            references_column: row.try_get("REFERENCED_COLUMN_NAME")?,
            constraint_name: row.try_get("CONSTRAINT_NAME")?,
        });
    }

    Ok(schema)
}
