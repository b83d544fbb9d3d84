//! SQL execution against MySQL.
//!
//! A fresh connection per statement, closed on every exit path. The SQL text
//! itself is the trust boundary here: it is produced under the closed-world
//! generation constraints and executed as-is. At most [`MAX_RESULT_ROWS`]
//! rows are fetched regardless of what the query would produce.

use crate::error::Result;
use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::Value;
use sqlx::mysql::{MySqlConnection, MySqlRow};
use sqlx::{Column, Connection, Row as SqlxRow};
use tracing::{debug, info};

/// Hard cap on rows returned from a single executed query.
pub const MAX_RESULT_ROWS: usize = 500;

/// One result row: column name -> JSON value, in projection order.
pub type Row = serde_json::Map<String, Value>;

/// Seam for the orchestrator. Production code uses [`MySqlExecutor`]; tests
/// substitute fakes with canned rows.
#[async_trait]
pub trait SqlRunner: Send + Sync {
    async fn run(&self, sql: &str) -> Result<Vec<Row>>;
}

#[async_trait]
impl<T: SqlRunner + ?Sized> SqlRunner for std::sync::Arc<T> {
    async fn run(&self, sql: &str) -> Result<Vec<Row>> {
        (**self).run(sql).await
    }
}

pub struct MySqlExecutor {
    database_url: String,
    max_rows: usize,
}

impl MySqlExecutor {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_rows: MAX_RESULT_ROWS,
        }
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }
}

#[async_trait]
impl SqlRunner for MySqlExecutor {
    async fn run(&self, sql: &str) -> Result<Vec<Row>> {
        debug!(sql, "executing SQL");
        let mut conn = MySqlConnection::connect(&self.database_url).await?;
        let fetched = fetch_capped(&mut conn, sql, self.max_rows).await;
        let _ = conn.close().await;
        let rows = fetched?;
        info!(rows = rows.len(), "query executed");
        Ok(rows)
    }
}

async fn fetch_capped(conn: &mut MySqlConnection, sql: &str, cap: usize) -> Result<Vec<Row>> {
    let mut stream = sqlx::query(sql).fetch(conn);
    let mut rows = Vec::new();
    while let Some(row) = stream.try_next().await? {
        rows.push(row_to_json(&row));
        if rows.len() >= cap {
            break;
        }
    }
    Ok(rows)
}

fn row_to_json(row: &MySqlRow) -> Row {
    let mut map = Row::new();
    for (idx, col) in row.columns().iter().enumerate() {
        map.insert(col.name().to_string(), value_at(row, idx));
    }
    map
}

/// Decode a cell into JSON without knowing the projection's types up front.
/// Tries the common MySQL decodings in order; anything else (DECIMAL, ENUM,
/// unusual types) falls back to its textual form.
fn value_at(row: &MySqlRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
        return v
            .map(|d| Value::String(d.to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
        return v
            .map(|d| Value::String(d.to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveTime>, _>(idx) {
        return v
            .map(|t| Value::String(t.to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return v
            .map(|b| Value::String(String::from_utf8_lossy(&b).into_owned()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get_unchecked::<Option<String>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    Value::Null
}
