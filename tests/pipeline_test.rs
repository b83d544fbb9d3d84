//! End-to-end pipeline tests with scripted LLM and executor fakes.

use async_trait::async_trait;
use serde_json::Value;
use sql_assistant::catalog::SchemaCatalog;
use sql_assistant::db::executor::{Row, SqlRunner};
use sql_assistant::error::{AssistantError, Result};
use sql_assistant::llm::TextGenerator;
use sql_assistant::prompts::NOT_POSSIBLE_SENTINEL;
use sql_assistant::service::SqlService;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// LLM fake that replays a fixed sequence of responses and counts calls.
struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedLlm {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AssistantError::Llm("scripted LLM ran out of responses".to_string()))
    }
}

/// Executor fake returning canned rows, recording the SQL it was handed.
struct FakeRunner {
    rows: Vec<Row>,
    calls: AtomicUsize,
    last_sql: Mutex<Option<String>>,
}

impl FakeRunner {
    fn new(rows: Vec<Row>) -> Arc<Self> {
        Arc::new(Self {
            rows,
            calls: AtomicUsize::new(0),
            last_sql: Mutex::new(None),
        })
    }

    fn empty() -> Arc<Self> {
        Self::new(Vec::new())
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_sql(&self) -> Option<String> {
        self.last_sql.lock().unwrap().clone()
    }
}

#[async_trait]
impl SqlRunner for FakeRunner {
    async fn run(&self, sql: &str) -> Result<Vec<Row>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_sql.lock().unwrap() = Some(sql.to_string());
        Ok(self.rows.clone())
    }
}

fn test_catalog() -> SchemaCatalog {
    let mut tables = BTreeMap::new();
    tables.insert(
        "Customer".to_string(),
        "TABLE Customer\nColumns:\n  - CustomerID (int, nullable=NO, default=NULL)".to_string(),
    );
    tables.insert(
        "SalesOrderHeader".to_string(),
        "TABLE SalesOrderHeader\nColumns:\n  - SalesOrderID (int, nullable=NO, default=NULL)"
            .to_string(),
    );
    SchemaCatalog::new(tables)
}

fn make_row(pairs: &[(&str, Value)]) -> Row {
    let mut row = Row::new();
    for (key, value) in pairs {
        row.insert(key.to_string(), value.clone());
    }
    row
}

#[tokio::test]
async fn empty_selection_short_circuits_without_generating_or_executing() {
    let llm = ScriptedLlm::new(&["[]"]);
    let runner = FakeRunner::empty();
    let service =
        SqlService::new(test_catalog(), llm.clone(), runner.clone()).with_rewrite(false);

    let outcome = service.handle("What color is the sky?").await.unwrap();

    assert_eq!(outcome.sql, NOT_POSSIBLE_SENTINEL);
    assert!(outcome.relevant_tables.is_empty());
    assert!(outcome.rows.is_empty());
    assert!(outcome.columns.is_empty());
    // Only the selector ran: no generation, no execution.
    assert_eq!(llm.call_count(), 1);
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn unknown_tables_only_equals_empty_selection() {
    let llm = ScriptedLlm::new(&[r#"["Ghost", "Phantom"]"#]);
    let runner = FakeRunner::empty();
    let service =
        SqlService::new(test_catalog(), llm.clone(), runner.clone()).with_rewrite(false);

    let outcome = service.handle("anything").await.unwrap();

    assert_eq!(outcome.sql, NOT_POSSIBLE_SENTINEL);
    assert!(outcome.relevant_tables.is_empty());
    assert!(outcome.rows.is_empty());
    assert!(outcome.columns.is_empty());
    assert_eq!(llm.call_count(), 1);
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn sentinel_prefix_with_trailing_text_skips_execution() {
    let llm = ScriptedLlm::new(&[
        r#"["Customer"]"#,
        "not possible with given tables\nsome trailing text",
    ]);
    let runner = FakeRunner::empty();
    let service =
        SqlService::new(test_catalog(), llm.clone(), runner.clone()).with_rewrite(false);

    let outcome = service.handle("anything").await.unwrap();

    assert_eq!(outcome.sql, NOT_POSSIBLE_SENTINEL);
    assert_eq!(outcome.relevant_tables, vec!["Customer"]);
    assert!(outcome.rows.is_empty());
    assert!(outcome.columns.is_empty());
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn fenced_sql_is_unfenced_and_executed_once() {
    let sql = "SELECT c.CustomerID FROM Customer c JOIN SalesOrderHeader soh \
               ON soh.CustomerID = c.CustomerID WHERE YEAR(soh.OrderDate) = 2013";
    let fenced = format!("```sql\n{}\n```", sql);
    let llm = ScriptedLlm::new(&[r#"["Customer", "SalesOrderHeader"]"#, fenced.as_str()]);
    let runner = FakeRunner::new(vec![make_row(&[
        ("CustomerID", Value::from(42)),
        ("Name", Value::from("Ada")),
    ])]);
    let service =
        SqlService::new(test_catalog(), llm.clone(), runner.clone()).with_rewrite(false);

    let outcome = service
        .handle("List customers with orders in 2013")
        .await
        .unwrap();

    assert_eq!(outcome.sql, sql);
    assert_eq!(outcome.relevant_tables, vec!["Customer", "SalesOrderHeader"]);
    assert_eq!(runner.call_count(), 1);
    assert_eq!(runner.last_sql().as_deref(), Some(sql));
    assert_eq!(outcome.columns, vec!["CustomerID", "Name"]);
    assert_eq!(outcome.rows.len(), 1);
}

#[tokio::test]
async fn result_rows_are_capped_at_five_hundred() {
    let rows: Vec<Row> = (0..501)
        .map(|i| {
            make_row(&[
                ("id", Value::from(i)),
                ("name", Value::from(format!("customer-{}", i))),
            ])
        })
        .collect();
    let llm = ScriptedLlm::new(&[r#"["Customer"]"#, "SELECT c.CustomerID FROM Customer c"]);
    let runner = FakeRunner::new(rows);
    let service =
        SqlService::new(test_catalog(), llm.clone(), runner.clone()).with_rewrite(false);

    let outcome = service.handle("all customers").await.unwrap();

    assert_eq!(outcome.rows.len(), 500);
    assert_eq!(outcome.columns, vec!["id", "name"]);
}

#[tokio::test]
async fn zero_rows_yields_empty_columns() {
    let llm = ScriptedLlm::new(&[r#"["Customer"]"#, "SELECT c.CustomerID FROM Customer c"]);
    let runner = FakeRunner::empty();
    let service =
        SqlService::new(test_catalog(), llm.clone(), runner.clone()).with_rewrite(false);

    let outcome = service.handle("all customers").await.unwrap();

    assert!(outcome.rows.is_empty());
    assert!(outcome.columns.is_empty());
    assert_eq!(runner.call_count(), 1);
}

#[tokio::test]
async fn rewrite_stage_feeds_selector_and_generator() {
    let llm = ScriptedLlm::new(&[
        "List all customers who placed orders during 2013. Return customer name and email.",
        r#"["Customer", "SalesOrderHeader"]"#,
        "SELECT c.CustomerID FROM Customer c",
    ]);
    let runner = FakeRunner::new(vec![make_row(&[("CustomerID", Value::from(1))])]);
    let service = SqlService::new(test_catalog(), llm.clone(), runner.clone());

    let outcome = service
        .handle("customers with orders in 2013?")
        .await
        .unwrap();

    assert_eq!(llm.call_count(), 3);
    assert_eq!(outcome.sql, "SELECT c.CustomerID FROM Customer c");
    assert_eq!(outcome.relevant_tables, vec!["Customer", "SalesOrderHeader"]);
}

#[tokio::test]
async fn selector_parse_failure_fails_the_request_with_raw_text() {
    let llm = ScriptedLlm::new(&["this is not json"]);
    let runner = FakeRunner::empty();
    let service =
        SqlService::new(test_catalog(), llm.clone(), runner.clone()).with_rewrite(false);

    let err = service.handle("anything").await.unwrap_err();

    assert!(matches!(err, AssistantError::TableParse { .. }));
    assert!(err.to_string().contains("this is not json"));
    assert_eq!(runner.call_count(), 0);
}
