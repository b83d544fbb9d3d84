//! Orchestrator: one request/response cycle through the pipeline.
//!
//! question -> rewrite (optional) -> select tables -> filter catalog ->
//! generate SQL -> execute -> capped result set.
//!
//! Infeasibility is a normal, cheap outcome, not an error: an empty or
//! fully-unknown table selection, or a generated sentinel, short-circuits
//! without running anything.

use crate::catalog::SchemaCatalog;
use crate::db::executor::{Row, SqlRunner, MAX_RESULT_ROWS};
use crate::error::Result;
use crate::llm::TextGenerator;
use crate::prompts::{self, NOT_POSSIBLE_SENTINEL};
use crate::{generator, rewriter, selector};
use serde::Serialize;
use tracing::info;

/// Result of one handled question.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub sql: String,
    pub relevant_tables: Vec<String>,
    pub rows: Vec<Row>,
    pub columns: Vec<String>,
}

impl QueryOutcome {
    fn not_possible(relevant_tables: Vec<String>) -> Self {
        Self {
            sql: NOT_POSSIBLE_SENTINEL.to_string(),
            relevant_tables,
            rows: Vec::new(),
            columns: Vec::new(),
        }
    }
}

pub struct SqlService<G, R> {
    catalog: SchemaCatalog,
    llm: G,
    runner: R,
    rewrite_enabled: bool,
}

impl<G: TextGenerator, R: SqlRunner> SqlService<G, R> {
    pub fn new(catalog: SchemaCatalog, llm: G, runner: R) -> Self {
        Self {
            catalog,
            llm,
            runner,
            rewrite_enabled: true,
        }
    }

    /// Enable or disable the rewriter stage. On by default.
    pub fn with_rewrite(mut self, enabled: bool) -> Self {
        self.rewrite_enabled = enabled;
        self
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub async fn handle(&self, question: &str) -> Result<QueryOutcome> {
        let question = if self.rewrite_enabled {
            rewriter::rewrite(&self.llm, question, self.catalog.full_text()).await?
        } else {
            question.to_string()
        };

        let relevant_tables =
            selector::select_tables(&self.llm, &question, self.catalog.full_text()).await?;
        info!(?relevant_tables, "selector returned table set");

        // Unknown names are dropped here; if nothing usable remains, the
        // question cannot be answered and no SQL is ever generated.
        let tables_text = self.catalog.filtered_text(&relevant_tables);
        if tables_text.is_empty() {
            info!("no selected table exists in the catalog, short-circuiting");
            return Ok(QueryOutcome::not_possible(Vec::new()));
        }

        let sql = generator::generate_sql(&self.llm, &question, &tables_text).await?;
        if prompts::is_not_possible(&sql) {
            info!("generator returned the infeasibility sentinel");
            return Ok(QueryOutcome::not_possible(relevant_tables));
        }

        let mut rows = self.runner.run(&sql).await?;
        rows.truncate(MAX_RESULT_ROWS);
        let columns: Vec<String> = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();

        Ok(QueryOutcome {
            sql,
            relevant_tables,
            rows,
            columns,
        })
    }
}
