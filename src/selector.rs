//! Relevant-table selection.
//!
//! Asks the model for the minimal table set sufficient to answer the
//! question, as a JSON array of names. Parsing is strict: anything that is
//! not a JSON array fails the request, with the raw text attached so the bad
//! response can be diagnosed. Whether the names actually exist in the
//! catalog is not checked here; the orchestrator filters them.

use crate::error::{AssistantError, Result};
use crate::llm::{strip_fences, TextGenerator};
use crate::prompts;
use serde_json::Value;
use tracing::debug;

pub async fn select_tables<G: TextGenerator + ?Sized>(
    llm: &G,
    question: &str,
    table_descriptions: &str,
) -> Result<Vec<String>> {
    let prompt = prompts::relevant_tables_prompt(question, table_descriptions);
    let raw = llm.generate(&prompt).await?;
    let cleaned = strip_fences(&raw);

    let value: Value = serde_json::from_str(&cleaned).map_err(|e| AssistantError::TableParse {
        message: e.to_string(),
        raw: cleaned.clone(),
    })?;

    let items = value.as_array().ok_or_else(|| AssistantError::TableParse {
        message: "expected a JSON array of table names".to_string(),
        raw: cleaned.clone(),
    })?;

    let tables: Vec<String> = items
        .iter()
        .map(|item| match item {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        })
        .collect();

    debug!(?tables, "selected relevant tables");
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct CannedLlm(String);

    #[async_trait]
    impl TextGenerator for CannedLlm {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn parses_array_and_trims_names() {
        let llm = CannedLlm(r#"[" Customer", "SalesOrderHeader "]"#.to_string());
        let tables = select_tables(&llm, "q", "descriptions").await.unwrap();
        assert_eq!(tables, vec!["Customer", "SalesOrderHeader"]);
    }

    #[tokio::test]
    async fn parses_fenced_array() {
        let llm = CannedLlm("```json\n[\"Customer\"]\n```".to_string());
        let tables = select_tables(&llm, "q", "descriptions").await.unwrap();
        assert_eq!(tables, vec!["Customer"]);
    }

    #[tokio::test]
    async fn empty_array_is_valid() {
        let llm = CannedLlm("[]".to_string());
        let tables = select_tables(&llm, "q", "descriptions").await.unwrap();
        assert!(tables.is_empty());
    }

    #[tokio::test]
    async fn invalid_json_fails_with_raw_text_attached() {
        let llm = CannedLlm("not json".to_string());
        let err = select_tables(&llm, "q", "descriptions").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("not json"), "message was: {}", message);
    }

    #[tokio::test]
    async fn non_array_json_fails() {
        let llm = CannedLlm("{}".to_string());
        let err = select_tables(&llm, "q", "descriptions").await.unwrap_err();
        assert!(matches!(err, AssistantError::TableParse { .. }));
    }
}
