//! SQL generation against the selected tables only.
//!
//! The closed-world policy lives entirely in the prompt; the generator does
//! no runtime validation of the produced SQL. Its one normalization is the
//! infeasibility sentinel: any response whose unfenced text starts with the
//! sentinel (case-insensitive) collapses to the exact sentinel string,
//! trailing text discarded.

use crate::error::Result;
use crate::llm::{strip_fences, TextGenerator};
use crate::prompts::{self, NOT_POSSIBLE_SENTINEL};
use tracing::debug;

pub async fn generate_sql<G: TextGenerator + ?Sized>(
    llm: &G,
    question: &str,
    tables_text: &str,
) -> Result<String> {
    let prompt = prompts::sql_query_prompt(question, tables_text);
    let raw = llm.generate(&prompt).await?;
    let text = strip_fences(&raw);

    if prompts::is_not_possible(&text) {
        debug!("generator declared the question infeasible");
        return Ok(NOT_POSSIBLE_SENTINEL.to_string());
    }

    Ok(text.trim().to_string())
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
    async fn unfences_sql_response() {
        let llm = CannedLlm("```sql\nSELECT c.Name FROM Customer c\n```".to_string());
        let sql = generate_sql(&llm, "q", "TABLE Customer").await.unwrap();
        assert_eq!(sql, "SELECT c.Name FROM Customer c");
    }

    #[tokio::test]
    async fn plain_sql_passes_through() {
        let llm = CannedLlm("SELECT 1".to_string());
        let sql = generate_sql(&llm, "q", "TABLE Customer").await.unwrap();
        assert_eq!(sql, "SELECT 1");
    }

    #[tokio::test]
    async fn sentinel_with_trailing_text_collapses_to_sentinel() {
        let llm = CannedLlm(
            "NOT POSSIBLE WITH GIVEN TABLES\nThe order table is missing.".to_string(),
        );
        let sql = generate_sql(&llm, "q", "TABLE Customer").await.unwrap();
        assert_eq!(sql, NOT_POSSIBLE_SENTINEL);
    }

    #[tokio::test]
    async fn sentinel_match_is_case_insensitive() {
        let llm = CannedLlm("not possible with given tables".to_string());
        let sql = generate_sql(&llm, "q", "TABLE Customer").await.unwrap();
        assert_eq!(sql, NOT_POSSIBLE_SENTINEL);
    }
}
