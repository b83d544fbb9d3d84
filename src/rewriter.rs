//! Query rewriting: turn a possibly ambiguous user question into an
//! unambiguous, schema-grounded restatement before table selection.

use crate::error::Result;
use crate::llm::{strip_fences, TextGenerator};
use crate::prompts;
use tracing::debug;

/// Rewrite the question against the full catalog text.
///
/// The rewrite expands vague temporal and quantitative terms without
/// inserting literal dates, resolves pronouns, and ends with a "Return ..."
/// sentence listing the expected output fields. If the model emits the
/// infeasibility sentinel instead, it passes through unchanged.
pub async fn rewrite<G: TextGenerator + ?Sized>(
    llm: &G,
    question: &str,
    table_descriptions: &str,
) -> Result<String> {
    let prompt = prompts::query_rewrite_prompt(question, table_descriptions);
    let raw = llm.generate(&prompt).await?;
    let rewritten = strip_fences(&raw);
    debug!(%rewritten, "rewrote user question");
    Ok(rewritten)
}
