//! Prompt templates for the three pipeline stages.
//!
//! All schema grounding is carried in the prompt text: the generator is
//! instructed to use only the table definitions it is handed (closed-world),
//! and infeasibility is signalled with a fixed sentinel string rather than an
//! error.

/// Exact sentinel the generator emits when no SQL can satisfy the question.
pub const NOT_POSSIBLE_SENTINEL: &str = "NOT POSSIBLE WITH GIVEN TABLES";

/// Case-insensitive prefix match against the sentinel. Trailing text after
/// the sentinel is tolerated and discarded by callers.
pub fn is_not_possible(text: &str) -> bool {
    let trimmed = text.trim_start();
    matches!(
        trimmed.get(..NOT_POSSIBLE_SENTINEL.len()),
        Some(prefix) if prefix.eq_ignore_ascii_case(NOT_POSSIBLE_SENTINEL)
    )
}

pub fn query_rewrite_prompt(user_query: &str, table_descriptions: &str) -> String {
    format!(
        r#"You are a query rewriter. Rewrite the user's question into a clear, explicit, SQL-friendly version.

Use this database description:
{table_descriptions}

Rewrite this user question:
{user_query}

Rules for rewriting:
- Make the question unambiguous.
- Use only tables or concepts that appear in the database description.
- Expand vague terms (e.g., "last month", "top products", "recent orders") into logical descriptions, but do NOT insert exact dates.
- Make implied filters, joins, metrics, and groupings explicit in natural language.
- Remove pronouns and unclear references.
- DO NOT write SQL. Only output the rewritten question in clear English.

OUTPUT REQUIREMENTS (IMPORTANT):
- If the user asks for entities such as customers, products, stores, vendors, or people:
  - Explicitly state that the output should include human-readable identifiers (e.g., name, title, or email) if available.
- If the question implies purchases, orders, or spending:
  - Explicitly state that relevant aggregate metrics should be returned (e.g., number of distinct products, total spend) if derivable from the schema.
- Always include a final sentence starting with:
  "Return ..." that clearly lists the expected output fields.

Output ONLY the rewritten query.
"#
    )
}

pub fn relevant_tables_prompt(user_query: &str, table_descriptions: &str) -> String {
    format!(
        r#"You are an expert SQL database assistant.

Your task:
Given a REWRITTEN USER QUERY and a set of TABLE DESCRIPTIONS, identify which tables are
relevant for answering the user query.

Instructions:
- Use only the tables described below.
- Select the smallest set of tables that fully answer the query.
- Prefer highly relevant tables over loosely related ones.
- DO NOT invent tables that are not provided.
- Return ONLY a JSON array of table names, like:
  ["Customer", "SalesOrderHeader"]

Output format:
- No explanation.
- No commentary.
- Only a JSON list of table names.

====================
REWRITTEN USER QUERY:
{user_query}
====================

====================
TABLE DESCRIPTIONS:
{table_descriptions}
====================

Return ONLY the JSON array of table names.
"#
    )
}

pub fn sql_query_prompt(user_query: &str, tables: &str) -> String {
    format!(
        r#"You are an SQL query generator with ZERO tolerance for hallucination.

Database:
- This is a MySQL relational database.
- Use MySQL syntax only.
- For time differences, you may use TIMESTAMPDIFF or comparisons with INTERVAL (e.g., WHERE t2.datetime <= t1.datetime + INTERVAL 1 DAY).
- When multiple correct queries are possible, choose the one that is likely to be more efficient and index-friendly.

Your ONLY job is to produce a correct and PERFORMANCE-CONSCIOUS SQL query strictly based on the provided tables.

HARD RULES (must always follow):
1. Use ONLY tables and columns explicitly listed in TABLE DEFINITIONS.
2. Do NOT invent or assume any table, column, or relationship not explicitly provided.
3. If the USER QUERY cannot be satisfied with the given tables, return:
   {NOT_POSSIBLE_SENTINEL}
4. When joins are required, use only foreign keys or relationships explicitly implied by TABLE DEFINITIONS.
5. ALWAYS qualify columns using table aliases.
6. Prefer the minimal required set of tables.
7. SQL must be syntactically correct MySQL.

7.1 OUTPUT HUMAN-READABLE DETAILS (MANDATORY):
- If the USER QUERY refers to entities such as customers, products, stores, vendors, or people,
  you MUST include human-readable identifying columns (e.g., name, title, email) in SELECT
  if such columns exist in TABLE DEFINITIONS.
- Returning only IDs is NOT allowed when readable identifiers are available.

7.2 CUSTOMER-SPECIFIC RULE:
- If customer name columns (e.g., FirstName, LastName, FullName, Name, CompanyName, Email)
  are reachable through valid joins, include them in SELECT alongside the customer identifier.

7.3 INCLUDE AGGREGATES WHEN IMPLIED:
- If the USER QUERY implies purchases, orders, or spending:
  - Include relevant aggregate metrics (e.g., COUNT(DISTINCT ...), SUM(...)) in SELECT
    when they can be computed from available columns.
  - Do NOT hallucinate amounts or metrics that cannot be derived.

OPTIMIZATION & PERFORMANCE RULES (must also follow):
8. Prefer SELECT of only the necessary columns instead of SELECT * unless the user explicitly requests all columns.
9. Prefer SARGABLE predicates:
   - Avoid wrapping indexed columns in functions inside WHERE or JOIN conditions when an equivalent comparison using INTERVAL or range conditions is possible.
   - For time-window filters, prefer expressions like:
     t2.OrderDate > t1.OrderDate
     AND t2.OrderDate <= t1.OrderDate + INTERVAL 24 HOUR
     instead of TIMESTAMPDIFF when feasible.
10. Avoid unnecessary DISTINCT, ORDER BY, or GROUP BY if they are not required by the USER QUERY.
11. When self-joining large tables, avoid duplicate or symmetric pairs by using ordered conditions (e.g., t2.id > t1.id or t2.date > t1.date) where logically correct.
12. Push filters down as much as possible:
    - Apply restrictive WHERE conditions directly on base tables or early subqueries rather than on outer queries.
13. Use LIMIT only when the USER QUERY explicitly asks for a specific number of rows (e.g., "top 10", "first 20", "sample of 5 rows").

OUTPUT FORMAT RULES:
- Output ONLY the SQL inside a code block.
- Absolutely NO explanations.
- Absolutely NO commentary.
- Absolutely NO reasoning in the output.

====================
REWRITTEN USER QUERY:
{user_query}
====================

====================
TABLE DEFINITIONS:
{tables}
====================

Return ONLY the SQL query in a code block.
If impossible, return exactly:
{NOT_POSSIBLE_SENTINEL}
"#
    )
}
