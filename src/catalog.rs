//! Schema catalog: table name -> descriptive text block.
//!
//! Built once per process, read-only afterwards. The descriptions are
//! deterministic given identical schema metadata so that prompts stay
//! reproducible across runs.

use crate::db::introspect::{DatabaseSchema, TableSchema};
use crate::error::{AssistantError, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

pub struct SchemaCatalog {
    tables: BTreeMap<String, String>,
    full_text: String,
}

impl SchemaCatalog {
    pub fn new(tables: BTreeMap<String, String>) -> Self {
        let full_text = tables.values().cloned().collect::<Vec<_>>().join("\n\n");
        Self { tables, full_text }
    }

    /// Render every table of an introspected schema into its description.
    pub fn from_schema(schema: &DatabaseSchema) -> Self {
        let tables = schema
            .tables
            .iter()
            .map(|(name, info)| (name.clone(), describe_table(name, info)))
            .collect();
        Self::new(tables)
    }

    /// Load pre-generated catalog artifacts: a JSON mapping of table name to
    /// description, and the concatenated description text used for the
    /// table-selection prompt.
    pub fn load(schema_path: impl AsRef<Path>, description_path: impl AsRef<Path>) -> Result<Self> {
        let schema_path = schema_path.as_ref();
        let raw = std::fs::read_to_string(schema_path).map_err(|e| {
            AssistantError::Schema(format!("cannot read {}: {}", schema_path.display(), e))
        })?;
        let tables: BTreeMap<String, String> = serde_json::from_str(&raw)?;

        let description_path = description_path.as_ref();
        let full_text = std::fs::read_to_string(description_path).map_err(|e| {
            AssistantError::Schema(format!("cannot read {}: {}", description_path.display(), e))
        })?;

        info!(tables = tables.len(), "loaded schema catalog from disk");
        Ok(Self { tables, full_text })
    }

    /// Persist the catalog as the two artifacts [`SchemaCatalog::load`]
    /// consumes.
    pub fn write_artifacts(
        &self,
        schema_path: impl AsRef<Path>,
        description_path: impl AsRef<Path>,
    ) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.tables)?;
        std::fs::write(schema_path.as_ref(), json)?;
        std::fs::write(description_path.as_ref(), &self.full_text)?;
        Ok(())
    }

    pub fn description(&self, table: &str) -> Option<&str> {
        self.tables.get(table).map(|s| s.as_str())
    }

    /// Concatenated descriptions of the given tables, in the order given.
    /// Names absent from the catalog are silently skipped.
    pub fn filtered_text(&self, names: &[String]) -> String {
        let parts: Vec<&str> = names
            .iter()
            .filter_map(|name| self.description(name))
            .filter(|desc| !desc.is_empty())
            .collect();
        parts.join("\n\n")
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|s| s.as_str())
    }
}

/// Render one table's schema facts into the text block handed to the LLM.
pub fn describe_table(name: &str, info: &TableSchema) -> String {
    let mut lines: Vec<String> = vec![format!("TABLE {}", name), "Columns:".to_string()];

    for col in &info.columns {
        lines.push(format!(
            "  - {} ({}, nullable={}, default={})",
            col.name,
            col.data_type,
            col.nullable,
            col.default.as_deref().unwrap_or("NULL"),
        ));
    }

    if !info.primary_key.is_empty() {
        lines.push(format!("Primary key: {}", info.primary_key.join(", ")));
    }

    if !info.foreign_keys.is_empty() {
        lines.push("Foreign keys:".to_string());
        for fk in &info.foreign_keys {
            lines.push(format!(
                "  - {} -> {}({}) [{}]",
                fk.column, fk.references_table, fk.references_column, fk.constraint_name
            ));
        }
    }

    lines.join("\n")
}
