use std::sync::Arc;

use pgkeep_core::{Catalog, ColumnInfo, updated_at_trigger_name};

use crate::{Finding, RuleSet, StandardsResult, TableValidation, ValidationReport, glob_matches};

/// Accepted catalog spellings for configured type names
const TYPE_ALIASES: &[(&str, &[&str])] = &[
    ("bigint", &["bigint"]),
    ("integer", &["integer", "int"]),
    ("text", &["text", "character varying", "varchar"]),
    (
        "timestamp",
        &["timestamp without time zone", "timestamp with time zone"],
    ),
    ("boolean", &["boolean", "bool"]),
];

/// Whether a live column type satisfies the configured expected type
pub fn type_matches(actual: &str, expected: &str) -> bool {
    let actual = actual.trim().to_lowercase();
    let expected = expected.trim().to_lowercase();
    if actual == expected {
        return true;
    }
    TYPE_ALIASES
        .iter()
        .find(|(name, _)| *name == expected)
        .is_some_and(|(_, aliases)| aliases.contains(&actual.as_str()))
}

/// Read-only structure checks against the live catalog
#[derive(Clone)]
pub struct StructureValidator {
    catalog: Arc<dyn Catalog>,
    rules: Arc<RuleSet>,
}

impl StructureValidator {
    pub fn new(catalog: Arc<dyn Catalog>, rules: Arc<RuleSet>) -> Self {
        Self { catalog, rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Validate the given tables, or every table in the schema.
    pub async fn validate(&self, tables: Option<&[String]>) -> StandardsResult<ValidationReport> {
        let tables = match tables {
            Some(tables) => tables.to_vec(),
            None => self.catalog.list_tables().await?,
        };

        let mut report = ValidationReport::default();
        for table in &tables {
            report.tables.push(self.validate_table(table).await?);
        }

        tracing::debug!(
            tables = report.tables_checked(),
            valid = report.valid(),
            "structure validation finished"
        );
        Ok(report)
    }

    /// Validate a single table
    pub async fn validate_table(&self, table: &str) -> StandardsResult<TableValidation> {
        let mut result = TableValidation::new(table);
        let columns = self.catalog.columns(table).await?;

        if let Some(matched) = self.rules.match_table(table) {
            tracing::trace!(table = %table, patterns = ?matched.patterns, "validation rules matched");
            let rule = &matched.rule;

            for required in &rule.required_columns {
                if !columns.iter().any(|c| &c.name == required) {
                    result.findings.push(Finding::MissingColumn {
                        column: required.clone(),
                    });
                }
            }

            for (column, expected) in &rule.column_types {
                let Some(live) = columns.iter().find(|c| &c.name == column) else {
                    continue;
                };
                if !type_matches(&live.data_type, expected) {
                    result.findings.push(Finding::ColumnTypeMismatch {
                        column: column.clone(),
                        actual: live.data_type.clone(),
                        expected: expected.clone(),
                    });
                }
            }

            if !rule.required_indexes.is_empty() {
                let indexes = self.catalog.indexes(table).await?;
                for index in &rule.required_indexes {
                    let pattern = format!("{}_{}", table, index);
                    if !indexes.iter().any(|name| glob_matches(&pattern, name)) {
                        result.findings.push(Finding::MissingIndex {
                            index: index.clone(),
                        });
                    }
                }
            }

            if !rule.required_constraints.is_empty() {
                let constraints = self.catalog.constraints(table).await?;
                for (pattern, kind) in &rule.required_constraints {
                    let found = constraints
                        .iter()
                        .any(|c| c.kind == *kind && glob_matches(pattern, &c.name));
                    if !found {
                        result.findings.push(Finding::MissingConstraint {
                            pattern: pattern.clone(),
                            constraint_kind: *kind,
                        });
                    }
                }
            }
        }

        self.check_sequences(table, &mut result).await?;
        self.check_trigger(table, &columns, &mut result).await?;

        Ok(result)
    }

    async fn check_sequences(&self, table: &str, result: &mut TableValidation) -> StandardsResult<()> {
        for sequence in self.catalog.table_sequences(table).await? {
            let last_value = self.catalog.sequence_last_value(&sequence).await?;
            let behind = if last_value < 1 {
                true
            } else {
                match self.catalog.sequence_column(table, &sequence).await? {
                    Some(column) => last_value < self.catalog.column_max(table, &column).await?,
                    None => false,
                }
            };
            if behind {
                result.findings.push(Finding::SequenceNeedsReset { sequence });
            }
        }
        Ok(())
    }

    async fn check_trigger(
        &self,
        table: &str,
        columns: &[ColumnInfo],
        result: &mut TableValidation,
    ) -> StandardsResult<()> {
        if !columns.iter().any(|c| c.name == "updated_at") {
            return Ok(());
        }
        let trigger = updated_at_trigger_name(table);
        if !self.catalog.trigger_exists(table, &trigger).await? {
            result.findings.push(Finding::MissingTrigger);
        }
        Ok(())
    }
}
