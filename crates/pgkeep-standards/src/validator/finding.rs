use indexmap::IndexMap;
use pgkeep_core::ConstraintKind;
use serde::{Deserialize, Serialize};

/// Whether a finding is a rule violation or an advisory deviation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// One problem found on a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    MissingColumn {
        column: String,
    },
    ColumnTypeMismatch {
        column: String,
        actual: String,
        expected: String,
    },
    MissingIndex {
        index: String,
    },
    MissingConstraint {
        pattern: String,
        constraint_kind: ConstraintKind,
    },
    SequenceNeedsReset {
        sequence: String,
    },
    MissingTrigger,
}

impl Finding {
    pub fn severity(&self) -> Severity {
        match self {
            Finding::MissingColumn { .. }
            | Finding::ColumnTypeMismatch { .. }
            | Finding::MissingConstraint { .. } => Severity::Error,
            Finding::MissingIndex { .. }
            | Finding::SequenceNeedsReset { .. }
            | Finding::MissingTrigger => Severity::Warning,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    /// Whether sequence repair would act on this finding
    pub fn needs_sequence_repair(&self) -> bool {
        matches!(self, Finding::SequenceNeedsReset { .. })
    }

    /// Whether trigger repair would act on this finding
    pub fn needs_trigger_repair(&self) -> bool {
        matches!(self, Finding::MissingTrigger)
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Finding::MissingColumn { column } => {
                write!(f, "Missing required column: {}", column)
            }
            Finding::ColumnTypeMismatch {
                column,
                actual,
                expected,
            } => write!(
                f,
                "Column '{}' has type '{}', expected '{}'",
                column, actual, expected
            ),
            Finding::MissingIndex { index } => write!(f, "Missing recommended index: {}", index),
            Finding::MissingConstraint {
                pattern,
                constraint_kind,
            } => write!(
                f,
                "Missing required constraint: {} (type: {})",
                pattern, constraint_kind
            ),
            Finding::SequenceNeedsReset { sequence } => {
                write!(f, "Sequence '{}' may need to be reset", sequence)
            }
            Finding::MissingTrigger => {
                write!(f, "Table has 'updated_at' column but missing update trigger")
            }
        }
    }
}

/// Findings for one table, in check order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableValidation {
    pub table: String,
    pub findings: Vec<Finding>,
}

impl TableValidation {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            findings: Vec::new(),
        }
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages(Severity::Error)
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages(Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(Finding::is_error)
    }

    pub fn has_warnings(&self) -> bool {
        self.findings.iter().any(|f| !f.is_error())
    }

    fn messages(&self, severity: Severity) -> Vec<String> {
        self.findings
            .iter()
            .filter(|f| f.severity() == severity)
            .map(ToString::to_string)
            .collect()
    }
}

/// Validation results across several tables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub tables: Vec<TableValidation>,
}

/// Serializable view of a [`ValidationReport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub valid: bool,
    pub errors: IndexMap<String, Vec<String>>,
    pub warnings: IndexMap<String, Vec<String>>,
    pub tables_checked: usize,
}

impl ValidationReport {
    pub fn tables_checked(&self) -> usize {
        self.tables.len()
    }

    /// True when no table has an error; warnings do not affect validity.
    pub fn valid(&self) -> bool {
        !self.tables.iter().any(TableValidation::has_errors)
    }

    /// Error messages keyed by table, only for tables with errors
    pub fn errors(&self) -> IndexMap<String, Vec<String>> {
        self.tables
            .iter()
            .filter(|t| t.has_errors())
            .map(|t| (t.table.clone(), t.errors()))
            .collect()
    }

    /// Warning messages keyed by table, only for tables with warnings
    pub fn warnings(&self) -> IndexMap<String, Vec<String>> {
        self.tables
            .iter()
            .filter(|t| t.has_warnings())
            .map(|t| (t.table.clone(), t.warnings()))
            .collect()
    }

    pub fn table(&self, name: &str) -> Option<&TableValidation> {
        self.tables.iter().find(|t| t.table == name)
    }

    pub fn summary(&self) -> ValidationSummary {
        ValidationSummary {
            valid: self.valid(),
            errors: self.errors(),
            warnings: self.warnings(),
            tables_checked: self.tables_checked(),
        }
    }
}
