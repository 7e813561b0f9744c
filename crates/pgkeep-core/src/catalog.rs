//! Catalog metadata types and the traits that expose them

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Read-only access to the catalog of a single schema.
///
/// Implementations are bound to one schema (usually `public`); table names
/// passed in are unqualified.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Schema this catalog reads from
    fn schema(&self) -> &str;

    /// List all user tables in the schema
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// List tables that have a column with the given name
    async fn tables_with_column(&self, column: &str) -> Result<Vec<String>>;

    /// Get columns for a table
    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>>;

    /// Check whether a column exists on a table
    async fn column_exists(&self, table: &str, column: &str) -> Result<bool>;

    /// Get index names for a table
    async fn indexes(&self, table: &str) -> Result<Vec<String>>;

    /// Get constraints for a table
    async fn constraints(&self, table: &str) -> Result<Vec<ConstraintInfo>>;

    /// Names of sequences owned by a table
    async fn table_sequences(&self, table: &str) -> Result<Vec<String>>;

    /// The column a sequence is owned by, if any
    async fn sequence_column(&self, table: &str, sequence: &str) -> Result<Option<String>>;

    /// Current `last_value` of a sequence (0 when it cannot be read)
    async fn sequence_last_value(&self, sequence: &str) -> Result<i64>;

    /// `COALESCE(MAX(column), 0)` for a table column
    async fn column_max(&self, table: &str, column: &str) -> Result<i64>;

    /// Check whether a named trigger exists on a table
    async fn trigger_exists(&self, table: &str, trigger: &str) -> Result<bool>;

    /// Every sequence owned by a table in the schema
    async fn all_sequences(&self) -> Result<Vec<SequenceEntry>>;

    /// Tables whose total relation size exceeds `min_bytes`, largest first
    async fn large_tables(&self, min_bytes: i64) -> Result<Vec<LargeTable>>;

    /// Indexes never scanned, excluding primary keys and indexes under 1MB
    async fn unused_indexes(&self) -> Result<Vec<UnusedIndex>>;

    /// Groups of indexes sharing the same table and key columns
    async fn duplicate_indexes(&self) -> Result<Vec<DuplicateIndexGroup>>;

    /// Whether a named event trigger exists and is not disabled
    async fn event_trigger_enabled(&self, name: &str) -> Result<bool>;
}

/// The mutating statements the helper is allowed to issue.
///
/// Every operation is idempotent on the database side: repeating it leaves
/// the same end state.
#[async_trait]
pub trait Maintenance: Send + Sync {
    /// Install (create or replace) a packaged SQL routine
    async fn install(&self, asset: SqlAsset) -> Result<()>;

    /// Text of a packaged SQL routine, as `install` would run it
    fn script(&self, asset: SqlAsset) -> Result<String>;

    /// Set a sequence to `GREATEST(MAX(column), 1)` in a single statement,
    /// returning the value it was set to.
    async fn reset_sequence(&self, table: &str, sequence: &str, column: &str) -> Result<i64>;

    /// Create the `update_{table}_updated_at` trigger.
    ///
    /// Returns `AlreadyPresent` when the trigger exists, including when a
    /// concurrent creator won the race.
    async fn create_updated_at_trigger(&self, table: &str) -> Result<TriggerOutcome>;

    /// Run the whole-database repair routine over the adapter's schema
    async fn fix_db(&self) -> Result<()>;

    /// Create the DDL event trigger that applies standards to new tables
    async fn create_event_trigger(&self, name: &str) -> Result<()>;

    /// Drop the DDL event trigger if it exists
    async fn drop_event_trigger(&self, name: &str) -> Result<()>;
}

/// Name of the trigger kept on every table with an `updated_at` column
pub fn updated_at_trigger_name(table: &str) -> String {
    format!("update_{}_updated_at", table)
}

/// Packaged SQL routines shipped with the helper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlAsset {
    /// `update_updated_at_column()` trigger function
    UpdatedAtFunction,
    /// `fix_sequence_for_table(schema, table)` and `fix_db(schema)`
    FixDb,
    /// `auto_apply_table_standards()` event trigger function
    AutoApplyStandards,
}

impl SqlAsset {
    pub const ALL: [SqlAsset; 3] = [
        SqlAsset::UpdatedAtFunction,
        SqlAsset::FixDb,
        SqlAsset::AutoApplyStandards,
    ];

    /// File name of the script on disk
    pub fn file_name(&self) -> &'static str {
        match self {
            SqlAsset::UpdatedAtFunction => "update_updated_at_column.sql",
            SqlAsset::FixDb => "fix_db.sql",
            SqlAsset::AutoApplyStandards => "auto_apply_standards.sql",
        }
    }
}

/// Outcome of ensuring the `updated_at` trigger on one table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerOutcome {
    /// The trigger was created by this call
    Created,
    /// The trigger already existed
    AlreadyPresent,
    /// The table has no `updated_at` column
    NotApplicable,
}

impl TriggerOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, TriggerOutcome::Created)
    }
}

impl std::fmt::Display for TriggerOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerOutcome::Created => write!(f, "created"),
            TriggerOutcome::AlreadyPresent => write!(f, "already present"),
            TriggerOutcome::NotApplicable => write!(f, "no updated_at column"),
        }
    }
}

/// Column information from `information_schema.columns`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
        }
    }
}

/// Constraint kind, using the single-letter `pg_constraint.contype` codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    #[serde(rename = "p", alias = "primary_key")]
    PrimaryKey,
    #[serde(rename = "u", alias = "unique")]
    Unique,
    #[serde(rename = "f", alias = "foreign_key")]
    ForeignKey,
    #[serde(rename = "c", alias = "check")]
    Check,
    #[serde(rename = "x", alias = "exclusion")]
    Exclusion,
    #[serde(rename = "t", alias = "trigger")]
    Trigger,
    #[serde(rename = "n", alias = "not_null")]
    NotNull,
}

impl ConstraintKind {
    /// Parse a `contype` code
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "p" => Some(ConstraintKind::PrimaryKey),
            "u" => Some(ConstraintKind::Unique),
            "f" => Some(ConstraintKind::ForeignKey),
            "c" => Some(ConstraintKind::Check),
            "x" => Some(ConstraintKind::Exclusion),
            "t" => Some(ConstraintKind::Trigger),
            "n" => Some(ConstraintKind::NotNull),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ConstraintKind::PrimaryKey => "p",
            ConstraintKind::Unique => "u",
            ConstraintKind::ForeignKey => "f",
            ConstraintKind::Check => "c",
            ConstraintKind::Exclusion => "x",
            ConstraintKind::Trigger => "t",
            ConstraintKind::NotNull => "n",
        }
    }
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A table constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintInfo {
    pub name: String,
    pub kind: ConstraintKind,
}

/// A sequence and the table that owns it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceEntry {
    pub sequence_name: String,
    pub table_name: String,
    pub last_value: i64,
}

/// A table over the size threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LargeTable {
    pub table_name: String,
    /// Human readable size from `pg_size_pretty`
    pub size: String,
}

/// An index that has never been scanned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnusedIndex {
    pub table_name: String,
    pub index_name: String,
    pub index_size: String,
}

/// Indexes that cover the same columns of the same table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateIndexGroup {
    pub table_name: String,
    pub indexes: Vec<String>,
}
