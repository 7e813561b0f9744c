//! Common test utilities: an in-memory database implementing the catalog
//! and maintenance traits.

#![allow(dead_code)]

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use pgkeep_core::{
    Catalog, ColumnInfo, ConstraintInfo, ConstraintKind, DuplicateIndexGroup, LargeTable,
    Maintenance, PgKeepError, Result, SequenceEntry, SqlAsset, TriggerOutcome, UnusedIndex,
    updated_at_trigger_name,
};
use pgkeep_standards::{Settings, StandardsEngine};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct FakeTable {
    pub columns: Vec<ColumnInfo>,
    pub indexes: Vec<String>,
    pub constraints: Vec<ConstraintInfo>,
    pub column_max: IndexMap<String, i64>,
    pub triggers: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FakeSequence {
    pub table: String,
    pub column: Option<String>,
    pub last_value: i64,
}

#[derive(Debug, Default)]
struct State {
    tables: IndexMap<String, FakeTable>,
    sequences: IndexMap<String, FakeSequence>,
    event_triggers: HashSet<String>,
    installed: Vec<SqlAsset>,
    mutations: Vec<String>,
    large_tables: Vec<LargeTable>,
    unused_indexes: Vec<UnusedIndex>,
    duplicate_indexes: Vec<DuplicateIndexGroup>,
    /// Tables whose trigger lookup reports "missing" even when present,
    /// as if another session created it after the check.
    stale_trigger_checks: HashSet<String>,
    failing: bool,
}

/// Stateful stand-in for a PostgreSQL schema
pub struct FakeDatabase {
    schema: String,
    state: Mutex<State>,
}

impl Default for FakeDatabase {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            state: Mutex::default(),
        }
    }
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = schema.to_string();
        self
    }

    pub fn with_table(self, name: &str, columns: &[(&str, &str)]) -> Self {
        let table = FakeTable {
            columns: columns
                .iter()
                .map(|(name, data_type)| ColumnInfo::new(*name, *data_type))
                .collect(),
            ..FakeTable::default()
        };
        self.state.lock().tables.insert(name.to_string(), table);
        self
    }

    /// A sequence owned by `table.column`
    pub fn with_sequence(self, name: &str, table: &str, column: Option<&str>, last_value: i64) -> Self {
        self.state.lock().sequences.insert(
            name.to_string(),
            FakeSequence {
                table: table.to_string(),
                column: column.map(str::to_string),
                last_value,
            },
        );
        self
    }

    pub fn with_max(self, table: &str, column: &str, max: i64) -> Self {
        if let Some(t) = self.state.lock().tables.get_mut(table) {
            t.column_max.insert(column.to_string(), max);
        }
        self
    }

    pub fn with_index(self, table: &str, index: &str) -> Self {
        if let Some(t) = self.state.lock().tables.get_mut(table) {
            t.indexes.push(index.to_string());
        }
        self
    }

    pub fn with_constraint(self, table: &str, name: &str, kind: ConstraintKind) -> Self {
        if let Some(t) = self.state.lock().tables.get_mut(table) {
            t.constraints.push(ConstraintInfo {
                name: name.to_string(),
                kind,
            });
        }
        self
    }

    pub fn with_trigger(self, table: &str) -> Self {
        if let Some(t) = self.state.lock().tables.get_mut(table) {
            t.triggers.push(updated_at_trigger_name(table));
        }
        self
    }

    pub fn with_large_table(self, name: &str, size: &str) -> Self {
        self.state.lock().large_tables.push(LargeTable {
            table_name: name.to_string(),
            size: size.to_string(),
        });
        self
    }

    pub fn with_unused_index(self, table: &str, index: &str) -> Self {
        self.state.lock().unused_indexes.push(UnusedIndex {
            table_name: table.to_string(),
            index_name: index.to_string(),
            index_size: "2048 kB".to_string(),
        });
        self
    }

    pub fn with_duplicate_indexes(self, table: &str, indexes: &[&str]) -> Self {
        self.state.lock().duplicate_indexes.push(DuplicateIndexGroup {
            table_name: table.to_string(),
            indexes: indexes.iter().map(|i| i.to_string()).collect(),
        });
        self
    }

    /// Make trigger lookups for `table` stale, simulating a concurrent creator.
    pub fn with_stale_trigger_check(self, table: &str) -> Self {
        self.state.lock().stale_trigger_checks.insert(table.to_string());
        self
    }

    /// Make every call fail as if the connection dropped.
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }

    pub fn add_trigger(&self, table: &str) {
        if let Some(t) = self.state.lock().tables.get_mut(table) {
            t.triggers.push(updated_at_trigger_name(table));
        }
    }

    pub fn last_value(&self, sequence: &str) -> Option<i64> {
        self.state.lock().sequences.get(sequence).map(|s| s.last_value)
    }

    /// `nextval()` result without advancing: with `is_called` semantics the
    /// next value is `last_value + 1`.
    pub fn next_value(&self, sequence: &str) -> Option<i64> {
        self.last_value(sequence).map(|v| v + 1)
    }

    pub fn triggers(&self, table: &str) -> Vec<String> {
        self.state
            .lock()
            .tables
            .get(table)
            .map(|t| t.triggers.clone())
            .unwrap_or_default()
    }

    pub fn installed(&self) -> Vec<SqlAsset> {
        self.state.lock().installed.clone()
    }

    pub fn mutations(&self) -> Vec<String> {
        self.state.lock().mutations.clone()
    }

    /// Mutations other than installing routines
    pub fn data_mutations(&self) -> Vec<String> {
        self.mutations()
            .into_iter()
            .filter(|m| !m.starts_with("install"))
            .collect()
    }

    pub fn event_trigger_active(&self, name: &str) -> bool {
        self.state.lock().event_triggers.contains(name)
    }

    fn check(&self) -> Result<()> {
        if self.state.lock().failing {
            return Err(PgKeepError::Connection("connection lost".to_string()));
        }
        Ok(())
    }

    fn table(&self, name: &str) -> Result<FakeTable> {
        self.state
            .lock()
            .tables
            .get(name)
            .cloned()
            .ok_or_else(|| PgKeepError::Query(format!("relation \"{}\" does not exist", name)))
    }
}

#[async_trait]
impl Catalog for FakeDatabase {
    fn schema(&self) -> &str {
        &self.schema
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        self.check()?;
        Ok(self.state.lock().tables.keys().cloned().collect())
    }

    async fn tables_with_column(&self, column: &str) -> Result<Vec<String>> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .tables
            .iter()
            .filter(|(_, t)| t.columns.iter().any(|c| c.name == column))
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .tables
            .get(table)
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        Ok(self.columns(table).await?.iter().any(|c| c.name == column))
    }

    async fn indexes(&self, table: &str) -> Result<Vec<String>> {
        self.check()?;
        Ok(self.table(table).map(|t| t.indexes).unwrap_or_default())
    }

    async fn constraints(&self, table: &str) -> Result<Vec<ConstraintInfo>> {
        self.check()?;
        Ok(self.table(table).map(|t| t.constraints).unwrap_or_default())
    }

    async fn table_sequences(&self, table: &str) -> Result<Vec<String>> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .sequences
            .iter()
            .filter(|(_, s)| s.table == table)
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn sequence_column(&self, _table: &str, sequence: &str) -> Result<Option<String>> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .sequences
            .get(sequence)
            .and_then(|s| s.column.clone()))
    }

    async fn sequence_last_value(&self, sequence: &str) -> Result<i64> {
        self.check()?;
        Ok(self.last_value(sequence).unwrap_or(0))
    }

    async fn column_max(&self, table: &str, column: &str) -> Result<i64> {
        self.check()?;
        let table = self.table(table)?;
        Ok(table.column_max.get(column).copied().unwrap_or(0))
    }

    async fn trigger_exists(&self, table: &str, trigger: &str) -> Result<bool> {
        self.check()?;
        let state = self.state.lock();
        if state.stale_trigger_checks.contains(table) {
            return Ok(false);
        }
        Ok(state
            .tables
            .get(table)
            .is_some_and(|t| t.triggers.iter().any(|name| name == trigger)))
    }

    async fn all_sequences(&self) -> Result<Vec<SequenceEntry>> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .sequences
            .iter()
            .map(|(name, s)| SequenceEntry {
                sequence_name: name.clone(),
                table_name: s.table.clone(),
                last_value: s.last_value,
            })
            .collect())
    }

    async fn large_tables(&self, _min_bytes: i64) -> Result<Vec<LargeTable>> {
        self.check()?;
        Ok(self.state.lock().large_tables.clone())
    }

    async fn unused_indexes(&self) -> Result<Vec<UnusedIndex>> {
        self.check()?;
        Ok(self.state.lock().unused_indexes.clone())
    }

    async fn duplicate_indexes(&self) -> Result<Vec<DuplicateIndexGroup>> {
        self.check()?;
        Ok(self.state.lock().duplicate_indexes.clone())
    }

    async fn event_trigger_enabled(&self, name: &str) -> Result<bool> {
        self.check()?;
        Ok(self.event_trigger_active(name))
    }
}

#[async_trait]
impl Maintenance for FakeDatabase {
    async fn install(&self, asset: SqlAsset) -> Result<()> {
        self.check()?;
        let mut state = self.state.lock();
        if !state.installed.contains(&asset) {
            state.installed.push(asset);
        }
        state.mutations.push(format!("install {}", asset.file_name()));
        Ok(())
    }

    fn script(&self, asset: SqlAsset) -> Result<String> {
        Ok(format!(
            "-- {}\nCREATE OR REPLACE FUNCTION public.stub()\nRETURNS void LANGUAGE sql AS $$ SELECT 1 $$;\n",
            asset.file_name()
        ))
    }

    async fn reset_sequence(&self, table: &str, sequence: &str, column: &str) -> Result<i64> {
        self.check()?;
        let max = self.column_max(table, column).await?;
        let value = max.max(1);
        let mut state = self.state.lock();
        let entry = state
            .sequences
            .get_mut(sequence)
            .ok_or_else(|| PgKeepError::Query(format!("sequence \"{}\" does not exist", sequence)))?;
        entry.last_value = value;
        state.mutations.push(format!("setval {} {}", sequence, value));
        Ok(value)
    }

    async fn create_updated_at_trigger(&self, table: &str) -> Result<TriggerOutcome> {
        self.check()?;
        let name = updated_at_trigger_name(table);
        let mut state = self.state.lock();
        let t = state
            .tables
            .get_mut(table)
            .ok_or_else(|| PgKeepError::Query(format!("relation \"{}\" does not exist", table)))?;
        if t.triggers.contains(&name) {
            return Ok(TriggerOutcome::AlreadyPresent);
        }
        t.triggers.push(name.clone());
        state.mutations.push(format!("create trigger {}", name));
        Ok(TriggerOutcome::Created)
    }

    async fn fix_db(&self) -> Result<()> {
        self.check()?;
        let mut state = self.state.lock();
        let State {
            tables,
            sequences,
            mutations,
            ..
        } = &mut *state;

        for (name, sequence) in sequences.iter_mut() {
            let Some(column) = &sequence.column else {
                continue;
            };
            let max = tables
                .get(&sequence.table)
                .and_then(|t| t.column_max.get(column).copied())
                .unwrap_or(0);
            sequence.last_value = max.max(1);
            mutations.push(format!("setval {} {}", name, sequence.last_value));
        }
        for (name, table) in tables.iter_mut() {
            let trigger = updated_at_trigger_name(name);
            if table.columns.iter().any(|c| c.name == "updated_at") && !table.triggers.contains(&trigger) {
                table.triggers.push(trigger.clone());
                mutations.push(format!("create trigger {}", trigger));
            }
        }
        mutations.push(format!("fix_db {}", self.schema));
        Ok(())
    }

    async fn create_event_trigger(&self, name: &str) -> Result<()> {
        self.check()?;
        let mut state = self.state.lock();
        state.event_triggers.insert(name.to_string());
        state.mutations.push(format!("create event trigger {}", name));
        Ok(())
    }

    async fn drop_event_trigger(&self, name: &str) -> Result<()> {
        self.check()?;
        let mut state = self.state.lock();
        state.event_triggers.remove(name);
        state.mutations.push(format!("drop event trigger {}", name));
        Ok(())
    }
}

/// Engine over `db` with default settings
pub fn engine(db: &Arc<FakeDatabase>) -> StandardsEngine {
    engine_with(db, Settings::default())
}

pub fn engine_with(db: &Arc<FakeDatabase>, settings: Settings) -> StandardsEngine {
    StandardsEngine::new(db.clone(), db.clone(), settings).expect("engine should build")
}

pub fn s(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
