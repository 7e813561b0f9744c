use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use pgkeep_core::{qualified_name, quote_ident, quote_literal, updated_at_trigger_name};

use crate::{StandardsResult, UPDATED_AT_COLUMN, ValidationReport};

/// Directory migrations are written to unless overridden
pub const DEFAULT_MIGRATION_DIR: &str = "database/migrations";

const FILE_SUFFIX: &str = "apply_postgresql_standards.sql";

/// Tables with a sequence or trigger finding, once each, in report order
pub fn tables_needing_standards(report: &ValidationReport) -> Vec<String> {
    report
        .tables
        .iter()
        .filter(|t| {
            t.findings
                .iter()
                .any(|f| f.needs_sequence_repair() || f.needs_trigger_repair())
        })
        .map(|t| t.table.clone())
        .fold(Vec::new(), |mut tables, table| {
            if !tables.contains(&table) {
                tables.push(table);
            }
            tables
        })
}

/// A generated repair script with up and down sections
#[derive(Debug, Clone)]
pub struct StandardsMigration {
    pub created_at: DateTime<Local>,
    pub schema: String,
    /// Tables captured at generation time
    pub tables: Vec<String>,
    /// `CREATE OR REPLACE FUNCTION` scripts run before `up_sql`
    pub routines: Vec<String>,
    pub up_sql: Vec<String>,
    pub down_sql: Vec<String>,
}

impl StandardsMigration {
    /// Build the migration for `tables`, ending with a whole-database repair pass.
    ///
    /// `routines` are the scripts defining the functions the up section calls,
    /// so the file applies cleanly to a database that never ran `install`.
    pub fn generate(
        schema: &str,
        tables: Vec<String>,
        routines: Vec<String>,
        created_at: DateTime<Local>,
    ) -> Self {
        let mut migration = Self {
            created_at,
            schema: schema.to_string(),
            tables: Vec::new(),
            routines,
            up_sql: Vec::new(),
            down_sql: Vec::new(),
        };

        for table in &tables {
            migration.add_up(table_standards_block(schema, table));
        }
        if !tables.is_empty() {
            migration.add_up(format!("SELECT public.fix_db({})", quote_literal(schema)));
        }
        migration.tables = tables;
        migration
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn add_up(&mut self, sql: String) {
        self.up_sql.push(sql);
    }

    pub fn add_down(&mut self, sql: String) {
        self.down_sql.push(sql);
    }

    /// `{YYYY_MM_DD_HHMMSS}_apply_postgresql_standards.sql`
    pub fn file_name(&self) -> String {
        format!("{}_{}", self.created_at.format("%Y_%m_%d_%H%M%S"), FILE_SUFFIX)
    }

    pub fn up_script(&self) -> String {
        let routines = self
            .routines
            .iter()
            .map(|r| r.trim_end().to_string())
            .filter(|r| !r.is_empty());
        routines
            .chain(std::iter::once(script(&self.up_sql)))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn down_script(&self) -> String {
        script(&self.down_sql)
    }

    /// Full file content
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "-- Apply PostgreSQL standards to {} tables\n-- Generated {}\n\n",
            self.tables.len(),
            self.created_at.format("%Y-%m-%d %H:%M:%S")
        ));

        out.push_str("-- migrate:up\n\n");
        out.push_str(&self.up_script());
        out.push_str("\n\n");

        out.push_str("-- migrate:down\n\n");
        if self.down_sql.is_empty() {
            out.push_str("-- Sequence values and update triggers are left in place.\n");
        } else {
            out.push_str(&self.down_script());
            out.push('\n');
        }
        out
    }

    /// Write the migration into `dir`, creating it if needed.
    pub fn write_to(&self, dir: &Path) -> StandardsResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        std::fs::write(&path, self.render())?;
        tracing::info!(path = %path.display(), tables = self.tables.len(), "standards migration written");
        Ok(path)
    }
}

fn script(statements: &[String]) -> String {
    statements
        .iter()
        .map(|s| format!("{};", s))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn table_standards_block(schema: &str, table: &str) -> String {
    let table_literal = quote_literal(table);
    let trigger = updated_at_trigger_name(table);
    format!(
        "DO $$
BEGIN
    PERFORM public.fix_sequence_for_table({schema_literal}, {table_literal});

    IF EXISTS (
        SELECT 1 FROM information_schema.columns
        WHERE table_schema = {schema_literal}
          AND table_name = {table_literal}
          AND column_name = {column_literal}
    ) AND NOT EXISTS (
        SELECT 1 FROM pg_trigger
        WHERE tgname = {trigger_literal}
          AND tgrelid = {relation_literal}::regclass
    ) THEN
        CREATE TRIGGER {trigger_ident} BEFORE UPDATE ON {relation}
            FOR EACH ROW EXECUTE PROCEDURE public.update_updated_at_column();
    END IF;

    RAISE NOTICE 'Applied standards to %', {table_literal};
END
$$",
        schema_literal = quote_literal(schema),
        column_literal = quote_literal(UPDATED_AT_COLUMN),
        trigger_literal = quote_literal(&trigger),
        trigger_ident = quote_ident(&trigger),
        relation_literal = quote_literal(&qualified_name(schema, table)),
        relation = qualified_name(schema, table),
    )
}
