use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use pgkeep_core::{Catalog, Maintenance, SqlAsset, TriggerOutcome, updated_at_trigger_name};
use serde::Serialize;
use serde_json::json;

use crate::{Finding, StandardsCache, StandardsResult, StatsCollector, StructureValidator};

/// Name of the DDL event trigger that applies standards to new tables
pub const EVENT_TRIGGER_NAME: &str = "auto_apply_standards_trigger";

/// Column that makes a table eligible for the update trigger
pub const UPDATED_AT_COLUMN: &str = "updated_at";

/// Result of a sequence repair run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SequenceRepairReport {
    /// Every sequence that was set, including ones that were already correct
    pub sequences_fixed: Vec<String>,
    /// Seconds
    pub time_taken: f64,
}

/// Result of a trigger repair run, one outcome per target table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TriggerRepairReport {
    pub outcomes: IndexMap<String, TriggerOutcome>,
    /// Seconds
    pub time_taken: f64,
}

impl TriggerRepairReport {
    fn tables_with(&self, pred: impl Fn(&TriggerOutcome) -> bool) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| pred(outcome))
            .map(|(table, _)| table.clone())
            .collect()
    }

    pub fn created(&self) -> Vec<String> {
        self.tables_with(|o| *o == TriggerOutcome::Created)
    }

    pub fn already_present(&self) -> Vec<String> {
        self.tables_with(|o| *o == TriggerOutcome::AlreadyPresent)
    }

    pub fn not_applicable(&self) -> Vec<String> {
        self.tables_with(|o| *o == TriggerOutcome::NotApplicable)
    }

    /// Tables where nothing was created, for either reason
    pub fn skipped(&self) -> Vec<String> {
        self.tables_with(|o| *o != TriggerOutcome::Created)
    }
}

/// Combined repair of one table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableStandardsReport {
    pub table: String,
    pub sequences: SequenceRepairReport,
    pub triggers: TriggerRepairReport,
}

/// Result of applying best practices to several tables
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BestPracticesReport {
    pub tables_processed: usize,
    /// When true nothing was changed and the lists below are what would be
    pub dry_run: bool,
    /// Sequences set, or that would be set
    pub sequences_fixed: Vec<String>,
    /// Tables that got a trigger, or would get one
    pub triggers_created: Vec<String>,
}

/// Outcome of toggling the DDL event trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventTriggerStatus {
    pub enabled: bool,
    pub message: String,
}

/// Drives sequence and trigger repair against a catalog
#[derive(Clone)]
pub struct RepairEngine {
    catalog: Arc<dyn Catalog>,
    maintenance: Arc<dyn Maintenance>,
    validator: StructureValidator,
    stats: Arc<StatsCollector>,
    cache: Arc<StandardsCache>,
}

impl RepairEngine {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        maintenance: Arc<dyn Maintenance>,
        validator: StructureValidator,
        stats: Arc<StatsCollector>,
        cache: Arc<StandardsCache>,
    ) -> Self {
        Self {
            catalog,
            maintenance,
            validator,
            stats,
            cache,
        }
    }

    pub fn cache(&self) -> &StandardsCache {
        &self.cache
    }

    async fn all_tables(&self, tables: Option<&[String]>) -> StandardsResult<Vec<String>> {
        match tables {
            Some(tables) => Ok(tables.to_vec()),
            None => Ok(self.catalog.list_tables().await?),
        }
    }

    /// Set every owned sequence of the given tables (default: all tables) to
    /// `GREATEST(MAX(column), 1)`.
    pub async fn fix_sequences(&self, tables: Option<&[String]>) -> StandardsResult<SequenceRepairReport> {
        self.stats
            .with_timing(
                "fixSequences",
                json!({ "tables": tables.map(<[String]>::len) }),
                || self.run_fix_sequences(tables),
            )
            .await
    }

    async fn run_fix_sequences(&self, tables: Option<&[String]>) -> StandardsResult<SequenceRepairReport> {
        let start = Instant::now();
        let mut report = SequenceRepairReport::default();

        for table in self.all_tables(tables).await? {
            for sequence in self.catalog.table_sequences(&table).await? {
                let Some(column) = self.catalog.sequence_column(&table, &sequence).await? else {
                    tracing::debug!(table = %table, sequence = %sequence, "sequence has no owning column, skipping");
                    continue;
                };
                let value = self
                    .maintenance
                    .reset_sequence(&table, &sequence, &column)
                    .await?;
                tracing::debug!(table = %table, sequence = %sequence, value, "sequence fixed");
                report.sequences_fixed.push(sequence);
            }
            self.cache.invalidate(&table);
        }

        report.time_taken = start.elapsed().as_secs_f64();
        Ok(report)
    }

    /// Ensure the `updated_at` trigger on the given tables (default: every
    /// table with an `updated_at` column).
    pub async fn fix_triggers(&self, tables: Option<&[String]>) -> StandardsResult<TriggerRepairReport> {
        self.stats
            .with_timing(
                "fixTriggers",
                json!({ "tables": tables.map(<[String]>::len) }),
                || self.run_fix_triggers(tables),
            )
            .await
    }

    async fn run_fix_triggers(&self, tables: Option<&[String]>) -> StandardsResult<TriggerRepairReport> {
        let start = Instant::now();
        self.maintenance.install(SqlAsset::UpdatedAtFunction).await?;

        let targets = match tables {
            Some(tables) => tables.to_vec(),
            None => self.catalog.tables_with_column(UPDATED_AT_COLUMN).await?,
        };

        let mut report = TriggerRepairReport::default();
        for table in targets {
            let outcome = self.ensure_trigger(&table).await?;
            tracing::debug!(table = %table, outcome = %outcome, "trigger processed");
            self.cache.invalidate(&table);
            report.outcomes.insert(table, outcome);
        }

        report.time_taken = start.elapsed().as_secs_f64();
        Ok(report)
    }

    async fn ensure_trigger(&self, table: &str) -> StandardsResult<TriggerOutcome> {
        if !self.catalog.column_exists(table, UPDATED_AT_COLUMN).await? {
            return Ok(TriggerOutcome::NotApplicable);
        }
        if self
            .catalog
            .trigger_exists(table, &updated_at_trigger_name(table))
            .await?
        {
            return Ok(TriggerOutcome::AlreadyPresent);
        }
        // A concurrent creator between the check and here yields AlreadyPresent.
        Ok(self.maintenance.create_updated_at_trigger(table).await?)
    }

    /// Fix sequences and the trigger of one table, then drop its cache entry.
    pub async fn apply_table_standards(&self, table: &str) -> StandardsResult<TableStandardsReport> {
        self.stats
            .with_timing("applyTableStandards", json!({ "table": table }), || async {
                let tables = [table.to_string()];
                let sequences = self.fix_sequences(Some(tables.as_slice())).await?;
                let triggers = self.fix_triggers(Some(tables.as_slice())).await?;
                self.cache.invalidate(table);
                StandardsResult::Ok(TableStandardsReport {
                    table: table.to_string(),
                    sequences,
                    triggers,
                })
            })
            .await
    }

    /// Whole-database repair through the packaged `fix_db()` routine.
    pub async fn fix_all(&self) -> StandardsResult<()> {
        self.stats
            .with_timing("fixAll", json!({}), || async {
                self.maintenance.install(SqlAsset::UpdatedAtFunction).await?;
                self.maintenance.install(SqlAsset::FixDb).await?;
                self.maintenance.fix_db().await?;
                self.cache.clear();
                StandardsResult::Ok(())
            })
            .await
    }

    /// Install every packaged SQL routine
    pub async fn install_functions(&self) -> StandardsResult<Vec<SqlAsset>> {
        self.stats
            .with_timing("installFunctions", json!({}), || async {
                for asset in SqlAsset::ALL {
                    self.maintenance.install(asset).await?;
                }
                StandardsResult::Ok(SqlAsset::ALL.to_vec())
            })
            .await
    }

    /// Repair, or with `dry_run` only report, sequences and triggers per table.
    pub async fn apply_best_practices(
        &self,
        tables: Option<&[String]>,
        dry_run: bool,
    ) -> StandardsResult<BestPracticesReport> {
        self.stats
            .with_timing(
                "applyBestPractices",
                json!({ "tables": tables.map(<[String]>::len), "dry_run": dry_run }),
                || self.run_best_practices(tables, dry_run),
            )
            .await
    }

    async fn run_best_practices(
        &self,
        tables: Option<&[String]>,
        dry_run: bool,
    ) -> StandardsResult<BestPracticesReport> {
        let mut report = BestPracticesReport {
            dry_run,
            ..BestPracticesReport::default()
        };

        for table in self.all_tables(tables).await? {
            report.tables_processed += 1;
            let single = [table.clone()];

            if dry_run {
                let validation = self.validator.validate_table(&table).await?;
                for finding in &validation.findings {
                    match finding {
                        Finding::SequenceNeedsReset { sequence } => {
                            report.sequences_fixed.push(sequence.clone());
                        }
                        Finding::MissingTrigger => {
                            report.triggers_created.push(table.clone());
                        }
                        _ => {}
                    }
                }
            } else {
                let sequences = self.fix_sequences(Some(single.as_slice())).await?;
                report.sequences_fixed.extend(sequences.sequences_fixed);
                let triggers = self.fix_triggers(Some(single.as_slice())).await?;
                report.triggers_created.extend(triggers.created());
            }
        }

        Ok(report)
    }

    /// True when the table has its update trigger and every owned sequence
    /// has been called at least once. Cached per table.
    pub async fn has_standards_applied(&self, table: &str) -> StandardsResult<bool> {
        if let Some(cached) = self.cache.get(table) {
            return Ok(cached);
        }

        let has_trigger = self
            .catalog
            .trigger_exists(table, &updated_at_trigger_name(table))
            .await?;
        let mut sequences_ok = true;
        if has_trigger {
            for sequence in self.catalog.table_sequences(table).await? {
                if self.catalog.sequence_last_value(&sequence).await? < 1 {
                    sequences_ok = false;
                    break;
                }
            }
        }

        let applied = has_trigger && sequences_ok;
        self.cache.insert(table, applied);
        Ok(applied)
    }

    /// Create or drop the DDL event trigger.
    pub async fn enable_event_triggers(&self, enable: bool) -> StandardsResult<EventTriggerStatus> {
        let result = self
            .stats
            .with_timing("enableEventTriggers", json!({ "enabled": enable }), || async {
                if enable {
                    // The event trigger function calls into the other two routines.
                    for asset in SqlAsset::ALL {
                        self.maintenance.install(asset).await?;
                    }
                    self.maintenance.create_event_trigger(EVENT_TRIGGER_NAME).await?;
                    StandardsResult::Ok(EventTriggerStatus {
                        enabled: true,
                        message: "Event triggers enabled - standards will be automatically applied to new tables"
                            .to_string(),
                    })
                } else {
                    self.maintenance.drop_event_trigger(EVENT_TRIGGER_NAME).await?;
                    StandardsResult::Ok(EventTriggerStatus {
                        enabled: false,
                        message: "Event triggers disabled".to_string(),
                    })
                }
            })
            .await;

        if let Err(e) = &result {
            tracing::error!(error = %e, enable, "Failed to configure event triggers");
        }
        result
    }

    /// Text of the routines a standards migration calls, in install order
    pub fn migration_routines(&self) -> StandardsResult<Vec<String>> {
        [SqlAsset::UpdatedAtFunction, SqlAsset::FixDb]
            .into_iter()
            .map(|asset| Ok(self.maintenance.script(asset)?))
            .collect()
    }

    pub async fn event_triggers_enabled(&self) -> StandardsResult<bool> {
        Ok(self.catalog.event_trigger_enabled(EVENT_TRIGGER_NAME).await?)
    }
}
