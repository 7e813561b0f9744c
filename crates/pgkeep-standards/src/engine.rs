use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use pgkeep_core::{Catalog, Maintenance};
use serde::Serialize;
use serde_json::json;

use crate::{
    BestPracticesReport, EventTriggerStatus, HealthChecker, OperationStatsSnapshot, OverallHealth,
    RepairEngine, SequenceRepairReport, Settings, StandardsCache, StandardsMigration,
    StandardsResult, StatsCollector, StructureValidator, TableStandardsReport, TimingConfig,
    TriggerRepairReport, ValidationReport, tables_needing_standards,
};

/// Where a generated migration was written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedMigration {
    pub path: PathBuf,
    pub tables: Vec<String>,
}

/// Entry point tying validation, repair, health and statistics together.
///
/// Every public operation is timed into the engine's [`StatsCollector`].
pub struct StandardsEngine {
    catalog: Arc<dyn Catalog>,
    settings: Settings,
    stats: Arc<StatsCollector>,
    validator: StructureValidator,
    repair: RepairEngine,
    health: HealthChecker,
}

impl StandardsEngine {
    /// Build an engine with a fresh statistics collector
    pub fn new(
        catalog: Arc<dyn Catalog>,
        maintenance: Arc<dyn Maintenance>,
        settings: Settings,
    ) -> StandardsResult<Self> {
        let stats = Arc::new(StatsCollector::new(TimingConfig::from_settings(&settings)));
        Self::with_stats(catalog, maintenance, settings, stats)
    }

    /// Build an engine that records into an existing collector
    pub fn with_stats(
        catalog: Arc<dyn Catalog>,
        maintenance: Arc<dyn Maintenance>,
        settings: Settings,
        stats: Arc<StatsCollector>,
    ) -> StandardsResult<Self> {
        let rules = Arc::new(settings.rule_set()?);
        let validator = StructureValidator::new(catalog.clone(), rules);
        let cache = Arc::new(StandardsCache::new(settings.performance.cache_duration()));
        let repair = RepairEngine::new(
            catalog.clone(),
            maintenance,
            validator.clone(),
            stats.clone(),
            cache,
        );
        let health = HealthChecker::new(catalog.clone(), validator.clone(), stats.clone());

        Ok(Self {
            catalog,
            settings,
            stats,
            validator,
            repair,
            health,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn stats(&self) -> &Arc<StatsCollector> {
        &self.stats
    }

    pub fn repair(&self) -> &RepairEngine {
        &self.repair
    }

    pub fn health(&self) -> &HealthChecker {
        &self.health
    }

    pub fn validator(&self) -> &StructureValidator {
        &self.validator
    }

    pub async fn validate_structure(&self, tables: Option<&[String]>) -> StandardsResult<ValidationReport> {
        self.stats
            .with_timing(
                "validateStructure",
                json!({ "tables": tables.map(<[String]>::len) }),
                || self.validator.validate(tables),
            )
            .await
    }

    pub async fn run_health_check(&self) -> StandardsResult<OverallHealth> {
        self.health.run().await
    }

    pub async fn fix_sequences(&self, tables: Option<&[String]>) -> StandardsResult<SequenceRepairReport> {
        self.repair.fix_sequences(tables).await
    }

    pub async fn fix_triggers(&self, tables: Option<&[String]>) -> StandardsResult<TriggerRepairReport> {
        self.repair.fix_triggers(tables).await
    }

    pub async fn apply_table_standards(&self, table: &str) -> StandardsResult<TableStandardsReport> {
        self.repair.apply_table_standards(table).await
    }

    pub async fn fix_all(&self) -> StandardsResult<()> {
        self.repair.fix_all().await
    }

    pub async fn install_functions(&self) -> StandardsResult<()> {
        self.repair.install_functions().await.map(|_| ())
    }

    pub async fn apply_best_practices(
        &self,
        tables: Option<&[String]>,
        dry_run: bool,
    ) -> StandardsResult<BestPracticesReport> {
        self.repair.apply_best_practices(tables, dry_run).await
    }

    pub async fn has_standards_applied(&self, table: &str) -> StandardsResult<bool> {
        self.repair.has_standards_applied(table).await
    }

    pub async fn enable_event_triggers(&self, enable: bool) -> StandardsResult<EventTriggerStatus> {
        self.repair.enable_event_triggers(enable).await
    }

    pub async fn event_triggers_enabled(&self) -> StandardsResult<bool> {
        self.repair.event_triggers_enabled().await
    }

    /// Validate every table and build a migration for those needing repair.
    ///
    /// Returns `None` when nothing needs work.
    pub async fn build_standards_migration(&self) -> StandardsResult<Option<StandardsMigration>> {
        let report = self.validate_structure(None).await?;
        let tables = tables_needing_standards(&report);
        if tables.is_empty() {
            return Ok(None);
        }
        Ok(Some(StandardsMigration::generate(
            self.catalog.schema(),
            tables,
            self.repair.migration_routines()?,
            Local::now(),
        )))
    }

    /// Write the standards migration into `dir`. Nothing is written when no
    /// table needs work.
    pub async fn generate_standards_migration(&self, dir: &Path) -> StandardsResult<Option<GeneratedMigration>> {
        let Some(migration) = self.build_standards_migration().await? else {
            tracing::info!("all tables already have standards applied, no migration written");
            return Ok(None);
        };
        let path = migration.write_to(dir)?;
        Ok(Some(GeneratedMigration {
            path,
            tables: migration.tables,
        }))
    }

    pub fn last_operation_time(&self) -> Option<std::time::Duration> {
        self.stats.last_operation_time()
    }

    pub fn operation_stats(&self) -> OperationStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}
