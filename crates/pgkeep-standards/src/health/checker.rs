use std::sync::Arc;

use indexmap::IndexMap;
use pgkeep_core::{Catalog, SequenceEntry, updated_at_trigger_name};
use serde_json::json;

use crate::{
    HealthCheckKind, HealthCheckResult, LARGE_TABLE_BYTES, OverallHealth, StandardsResult,
    StatsCollector, StructureValidator, UPDATED_AT_COLUMN, aggregate, score_indexes,
    score_performance, score_sequences, score_structure, score_triggers,
};

/// Runs the health checks against a catalog
#[derive(Clone)]
pub struct HealthChecker {
    catalog: Arc<dyn Catalog>,
    validator: StructureValidator,
    stats: Arc<StatsCollector>,
}

impl HealthChecker {
    pub fn new(catalog: Arc<dyn Catalog>, validator: StructureValidator, stats: Arc<StatsCollector>) -> Self {
        Self {
            catalog,
            validator,
            stats,
        }
    }

    /// Run all five checks and aggregate them
    pub async fn run(&self) -> StandardsResult<OverallHealth> {
        self.stats
            .with_timing("runHealthCheck", json!({}), || self.run_checks())
            .await
    }

    async fn run_checks(&self) -> StandardsResult<OverallHealth> {
        let mut checks = IndexMap::new();
        for kind in HealthCheckKind::ALL {
            let result = self.check(kind).await?;
            tracing::debug!(check = %kind, score = result.score, status = %result.status, "health check finished");
            checks.insert(kind, result);
        }
        Ok(aggregate(checks))
    }

    pub async fn check(&self, kind: HealthCheckKind) -> StandardsResult<HealthCheckResult> {
        match kind {
            HealthCheckKind::Sequences => self.check_sequences().await,
            HealthCheckKind::Triggers => self.check_triggers().await,
            HealthCheckKind::Structure => self.check_structure().await,
            HealthCheckKind::Performance => self.check_performance().await,
            HealthCheckKind::Indexes => self.check_indexes().await,
        }
    }

    pub async fn check_sequences(&self) -> StandardsResult<HealthCheckResult> {
        let sequences = self.catalog.all_sequences().await?;
        let mut problems = Vec::new();
        for sequence in &sequences {
            if self.is_problematic(sequence).await? {
                problems.push(sequence.sequence_name.clone());
            }
        }
        Ok(score_sequences(sequences.len(), problems))
    }

    /// Behind when never advanced past zero or below the owning column's max
    async fn is_problematic(&self, sequence: &SequenceEntry) -> StandardsResult<bool> {
        if sequence.last_value < 1 {
            return Ok(true);
        }
        let column = self
            .catalog
            .sequence_column(&sequence.table_name, &sequence.sequence_name)
            .await?;
        match column {
            Some(column) => {
                let max = self.catalog.column_max(&sequence.table_name, &column).await?;
                Ok(sequence.last_value < max)
            }
            None => Ok(false),
        }
    }

    pub async fn check_triggers(&self) -> StandardsResult<HealthCheckResult> {
        let tables = self.catalog.tables_with_column(UPDATED_AT_COLUMN).await?;
        let mut missing = Vec::new();
        for table in &tables {
            if !self
                .catalog
                .trigger_exists(table, &updated_at_trigger_name(table))
                .await?
            {
                missing.push(table.clone());
            }
        }
        Ok(score_triggers(tables.len(), missing))
    }

    pub async fn check_structure(&self) -> StandardsResult<HealthCheckResult> {
        let report = self.validator.validate(None).await?;
        Ok(score_structure(&report))
    }

    pub async fn check_performance(&self) -> StandardsResult<HealthCheckResult> {
        let large_tables = self.catalog.large_tables(LARGE_TABLE_BYTES).await?;
        Ok(score_performance(&self.stats.snapshot(), &large_tables))
    }

    pub async fn check_indexes(&self) -> StandardsResult<HealthCheckResult> {
        let unused = self.catalog.unused_indexes().await?;
        let duplicates = self.catalog.duplicate_indexes().await?;
        Ok(score_indexes(&unused, &duplicates))
    }
}
