use indexmap::IndexMap;
use pgkeep_core::{DuplicateIndexGroup, LargeTable, UnusedIndex};
use serde::{Deserialize, Serialize};

use crate::{OperationStatsSnapshot, ValidationReport};

/// Tables above this total relation size count against performance
pub const LARGE_TABLE_BYTES: i64 = 104_857_600;

/// Rolling average above which an operation counts as slow, in seconds
pub const SLOW_AVERAGE_SECS: f64 = 1.0;

/// Checks scoring below this contribute their recommendation
pub const RECOMMENDATION_THRESHOLD: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    /// 80 and above is healthy, 60 and above a warning
    pub fn from_score(score: u8) -> Self {
        if score >= 80 {
            HealthStatus::Healthy
        } else if score >= 60 {
            HealthStatus::Warning
        } else {
            HealthStatus::Critical
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Warning => write!(f, "warning"),
            HealthStatus::Critical => write!(f, "critical"),
        }
    }
}

/// The five checks, in reporting order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthCheckKind {
    Sequences,
    Triggers,
    Structure,
    Performance,
    Indexes,
}

impl HealthCheckKind {
    pub const ALL: [HealthCheckKind; 5] = [
        HealthCheckKind::Sequences,
        HealthCheckKind::Triggers,
        HealthCheckKind::Structure,
        HealthCheckKind::Performance,
        HealthCheckKind::Indexes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            HealthCheckKind::Sequences => "sequences",
            HealthCheckKind::Triggers => "triggers",
            HealthCheckKind::Structure => "structure",
            HealthCheckKind::Performance => "performance",
            HealthCheckKind::Indexes => "indexes",
        }
    }
}

impl std::fmt::Display for HealthCheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Check-specific detail, present only when the check found problems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckDetails {
    Sequences {
        problem_sequences: Vec<String>,
    },
    Triggers {
        missing_triggers: Vec<String>,
    },
    Structure {
        errors: IndexMap<String, Vec<String>>,
        warnings: IndexMap<String, Vec<String>>,
    },
    Performance {
        issues: Vec<String>,
    },
    Indexes {
        unused_indexes: Vec<String>,
        duplicate_indexes: Vec<DuplicateIndexGroup>,
    },
}

/// Result of one check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub message: String,
    pub score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<CheckDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl HealthCheckResult {
    fn new(status: HealthStatus, message: String, score: u8) -> Self {
        Self {
            status,
            message,
            score,
            details: None,
            recommendation: None,
        }
    }

    fn with_problems(mut self, details: CheckDetails, recommendation: &str) -> Self {
        self.details = Some(details);
        self.recommendation = Some(recommendation.to_string());
        self
    }

    /// Tables missing the update trigger, for a trigger check with problems
    pub fn missing_triggers(&self) -> &[String] {
        match &self.details {
            Some(CheckDetails::Triggers { missing_triggers }) => missing_triggers,
            _ => &[],
        }
    }

    pub fn problem_sequences(&self) -> &[String] {
        match &self.details {
            Some(CheckDetails::Sequences { problem_sequences }) => problem_sequences,
            _ => &[],
        }
    }
}

/// Aggregate of all five checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallHealth {
    pub overall_score: u8,
    pub checks: IndexMap<HealthCheckKind, HealthCheckResult>,
    pub recommendations: Vec<String>,
}

impl OverallHealth {
    pub fn check(&self, kind: HealthCheckKind) -> Option<&HealthCheckResult> {
        self.checks.get(&kind)
    }
}

fn clamp_score(score: f64) -> u8 {
    score.round().clamp(0.0, 100.0) as u8
}

fn ratio_score(total: usize, problems: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    clamp_score(100.0 * total.saturating_sub(problems) as f64 / total as f64)
}

/// Score sequence health from the total count and the problematic names
pub fn score_sequences(total: usize, problems: Vec<String>) -> HealthCheckResult {
    let count = problems.len();
    let status = match count {
        0 => HealthStatus::Healthy,
        1..=2 => HealthStatus::Warning,
        _ => HealthStatus::Critical,
    };
    let message = if count == 0 {
        format!("All {} sequences are properly configured", total)
    } else {
        format!("{} of {} sequences need attention", count, total)
    };

    let result = HealthCheckResult::new(status, message, ratio_score(total, count));
    if count == 0 {
        return result;
    }
    result.with_problems(
        CheckDetails::Sequences {
            problem_sequences: problems,
        },
        "Run `pgkeep fix` to fix sequence issues",
    )
}

/// Score trigger health over tables that have an `updated_at` column
pub fn score_triggers(total: usize, missing: Vec<String>) -> HealthCheckResult {
    let count = missing.len();
    let status = match count {
        0 => HealthStatus::Healthy,
        1..=4 => HealthStatus::Warning,
        _ => HealthStatus::Critical,
    };
    let message = if count == 0 {
        format!("All {} tables with updated_at have triggers", total)
    } else {
        format!("{} of {} tables missing updated_at triggers", count, total)
    };

    let result = HealthCheckResult::new(status, message, ratio_score(total, count));
    if count == 0 {
        return result;
    }
    result.with_problems(
        CheckDetails::Triggers {
            missing_triggers: missing,
        },
        "Run `pgkeep fix` to add missing triggers",
    )
}

/// Score a full validation run. Counts are tables with errors and tables
/// with warnings.
pub fn score_structure(report: &ValidationReport) -> HealthCheckResult {
    let errors = report.errors();
    let warnings = report.warnings();
    let checked = report.tables_checked();

    let score = if checked == 0 {
        100
    } else {
        let error_penalty = errors.len() as f64 / checked as f64 * 50.0;
        let warning_penalty = warnings.len() as f64 / checked as f64 * 25.0;
        clamp_score(100.0 - error_penalty - warning_penalty)
    };
    let status = if !errors.is_empty() {
        HealthStatus::Critical
    } else if !warnings.is_empty() {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    };
    let message = format!(
        "Checked {} tables: {} errors, {} warnings",
        checked,
        errors.len(),
        warnings.len()
    );

    let result = HealthCheckResult::new(status, message, score);
    if errors.is_empty() && warnings.is_empty() {
        return result;
    }
    result.with_problems(
        CheckDetails::Structure { errors, warnings },
        "Review structure validation errors and update schema accordingly",
    )
}

/// Score slow operations and large tables
pub fn score_performance(stats: &OperationStatsSnapshot, large_tables: &[LargeTable]) -> HealthCheckResult {
    let mut issues = Vec::new();
    let mut score = 100.0;

    for (operation, stat) in &stats.operations {
        if stat.average_time > SLOW_AVERAGE_SECS {
            score -= 20.0;
            issues.push(format!("{} averaging {:.2}s", operation, stat.average_time));
        }
    }

    let per_table = (30.0 / large_tables.len().max(1) as f64).min(10.0);
    for table in large_tables {
        score -= per_table;
        issues.push(format!("Large table: {} ({})", table.table_name, table.size));
    }

    let score = clamp_score(score);
    let message = if issues.is_empty() {
        "No performance concerns detected"
    } else {
        "Performance issues detected"
    };

    let result = HealthCheckResult::new(HealthStatus::from_score(score), message.to_string(), score);
    if issues.is_empty() {
        return result;
    }
    result.with_problems(
        CheckDetails::Performance { issues },
        "Consider using selective operations for large tables and optimizing slow operations",
    )
}

/// Score unused and duplicate indexes
pub fn score_indexes(unused: &[UnusedIndex], duplicates: &[DuplicateIndexGroup]) -> HealthCheckResult {
    let unused_penalty = (unused.len() * 10).min(50);
    let duplicate_penalty = (duplicates.len() * 15).min(30);
    let score = 100 - (unused_penalty + duplicate_penalty) as u8;

    let mut issues = Vec::new();
    if !unused.is_empty() {
        issues.push(format!("{} unused indexes consuming space", unused.len()));
    }
    if !duplicates.is_empty() {
        issues.push(format!("{} duplicate indexes found", duplicates.len()));
    }
    let message = if issues.is_empty() {
        "Index configuration is optimal".to_string()
    } else {
        issues.join(", ")
    };

    let result = HealthCheckResult::new(HealthStatus::from_score(score), message, score);
    if issues.is_empty() {
        return result;
    }
    result.with_problems(
        CheckDetails::Indexes {
            unused_indexes: unused.iter().map(|i| i.index_name.clone()).collect(),
            duplicate_indexes: duplicates.to_vec(),
        },
        "Review and remove unused or duplicate indexes to improve performance",
    )
}

/// Combine check results: the rounded mean score, and the recommendation of
/// every check scoring below 80 in check order.
pub fn aggregate(checks: IndexMap<HealthCheckKind, HealthCheckResult>) -> OverallHealth {
    let overall_score = if checks.is_empty() {
        100
    } else {
        let total: u32 = checks.values().map(|c| u32::from(c.score)).sum();
        clamp_score(f64::from(total) / checks.len() as f64)
    };

    let recommendations = HealthCheckKind::ALL
        .iter()
        .filter_map(|kind| checks.get(kind))
        .filter(|c| c.score < RECOMMENDATION_THRESHOLD)
        .filter_map(|c| c.recommendation.clone())
        .collect();

    OverallHealth {
        overall_score,
        checks,
        recommendations,
    }
}
