use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{RuleSet, StandardsError, StandardsResult, ValidationRule};

/// Automatic standards behaviour
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoStandardsSettings {
    /// Prefer per-table repair over the whole-database routine
    pub selective_fixing: bool,
    /// Whether DDL event triggers should be enabled
    pub enable_event_triggers: bool,
}

/// Timing, statistics and caching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceSettings {
    pub log_slow_operations: bool,
    pub slow_operation_threshold_ms: u64,
    pub enable_statistics: bool,
    pub cache_duration_secs: u64,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            log_slow_operations: true,
            slow_operation_threshold_ms: 1000,
            enable_statistics: true,
            cache_duration_secs: 300,
        }
    }
}

impl PerformanceSettings {
    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(self.cache_duration_secs)
    }
}

/// Log output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `daily`, `single` or `stderr`
    pub channel: String,
    /// Emit an info record for every successful operation
    pub log_success: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            channel: "daily".to_string(),
            log_success: false,
        }
    }
}

/// All helper settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Schema to inspect and repair
    pub schema: String,
    /// Directory overriding the packaged SQL scripts
    pub sql_dir: Option<PathBuf>,
    pub auto_standards: AutoStandardsSettings,
    pub performance: PerformanceSettings,
    pub logging: LogSettings,
    /// Validation rules keyed by table-name glob
    pub table_validations: IndexMap<String, ValidationRule>,
}

impl Default for Settings {
    fn default() -> Self {
        let mut table_validations = IndexMap::new();
        table_validations.insert(
            "*_types".to_string(),
            ValidationRule::default()
                .with_required_columns(["id", "name", "created_at", "updated_at"])
                .with_required_indexes(["name_unique"]),
        );
        table_validations.insert(
            "permissions*".to_string(),
            ValidationRule::default().with_required_columns([
                "id",
                "name",
                "guard_name",
                "created_at",
                "updated_at",
            ]),
        );

        Self {
            schema: "public".to_string(),
            sql_dir: None,
            auto_standards: AutoStandardsSettings::default(),
            performance: PerformanceSettings::default(),
            logging: LogSettings::default(),
            table_validations,
        }
    }
}

const ENV_SELECTIVE_FIXING: &str = "POSTGRES_HELPER_SELECTIVE_FIXING";
const ENV_EVENT_TRIGGERS: &str = "POSTGRES_HELPER_EVENT_TRIGGERS";
const ENV_LOG_SLOW_OPS: &str = "POSTGRES_HELPER_LOG_SLOW_OPS";
const ENV_SLOW_THRESHOLD: &str = "POSTGRES_HELPER_SLOW_THRESHOLD";
const ENV_STATISTICS: &str = "POSTGRES_HELPER_STATISTICS";
const ENV_CACHE_DURATION: &str = "POSTGRES_HELPER_CACHE_DURATION";
const ENV_LOG_CHANNEL: &str = "POSTGRES_HELPER_LOG_CHANNEL";
const ENV_LOG_SUCCESS: &str = "POSTGRES_HELPER_LOG_SUCCESS";

fn parse_bool(key: &str, value: &str) -> StandardsResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(StandardsError::Settings(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}

fn parse_u64(key: &str, value: &str) -> StandardsResult<u64> {
    value.trim().parse::<u64>().map_err(|_| {
        StandardsError::Settings(format!(
            "{} must be a non-negative integer, got '{}'",
            key, value
        ))
    })
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml(text: &str) -> StandardsResult<Self> {
        toml::from_str(text).map_err(|e| StandardsError::Settings(e.to_string()))
    }

    /// Load settings from an optional file, then apply process environment overrides.
    pub fn load(path: Option<&Path>) -> StandardsResult<Self> {
        let mut settings = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    StandardsError::Settings(format!("cannot read {}: {}", path.display(), e))
                })?;
                tracing::debug!(path = %path.display(), "loaded settings file");
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        settings.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Apply `POSTGRES_HELPER_*` overrides using the given lookup
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> StandardsResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_SELECTIVE_FIXING) {
            self.auto_standards.selective_fixing = parse_bool(ENV_SELECTIVE_FIXING, &v)?;
        }
        if let Some(v) = lookup(ENV_EVENT_TRIGGERS) {
            self.auto_standards.enable_event_triggers = parse_bool(ENV_EVENT_TRIGGERS, &v)?;
        }
        if let Some(v) = lookup(ENV_LOG_SLOW_OPS) {
            self.performance.log_slow_operations = parse_bool(ENV_LOG_SLOW_OPS, &v)?;
        }
        if let Some(v) = lookup(ENV_SLOW_THRESHOLD) {
            self.performance.slow_operation_threshold_ms = parse_u64(ENV_SLOW_THRESHOLD, &v)?;
        }
        if let Some(v) = lookup(ENV_STATISTICS) {
            self.performance.enable_statistics = parse_bool(ENV_STATISTICS, &v)?;
        }
        if let Some(v) = lookup(ENV_CACHE_DURATION) {
            self.performance.cache_duration_secs = parse_u64(ENV_CACHE_DURATION, &v)?;
        }
        if let Some(v) = lookup(ENV_LOG_CHANNEL) {
            self.logging.channel = v.trim().to_string();
        }
        if let Some(v) = lookup(ENV_LOG_SUCCESS) {
            self.logging.log_success = parse_bool(ENV_LOG_SUCCESS, &v)?;
        }
        Ok(())
    }

    /// Compile the validation rules
    pub fn rule_set(&self) -> StandardsResult<RuleSet> {
        RuleSet::new(&self.table_validations)
    }
}
