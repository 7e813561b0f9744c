use std::future::Future;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::Settings;

/// How operations are measured and logged
#[derive(Debug, Clone, PartialEq)]
pub struct TimingConfig {
    pub log_slow_operations: bool,
    pub slow_threshold: Duration,
    pub enable_statistics: bool,
    pub log_success: bool,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            log_slow_operations: true,
            slow_threshold: Duration::from_millis(1000),
            enable_statistics: true,
            log_success: false,
        }
    }
}

impl TimingConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            log_slow_operations: settings.performance.log_slow_operations,
            slow_threshold: Duration::from_millis(settings.performance.slow_operation_threshold_ms),
            enable_statistics: settings.performance.enable_statistics,
            log_success: settings.logging.log_success,
        }
    }
}

/// Rolling statistics for one operation name. Times are in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationStat {
    pub count: u64,
    pub total_time: f64,
    pub average_time: f64,
    pub last_time: f64,
}

impl OperationStat {
    fn record(&mut self, seconds: f64) {
        self.count += 1;
        self.total_time += seconds;
        self.average_time = self.total_time / self.count as f64;
        self.last_time = seconds;
    }
}

/// Point-in-time copy of all statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationStatsSnapshot {
    pub total_operations: u64,
    pub operations: IndexMap<String, OperationStat>,
}

#[derive(Default)]
struct StatsState {
    last_operation_time: Option<Duration>,
    operations: IndexMap<String, OperationStat>,
}

/// Collects timing for named operations.
///
/// Owned by the caller and shared by reference; safe to use from several
/// tasks at once.
pub struct StatsCollector {
    config: TimingConfig,
    state: Mutex<StatsState>,
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new(TimingConfig::default())
    }
}

impl StatsCollector {
    pub fn new(config: TimingConfig) -> Self {
        Self {
            config,
            state: Mutex::new(StatsState::default()),
        }
    }

    pub fn config(&self) -> &TimingConfig {
        &self.config
    }

    /// Run `f`, recording its duration whether it succeeds or fails.
    pub async fn with_timing<F, Fut, T, E>(
        &self,
        operation: &str,
        context: serde_json::Value,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let start = Instant::now();
        let result = f().await;
        let elapsed = start.elapsed();

        match &result {
            Ok(_) => self.record(operation, elapsed, &context, true),
            Err(e) => {
                let mut context = context;
                match context.as_object_mut() {
                    Some(map) => {
                        map.insert("error".to_string(), serde_json::Value::String(e.to_string()));
                        map.insert("failed".to_string(), serde_json::Value::Bool(true));
                    }
                    None => {
                        context = serde_json::json!({
                            "context": context,
                            "error": e.to_string(),
                            "failed": true,
                        });
                    }
                }
                self.record(operation, elapsed, &context, false);
            }
        }

        result
    }

    /// Record one measured run of `operation`
    pub fn record(&self, operation: &str, elapsed: Duration, context: &serde_json::Value, success: bool) {
        {
            let mut state = self.state.lock();
            state.last_operation_time = Some(elapsed);
            if self.config.enable_statistics {
                state
                    .operations
                    .entry(operation.to_string())
                    .or_default()
                    .record(elapsed.as_secs_f64());
            }
        }

        let duration = elapsed.as_secs_f64();
        if self.config.log_slow_operations && elapsed > self.config.slow_threshold {
            tracing::warn!(
                operation = %operation,
                duration,
                context = %context,
                "Slow PostgreSQL helper operation: {}",
                operation
            );
        }
        if success && self.config.log_success {
            tracing::info!(
                operation = %operation,
                duration,
                context = %context,
                "PostgreSQL helper operation completed: {}",
                operation
            );
        }
    }

    /// Duration of the most recent operation, if any ran
    pub fn last_operation_time(&self) -> Option<Duration> {
        self.state.lock().last_operation_time
    }

    pub fn operation(&self, name: &str) -> Option<OperationStat> {
        self.state.lock().operations.get(name).cloned()
    }

    pub fn snapshot(&self) -> OperationStatsSnapshot {
        let state = self.state.lock();
        OperationStatsSnapshot {
            total_operations: state.operations.values().map(|s| s.count).sum(),
            operations: state.operations.clone(),
        }
    }

    /// Forget all statistics and the last operation time
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.last_operation_time = None;
        state.operations.clear();
    }
}
