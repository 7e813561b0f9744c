//! Common test utilities and mocks

use async_trait::async_trait;
use pgkeep_core::{
    ColumnMeta, Connection, PgKeepError, QueryResult, Result, Row, StatementResult, Value,
};
use std::sync::Arc;

/// Mock connection for testing the catalog adapter without a real database.
///
/// Query responses are matched by SQL substring; every statement is logged
/// together with its parameters for assertions.
pub struct MockConnection {
    pub should_fail: bool,
    /// SQL-pattern-based responses: if a query contains the pattern string,
    /// the corresponding result is returned.
    pub query_responses: Vec<(String, QueryResult)>,
    /// SQL-pattern-based execute failures
    pub execute_failures: Vec<(String, fn(String) -> PgKeepError)>,
    pub query_log: Arc<parking_lot::Mutex<Vec<(String, Vec<Value>)>>>,
    pub execute_log: Arc<parking_lot::Mutex<Vec<String>>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            should_fail: false,
            query_responses: vec![],
            execute_failures: vec![],
            query_log: Arc::new(parking_lot::Mutex::new(Vec::new())),
            execute_log: Arc::new(parking_lot::Mutex::new(Vec::new())),
        }
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Register a response for queries containing the given SQL pattern.
    pub fn with_query_response(
        mut self,
        sql_contains: impl Into<String>,
        result: QueryResult,
    ) -> Self {
        self.query_responses.push((sql_contains.into(), result));
        self
    }

    /// Make executes containing the pattern fail with the given error.
    pub fn with_execute_failure(
        mut self,
        sql_contains: impl Into<String>,
        error: fn(String) -> PgKeepError,
    ) -> Self {
        self.execute_failures.push((sql_contains.into(), error));
        self
    }

    pub fn queries(&self) -> Vec<(String, Vec<Value>)> {
        self.query_log.lock().clone()
    }

    pub fn executed(&self) -> Vec<String> {
        self.execute_log.lock().clone()
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, sql: &str, _params: &[Value]) -> Result<StatementResult> {
        self.execute_log.lock().push(sql.to_string());
        if self.should_fail {
            return Err(PgKeepError::Query("Execute failed".into()));
        }
        for (pattern, error) in &self.execute_failures {
            if sql.contains(pattern.as_str()) {
                return Err(error(format!("simulated failure for {}", pattern)));
            }
        }
        Ok(StatementResult { affected_rows: 0 })
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.query_log.lock().push((sql.to_string(), params.to_vec()));

        if self.should_fail {
            return Err(PgKeepError::Connection("connection lost".into()));
        }

        for (pattern, result) in &self.query_responses {
            if sql.contains(pattern.as_str()) {
                return Ok(result.clone());
            }
        }
        Ok(QueryResult::empty())
    }

    async fn batch_execute(&self, sql: &str) -> Result<()> {
        self.execute(sql, &[]).await.map(|_| ())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.should_fail
    }
}

/// Helper to create a mock QueryResult with the given columns and rows
pub fn mock_query_result(column_names: Vec<&str>, row_data: Vec<Vec<Value>>) -> QueryResult {
    let columns: Vec<ColumnMeta> = column_names
        .iter()
        .enumerate()
        .map(|(ordinal, name)| ColumnMeta {
            name: name.to_string(),
            data_type: "text".to_string(),
            ordinal,
        })
        .collect();
    let names: Vec<String> = column_names.iter().map(|s| s.to_string()).collect();
    let rows = row_data
        .into_iter()
        .map(|values| Row::new(names.clone(), values))
        .collect();

    QueryResult {
        rows,
        columns,
        ..QueryResult::empty()
    }
}

/// Helper to create a single-column result
pub fn mock_single_column(column: &str, values: Vec<Value>) -> QueryResult {
    mock_query_result(vec![column], values.into_iter().map(|v| vec![v]).collect())
}

pub fn s(value: &str) -> Value {
    Value::String(value.to_string())
}
