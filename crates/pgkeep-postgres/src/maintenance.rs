//! Mutating statements issued by the repair engine

use async_trait::async_trait;
use pgkeep_core::{
    Maintenance, PgKeepError, Result, SqlAsset, TriggerOutcome, quote_ident, quote_literal,
    updated_at_trigger_name,
};

use crate::catalog::PgCatalog;

#[async_trait]
impl Maintenance for PgCatalog {
    #[tracing::instrument(skip(self))]
    async fn install(&self, asset: SqlAsset) -> Result<()> {
        let script = self.assets.get(asset)?;
        self.conn.batch_execute(script).await?;
        tracing::debug!(asset = asset.file_name(), "installed SQL routine");
        Ok(())
    }

    fn script(&self, asset: SqlAsset) -> Result<String> {
        self.assets.get(asset).map(str::to_string)
    }

    #[tracing::instrument(skip(self))]
    async fn reset_sequence(&self, table: &str, sequence: &str, column: &str) -> Result<i64> {
        // One statement: the max is read and applied atomically from the
        // caller's point of view, with is_called = true.
        let sql = format!(
            "SELECT setval({}, GREATEST((SELECT COALESCE(MAX({}), 0) FROM {})::bigint, 1), true) AS value",
            quote_literal(&self.qualified(sequence)),
            quote_ident(column),
            self.qualified(table),
        );
        let result = self.conn.query(&sql, &[]).await?;
        let value = result
            .first()
            .and_then(|row| row.get(0))
            .and_then(|v| v.as_i64())
            .ok_or_else(|| {
                PgKeepError::Query(format!("setval returned no value for {}", sequence))
            })?;
        tracing::debug!(sequence = %sequence, value, "sequence reset");
        Ok(value)
    }

    #[tracing::instrument(skip(self))]
    async fn create_updated_at_trigger(&self, table: &str) -> Result<TriggerOutcome> {
        let sql = format!(
            "CREATE TRIGGER {} BEFORE UPDATE ON {} FOR EACH ROW EXECUTE PROCEDURE public.update_updated_at_column()",
            quote_ident(&updated_at_trigger_name(table)),
            self.qualified(table),
        );
        match self.conn.execute(&sql, &[]).await {
            Ok(_) => Ok(TriggerOutcome::Created),
            Err(e) if e.is_duplicate_object() => {
                tracing::debug!(table = %table, "trigger created concurrently, treating as present");
                Ok(TriggerOutcome::AlreadyPresent)
            }
            Err(e) => Err(e),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn fix_db(&self) -> Result<()> {
        let sql = format!("SELECT public.fix_db({})", quote_literal(&self.schema));
        self.conn.execute(&sql, &[]).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn create_event_trigger(&self, name: &str) -> Result<()> {
        let name = quote_ident(name);
        let script = format!(
            "DROP EVENT TRIGGER IF EXISTS {name};
             CREATE EVENT TRIGGER {name} ON ddl_command_end
                 WHEN TAG IN ('CREATE TABLE')
                 EXECUTE FUNCTION public.auto_apply_table_standards();"
        );
        self.conn.batch_execute(&script).await
    }

    #[tracing::instrument(skip(self))]
    async fn drop_event_trigger(&self, name: &str) -> Result<()> {
        self.conn
            .execute(&format!("DROP EVENT TRIGGER IF EXISTS {}", quote_ident(name)), &[])
            .await?;
        Ok(())
    }
}
