//! PostgreSQL catalog queries

use async_trait::async_trait;
use pgkeep_core::{
    Catalog, ColumnInfo, Connection, ConstraintInfo, ConstraintKind, DuplicateIndexGroup,
    LargeTable, Result, SequenceEntry, UnusedIndex, Value, qualified_name, quote_ident,
};
use std::sync::Arc;

use crate::SqlAssets;

/// Catalog and maintenance adapter bound to one schema.
///
/// Works over any [`Connection`], so it can be driven by a live
/// `PostgresConnection` or a test double.
pub struct PgCatalog {
    pub(crate) conn: Arc<dyn Connection>,
    pub(crate) schema: String,
    pub(crate) assets: SqlAssets,
}

impl PgCatalog {
    pub fn new(conn: Arc<dyn Connection>, schema: impl Into<String>, assets: SqlAssets) -> Self {
        Self {
            conn,
            schema: schema.into(),
            assets,
        }
    }

    /// `"schema"."name"`
    pub(crate) fn qualified(&self, name: &str) -> String {
        qualified_name(&self.schema, name)
    }

    async fn strings(&self, sql: &str, params: &[Value]) -> Result<Vec<String>> {
        let result = self.conn.query(sql, params).await?;
        Ok(result
            .rows
            .iter()
            .map(|row| {
                row.get(0)
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string()
            })
            .collect())
    }

    async fn exists(&self, sql: &str, params: &[Value]) -> Result<bool> {
        Ok(self.conn.query(sql, params).await?.has_rows())
    }

    async fn single_i64(&self, sql: &str) -> Result<i64> {
        let result = self.conn.query(sql, &[]).await?;
        Ok(result
            .first()
            .and_then(|row| row.get(0))
            .and_then(|v| v.as_i64())
            .unwrap_or(0))
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    fn schema(&self) -> &str {
        &self.schema
    }

    #[tracing::instrument(skip(self))]
    async fn list_tables(&self) -> Result<Vec<String>> {
        self.strings(
            "SELECT tablename FROM pg_tables WHERE schemaname = $1 ORDER BY tablename",
            &[Value::from(self.schema.as_str())],
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn tables_with_column(&self, column: &str) -> Result<Vec<String>> {
        self.strings(
            "SELECT table_name::text FROM information_schema.columns
             WHERE column_name = $1 AND table_schema = $2
             ORDER BY table_name",
            &[Value::from(column), Value::from(self.schema.as_str())],
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let result = self
            .conn
            .query(
                "SELECT column_name::text, data_type::text, is_nullable::text
                 FROM information_schema.columns
                 WHERE table_name = $1 AND table_schema = $2
                 ORDER BY ordinal_position",
                &[Value::from(table), Value::from(self.schema.as_str())],
            )
            .await?;

        Ok(result
            .rows
            .iter()
            .map(|row| ColumnInfo {
                name: row.text("column_name"),
                data_type: row.text("data_type"),
                nullable: row.text("is_nullable") == "YES",
            })
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        self.exists(
            "SELECT 1 FROM information_schema.columns
             WHERE table_name = $1 AND column_name = $2 AND table_schema = $3",
            &[
                Value::from(table),
                Value::from(column),
                Value::from(self.schema.as_str()),
            ],
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn indexes(&self, table: &str) -> Result<Vec<String>> {
        self.strings(
            "SELECT indexname FROM pg_indexes WHERE tablename = $1 AND schemaname = $2",
            &[Value::from(table), Value::from(self.schema.as_str())],
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn constraints(&self, table: &str) -> Result<Vec<ConstraintInfo>> {
        let result = self
            .conn
            .query(
                "SELECT con.conname::text AS conname, con.contype::text AS contype
                 FROM pg_constraint con
                 JOIN pg_class tbl ON tbl.oid = con.conrelid
                 JOIN pg_namespace ns ON ns.oid = tbl.relnamespace
                 WHERE tbl.relname = $1 AND ns.nspname = $2",
                &[Value::from(table), Value::from(self.schema.as_str())],
            )
            .await?;

        let constraints = result
            .rows
            .iter()
            .filter_map(|row| {
                let name = row.text("conname");
                let code = row.text("contype");
                match ConstraintKind::from_code(&code) {
                    Some(kind) => Some(ConstraintInfo { name, kind }),
                    None => {
                        tracing::debug!(constraint = %name, contype = %code, "skipping unknown constraint type");
                        None
                    }
                }
            })
            .collect();
        Ok(constraints)
    }

    #[tracing::instrument(skip(self))]
    async fn table_sequences(&self, table: &str) -> Result<Vec<String>> {
        self.strings(
            "SELECT seq.relname::text AS sequence_name
             FROM pg_class seq
             JOIN pg_depend dep ON seq.oid = dep.objid
             JOIN pg_class tbl ON dep.refobjid = tbl.oid
             WHERE seq.relkind = 'S'
               AND tbl.relname = $1
               AND tbl.relnamespace = (SELECT oid FROM pg_namespace WHERE nspname = $2)
             ORDER BY seq.relname",
            &[Value::from(table), Value::from(self.schema.as_str())],
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn sequence_column(&self, table: &str, sequence: &str) -> Result<Option<String>> {
        let columns = self
            .strings(
                "SELECT att.attname::text AS column_name
                 FROM pg_attribute att
                 JOIN pg_class tbl ON att.attrelid = tbl.oid
                 JOIN pg_depend dep ON dep.refobjid = tbl.oid
                 JOIN pg_class seq ON seq.oid = dep.objid
                 WHERE tbl.relname = $1
                   AND seq.relname = $2
                   AND att.attnum = dep.refobjsubid
                   AND tbl.relnamespace = (SELECT oid FROM pg_namespace WHERE nspname = $3)",
                &[
                    Value::from(table),
                    Value::from(sequence),
                    Value::from(self.schema.as_str()),
                ],
            )
            .await?;
        Ok(columns.into_iter().find(|c| !c.is_empty()))
    }

    #[tracing::instrument(skip(self))]
    async fn sequence_last_value(&self, sequence: &str) -> Result<i64> {
        self.single_i64(&format!(
            "SELECT last_value::bigint AS last_value FROM {}",
            self.qualified(sequence)
        ))
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn column_max(&self, table: &str, column: &str) -> Result<i64> {
        self.single_i64(&format!(
            "SELECT COALESCE(MAX({}), 0)::bigint AS max_val FROM {}",
            quote_ident(column),
            self.qualified(table)
        ))
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn trigger_exists(&self, table: &str, trigger: &str) -> Result<bool> {
        self.exists(
            "SELECT 1 FROM information_schema.triggers
             WHERE trigger_name = $1 AND event_object_table = $2 AND trigger_schema = $3",
            &[
                Value::from(trigger),
                Value::from(table),
                Value::from(self.schema.as_str()),
            ],
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn all_sequences(&self) -> Result<Vec<SequenceEntry>> {
        let result = self
            .conn
            .query(
                "SELECT seq.relname::text AS sequence_name,
                        tbl.relname::text AS table_name,
                        COALESCE(ps.last_value, 0)::bigint AS last_value
                 FROM pg_class seq
                 JOIN pg_depend dep ON seq.oid = dep.objid
                 JOIN pg_class tbl ON dep.refobjid = tbl.oid
                 JOIN pg_sequences ps ON ps.sequencename = seq.relname AND ps.schemaname = $1
                 WHERE seq.relkind = 'S'
                   AND tbl.relnamespace = (SELECT oid FROM pg_namespace WHERE nspname = $1)
                 ORDER BY tbl.relname, seq.relname",
                &[Value::from(self.schema.as_str())],
            )
            .await?;

        Ok(result
            .rows
            .iter()
            .map(|row| SequenceEntry {
                sequence_name: row.text("sequence_name"),
                table_name: row.text("table_name"),
                last_value: row
                    .get_by_name("last_value")
                    .and_then(|v| v.as_i64())
                    .unwrap_or(0),
            })
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn large_tables(&self, min_bytes: i64) -> Result<Vec<LargeTable>> {
        let result = self
            .conn
            .query(
                "SELECT tablename::text AS tablename,
                        pg_size_pretty(pg_total_relation_size(quote_ident(schemaname) || '.' || quote_ident(tablename))) AS size
                 FROM pg_tables
                 WHERE schemaname = $1
                   AND pg_total_relation_size(quote_ident(schemaname) || '.' || quote_ident(tablename)) > $2
                 ORDER BY pg_total_relation_size(quote_ident(schemaname) || '.' || quote_ident(tablename)) DESC",
                &[Value::from(self.schema.as_str()), Value::Int64(min_bytes)],
            )
            .await?;

        Ok(result
            .rows
            .iter()
            .map(|row| LargeTable {
                table_name: row.text("tablename"),
                size: row.text("size"),
            })
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn unused_indexes(&self) -> Result<Vec<UnusedIndex>> {
        let result = self
            .conn
            .query(
                "SELECT relname::text AS tablename,
                        indexrelname::text AS indexname,
                        idx_scan,
                        pg_size_pretty(pg_relation_size(indexrelid)) AS index_size
                 FROM pg_stat_user_indexes
                 WHERE schemaname = $1
                   AND idx_scan = 0
                   AND indexrelname NOT LIKE '%_pkey'
                   AND pg_relation_size(indexrelid) > 1048576
                 ORDER BY pg_relation_size(indexrelid) DESC",
                &[Value::from(self.schema.as_str())],
            )
            .await?;

        Ok(result
            .rows
            .iter()
            .map(|row| UnusedIndex {
                table_name: row.text("tablename"),
                index_name: row.text("indexname"),
                index_size: row.text("index_size"),
            })
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn duplicate_indexes(&self) -> Result<Vec<DuplicateIndexGroup>> {
        let result = self
            .conn
            .query(
                "SELECT idx.indrelid::regclass::text AS table_name,
                        array_agg(idx.indexrelid::regclass::text ORDER BY idx.indexrelid) AS indexes
                 FROM pg_index idx
                 JOIN pg_class tbl ON tbl.oid = idx.indrelid
                 WHERE tbl.relnamespace = (SELECT oid FROM pg_namespace WHERE nspname = $1)
                 GROUP BY idx.indrelid, idx.indkey
                 HAVING COUNT(*) > 1",
                &[Value::from(self.schema.as_str())],
            )
            .await?;

        Ok(result
            .rows
            .iter()
            .map(|row| DuplicateIndexGroup {
                table_name: row.text("table_name"),
                indexes: row
                    .get_by_name("indexes")
                    .and_then(|v| v.as_string_array())
                    .unwrap_or_default(),
            })
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn event_trigger_enabled(&self, name: &str) -> Result<bool> {
        self.exists(
            "SELECT 1 FROM pg_event_trigger WHERE evtname = $1 AND evtenabled <> 'D'",
            &[Value::from(name)],
        )
        .await
    }
}
