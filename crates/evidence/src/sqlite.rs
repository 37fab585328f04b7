//! SQLite trace store.
//!
//! Lives next to the corpus tables so `trustgate traces` can find a
//! decision made by an earlier `trustgate analyze`.

use crate::EvidenceError;
use crate::trace::{DecisionTrace, TraceFilter, TraceStats, TraceStore};
use async_trait::async_trait;
use chrono::SecondsFormat;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::debug;
use trustgate_core::taxonomy::ReasonCode;
use uuid::Uuid;

pub struct SqliteTraceLog {
    pool: SqlitePool,
}

impl SqliteTraceLog {
    /// Use an open pool, typically the corpus's, creating the table if needed.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, EvidenceError> {
        let log = Self { pool };
        log.run_migrations().await?;
        Ok(log)
    }

    async fn run_migrations(&self) -> Result<(), EvidenceError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS decision_traces (
                trace_id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                domain TEXT NOT NULL,
                reason_code TEXT,
                confidence REAL NOT NULL,
                is_error INTEGER NOT NULL DEFAULT 0,
                trace TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| EvidenceError::Storage(format!("Trace migration failed: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_decision_traces_created ON decision_traces(created_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| EvidenceError::Storage(format!("Trace migration failed: {e}")))?;

        Ok(())
    }

    fn row_to_trace(row: &sqlx::sqlite::SqliteRow) -> Result<DecisionTrace, EvidenceError> {
        let json: String = row
            .try_get("trace")
            .map_err(|e| EvidenceError::Storage(format!("trace column: {e}")))?;
        serde_json::from_str(&json)
            .map_err(|e| EvidenceError::Storage(format!("Corrupt trace record: {e}")))
    }
}

#[async_trait]
impl TraceStore for SqliteTraceLog {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn save(&self, trace: &DecisionTrace) -> Result<(), EvidenceError> {
        let json = serde_json::to_string(trace)
            .map_err(|e| EvidenceError::Storage(format!("Trace encoding failed: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO decision_traces (
                trace_id, created_at, domain, reason_code, confidence, is_error, trace
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(trace.trace_id.to_string())
        // Fixed-width UTC timestamps sort as text
        .bind(trace.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .bind(trace.domain.to_string())
        .bind(trace.decision.reason_code().map(|r| r.as_str()))
        .bind(trace.decision.confidence)
        .bind(trace.is_error())
        .bind(json)
        .execute(&self.pool)
        .await
        .map_err(|e| EvidenceError::Storage(format!("INSERT trace failed: {e}")))?;

        debug!(trace_id = %trace.trace_id, "Decision trace persisted");
        Ok(())
    }

    async fn load(&self, trace_id: Uuid) -> Result<Option<DecisionTrace>, EvidenceError> {
        let row = sqlx::query("SELECT trace FROM decision_traces WHERE trace_id = ?1")
            .bind(trace_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| EvidenceError::Storage(format!("Trace lookup: {e}")))?;
        row.as_ref().map(Self::row_to_trace).transpose()
    }

    async fn recent(
        &self,
        filter: TraceFilter,
        limit: usize,
    ) -> Result<Vec<DecisionTrace>, EvidenceError> {
        let condition = match filter {
            TraceFilter::All => "1 = 1",
            TraceFilter::Abstained => "reason_code IS NOT NULL",
            TraceFilter::Errors => "is_error = 1",
        };
        let sql = format!(
            "SELECT trace FROM decision_traces WHERE {condition} \
             ORDER BY created_at DESC, rowid DESC LIMIT ?1"
        );

        let rows = sqlx::query(&sql)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| EvidenceError::Storage(format!("Trace listing: {e}")))?;
        rows.iter().map(Self::row_to_trace).collect()
    }

    async fn trace_stats(&self) -> Result<TraceStats, EvidenceError> {
        let totals = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(reason_code) AS abstained,
                AVG(CASE WHEN reason_code IS NULL THEN confidence END) AS average
            FROM decision_traces
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| EvidenceError::Storage(format!("Trace stats: {e}")))?;

        let column = |e: sqlx::Error| EvidenceError::Storage(format!("Trace stats column: {e}"));
        let total: i64 = totals.try_get("total").map_err(column)?;
        let abstained: i64 = totals.try_get("abstained").map_err(column)?;
        let average: Option<f64> = totals.try_get("average").map_err(column)?;

        let mut stats = TraceStats {
            total: total as usize,
            answered: (total - abstained) as usize,
            abstained: abstained as usize,
            average_answer_confidence: average,
            ..Default::default()
        };

        let rows = sqlx::query(
            "SELECT reason_code, COUNT(*) AS n FROM decision_traces \
             WHERE reason_code IS NOT NULL GROUP BY reason_code",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EvidenceError::Storage(format!("Trace stats: {e}")))?;

        for row in &rows {
            let code: String = row
                .try_get("reason_code")
                .map_err(|e| EvidenceError::Storage(format!("reason_code column: {e}")))?;
            let n: i64 = row.try_get("n").map_err(column)?;
            let reason = ReasonCode::from_str(&code).map_err(EvidenceError::Storage)?;
            stats.by_reason.insert(reason, n as usize);
        }

        Ok(stats)
    }
}
