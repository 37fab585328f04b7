//! SQLite corpus backend.
//!
//! Two tables:
//! - `sources` holds every version of every document. A partial unique
//!   index keeps `external_id` unique among active rows.
//! - `source_chunks` holds content-addressed chunks. A unique index on
//!   `(source_id, section_path, content_hash)` makes batch replays no-ops.
//!
//! Supersession and chunk batches run inside a single transaction.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use trustgate_core::chunk::{ChunkId, ChunkType, NewChunk, SourceChunk};
use trustgate_core::corpus::{CorpusStats, CorpusStore, ensure_ingestible, validate_chunks};
use trustgate_core::error::CorpusError;
use trustgate_core::source::{
    AuthorityLevel, NewSource, Source, SourceId, SourceStatus, SourceType,
};

/// A SQLite-backed corpus.
pub struct SqliteCorpus {
    pool: SqlitePool,
}

impl SqliteCorpus {
    /// Open (or create) a corpus database.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database. In-memory
    /// databases are per connection, so the pool is pinned to one.
    pub async fn new(path: &str) -> Result<Self, CorpusError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| CorpusError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .pragma("foreign_keys", "ON");

        let max_connections = if path.contains(":memory:") { 1 } else { 4 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| CorpusError::Storage(format!("Failed to open SQLite: {e}")))?;

        let corpus = Self { pool };
        corpus.run_migrations().await?;
        info!("SQLite corpus initialized at {path}");
        Ok(corpus)
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, CorpusError> {
        let corpus = Self { pool };
        corpus.run_migrations().await?;
        Ok(corpus)
    }

    /// The underlying pool, for stores that share the database file.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Start a transaction that holds the write lock from its first read.
    ///
    /// A deferred transaction that reads and then writes cannot wait out a
    /// concurrent writer; SQLite fails it with SQLITE_BUSY instead.
    async fn begin_write(&self) -> Result<sqlx::Transaction<'static, sqlx::Sqlite>, CorpusError> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| CorpusError::Storage(format!("BEGIN IMMEDIATE failed: {e}")))
    }

    async fn run_migrations(&self) -> Result<(), CorpusError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sources (
                id               INTEGER PRIMARY KEY AUTOINCREMENT,
                external_id      TEXT NOT NULL,
                name             TEXT NOT NULL,
                source_type      TEXT NOT NULL,
                authority_level  TEXT NOT NULL,
                version          TEXT,
                publication_date TEXT,
                effective_date   TEXT,
                publisher        TEXT,
                official_url     TEXT,
                status           TEXT NOT NULL DEFAULT 'active',
                superseded_by    INTEGER REFERENCES sources(id),
                created_at       TEXT NOT NULL,
                updated_at       TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CorpusError::MigrationFailed(format!("sources table: {e}")))?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_sources_active_external_id
            ON sources(external_id) WHERE status = 'active'
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CorpusError::MigrationFailed(format!("external_id index: {e}")))?;

        // section_path '' stands for "no section" so it takes part in uniqueness
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS source_chunks (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                source_id     INTEGER NOT NULL REFERENCES sources(id),
                chunk_index   INTEGER NOT NULL,
                chunk_type    TEXT NOT NULL,
                section_path  TEXT NOT NULL DEFAULT '',
                heading       TEXT,
                content       TEXT NOT NULL,
                content_hash  TEXT NOT NULL,
                created_at    TEXT NOT NULL,
                UNIQUE (source_id, section_path, content_hash),
                UNIQUE (source_id, chunk_index)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CorpusError::MigrationFailed(format!("source_chunks table: {e}")))?;

        debug!("SQLite corpus migrations complete");
        Ok(())
    }

    fn row_to_source(row: &SqliteRow) -> Result<Source, CorpusError> {
        let col = |name: &str, e: sqlx::Error| CorpusError::QueryFailed(format!("{name} column: {e}"));

        let source_type: String = row.try_get("source_type").map_err(|e| col("source_type", e))?;
        let authority: String = row
            .try_get("authority_level")
            .map_err(|e| col("authority_level", e))?;
        let status: String = row.try_get("status").map_err(|e| col("status", e))?;
        let publication_date: Option<String> = row
            .try_get("publication_date")
            .map_err(|e| col("publication_date", e))?;
        let effective_date: Option<String> = row
            .try_get("effective_date")
            .map_err(|e| col("effective_date", e))?;
        let created_at: String = row.try_get("created_at").map_err(|e| col("created_at", e))?;
        let updated_at: String = row.try_get("updated_at").map_err(|e| col("updated_at", e))?;

        Ok(Source {
            id: row.try_get("id").map_err(|e| col("id", e))?,
            external_id: row.try_get("external_id").map_err(|e| col("external_id", e))?,
            name: row.try_get("name").map_err(|e| col("name", e))?,
            source_type: SourceType::from_str(&source_type)?,
            authority_level: AuthorityLevel::from_str(&authority)?,
            version: row.try_get("version").map_err(|e| col("version", e))?,
            publication_date: parse_date(publication_date.as_deref())?,
            effective_date: parse_date(effective_date.as_deref())?,
            publisher: row.try_get("publisher").map_err(|e| col("publisher", e))?,
            official_url: row.try_get("official_url").map_err(|e| col("official_url", e))?,
            status: SourceStatus::from_str(&status)?,
            superseded_by: row
                .try_get("superseded_by")
                .map_err(|e| col("superseded_by", e))?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }

    fn row_to_chunk(row: &SqliteRow) -> Result<SourceChunk, CorpusError> {
        let col = |name: &str, e: sqlx::Error| CorpusError::QueryFailed(format!("{name} column: {e}"));

        let chunk_index: i64 = row.try_get("chunk_index").map_err(|e| col("chunk_index", e))?;
        let chunk_type: String = row.try_get("chunk_type").map_err(|e| col("chunk_type", e))?;
        let section_path: String = row
            .try_get("section_path")
            .map_err(|e| col("section_path", e))?;
        let created_at: String = row.try_get("created_at").map_err(|e| col("created_at", e))?;

        Ok(SourceChunk {
            id: row.try_get("id").map_err(|e| col("id", e))?,
            source_id: row.try_get("source_id").map_err(|e| col("source_id", e))?,
            chunk_index: u32::try_from(chunk_index)
                .map_err(|_| CorpusError::QueryFailed(format!("chunk_index out of range: {chunk_index}")))?,
            chunk_type: ChunkType::from_str(&chunk_type)?,
            section_path: (!section_path.is_empty()).then_some(section_path),
            heading: row.try_get("heading").map_err(|e| col("heading", e))?,
            content: row.try_get("content").map_err(|e| col("content", e))?,
            content_hash: row.try_get("content_hash").map_err(|e| col("content_hash", e))?,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    async fn fetch_source(&self, id: SourceId) -> Result<Option<Source>, CorpusError> {
        let row = sqlx::query("SELECT * FROM sources WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CorpusError::QueryFailed(format!("Source lookup: {e}")))?;
        row.as_ref().map(Self::row_to_source).transpose()
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, CorpusError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CorpusError::QueryFailed(format!("bad timestamp '{s}': {e}")))
}

fn parse_date(s: Option<&str>) -> Result<Option<NaiveDate>, CorpusError> {
    s.map(|d| {
        NaiveDate::from_str(d).map_err(|e| CorpusError::QueryFailed(format!("bad date '{d}': {e}")))
    })
    .transpose()
}

/// Map a unique-index violation on `sources` to a validation error.
fn insert_source_error(external_id: &str, e: sqlx::Error) -> CorpusError {
    let unique = e
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if unique {
        CorpusError::Validation(format!(
            "an active source with external_id '{external_id}' already exists"
        ))
    } else {
        CorpusError::Storage(format!("INSERT source failed: {e}"))
    }
}

async fn insert_source<'c, E>(executor: E, input: &NewSource, now: &str) -> Result<SourceId, CorpusError>
where
    E: sqlx::Executor<'c, Database = sqlx::Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO sources (
            external_id, name, source_type, authority_level, version,
            publication_date, effective_date, publisher, official_url,
            status, created_at, updated_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'active', ?10, ?10)
        "#,
    )
    .bind(&input.external_id)
    .bind(&input.name)
    .bind(input.source_type.as_str())
    .bind(input.resolved_authority().as_str())
    .bind(&input.version)
    .bind(input.publication_date.map(|d| d.to_string()))
    .bind(input.effective_date.map(|d| d.to_string()))
    .bind(&input.publisher)
    .bind(&input.official_url)
    .bind(now)
    .execute(executor)
    .await
    .map_err(|e| insert_source_error(&input.external_id, e))?;

    Ok(result.last_insert_rowid())
}

#[async_trait]
impl CorpusStore for SqliteCorpus {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn create_source(&self, input: NewSource) -> Result<Source, CorpusError> {
        input.validate()?;
        let now = Utc::now().to_rfc3339();
        let id = insert_source(&self.pool, &input, &now).await?;
        info!(source_id = id, external_id = %input.external_id, "Source created");
        self.fetch_source(id)
            .await?
            .ok_or_else(|| CorpusError::Storage(format!("source {id} vanished after insert")))
    }

    async fn supersede_source(
        &self,
        old_id: SourceId,
        input: NewSource,
    ) -> Result<Source, CorpusError> {
        input.validate()?;
        let now = Utc::now().to_rfc3339();

        let mut tx = self.begin_write().await?;

        let row = sqlx::query("SELECT status FROM sources WHERE id = ?1")
            .bind(old_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| CorpusError::QueryFailed(format!("Source lookup: {e}")))?
            .ok_or_else(|| CorpusError::NotFound(format!("source {old_id}")))?;
        let status: String = row
            .try_get("status")
            .map_err(|e| CorpusError::QueryFailed(format!("status column: {e}")))?;
        let status = SourceStatus::from_str(&status)?;
        if status != SourceStatus::Active {
            return Err(CorpusError::AlreadySuperseded { id: old_id, status });
        }

        // Flip first so the successor may reuse the external id.
        sqlx::query(
            "UPDATE sources SET status = 'superseded', updated_at = ?2 WHERE id = ?1 AND status = 'active'",
        )
        .bind(old_id)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| CorpusError::Storage(format!("UPDATE source failed: {e}")))?;

        let new_id = insert_source(&mut *tx, &input, &now).await?;

        sqlx::query("UPDATE sources SET superseded_by = ?2 WHERE id = ?1")
            .bind(old_id)
            .bind(new_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| CorpusError::Storage(format!("UPDATE superseded_by failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| CorpusError::Storage(format!("COMMIT failed: {e}")))?;

        info!(old_id, new_id, "Source superseded");
        self.fetch_source(new_id)
            .await?
            .ok_or_else(|| CorpusError::Storage(format!("source {new_id} vanished after insert")))
    }

    async fn archive_source(&self, id: SourceId) -> Result<Source, CorpusError> {
        let mut tx = self.begin_write().await?;

        let row = sqlx::query("SELECT status FROM sources WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| CorpusError::QueryFailed(format!("Source lookup: {e}")))?
            .ok_or_else(|| CorpusError::NotFound(format!("source {id}")))?;
        let status: String = row
            .try_get("status")
            .map_err(|e| CorpusError::QueryFailed(format!("status column: {e}")))?;
        let status = SourceStatus::from_str(&status)?;
        if !status.can_transition_to(SourceStatus::Archived) {
            return Err(CorpusError::InvalidTransition {
                id,
                from: status,
                to: SourceStatus::Archived,
            });
        }

        sqlx::query("UPDATE sources SET status = 'archived', updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| CorpusError::Storage(format!("UPDATE source failed: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| CorpusError::Storage(format!("COMMIT failed: {e}")))?;

        info!(source_id = id, "Source archived");
        self.fetch_source(id)
            .await?
            .ok_or_else(|| CorpusError::NotFound(format!("source {id}")))
    }

    async fn get_source(&self, id: SourceId) -> Result<Option<Source>, CorpusError> {
        self.fetch_source(id).await
    }

    async fn get_source_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Source>, CorpusError> {
        let row = sqlx::query(
            r#"
            SELECT * FROM sources WHERE external_id = ?1
            ORDER BY (status = 'active') DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CorpusError::QueryFailed(format!("External id lookup: {e}")))?;
        row.as_ref().map(Self::row_to_source).transpose()
    }

    async fn list_sources(
        &self,
        status: Option<SourceStatus>,
    ) -> Result<Vec<Source>, CorpusError> {
        let rows = match status {
            Some(status) => sqlx::query("SELECT * FROM sources WHERE status = ?1 ORDER BY id")
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await,
            None => sqlx::query("SELECT * FROM sources ORDER BY id")
                .fetch_all(&self.pool)
                .await,
        }
        .map_err(|e| CorpusError::QueryFailed(format!("List sources: {e}")))?;

        rows.iter().map(Self::row_to_source).collect()
    }

    async fn create_source_chunks_batch(
        &self,
        source_id: SourceId,
        chunks: Vec<NewChunk>,
    ) -> Result<Vec<SourceChunk>, CorpusError> {
        validate_chunks(&chunks)?;
        let now = Utc::now().to_rfc3339();

        let mut tx = self.begin_write().await?;

        let row = sqlx::query("SELECT * FROM sources WHERE id = ?1")
            .bind(source_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| CorpusError::QueryFailed(format!("Source lookup: {e}")))?
            .ok_or_else(|| CorpusError::NotFound(format!("source {source_id}")))?;
        ensure_ingestible(&Self::row_to_source(&row)?)?;

        let mut out: Vec<SourceChunk> = Vec::with_capacity(chunks.len());
        let mut inserted = 0u64;

        for chunk in &chunks {
            let (section, hash) = chunk.identity();

            // The WHERE clause keeps SQLite from parsing ON CONFLICT as a join.
            let result = sqlx::query(
                r#"
                INSERT INTO source_chunks (
                    source_id, chunk_index, chunk_type, section_path,
                    heading, content, content_hash, created_at
                )
                SELECT ?1, COALESCE(MAX(chunk_index) + 1, 0), ?2, ?3, ?4, ?5, ?6, ?7
                FROM source_chunks WHERE source_id = ?1
                ON CONFLICT (source_id, section_path, content_hash) DO NOTHING
                "#,
            )
            .bind(source_id)
            .bind(chunk.chunk_type.as_str())
            .bind(&section)
            .bind(&chunk.heading)
            .bind(&chunk.content)
            .bind(&hash)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| CorpusError::Storage(format!("INSERT chunk failed: {e}")))?;
            inserted += result.rows_affected();

            let row = sqlx::query(
                r#"
                SELECT * FROM source_chunks
                WHERE source_id = ?1 AND section_path = ?2 AND content_hash = ?3
                "#,
            )
            .bind(source_id)
            .bind(&section)
            .bind(&hash)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| CorpusError::QueryFailed(format!("Chunk lookup: {e}")))?;
            let stored = Self::row_to_chunk(&row)?;

            if !out.iter().any(|c| c.id == stored.id) {
                out.push(stored);
            }
        }

        tx.commit()
            .await
            .map_err(|e| CorpusError::Storage(format!("COMMIT failed: {e}")))?;

        debug!(source_id, inserted, returned = out.len(), "Chunk batch stored");
        Ok(out)
    }

    async fn get_chunks_by_source_id(
        &self,
        source_id: SourceId,
    ) -> Result<Vec<SourceChunk>, CorpusError> {
        let rows = sqlx::query("SELECT * FROM source_chunks WHERE source_id = ?1 ORDER BY chunk_index")
            .bind(source_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CorpusError::QueryFailed(format!("List chunks: {e}")))?;
        rows.iter().map(Self::row_to_chunk).collect()
    }

    async fn get_chunk(&self, id: ChunkId) -> Result<Option<SourceChunk>, CorpusError> {
        let row = sqlx::query("SELECT * FROM source_chunks WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CorpusError::QueryFailed(format!("Chunk lookup: {e}")))?;
        row.as_ref().map(Self::row_to_chunk).transpose()
    }

    async fn corpus_stats(&self) -> Result<CorpusStats, CorpusError> {
        let sources = self.list_sources(None).await?;
        let total_chunks: i64 = sqlx::query("SELECT COUNT(*) AS n FROM source_chunks")
            .fetch_one(&self.pool)
            .await
            .and_then(|row| row.try_get("n"))
            .map_err(|e| CorpusError::QueryFailed(format!("Chunk count: {e}")))?;
        Ok(CorpusStats::from_sources(&sources, total_chunks as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::task::JoinSet;

    async fn test_corpus() -> SqliteCorpus {
        SqliteCorpus::new("sqlite::memory:").await.unwrap()
    }

    fn cs3d() -> NewSource {
        NewSource::new("eu-2024-1760", "Corporate Sustainability Due Diligence Directive", SourceType::EuDirective)
    }

    fn chunks() -> Vec<NewChunk> {
        vec![
            NewChunk::new(ChunkType::Article, "Companies shall integrate due diligence into policies.")
                .with_section("Art. 7"),
            NewChunk::new(ChunkType::Article, "Companies shall identify adverse impacts.")
                .with_section("Art. 8")
                .with_heading("Identifying adverse impacts"),
            NewChunk::new(ChunkType::Definition, "Value chain means upstream and downstream activities."),
        ]
    }

    #[tokio::test]
    async fn create_and_get_round_trip() {
        let db = test_corpus().await;
        let mut input = cs3d().with_version("2024/1760");
        input.publication_date = NaiveDate::from_ymd_opt(2024, 7, 5);
        let created = db.create_source(input).await.unwrap();

        let fetched = db.get_source(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.authority_level, AuthorityLevel::Official);
        assert_eq!(fetched.publication_date, NaiveDate::from_ymd_opt(2024, 7, 5));
        assert_eq!(db.name(), "sqlite");
    }

    #[tokio::test]
    async fn active_external_id_is_unique() {
        let db = test_corpus().await;
        db.create_source(cs3d()).await.unwrap();
        let err = db.create_source(cs3d()).await.unwrap_err();
        assert!(matches!(err, CorpusError::Validation(_)));
    }

    #[tokio::test]
    async fn supersede_is_atomic_and_single_shot() {
        let db = test_corpus().await;
        let v1 = db.create_source(cs3d()).await.unwrap();
        let v2 = db.supersede_source(v1.id, cs3d().with_version("2")).await.unwrap();

        let v1 = db.get_source(v1.id).await.unwrap().unwrap();
        assert_eq!(v1.status, SourceStatus::Superseded);
        assert_eq!(v1.superseded_by, Some(v2.id));
        assert_eq!(v2.status, SourceStatus::Active);

        let err = db.supersede_source(v1.id, cs3d()).await.unwrap_err();
        assert!(matches!(
            err,
            CorpusError::AlreadySuperseded { status: SourceStatus::Superseded, .. }
        ));
        assert_eq!(db.list_sources(Some(SourceStatus::Active)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rolled_back_supersede_keeps_old_active() {
        let db = test_corpus().await;
        let v1 = db.create_source(cs3d()).await.unwrap();
        let other = NewSource::new("taken", "Other", SourceType::NewsArticle);
        db.create_source(other.clone()).await.unwrap();

        let err = db.supersede_source(v1.id, other).await.unwrap_err();
        assert!(matches!(err, CorpusError::Validation(_)));

        let v1 = db.get_source(v1.id).await.unwrap().unwrap();
        assert_eq!(v1.status, SourceStatus::Active);
        assert_eq!(v1.superseded_by, None);
        assert_eq!(db.corpus_stats().await.unwrap().total_sources, 2);
    }

    #[tokio::test]
    async fn lookup_by_external_id_prefers_active() {
        let db = test_corpus().await;
        let v1 = db.create_source(cs3d()).await.unwrap();
        let v2 = db.supersede_source(v1.id, cs3d()).await.unwrap();
        let found = db.get_source_by_external_id("eu-2024-1760").await.unwrap().unwrap();
        assert_eq!(found.id, v2.id);

        db.archive_source(v2.id).await.unwrap();
        let found = db.get_source_by_external_id("eu-2024-1760").await.unwrap().unwrap();
        assert_eq!(found.id, v2.id);
        assert!(db.get_source_by_external_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn chunk_batch_replay_is_a_no_op() {
        let db = test_corpus().await;
        let source = db.create_source(cs3d()).await.unwrap();

        let first = db.create_source_chunks_batch(source.id, chunks()).await.unwrap();
        let second = db.create_source_chunks_batch(source.id, chunks()).await.unwrap();

        assert_eq!(first, second);
        let indexes: Vec<u32> = first.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert_eq!(first[2].section_path, None);
        assert_eq!(db.corpus_stats().await.unwrap().total_chunks, 3);
    }

    #[tokio::test]
    async fn new_content_gets_next_index() {
        let db = test_corpus().await;
        let source = db.create_source(cs3d()).await.unwrap();
        db.create_source_chunks_batch(source.id, chunks()).await.unwrap();

        let extra = vec![
            chunks().remove(1),
            NewChunk::new(ChunkType::Guidance, "Review the value chain annually.").with_section("Art. 15"),
        ];
        let out = db.create_source_chunks_batch(source.id, extra).await.unwrap();
        assert_eq!(out[0].chunk_index, 1);
        assert_eq!(out[1].chunk_index, 3);

        let stored = db.get_chunks_by_source_id(source.id).await.unwrap();
        assert_eq!(stored.len(), 4);
        assert!(stored.windows(2).all(|w| w[0].chunk_index < w[1].chunk_index));
    }

    #[tokio::test]
    async fn same_text_in_different_sections_is_distinct() {
        let db = test_corpus().await;
        let source = db.create_source(cs3d()).await.unwrap();
        let batch = vec![
            NewChunk::new(ChunkType::Paragraph, "Not applicable.").with_section("Annex I"),
            NewChunk::new(ChunkType::Paragraph, "Not applicable.").with_section("Annex II"),
            NewChunk::new(ChunkType::Paragraph, "Not applicable.\r\n").with_section("Annex II"),
        ];
        let out = db.create_source_chunks_batch(source.id, batch).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].content_hash, out[1].content_hash);
    }

    #[tokio::test]
    async fn ingest_into_superseded_source_rejected() {
        let db = test_corpus().await;
        let v1 = db.create_source(cs3d()).await.unwrap();
        db.supersede_source(v1.id, cs3d()).await.unwrap();
        let err = db.create_source_chunks_batch(v1.id, chunks()).await.unwrap_err();
        assert!(matches!(err, CorpusError::Validation(_)));
        let err = db.create_source_chunks_batch(999, chunks()).await.unwrap_err();
        assert!(matches!(err, CorpusError::NotFound(_)));
    }

    #[tokio::test]
    async fn archive_transitions() {
        let db = test_corpus().await;
        let v1 = db.create_source(cs3d()).await.unwrap();
        let v2 = db.supersede_source(v1.id, cs3d()).await.unwrap();

        let archived = db.archive_source(v1.id).await.unwrap();
        assert_eq!(archived.status, SourceStatus::Archived);
        assert_eq!(archived.superseded_by, Some(v2.id));

        let err = db.archive_source(v1.id).await.unwrap_err();
        assert!(matches!(err, CorpusError::InvalidTransition { .. }));

        let stats = db.corpus_stats().await.unwrap();
        assert_eq!(stats.active_sources, 1);
        assert_eq!(stats.archived_sources, 1);
        assert_eq!(stats.by_source_type.get(&SourceType::EuDirective), Some(&1));
    }

    #[tokio::test]
    async fn file_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = format!("sqlite://{}", dir.path().join("corpus.db").display());

        let source_id = {
            let db = SqliteCorpus::new(&path).await.unwrap();
            let source = db.create_source(cs3d()).await.unwrap();
            db.create_source_chunks_batch(source.id, chunks()).await.unwrap();
            source.id
        };

        let db = SqliteCorpus::new(&path).await.unwrap();
        let stored = db.get_chunks_by_source_id(source_id).await.unwrap();
        assert_eq!(stored.len(), 3);
        let chunk = db.get_chunk(stored[1].id).await.unwrap().unwrap();
        assert_eq!(chunk.heading.as_deref(), Some("Identifying adverse impacts"));
    }

    async fn file_corpus(dir: &tempfile::TempDir) -> Arc<SqliteCorpus> {
        let path = format!("sqlite://{}", dir.path().join("corpus.db").display());
        Arc::new(SqliteCorpus::new(&path).await.unwrap())
    }

    fn numbered_chunks(n: usize) -> Vec<NewChunk> {
        (0..n)
            .map(|i| {
                NewChunk::new(ChunkType::Article, format!("Obligation {i} applies to the value chain."))
                    .with_section(format!("Art. {i}"))
            })
            .collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_identical_batches_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let db = file_corpus(&dir).await;
        let source = db.create_source(cs3d()).await.unwrap();

        for _ in 0..5 {
            let mut tasks = JoinSet::new();
            for _ in 0..8 {
                let db = Arc::clone(&db);
                tasks.spawn(async move {
                    db.create_source_chunks_batch(source.id, numbered_chunks(20)).await
                });
            }

            let mut results = Vec::new();
            while let Some(joined) = tasks.join_next().await {
                results.push(joined.unwrap().unwrap());
            }
            assert_eq!(results.len(), 8);
            assert!(results.iter().all(|r| r == &results[0]));
            assert_eq!(results[0].len(), 20);
        }

        let stored = db.get_chunks_by_source_id(source.id).await.unwrap();
        assert_eq!(stored.len(), 20);
        let indexes: Vec<u32> = stored.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indexes, (0..20).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_supersede_has_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let db = file_corpus(&dir).await;
        let v1 = db.create_source(cs3d()).await.unwrap();

        let mut tasks = JoinSet::new();
        for i in 0..6 {
            let db = Arc::clone(&db);
            tasks.spawn(async move {
                db.supersede_source(v1.id, cs3d().with_version(format!("v{i}"))).await
            });
        }

        let mut winners = 0;
        let mut losers = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined.unwrap() {
                Ok(_) => winners += 1,
                Err(CorpusError::AlreadySuperseded { id, status }) => {
                    assert_eq!(id, v1.id);
                    assert_eq!(status, SourceStatus::Superseded);
                    losers += 1;
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!((winners, losers), (1, 5));
        assert_eq!(db.list_sources(Some(SourceStatus::Active)).await.unwrap().len(), 1);
        assert_eq!(db.supersession_chain(v1.id).await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_archive_has_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let db = file_corpus(&dir).await;
        let source = db.create_source(cs3d()).await.unwrap();

        let mut tasks = JoinSet::new();
        for _ in 0..4 {
            let db = Arc::clone(&db);
            tasks.spawn(async move { db.archive_source(source.id).await });
        }

        let mut winners = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined.unwrap() {
                Ok(archived) => {
                    assert_eq!(archived.status, SourceStatus::Archived);
                    winners += 1;
                }
                Err(err) => assert!(
                    matches!(err, CorpusError::InvalidTransition { from: SourceStatus::Archived, .. }),
                    "unexpected error: {err}"
                ),
            }
        }
        assert_eq!(winners, 1);
    }
}
