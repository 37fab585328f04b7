//! Corpus store trait: versioned sources and their chunks.
//!
//! The corpus is the only stateful part of the evidence layer. Every write
//! is transactional: superseding a source flips the old record and creates
//! its successor together or not at all, and chunk batches converge to the
//! same row set no matter how often they are replayed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::chunk::{ChunkId, NewChunk, SourceChunk};
use crate::error::CorpusError;
use crate::source::{AuthorityLevel, NewSource, Source, SourceId, SourceStatus, SourceType};

/// Point-in-time counts for dashboards. Computed on every call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub total_sources: usize,
    pub active_sources: usize,
    pub superseded_sources: usize,
    pub archived_sources: usize,
    pub total_chunks: usize,
    /// Active sources only
    pub by_source_type: BTreeMap<SourceType, usize>,
    /// Active sources only
    pub by_authority_level: BTreeMap<AuthorityLevel, usize>,
}

impl CorpusStats {
    /// Fold a full source listing into stats.
    pub fn from_sources<'a>(sources: impl IntoIterator<Item = &'a Source>, total_chunks: usize) -> Self {
        let mut stats = CorpusStats {
            total_chunks,
            ..Default::default()
        };
        for source in sources {
            stats.total_sources += 1;
            match source.status {
                SourceStatus::Active => {
                    stats.active_sources += 1;
                    *stats.by_source_type.entry(source.source_type).or_default() += 1;
                    *stats.by_authority_level.entry(source.authority_level).or_default() += 1;
                }
                SourceStatus::Superseded => stats.superseded_sources += 1,
                SourceStatus::Archived => stats.archived_sources += 1,
            }
        }
        stats
    }
}

/// Persistent store for sources and chunks.
#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Backend name (e.g., "sqlite", "memory").
    fn name(&self) -> &str;

    /// Create an active source. Fails with `Validation` when another active
    /// source already owns `external_id`.
    async fn create_source(&self, input: NewSource) -> Result<Source, CorpusError>;

    /// Replace an active source with a new version.
    ///
    /// Fails with `NotFound` for an unknown id and `AlreadySuperseded` when the
    /// target is not active. Returns the newly created successor.
    async fn supersede_source(
        &self,
        old_id: SourceId,
        input: NewSource,
    ) -> Result<Source, CorpusError>;

    /// Move a source to `archived`.
    async fn archive_source(&self, id: SourceId) -> Result<Source, CorpusError>;

    async fn get_source(&self, id: SourceId) -> Result<Option<Source>, CorpusError>;

    /// The active source for `external_id`, or the newest one if none is active.
    async fn get_source_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Source>, CorpusError>;

    /// All sources ordered by id, optionally filtered by status.
    async fn list_sources(
        &self,
        status: Option<SourceStatus>,
    ) -> Result<Vec<Source>, CorpusError>;

    /// Insert a batch of chunks for an active source.
    ///
    /// Returns one chunk per distinct input in input order; inputs already
    /// stored under the same section path and content hash come back as the
    /// existing rows.
    async fn create_source_chunks_batch(
        &self,
        source_id: SourceId,
        chunks: Vec<NewChunk>,
    ) -> Result<Vec<SourceChunk>, CorpusError>;

    /// Chunks of a source ordered by `chunk_index`.
    async fn get_chunks_by_source_id(
        &self,
        source_id: SourceId,
    ) -> Result<Vec<SourceChunk>, CorpusError>;

    async fn get_chunk(&self, id: ChunkId) -> Result<Option<SourceChunk>, CorpusError>;

    async fn corpus_stats(&self) -> Result<CorpusStats, CorpusError>;

    /// Follow `superseded_by` links from `id` to the current head.
    async fn supersession_chain(&self, id: SourceId) -> Result<Vec<Source>, CorpusError> {
        let mut chain = Vec::new();
        let mut next = Some(id);
        while let Some(current) = next {
            let source = self
                .get_source(current)
                .await?
                .ok_or_else(|| CorpusError::NotFound(format!("source {current}")))?;
            if chain.iter().any(|s: &Source| s.id == source.id) {
                return Err(CorpusError::Storage(format!(
                    "supersession cycle detected at source {}",
                    source.id
                )));
            }
            next = source.superseded_by;
            chain.push(source);
        }
        Ok(chain)
    }
}

/// Shared shape checks for a chunk batch.
pub fn validate_chunks(chunks: &[NewChunk]) -> Result<(), CorpusError> {
    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.content.trim().is_empty() {
            return Err(CorpusError::Validation(format!(
                "chunk {i} has empty content"
            )));
        }
    }
    Ok(())
}

/// Reject chunk ingestion into anything but an active source.
pub fn ensure_ingestible(source: &Source) -> Result<(), CorpusError> {
    if source.is_active() {
        Ok(())
    } else {
        Err(CorpusError::Validation(format!(
            "source {} is {}; ingest into its successor instead",
            source.id, source.status
        )))
    }
}
