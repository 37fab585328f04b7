//! In-memory corpus, useful for tests and ephemeral sessions.
//!
//! Every write holds the single write guard for its whole duration, which
//! makes `supersede_source` and chunk batches atomic.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use trustgate_core::chunk::{ChunkId, NewChunk, SourceChunk};
use trustgate_core::corpus::{CorpusStats, CorpusStore, ensure_ingestible, validate_chunks};
use trustgate_core::error::CorpusError;
use trustgate_core::source::{NewSource, Source, SourceId, SourceStatus};

#[derive(Default)]
struct State {
    sources: Vec<Source>,
    chunks: Vec<SourceChunk>,
    next_source_id: SourceId,
    next_chunk_id: ChunkId,
}

impl State {
    fn source(&self, id: SourceId) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    fn source_mut(&mut self, id: SourceId) -> Option<&mut Source> {
        self.sources.iter_mut().find(|s| s.id == id)
    }

    /// Fail if an active source other than `except` owns `external_id`.
    fn ensure_external_id_free(
        &self,
        external_id: &str,
        except: Option<SourceId>,
    ) -> Result<(), CorpusError> {
        let taken = self
            .sources
            .iter()
            .any(|s| s.is_active() && s.external_id == external_id && Some(s.id) != except);
        if taken {
            return Err(CorpusError::Validation(format!(
                "an active source with external_id '{external_id}' already exists"
            )));
        }
        Ok(())
    }

    fn insert_source(&mut self, input: NewSource) -> Source {
        self.next_source_id += 1;
        let source = input.into_source(self.next_source_id, Utc::now());
        self.sources.push(source.clone());
        source
    }
}

/// A corpus that lives in process memory.
pub struct InMemoryCorpus {
    state: Arc<RwLock<State>>,
}

impl InMemoryCorpus {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
        }
    }
}

impl Default for InMemoryCorpus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CorpusStore for InMemoryCorpus {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create_source(&self, input: NewSource) -> Result<Source, CorpusError> {
        input.validate()?;
        let mut state = self.state.write().await;
        state.ensure_external_id_free(&input.external_id, None)?;
        let source = state.insert_source(input);
        info!(source_id = source.id, external_id = %source.external_id, "Source created");
        Ok(source)
    }

    async fn supersede_source(
        &self,
        old_id: SourceId,
        input: NewSource,
    ) -> Result<Source, CorpusError> {
        input.validate()?;
        let mut state = self.state.write().await;

        let old = state
            .source(old_id)
            .ok_or_else(|| CorpusError::NotFound(format!("source {old_id}")))?;
        if !old.is_active() {
            return Err(CorpusError::AlreadySuperseded {
                id: old_id,
                status: old.status,
            });
        }
        state.ensure_external_id_free(&input.external_id, Some(old_id))?;

        let successor = state.insert_source(input);
        let now = Utc::now();
        if let Some(old) = state.source_mut(old_id) {
            old.status = SourceStatus::Superseded;
            old.superseded_by = Some(successor.id);
            old.updated_at = now;
        }

        info!(old_id, new_id = successor.id, "Source superseded");
        Ok(successor)
    }

    async fn archive_source(&self, id: SourceId) -> Result<Source, CorpusError> {
        let mut state = self.state.write().await;
        let source = state
            .source_mut(id)
            .ok_or_else(|| CorpusError::NotFound(format!("source {id}")))?;
        if !source.status.can_transition_to(SourceStatus::Archived) {
            return Err(CorpusError::InvalidTransition {
                id,
                from: source.status,
                to: SourceStatus::Archived,
            });
        }
        source.status = SourceStatus::Archived;
        source.updated_at = Utc::now();
        info!(source_id = id, "Source archived");
        Ok(source.clone())
    }

    async fn get_source(&self, id: SourceId) -> Result<Option<Source>, CorpusError> {
        Ok(self.state.read().await.source(id).cloned())
    }

    async fn get_source_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Source>, CorpusError> {
        let state = self.state.read().await;
        let mut matching = state.sources.iter().filter(|s| s.external_id == external_id);
        let active = matching.clone().find(|s| s.is_active());
        Ok(active.or_else(|| matching.next_back()).cloned())
    }

    async fn list_sources(
        &self,
        status: Option<SourceStatus>,
    ) -> Result<Vec<Source>, CorpusError> {
        let state = self.state.read().await;
        Ok(state
            .sources
            .iter()
            .filter(|s| status.is_none_or(|st| s.status == st))
            .cloned()
            .collect())
    }

    async fn create_source_chunks_batch(
        &self,
        source_id: SourceId,
        chunks: Vec<NewChunk>,
    ) -> Result<Vec<SourceChunk>, CorpusError> {
        validate_chunks(&chunks)?;
        let mut state = self.state.write().await;

        let source = state
            .source(source_id)
            .ok_or_else(|| CorpusError::NotFound(format!("source {source_id}")))?;
        ensure_ingestible(source)?;

        let mut next_index = state
            .chunks
            .iter()
            .filter(|c| c.source_id == source_id)
            .map(|c| c.chunk_index + 1)
            .max()
            .unwrap_or(0);

        let mut out: Vec<SourceChunk> = Vec::with_capacity(chunks.len());
        let mut inserted = 0usize;
        let now = Utc::now();

        for input in chunks {
            let (section, hash) = input.identity();
            let same_identity = |c: &SourceChunk| {
                c.source_id == source_id
                    && c.section_path.as_deref().unwrap_or("") == section
                    && c.content_hash == hash
            };

            if out.iter().any(same_identity) {
                continue;
            }
            if let Some(existing) = state.chunks.iter().find(|c| same_identity(*c)) {
                out.push(existing.clone());
                continue;
            }

            state.next_chunk_id += 1;
            let chunk = SourceChunk {
                id: state.next_chunk_id,
                source_id,
                chunk_index: next_index,
                chunk_type: input.chunk_type,
                section_path: input.section_path,
                heading: input.heading,
                content: input.content,
                content_hash: hash,
                created_at: now,
            };
            next_index += 1;
            inserted += 1;
            state.chunks.push(chunk.clone());
            out.push(chunk);
        }

        debug!(
            source_id,
            inserted,
            unchanged = out.len() - inserted,
            "Chunk batch stored"
        );
        Ok(out)
    }

    async fn get_chunks_by_source_id(
        &self,
        source_id: SourceId,
    ) -> Result<Vec<SourceChunk>, CorpusError> {
        let state = self.state.read().await;
        let mut chunks: Vec<SourceChunk> = state
            .chunks
            .iter()
            .filter(|c| c.source_id == source_id)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn get_chunk(&self, id: ChunkId) -> Result<Option<SourceChunk>, CorpusError> {
        Ok(self.state.read().await.chunks.iter().find(|c| c.id == id).cloned())
    }

    async fn corpus_stats(&self) -> Result<CorpusStats, CorpusError> {
        let state = self.state.read().await;
        Ok(CorpusStats::from_sources(&state.sources, state.chunks.len()))
    }
}
