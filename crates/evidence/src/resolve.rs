//! Join retrieval hits with the corpus to build analyzer candidates.

use crate::candidate::{Candidate, Claim, RetrievalHit};
use std::collections::HashMap;
use tracing::debug;
use trustgate_core::chunk::ChunkId;
use trustgate_core::corpus::CorpusStore;
use trustgate_core::error::CorpusError;
use trustgate_core::source::{Source, SourceId};

/// Look up each hit's chunk and source.
///
/// Fails with `NotFound` when a chunk or source is missing and with
/// `Validation` when a hit names a source that does not own its chunk.
/// Claims are attached by chunk id.
pub async fn resolve_candidates(
    store: &dyn CorpusStore,
    hits: &[RetrievalHit],
    claims: &HashMap<ChunkId, Claim>,
) -> Result<Vec<Candidate>, CorpusError> {
    let mut sources: HashMap<SourceId, Source> = HashMap::new();
    let mut candidates = Vec::with_capacity(hits.len());

    for hit in hits {
        let chunk = store
            .get_chunk(hit.chunk_id)
            .await?
            .ok_or_else(|| CorpusError::NotFound(format!("chunk {}", hit.chunk_id)))?;

        if chunk.source_id != hit.source_id {
            return Err(CorpusError::Validation(format!(
                "hit for chunk {} names source {}, but the chunk belongs to source {}",
                hit.chunk_id, hit.source_id, chunk.source_id
            )));
        }

        if !sources.contains_key(&chunk.source_id) {
            let source = store
                .get_source(chunk.source_id)
                .await?
                .ok_or_else(|| CorpusError::NotFound(format!("source {}", chunk.source_id)))?;
            sources.insert(source.id, source);
        }
        let source = &sources[&chunk.source_id];

        let mut candidate = Candidate::from_chunk(&chunk, source, hit.similarity);
        candidate.claim = claims.get(&chunk.id).cloned();
        candidates.push(candidate);
    }

    debug!(hits = hits.len(), sources = sources.len(), "Resolved retrieval hits");
    Ok(candidates)
}
