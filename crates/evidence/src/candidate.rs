//! Analyzer inputs: the query, its ranked candidates, and raw retrieval hits.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use trustgate_core::chunk::{ChunkId, SourceChunk};
use trustgate_core::policy::QueryDomain;
use trustgate_core::source::{AuthorityLevel, Source, SourceId, SourceStatus};

/// A user question plus the domain that decides its authority floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceQuery {
    pub text: String,
    pub domain: QueryDomain,
}

impl EvidenceQuery {
    /// Domain inferred from keywords in the text.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let domain = QueryDomain::infer(&text);
        Self { text, domain }
    }

    pub fn with_domain(text: impl Into<String>, domain: QueryDomain) -> Self {
        Self {
            text: text.into(),
            domain,
        }
    }
}

/// What a chunk concludes about a topic.
///
/// Two claims from different sources with the same topic and different
/// conclusions are a contradiction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    pub topic: String,
    pub conclusion: String,
}

impl Claim {
    pub fn new(topic: impl Into<String>, conclusion: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            conclusion: conclusion.into(),
        }
    }

    /// Same topic, different conclusion.
    pub fn contradicts(&self, other: &Claim) -> bool {
        self.topic == other.topic && self.conclusion != other.conclusion
    }
}

/// One retrieved chunk joined with the state of its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub chunk_id: ChunkId,
    pub source_id: SourceId,
    /// Retrieval similarity in [0, 1]
    pub similarity: f64,
    pub authority: AuthorityLevel,
    pub source_status: SourceStatus,
    #[serde(default)]
    pub chunk_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim: Option<Claim>,
}

impl Candidate {
    /// An active-source candidate at index 0 with no claim.
    pub fn new(
        chunk_id: ChunkId,
        source_id: SourceId,
        similarity: f64,
        authority: AuthorityLevel,
    ) -> Self {
        Self {
            chunk_id,
            source_id,
            similarity,
            authority,
            source_status: SourceStatus::Active,
            chunk_index: 0,
            claim: None,
        }
    }

    pub fn from_chunk(chunk: &SourceChunk, source: &Source, similarity: f64) -> Self {
        Self {
            chunk_id: chunk.id,
            source_id: source.id,
            similarity,
            authority: source.authority_level,
            source_status: source.status,
            chunk_index: chunk.chunk_index,
            claim: None,
        }
    }

    pub fn with_status(mut self, status: SourceStatus) -> Self {
        self.source_status = status;
        self
    }

    pub fn with_index(mut self, chunk_index: u32) -> Self {
        self.chunk_index = chunk_index;
        self
    }

    pub fn with_claim(mut self, claim: Claim) -> Self {
        self.claim = Some(claim);
        self
    }

    pub fn is_active(&self) -> bool {
        self.source_status.is_current()
    }
}

/// Total order used to rank candidates.
///
/// Similarity descending, then authority descending, then active sources
/// first, then chunk index and chunk id ascending.
pub fn rank_order(a: &Candidate, b: &Candidate) -> Ordering {
    b.similarity
        .total_cmp(&a.similarity)
        .then_with(|| b.authority.cmp(&a.authority))
        .then_with(|| b.is_active().cmp(&a.is_active()))
        .then_with(|| a.chunk_index.cmp(&b.chunk_index))
        .then_with(|| a.chunk_id.cmp(&b.chunk_id))
}

/// Raw output of a vector search, before it is joined with the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub chunk_id: ChunkId,
    pub similarity: f64,
    pub source_id: SourceId,
}

/// Upstream retrieval could not produce candidates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("retrieval failed: {message}")]
pub struct RetrievalFailure {
    pub message: String,
}

impl RetrievalFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
