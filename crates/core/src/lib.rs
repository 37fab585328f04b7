//! # trustgate core
//!
//! Domain types, traits, and error definitions for the trustgate evidence
//! layer. Everything here is framework-free: storage backends, the evidence
//! analyzer, and the reasoning engines all depend inward on this crate.
//!
//! ## Layout
//!
//! - [`source`] and [`chunk`]: the versioned corpus model
//! - [`corpus`]: the [`CorpusStore`] trait every backend implements
//! - [`taxonomy`]: closed set of abstention reason codes
//! - [`policy`]: thresholds and weights for the sufficiency decision
//! - [`epistemic`]: claim markers and weakest-link aggregation

pub mod chunk;
pub mod corpus;
pub mod epistemic;
pub mod error;
pub mod policy;
pub mod source;
pub mod taxonomy;

// Re-export key types at crate root for ergonomics
pub use chunk::{ChunkId, ChunkType, NewChunk, SourceChunk, content_hash, normalize_content};
pub use corpus::{CorpusStats, CorpusStore};
pub use epistemic::{
    ConfidenceLevel, EpistemicMarker, EpistemicStatus, EpistemicSummary,
    calculate_overall_confidence,
};
pub use error::{CorpusError, Error, MarkerError, PolicyError, Result};
pub use policy::{AuthorityFloors, ConfidenceWeights, EvidencePolicy, QueryDomain};
pub use source::{AuthorityLevel, NewSource, Source, SourceId, SourceStatus, SourceType};
pub use taxonomy::ReasonCode;
