//! Evidence sufficiency: decide whether retrieved evidence may back an answer.
//!
//! The analyzer sits between retrieval and answer generation. It takes the
//! ranked candidates for a query and either clears them for answering or
//! forces an abstention carrying one [`ReasonCode`](trustgate_core::ReasonCode).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐    ┌──────────────┐    ┌──────────────┐
//! │  Retrieval   │───▶│  resolve_    │───▶│  Evidence    │
//! │  (hits)      │    │  candidates  │    │  Analyzer    │
//! └─────────────┘    └──────────────┘    └──────────────┘
//!                         │ corpus               │
//!                                          ┌─────┴──────┐
//!                                          │  Decision  │
//!                                          │  Answer    │
//!                                          │  Abstain   │
//!                                          └────────────┘
//! ```
//!
//! The analyzer is pure: the same query and candidates always produce the
//! same serialized decision. Auditing lives in a [`TraceStore`], outside it:
//! [`TraceLog`] in memory, or `SqliteTraceLog` next to the corpus tables.

mod analyzer;
mod candidate;
mod decision;
mod resolve;
#[cfg(feature = "sqlite")]
mod sqlite;
mod trace;

pub use analyzer::EvidenceAnalyzer;
pub use candidate::{Candidate, Claim, EvidenceQuery, RetrievalFailure, RetrievalHit, rank_order};
pub use decision::{ConflictPair, DecisionDetails, EvidenceDecision, Outcome};
pub use resolve::resolve_candidates;
pub use trace::{DecisionTrace, TraceFilter, TraceLog, TraceStats, TraceStore};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteTraceLog;

use trustgate_core::error::PolicyError;

/// Errors from the evidence subsystem.
///
/// Analysis itself never fails: abstentions are decisions, not errors.
/// Only construction and trace persistence can.
#[derive(Debug, thiserror::Error)]
pub enum EvidenceError {
    #[error("invalid evidence policy: {0}")]
    Configuration(#[from] PolicyError),

    #[error("trace storage error: {0}")]
    Storage(String),
}
