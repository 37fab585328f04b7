//! The analyzer's verdict.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trustgate_core::chunk::ChunkId;
use trustgate_core::policy::QueryDomain;
use trustgate_core::source::AuthorityLevel;
use trustgate_core::taxonomy::ReasonCode;

/// Answer, or abstain with exactly one reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason_code", rename_all = "snake_case")]
pub enum Outcome {
    Answer,
    Abstain(ReasonCode),
}

/// Two top-window candidates from different sources that disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictPair {
    pub topic: String,
    pub first: ChunkId,
    pub second: ChunkId,
}

/// Diagnostics behind a decision. Deterministic for a given input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionDetails {
    pub domain: QueryDomain,
    pub required_authority: AuthorityLevel,
    pub top_similarity: f64,
    pub qualifying_count: usize,
    pub highest_authority: Option<AuthorityLevel>,
    pub distinct_sources: usize,
    pub agreement_ratio: f64,
    pub conflicting_pairs: Vec<ConflictPair>,
    /// Qualifying candidates per authority level
    pub authority_distribution: BTreeMap<AuthorityLevel, usize>,
    /// Why the input was rejected or retrieval failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DecisionDetails {
    pub(crate) fn empty(domain: QueryDomain, required_authority: AuthorityLevel) -> Self {
        Self {
            domain,
            required_authority,
            top_similarity: 0.0,
            qualifying_count: 0,
            highest_authority: None,
            distinct_sources: 0,
            agreement_ratio: 0.0,
            conflicting_pairs: Vec::new(),
            authority_distribution: BTreeMap::new(),
            error: None,
        }
    }
}

/// Result of evidence analysis.
///
/// Abstentions always carry an empty evidence set and zero confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceDecision {
    pub outcome: Outcome,
    pub evidence_set: Vec<ChunkId>,
    pub confidence: f64,
    pub details: DecisionDetails,
}

impl EvidenceDecision {
    pub(crate) fn answer(evidence_set: Vec<ChunkId>, confidence: f64, details: DecisionDetails) -> Self {
        Self {
            outcome: Outcome::Answer,
            evidence_set,
            confidence: confidence.clamp(0.0, 1.0),
            details,
        }
    }

    pub(crate) fn abstain(reason: ReasonCode, details: DecisionDetails) -> Self {
        Self {
            outcome: Outcome::Abstain(reason),
            evidence_set: Vec::new(),
            confidence: 0.0,
            details,
        }
    }

    pub fn is_answer(&self) -> bool {
        matches!(self.outcome, Outcome::Answer)
    }

    pub fn reason_code(&self) -> Option<ReasonCode> {
        match self.outcome {
            Outcome::Answer => None,
            Outcome::Abstain(reason) => Some(reason),
        }
    }

    /// The fixed taxonomy text for an abstention.
    pub fn explanation(&self) -> Option<&'static str> {
        self.reason_code().map(|r| r.template())
    }
}
