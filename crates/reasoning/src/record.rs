//! Shared scaffolding for reasoning records.

use crate::ReasoningError;
use std::collections::HashMap;
use trustgate_core::corpus::CorpusStore;
use trustgate_core::epistemic::{EpistemicMarker, EpistemicStatus};
use trustgate_core::error::CorpusError;
use trustgate_core::source::{Source, SourceId};

/// A derived claim emitted by a reasoning engine.
pub trait ReasoningRecord {
    fn record_id(&self) -> &str;

    fn marker(&self) -> &EpistemicMarker;

    /// Numeric confidence in [0, 1].
    fn confidence_score(&self) -> f64;
}

/// The marker statuses an engine may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerPolicy {
    pub engine: &'static str,
    pub allowed: &'static [EpistemicStatus],
}

impl MarkerPolicy {
    /// Statements about the current corpus never rest on assumptions.
    pub const PRESENT_STATE: MarkerPolicy = MarkerPolicy {
        engine: "gap analyzer",
        allowed: &[EpistemicStatus::Fact, EpistemicStatus::Inference],
    };

    /// Projections are never facts.
    pub const FUTURE_STATE: MarkerPolicy = MarkerPolicy {
        engine: "impact simulator",
        allowed: &[EpistemicStatus::Inference, EpistemicStatus::Uncertain],
    };

    pub const RECOMMENDATION: MarkerPolicy = MarkerPolicy {
        engine: "attribute recommender",
        allowed: &[EpistemicStatus::Inference, EpistemicStatus::Uncertain],
    };

    pub fn permits(&self, status: EpistemicStatus) -> bool {
        self.allowed.contains(&status)
    }

    /// Fails on the first record whose marker status is not allowed.
    pub fn enforce<R: ReasoningRecord>(&self, records: &[R]) -> Result<(), ReasoningError> {
        match records.iter().find(|r| !self.permits(r.marker().status())) {
            Some(record) => Err(ReasoningError::MarkerPolicyViolation {
                record_id: record.record_id().to_string(),
                status: record.marker().status(),
                engine: self.engine,
            }),
            None => Ok(()),
        }
    }
}

/// Point-in-time view of the corpus sources, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct CorpusSnapshot {
    sources: HashMap<SourceId, Source>,
}

impl CorpusSnapshot {
    pub fn from_sources(sources: impl IntoIterator<Item = Source>) -> Self {
        Self {
            sources: sources.into_iter().map(|s| (s.id, s)).collect(),
        }
    }

    /// Reads every source, whatever its status.
    pub async fn load(store: &dyn CorpusStore) -> Result<Self, CorpusError> {
        let sources = store.list_sources(None).await?;
        Ok(Self::from_sources(sources))
    }

    pub fn get(&self, id: SourceId) -> Option<&Source> {
        self.sources.get(&id)
    }

    /// Known and still active.
    pub fn is_current(&self, id: SourceId) -> bool {
        self.get(id).is_some_and(Source::is_active)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
