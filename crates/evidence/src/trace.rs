//! Audit log of evidence decisions.

use crate::candidate::{EvidenceQuery, RetrievalHit};
use crate::decision::EvidenceDecision;
use crate::EvidenceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use tracing::debug;
use trustgate_core::policy::QueryDomain;
use trustgate_core::taxonomy::ReasonCode;
use uuid::Uuid;

/// Maximum traces kept in memory.
const MAX_TRACE_LOG: usize = 5_000;

/// One recorded decision with the inputs that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTrace {
    pub trace_id: Uuid,
    pub query: String,
    pub domain: QueryDomain,
    pub hits: Vec<RetrievalHit>,
    pub decision: EvidenceDecision,
    pub created_at: DateTime<Utc>,
}

impl DecisionTrace {
    pub fn new(query: &EvidenceQuery, hits: &[RetrievalHit], decision: &EvidenceDecision) -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            query: query.text.clone(),
            domain: query.domain,
            hits: hits.to_vec(),
            decision: decision.clone(),
            created_at: Utc::now(),
        }
    }

    /// The decision could not be made on evidence at all.
    pub fn is_error(&self) -> bool {
        self.decision.details.error.is_some()
    }
}

/// Which traces a listing returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TraceFilter {
    #[default]
    All,
    Abstained,
    /// Retrieval or input failures
    Errors,
}

impl TraceFilter {
    pub fn matches(&self, trace: &DecisionTrace) -> bool {
        match self {
            TraceFilter::All => true,
            TraceFilter::Abstained => !trace.decision.is_answer(),
            TraceFilter::Errors => trace.is_error(),
        }
    }
}

/// Where decision traces are kept.
///
/// The in-memory [`TraceLog`] lives as long as the process; the SQLite
/// store shares the corpus database so traces outlive a CLI run.
#[async_trait]
pub trait TraceStore: Send + Sync {
    fn name(&self) -> &str;

    async fn save(&self, trace: &DecisionTrace) -> Result<(), EvidenceError>;

    async fn load(&self, trace_id: Uuid) -> Result<Option<DecisionTrace>, EvidenceError>;

    /// Newest first, at most `limit`.
    async fn recent(
        &self,
        filter: TraceFilter,
        limit: usize,
    ) -> Result<Vec<DecisionTrace>, EvidenceError>;

    async fn trace_stats(&self) -> Result<TraceStats, EvidenceError>;
}

/// Aggregate view over the trace log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceStats {
    pub total: usize,
    pub answered: usize,
    pub abstained: usize,
    pub by_reason: BTreeMap<ReasonCode, usize>,
    /// Mean confidence over answered decisions
    pub average_answer_confidence: Option<f64>,
}

/// Bounded, thread-safe trace log.
///
/// When full, the oldest tenth is dropped.
pub struct TraceLog {
    entries: RwLock<Vec<DecisionTrace>>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Store a decision and return its trace id.
    pub fn record(
        &self,
        query: &EvidenceQuery,
        hits: &[RetrievalHit],
        decision: &EvidenceDecision,
    ) -> Uuid {
        let trace = DecisionTrace::new(query, hits, decision);
        let id = trace.trace_id;
        self.push(trace);
        id
    }

    fn push(&self, trace: DecisionTrace) {
        let id = trace.trace_id;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= MAX_TRACE_LOG {
            entries.drain(..MAX_TRACE_LOG / 10);
        }
        entries.push(trace);
        debug!(trace_id = %id, "Decision traced");
    }

    pub fn get(&self, trace_id: Uuid) -> Option<DecisionTrace> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|t| t.trace_id == trace_id)
            .cloned()
    }

    /// All traces, oldest first.
    pub fn entries(&self) -> Vec<DecisionTrace> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> TraceStats {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        TraceStats::from_traces(entries.iter())
    }
}

impl TraceStats {
    pub fn from_traces<'a>(traces: impl IntoIterator<Item = &'a DecisionTrace>) -> Self {
        let mut stats = TraceStats::default();
        let mut confidence_sum = 0.0;

        for trace in traces {
            stats.total += 1;
            match trace.decision.reason_code() {
                None => {
                    stats.answered += 1;
                    confidence_sum += trace.decision.confidence;
                }
                Some(reason) => {
                    stats.abstained += 1;
                    *stats.by_reason.entry(reason).or_default() += 1;
                }
            }
        }

        if stats.answered > 0 {
            stats.average_answer_confidence = Some(confidence_sum / stats.answered as f64);
        }
        stats
    }
}

#[async_trait]
impl TraceStore for TraceLog {
    fn name(&self) -> &str {
        "memory"
    }

    async fn save(&self, trace: &DecisionTrace) -> Result<(), EvidenceError> {
        self.push(trace.clone());
        Ok(())
    }

    async fn load(&self, trace_id: Uuid) -> Result<Option<DecisionTrace>, EvidenceError> {
        Ok(self.get(trace_id))
    }

    async fn recent(
        &self,
        filter: TraceFilter,
        limit: usize,
    ) -> Result<Vec<DecisionTrace>, EvidenceError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .iter()
            .rev()
            .filter(|t| filter.matches(t))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn trace_stats(&self) -> Result<TraceStats, EvidenceError> {
        Ok(self.stats())
    }
}

impl Default for TraceLog {
    fn default() -> Self {
        Self::new()
    }
}
