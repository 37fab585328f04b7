//! Evidence sufficiency analyzer.
//!
//! Rules run in a fixed order and the first one that matches decides:
//!
//! 1. too little qualifying evidence → `INSUFFICIENT_EVIDENCE`
//! 2. contradicting claims in the top window → `CONFLICTING_EVIDENCE`
//! 3. best authority below the domain floor → `AUTHORITY_INSUFFICIENT`
//! 4. nothing qualifying from an active source → `STALE_SOURCE`
//! 5. otherwise answer

use crate::candidate::{Candidate, EvidenceQuery, RetrievalFailure, rank_order};
use crate::decision::{ConflictPair, DecisionDetails, EvidenceDecision};
use crate::EvidenceError;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};
use trustgate_core::error::CorpusError;
use trustgate_core::policy::EvidencePolicy;
use trustgate_core::source::SourceId;
use trustgate_core::taxonomy::ReasonCode;

/// Deterministic evidence gate.
///
/// Holds only a validated policy, so it is `Send + Sync` and can be shared
/// freely.
#[derive(Debug, Clone)]
pub struct EvidenceAnalyzer {
    policy: EvidencePolicy,
}

impl EvidenceAnalyzer {
    /// Create an analyzer, rejecting a policy it could not decide with.
    pub fn new(policy: EvidencePolicy) -> Result<Self, EvidenceError> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &EvidencePolicy {
        &self.policy
    }

    /// Decide whether `candidates` may back an answer to `query`.
    pub fn analyze(&self, query: &EvidenceQuery, candidates: &[Candidate]) -> EvidenceDecision {
        let required = self.policy.min_authority_for_domain(query.domain);
        let mut details = DecisionDetails::empty(query.domain, required);

        if let Err(reason) = validate_input(query, candidates) {
            warn!(%reason, "Malformed evidence input");
            details.error = Some(reason);
            return self.finish(ReasonCode::SchemaValidationFailure, details);
        }

        let mut ranked: Vec<&Candidate> = candidates.iter().collect();
        ranked.sort_by(|a, b| rank_order(a, b));

        let qualifying: Vec<&Candidate> = ranked
            .iter()
            .copied()
            .filter(|c| c.similarity >= self.policy.min_similarity)
            .collect();

        details.top_similarity = ranked.first().map_or(0.0, |c| c.similarity);
        details.qualifying_count = qualifying.len();
        details.highest_authority = qualifying.iter().map(|c| c.authority).max();
        details.distinct_sources = qualifying
            .iter()
            .map(|c| c.source_id)
            .collect::<HashSet<_>>()
            .len();
        for c in &qualifying {
            *details.authority_distribution.entry(c.authority).or_default() += 1;
        }

        // Rule 1
        if qualifying.is_empty() || qualifying.len() < self.policy.min_supporting_chunks {
            debug!(
                candidates = candidates.len(),
                qualifying = qualifying.len(),
                top_similarity = details.top_similarity,
                "Not enough qualifying evidence"
            );
            return self.finish(ReasonCode::InsufficientEvidence, details);
        }

        // Rule 2
        let window = &qualifying[..qualifying.len().min(self.policy.conflict_window)];
        details.conflicting_pairs = find_conflicts(window);
        details.agreement_ratio = agreement_ratio(&qualifying, self.policy.conflict_window);
        if !details.conflicting_pairs.is_empty() {
            debug!(pairs = details.conflicting_pairs.len(), "Conflicting claims in top window");
            return self.finish(ReasonCode::ConflictingEvidence, details);
        }

        // Rule 3
        let highest = details.highest_authority.unwrap_or(required);
        if highest < required {
            debug!(%highest, %required, domain = %query.domain, "Authority below domain floor");
            return self.finish(ReasonCode::AuthorityInsufficient, details);
        }

        // Rule 4
        let evidence: Vec<&Candidate> = qualifying.iter().copied().filter(|c| c.is_active()).collect();
        let Some(best) = evidence.first() else {
            debug!(qualifying = qualifying.len(), "All qualifying evidence is stale");
            return self.finish(ReasonCode::StaleSource, details);
        };

        // Rule 5
        let w = &self.policy.weights;
        let confidence = (w.similarity * details.top_similarity
            + w.authority * best.authority.score()
            + w.agreement * details.agreement_ratio)
            / w.total();

        let decision = EvidenceDecision::answer(
            evidence.iter().map(|c| c.chunk_id).collect(),
            confidence,
            details,
        );
        info!(
            evidence = decision.evidence_set.len(),
            confidence = decision.confidence,
            "Evidence sufficient"
        );
        decision
    }

    /// Like [`analyze`](Self::analyze), but maps a failed retrieval to
    /// `RETRIEVAL_ERROR`.
    pub fn analyze_retrieval(
        &self,
        query: &EvidenceQuery,
        retrieved: Result<Vec<Candidate>, RetrievalFailure>,
    ) -> EvidenceDecision {
        match retrieved {
            Ok(candidates) => self.analyze(query, &candidates),
            Err(failure) => {
                warn!(error = %failure, "Retrieval failed");
                let mut details = DecisionDetails::empty(
                    query.domain,
                    self.policy.min_authority_for_domain(query.domain),
                );
                details.error = Some(failure.message);
                self.finish(ReasonCode::RetrievalError, details)
            }
        }
    }

    /// Decide on the result of [`resolve_candidates`](crate::resolve_candidates).
    ///
    /// A hit that disagrees with the corpus about which source owns its
    /// chunk is malformed input (`SCHEMA_VALIDATION_FAILURE`). Any other
    /// lookup failure is a `RETRIEVAL_ERROR`.
    pub fn analyze_resolved(
        &self,
        query: &EvidenceQuery,
        resolved: Result<Vec<Candidate>, CorpusError>,
    ) -> EvidenceDecision {
        match resolved {
            Err(CorpusError::Validation(reason)) => {
                warn!(%reason, "Malformed retrieval hit");
                let mut details = DecisionDetails::empty(
                    query.domain,
                    self.policy.min_authority_for_domain(query.domain),
                );
                details.error = Some(reason);
                self.finish(ReasonCode::SchemaValidationFailure, details)
            }
            other => self.analyze_retrieval(
                query,
                other.map_err(|e| RetrievalFailure::new(e.to_string())),
            ),
        }
    }

    fn finish(&self, reason: ReasonCode, details: DecisionDetails) -> EvidenceDecision {
        info!(reason = %reason, "Abstaining");
        EvidenceDecision::abstain(reason, details)
    }
}

fn validate_input(query: &EvidenceQuery, candidates: &[Candidate]) -> Result<(), String> {
    if query.text.trim().is_empty() {
        return Err("query text is empty".into());
    }

    let mut seen = HashSet::with_capacity(candidates.len());
    for c in candidates {
        if !c.similarity.is_finite() || !(0.0..=1.0).contains(&c.similarity) {
            return Err(format!(
                "chunk {} has similarity {} outside [0, 1]",
                c.chunk_id, c.similarity
            ));
        }
        if !seen.insert(c.chunk_id) {
            return Err(format!("chunk {} appears more than once", c.chunk_id));
        }
    }
    Ok(())
}

/// Cross-source contradictions among `window`, in rank order.
fn find_conflicts(window: &[&Candidate]) -> Vec<ConflictPair> {
    let mut pairs = Vec::new();
    for (i, a) in window.iter().enumerate() {
        let Some(claim_a) = &a.claim else { continue };
        for b in &window[i + 1..] {
            let Some(claim_b) = &b.claim else { continue };
            if a.source_id != b.source_id && claim_a.contradicts(claim_b) {
                pairs.push(ConflictPair {
                    topic: claim_a.topic.clone(),
                    first: a.chunk_id,
                    second: b.chunk_id,
                });
            }
        }
    }
    pairs
}

/// Share of the first `window` distinct sources (in rank order) whose
/// claims no other of those sources contradicts.
fn agreement_ratio(qualifying: &[&Candidate], window: usize) -> f64 {
    let mut sources: Vec<SourceId> = Vec::new();
    for c in qualifying {
        if sources.len() == window {
            break;
        }
        if !sources.contains(&c.source_id) {
            sources.push(c.source_id);
        }
    }
    if sources.is_empty() {
        return 0.0;
    }

    let in_scope: Vec<&Candidate> = qualifying
        .iter()
        .copied()
        .filter(|c| sources.contains(&c.source_id))
        .collect();

    let mut conflicted: BTreeMap<SourceId, bool> = sources.iter().map(|s| (*s, false)).collect();
    for pair in find_conflicts(&in_scope) {
        for c in &in_scope {
            if c.chunk_id == pair.first || c.chunk_id == pair.second {
                conflicted.insert(c.source_id, true);
            }
        }
    }

    let agreeing = conflicted.values().filter(|c| !**c).count();
    agreeing as f64 / sources.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Claim;
    use crate::decision::Outcome;
    use proptest::prelude::*;
    use trustgate_core::policy::{AuthorityFloors, QueryDomain};
    use trustgate_core::source::{AuthorityLevel, SourceStatus};

    fn analyzer() -> EvidenceAnalyzer {
        EvidenceAnalyzer::new(EvidencePolicy::default()).unwrap()
    }

    fn general(text: &str) -> EvidenceQuery {
        EvidenceQuery::with_domain(text, QueryDomain::General)
    }

    #[test]
    fn invalid_policy_rejected_at_construction() {
        let policy = EvidencePolicy {
            min_similarity: -0.1,
            ..Default::default()
        };
        assert!(matches!(
            EvidenceAnalyzer::new(policy),
            Err(EvidenceError::Configuration(_))
        ));
    }

    #[test]
    fn empty_candidates_abstain_insufficient() {
        let d = analyzer().analyze(&general("battery passport"), &[]);
        assert_eq!(d.outcome, Outcome::Abstain(ReasonCode::InsufficientEvidence));
        assert_eq!(d.confidence, 0.0);
        assert!(d.evidence_set.is_empty());
    }

    #[test]
    fn below_threshold_abstains_insufficient() {
        let candidates = [Candidate::new(1, 1, 0.49, AuthorityLevel::Official)];
        let d = analyzer().analyze(&general("battery passport"), &candidates);
        assert_eq!(d.reason_code(), Some(ReasonCode::InsufficientEvidence));
        assert_eq!(d.details.top_similarity, 0.49);
        assert_eq!(d.details.qualifying_count, 0);
    }

    #[test]
    fn min_supporting_chunks_enforced() {
        let policy = EvidencePolicy {
            min_supporting_chunks: 2,
            ..Default::default()
        };
        let analyzer = EvidenceAnalyzer::new(policy).unwrap();
        let candidates = [
            Candidate::new(1, 1, 0.9, AuthorityLevel::Official),
            Candidate::new(2, 1, 0.3, AuthorityLevel::Official),
        ];
        let d = analyzer.analyze(&general("q"), &candidates);
        assert_eq!(d.reason_code(), Some(ReasonCode::InsufficientEvidence));
    }

    #[test]
    fn single_active_chunk_answers() {
        let candidates = [Candidate::new(10, 2, 0.85, AuthorityLevel::Official)];
        let d = analyzer().analyze(&general("When does the battery passport apply?"), &candidates);
        assert!(d.is_answer());
        assert_eq!(d.evidence_set, vec![10]);
        // (0.5 * 0.85 + 0.3 * 1.0 + 0.2 * 1.0) / 1.0
        assert!((d.confidence - 0.925).abs() < 1e-9);
    }

    #[test]
    fn superseded_only_is_stale() {
        let candidates = [
            Candidate::new(1, 1, 0.9, AuthorityLevel::Official).with_status(SourceStatus::Superseded),
            Candidate::new(2, 2, 0.4, AuthorityLevel::Official),
        ];
        let d = analyzer().analyze(&general("deadline"), &candidates);
        assert_eq!(d.reason_code(), Some(ReasonCode::StaleSource));
        assert!(d.evidence_set.is_empty());
    }

    #[test]
    fn archived_counts_as_stale() {
        let candidates =
            [Candidate::new(1, 1, 0.9, AuthorityLevel::Official).with_status(SourceStatus::Archived)];
        let d = analyzer().analyze(&general("q"), &candidates);
        assert_eq!(d.reason_code(), Some(ReasonCode::StaleSource));
    }

    #[test]
    fn cross_source_contradiction_conflicts() {
        let candidates = [
            Candidate::new(1, 1, 0.80, AuthorityLevel::Industry)
                .with_claim(Claim::new("dpp-textiles-date", "2027")),
            Candidate::new(2, 3, 0.78, AuthorityLevel::Official)
                .with_claim(Claim::new("dpp-textiles-date", "2028")),
        ];
        let d = analyzer().analyze(&general("textiles DPP"), &candidates);
        assert_eq!(d.reason_code(), Some(ReasonCode::ConflictingEvidence));
        assert_eq!(d.details.conflicting_pairs.len(), 1);
        assert_eq!(d.details.conflicting_pairs[0].first, 1);
        assert_eq!(d.details.agreement_ratio, 0.0);
    }

    #[test]
    fn same_source_disagreement_is_not_a_conflict() {
        let candidates = [
            Candidate::new(1, 1, 0.80, AuthorityLevel::Official).with_claim(Claim::new("t", "a")),
            Candidate::new(2, 1, 0.78, AuthorityLevel::Official).with_claim(Claim::new("t", "b")),
        ];
        let d = analyzer().analyze(&general("q"), &candidates);
        assert!(d.is_answer());
        assert_eq!(d.details.agreement_ratio, 1.0);
    }

    #[test]
    fn conflict_outside_window_lowers_agreement_only() {
        let policy = EvidencePolicy {
            conflict_window: 2,
            ..Default::default()
        };
        let analyzer = EvidenceAnalyzer::new(policy).unwrap();
        let candidates = [
            Candidate::new(1, 1, 0.95, AuthorityLevel::Official).with_claim(Claim::new("t", "a")),
            Candidate::new(2, 1, 0.94, AuthorityLevel::Official),
            Candidate::new(3, 2, 0.90, AuthorityLevel::Official).with_claim(Claim::new("t", "b")),
        ];
        let d = analyzer.analyze(&general("q"), &candidates);
        assert!(d.is_answer());
        assert!(d.details.conflicting_pairs.is_empty());
        // Sources 1 and 2 are the first two distinct sources and disagree.
        assert_eq!(d.details.agreement_ratio, 0.0);
    }

    #[test]
    fn conflict_takes_precedence_over_authority() {
        let candidates = [
            Candidate::new(1, 1, 0.80, AuthorityLevel::Community).with_claim(Claim::new("t", "a")),
            Candidate::new(2, 2, 0.78, AuthorityLevel::Community).with_claim(Claim::new("t", "b")),
        ];
        let query = EvidenceQuery::with_domain("q", QueryDomain::Regulatory);
        let d = analyzer().analyze(&query, &candidates);
        assert_eq!(d.reason_code(), Some(ReasonCode::ConflictingEvidence));
    }

    #[test]
    fn regulatory_query_needs_verified_source() {
        let candidates = [Candidate::new(1, 1, 0.9, AuthorityLevel::Industry)];
        let query = EvidenceQuery::new("Which ESRS datapoints are mandatory?");
        assert_eq!(query.domain, QueryDomain::Regulatory);
        let d = analyzer().analyze(&query, &candidates);
        assert_eq!(d.reason_code(), Some(ReasonCode::AuthorityInsufficient));
        assert_eq!(d.details.required_authority, AuthorityLevel::Verified);
        assert_eq!(d.details.highest_authority, Some(AuthorityLevel::Industry));
    }

    #[test]
    fn authority_checked_before_staleness() {
        let policy = EvidencePolicy {
            authority_floors: AuthorityFloors::uniform(AuthorityLevel::Official),
            ..Default::default()
        };
        let analyzer = EvidenceAnalyzer::new(policy).unwrap();
        let candidates = [Candidate::new(1, 1, 0.9, AuthorityLevel::Verified)
            .with_status(SourceStatus::Superseded)];
        let d = analyzer.analyze(&general("q"), &candidates);
        assert_eq!(d.reason_code(), Some(ReasonCode::AuthorityInsufficient));
    }

    #[test]
    fn evidence_set_skips_stale_and_weak_candidates() {
        let candidates = [
            Candidate::new(1, 1, 0.92, AuthorityLevel::Official).with_status(SourceStatus::Superseded),
            Candidate::new(2, 2, 0.88, AuthorityLevel::Verified),
            Candidate::new(3, 3, 0.30, AuthorityLevel::Official),
            Candidate::new(4, 4, 0.60, AuthorityLevel::Industry),
        ];
        let d = analyzer().analyze(&general("q"), &candidates);
        assert!(d.is_answer());
        assert_eq!(d.evidence_set, vec![2, 4]);
        assert_eq!(d.details.qualifying_count, 3);
        assert_eq!(d.details.distinct_sources, 3);
        assert_eq!(d.details.authority_distribution.get(&AuthorityLevel::Official), Some(&1));
        // top similarity 0.92 with the best active evidence (verified)
        let expected = 0.5 * 0.92 + 0.3 * 0.9 + 0.2 * 1.0;
        assert!((d.confidence - expected).abs() < 1e-9);
    }

    #[test]
    fn malformed_inputs_fail_schema_validation() {
        let a = analyzer();
        let ok = Candidate::new(1, 1, 0.9, AuthorityLevel::Official);

        let d = a.analyze(&general("   "), std::slice::from_ref(&ok));
        assert_eq!(d.reason_code(), Some(ReasonCode::SchemaValidationFailure));

        let nan = Candidate::new(2, 1, f64::NAN, AuthorityLevel::Official);
        let d = a.analyze(&general("q"), &[ok.clone(), nan]);
        assert_eq!(d.reason_code(), Some(ReasonCode::SchemaValidationFailure));

        let above = Candidate::new(2, 1, 1.01, AuthorityLevel::Official);
        let d = a.analyze(&general("q"), &[ok.clone(), above]);
        assert_eq!(d.reason_code(), Some(ReasonCode::SchemaValidationFailure));

        let d = a.analyze(&general("q"), &[ok.clone(), ok]);
        assert_eq!(d.reason_code(), Some(ReasonCode::SchemaValidationFailure));
        assert!(d.details.error.is_some());
    }

    #[test]
    fn retrieval_failure_abstains() {
        let d = analyzer().analyze_retrieval(
            &general("q"),
            Err(RetrievalFailure::new("vector index unavailable")),
        );
        assert_eq!(d.reason_code(), Some(ReasonCode::RetrievalError));
        assert_eq!(d.details.error.as_deref(), Some("vector index unavailable"));
    }

    #[test]
    fn repeated_calls_serialize_identically() {
        let candidates = [
            Candidate::new(1, 1, 0.8, AuthorityLevel::Verified).with_claim(Claim::new("t", "a")),
            Candidate::new(2, 2, 0.7, AuthorityLevel::Guidance).with_claim(Claim::new("t", "a")),
        ];
        let a = analyzer();
        let first = serde_json::to_string(&a.analyze(&general("q"), &candidates)).unwrap();
        let second = serde_json::to_string(&a.analyze(&general("q"), &candidates)).unwrap();
        assert_eq!(first, second);
    }

    fn arb_candidate() -> impl Strategy<Value = Candidate> {
        (
            1i64..4,
            0.0f64..=1.0,
            prop::sample::select(AuthorityLevel::ALL.to_vec()),
            prop::sample::select(SourceStatus::ALL.to_vec()),
            0u32..5,
            prop::option::of(("t[12]", "[ab]")),
        )
            .prop_map(|(source_id, similarity, authority, status, index, claim)| Candidate {
                chunk_id: 0,
                source_id,
                similarity,
                authority,
                source_status: status,
                chunk_index: index,
                claim: claim.map(|(t, c)| Claim::new(t, c)),
            })
    }

    proptest! {
        #[test]
        fn decision_ignores_input_order(
            mut candidates in prop::collection::vec(arb_candidate(), 0..8),
            seed in any::<u64>(),
        ) {
            for (i, c) in candidates.iter_mut().enumerate() {
                c.chunk_id = i as i64 + 1;
            }
            let a = analyzer();
            let query = general("deadline for DPP");
            let baseline = a.analyze(&query, &candidates);

            let mut shuffled = candidates.clone();
            let len = shuffled.len().max(1);
            shuffled.rotate_left((seed as usize) % len);
            shuffled.reverse();
            prop_assert_eq!(a.analyze(&query, &shuffled), baseline.clone());

            if !baseline.is_answer() {
                prop_assert_eq!(baseline.confidence, 0.0);
                prop_assert!(baseline.evidence_set.is_empty());
            } else {
                prop_assert!((0.0..=1.0).contains(&baseline.confidence));
            }
        }
    }

    #[test]
    fn resolved_hit_with_wrong_source_is_malformed() {
        let query = general("battery passport");
        let d = analyzer().analyze_resolved(
            &query,
            Err(CorpusError::Validation("hit for chunk 3 names source 9".into())),
        );
        assert_eq!(d.reason_code(), Some(ReasonCode::SchemaValidationFailure));
        assert_eq!(d.details.error.as_deref(), Some("hit for chunk 3 names source 9"));
        assert!(d.evidence_set.is_empty());
    }

    #[test]
    fn resolved_lookup_failures_are_retrieval_errors() {
        let query = general("battery passport");
        for err in [
            CorpusError::NotFound("chunk 3".into()),
            CorpusError::Storage("disk I/O error".into()),
            CorpusError::QueryFailed("no such table".into()),
        ] {
            let d = analyzer().analyze_resolved(&query, Err(err));
            assert_eq!(d.reason_code(), Some(ReasonCode::RetrievalError));
            assert!(d.details.error.is_some());
        }

        let ok = analyzer().analyze_resolved(
            &query,
            Ok(vec![Candidate::new(1, 1, 0.9, AuthorityLevel::Official)]),
        );
        assert!(ok.is_answer());
    }
}
