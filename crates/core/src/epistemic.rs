//! Epistemic markers: how much a derived claim can be trusted.
//!
//! Every record emitted by a reasoning engine carries exactly one
//! [`EpistemicMarker`]. A marker can only be built through the validating
//! constructors (or deserialized through the same checks), so an uncertain
//! claim without assumptions, or a fact without a basis, cannot exist.
//!
//! Composite records use [`calculate_overall_confidence`], which takes the
//! weakest status and the lowest confidence of its inputs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::MarkerError;
use crate::source::Source;

/// What kind of claim a marker is attached to. Declared strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpistemicStatus {
    /// Directly verifiable against a current source record
    Fact,
    /// Derived from current facts by analysis
    Inference,
    /// Depends on an assumption about the future
    Uncertain,
}

impl EpistemicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EpistemicStatus::Fact => "fact",
            EpistemicStatus::Inference => "inference",
            EpistemicStatus::Uncertain => "uncertain",
        }
    }
}

impl fmt::Display for EpistemicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared weakest first so `min` picks the lowest confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub const HIGH_THRESHOLD: f64 = 0.70;
    pub const MEDIUM_THRESHOLD: f64 = 0.40;

    /// `>= 0.70` high, `>= 0.40` medium, anything else (including NaN) low.
    pub fn from_score(score: f64) -> Self {
        if score >= Self::HIGH_THRESHOLD {
            ConfidenceLevel::High
        } else if score >= Self::MEDIUM_THRESHOLD {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    /// A score inside this level's band, for records that only know the level.
    pub fn representative_score(&self) -> f64 {
        match self {
            ConfidenceLevel::High => 0.85,
            ConfidenceLevel::Medium => 0.55,
            ConfidenceLevel::Low => 0.25,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMarker")]
pub struct EpistemicMarker {
    status: EpistemicStatus,
    confidence: ConfidenceLevel,
    basis: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    assumptions: Vec<String>,
}

#[derive(Deserialize)]
struct RawMarker {
    status: EpistemicStatus,
    confidence: ConfidenceLevel,
    basis: String,
    #[serde(default)]
    assumptions: Vec<String>,
}

impl TryFrom<RawMarker> for EpistemicMarker {
    type Error = MarkerError;

    fn try_from(raw: RawMarker) -> Result<Self, Self::Error> {
        match raw.status {
            EpistemicStatus::Uncertain => {
                Self::uncertain_with(raw.basis, raw.assumptions, raw.confidence)
            }
            _ if !raw.assumptions.is_empty() => Err(MarkerError::UnexpectedAssumptions),
            EpistemicStatus::Fact => Self::fact(raw.basis),
            EpistemicStatus::Inference => Self::inference(raw.basis, raw.confidence),
        }
    }
}

impl EpistemicMarker {
    /// A fact: always high confidence.
    pub fn fact(basis: impl Into<String>) -> Result<Self, MarkerError> {
        Ok(Self {
            status: EpistemicStatus::Fact,
            confidence: ConfidenceLevel::High,
            basis: non_empty_basis(basis.into())?,
            assumptions: Vec::new(),
        })
    }

    /// A fact checked against the source it cites. Fails unless that source
    /// is still active.
    pub fn fact_for_source(basis: impl Into<String>, source: &Source) -> Result<Self, MarkerError> {
        if !source.is_active() {
            return Err(MarkerError::StaleSource {
                source_id: source.id,
                status: source.status,
            });
        }
        Self::fact(basis)
    }

    pub fn inference(
        basis: impl Into<String>,
        confidence: ConfidenceLevel,
    ) -> Result<Self, MarkerError> {
        Ok(Self {
            status: EpistemicStatus::Inference,
            confidence,
            basis: non_empty_basis(basis.into())?,
            assumptions: Vec::new(),
        })
    }

    pub fn inference_from_score(basis: impl Into<String>, score: f64) -> Result<Self, MarkerError> {
        Self::inference(basis, ConfidenceLevel::from_score(score))
    }

    /// An uncertain claim at low confidence.
    pub fn uncertain(
        basis: impl Into<String>,
        assumptions: Vec<String>,
    ) -> Result<Self, MarkerError> {
        Self::uncertain_with(basis, assumptions, ConfidenceLevel::Low)
    }

    /// An uncertain claim whose confidence reflects how likely its
    /// assumptions are to hold.
    pub fn uncertain_with(
        basis: impl Into<String>,
        assumptions: Vec<String>,
        confidence: ConfidenceLevel,
    ) -> Result<Self, MarkerError> {
        let basis = non_empty_basis(basis.into())?;
        if assumptions.is_empty() {
            return Err(MarkerError::MissingAssumptions);
        }
        if assumptions.iter().any(|a| a.trim().is_empty()) {
            return Err(MarkerError::BlankAssumption);
        }
        Ok(Self {
            status: EpistemicStatus::Uncertain,
            confidence,
            basis,
            assumptions,
        })
    }

    pub fn status(&self) -> EpistemicStatus {
        self.status
    }

    pub fn confidence(&self) -> ConfidenceLevel {
        self.confidence
    }

    pub fn basis(&self) -> &str {
        &self.basis
    }

    pub fn assumptions(&self) -> &[String] {
        &self.assumptions
    }
}

fn non_empty_basis(basis: String) -> Result<String, MarkerError> {
    if basis.trim().is_empty() {
        Err(MarkerError::EmptyBasis)
    } else {
        Ok(basis)
    }
}

/// Weakest-link composition of a set of markers.
///
/// Any uncertain input makes the result uncertain; otherwise any inference
/// makes it an inference; otherwise it is a fact. Confidence is the minimum
/// over all inputs and assumptions are the sorted union, so the result does
/// not depend on input order. Returns `None` for an empty slice.
pub fn calculate_overall_confidence(markers: &[EpistemicMarker]) -> Option<EpistemicMarker> {
    let status = markers.iter().map(|m| m.status).max()?;
    let confidence = markers.iter().map(|m| m.confidence).min()?;

    let counts = StatusCounts::tally(markers);
    let basis = format!(
        "Aggregated from {} claims ({} fact, {} inference, {} uncertain)",
        markers.len(),
        counts.fact,
        counts.inference,
        counts.uncertain
    );

    let assumptions: Vec<String> = markers
        .iter()
        .flat_map(|m| m.assumptions.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    Some(EpistemicMarker {
        status,
        confidence,
        basis,
        assumptions,
    })
}

#[derive(Debug, Clone, Copy, Default)]
struct StatusCounts {
    fact: usize,
    inference: usize,
    uncertain: usize,
}

impl StatusCounts {
    fn tally(markers: &[EpistemicMarker]) -> Self {
        let mut counts = Self::default();
        for m in markers {
            match m.status {
                EpistemicStatus::Fact => counts.fact += 1,
                EpistemicStatus::Inference => counts.inference += 1,
                EpistemicStatus::Uncertain => counts.uncertain += 1,
            }
        }
        counts
    }
}

/// Per-status counts plus the aggregate marker of a result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpistemicSummary {
    pub fact_count: usize,
    pub inference_count: usize,
    pub uncertain_count: usize,
    pub overall: Option<EpistemicMarker>,
}

impl EpistemicSummary {
    pub fn from_markers(markers: &[EpistemicMarker]) -> Self {
        let counts = StatusCounts::tally(markers);
        Self {
            fact_count: counts.fact,
            inference_count: counts.inference,
            uncertain_count: counts.uncertain,
            overall: calculate_overall_confidence(markers),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{NewSource, SourceStatus, SourceType};
    use chrono::Utc;
    use proptest::prelude::*;

    fn fact() -> EpistemicMarker {
        EpistemicMarker::fact("mapping table row").unwrap()
    }

    fn inference(level: ConfidenceLevel) -> EpistemicMarker {
        EpistemicMarker::inference("coverage analysis", level).unwrap()
    }

    fn uncertain() -> EpistemicMarker {
        EpistemicMarker::uncertain("scenario projection", vec!["deadline holds".into()]).unwrap()
    }

    #[test]
    fn thresholds() {
        assert_eq!(ConfidenceLevel::from_score(0.70), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.6999), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.40), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.39), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(f64::NAN), ConfidenceLevel::Low);
        for level in [ConfidenceLevel::High, ConfidenceLevel::Medium, ConfidenceLevel::Low] {
            assert_eq!(ConfidenceLevel::from_score(level.representative_score()), level);
        }
    }

    #[test]
    fn empty_basis_rejected() {
        assert_eq!(EpistemicMarker::fact("  ").unwrap_err(), MarkerError::EmptyBasis);
        assert_eq!(
            EpistemicMarker::inference("", ConfidenceLevel::High).unwrap_err(),
            MarkerError::EmptyBasis
        );
    }

    #[test]
    fn uncertain_requires_assumptions() {
        assert_eq!(
            EpistemicMarker::uncertain("projection", vec![]).unwrap_err(),
            MarkerError::MissingAssumptions
        );
        assert_eq!(
            EpistemicMarker::uncertain("projection", vec![" ".into()]).unwrap_err(),
            MarkerError::BlankAssumption
        );
    }

    #[test]
    fn fact_for_superseded_source_rejected() {
        let mut source = NewSource::new("s1", "Battery Regulation", SourceType::EuRegulation)
            .into_source(1, Utc::now());
        assert!(EpistemicMarker::fact_for_source("Article 77", &source).is_ok());

        source.status = SourceStatus::Superseded;
        assert!(matches!(
            EpistemicMarker::fact_for_source("Article 77", &source),
            Err(MarkerError::StaleSource { source_id: 1, .. })
        ));
    }

    #[test]
    fn aggregate_of_facts_is_fact() {
        let overall = calculate_overall_confidence(&[fact(), fact()]).unwrap();
        assert_eq!(overall.status(), EpistemicStatus::Fact);
        assert_eq!(overall.confidence(), ConfidenceLevel::High);
    }

    #[test]
    fn inference_takes_minimum_confidence() {
        let overall = calculate_overall_confidence(&[
            fact(),
            inference(ConfidenceLevel::Medium),
            inference(ConfidenceLevel::Low),
        ])
        .unwrap();
        assert_eq!(overall.status(), EpistemicStatus::Inference);
        assert_eq!(overall.confidence(), ConfidenceLevel::Low);
    }

    #[test]
    fn single_uncertain_is_not_laundered() {
        let overall =
            calculate_overall_confidence(&[fact(), fact(), fact(), uncertain()]).unwrap();
        assert_eq!(overall.status(), EpistemicStatus::Uncertain);
        assert_eq!(overall.assumptions(), &["deadline holds".to_string()]);
    }

    #[test]
    fn empty_aggregate_is_none() {
        assert!(calculate_overall_confidence(&[]).is_none());
    }

    #[test]
    fn summary_counts() {
        let summary = EpistemicSummary::from_markers(&[fact(), inference(ConfidenceLevel::High)]);
        assert_eq!(summary.fact_count, 1);
        assert_eq!(summary.inference_count, 1);
        assert_eq!(summary.uncertain_count, 0);
        assert_eq!(
            summary.overall.unwrap().status(),
            EpistemicStatus::Inference
        );
    }

    #[test]
    fn deserialization_enforces_invariants() {
        let bad = r#"{"status":"uncertain","confidence":"low","basis":"projection"}"#;
        assert!(serde_json::from_str::<EpistemicMarker>(bad).is_err());

        let bad = r#"{"status":"fact","confidence":"high","basis":""}"#;
        assert!(serde_json::from_str::<EpistemicMarker>(bad).is_err());

        let good = r#"{"status":"inference","confidence":"medium","basis":"sector analysis"}"#;
        let marker: EpistemicMarker = serde_json::from_str(good).unwrap();
        assert_eq!(marker.confidence(), ConfidenceLevel::Medium);
    }

    fn arb_marker() -> impl Strategy<Value = EpistemicMarker> {
        prop_oneof![
            Just(fact()),
            Just(inference(ConfidenceLevel::High)),
            Just(inference(ConfidenceLevel::Medium)),
            Just(inference(ConfidenceLevel::Low)),
        ]
    }

    proptest! {
        #[test]
        fn any_uncertain_input_wins_regardless_of_order(
            others in proptest::collection::vec(arb_marker(), 0..12),
            position in 0usize..13,
        ) {
            let mut markers = others.clone();
            let at = position.min(markers.len());
            markers.insert(at, uncertain());

            let overall = calculate_overall_confidence(&markers).unwrap();
            prop_assert_eq!(overall.status(), EpistemicStatus::Uncertain);

            let mut reversed = markers.clone();
            reversed.reverse();
            prop_assert_eq!(calculate_overall_confidence(&reversed).unwrap(), overall);
        }

        #[test]
        fn without_uncertain_never_uncertain(
            markers in proptest::collection::vec(arb_marker(), 1..12),
        ) {
            let overall = calculate_overall_confidence(&markers).unwrap();
            prop_assert_ne!(overall.status(), EpistemicStatus::Uncertain);
            let min = markers.iter().map(|m| m.confidence()).min().unwrap();
            prop_assert_eq!(overall.confidence(), min);
        }
    }
}
