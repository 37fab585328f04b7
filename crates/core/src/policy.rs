//! Evidence policy: the constants the sufficiency analyzer decides with.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PolicyError;
use crate::source::AuthorityLevel;

/// Coarse classification of a query, used to pick an authority floor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryDomain {
    Regulatory,
    Compliance,
    Technical,
    #[default]
    General,
}

impl QueryDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryDomain::Regulatory => "regulatory",
            QueryDomain::Compliance => "compliance",
            QueryDomain::Technical => "technical",
            QueryDomain::General => "general",
        }
    }

    /// Keyword heuristic. Regulatory terms win over technical ones, which
    /// win over compliance ones.
    pub fn infer(query: &str) -> Self {
        const REGULATORY: &[&str] = &[
            "regulation", "directive", "csrd", "eudr", "esrs", "legal", "mandatory", "compliance",
        ];
        const TECHNICAL: &[&str] = &[
            "implement", "technical", "specification", "format", "gtin", "barcode", "data model",
        ];
        const COMPLIANCE: &[&str] = &["comply", "requirement", "deadline", "must", "obligation"];

        let lower = query.to_lowercase();
        let hit = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        if hit(REGULATORY) {
            QueryDomain::Regulatory
        } else if hit(TECHNICAL) {
            QueryDomain::Technical
        } else if hit(COMPLIANCE) {
            QueryDomain::Compliance
        } else {
            QueryDomain::General
        }
    }
}

impl fmt::Display for QueryDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryDomain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regulatory" => Ok(QueryDomain::Regulatory),
            "compliance" => Ok(QueryDomain::Compliance),
            "technical" => Ok(QueryDomain::Technical),
            "general" => Ok(QueryDomain::General),
            other => Err(format!("unknown query domain: {other}")),
        }
    }
}

/// Minimum authority per query domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityFloors {
    #[serde(default = "default_regulatory_floor")]
    pub regulatory: AuthorityLevel,

    #[serde(default = "default_compliance_floor")]
    pub compliance: AuthorityLevel,

    #[serde(default = "default_technical_floor")]
    pub technical: AuthorityLevel,

    #[serde(default = "default_general_floor")]
    pub general: AuthorityLevel,
}

fn default_regulatory_floor() -> AuthorityLevel {
    AuthorityLevel::Verified
}
fn default_compliance_floor() -> AuthorityLevel {
    AuthorityLevel::Guidance
}
fn default_technical_floor() -> AuthorityLevel {
    AuthorityLevel::Industry
}
fn default_general_floor() -> AuthorityLevel {
    AuthorityLevel::Community
}

impl Default for AuthorityFloors {
    fn default() -> Self {
        Self {
            regulatory: default_regulatory_floor(),
            compliance: default_compliance_floor(),
            technical: default_technical_floor(),
            general: default_general_floor(),
        }
    }
}

impl AuthorityFloors {
    /// The same floor for every domain.
    pub fn uniform(level: AuthorityLevel) -> Self {
        Self {
            regulatory: level,
            compliance: level,
            technical: level,
            general: level,
        }
    }
}

/// Relative weights of the answer-confidence components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceWeights {
    #[serde(default = "default_similarity_weight")]
    pub similarity: f64,

    #[serde(default = "default_authority_weight")]
    pub authority: f64,

    #[serde(default = "default_agreement_weight")]
    pub agreement: f64,
}

fn default_similarity_weight() -> f64 {
    0.5
}
fn default_authority_weight() -> f64 {
    0.3
}
fn default_agreement_weight() -> f64 {
    0.2
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            similarity: default_similarity_weight(),
            authority: default_authority_weight(),
            agreement: default_agreement_weight(),
        }
    }
}

impl ConfidenceWeights {
    pub fn total(&self) -> f64 {
        self.similarity + self.authority + self.agreement
    }
}

/// Thresholds and weights for the evidence sufficiency decision.
///
/// Maps to the `[evidence]` table of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidencePolicy {
    /// Candidates below this similarity do not qualify
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,

    /// Qualifying candidates needed before anything else is checked
    #[serde(default = "default_min_supporting_chunks")]
    pub min_supporting_chunks: usize,

    /// How many top candidates (and distinct sources) are checked for conflicts
    #[serde(default = "default_conflict_window")]
    pub conflict_window: usize,

    #[serde(default)]
    pub authority_floors: AuthorityFloors,

    #[serde(default)]
    pub weights: ConfidenceWeights,
}

fn default_min_similarity() -> f64 {
    0.5
}
fn default_min_supporting_chunks() -> usize {
    1
}
fn default_conflict_window() -> usize {
    5
}

impl Default for EvidencePolicy {
    fn default() -> Self {
        Self {
            min_similarity: default_min_similarity(),
            min_supporting_chunks: default_min_supporting_chunks(),
            conflict_window: default_conflict_window(),
            authority_floors: AuthorityFloors::default(),
            weights: ConfidenceWeights::default(),
        }
    }
}

impl EvidencePolicy {
    pub fn min_authority_for_domain(&self, domain: QueryDomain) -> AuthorityLevel {
        match domain {
            QueryDomain::Regulatory => self.authority_floors.regulatory,
            QueryDomain::Compliance => self.authority_floors.compliance,
            QueryDomain::Technical => self.authority_floors.technical,
            QueryDomain::General => self.authority_floors.general,
        }
    }

    /// Reject anything the analyzer cannot decide with.
    pub fn validate(&self) -> Result<(), PolicyError> {
        unit_interval("min_similarity", self.min_similarity)?;
        unit_interval("weights.similarity", self.weights.similarity)?;
        unit_interval("weights.authority", self.weights.authority)?;
        unit_interval("weights.agreement", self.weights.agreement)?;

        if self.weights.total() <= 0.0 {
            return Err(PolicyError::Invalid(
                "weights.similarity + weights.authority + weights.agreement must be > 0".into(),
            ));
        }
        if self.min_supporting_chunks == 0 {
            return Err(PolicyError::OutOfRange {
                field: "min_supporting_chunks",
                value: "0".into(),
            });
        }
        if self.conflict_window == 0 {
            return Err(PolicyError::OutOfRange {
                field: "conflict_window",
                value: "0".into(),
            });
        }
        Ok(())
    }
}

fn unit_interval(field: &'static str, value: f64) -> Result<(), PolicyError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PolicyError::OutOfRange {
            field,
            value: value.to_string(),
        })
    }
}
