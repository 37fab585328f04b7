//! # trustgate reasoning
//!
//! Engines that turn corpus facts into derived claims about GS1/ESRS
//! compliance. Each engine stamps every record it emits with an
//! [`EpistemicMarker`](trustgate_core::EpistemicMarker) and checks the
//! result against a [`MarkerPolicy`] before returning it:
//!
//! | Engine                  | Describes      | Allowed markers        |
//! |-------------------------|----------------|------------------------|
//! | [`GapAnalyzer`]         | present state  | fact, inference        |
//! | [`ImpactSimulator`]     | future state   | inference, uncertain   |
//! | [`AttributeRecommender`]| advice         | inference, uncertain   |
//!
//! Facts are only ever issued against sources that are still current in the
//! [`CorpusSnapshot`] the caller passes in.

pub mod catalog;
pub mod gap;
pub mod impact;
pub mod recommender;
pub mod record;
pub mod scenario;

pub use catalog::{AttributeInfo, CompanySize, Effort, MappingType};
pub use gap::{
    ComplianceGap, GapAnalysisInput, GapAnalysisResult, GapAnalyzer, GapPriority, GapSummary,
    GapType, MappedAttribute, RemediationPath, RemediationStep, RequirementMapping,
};
pub use impact::{
    ActionKind, ActionRecommendation, AttributeRef, CoverageComparison, CoverageStatus, FutureStatus,
    ImpactSimulator, ProjectedGap, SimulationInput, SimulationResult,
};
pub use recommender::{
    AttributeRecommendation, AttributeRecommender, MAX_RECOMMENDATIONS, RecommendationInput,
    RecommendationResult, RecommendationSummary, RegulatoryRelevance,
};
pub use record::{CorpusSnapshot, MarkerPolicy, ReasoningRecord};
pub use scenario::{RegulatoryScenario, ScenarioAssumption, ScenarioCatalog, ScenarioRequirement};

use thiserror::Error;
use trustgate_core::epistemic::EpistemicStatus;
use trustgate_core::error::MarkerError;

#[derive(Debug, Error)]
pub enum ReasoningError {
    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("Invalid scenario {id}: {reason}")]
    InvalidScenario { id: String, reason: String },

    #[error("{engine} produced record {record_id} with a {status} marker")]
    MarkerPolicyViolation {
        record_id: String,
        status: EpistemicStatus,
        engine: &'static str,
    },

    #[error("Marker error: {0}")]
    Marker(#[from] MarkerError),

    #[error("Scenario catalog parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
