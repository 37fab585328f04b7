//! Future-state impact simulation against a regulatory scenario.
//!
//! Nothing here is a fact: projected gaps and contingent actions are
//! uncertain and carry the scenario's assumptions, and no-regret actions are
//! inferences that hold whatever the scenario turns into.

use crate::ReasoningError;
use crate::catalog::{self, ATTRIBUTE_CATALOG, CompanySize, Effort};
use crate::record::{MarkerPolicy, ReasoningRecord};
use crate::scenario::{RegulatoryScenario, ScenarioAssumption, ScenarioCatalog, ScenarioRequirement};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;
use trustgate_core::epistemic::{ConfidenceLevel, EpistemicMarker, EpistemicSummary};

/// Keyword groups triggered by a phrase in a requirement's GS1 impact text.
const IMPACT_KEYWORDS: &[(&str, &[&str])] = &[
    ("gtin", &["gtin", "identifier"]),
    ("gln", &["gln", "location"]),
    ("gdsn", &["gdsn", "product"]),
    ("epcis", &["epcis", "event", "traceability"]),
    ("digital link", &["digital", "link", "qr"]),
    ("carbon", &["carbon", "footprint", "emission"]),
    ("material", &["material", "composition", "packaging"]),
    ("recycl", &["recycl", "circular"]),
    ("origin", &["origin", "source", "country"]),
    ("hazard", &["hazard", "substance", "chemical"]),
];

const FALLBACK_KEYWORDS: &[&str] = &["product", "attribute"];

/// GS1 standards a no-regret action can be built on, by the phrase naming them.
const GS1_STANDARDS: &[(&str, &str)] = &[
    ("GTIN", "GTIN"),
    ("GDSN", "GDSN"),
    ("EPCIS", "EPCIS"),
    ("GLN", "GLN"),
    ("Digital Link", "GS1 Digital Link"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationInput {
    pub scenario_id: String,
    pub sector: String,
    #[serde(default)]
    pub company_size: CompanySize,
    #[serde(default)]
    pub current_attributes: Vec<String>,
}

/// An attribute the company could populate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRef {
    pub attribute_id: String,
    pub attribute_name: String,
}

impl AttributeRef {
    pub fn new(attribute_id: impl Into<String>, attribute_name: impl Into<String>) -> Self {
        Self {
            attribute_id: attribute_id.into(),
            attribute_name: attribute_name.into(),
        }
    }

    /// Every attribute in the built-in catalog.
    pub fn from_catalog() -> Vec<AttributeRef> {
        ATTRIBUTE_CATALOG.iter().map(|a| AttributeRef::new(a.id, a.name)).collect()
    }

    fn matches_any(&self, keywords: &[&str]) -> bool {
        let id = self.attribute_id.to_lowercase();
        let name = self.attribute_name.to_lowercase();
        keywords.iter().any(|k| id.contains(k) || name.contains(k))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    Covered,
    Partial,
    NotCovered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FutureStatus {
    WillBeCovered,
    AtRisk,
    Gap,
}

impl CoverageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageStatus::Covered => "covered",
            CoverageStatus::Partial => "partial",
            CoverageStatus::NotCovered => "not_covered",
        }
    }
}

impl FutureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FutureStatus::WillBeCovered => "will_be_covered",
            FutureStatus::AtRisk => "at_risk",
            FutureStatus::Gap => "gap",
        }
    }
}

impl From<CoverageStatus> for FutureStatus {
    fn from(status: CoverageStatus) -> Self {
        match status {
            CoverageStatus::Covered => FutureStatus::WillBeCovered,
            CoverageStatus::Partial => FutureStatus::AtRisk,
            CoverageStatus::NotCovered => FutureStatus::Gap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedGap {
    /// `proj-{requirement_id}`
    pub id: String,
    pub requirement_id: String,
    pub requirement: String,
    pub gs1_impact: String,
    pub current_status: CoverageStatus,
    pub future_status: FutureStatus,
    pub change_description: String,
    pub related_attributes: Vec<String>,
    pub marker: EpistemicMarker,
    pub confidence_score: f64,
}

impl ReasoningRecord for ProjectedGap {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn marker(&self) -> &EpistemicMarker {
        &self.marker
    }

    fn confidence_score(&self) -> f64 {
        self.confidence_score
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Worth doing whatever the regulation ends up saying
    NoRegret,
    /// Only worth doing if the scenario materialises
    Contingent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecommendation {
    pub id: String,
    pub kind: ActionKind,
    pub action: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefits_even_if_scenario_changes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_until: Option<String>,
    pub gs1_standards: Vec<String>,
    pub estimated_effort: Effort,
    pub marker: EpistemicMarker,
}

impl ActionRecommendation {
    fn dedup_key(&self) -> String {
        if self.gs1_standards.is_empty() {
            return self.action.clone();
        }
        let mut standards = self.gs1_standards.clone();
        standards.sort();
        standards.join(",")
    }
}

impl ReasoningRecord for ActionRecommendation {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn marker(&self) -> &EpistemicMarker {
        &self.marker
    }

    fn confidence_score(&self) -> f64 {
        self.marker.confidence().representative_score()
    }
}

/// Coverage of the affected requirements now and after the scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageComparison {
    pub affected_requirements: usize,
    pub current_coverage: u32,
    pub projected_coverage: u32,
    pub new_gaps_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub input: SimulationInput,
    pub scenario_name: String,
    pub regulation: String,
    pub expected_date: String,
    pub comparison: CoverageComparison,
    pub projected_gaps: Vec<ProjectedGap>,
    pub no_regret_actions: Vec<ActionRecommendation>,
    pub contingent_actions: Vec<ActionRecommendation>,
    pub active_assumptions: Vec<ScenarioAssumption>,
    pub disclaimer: String,
    pub epistemic: EpistemicSummary,
}

/// Projects a company's current coverage onto a scenario's requirements.
pub struct ImpactSimulator {
    catalog: ScenarioCatalog,
}

impl ImpactSimulator {
    pub fn new(catalog: ScenarioCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &ScenarioCatalog {
        &self.catalog
    }

    pub fn simulate(
        &self,
        input: &SimulationInput,
        attributes: &[AttributeRef],
    ) -> Result<SimulationResult, ReasoningError> {
        let scenario = self.catalog.get(&input.scenario_id)?;
        let sector = catalog::sector_key(&input.sector);
        let current: HashSet<&str> = input.current_attributes.iter().map(String::as_str).collect();

        let mut projected_gaps = Vec::new();
        let mut no_regret = Vec::new();
        let mut contingent = Vec::new();

        for requirement in scenario.requirements.iter().filter(|r| r.affects(&sector)) {
            let keywords = extract_keywords(&requirement.gs1_impact);
            let related: Vec<&AttributeRef> =
                attributes.iter().filter(|a| a.matches_any(&keywords)).collect();
            let covered = related
                .iter()
                .filter(|a| current.contains(a.attribute_id.as_str()))
                .count();

            let current_status = if covered == 0 {
                CoverageStatus::NotCovered
            } else if covered < related.len() {
                CoverageStatus::Partial
            } else {
                CoverageStatus::Covered
            };
            let future_status = FutureStatus::from(current_status);

            let marker = EpistemicMarker::uncertain_with(
                format!("Projection based on {} scenario assumptions", scenario.name),
                scenario.assumption_statements(),
                scenario.date_confidence,
            )?;

            projected_gaps.push(ProjectedGap {
                id: format!("proj-{}", requirement.id),
                requirement_id: requirement.id.clone(),
                requirement: requirement.description.clone(),
                gs1_impact: requirement.gs1_impact.clone(),
                current_status,
                future_status,
                change_description: change_description(requirement, future_status),
                related_attributes: related.iter().map(|a| a.attribute_id.clone()).collect(),
                confidence_score: marker.confidence().representative_score(),
                marker,
            });

            if future_status != FutureStatus::WillBeCovered {
                if let Some(action) = no_regret_action(requirement)? {
                    no_regret.push(action);
                }
                contingent.push(contingent_action(requirement, scenario)?);
            }
        }

        let no_regret_actions = dedup_actions(no_regret);
        let contingent_actions = dedup_actions(contingent);

        MarkerPolicy::FUTURE_STATE.enforce(&projected_gaps)?;
        MarkerPolicy::FUTURE_STATE.enforce(&no_regret_actions)?;
        MarkerPolicy::FUTURE_STATE.enforce(&contingent_actions)?;

        let affected = projected_gaps.len();
        let count = |pred: &dyn Fn(&ProjectedGap) -> bool| projected_gaps.iter().filter(|g| pred(g)).count();
        let percent = |n: usize| {
            if affected == 0 {
                0
            } else {
                ((n as f64 / affected as f64) * 100.0).round() as u32
            }
        };
        let comparison = CoverageComparison {
            affected_requirements: affected,
            current_coverage: percent(count(&|g| g.current_status == CoverageStatus::Covered)),
            projected_coverage: percent(count(&|g| g.future_status == FutureStatus::WillBeCovered)),
            new_gaps_count: count(&|g| g.future_status == FutureStatus::Gap),
        };

        let markers: Vec<EpistemicMarker> = projected_gaps
            .iter()
            .map(|g| g.marker.clone())
            .chain(no_regret_actions.iter().map(|a| a.marker.clone()))
            .chain(contingent_actions.iter().map(|a| a.marker.clone()))
            .collect();

        info!(
            scenario = %scenario.id,
            sector = %sector,
            affected,
            new_gaps = comparison.new_gaps_count,
            "Impact simulation complete"
        );

        Ok(SimulationResult {
            input: input.clone(),
            scenario_name: scenario.name.clone(),
            regulation: scenario.regulation.clone(),
            expected_date: scenario.expected_date.clone(),
            comparison,
            projected_gaps,
            no_regret_actions,
            contingent_actions,
            active_assumptions: scenario.assumptions.clone(),
            disclaimer: disclaimer(scenario),
            epistemic: EpistemicSummary::from_markers(&markers),
        })
    }
}

/// Case-insensitive keyword expansion of a GS1 impact statement.
fn extract_keywords(gs1_impact: &str) -> Vec<&'static str> {
    let text = gs1_impact.to_lowercase();
    let keywords: Vec<&'static str> = IMPACT_KEYWORDS
        .iter()
        .filter(|(trigger, _)| text.contains(trigger))
        .flat_map(|(_, words)| words.iter().copied())
        .collect();
    if keywords.is_empty() {
        FALLBACK_KEYWORDS.to_vec()
    } else {
        keywords
    }
}

fn change_description(requirement: &ScenarioRequirement, status: FutureStatus) -> String {
    match status {
        FutureStatus::WillBeCovered => "Your current GS1 coverage already addresses this requirement. \
                                        Continue maintaining your data quality."
            .to_string(),
        FutureStatus::AtRisk => format!(
            "Partial coverage exists but additional GS1 attributes are needed. {}",
            requirement.gs1_impact
        ),
        FutureStatus::Gap => format!(
            "New requirement with no current coverage. {}",
            requirement.gs1_impact
        ),
    }
}

fn no_regret_action(
    requirement: &ScenarioRequirement,
) -> Result<Option<ActionRecommendation>, ReasoningError> {
    let standards: Vec<String> = GS1_STANDARDS
        .iter()
        .filter(|(phrase, _)| requirement.gs1_impact.contains(phrase))
        .map(|(_, name)| name.to_string())
        .collect();
    if standards.is_empty() {
        return Ok(None);
    }

    let estimated_effort = match standards.len() {
        1 => Effort::Low,
        2 => Effort::Medium,
        _ => Effort::High,
    };

    Ok(Some(ActionRecommendation {
        id: format!("nr-{}", requirement.id),
        kind: ActionKind::NoRegret,
        action: format!("Implement {} foundation", standards.join(" + ")),
        description: format!(
            "Establish {} capabilities to address \"{}\". This investment provides value \
             regardless of final regulatory requirements.",
            standards.join(", "),
            requirement.description
        ),
        benefits_even_if_scenario_changes: Some(
            "Improves supply chain visibility, enables B2B data exchange, and prepares for \
             multiple regulatory requirements."
                .to_string(),
        ),
        trigger_condition: None,
        wait_until: None,
        gs1_standards: standards,
        estimated_effort,
        marker: EpistemicMarker::inference(
            "No-regret action based on GS1 standard applicability analysis",
            ConfidenceLevel::High,
        )?,
    }))
}

fn contingent_action(
    requirement: &ScenarioRequirement,
    scenario: &RegulatoryScenario,
) -> Result<ActionRecommendation, ReasoningError> {
    Ok(ActionRecommendation {
        id: format!("cont-{}", requirement.id),
        kind: ActionKind::Contingent,
        action: format!("Prepare for {}", requirement.description),
        description: format!(
            "Monitor {} developments and prepare implementation plan for \"{}\".",
            scenario.regulation, requirement.description
        ),
        benefits_even_if_scenario_changes: None,
        trigger_condition: Some(format!(
            "When {} delegated acts are published",
            scenario.regulation
        )),
        wait_until: Some(scenario.expected_date.clone()),
        gs1_standards: Vec::new(),
        estimated_effort: Effort::Medium,
        marker: EpistemicMarker::uncertain_with(
            format!("Contingent on {} materializing as expected", scenario.name),
            scenario.assumption_statements(),
            scenario.date_confidence,
        )?,
    })
}

/// Keep the first action per standard set (or per action text).
fn dedup_actions(actions: Vec<ActionRecommendation>) -> Vec<ActionRecommendation> {
    let mut seen = HashSet::new();
    actions.into_iter().filter(|a| seen.insert(a.dedup_key())).collect()
}

fn disclaimer(scenario: &RegulatoryScenario) -> String {
    format!(
        "This simulation is based on {} as of {}. Regulatory requirements may change. \
         The expected date ({}) has {} confidence. All projections involve assumptions \
         about future regulatory developments. Please monitor official sources for updates.",
        scenario.name, scenario.last_updated, scenario.expected_date, scenario.date_confidence
    )
}
