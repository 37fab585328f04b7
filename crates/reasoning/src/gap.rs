//! Present-state gap analysis: which ESRS requirements the company's current
//! GS1 attributes leave uncovered.
//!
//! Every statement here is about the corpus as it is now, so gaps and
//! remediation paths carry fact or inference markers only. Requirements whose
//! backing source is missing from the snapshot or no longer active are
//! skipped rather than reported against stale text.

use crate::ReasoningError;
use crate::catalog::{self, CRITICAL_STANDARDS, CompanySize, Effort, HIGH_STANDARDS, MappingType};
use crate::record::{CorpusSnapshot, MarkerPolicy, ReasoningRecord};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use tracing::{debug, info};
use trustgate_core::epistemic::{ConfidenceLevel, EpistemicMarker, EpistemicSummary};
use trustgate_core::source::SourceId;

/// Remediation paths are only drafted for this many critical/high gaps.
const MAX_REMEDIATION_PATHS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapAnalysisInput {
    pub sector: String,
    #[serde(default)]
    pub company_size: CompanySize,
    /// GS1 attribute ids the company already populates
    #[serde(default)]
    pub current_attributes: Vec<String>,
}

impl GapAnalysisInput {
    pub fn new(sector: impl Into<String>) -> Self {
        Self {
            sector: sector.into(),
            company_size: CompanySize::default(),
            current_attributes: Vec::new(),
        }
    }

    pub fn with_current(mut self, attributes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.current_attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    fn covers(&self, attribute_id: &str) -> bool {
        self.current_attributes.iter().any(|a| a == attribute_id)
    }
}

/// A GS1 attribute mapped onto an ESRS requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedAttribute {
    pub attribute_id: String,
    pub attribute_name: String,
    pub mapping_type: MappingType,
    pub confidence: ConfidenceLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One ESRS datapoint and the GS1 attributes that can satisfy it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementMapping {
    pub id: i64,
    /// e.g. `ESRS E1`
    pub esrs_standard: String,
    pub esrs_topic: String,
    pub data_point_name: String,
    pub short_name: String,
    #[serde(default)]
    pub definition: String,
    /// Corpus source the requirement text comes from
    pub source_id: SourceId,
    #[serde(default)]
    pub attributes: Vec<MappedAttribute>,
}

impl RequirementMapping {
    fn lowest_confidence(attributes: &[&MappedAttribute]) -> Option<ConfidenceLevel> {
        attributes.iter().map(|a| a.confidence).min()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapType {
    MissingAttribute,
    LowConfidenceMapping,
}

/// Declared lowest first so the derived order is by urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl GapPriority {
    /// Severity used for ordering: 4 for critical down to 1 for low.
    pub fn rank(&self) -> u8 {
        match self {
            GapPriority::Low => 1,
            GapPriority::Medium => 2,
            GapPriority::High => 3,
            GapPriority::Critical => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GapPriority::Low => "low",
            GapPriority::Medium => "medium",
            GapPriority::High => "high",
            GapPriority::Critical => "critical",
        }
    }

    /// Priority from the standard and how well it is mapped.
    ///
    /// `lowest_confidence` is `None` when the requirement has no mapping.
    pub fn determine(esrs_standard: &str, lowest_confidence: Option<ConfidenceLevel>) -> Self {
        let is_critical = CRITICAL_STANDARDS.iter().any(|s| esrs_standard.starts_with(s));
        let is_high = HIGH_STANDARDS.iter().any(|s| esrs_standard.starts_with(s));

        match lowest_confidence {
            None if is_critical => GapPriority::Critical,
            None if is_high => GapPriority::High,
            None => GapPriority::Medium,
            Some(ConfidenceLevel::Low) if is_critical => GapPriority::High,
            Some(ConfidenceLevel::Low) => GapPriority::Medium,
            Some(_) => GapPriority::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceGap {
    /// `gap-{requirement_id}`
    pub id: String,
    pub requirement_id: i64,
    pub source_id: SourceId,
    pub esrs_standard: String,
    pub esrs_topic: String,
    pub requirement: String,
    pub short_name: String,
    pub definition: String,
    pub gap_type: GapType,
    pub priority: GapPriority,
    pub severity: u8,
    /// Mapped attributes the company does not have yet
    pub suggested_attributes: Vec<MappedAttribute>,
    pub explanation: String,
    pub marker: EpistemicMarker,
    pub confidence_score: f64,
}

impl ReasoningRecord for ComplianceGap {
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationStep {
    pub order: u32,
    pub action: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gs1_standard: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationPath {
    pub gap_id: String,
    pub steps: Vec<RemediationStep>,
    pub estimated_effort: Effort,
    /// Attribute ids to implement first
    pub dependencies: Vec<String>,
    pub marker: EpistemicMarker,
}

impl ReasoningRecord for RemediationPath {
    fn record_id(&self) -> &str {
        &self.gap_id
    }

    fn marker(&self) -> &EpistemicMarker {
        &self.marker
    }

    fn confidence_score(&self) -> f64 {
        self.marker.confidence().representative_score()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapSummary {
    /// Relevant requirements backed by a current source
    pub total_requirements: usize,
    pub covered_requirements: usize,
    pub partial_coverage: usize,
    pub gaps: usize,
    /// Rounded share of fully covered requirements, 0 to 100
    pub coverage_percentage: u32,
    /// Requirements skipped because their source is missing or not active
    pub skipped_stale: usize,
    /// First CSRD reporting year for the company's size class
    pub csrd_phase_in: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapAnalysisResult {
    pub input: GapAnalysisInput,
    pub summary: GapSummary,
    /// Severity descending, then requirement id ascending
    pub gaps: Vec<ComplianceGap>,
    pub remediation_paths: Vec<RemediationPath>,
    pub epistemic: EpistemicSummary,
}

impl GapAnalysisResult {
    pub fn gaps_with_priority(&self, priority: GapPriority) -> impl Iterator<Item = &ComplianceGap> {
        self.gaps.iter().filter(move |g| g.priority == priority)
    }
}

/// Compares a company's attribute coverage against requirement mappings.
pub struct GapAnalyzer {
    snapshot: CorpusSnapshot,
}

impl GapAnalyzer {
    pub fn new(snapshot: CorpusSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn analyze(
        &self,
        input: &GapAnalysisInput,
        mappings: &[RequirementMapping],
    ) -> Result<GapAnalysisResult, ReasoningError> {
        let sector = catalog::sector_key(&input.sector);
        let relevant = catalog::relevant_standards(&sector);
        let analyze_all = sector == "general";

        let mut gaps = Vec::new();
        let mut markers = Vec::new();
        let mut total = 0usize;
        let mut covered_count = 0usize;
        let mut partial_count = 0usize;
        let mut skipped_stale = 0usize;

        for mapping in mappings {
            let is_relevant = relevant.iter().any(|s| mapping.esrs_standard.starts_with(s));
            if !is_relevant && !analyze_all {
                continue;
            }

            let Some(source) = self.snapshot.get(mapping.source_id).filter(|s| s.is_active()) else {
                debug!(
                    requirement_id = mapping.id,
                    source_id = mapping.source_id,
                    "Skipping requirement backed by a missing or stale source"
                );
                skipped_stale += 1;
                continue;
            };
            total += 1;

            let all: Vec<&MappedAttribute> = mapping.attributes.iter().collect();
            let covered: Vec<&MappedAttribute> =
                all.iter().copied().filter(|a| input.covers(&a.attribute_id)).collect();

            if all.is_empty() {
                let marker = EpistemicMarker::fact_for_source(
                    format!(
                        "No GS1-ESRS mapping exists for {} {}",
                        mapping.esrs_standard, mapping.short_name
                    ),
                    source,
                )?;
                gaps.push(build_gap(mapping, GapType::MissingAttribute, &covered, marker)?);
            } else if covered.is_empty() {
                gaps.push(build_gap(
                    mapping,
                    GapType::MissingAttribute,
                    &covered,
                    inferred_marker(&all)?,
                )?);
            } else if covered.len() < all.len() {
                partial_count += 1;
                if RequirementMapping::lowest_confidence(&covered) == Some(ConfidenceLevel::Low) {
                    gaps.push(build_gap(
                        mapping,
                        GapType::LowConfidenceMapping,
                        &covered,
                        inferred_marker(&all)?,
                    )?);
                }
            } else {
                covered_count += 1;
                markers.push(EpistemicMarker::fact_for_source(
                    format!("Covered by {} GS1 attributes", covered.len()),
                    source,
                )?);
            }
        }

        gaps.sort_by_key(|g| (Reverse(g.severity), g.requirement_id));
        markers.extend(gaps.iter().map(|g| g.marker.clone()));

        let remediation_paths = gaps
            .iter()
            .filter(|g| g.priority >= GapPriority::High)
            .take(MAX_REMEDIATION_PATHS)
            .map(remediation_path)
            .collect::<Result<Vec<_>, _>>()?;

        MarkerPolicy::PRESENT_STATE.enforce(&gaps)?;
        MarkerPolicy::PRESENT_STATE.enforce(&remediation_paths)?;

        let coverage_percentage = if total > 0 {
            ((covered_count as f64 / total as f64) * 100.0).round() as u32
        } else {
            0
        };

        info!(
            sector = %sector,
            requirements = total,
            gaps = gaps.len(),
            skipped_stale,
            "Gap analysis complete"
        );

        Ok(GapAnalysisResult {
            input: input.clone(),
            summary: GapSummary {
                total_requirements: total,
                covered_requirements: covered_count,
                partial_coverage: partial_count,
                gaps: gaps.len(),
                coverage_percentage,
                skipped_stale,
                csrd_phase_in: input.company_size.thresholds().csrd_phase_in,
            },
            gaps,
            remediation_paths,
            epistemic: EpistemicSummary::from_markers(&markers),
        })
    }
}

fn inferred_marker(all: &[&MappedAttribute]) -> Result<EpistemicMarker, ReasoningError> {
    let confidence = RequirementMapping::lowest_confidence(all).unwrap_or(ConfidenceLevel::Medium);
    Ok(EpistemicMarker::inference(
        format!(
            "Gap inferred from coverage analysis against {} mapped attributes",
            all.len()
        ),
        confidence,
    )?)
}

fn build_gap(
    mapping: &RequirementMapping,
    gap_type: GapType,
    covered: &[&MappedAttribute],
    marker: EpistemicMarker,
) -> Result<ComplianceGap, ReasoningError> {
    let suggested: Vec<MappedAttribute> = mapping
        .attributes
        .iter()
        .filter(|a| !covered.iter().any(|c| c.attribute_id == a.attribute_id))
        .cloned()
        .collect();

    let all: Vec<&MappedAttribute> = mapping.attributes.iter().collect();
    let priority = GapPriority::determine(
        &mapping.esrs_standard,
        RequirementMapping::lowest_confidence(&all),
    );

    Ok(ComplianceGap {
        id: format!("gap-{}", mapping.id),
        requirement_id: mapping.id,
        source_id: mapping.source_id,
        esrs_standard: mapping.esrs_standard.clone(),
        esrs_topic: mapping.esrs_topic.clone(),
        requirement: mapping.data_point_name.clone(),
        short_name: mapping.short_name.clone(),
        definition: mapping.definition.clone(),
        gap_type,
        priority,
        severity: priority.rank(),
        explanation: explain(gap_type, mapping, &suggested),
        suggested_attributes: suggested,
        confidence_score: marker.confidence().representative_score(),
        marker,
    })
}

fn explain(gap_type: GapType, mapping: &RequirementMapping, suggested: &[MappedAttribute]) -> String {
    match gap_type {
        GapType::MissingAttribute => {
            let advice = if suggested.is_empty() {
                "This requirement may need custom data collection outside standard GS1 attributes."
                    .to_string()
            } else {
                let names: Vec<&str> = suggested.iter().map(|a| a.attribute_name.as_str()).collect();
                format!("Consider implementing: {}.", names.join(", "))
            };
            format!(
                "No GS1 attributes in your current coverage map to {} requirement \"{}\". {advice}",
                mapping.esrs_standard, mapping.short_name
            )
        }
        GapType::LowConfidenceMapping => format!(
            "While there are GS1 attributes that may satisfy {} requirement \"{}\", \
             the mapping confidence is low. Manual verification is recommended.",
            mapping.esrs_standard, mapping.short_name
        ),
    }
}

fn remediation_path(gap: &ComplianceGap) -> Result<RemediationPath, ReasoningError> {
    let mut steps = Vec::new();
    let mut push = |action: &str, description: String, gs1: Option<&str>, duration: Option<&str>| {
        steps.push(RemediationStep {
            order: steps.len() as u32 + 1,
            action: action.to_string(),
            description,
            gs1_standard: gs1.map(str::to_string),
            estimated_duration: duration.map(str::to_string),
        });
    };

    push(
        "Assess Data Availability",
        format!(
            "Review your current product data to identify if {} \"{}\" data exists in any form.",
            gap.esrs_standard, gap.short_name
        ),
        None,
        None,
    );

    if let Some(primary) = gap.suggested_attributes.first() {
        push(
            "Implement GS1 Attribute",
            format!(
                "Add {} ({}) to your product data model.",
                primary.attribute_name, primary.attribute_id
            ),
            Some("GDSN"),
            Some("2-4 weeks"),
        );
        if primary.mapping_type.is_derived() {
            let kind = match primary.mapping_type {
                MappingType::Aggregated => "aggregated",
                _ => "calculated",
            };
            push(
                "Configure Calculation Logic",
                format!(
                    "Set up {kind} logic to derive {} from source data.",
                    primary.attribute_name
                ),
                None,
                Some("1-2 weeks"),
            );
        }
    }

    push(
        "Validate Compliance",
        format!(
            "Verify that the implemented data satisfies {} requirement \"{}\".",
            gap.esrs_standard, gap.short_name
        ),
        None,
        Some("1 week"),
    );

    let estimated_effort = match gap.suggested_attributes.len() {
        0 => Effort::High,
        1..=2 => Effort::Low,
        _ => Effort::Medium,
    };

    Ok(RemediationPath {
        gap_id: gap.id.clone(),
        steps,
        estimated_effort,
        dependencies: gap.suggested_attributes.iter().map(|a| a.attribute_id.clone()).collect(),
        marker: EpistemicMarker::inference(
            format!(
                "Remediation path generated based on {} suggested attributes",
                gap.suggested_attributes.len()
            ),
            ConfidenceLevel::Medium,
        )?,
    })
}
