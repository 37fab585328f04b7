//! Ranked GS1 attribute recommendations for a sector and target regulations.

use crate::ReasoningError;
use crate::catalog::{self, ATTRIBUTE_CATALOG, AttributeInfo, Effort};
use crate::record::{MarkerPolicy, ReasoningRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;
use trustgate_core::epistemic::{ConfidenceLevel, EpistemicMarker, EpistemicSummary};

pub const MAX_RECOMMENDATIONS: usize = 20;

/// Assumption recorded on low-confidence recommendations.
const GENERAL_PRACTICE_ASSUMPTION: &str = "relevance assumed from general practice";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationInput {
    pub sector: String,
    /// Regulation codes such as `CSRD`, `DPP`, `EUDR`
    #[serde(default)]
    pub target_regulations: Vec<String>,
    #[serde(default)]
    pub current_attributes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegulatoryRelevance {
    pub regulation: String,
    pub requirement: String,
    pub mapping_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRecommendation {
    pub attribute_id: String,
    pub attribute_name: String,
    pub attribute_code: String,
    pub data_type: String,
    pub confidence_score: f64,
    pub confidence_level: ConfidenceLevel,
    /// 1-based position in the ranking
    pub priority_rank: usize,
    pub regulatory_relevance: Vec<RegulatoryRelevance>,
    pub esrs_datapoints: Vec<String>,
    pub implementation_note: String,
    pub gdsn_xml_snippet: String,
    pub estimated_effort: Effort,
    pub rationale: String,
    pub marker: EpistemicMarker,
}

impl ReasoningRecord for AttributeRecommendation {
    fn record_id(&self) -> &str {
        &self.attribute_id
    }

    fn marker(&self) -> &EpistemicMarker {
        &self.marker
    }

    fn confidence_score(&self) -> f64 {
        self.confidence_score
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSummary {
    pub total: usize,
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
    /// Sorted, distinct
    pub regulations_covered: Vec<String>,
    /// `None` when nothing was recommended
    pub average_effort: Option<Effort>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub input: RecommendationInput,
    pub recommendations: Vec<AttributeRecommendation>,
    pub summary: RecommendationSummary,
    pub epistemic: EpistemicSummary,
}

/// Scores catalog attributes against a sector and regulation targets.
#[derive(Debug, Clone, Default)]
pub struct AttributeRecommender;

impl AttributeRecommender {
    pub fn new() -> Self {
        Self
    }

    pub fn recommend(&self, input: &RecommendationInput) -> Result<RecommendationResult, ReasoningError> {
        let sector = catalog::sector_key(&input.sector);
        let sector_list = catalog::sector_attributes(&sector);

        let candidates: Vec<&'static AttributeInfo> = match sector_list {
            Some(ids) => ids.iter().filter_map(|id| catalog::attribute(id)).collect(),
            None => ATTRIBUTE_CATALOG.iter().collect(),
        };

        let mut recommendations = candidates
            .into_iter()
            .filter(|a| !input.current_attributes.iter().any(|c| c == a.id))
            .map(|a| score(a, &sector, sector_list, &input.target_regulations))
            .collect::<Result<Vec<_>, _>>()?;

        recommendations.sort_by(|a, b| {
            b.confidence_score
                .total_cmp(&a.confidence_score)
                .then_with(|| a.attribute_id.cmp(&b.attribute_id))
        });
        recommendations.truncate(MAX_RECOMMENDATIONS);
        for (i, rec) in recommendations.iter_mut().enumerate() {
            rec.priority_rank = i + 1;
        }

        MarkerPolicy::RECOMMENDATION.enforce(&recommendations)?;

        let summary = summarize(&recommendations);
        let markers: Vec<EpistemicMarker> = recommendations.iter().map(|r| r.marker.clone()).collect();

        info!(
            sector = %sector,
            recommendations = summary.total,
            high = summary.high_confidence,
            "Attribute recommendations generated"
        );

        Ok(RecommendationResult {
            input: input.clone(),
            recommendations,
            summary,
            epistemic: EpistemicSummary::from_markers(&markers),
        })
    }
}

fn score(
    attr: &AttributeInfo,
    sector: &str,
    sector_list: Option<&[&str]>,
    targets: &[String],
) -> Result<AttributeRecommendation, ReasoningError> {
    let in_sector = sector_list.is_some_and(|ids| ids.contains(&attr.id));
    let matching: Vec<&String> = targets.iter().filter(|t| attr.supports(t)).collect();
    let broad_coverage = attr.esrs_datapoints.len() > 2;

    // Tenths keep the band thresholds exact.
    let tenths = 5 + 2 * u32::from(in_sector) + matching.len() as u32 + u32::from(broad_coverage);
    let confidence_score = f64::from(tenths.min(10)) / 10.0;
    let confidence_level = ConfidenceLevel::from_score(confidence_score);

    let datapoints = attr.esrs_datapoints.join(", ");
    let marker = match confidence_level {
        ConfidenceLevel::High => EpistemicMarker::inference(
            format!("Catalog mapping to ESRS datapoints {datapoints}"),
            ConfidenceLevel::High,
        )?,
        ConfidenceLevel::Medium => {
            EpistemicMarker::inference(format!("Sector analysis for {sector}"), ConfidenceLevel::Medium)?
        }
        ConfidenceLevel::Low => EpistemicMarker::uncertain(
            "General sustainability reporting practice",
            vec![GENERAL_PRACTICE_ASSUMPTION.to_string()],
        )?,
    };

    let mut parts = Vec::new();
    if in_sector {
        parts.push(format!("highly relevant for {sector} sector"));
    }
    if !matching.is_empty() {
        let regs: Vec<&str> = matching.iter().map(|s| s.as_str()).collect();
        parts.push(format!("supports {} compliance", regs.join(", ")));
    }
    let first_three: Vec<&str> = attr.esrs_datapoints.iter().take(3).copied().collect();
    parts.push(format!("maps to ESRS datapoints {}", first_three.join(", ")));

    Ok(AttributeRecommendation {
        attribute_id: attr.id.to_string(),
        attribute_name: attr.name.to_string(),
        attribute_code: attr.code.to_string(),
        data_type: attr.data_type.to_string(),
        confidence_score,
        confidence_level,
        priority_rank: 0,
        regulatory_relevance: matching
            .iter()
            .map(|reg| RegulatoryRelevance {
                regulation: reg.to_string(),
                requirement: format!("{reg} sustainability disclosure"),
                mapping_type: "direct".to_string(),
            })
            .collect(),
        esrs_datapoints: attr.esrs_datapoints.iter().map(|s| s.to_string()).collect(),
        implementation_note: format!("Implement {} data collection and reporting.", attr.name),
        gdsn_xml_snippet: attr.xml_snippet.to_string(),
        estimated_effort: attr.effort,
        rationale: format!("Recommended because it is {}.", parts.join("; ")),
        marker,
    })
}

fn summarize(recommendations: &[AttributeRecommendation]) -> RecommendationSummary {
    let level_count = |level: ConfidenceLevel| recommendations.iter().filter(|r| r.confidence_level == level).count();

    let regulations_covered: BTreeSet<String> = recommendations
        .iter()
        .flat_map(|r| r.regulatory_relevance.iter().map(|rr| rr.regulation.clone()))
        .collect();

    let average_effort = if recommendations.is_empty() {
        None
    } else {
        let total: u32 = recommendations.iter().map(|r| r.estimated_effort.weight()).sum();
        Some(Effort::from_average(f64::from(total) / recommendations.len() as f64))
    };

    RecommendationSummary {
        total: recommendations.len(),
        high_confidence: level_count(ConfidenceLevel::High),
        medium_confidence: level_count(ConfidenceLevel::Medium),
        low_confidence: level_count(ConfidenceLevel::Low),
        regulations_covered: regulations_covered.into_iter().collect(),
        average_effort,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use trustgate_core::epistemic::EpistemicStatus;

    fn input(sector: &str, regs: &[&str], current: &[&str]) -> RecommendationInput {
        RecommendationInput {
            sector: sector.into(),
            target_regulations: regs.iter().map(|s| s.to_string()).collect(),
            current_attributes: current.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn sector_attributes_rank_by_score() {
        let result = AttributeRecommender::new()
            .recommend(&input("food_beverage", &["CSRD", "DPP"], &[]))
            .unwrap();

        assert_eq!(result.recommendations.len(), 10);
        let top = &result.recommendations[0];
        // 0.5 + 0.2 sector + 0.2 regs + 0.1 datapoints, capped
        assert_eq!(top.attribute_id, "productCarbonFootprint");
        assert_eq!(top.confidence_score, 1.0);
        assert_eq!(top.priority_rank, 1);
        assert_eq!(top.regulatory_relevance.len(), 2);
        assert!(top.rationale.starts_with("Recommended because it is highly relevant for food_beverage sector"));

        // packagingMaterial and recycledContentPercentage both score 0.9; id breaks the tie
        assert_eq!(result.recommendations[1].attribute_id, "packagingMaterial");
        assert_eq!(result.recommendations[2].attribute_id, "recycledContentPercentage");
    }

    #[test]
    fn current_attributes_excluded() {
        let result = AttributeRecommender::new()
            .recommend(&input("retail", &[], &["productCarbonFootprint", "countryOfOrigin"]))
            .unwrap();
        assert_eq!(result.recommendations.len(), 6);
        assert!(result.recommendations.iter().all(|r| r.attribute_id != "productCarbonFootprint"));
    }

    #[test]
    fn unknown_sector_uses_whole_catalog() {
        let result = AttributeRecommender::new().recommend(&input("aerospace", &[], &[])).unwrap();
        assert_eq!(result.recommendations.len(), MAX_RECOMMENDATIONS);
        // no sector bonus: only broad datapoint coverage lifts above 0.5
        assert_eq!(result.recommendations[0].confidence_score, 0.6);
        assert_eq!(result.summary.high_confidence, 0);
        assert!(result.recommendations.iter().all(|r| r.marker.status() == EpistemicStatus::Inference));
    }

    #[test]
    fn markers_follow_level() {
        let result = AttributeRecommender::new()
            .recommend(&input("electronics", &["DPP"], &[]))
            .unwrap();
        for rec in &result.recommendations {
            assert!(!rec.implementation_note.is_empty());
            assert_eq!(rec.marker.confidence(), rec.confidence_level);
            assert_ne!(rec.marker.status(), EpistemicStatus::Fact);
        }
        assert!(result.summary.regulations_covered.contains(&"DPP".to_string()));
        assert!(result.summary.average_effort.is_some());
    }

    #[test]
    fn everything_current_gives_empty_result() {
        let all: Vec<&str> = catalog::sector_attributes("healthcare").unwrap().to_vec();
        let result = AttributeRecommender::new().recommend(&input("healthcare", &[], &all)).unwrap();
        assert!(result.recommendations.is_empty());
        assert_eq!(result.summary.average_effort, None);
        assert!(result.epistemic.overall.is_none());
    }

    fn arb_input() -> impl Strategy<Value = RecommendationInput> {
        let sectors = prop_oneof![
            Just("food_beverage"),
            Just("retail"),
            Just("electronics"),
            Just("agriculture"),
            Just("unknown"),
        ];
        let regs = proptest::sample::subsequence(vec!["CSRD", "DPP", "ESPR", "EUDR", "CS3D", "FIC"], 0..6);
        let current = proptest::sample::subsequence(
            ATTRIBUTE_CATALOG.iter().map(|a| a.id).collect::<Vec<_>>(),
            0..8,
        );
        (sectors, regs, current).prop_map(|(s, r, c)| input(s, &r, &c))
    }

    proptest! {
        #[test]
        fn ranking_is_well_formed(input in arb_input()) {
            let result = AttributeRecommender::new().recommend(&input).unwrap();
            let recs = &result.recommendations;
            prop_assert!(recs.len() <= MAX_RECOMMENDATIONS);
            for (i, rec) in recs.iter().enumerate() {
                prop_assert_eq!(rec.priority_rank, i + 1);
                prop_assert!(rec.confidence_score <= 1.0);
                prop_assert!(!input.current_attributes.contains(&rec.attribute_id));
            }
            for pair in recs.windows(2) {
                prop_assert!(pair[0].confidence_score >= pair[1].confidence_score);
            }
        }
    }
}
