//! Regulatory scenarios the impact simulator projects against.

use crate::ReasoningError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;
use trustgate_core::epistemic::ConfidenceLevel;

const BUILTIN_SCENARIOS: &str = include_str!("../scenarios/builtin.toml");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRequirement {
    pub id: String,
    pub description: String,
    /// What the requirement means for GS1 data, in prose
    pub gs1_impact: String,
    /// Sector keys, or `all`
    pub affected_sectors: Vec<String>,
    #[serde(default = "default_mandatory")]
    pub mandatory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<String>,
}

fn default_mandatory() -> bool {
    true
}

impl ScenarioRequirement {
    pub fn affects(&self, sector: &str) -> bool {
        self.affected_sectors.iter().any(|s| s == "all" || s == sector)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioAssumption {
    pub id: String,
    pub assumption: String,
    pub rationale: String,
    pub confidence: ConfidenceLevel,
    #[serde(default)]
    pub alternatives: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulatoryScenario {
    pub id: String,
    pub name: String,
    pub description: String,
    pub regulation: String,
    /// `YYYY-MM-DD`
    pub expected_date: String,
    pub date_confidence: ConfidenceLevel,
    #[serde(default)]
    pub requirements: Vec<ScenarioRequirement>,
    #[serde(default)]
    pub assumptions: Vec<ScenarioAssumption>,
    pub source: String,
    pub last_updated: String,
}

impl RegulatoryScenario {
    pub fn validate(&self) -> Result<(), ReasoningError> {
        let invalid = |reason: &str| ReasoningError::InvalidScenario {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty"));
        }
        if self.requirements.is_empty() {
            return Err(invalid("at least one requirement is needed"));
        }
        if self.assumptions.is_empty() {
            return Err(invalid("at least one assumption is needed"));
        }
        if self.assumptions.iter().any(|a| a.assumption.trim().is_empty()) {
            return Err(invalid("assumption statements must not be blank"));
        }
        if NaiveDate::parse_from_str(&self.expected_date, "%Y-%m-%d").is_err() {
            return Err(invalid("expected_date must be YYYY-MM-DD"));
        }
        Ok(())
    }

    /// The assumption statements, in declaration order.
    pub fn assumption_statements(&self) -> Vec<String> {
        self.assumptions.iter().map(|a| a.assumption.clone()).collect()
    }

    pub fn affects(&self, sector: &str) -> bool {
        self.requirements.iter().any(|r| r.affects(sector))
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    scenarios: Vec<RegulatoryScenario>,
}

/// An ordered set of validated scenarios with unique ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioCatalog {
    scenarios: Vec<RegulatoryScenario>,
}

impl ScenarioCatalog {
    /// The curated scenarios shipped with the crate.
    pub fn builtin() -> Result<Self, ReasoningError> {
        Self::from_toml(BUILTIN_SCENARIOS)
    }

    /// Parse and validate a `[[scenarios]]` catalog.
    pub fn from_toml(content: &str) -> Result<Self, ReasoningError> {
        let file: CatalogFile = toml::from_str(content)?;
        let mut catalog = Self::default();
        for scenario in file.scenarios {
            scenario.validate()?;
            if catalog.find(&scenario.id).is_some() {
                return Err(ReasoningError::InvalidScenario {
                    id: scenario.id,
                    reason: "duplicate scenario id".into(),
                });
            }
            catalog.scenarios.push(scenario);
        }
        debug!(scenarios = catalog.len(), "Scenario catalog loaded");
        Ok(catalog)
    }

    /// Overlay `other`: scenarios with a known id replace the existing
    /// entry in place, new ones are appended.
    pub fn merge(mut self, other: ScenarioCatalog) -> Self {
        for scenario in other.scenarios {
            match self.scenarios.iter_mut().find(|s| s.id == scenario.id) {
                Some(existing) => *existing = scenario,
                None => self.scenarios.push(scenario),
            }
        }
        self
    }

    pub fn get(&self, id: &str) -> Result<&RegulatoryScenario, ReasoningError> {
        self.find(id)
            .ok_or_else(|| ReasoningError::ScenarioNotFound(id.to_string()))
    }

    fn find(&self, id: &str) -> Option<&RegulatoryScenario> {
        self.scenarios.iter().find(|s| s.id == id)
    }

    pub fn scenarios(&self) -> &[RegulatoryScenario] {
        &self.scenarios
    }

    /// Scenarios with at least one requirement touching `sector`.
    pub fn for_sector<'a>(&'a self, sector: &'a str) -> impl Iterator<Item = &'a RegulatoryScenario> {
        self.scenarios.iter().filter(move |s| s.affects(sector))
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUSTOM: &str = r#"
[[scenarios]]
id = "ppwr-2030"
name = "Packaging and Packaging Waste Regulation"
description = "Recyclability targets for packaging."
regulation = "PPWR"
expected_date = "2030-01-01"
date_confidence = "low"
source = "Regulation (EU) 2025/40"
last_updated = "2025-02-11"

[[scenarios.requirements]]
id = "ppwr-1"
description = "Recyclability grade per packaging unit"
gs1_impact = "Requires packaging material attributes in GDSN"
affected_sectors = ["all"]

[[scenarios.assumptions]]
id = "ppwr-a1"
assumption = "Grades are published per packaging category"
rationale = "Draft delegated act structure"
confidence = "low"
"#;

    #[test]
    fn builtin_catalog_has_four_scenarios() {
        let catalog = ScenarioCatalog::builtin().unwrap();
        let ids: Vec<&str> = catalog.scenarios().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["dpp-2027", "cs3d-2026", "espr-2025", "eudr-2025"]);

        let dpp = catalog.get("dpp-2027").unwrap();
        assert_eq!(dpp.date_confidence, ConfidenceLevel::Medium);
        assert_eq!(dpp.requirements.len(), 5);
        assert_eq!(dpp.assumptions.len(), 3);
        assert!(dpp.requirements.iter().all(|r| r.mandatory));
    }

    #[test]
    fn unknown_scenario_not_found() {
        let catalog = ScenarioCatalog::builtin().unwrap();
        assert!(matches!(
            catalog.get("cbam-2026"),
            Err(ReasoningError::ScenarioNotFound(id)) if id == "cbam-2026"
        ));
    }

    #[test]
    fn scenario_without_assumptions_rejected() {
        let toml = CUSTOM.split("[[scenarios.assumptions]]").next().unwrap();
        let err = ScenarioCatalog::from_toml(toml).unwrap_err();
        assert!(matches!(err, ReasoningError::InvalidScenario { ref id, .. } if id == "ppwr-2030"));
    }

    #[test]
    fn bad_date_rejected() {
        let toml = CUSTOM.replace("2030-01-01", "soon");
        assert!(matches!(
            ScenarioCatalog::from_toml(&toml),
            Err(ReasoningError::InvalidScenario { .. })
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            ScenarioCatalog::from_toml("[[scenarios]]\nid = "),
            Err(ReasoningError::Toml(_))
        ));
    }

    #[test]
    fn merge_overrides_and_appends() {
        let custom = ScenarioCatalog::from_toml(CUSTOM).unwrap();
        let mut replaced = custom.scenarios()[0].clone();
        replaced.id = "espr-2025".into();
        let overlay = ScenarioCatalog {
            scenarios: vec![replaced, custom.scenarios()[0].clone()],
        };

        let merged = ScenarioCatalog::builtin().unwrap().merge(overlay);
        assert_eq!(merged.len(), 5);
        assert_eq!(merged.scenarios()[2].regulation, "PPWR");
        assert_eq!(merged.scenarios()[4].id, "ppwr-2030");
    }

    #[test]
    fn sector_filter() {
        let catalog = ScenarioCatalog::builtin().unwrap();
        let ids: Vec<&str> = catalog.for_sector("agriculture").map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["cs3d-2026", "espr-2025", "eudr-2025"]);
    }
}
