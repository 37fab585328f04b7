//! Built-in reference tables: GS1 attribute catalog, sector relevance and
//! CSRD company-size thresholds.
//!
//! Sector keys are snake_case (`food_beverage`, `textiles`, ...). Use
//! [`sector_key`] to normalise free-form sector names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How an attribute maps onto an ESRS datapoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingType {
    Direct,
    Calculated,
    Aggregated,
}

impl MappingType {
    /// Needs calculation logic on top of raw attribute data.
    pub fn is_derived(&self) -> bool {
        !matches!(self, MappingType::Direct)
    }
}

/// Implementation effort, ordered cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effort {
    Low,
    Medium,
    High,
}

impl Effort {
    pub fn weight(&self) -> u32 {
        match self {
            Effort::Low => 1,
            Effort::Medium => 2,
            Effort::High => 3,
        }
    }

    /// Band an average of [`weight`](Self::weight)s.
    pub fn from_average(avg: f64) -> Self {
        if avg >= 2.5 {
            Effort::High
        } else if avg >= 1.5 {
            Effort::Medium
        } else {
            Effort::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Effort::Low => "low",
            Effort::Medium => "medium",
            Effort::High => "high",
        }
    }
}

impl fmt::Display for Effort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CSRD size class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanySize {
    #[default]
    Large,
    Sme,
    Micro,
}

/// Upper bounds of a size class plus the first CSRD reporting year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeThresholds {
    pub employees: u32,
    pub turnover_eur: u64,
    pub balance_sheet_eur: u64,
    pub csrd_phase_in: Option<u16>,
}

impl CompanySize {
    pub fn thresholds(&self) -> SizeThresholds {
        match self {
            CompanySize::Large => SizeThresholds {
                employees: 250,
                turnover_eur: 50_000_000,
                balance_sheet_eur: 25_000_000,
                csrd_phase_in: Some(2024),
            },
            CompanySize::Sme => SizeThresholds {
                employees: 50,
                turnover_eur: 10_000_000,
                balance_sheet_eur: 5_000_000,
                csrd_phase_in: Some(2026),
            },
            CompanySize::Micro => SizeThresholds {
                employees: 10,
                turnover_eur: 700_000,
                balance_sheet_eur: 350_000,
                csrd_phase_in: None,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompanySize::Large => "large",
            CompanySize::Sme => "sme",
            CompanySize::Micro => "micro",
        }
    }
}

impl fmt::Display for CompanySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CompanySize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "large" => Ok(CompanySize::Large),
            "sme" | "medium" | "small" => Ok(CompanySize::Sme),
            "micro" => Ok(CompanySize::Micro),
            other => Err(format!("unknown company size: {other}")),
        }
    }
}

/// One GS1 attribute in the built-in catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttributeInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub code: &'static str,
    pub data_type: &'static str,
    pub esrs_datapoints: &'static [&'static str],
    pub regulations: &'static [&'static str],
    pub effort: Effort,
    pub xml_snippet: &'static str,
}

impl AttributeInfo {
    pub fn supports(&self, regulation: &str) -> bool {
        self.regulations.iter().any(|r| r.eq_ignore_ascii_case(regulation))
    }
}

macro_rules! attribute {
    ($id:literal, $name:literal, $code:literal, $ty:literal, [$($dp:literal),*], [$($reg:literal),*], $effort:ident, $xml:literal) => {
        AttributeInfo {
            id: $id,
            name: $name,
            code: $code,
            data_type: $ty,
            esrs_datapoints: &[$($dp),*],
            regulations: &[$($reg),*],
            effort: Effort::$effort,
            xml_snippet: $xml,
        }
    };
}

pub const ATTRIBUTE_CATALOG: &[AttributeInfo] = &[
    attribute!("productCarbonFootprint", "Product Carbon Footprint", "PCF", "Measurement",
        ["E1-3", "E1-4", "E1-6"], ["CSRD", "DPP", "ESPR"], High,
        r#"<productCarbonFootprint measurementUnitCode="KGM">2.5</productCarbonFootprint>"#),
    attribute!("waterFootprint", "Water Footprint", "WF", "Measurement",
        ["E3-1", "E3-4"], ["CSRD", "ESPR"], Medium,
        r#"<waterFootprint measurementUnitCode="LTR">150</waterFootprint>"#),
    attribute!("recycledContentPercentage", "Recycled Content Percentage", "RCP", "Percentage",
        ["E5-2", "E5-5"], ["CSRD", "DPP", "ESPR"], Low,
        "<recycledContentPercentage>25</recycledContentPercentage>"),
    attribute!("organicCertification", "Organic Certification", "OC", "Code",
        ["E4-2"], ["EUDR", "CSRD"], Medium,
        "<organicCertification>EU_ORGANIC</organicCertification>"),
    attribute!("countryOfOrigin", "Country of Origin", "COO", "Code",
        ["S2-1", "S2-4"], ["CSRD", "CS3D", "EUDR"], Low,
        "<countryOfOrigin>NL</countryOfOrigin>"),
    attribute!("packagingMaterial", "Packaging Material", "PM", "Code",
        ["E5-3", "E5-6"], ["CSRD", "DPP", "PPWR"], Low,
        "<packagingMaterial>RECYCLABLE_CARDBOARD</packagingMaterial>"),
    attribute!("energyEfficiencyClass", "Energy Efficiency Class", "EEC", "Code",
        ["E1-5"], ["ESPR", "DPP"], Low,
        "<energyEfficiencyClass>A</energyEfficiencyClass>"),
    attribute!("repairabilityScore", "Repairability Score", "RS", "Number",
        ["E5-4"], ["DPP", "ESPR"], Medium,
        "<repairabilityScore>7.5</repairabilityScore>"),
    attribute!("durabilityScore", "Durability Score", "DS", "Number",
        ["E5-4"], ["DPP", "ESPR"], Medium,
        "<durabilityScore>8.0</durabilityScore>"),
    attribute!("hazardousSubstances", "Hazardous Substances", "HS", "List",
        ["E2-4", "E2-5"], ["CSRD", "REACH", "DPP"], High,
        r#"<hazardousSubstances><substance code="NONE"/></hazardousSubstances>"#),
    attribute!("supplierInformation", "Supplier Information", "SI", "Complex",
        ["S2-1", "S2-2", "G1-4"], ["CSRD", "CS3D", "EUDR"], High,
        "<supplierInformation><gln>1234567890123</gln></supplierInformation>"),
    attribute!("nutritionalInformation", "Nutritional Information", "NI", "Complex",
        ["S4-1"], ["FIC"], Low,
        "<nutritionalInformation><energyKJ>1200</energyKJ></nutritionalInformation>"),
    attribute!("allergenInformation", "Allergen Information", "AI", "List",
        ["S4-1"], ["FIC"], Low,
        r#"<allergenInformation><allergen code="GLUTEN" containmentLevel="CONTAINS"/></allergenInformation>"#),
    attribute!("shelfLife", "Shelf Life", "SL", "Duration",
        ["E5-4"], ["FIC"], Low,
        "<shelfLife>P365D</shelfLife>"),
    attribute!("storageConditions", "Storage Conditions", "SC", "Code",
        ["S4-1"], ["FIC"], Low,
        "<storageConditions>REFRIGERATED</storageConditions>"),
    attribute!("energyConsumption", "Energy Consumption", "EC", "Measurement",
        ["E1-5"], ["CSRD", "ESPR"], Medium,
        r#"<energyConsumption measurementUnitCode="KWH">150</energyConsumption>"#),
    attribute!("waterUsage", "Water Usage", "WU", "Measurement",
        ["E3-4"], ["CSRD"], Medium,
        r#"<waterUsage measurementUnitCode="LTR">500</waterUsage>"#),
    attribute!("wasteGenerated", "Waste Generated", "WG", "Measurement",
        ["E5-5"], ["CSRD"], Medium,
        r#"<wasteGenerated measurementUnitCode="KGM">0.5</wasteGenerated>"#),
    attribute!("batteryInformation", "Battery Information", "BI", "Complex",
        ["E5-3"], ["DPP", "BATTERY_REG"], Medium,
        "<batteryInformation><type>LITHIUM_ION</type><capacity>5000</capacity></batteryInformation>"),
    attribute!("endOfLifeInstructions", "End of Life Instructions", "EOL", "Text",
        ["E5-6"], ["DPP", "WEEE"], Low,
        "<endOfLifeInstructions>Return to authorized recycling center</endOfLifeInstructions>"),
    attribute!("warrantyInformation", "Warranty Information", "WI", "Complex",
        ["S4-2"], ["CONSUMER_RIGHTS"], Low,
        "<warrantyInformation><duration>P2Y</duration></warrantyInformation>"),
    attribute!("materialComposition", "Material Composition", "MC", "List",
        ["E5-2"], ["DPP", "TEXTILE_REG"], Medium,
        r#"<materialComposition><material percentage="60">COTTON</material></materialComposition>"#),
    attribute!("careInstructions", "Care Instructions", "CI", "List",
        ["E5-4"], ["TEXTILE_REG"], Low,
        r#"<careInstructions><instruction code="WASH_40"/></careInstructions>"#),
    attribute!("sterilizationMethod", "Sterilization Method", "SM", "Code",
        ["S4-1"], ["MDR"], Low,
        "<sterilizationMethod>GAMMA_IRRADIATION</sterilizationMethod>"),
    attribute!("expirationDate", "Expiration Date", "ED", "Date",
        ["S4-1"], ["MDR", "FIC"], Low,
        "<expirationDate>2026-12-31</expirationDate>"),
    attribute!("pesticideUsage", "Pesticide Usage", "PU", "List",
        ["E2-4", "E4-3"], ["EUDR", "CSRD"], High,
        r#"<pesticideUsage><pesticide code="NONE"/></pesticideUsage>"#),
    attribute!("harvestDate", "Harvest Date", "HD", "Date",
        ["E4-2"], ["EUDR"], Low,
        "<harvestDate>2025-09-15</harvestDate>"),
    attribute!("soilHealthIndicators", "Soil Health Indicators", "SHI", "Complex",
        ["E4-4"], ["CSRD"], High,
        "<soilHealthIndicators><organicMatter>3.5</organicMatter></soilHealthIndicators>"),
];

pub fn attribute(id: &str) -> Option<&'static AttributeInfo> {
    ATTRIBUTE_CATALOG.iter().find(|a| a.id == id)
}

/// Attributes most relevant to each sector.
pub const SECTOR_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("food_beverage", &[
        "productCarbonFootprint", "waterFootprint", "organicCertification",
        "nutritionalInformation", "allergenInformation", "countryOfOrigin",
        "packagingMaterial", "recycledContentPercentage", "shelfLife", "storageConditions",
    ]),
    ("retail", &[
        "productCarbonFootprint", "recycledContentPercentage", "packagingMaterial",
        "countryOfOrigin", "supplierInformation", "durabilityScore", "repairabilityScore",
        "energyEfficiencyClass",
    ]),
    ("manufacturing", &[
        "productCarbonFootprint", "energyConsumption", "waterUsage", "wasteGenerated",
        "recycledContentPercentage", "hazardousSubstances", "supplierInformation",
        "countryOfOrigin",
    ]),
    ("electronics", &[
        "productCarbonFootprint", "energyEfficiencyClass", "repairabilityScore",
        "recycledContentPercentage", "hazardousSubstances", "batteryInformation",
        "endOfLifeInstructions", "warrantyInformation",
    ]),
    ("textiles", &[
        "productCarbonFootprint", "waterFootprint", "recycledContentPercentage",
        "organicCertification", "countryOfOrigin", "materialComposition", "careInstructions",
        "durabilityScore",
    ]),
    ("healthcare", &[
        "productCarbonFootprint", "sterilizationMethod", "expirationDate", "storageConditions",
        "hazardousSubstances", "countryOfOrigin", "supplierInformation",
    ]),
    ("agriculture", &[
        "productCarbonFootprint", "waterFootprint", "organicCertification", "pesticideUsage",
        "countryOfOrigin", "harvestDate", "soilHealthIndicators",
    ]),
];

pub fn sector_attributes(sector: &str) -> Option<&'static [&'static str]> {
    SECTOR_ATTRIBUTES.iter().find(|(s, _)| *s == sector).map(|(_, attrs)| *attrs)
}

/// ESRS standards relevant to each sector.
pub const SECTOR_ESRS_RELEVANCE: &[(&str, &[&str])] = &[
    ("food_beverage", &["ESRS E1", "ESRS E2", "ESRS E3", "ESRS E4", "ESRS E5", "ESRS S1", "ESRS S2"]),
    ("retail", &["ESRS E1", "ESRS E5", "ESRS S1", "ESRS S2", "ESRS S4"]),
    ("healthcare", &["ESRS E1", "ESRS E2", "ESRS E5", "ESRS S1", "ESRS S3"]),
    ("manufacturing", &["ESRS E1", "ESRS E2", "ESRS E3", "ESRS E5", "ESRS S1"]),
    ("logistics", &["ESRS E1", "ESRS E4", "ESRS S1", "ESRS S2"]),
    ("construction", &["ESRS E1", "ESRS E2", "ESRS E3", "ESRS E5", "ESRS S1"]),
    ("agriculture", &["ESRS E1", "ESRS E2", "ESRS E3", "ESRS E4", "ESRS E5", "ESRS S1"]),
    ("textiles", &["ESRS E1", "ESRS E2", "ESRS E3", "ESRS E5", "ESRS S1", "ESRS S2"]),
    ("electronics", &["ESRS E1", "ESRS E2", "ESRS E5", "ESRS S1", "ESRS S2"]),
    ("chemicals", &["ESRS E1", "ESRS E2", "ESRS E3", "ESRS E4", "ESRS S1"]),
    ("general", &["ESRS E1", "ESRS E5", "ESRS S1", "ESRS G1"]),
];

/// Relevant standards for a sector, falling back to `general`.
pub fn relevant_standards(sector: &str) -> &'static [&'static str] {
    SECTOR_ESRS_RELEVANCE
        .iter()
        .find(|(s, _)| *s == sector)
        .or_else(|| SECTOR_ESRS_RELEVANCE.iter().find(|(s, _)| *s == "general"))
        .map(|(_, standards)| *standards)
        .unwrap_or(&[])
}

pub const CRITICAL_STANDARDS: &[&str] = &["ESRS E1", "ESRS E5", "ESRS S1"];
pub const HIGH_STANDARDS: &[&str] = &["ESRS E2", "ESRS E3", "ESRS E4", "ESRS G1"];

/// `"Food & Beverage"` -> `"food_beverage"`.
pub fn sector_key(sector: &str) -> String {
    let mut key = String::with_capacity(sector.len());
    for c in sector.trim().chars() {
        if c.is_ascii_alphanumeric() {
            key.push(c.to_ascii_lowercase());
        } else if !key.is_empty() && !key.ends_with('_') {
            key.push('_');
        }
    }
    while key.ends_with('_') {
        key.pop();
    }
    key
}
