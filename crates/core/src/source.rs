//! Versioned knowledge documents and their authority model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CorpusError;

/// Store-assigned identifier for a [`Source`].
pub type SourceId = i64;

/// What kind of document a source is. Drives the default authority level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    EuRegulation,
    EuDirective,
    Gs1Standard,
    Gs1Datamodel,
    EfragGuidance,
    OfficialGuidance,
    IndustryStandard,
    IndustryReport,
    NewsArticle,
    Community,
}

impl SourceType {
    pub const ALL: [SourceType; 10] = [
        SourceType::EuRegulation,
        SourceType::EuDirective,
        SourceType::Gs1Standard,
        SourceType::Gs1Datamodel,
        SourceType::EfragGuidance,
        SourceType::OfficialGuidance,
        SourceType::IndustryStandard,
        SourceType::IndustryReport,
        SourceType::NewsArticle,
        SourceType::Community,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::EuRegulation => "eu_regulation",
            SourceType::EuDirective => "eu_directive",
            SourceType::Gs1Standard => "gs1_standard",
            SourceType::Gs1Datamodel => "gs1_datamodel",
            SourceType::EfragGuidance => "efrag_guidance",
            SourceType::OfficialGuidance => "official_guidance",
            SourceType::IndustryStandard => "industry_standard",
            SourceType::IndustryReport => "industry_report",
            SourceType::NewsArticle => "news_article",
            SourceType::Community => "community",
        }
    }

    /// Authority assigned when ingestion does not specify one.
    pub fn default_authority(&self) -> AuthorityLevel {
        match self {
            SourceType::EuRegulation | SourceType::EuDirective => AuthorityLevel::Official,
            SourceType::Gs1Standard | SourceType::EfragGuidance => AuthorityLevel::Verified,
            SourceType::Gs1Datamodel | SourceType::OfficialGuidance => AuthorityLevel::Guidance,
            SourceType::IndustryStandard | SourceType::IndustryReport => AuthorityLevel::Industry,
            SourceType::NewsArticle | SourceType::Community => AuthorityLevel::Community,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = CorpusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CorpusError::Validation(format!("unknown source type: {s}")))
    }
}

/// Ordinal trustworthiness of a source.
///
/// Variants are declared weakest first so the derived `Ord` gives
/// `Official > Verified > Guidance > Industry > Community`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityLevel {
    Community,
    Industry,
    Guidance,
    Verified,
    Official,
}

impl AuthorityLevel {
    /// Strongest first.
    pub const ALL: [AuthorityLevel; 5] = [
        AuthorityLevel::Official,
        AuthorityLevel::Verified,
        AuthorityLevel::Guidance,
        AuthorityLevel::Industry,
        AuthorityLevel::Community,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorityLevel::Official => "official",
            AuthorityLevel::Verified => "verified",
            AuthorityLevel::Guidance => "guidance",
            AuthorityLevel::Industry => "industry",
            AuthorityLevel::Community => "community",
        }
    }

    /// 5 for official down to 1 for community.
    pub fn rank(&self) -> u8 {
        *self as u8 + 1
    }

    /// Normalized weight used when scoring evidence.
    pub fn score(&self) -> f64 {
        match self {
            AuthorityLevel::Official => 1.0,
            AuthorityLevel::Verified => 0.9,
            AuthorityLevel::Guidance => 0.7,
            AuthorityLevel::Industry => 0.5,
            AuthorityLevel::Community => 0.3,
        }
    }
}

impl fmt::Display for AuthorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthorityLevel {
    type Err = CorpusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| CorpusError::Validation(format!("unknown authority level: {s}")))
    }
}

/// Lifecycle state of a source. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Active,
    Superseded,
    Archived,
}

impl SourceStatus {
    pub const ALL: [SourceStatus; 3] = [
        SourceStatus::Active,
        SourceStatus::Superseded,
        SourceStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStatus::Active => "active",
            SourceStatus::Superseded => "superseded",
            SourceStatus::Archived => "archived",
        }
    }

    /// active -> superseded -> archived, with active -> archived allowed.
    pub fn can_transition_to(&self, next: SourceStatus) -> bool {
        next > *self
    }

    pub fn is_current(&self) -> bool {
        matches!(self, SourceStatus::Active)
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceStatus {
    type Err = CorpusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| CorpusError::Validation(format!("unknown source status: {s}")))
    }
}

/// A versioned knowledge document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,

    /// Stable natural key, unique among active sources
    pub external_id: String,

    pub name: String,

    pub source_type: SourceType,

    pub authority_level: AuthorityLevel,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub official_url: Option<String>,

    pub status: SourceStatus,

    /// Direct successor; set iff `status` has passed through superseded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<SourceId>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Source {
    pub fn is_active(&self) -> bool {
        self.status.is_current()
    }
}

/// Ingestion input for a new source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSource {
    pub external_id: String,

    pub name: String,

    pub source_type: SourceType,

    /// Falls back to [`SourceType::default_authority`] when absent
    #[serde(default)]
    pub authority_level: Option<AuthorityLevel>,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub publication_date: Option<NaiveDate>,

    #[serde(default)]
    pub effective_date: Option<NaiveDate>,

    #[serde(default)]
    pub publisher: Option<String>,

    #[serde(default)]
    pub official_url: Option<String>,
}

impl NewSource {
    /// Minimal input; everything optional left unset.
    pub fn new(
        external_id: impl Into<String>,
        name: impl Into<String>,
        source_type: SourceType,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            name: name.into(),
            source_type,
            authority_level: None,
            version: None,
            publication_date: None,
            effective_date: None,
            publisher: None,
            official_url: None,
        }
    }

    pub fn with_authority(mut self, level: AuthorityLevel) -> Self {
        self.authority_level = Some(level);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn resolved_authority(&self) -> AuthorityLevel {
        self.authority_level
            .unwrap_or_else(|| self.source_type.default_authority())
    }

    /// Shape checks shared by every store implementation.
    pub fn validate(&self) -> Result<(), CorpusError> {
        if self.external_id.trim().is_empty() {
            return Err(CorpusError::Validation("external_id must not be empty".into()));
        }
        if self.name.trim().is_empty() {
            return Err(CorpusError::Validation("name must not be empty".into()));
        }
        if let (Some(published), Some(effective)) = (self.publication_date, self.effective_date) {
            if effective < published {
                return Err(CorpusError::Validation(format!(
                    "effective_date {effective} precedes publication_date {published}"
                )));
            }
        }
        Ok(())
    }

    /// Materialize into an active [`Source`] with the given id.
    pub fn into_source(self, id: SourceId, now: DateTime<Utc>) -> Source {
        let authority_level = self.resolved_authority();
        Source {
            id,
            external_id: self.external_id,
            name: self.name,
            source_type: self.source_type,
            authority_level,
            version: self.version,
            publication_date: self.publication_date,
            effective_date: self.effective_date,
            publisher: self.publisher,
            official_url: self.official_url,
            status: SourceStatus::Active,
            superseded_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_ordering() {
        assert!(AuthorityLevel::Official > AuthorityLevel::Verified);
        assert!(AuthorityLevel::Verified > AuthorityLevel::Guidance);
        assert!(AuthorityLevel::Guidance > AuthorityLevel::Industry);
        assert!(AuthorityLevel::Industry > AuthorityLevel::Community);
        assert_eq!(AuthorityLevel::Official.rank(), 5);
        assert_eq!(AuthorityLevel::Community.rank(), 1);
    }

    #[test]
    fn default_authority_from_source_type() {
        let input = NewSource::new("eu-2024-1781", "ESPR", SourceType::EuRegulation);
        assert_eq!(input.resolved_authority(), AuthorityLevel::Official);

        let input = NewSource::new("rep-1", "Report", SourceType::IndustryReport);
        assert_eq!(input.resolved_authority(), AuthorityLevel::Industry);

        let input = input.with_authority(AuthorityLevel::Verified);
        assert_eq!(input.resolved_authority(), AuthorityLevel::Verified);
    }

    #[test]
    fn status_transitions_only_move_forward() {
        use SourceStatus::*;
        assert!(Active.can_transition_to(Superseded));
        assert!(Active.can_transition_to(Archived));
        assert!(Superseded.can_transition_to(Archived));
        assert!(!Superseded.can_transition_to(Active));
        assert!(!Archived.can_transition_to(Active));
        assert!(!Archived.can_transition_to(Superseded));
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn enums_parse_from_their_names() {
        for t in SourceType::ALL {
            assert_eq!(t.as_str().parse::<SourceType>().unwrap(), t);
        }
        assert_eq!("verified".parse::<AuthorityLevel>().unwrap(), AuthorityLevel::Verified);
        assert!("bogus".parse::<SourceStatus>().is_err());
    }

    #[test]
    fn blank_external_id_rejected() {
        let input = NewSource::new("  ", "name", SourceType::Community);
        assert!(matches!(input.validate(), Err(CorpusError::Validation(_))));
    }

    #[test]
    fn effective_before_publication_rejected() {
        let mut input = NewSource::new("x", "name", SourceType::Community);
        input.publication_date = NaiveDate::from_ymd_opt(2024, 6, 1);
        input.effective_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert!(input.validate().is_err());
    }
}
