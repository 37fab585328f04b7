//! Failure taxonomy: the closed set of abstention reason codes.
//!
//! Codes are append-only. A new reason gets the next free number; existing
//! numbers and names never change, so historical traces stay readable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u16)]
pub enum ReasonCode {
    InsufficientEvidence = 1,
    ConflictingEvidence = 2,
    AuthorityInsufficient = 3,
    StaleSource = 4,
    RetrievalError = 5,
    SchemaValidationFailure = 6,
}

impl ReasonCode {
    /// Every code in numeric order.
    pub const ALL: [ReasonCode; 6] = [
        ReasonCode::InsufficientEvidence,
        ReasonCode::ConflictingEvidence,
        ReasonCode::AuthorityInsufficient,
        ReasonCode::StaleSource,
        ReasonCode::RetrievalError,
        ReasonCode::SchemaValidationFailure,
    ];

    /// Stable numeric code.
    pub fn code(&self) -> u16 {
        *self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.code() == code)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::InsufficientEvidence => "INSUFFICIENT_EVIDENCE",
            ReasonCode::ConflictingEvidence => "CONFLICTING_EVIDENCE",
            ReasonCode::AuthorityInsufficient => "AUTHORITY_INSUFFICIENT",
            ReasonCode::StaleSource => "STALE_SOURCE",
            ReasonCode::RetrievalError => "RETRIEVAL_ERROR",
            ReasonCode::SchemaValidationFailure => "SCHEMA_VALIDATION_FAILURE",
        }
    }

    /// Fixed explanation attached to every abstention with this code.
    pub fn template(&self) -> &'static str {
        match self {
            ReasonCode::InsufficientEvidence => {
                "No relevant information with sufficient similarity was found in the knowledge base"
            }
            ReasonCode::ConflictingEvidence => {
                "Sources within the top results provide conflicting conclusions on the same topic"
            }
            ReasonCode::AuthorityInsufficient => {
                "Available sources do not have sufficient authority for this query domain"
            }
            ReasonCode::StaleSource => {
                "All qualifying evidence comes from superseded or archived sources"
            }
            ReasonCode::RetrievalError => {
                "Upstream retrieval failed before evidence could be evaluated"
            }
            ReasonCode::SchemaValidationFailure => "The query or candidate list was malformed",
        }
    }

    /// Guidance shown to end users in place of an answer.
    pub fn user_message(&self) -> &'static str {
        match self {
            ReasonCode::InsufficientEvidence => {
                "I couldn't find enough relevant information in the knowledge base to answer this. \
                 Try rephrasing, or ask about EU regulations (CSRD, EUDR, DPP) or GS1 standards."
            }
            ReasonCode::ConflictingEvidence => {
                "Sources disagree on this topic. Please consult the official regulatory \
                 documentation or contact GS1 directly for clarification."
            }
            ReasonCode::AuthorityInsufficient => {
                "This question needs authoritative sources that are not available. For official \
                 guidance, consult the relevant regulatory body or GS1 organization."
            }
            ReasonCode::StaleSource => {
                "The information available on this topic has been superseded. Please check the \
                 latest official sources for current guidance."
            }
            ReasonCode::RetrievalError => {
                "The knowledge base could not be searched right now. Please try again shortly."
            }
            ReasonCode::SchemaValidationFailure => {
                "The request could not be processed. Please check the question and try again."
            }
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasonCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown reason code: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        // Persisted traces depend on these numbers.
        assert_eq!(ReasonCode::InsufficientEvidence.code(), 1);
        assert_eq!(ReasonCode::ConflictingEvidence.code(), 2);
        assert_eq!(ReasonCode::AuthorityInsufficient.code(), 3);
        assert_eq!(ReasonCode::StaleSource.code(), 4);
        assert_eq!(ReasonCode::RetrievalError.code(), 5);
        assert_eq!(ReasonCode::SchemaValidationFailure.code(), 6);
    }

    #[test]
    fn all_is_in_numeric_order() {
        let codes: Vec<u16> = ReasonCode::ALL.iter().map(|r| r.code()).collect();
        let mut sorted = codes.clone();
        sorted.sort_unstable();
        assert_eq!(codes, sorted);
        assert_eq!(ReasonCode::from_code(4), Some(ReasonCode::StaleSource));
        assert_eq!(ReasonCode::from_code(99), None);
    }

    #[test]
    fn serializes_as_screaming_snake() {
        let json = serde_json::to_string(&ReasonCode::AuthorityInsufficient).unwrap();
        assert_eq!(json, "\"AUTHORITY_INSUFFICIENT\"");
        let parsed: ReasonCode = serde_json::from_str("\"STALE_SOURCE\"").unwrap();
        assert_eq!(parsed, ReasonCode::StaleSource);
    }

    #[test]
    fn every_code_has_text() {
        for code in ReasonCode::ALL {
            assert!(!code.template().is_empty());
            assert!(!code.user_message().is_empty());
            assert_eq!(code.as_str().parse::<ReasonCode>().unwrap(), code);
        }
    }
}
