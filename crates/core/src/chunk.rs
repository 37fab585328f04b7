//! Retrievable units of source content and their content hashing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::CorpusError;
use crate::source::SourceId;

/// Store-assigned identifier for a [`SourceChunk`].
pub type ChunkId = i64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Article,
    Section,
    #[default]
    Paragraph,
    Requirement,
    Definition,
    Table,
    Guidance,
    Example,
    FullDocument,
}

impl ChunkType {
    pub const ALL: [ChunkType; 9] = [
        ChunkType::Article,
        ChunkType::Section,
        ChunkType::Paragraph,
        ChunkType::Requirement,
        ChunkType::Definition,
        ChunkType::Table,
        ChunkType::Guidance,
        ChunkType::Example,
        ChunkType::FullDocument,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::Article => "article",
            ChunkType::Section => "section",
            ChunkType::Paragraph => "paragraph",
            ChunkType::Requirement => "requirement",
            ChunkType::Definition => "definition",
            ChunkType::Table => "table",
            ChunkType::Guidance => "guidance",
            ChunkType::Example => "example",
            ChunkType::FullDocument => "full_document",
        }
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkType {
    type Err = CorpusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CorpusError::Validation(format!("unknown chunk type: {s}")))
    }
}

/// An immutable, content-addressed slice of a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceChunk {
    pub id: ChunkId,
    pub source_id: SourceId,
    /// Sequential within the owning source, starting at 0
    pub chunk_index: u32,
    pub chunk_type: ChunkType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    pub content: String,
    /// Lowercase hex SHA-256 of the normalized content
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Raw chunk as supplied by an ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChunk {
    #[serde(default)]
    pub chunk_type: ChunkType,
    #[serde(default)]
    pub section_path: Option<String>,
    #[serde(default)]
    pub heading: Option<String>,
    pub content: String,
}

impl NewChunk {
    pub fn new(chunk_type: ChunkType, content: impl Into<String>) -> Self {
        Self {
            chunk_type,
            section_path: None,
            heading: None,
            content: content.into(),
        }
    }

    pub fn with_section(mut self, path: impl Into<String>) -> Self {
        self.section_path = Some(path.into());
        self
    }

    pub fn with_heading(mut self, heading: impl Into<String>) -> Self {
        self.heading = Some(heading.into());
        self
    }

    pub fn content_hash(&self) -> String {
        content_hash(&self.content)
    }

    /// Section path as stored; absent paths collapse to `""` so they take
    /// part in uniqueness checks.
    pub fn section_key(&self) -> &str {
        self.section_path.as_deref().unwrap_or("")
    }

    /// The (section, hash) pair that decides whether a chunk already exists.
    pub fn identity(&self) -> (String, String) {
        (self.section_key().to_string(), self.content_hash())
    }
}

/// Normalize chunk text before hashing.
///
/// CRLF becomes LF, trailing whitespace is stripped from every line, runs of
/// blank lines collapse to one, and the whole text is trimmed.
pub fn normalize_content(content: &str) -> String {
    let unified = content.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(unified.len());
    let mut blank_run = false;

    for line in unified.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            if !blank_run && !out.is_empty() {
                out.push('\n');
            }
            blank_run = true;
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        blank_run = false;
        out.push_str(line);
    }

    out.trim().to_string()
}

/// Lowercase hex SHA-256 of [`normalize_content`].
pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(normalize_content(content).as_bytes());
    format!("{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_for_identical_content() {
        let a = content_hash("Batteries must carry a passport by 2027.");
        let b = content_hash("Batteries must carry a passport by 2027.");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn hash_ignores_line_ending_and_trailing_whitespace() {
        let unix = content_hash("Article 77\nDigital product passport\n");
        let windows = content_hash("Article 77  \r\nDigital product passport\r\n\r\n");
        assert_eq!(unix, windows);
    }

    #[test]
    fn hash_changes_with_content() {
        assert_ne!(content_hash("2027"), content_hash("2028"));
    }

    #[test]
    fn normalize_collapses_blank_runs() {
        let text = "first\n\n\n\nsecond\n";
        assert_eq!(normalize_content(text), "first\n\nsecond");
    }

    #[test]
    fn missing_section_path_is_empty_key() {
        let chunk = NewChunk::new(ChunkType::Article, "text");
        assert_eq!(chunk.section_key(), "");
        let chunk = chunk.with_section("Art. 9");
        assert_eq!(chunk.section_key(), "Art. 9");
    }
}
