//! Error types for the trustgate domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use crate::source::{SourceId, SourceStatus};
use thiserror::Error;

/// The top-level error type for all trustgate operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Corpus errors ---
    #[error("Corpus error: {0}")]
    Corpus(#[from] CorpusError),

    // --- Epistemic marker errors ---
    #[error("Marker error: {0}")]
    Marker(#[from] MarkerError),

    // --- Evidence policy errors ---
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Errors raised by a [`CorpusStore`](crate::corpus::CorpusStore).
///
/// `Validation`, `NotFound` and `AlreadySuperseded` indicate caller or
/// data-state mistakes and are never retried.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Source {id} is {status}; only active sources can be superseded")]
    AlreadySuperseded { id: SourceId, status: SourceStatus },

    #[error("Invalid status transition for source {id}: {from} -> {to}")]
    InvalidTransition {
        id: SourceId,
        from: SourceStatus,
        to: SourceStatus,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// An evidence policy that cannot be used. Raised at analyzer construction
/// or config load, never mid-decision.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    #[error("policy field `{field}` is out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    #[error("invalid policy: {0}")]
    Invalid(String),
}

/// Rejected epistemic marker construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarkerError {
    #[error("marker basis must not be empty")]
    EmptyBasis,

    #[error("uncertain markers require at least one assumption")]
    MissingAssumptions,

    #[error("marker assumptions must not be blank")]
    BlankAssumption,

    #[error("assumptions are only allowed on uncertain markers")]
    UnexpectedAssumptions,

    #[error("source {source_id} is {status}; facts must cite an active source")]
    StaleSource {
        source_id: SourceId,
        status: SourceStatus,
    },
}
