//! Error types for the audit engine
//!
//! `AuditError` covers the failures that abort a run before any file is
//! scanned. Per-file problems never surface here; they are classified with
//! [`FailureKind`] and recorded in the report.

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Fatal audit error
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid manifest shape: expected a list of groups or an object with a 'groups' list (got {found})")]
    InvalidManifestShape { found: &'static str },

    #[error("Manifest contains no groups")]
    EmptyManifest,

    #[error("Manifest unavailable at {target}: {message}")]
    ManifestUnavailable { target: String, message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AuditError>;

/// Classification of a per-file problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Local path absent or unreadable, empty reference, or an HTTP fetch that
    /// failed, returned an error status, or returned HTML instead of JSON.
    MissingFile,
    /// Payload is not parseable JSON.
    MalformedJson,
    /// Parsed JSON is not a `FeatureCollection` with a `features` list.
    #[serde(rename = "invalid_geojson_structure")]
    InvalidGeoJsonStructure,
    /// `FeatureCollection` with zero features. Warning grade.
    EmptyCollection,
    /// Feature lacking geometry or coordinates.
    DegradedFeature,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::MissingFile => "missing_file",
            FailureKind::MalformedJson => "malformed_json",
            FailureKind::InvalidGeoJsonStructure => "invalid_geojson_structure",
            FailureKind::EmptyCollection => "empty_collection",
            FailureKind::DegradedFeature => "degraded_feature",
        }
    }

    /// Whether this kind fails the audit's exit signal.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            FailureKind::MissingFile
                | FailureKind::MalformedJson
                | FailureKind::InvalidGeoJsonStructure
        )
    }
}
