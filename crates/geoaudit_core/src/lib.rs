//! GeoAudit Core - GeoJSON layer catalog auditing
//!
//! Reads a manifest of layer groups, resolves every file reference under a
//! filesystem or HTTP source, validates each document and summarizes its
//! geometry, then reduces the per-file outcomes into one report.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────┐    ┌────────────┐    ┌──────────┐
//! │ Manifest │───▶│ Resolver │───▶│ Fetcher  │───▶│ Validator  │───▶│  Report  │
//! │ (groups) │    │ (fs/http)│    │(disk/GET)│    │ + Summary  │    │ (reduce) │
//! └──────────┘    └──────────┘    └──────────┘    └────────────┘    └──────────┘
//! ```
//!
//! # Core Concepts
//!
//! - **Group**: a named set of layer files, with defaults applied
//! - **Vertex estimate**: type-aware count alongside the raw walker count
//! - **Outcome**: the classified state of one file reference
//! - **Advisory**: a non-failing observation (large file, path hygiene, ...)

pub mod config;
pub mod error;
pub mod fetch;
pub mod geojson;
pub mod geometry;
pub mod manifest;
pub mod pipeline;
pub mod report;
pub mod resolve;
pub mod walker;

// Re-exports for convenience
pub use config::AuditConfig;
pub use error::{AuditError, FailureKind, Result};
pub use geometry::{GeometrySummary, VertexEstimate, VertexStatus};
pub use manifest::{Group, Manifest};
pub use pipeline::{AuditPipeline, ManifestLocation};
pub use report::{Advisory, AdvisoryKind, AuditReport, FileState, GroupSummary, HeavyFeature};
pub use resolve::{ResolvedSource, Resolver, SourceMode};
