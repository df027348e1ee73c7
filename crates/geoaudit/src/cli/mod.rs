//! CLI module for GeoAudit
//!
//! `audit` runs the layer audit and renders the report; `config` shows the
//! resolved paths and effective settings.

pub mod audit;
pub mod config;
pub mod error;
pub mod output;

/// Outcome of a completed audit, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    Passed,
    Failed,
}
