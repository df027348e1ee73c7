//! Audit report model and the reducer that builds it
//!
//! Per-file [`FileOutcome`] values are folded into a [`ReportBuilder`] in
//! discovery order. Nothing is shared between files while they are audited,
//! so the same reduction serves sequential and parallel runs.

use crate::error::FailureKind;
use crate::geojson::FileScan;
use crate::geometry::{BoundingBox, Span, VertexStatus, SPAN_METHOD};
use crate::manifest::Manifest;
use crate::resolve::{path_hints, PathHint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Terminal state of one file reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    Scanned,
    UrlSkipped,
    Missing,
    HttpFail,
    BadJson,
    InvalidStructure,
    Empty,
    /// `Feature` or bare geometry document: accepted without a scan.
    Degraded,
}

impl FileState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileState::Scanned => "SCANNED",
            FileState::UrlSkipped => "URL_SKIPPED",
            FileState::Missing => "MISSING",
            FileState::HttpFail => "HTTP_FAIL",
            FileState::BadJson => "BAD_JSON",
            FileState::InvalidStructure => "INVALID_STRUCTURE",
            FileState::Empty => "EMPTY",
            FileState::Degraded => "DEGRADED",
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            FileState::Missing | FileState::HttpFail => Some(FailureKind::MissingFile),
            FileState::BadJson => Some(FailureKind::MalformedJson),
            FileState::InvalidStructure => Some(FailureKind::InvalidGeoJsonStructure),
            FileState::Empty => Some(FailureKind::EmptyCollection),
            FileState::Scanned | FileState::UrlSkipped | FileState::Degraded => None,
        }
    }

    /// Counts against the audit's pass signal.
    pub fn is_error(&self) -> bool {
        self.failure_kind().is_some_and(|kind| kind.is_error())
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified result of auditing one file reference.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    /// Position of the owning group in the manifest.
    pub group_index: usize,
    pub reference: String,
    /// Resolved target; `None` for empty references.
    pub target: Option<String>,
    pub state: FileState,
    pub message: Option<String>,
    pub size_bytes: Option<u64>,
    pub scan: Option<FileScan>,
}

/// Settings and context echoed into the report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSettings {
    pub mode: String,
    pub manifest: String,
    pub root: Option<String>,
    pub base_url: Option<String>,
    pub top_n: usize,
    pub alert_threshold: u64,
    pub max_scan_features: usize,
    pub max_files: usize,
    pub large_file_bytes: u64,
    pub workers: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    /// Auditable files; URL-skipped references are not included.
    pub total_files: usize,
    pub total_features: usize,
    pub ok: usize,
    pub empty: usize,
    pub missing: usize,
    pub http_fail: usize,
    pub bad_json: usize,
    pub invalid_structure: usize,
    pub degraded_documents: usize,
    pub url_skipped: usize,
    pub degraded_features: usize,
    pub divergent_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub id: String,
    pub label: Option<String>,
    pub enabled: bool,
    pub pick: String,
    pub declared_files: usize,
    /// Files actually audited (URL-skipped excluded).
    pub files: usize,
    pub features: usize,
    pub max_vertex_estimate: u64,
    pub ok_files: usize,
    pub failed_files: usize,
    pub url_skipped: usize,
}

impl GroupSummary {
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub group_id: String,
    pub reference: String,
    pub target: Option<String>,
    pub state: FileState,
    pub message: Option<String>,
    pub size_bytes: Option<u64>,
    pub feature_count: usize,
    pub scanned_features: usize,
    pub geometry_types: BTreeMap<String, usize>,
    pub bbox: Option<BoundingBox>,
    pub degraded_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeavyFeature {
    pub group_id: String,
    pub group: String,
    pub file: String,
    pub feature_index: usize,
    pub geometry_type: String,
    pub vertex_estimate: u64,
    pub shape_count: Option<u64>,
    pub walked_count: u64,
    pub status: VertexStatus,
    pub bbox: Option<BoundingBox>,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub group_id: String,
    pub group: String,
    pub reference: String,
    pub target: Option<String>,
    pub kind: FailureKind,
    pub state: FileState,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryKind {
    EmptyGroup,
    DisabledGroup,
    AbsoluteLocalPath,
    ParentTraversal,
    RemoteUrl,
    LargeFile,
    DegradedFeatures,
    DegradedDocument,
    DivergentEstimates,
}

impl From<PathHint> for AdvisoryKind {
    fn from(hint: PathHint) -> Self {
        match hint {
            PathHint::AbsoluteLocalPath => AdvisoryKind::AbsoluteLocalPath,
            PathHint::ParentTraversal => AdvisoryKind::ParentTraversal,
            PathHint::RemoteUrl => AdvisoryKind::RemoteUrl,
        }
    }
}

/// A non-failing observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    pub kind: AdvisoryKind,
    pub group_id: String,
    pub reference: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub generated_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub settings: ReportSettings,
    pub span_method: String,
    pub passed: bool,
    /// `max_files` stopped the run before every reference was audited.
    pub truncated: bool,
    pub counters: Counters,
    pub groups: Vec<GroupSummary>,
    pub files: Vec<FileReport>,
    pub failures: Vec<FileFailure>,
    pub advisories: Vec<Advisory>,
    pub skipped_urls: Vec<String>,
    pub top_features: Vec<HeavyFeature>,
    pub alerts: Vec<HeavyFeature>,
    /// Every scanned feature, heaviest first.
    #[serde(skip)]
    pub ranked_features: Vec<HeavyFeature>,
}

impl AuditReport {
    /// Group rows ordered by features, then audited files, both descending.
    pub fn groups_by_weight(&self) -> Vec<&GroupSummary> {
        let mut groups: Vec<&GroupSummary> = self.groups.iter().collect();
        groups.sort_by(|a, b| (b.features, b.files).cmp(&(a.features, a.files)));
        groups
    }
}

/// Pass when at least one file scanned and nothing hit an error state.
pub fn audit_passed(counters: &Counters) -> bool {
    counters.ok > 0
        && counters.missing == 0
        && counters.http_fail == 0
        && counters.bad_json == 0
        && counters.invalid_structure == 0
}

/// Stable sort, heaviest first; equal estimates keep discovery order.
pub fn rank_features(features: &mut [HeavyFeature]) {
    features.sort_by(|a, b| b.vertex_estimate.cmp(&a.vertex_estimate));
}

/// Folds outcomes into an [`AuditReport`].
pub struct ReportBuilder<'a> {
    manifest: &'a Manifest,
    settings: ReportSettings,
    groups: Vec<GroupSummary>,
    counters: Counters,
    files: Vec<FileReport>,
    failures: Vec<FileFailure>,
    advisories: Vec<Advisory>,
    skipped_urls: Vec<String>,
    ranked: Vec<HeavyFeature>,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(manifest: &'a Manifest, settings: ReportSettings) -> Self {
        let mut advisories = Vec::new();
        let groups = manifest
            .groups
            .iter()
            .map(|group| {
                if !group.enabled {
                    advisories.push(Advisory {
                        kind: AdvisoryKind::DisabledGroup,
                        group_id: group.id.clone(),
                        reference: None,
                        message: "group is disabled but still audited".to_string(),
                    });
                }
                if group.files.is_empty() {
                    advisories.push(Advisory {
                        kind: AdvisoryKind::EmptyGroup,
                        group_id: group.id.clone(),
                        reference: None,
                        message: "group declares no files".to_string(),
                    });
                }
                GroupSummary {
                    id: group.id.clone(),
                    label: group.label.clone(),
                    enabled: group.enabled,
                    pick: group.pick.clone(),
                    declared_files: group.files.len(),
                    files: 0,
                    features: 0,
                    max_vertex_estimate: 0,
                    ok_files: 0,
                    failed_files: 0,
                    url_skipped: 0,
                }
            })
            .collect();

        Self {
            manifest,
            settings,
            groups,
            counters: Counters::default(),
            files: Vec::new(),
            failures: Vec::new(),
            advisories,
            skipped_urls: Vec::new(),
            ranked: Vec::new(),
        }
    }

    fn advise(&mut self, kind: AdvisoryKind, group_id: &str, reference: &str, message: String) {
        self.advisories.push(Advisory {
            kind,
            group_id: group_id.to_string(),
            reference: Some(reference.to_string()),
            message,
        });
    }

    pub fn record(&mut self, outcome: FileOutcome) {
        let manifest = self.manifest;
        let group = &manifest.groups[outcome.group_index];
        let group_id = group.id.as_str();
        let group_name = group.display_name();

        for hint in path_hints(&outcome.reference) {
            self.advise(hint.into(), group_id, &outcome.reference, hint.describe().to_string());
        }

        if outcome.state == FileState::UrlSkipped {
            self.counters.url_skipped += 1;
            self.groups[outcome.group_index].url_skipped += 1;
            self.skipped_urls.push(outcome.reference.clone());
            self.files.push(file_report(group_id, &outcome));
            return;
        }

        self.counters.total_files += 1;
        self.groups[outcome.group_index].files += 1;

        if let Some(size) = outcome.size_bytes {
            if size > self.settings.large_file_bytes {
                self.advise(
                    AdvisoryKind::LargeFile,
                    group_id,
                    &outcome.reference,
                    format!(
                        "file is {} bytes (advisory threshold {} bytes)",
                        size, self.settings.large_file_bytes
                    ),
                );
            }
        }

        match outcome.state {
            FileState::Scanned => {
                self.counters.ok += 1;
                self.groups[outcome.group_index].ok_files += 1;
            }
            FileState::Degraded => {
                self.counters.degraded_documents += 1;
                self.groups[outcome.group_index].ok_files += 1;
                self.advise(
                    AdvisoryKind::DegradedDocument,
                    group_id,
                    &outcome.reference,
                    outcome
                        .message
                        .clone()
                        .unwrap_or_else(|| "document accepted without a feature scan".to_string()),
                );
            }
            FileState::Empty => self.counters.empty += 1,
            FileState::Missing => self.counters.missing += 1,
            FileState::HttpFail => self.counters.http_fail += 1,
            FileState::BadJson => self.counters.bad_json += 1,
            FileState::InvalidStructure => self.counters.invalid_structure += 1,
            FileState::UrlSkipped => {}
        }

        if outcome.state.is_error() {
            self.groups[outcome.group_index].failed_files += 1;
        }

        if let Some(kind) = outcome.state.failure_kind() {
            self.failures.push(FileFailure {
                group_id: group_id.to_string(),
                group: group_name.to_string(),
                reference: outcome.reference.clone(),
                target: outcome.target.clone(),
                kind,
                state: outcome.state,
                message: outcome
                    .message
                    .clone()
                    .unwrap_or_else(|| kind.as_str().to_string()),
            });
        }

        if let Some(scan) = &outcome.scan {
            self.record_scan(outcome.group_index, &outcome.reference, scan);
        }

        self.files.push(file_report(group_id, &outcome));
    }

    fn record_scan(&mut self, group_index: usize, reference: &str, scan: &FileScan) {
        let manifest = self.manifest;
        let group = &manifest.groups[group_index];

        self.counters.total_features += scan.feature_count;
        self.counters.degraded_features += scan.degraded_features;
        self.counters.divergent_features += scan.divergent_features;

        let row = &mut self.groups[group_index];
        row.features += scan.feature_count;
        row.max_vertex_estimate = row.max_vertex_estimate.max(scan.max_vertex_estimate());

        if scan.degraded_features > 0 {
            self.advise(
                AdvisoryKind::DegradedFeatures,
                &group.id,
                reference,
                format!(
                    "{} of {} features lack geometry or coordinates",
                    scan.degraded_features, scan.feature_count
                ),
            );
        }
        if scan.divergent_features > 0 {
            self.advise(
                AdvisoryKind::DivergentEstimates,
                &group.id,
                reference,
                format!(
                    "{} features have coordinate nesting that does not match their declared type",
                    scan.divergent_features
                ),
            );
        }

        self.ranked.extend(scan.features.iter().map(|record| HeavyFeature {
            group_id: group.id.clone(),
            group: group.display_name().to_string(),
            file: reference.to_string(),
            feature_index: record.index,
            geometry_type: record.summary.geometry_type.clone(),
            vertex_estimate: record.summary.vertices.count,
            shape_count: record.summary.vertices.shape_count,
            walked_count: record.summary.vertices.walked_count,
            status: record.summary.vertices.status,
            bbox: record.summary.bbox,
            span: record.summary.span,
        }));
    }

    pub fn finish(self, duration_ms: u64, truncated: bool) -> AuditReport {
        let mut ranked = self.ranked;
        rank_features(&mut ranked);

        let top_features = ranked
            .iter()
            .take(self.settings.top_n.max(1))
            .cloned()
            .collect();
        let alerts = ranked
            .iter()
            .filter(|f| f.vertex_estimate >= self.settings.alert_threshold)
            .cloned()
            .collect();

        AuditReport {
            generated_at: Utc::now(),
            duration_ms,
            settings: self.settings,
            span_method: SPAN_METHOD.to_string(),
            passed: audit_passed(&self.counters),
            truncated,
            counters: self.counters,
            groups: self.groups,
            files: self.files,
            failures: self.failures,
            advisories: self.advisories,
            skipped_urls: self.skipped_urls,
            top_features,
            alerts,
            ranked_features: ranked,
        }
    }
}

fn file_report(group_id: &str, outcome: &FileOutcome) -> FileReport {
    let scan = outcome.scan.as_ref();
    FileReport {
        group_id: group_id.to_string(),
        reference: outcome.reference.clone(),
        target: outcome.target.clone(),
        state: outcome.state,
        message: outcome.message.clone(),
        size_bytes: outcome.size_bytes,
        feature_count: scan.map_or(0, |s| s.feature_count),
        scanned_features: scan.map_or(0, |s| s.scanned_features),
        geometry_types: scan.map(|s| s.geometry_types.clone()).unwrap_or_default(),
        bbox: scan.and_then(|s| s.bbox),
        degraded_features: scan.map_or(0, |s| s.degraded_features),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geojson::scan_features;
    use crate::manifest::normalize;
    use serde_json::json;

    fn settings() -> ReportSettings {
        ReportSettings {
            mode: "fs".to_string(),
            manifest: "groups.json".to_string(),
            root: Some(".".to_string()),
            base_url: None,
            top_n: 2,
            alert_threshold: 5,
            max_scan_features: 200,
            max_files: 0,
            large_file_bytes: 100,
            workers: 1,
        }
    }

    fn manifest() -> Manifest {
        normalize(&json!([
            {"id": "a", "label": "Alpha", "files": ["a1.geojson", "a2.geojson"]},
            {"id": "b", "enabled": false, "files": []}
        ]))
        .unwrap()
    }

    fn ring_feature(n: usize) -> serde_json::Value {
        let ring: Vec<serde_json::Value> = (0..n).map(|i| json!([i as f64, 0.0])).collect();
        json!({"type": "Feature", "geometry": {"type": "Polygon", "coordinates": [ring]}})
    }

    fn outcome(group_index: usize, reference: &str, state: FileState) -> FileOutcome {
        FileOutcome {
            group_index,
            reference: reference.to_string(),
            target: Some(reference.to_string()),
            state,
            message: None,
            size_bytes: None,
            scan: None,
        }
    }

    #[test]
    fn test_group_advisories_on_construction() {
        let manifest = manifest();
        let builder = ReportBuilder::new(&manifest, settings());
        let report = builder.finish(0, false);
        let kinds: Vec<AdvisoryKind> = report.advisories.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![AdvisoryKind::DisabledGroup, AdvisoryKind::EmptyGroup]);
        assert!(!report.passed);
    }

    #[test]
    fn test_scanned_file_feeds_counters_and_ranking() {
        let manifest = manifest();
        let mut builder = ReportBuilder::new(&manifest, settings());
        let features = vec![ring_feature(4), ring_feature(7), ring_feature(7)];
        builder.record(FileOutcome {
            scan: Some(scan_features(&features, 200)),
            size_bytes: Some(10),
            ..outcome(0, "a1.geojson", FileState::Scanned)
        });
        let report = builder.finish(3, false);

        assert_eq!(report.counters.total_files, 1);
        assert_eq!(report.counters.ok, 1);
        assert_eq!(report.counters.total_features, 3);
        assert_eq!(report.groups[0].max_vertex_estimate, 7);
        assert!(report.passed);

        let indices: Vec<usize> = report.top_features.iter().map(|f| f.feature_index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(report.alerts.len(), 2);
        assert_eq!(report.ranked_features.len(), 3);
    }

    #[test]
    fn test_failures_and_url_skips() {
        let manifest = manifest();
        let mut builder = ReportBuilder::new(&manifest, settings());
        builder.record(FileOutcome {
            message: Some("file does not exist".to_string()),
            ..outcome(0, "a1.geojson", FileState::Missing)
        });
        builder.record(outcome(0, "https://h/a2.geojson", FileState::UrlSkipped));
        let report = builder.finish(0, false);

        assert_eq!(report.counters.total_files, 1);
        assert_eq!(report.counters.missing, 1);
        assert_eq!(report.counters.url_skipped, 1);
        assert_eq!(report.skipped_urls, vec!["https://h/a2.geojson"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, FailureKind::MissingFile);
        assert_eq!(report.failures[0].group, "Alpha");
        assert_eq!(report.groups[0].failed_files, 1);
        assert!(report
            .advisories
            .iter()
            .any(|a| a.kind == AdvisoryKind::RemoteUrl));
        assert!(!report.passed);
    }

    #[test]
    fn test_empty_collection_is_a_warning() {
        let manifest = manifest();
        let mut builder = ReportBuilder::new(&manifest, settings());
        builder.record(FileOutcome {
            scan: Some(scan_features(&[ring_feature(3)], 200)),
            ..outcome(0, "a1.geojson", FileState::Scanned)
        });
        builder.record(outcome(0, "a2.geojson", FileState::Empty));
        let report = builder.finish(0, false);

        assert_eq!(report.counters.empty, 1);
        assert_eq!(report.failures[0].kind, FailureKind::EmptyCollection);
        assert_eq!(report.groups[0].failed_files, 0);
        assert!(report.passed);
    }

    #[test]
    fn test_large_file_advisory() {
        let manifest = manifest();
        let mut builder = ReportBuilder::new(&manifest, settings());
        builder.record(FileOutcome {
            size_bytes: Some(101),
            ..outcome(0, "a1.geojson", FileState::BadJson)
        });
        let report = builder.finish(0, false);
        assert!(report
            .advisories
            .iter()
            .any(|a| a.kind == AdvisoryKind::LargeFile && a.reference.as_deref() == Some("a1.geojson")));
        assert_eq!(report.counters.bad_json, 1);
    }

    #[test]
    fn test_groups_by_weight() {
        let manifest = normalize(&json!([
            {"id": "light", "files": ["l.geojson"]},
            {"id": "heavy", "files": ["h.geojson"]}
        ]))
        .unwrap();
        let mut builder = ReportBuilder::new(&manifest, settings());
        builder.record(FileOutcome {
            scan: Some(scan_features(&[ring_feature(3)], 200)),
            ..outcome(0, "l.geojson", FileState::Scanned)
        });
        builder.record(FileOutcome {
            scan: Some(scan_features(&[ring_feature(3), ring_feature(3)], 200)),
            ..outcome(1, "h.geojson", FileState::Scanned)
        });
        let report = builder.finish(0, false);
        let order: Vec<&str> = report.groups_by_weight().iter().map(|g| g.id.as_str()).collect();
        assert_eq!(order, vec!["heavy", "light"]);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(
            serde_json::to_string(&FileState::UrlSkipped).unwrap(),
            "\"URL_SKIPPED\""
        );
        assert_eq!(FileState::HttpFail.to_string(), "HTTP_FAIL");
        assert!(FileState::InvalidStructure.is_error());
        assert!(!FileState::Empty.is_error());
    }
}
