//! Audit pipeline
//!
//! Plans every file reference in manifest order, audits each one into a
//! [`FileOutcome`], then reduces the outcomes into an [`AuditReport`].
//! With `workers > 1` the per-file work runs on scoped threads that pull
//! from a shared cursor and send tagged outcomes back over a channel; the
//! reduction still happens in discovery order.

use crate::config::AuditConfig;
use crate::error::{AuditError, Result};
use crate::fetch::{strip_bom, FetchFailure, Fetcher};
use crate::geojson::{document_kind, scan_features, DocumentKind};
use crate::manifest::{parse_manifest, Manifest};
use crate::report::{AuditReport, FileOutcome, FileState, ReportBuilder, ReportSettings};
use crate::resolve::{classify, join_url, ReferenceKind, ResolvedSource, Resolver, SourceMode};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where the manifest itself is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestLocation {
    Path(PathBuf),
    Url(String),
}

impl ManifestLocation {
    /// Filesystem mode reads `manifest` from disk; HTTP mode joins it onto the
    /// base URL unless it is already a URL.
    pub fn for_mode(manifest: &str, mode: &SourceMode) -> Self {
        match mode {
            SourceMode::Filesystem { .. } => ManifestLocation::Path(PathBuf::from(manifest)),
            SourceMode::Http { base_url } => {
                if classify(manifest) == ReferenceKind::RemoteUrl {
                    ManifestLocation::Url(manifest.trim().to_string())
                } else {
                    ManifestLocation::Url(join_url(base_url, manifest.trim()))
                }
            }
        }
    }

    pub fn label(&self) -> String {
        match self {
            ManifestLocation::Path(path) => path.display().to_string(),
            ManifestLocation::Url(url) => url.clone(),
        }
    }
}

/// One planned file reference.
#[derive(Debug, Clone)]
struct FileTask {
    group_index: usize,
    reference: String,
}

/// Audits a manifest under one source mode.
#[derive(Debug)]
pub struct AuditPipeline {
    config: AuditConfig,
    resolver: Resolver,
    fetcher: Fetcher,
}

impl AuditPipeline {
    /// Validate `config` for `mode` and build the fetcher.
    pub fn new(config: AuditConfig, mode: SourceMode) -> Result<Self> {
        config.validate(&mode)?;
        let fetcher = match &mode {
            SourceMode::Filesystem { .. } => Fetcher::local_only(),
            SourceMode::Http { .. } => {
                Fetcher::with_http(config.http_timeout(), &config.user_agent)?
            }
        };
        Ok(Self {
            config,
            resolver: Resolver::new(mode),
            fetcher,
        })
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn mode(&self) -> &SourceMode {
        self.resolver.mode()
    }

    /// Read and normalize the manifest. Any failure here is fatal.
    pub fn load_manifest(&self, location: &ManifestLocation) -> Result<Manifest> {
        let source = match location {
            ManifestLocation::Path(path) => ResolvedSource::LocalPath(path.clone()),
            ManifestLocation::Url(url) => ResolvedSource::RemoteUrl(url.clone()),
        };
        let fetched = self
            .fetcher
            .fetch(&source)
            .map_err(|failure| AuditError::ManifestUnavailable {
                target: location.label(),
                message: failure.to_string(),
            })?;

        let manifest = parse_manifest(&fetched.bytes)?;
        info!(
            manifest = %location.label(),
            groups = manifest.groups.len(),
            declared_files = manifest.declared_files(),
            "Manifest loaded"
        );
        Ok(manifest)
    }

    /// Audit every group and file of `manifest`.
    pub fn run(&self, manifest: &Manifest, manifest_label: &str) -> AuditReport {
        let start = Instant::now();
        info!(
            mode = self.mode().name(),
            manifest = %manifest_label,
            groups = manifest.groups.len(),
            workers = self.config.workers,
            "Starting audit"
        );

        let (tasks, truncated) = self.plan(manifest);
        let outcomes = if self.config.workers > 1 && tasks.len() > 1 {
            self.audit_parallel(&tasks)
        } else {
            tasks.iter().map(|task| self.audit_file(task)).collect()
        };

        let mut builder = ReportBuilder::new(manifest, self.settings(manifest_label));
        for outcome in outcomes {
            builder.record(outcome);
        }
        let report = builder.finish(start.elapsed().as_millis() as u64, truncated);

        info!(
            files = report.counters.total_files,
            features = report.counters.total_features,
            ok = report.counters.ok,
            missing = report.counters.missing,
            http_fail = report.counters.http_fail,
            bad_json = report.counters.bad_json,
            invalid_structure = report.counters.invalid_structure,
            url_skipped = report.counters.url_skipped,
            passed = report.passed,
            duration_ms = report.duration_ms,
            "Audit complete"
        );
        report
    }

    fn settings(&self, manifest_label: &str) -> ReportSettings {
        let (root, base_url) = match self.mode() {
            SourceMode::Filesystem { root } => (Some(root.display().to_string()), None),
            SourceMode::Http { base_url } => (None, Some(base_url.clone())),
        };
        ReportSettings {
            mode: self.mode().name().to_string(),
            manifest: manifest_label.to_string(),
            root,
            base_url,
            top_n: self.config.top_n,
            alert_threshold: self.config.alert_threshold,
            max_scan_features: self.config.max_scan_features,
            max_files: self.config.max_files,
            large_file_bytes: self.config.large_file_bytes,
            workers: self.config.workers,
        }
    }

    /// Discovery-ordered task list, cut at `max_files` auditable references.
    fn plan(&self, manifest: &Manifest) -> (Vec<FileTask>, bool) {
        let limit = self.config.max_files;
        let mut tasks = Vec::new();
        let mut auditable = 0usize;

        for (group_index, group) in manifest.groups.iter().enumerate() {
            info!(
                group = %group.id,
                label = %group.display_name(),
                enabled = group.enabled,
                files = group.files.len(),
                "Auditing group"
            );
            for reference in &group.files {
                let skipped = matches!(
                    self.resolver.resolve(reference),
                    ResolvedSource::UnsupportedRemoteInLocalMode(_)
                );
                if !skipped {
                    if limit > 0 && auditable >= limit {
                        info!(max_files = limit, "File limit reached, stopping");
                        return (tasks, true);
                    }
                    auditable += 1;
                }
                tasks.push(FileTask {
                    group_index,
                    reference: reference.clone(),
                });
            }
        }
        (tasks, false)
    }

    fn audit_parallel(&self, tasks: &[FileTask]) -> Vec<FileOutcome> {
        let cursor = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel::<(usize, FileOutcome)>();
        let workers = self.config.workers.min(tasks.len());

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let cursor = &cursor;
                scope.spawn(move || loop {
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(task) = tasks.get(index) else {
                        break;
                    };
                    if tx.send((index, self.audit_file(task))).is_err() {
                        break;
                    }
                });
            }
        });
        drop(tx);

        let mut tagged: Vec<(usize, FileOutcome)> = rx.into_iter().collect();
        tagged.sort_by_key(|(index, _)| *index);
        tagged.into_iter().map(|(_, outcome)| outcome).collect()
    }

    fn audit_file(&self, task: &FileTask) -> FileOutcome {
        let reference = task.reference.trim();
        let mut outcome = FileOutcome {
            group_index: task.group_index,
            reference: task.reference.clone(),
            target: None,
            state: FileState::Missing,
            message: None,
            size_bytes: None,
            scan: None,
        };

        if reference.is_empty() {
            warn!(group_index = task.group_index, "Empty file reference");
            outcome.message = Some("empty file reference".to_string());
            return outcome;
        }

        let source = self.resolver.resolve(reference);
        outcome.target = Some(source.target());
        if let ResolvedSource::UnsupportedRemoteInLocalMode(url) = &source {
            debug!(url = %url, "Remote reference skipped in filesystem mode");
            outcome.state = FileState::UrlSkipped;
            outcome.message = Some(FetchFailure::NotFetchable.to_string());
            return outcome;
        }

        debug!(reference = %reference, layer = %source, "Fetching layer");
        let fetched = match self.fetcher.fetch(&source) {
            Ok(fetched) => fetched,
            Err(failure) => {
                outcome.state = if failure.is_http() {
                    FileState::HttpFail
                } else {
                    FileState::Missing
                };
                warn!(layer = %source, state = %outcome.state, error = %failure, "Layer unavailable");
                outcome.message = Some(failure.to_string());
                return outcome;
            }
        };
        outcome.size_bytes = Some(fetched.size_bytes);

        let document: Value = match serde_json::from_slice(strip_bom(&fetched.bytes)) {
            Ok(document) => document,
            Err(e) => {
                warn!(layer = %source, error = %e, "Layer is not valid JSON");
                outcome.state = FileState::BadJson;
                outcome.message = Some(format!("invalid JSON: {}", e));
                return outcome;
            }
        };

        match document_kind(&document) {
            DocumentKind::FeatureCollection(features) if features.is_empty() => {
                outcome.state = FileState::Empty;
                outcome.message = Some("FeatureCollection has no features".to_string());
            }
            DocumentKind::FeatureCollection(features) => {
                let scan = scan_features(features, self.config.max_scan_features);
                debug!(
                    layer = %source,
                    features = scan.feature_count,
                    scanned = scan.scanned_features,
                    degraded = scan.degraded_features,
                    "Layer scanned"
                );
                outcome.state = FileState::Scanned;
                outcome.scan = Some(scan);
            }
            DocumentKind::Feature => {
                outcome.state = FileState::Degraded;
                outcome.message = Some("single Feature document accepted without a scan".to_string());
            }
            DocumentKind::Geometry(name) => {
                outcome.state = FileState::Degraded;
                outcome.message = Some(format!("bare {} geometry accepted without a scan", name));
            }
            DocumentKind::Invalid(declared) => {
                outcome.state = FileState::InvalidStructure;
                outcome.message = Some(match declared {
                    Some(name) if name == "FeatureCollection" => {
                        "FeatureCollection without a 'features' list".to_string()
                    }
                    Some(name) => format!("expected FeatureCollection, found type '{}'", name),
                    None => "expected FeatureCollection, found no 'type'".to_string(),
                });
                warn!(layer = %source, "Layer is not a FeatureCollection");
            }
        }
        outcome
    }
}
