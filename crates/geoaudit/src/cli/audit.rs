//! Audit command - validate every layer referenced by a groups manifest
//!
//! Usage: geoaudit audit --groups capas/groups.json [--mode fs|http]

use crate::cli::config::load_config;
use crate::cli::error::HelpfulError;
use crate::cli::output::{
    color_for_state, format_count, format_duration_ms, format_km, format_size,
    print_table_colored,
};
use crate::cli::AuditStatus;
use anyhow::Result;
use comfy_table::Color;
use geoaudit_core::{AuditConfig, AuditError, AuditPipeline, AuditReport, ManifestLocation, SourceMode};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Arguments for the audit command
#[derive(Debug, clap::Args)]
pub struct AuditArgs {
    /// Groups manifest. A path in fs mode; joined onto --base-url in http mode
    #[arg(long, short = 'g')]
    pub groups: String,

    /// Where layer files are read from
    #[arg(long, value_enum, default_value_t = ModeArg::Fs)]
    pub mode: ModeArg,

    /// Directory relative references resolve against (default: manifest's directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Base URL for http mode, e.g. http://127.0.0.1:5500
    #[arg(long, env = "GEOAUDIT_BASE_URL")]
    pub base_url: Option<String>,

    /// Number of heavy features to list
    #[arg(long)]
    pub top: Option<usize>,

    /// Vertex estimate that raises an alert
    #[arg(long)]
    pub threshold: Option<u64>,

    /// Features per file sampled for type histogram and bbox
    #[arg(long)]
    pub max_scan: Option<usize>,

    /// Stop after this many files (0 = all)
    #[arg(long)]
    pub max_files: Option<usize>,

    /// HTTP timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Worker threads for fetching and scanning
    #[arg(long)]
    pub workers: Option<usize>,

    /// Config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Verbose logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ModeArg {
    Fs,
    Http,
}

impl AuditArgs {
    /// Fold command-line overrides into `config`.
    fn apply_overrides(&self, config: &mut AuditConfig) {
        if let Some(top) = self.top {
            config.top_n = top;
        }
        if let Some(threshold) = self.threshold {
            config.alert_threshold = threshold;
        }
        if let Some(max_scan) = self.max_scan {
            config.max_scan_features = max_scan;
        }
        if let Some(max_files) = self.max_files {
            config.max_files = max_files;
        }
        if let Some(timeout) = self.timeout {
            config.http_timeout_secs = timeout;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
    }

    fn source_mode(&self) -> Result<SourceMode> {
        match self.mode {
            ModeArg::Fs => {
                let manifest = PathBuf::from(&self.groups);
                if !manifest.is_file() {
                    return Err(HelpfulError::manifest_not_found(&manifest).into());
                }
                let root = self.root.clone().unwrap_or_else(|| manifest_dir(&manifest));
                if !root.is_dir() {
                    return Err(HelpfulError::root_not_found(&root).into());
                }
                Ok(SourceMode::Filesystem { root })
            }
            ModeArg::Http => {
                let base_url = self
                    .base_url
                    .as_deref()
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .ok_or_else(HelpfulError::missing_base_url)?;
                Ok(SourceMode::Http {
                    base_url: base_url.to_string(),
                })
            }
        }
    }
}

fn manifest_dir(manifest: &Path) -> PathBuf {
    match manifest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Execute the audit command
pub fn run(args: AuditArgs) -> Result<AuditStatus> {
    let mut config = load_config(args.config.as_deref())?;
    args.apply_overrides(&mut config);
    let mode = args.source_mode()?;
    debug!(?config, mode = mode.name(), "Effective settings");

    let pipeline = AuditPipeline::new(config, mode).map_err(|err| match err {
        AuditError::Config(details) => HelpfulError::invalid_config(&details),
        other => HelpfulError::new(other.to_string()),
    })?;

    let location = ManifestLocation::for_mode(&args.groups, pipeline.mode());
    let manifest = pipeline
        .load_manifest(&location)
        .map_err(|err| HelpfulError::manifest_error(&location.label(), &err))?;

    let report = pipeline.run(&manifest, &location.label());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(if report.passed {
        AuditStatus::Passed
    } else {
        AuditStatus::Failed
    })
}

fn print_report(report: &AuditReport) {
    let settings = &report.settings;
    println!("GEOAUDIT REPORT");
    println!("===============");
    println!();
    println!("Mode:      {}", settings.mode);
    println!("Manifest:  {}", settings.manifest);
    if let Some(root) = &settings.root {
        println!("Root:      {}", root);
    }
    if let Some(base_url) = &settings.base_url {
        println!("Base URL:  {}", base_url);
    }
    println!(
        "Generated: {}",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();

    print_groups(report);
    print_failures(report);
    print_advisories(report);
    print_heavy_features(report);
    print_summary(report);
}

fn print_groups(report: &AuditReport) {
    println!("GROUPS ({})", report.groups.len());
    let rows = report
        .groups_by_weight()
        .into_iter()
        .map(|group| {
            let failed_color = (group.failed_files > 0).then_some(Color::Red);
            vec![
                (group.id.clone(), None),
                (group.label.clone().unwrap_or_else(|| "-".to_string()), None),
                (
                    if group.enabled { "yes" } else { "no" }.to_string(),
                    (!group.enabled).then_some(Color::Yellow),
                ),
                (format!("{}/{}", group.files, group.declared_files), None),
                (format_count(group.features as u64), None),
                (format_count(group.max_vertex_estimate), None),
                (group.ok_files.to_string(), None),
                (group.failed_files.to_string(), failed_color),
            ]
        })
        .collect();
    print_table_colored(
        &["Group", "Label", "Enabled", "Files", "Features", "Max vertices", "OK", "Failed"],
        rows,
    );
    println!();
}

fn print_failures(report: &AuditReport) {
    if report.failures.is_empty() {
        return;
    }
    println!("FAILURES ({})", report.failures.len());
    let rows = report
        .failures
        .iter()
        .map(|failure| {
            vec![
                (failure.state.to_string(), Some(color_for_state(failure.state))),
                (failure.group.clone(), None),
                (failure.reference.clone(), None),
                (failure.target.clone().unwrap_or_else(|| "-".to_string()), None),
                (failure.message.clone(), None),
            ]
        })
        .collect();
    print_table_colored(&["State", "Group", "Reference", "Target", "Message"], rows);
    println!();
}

fn print_advisories(report: &AuditReport) {
    if report.advisories.is_empty() {
        return;
    }
    println!("ADVISORIES ({})", report.advisories.len());
    for advisory in &report.advisories {
        let kind = serde_json::to_value(advisory.kind)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        match &advisory.reference {
            Some(reference) => println!(
                "  [{}] {}: {} ({})",
                kind, advisory.group_id, reference, advisory.message
            ),
            None => println!("  [{}] {}: {}", kind, advisory.group_id, advisory.message),
        }
    }
    println!();
}

fn print_heavy_features(report: &AuditReport) {
    if report.top_features.is_empty() {
        return;
    }
    let threshold = report.settings.alert_threshold;
    println!("TOP {} FEATURES BY VERTEX ESTIMATE", report.top_features.len());
    let rows = report
        .top_features
        .iter()
        .enumerate()
        .map(|(rank, feature)| {
            let heavy = (feature.vertex_estimate >= threshold).then_some(Color::Red);
            vec![
                ((rank + 1).to_string(), None),
                (format_count(feature.vertex_estimate), heavy),
                (feature.geometry_type.clone(), None),
                (feature.group.clone(), None),
                (feature.file.clone(), None),
                (feature.feature_index.to_string(), None),
                (format_km(feature.span.map(|s| s.width_km)), None),
                (format_km(feature.span.map(|s| s.height_km)), None),
            ]
        })
        .collect();
    print_table_colored(
        &["#", "Vertices", "Type", "Group", "File", "Feature", "Width km", "Height km"],
        rows,
    );
    println!("Span: {}", report.span_method);
    println!();

    if !report.alerts.is_empty() {
        println!(
            "ALERTS: {} features at or above {} vertices",
            report.alerts.len(),
            format_count(threshold)
        );
        for alert in report.alerts.iter().take(report.settings.top_n.max(1)) {
            println!(
                "  {} vertices  {} / {} #{}",
                format_count(alert.vertex_estimate),
                alert.group,
                alert.file,
                alert.feature_index
            );
        }
        println!();
    }
}

fn print_summary(report: &AuditReport) {
    let counters = &report.counters;
    println!("SUMMARY");
    println!("  Files:             {}", counters.total_files);
    println!("  Features:          {}", format_count(counters.total_features as u64));
    println!("  OK:                {}", counters.ok);
    println!("  Empty:             {}", counters.empty);
    println!("  Degraded docs:     {}", counters.degraded_documents);
    println!("  Missing:           {}", counters.missing);
    println!("  HTTP failures:     {}", counters.http_fail);
    println!("  Bad JSON:          {}", counters.bad_json);
    println!("  Invalid structure: {}", counters.invalid_structure);
    println!("  URLs skipped:      {}", counters.url_skipped);
    if counters.degraded_features > 0 {
        println!("  Degraded features: {}", counters.degraded_features);
    }

    let largest = report.files.iter().filter_map(|f| f.size_bytes).max();
    if let Some(largest) = largest {
        println!("  Largest file:      {}", format_size(largest));
    }
    if report.truncated {
        println!(
            "  Stopped after {} files (--max-files)",
            report.settings.max_files
        );
    }
    println!();
    println!(
        "Result: {} in {}",
        if report.passed { "PASSED" } else { "FAILED" },
        format_duration_ms(report.duration_ms)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_dir_defaults_to_cwd() {
        assert_eq!(manifest_dir(Path::new("groups.json")), PathBuf::from("."));
        assert_eq!(
            manifest_dir(Path::new("capas/groups.json")),
            PathBuf::from("capas")
        );
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let args = AuditArgs {
            groups: "g.json".to_string(),
            mode: ModeArg::Fs,
            root: None,
            base_url: None,
            top: Some(3),
            threshold: None,
            max_scan: Some(10),
            max_files: None,
            timeout: None,
            workers: Some(8),
            config: None,
            json: false,
            verbose: false,
        };
        let mut config = AuditConfig::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.top_n, 3);
        assert_eq!(config.max_scan_features, 10);
        assert_eq!(config.workers, 8);
        assert_eq!(config.alert_threshold, 200_000);
    }

    #[test]
    fn test_http_mode_requires_base_url() {
        let args = AuditArgs {
            groups: "capas/groups.json".to_string(),
            mode: ModeArg::Http,
            root: None,
            base_url: Some("  ".to_string()),
            top: None,
            threshold: None,
            max_scan: None,
            max_files: None,
            timeout: None,
            workers: None,
            config: None,
            json: false,
            verbose: false,
        };
        let err = args.source_mode().unwrap_err();
        assert!(err.downcast_ref::<HelpfulError>().is_some());
    }
}
