//! Path resolution for manifest file references
//!
//! Classification is lexical and happens before any I/O. Resolution binds a
//! reference to the configured transport; whether the target exists is the
//! fetcher's problem, never the resolver's.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Transport the audit reads layers through. Always caller supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SourceMode {
    /// Relative references resolve against `root`.
    Filesystem { root: PathBuf },
    /// Relative references resolve against `base_url`.
    Http { base_url: String },
}

impl SourceMode {
    pub fn name(&self) -> &'static str {
        match self {
            SourceMode::Filesystem { .. } => "fs",
            SourceMode::Http { .. } => "http",
        }
    }
}

/// Lexical class of a file reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    LocalRelative,
    AbsoluteLocal,
    RemoteUrl,
}

/// Classify a reference by scheme prefix and leading slash.
pub fn classify(reference: &str) -> ReferenceKind {
    let reference = reference.trim();
    if is_remote(reference) {
        ReferenceKind::RemoteUrl
    } else if reference.starts_with('/') || Path::new(reference).is_absolute() {
        ReferenceKind::AbsoluteLocal
    } else {
        ReferenceKind::LocalRelative
    }
}

fn is_remote(reference: &str) -> bool {
    let head: String = reference.chars().take(8).collect::<String>().to_ascii_lowercase();
    head.starts_with("http://") || head.starts_with("https://")
}

/// A reference bound to a concrete target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum ResolvedSource {
    LocalPath(PathBuf),
    RemoteUrl(String),
    /// Remote URL met in filesystem mode: reported, never fetched.
    UnsupportedRemoteInLocalMode(String),
}

impl ResolvedSource {
    pub fn target(&self) -> String {
        match self {
            ResolvedSource::LocalPath(path) => path.display().to_string(),
            ResolvedSource::RemoteUrl(url) | ResolvedSource::UnsupportedRemoteInLocalMode(url) => {
                url.clone()
            }
        }
    }
}

impl fmt::Display for ResolvedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.target())
    }
}

/// Maps references to targets under one [`SourceMode`].
#[derive(Debug, Clone)]
pub struct Resolver {
    mode: SourceMode,
}

impl Resolver {
    pub fn new(mode: SourceMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> &SourceMode {
        &self.mode
    }

    pub fn resolve(&self, reference: &str) -> ResolvedSource {
        let reference = reference.trim();
        let kind = classify(reference);

        match (&self.mode, kind) {
            (_, ReferenceKind::RemoteUrl) => match self.mode {
                SourceMode::Filesystem { .. } => {
                    ResolvedSource::UnsupportedRemoteInLocalMode(reference.to_string())
                }
                SourceMode::Http { .. } => ResolvedSource::RemoteUrl(reference.to_string()),
            },
            (SourceMode::Filesystem { .. }, ReferenceKind::AbsoluteLocal) => {
                ResolvedSource::LocalPath(PathBuf::from(reference))
            }
            (SourceMode::Filesystem { root }, ReferenceKind::LocalRelative) => {
                ResolvedSource::LocalPath(join_under_root(root, reference))
            }
            (SourceMode::Http { base_url }, _) => {
                ResolvedSource::RemoteUrl(join_url(base_url, reference))
            }
        }
    }
}

/// Join a reference onto a base URL with exactly one slash at the seam.
pub fn join_url(base_url: &str, reference: &str) -> String {
    let base = base_url.strip_suffix('/').unwrap_or(base_url);
    let reference = reference.strip_prefix("./").unwrap_or(reference);
    let reference = reference.strip_prefix('/').unwrap_or(reference);
    format!("{}/{}", base, reference)
}

/// Join a relative reference onto the root, dropping `.` components.
///
/// `..` is kept so the OS resolves it, following any symlinked directory
/// the way a plain path join would.
pub fn join_under_root(root: &Path, reference: &str) -> PathBuf {
    root.components()
        .chain(Path::new(reference).components())
        .filter(|component| *component != Component::CurDir)
        .collect()
}

/// Portability hints for a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathHint {
    /// Absolute local path; breaks when the catalog moves between hosts.
    AbsoluteLocalPath,
    /// Climbs out of its base with `..`.
    ParentTraversal,
    /// Depends on a remote server being online.
    RemoteUrl,
}

impl PathHint {
    pub fn describe(&self) -> &'static str {
        match self {
            PathHint::AbsoluteLocalPath => "absolute local path may not exist in other environments",
            PathHint::ParentTraversal => "relative path climbs with '..' and may resolve inconsistently",
            PathHint::RemoteUrl => "absolute URL depends on a remote server being reachable",
        }
    }
}

pub fn path_hints(reference: &str) -> Vec<PathHint> {
    let reference = reference.trim();
    let mut hints = Vec::new();
    match classify(reference) {
        ReferenceKind::RemoteUrl => hints.push(PathHint::RemoteUrl),
        ReferenceKind::AbsoluteLocal => hints.push(PathHint::AbsoluteLocalPath),
        ReferenceKind::LocalRelative => {}
    }
    if classify(reference) != ReferenceKind::RemoteUrl
        && reference.split(['/', '\\']).any(|segment| segment == "..")
    {
        hints.push(PathHint::ParentTraversal);
    }
    hints
}
