//! Blocking reads of resolved sources
//!
//! Local files are read from disk; remote targets are fetched with a blocking
//! HTTP client that carries a per-request timeout. A 2xx response whose body
//! starts like an HTML page is rejected as a failed fetch.

use crate::error::{AuditError, Result};
use crate::resolve::ResolvedSource;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

/// Number of leading body bytes inspected for HTML markers.
pub const HTML_SNIFF_BYTES: usize = 200;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Drop a leading UTF-8 byte order mark.
pub fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// True when the first bytes carry an HTML doctype or `<html` tag.
pub fn looks_like_html(body: &[u8]) -> bool {
    let head = &body[..body.len().min(HTML_SNIFF_BYTES)];
    let sample = String::from_utf8_lossy(head).to_lowercase();
    sample.contains("<!doctype html") || sample.contains("<html")
}

/// Payload of a successful read.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub size_bytes: u64,
    pub content_type: Option<String>,
}

/// Why a source could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    NotFound,
    NotAFile,
    Unreadable(String),
    /// Remote URL in filesystem mode; never fetched.
    NotFetchable,
    HttpStatus {
        status: u16,
        content_type: Option<String>,
    },
    HtmlPayload {
        content_type: Option<String>,
    },
    Transport {
        message: String,
        timed_out: bool,
    },
}

impl FetchFailure {
    /// Failure happened on the HTTP transport.
    pub fn is_http(&self) -> bool {
        matches!(
            self,
            FetchFailure::HttpStatus { .. }
                | FetchFailure::HtmlPayload { .. }
                | FetchFailure::Transport { .. }
        )
    }
}

fn content_type_label(content_type: &Option<String>) -> &str {
    content_type.as_deref().unwrap_or("(none)")
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::NotFound => write!(f, "file does not exist"),
            FetchFailure::NotAFile => write!(f, "path is not a regular file"),
            FetchFailure::Unreadable(reason) => write!(f, "cannot read file: {}", reason),
            FetchFailure::NotFetchable => write!(f, "remote URL cannot be audited in filesystem mode"),
            FetchFailure::HttpStatus {
                status,
                content_type,
            } => write!(
                f,
                "HTTP {} (Content-Type: {})",
                status,
                content_type_label(content_type)
            ),
            FetchFailure::HtmlPayload { content_type } => write!(
                f,
                "URL returned HTML instead of JSON, probably a 404 page or redirect (Content-Type: {})",
                content_type_label(content_type)
            ),
            FetchFailure::Transport { message, timed_out } => {
                if *timed_out {
                    write!(f, "request timed out: {}", message)
                } else {
                    write!(f, "request failed: {}", message)
                }
            }
        }
    }
}

/// Reads local paths and, when configured, remote URLs.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Option<Client>,
}

impl Fetcher {
    /// Filesystem reads only; remote targets fail as `NotFetchable`.
    pub fn local_only() -> Self {
        Self { client: None }
    }

    /// Filesystem reads plus a blocking HTTP client.
    pub fn with_http(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| AuditError::HttpClient(e.to_string()))?;
        Ok(Self {
            client: Some(client),
        })
    }

    pub fn fetch(&self, source: &ResolvedSource) -> std::result::Result<Fetched, FetchFailure> {
        match source {
            ResolvedSource::LocalPath(path) => read_local(path),
            ResolvedSource::RemoteUrl(url) => match &self.client {
                Some(client) => fetch_http(client, url),
                None => Err(FetchFailure::NotFetchable),
            },
            ResolvedSource::UnsupportedRemoteInLocalMode(_) => Err(FetchFailure::NotFetchable),
        }
    }
}

fn read_local(path: &Path) -> std::result::Result<Fetched, FetchFailure> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => FetchFailure::NotFound,
        _ => FetchFailure::Unreadable(e.to_string()),
    })?;
    if !metadata.is_file() {
        return Err(FetchFailure::NotAFile);
    }

    let bytes = fs::read(path).map_err(|e| FetchFailure::Unreadable(e.to_string()))?;
    Ok(Fetched {
        size_bytes: metadata.len(),
        bytes,
        content_type: None,
    })
}

fn fetch_http(client: &Client, url: &str) -> std::result::Result<Fetched, FetchFailure> {
    let transport = |e: reqwest::Error| FetchFailure::Transport {
        timed_out: e.is_timeout(),
        message: e.to_string(),
    };

    let response = client
        .get(url)
        .header("Accept", "application/geo+json, application/json;q=0.9, */*;q=0.5")
        .send()
        .map_err(transport)?;

    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_lowercase());

    if !status.is_success() {
        return Err(FetchFailure::HttpStatus {
            status: status.as_u16(),
            content_type,
        });
    }

    let bytes = response.bytes().map_err(transport)?.to_vec();
    if looks_like_html(&bytes) {
        return Err(FetchFailure::HtmlPayload { content_type });
    }

    Ok(Fetched {
        size_bytes: bytes.len() as u64,
        bytes,
        content_type,
    })
}
