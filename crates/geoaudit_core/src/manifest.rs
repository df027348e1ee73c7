//! Manifest normalization
//!
//! Two shapes are accepted: a bare list of groups, or an object wrapping the
//! list under `groups`. Field defaults are applied here; file references are
//! kept as opaque strings for the resolver.

use crate::error::{AuditError, Result};
use crate::fetch::strip_bom;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_PICK: &str = "first";

/// One layer group after defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub label: Option<String>,
    pub enabled: bool,
    pub pick: String,
    pub files: Vec<String>,
}

impl Group {
    /// Label when present, otherwise the id.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

/// Normalized manifest: a non-empty, ordered list of groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub groups: Vec<Group>,
}

impl Manifest {
    pub fn declared_files(&self) -> usize {
        self.groups.iter().map(|g| g.files.len()).sum()
    }
}

/// Name of a JSON value's type, for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parse raw manifest bytes (a leading UTF-8 BOM is tolerated).
pub fn parse_manifest(bytes: &[u8]) -> Result<Manifest> {
    let data: Value = serde_json::from_slice(strip_bom(bytes))?;
    normalize(&data)
}

/// Normalize a parsed manifest value.
pub fn normalize(data: &Value) -> Result<Manifest> {
    let raw_groups = match data {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("groups") {
            Some(Value::Array(items)) => items,
            _ => return Err(AuditError::InvalidManifestShape { found: "object without a 'groups' list" }),
        },
        other => {
            return Err(AuditError::InvalidManifestShape {
                found: json_type_name(other),
            })
        }
    };

    if raw_groups.is_empty() {
        return Err(AuditError::EmptyManifest);
    }

    let empty = Map::new();
    let groups = raw_groups
        .iter()
        .enumerate()
        .map(|(index, raw)| normalize_group(raw.as_object().unwrap_or(&empty), index + 1))
        .collect();

    Ok(Manifest { groups })
}

fn normalize_group(raw: &Map<String, Value>, position: usize) -> Group {
    let id = first_text(raw, &["id", "group_id"]).unwrap_or_else(|| format!("group-{}", position));
    let label = first_text(raw, &["label", "group_name", "name", "group"]);

    // Only an explicit `false` disables a group.
    let enabled = !matches!(raw.get("enabled"), Some(Value::Bool(false)));

    let pick = raw
        .get("pick")
        .and_then(Value::as_str)
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_PICK.to_string());

    let files = match raw.get("files") {
        Some(Value::Array(items)) => items.iter().map(reference_text).collect(),
        _ => Vec::new(),
    };

    Group {
        id,
        label,
        enabled,
        pick,
        files,
    }
}

/// First key holding a non-empty string or number.
fn first_text(raw: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        let text = match raw.get(*key)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    })
}

fn reference_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
