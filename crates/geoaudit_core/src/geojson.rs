//! GeoJSON document checks and per-file feature scans

use crate::geometry::{summarize_geometry, BoundingBox, GeometrySummary};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

const GEOMETRY_TYPES: &[&str] = &[
    "Point",
    "MultiPoint",
    "LineString",
    "MultiLineString",
    "Polygon",
    "MultiPolygon",
    "GeometryCollection",
];

/// Top-level shape of a parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind<'a> {
    /// `FeatureCollection` with a `features` list.
    FeatureCollection(&'a [Value]),
    /// Single `Feature`; accepted, not scanned.
    Feature,
    /// Bare geometry object; accepted, not scanned.
    Geometry(String),
    /// Anything else. Carries the `type` when there was one.
    Invalid(Option<String>),
}

pub fn document_kind(document: &Value) -> DocumentKind<'_> {
    let declared = document
        .get("type")
        .and_then(Value::as_str)
        .map(str::trim);

    match declared {
        Some("FeatureCollection") => match document.get("features") {
            Some(Value::Array(features)) => DocumentKind::FeatureCollection(features),
            _ => DocumentKind::Invalid(Some("FeatureCollection".to_string())),
        },
        Some("Feature") => DocumentKind::Feature,
        Some(name) if GEOMETRY_TYPES.contains(&name) => DocumentKind::Geometry(name.to_string()),
        other => DocumentKind::Invalid(other.map(str::to_string)),
    }
}

/// One feature's summary, tagged with its position in the file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    pub index: usize,
    pub summary: GeometrySummary,
}

/// Result of scanning a feature collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileScan {
    pub feature_count: usize,
    /// Features that fed the histogram and bbox (capped).
    pub scanned_features: usize,
    pub geometry_types: BTreeMap<String, usize>,
    pub bbox: Option<BoundingBox>,
    pub degraded_features: usize,
    pub divergent_features: usize,
    #[serde(skip)]
    pub features: Vec<FeatureRecord>,
}

impl FileScan {
    pub fn max_vertex_estimate(&self) -> u64 {
        self.features
            .iter()
            .map(|f| f.summary.vertices.count)
            .max()
            .unwrap_or(0)
    }
}

/// Summarize every feature; only the first `max_scan` feed the histogram and bbox.
pub fn scan_features(features: &[Value], max_scan: usize) -> FileScan {
    let mut scan = FileScan {
        feature_count: features.len(),
        ..FileScan::default()
    };

    for (index, feature) in features.iter().enumerate() {
        let summary = summarize_geometry(feature.get("geometry"));
        if summary.is_degraded() {
            scan.degraded_features += 1;
        }
        if summary.vertices.divergent() {
            scan.divergent_features += 1;
        }
        if index < max_scan {
            *scan
                .geometry_types
                .entry(summary.geometry_type.clone())
                .or_insert(0) += 1;
            scan.bbox = BoundingBox::merge_opt(scan.bbox, summary.bbox);
            scan.scanned_features += 1;
        }
        scan.features.push(FeatureRecord { index, summary });
    }

    scan
}
