//! Geometry summaries: vertex estimates, bounding boxes and spans
//!
//! Everything here is best-effort. Malformed shapes degrade to zero counts or
//! `None` and carry a [`VertexStatus`] so callers can tell "truly empty" from
//! "could not be read".

use crate::walker::{as_pair, geometry_pairs, Pair};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kilometres per degree of latitude on a sphere of fixed radius.
pub const KM_PER_DEGREE: f64 = 111.32;

/// Human readable description of how [`bbox_span`] approximates distances.
pub const SPAN_METHOD: &str =
    "spherical approximation: 111.32 km per degree of latitude, longitude scaled by cos(mean latitude)";

/// Declared geometry type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
    GeometryCollection,
    Other(String),
    Missing,
}

impl GeometryKind {
    pub fn from_type_name(name: Option<&str>) -> Self {
        match name {
            Some("Point") => GeometryKind::Point,
            Some("MultiPoint") => GeometryKind::MultiPoint,
            Some("LineString") => GeometryKind::LineString,
            Some("MultiLineString") => GeometryKind::MultiLineString,
            Some("Polygon") => GeometryKind::Polygon,
            Some("MultiPolygon") => GeometryKind::MultiPolygon,
            Some("GeometryCollection") => GeometryKind::GeometryCollection,
            Some(other) if !other.trim().is_empty() => GeometryKind::Other(other.to_string()),
            _ => GeometryKind::Missing,
        }
    }

    pub fn of(geometry: &Value) -> Self {
        Self::from_type_name(geometry.get("type").and_then(Value::as_str))
    }

    /// Name used in histograms and reports.
    pub fn name(&self) -> &str {
        match self {
            GeometryKind::Point => "Point",
            GeometryKind::MultiPoint => "MultiPoint",
            GeometryKind::LineString => "LineString",
            GeometryKind::MultiLineString => "MultiLineString",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::MultiPolygon => "MultiPolygon",
            GeometryKind::GeometryCollection => "GeometryCollection",
            GeometryKind::Other(name) => name,
            GeometryKind::Missing => "None",
        }
    }
}

/// How trustworthy a [`VertexEstimate`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexStatus {
    /// At least one pair and no skipped nodes.
    Complete,
    /// Structurally fine but holds no pairs (e.g. `[]`).
    Empty,
    /// No geometry, or no `coordinates` / `geometries` member.
    Missing,
    /// Nodes had to be skipped, or `coordinates` is not a list at all.
    Malformed,
}

/// Vertex count with both counting strategies reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexEstimate {
    /// Headline estimate: the shape count (capped at the walker count) when
    /// available, else the walker count.
    pub count: u64,
    /// Type-aware count (ring lengths). `None` for types counted by walking only.
    pub shape_count: Option<u64>,
    /// Number of pairs the coordinate walker yields.
    pub walked_count: u64,
    pub status: VertexStatus,
}

impl VertexEstimate {
    fn missing() -> Self {
        Self {
            count: 0,
            shape_count: None,
            walked_count: 0,
            status: VertexStatus::Missing,
        }
    }

    /// Both strategies ran and disagree.
    pub fn divergent(&self) -> bool {
        self.shape_count.is_some_and(|shape| shape != self.walked_count)
    }
}

#[derive(Default)]
struct Tally {
    count: u64,
    malformed: bool,
}

impl Tally {
    /// A list of positions: only numeric pairs count, anything else marks the tally.
    fn positions(&mut self, value: &Value) {
        match value.as_array() {
            Some(items) => {
                let pairs = items.iter().filter(|item| as_pair(item).is_some()).count();
                if pairs < items.len() {
                    self.malformed = true;
                }
                self.count += pairs as u64;
            }
            None => self.malformed = true,
        }
    }

    /// A list of rings (Polygon) or lines (MultiLineString).
    fn rings(&mut self, value: &Value) {
        match value.as_array() {
            Some(rings) => rings.iter().for_each(|ring| self.positions(ring)),
            None => self.malformed = true,
        }
    }

    fn polygons(&mut self, value: &Value) {
        match value.as_array() {
            Some(polygons) => polygons.iter().for_each(|polygon| self.rings(polygon)),
            None => self.malformed = true,
        }
    }
}

/// Type-aware count. `None` for types without a fixed shape.
fn shape_tally(coordinates: &Value, kind: &GeometryKind) -> Option<Tally> {
    let mut tally = Tally::default();
    match kind {
        GeometryKind::Point => match as_pair(coordinates) {
            Some(_) => tally.count = 1,
            None => tally.malformed = true,
        },
        GeometryKind::MultiPoint | GeometryKind::LineString => tally.positions(coordinates),
        GeometryKind::MultiLineString | GeometryKind::Polygon => tally.rings(coordinates),
        GeometryKind::MultiPolygon => tally.polygons(coordinates),
        GeometryKind::GeometryCollection | GeometryKind::Other(_) | GeometryKind::Missing => {
            return None
        }
    }
    Some(tally)
}

/// Estimate the vertex count of a raw `coordinates` value of a given type.
pub fn vertex_estimate(coordinates: &Value, kind: &GeometryKind) -> VertexEstimate {
    if coordinates.is_null() {
        return VertexEstimate::missing();
    }
    if !coordinates.is_array() {
        return VertexEstimate {
            count: 0,
            shape_count: None,
            walked_count: 0,
            status: VertexStatus::Malformed,
        };
    }

    let walked_count = crate::walker::coordinate_pairs(coordinates).count() as u64;
    let tally = shape_tally(coordinates, kind);
    let malformed = tally.as_ref().is_some_and(|t| t.malformed);
    let shape_count = tally.map(|t| t.count);
    // Never report more vertices than there are pairs to walk.
    let count = shape_count.map_or(walked_count, |shape| shape.min(walked_count));

    let status = if malformed {
        VertexStatus::Malformed
    } else if count == 0 {
        VertexStatus::Empty
    } else {
        VertexStatus::Complete
    };

    VertexEstimate {
        count,
        shape_count,
        walked_count,
        status,
    }
}

/// Estimate the vertex count of a whole geometry object.
///
/// `GeometryCollection` is counted by walking its members.
pub fn estimate_geometry(geometry: &Value) -> VertexEstimate {
    if !geometry.is_object() {
        return VertexEstimate::missing();
    }

    let kind = GeometryKind::of(geometry);
    if kind == GeometryKind::GeometryCollection {
        if !geometry.get("geometries").is_some_and(Value::is_array) {
            return VertexEstimate::missing();
        }
        let walked_count = geometry_pairs(geometry).count() as u64;
        return VertexEstimate {
            count: walked_count,
            shape_count: None,
            walked_count,
            status: if walked_count == 0 {
                VertexStatus::Empty
            } else {
                VertexStatus::Complete
            },
        };
    }

    match geometry.get("coordinates") {
        Some(coordinates) => vertex_estimate(coordinates, &kind),
        None => VertexEstimate::missing(),
    }
}

/// Axis-aligned lon/lat rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn from_pair((x, y): Pair) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    pub fn extend(&mut self, (x, y): Pair) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn merge(self, other: BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Merge two optional boxes; `None` is the identity.
    pub fn merge_opt(a: Option<BoundingBox>, b: Option<BoundingBox>) -> Option<BoundingBox> {
        match (a, b) {
            (Some(a), Some(b)) => Some(a.merge(b)),
            (a, None) => a,
            (None, b) => b,
        }
    }
}

/// Bounding box over every pair the walker yields; `None` when there are none.
pub fn bounding_box(geometry: &Value) -> Option<BoundingBox> {
    let mut pairs = geometry_pairs(geometry);
    let mut bbox = BoundingBox::from_pair(pairs.next()?);
    for pair in pairs {
        bbox.extend(pair);
    }
    Some(bbox)
}

/// Approximate planar extent of a bbox, in kilometres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub width_km: f64,
    pub height_km: f64,
}

/// Convert a lon/lat bbox into an approximate width/height (see [`SPAN_METHOD`]).
pub fn bbox_span(bbox: &BoundingBox) -> Span {
    let mean_lat = (bbox.min_y + bbox.max_y) / 2.0;
    let height_km = (bbox.max_y - bbox.min_y).abs() * KM_PER_DEGREE;
    let width_km = ((bbox.max_x - bbox.min_x).abs() * KM_PER_DEGREE * mean_lat.to_radians().cos()).abs();
    Span {
        width_km,
        height_km,
    }
}

/// Everything the audit derives from one feature's geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometrySummary {
    pub geometry_type: String,
    pub vertices: VertexEstimate,
    pub bbox: Option<BoundingBox>,
    pub span: Option<Span>,
}

impl GeometrySummary {
    /// Feature lacks geometry or coordinates.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self.vertices.status,
            VertexStatus::Missing | VertexStatus::Empty
        )
    }
}

/// Summarize a feature's `geometry` member (which may be absent or null).
pub fn summarize_geometry(geometry: Option<&Value>) -> GeometrySummary {
    let geometry = geometry.unwrap_or(&Value::Null);
    let kind = if geometry.is_object() {
        GeometryKind::of(geometry)
    } else {
        GeometryKind::Missing
    };
    let bbox = bounding_box(geometry);

    GeometrySummary {
        geometry_type: kind.name().to_string(),
        vertices: estimate_geometry(geometry),
        span: bbox.as_ref().map(bbox_span),
        bbox,
    }
}
