//! Property tests for the walker, the shape counts and heavy-feature ranking.

use geoaudit_core::geometry::{bbox_span, bounding_box, vertex_estimate, BoundingBox, GeometryKind};
use geoaudit_core::report::{rank_features, HeavyFeature};
use geoaudit_core::walker::coordinate_pairs;
use geoaudit_core::VertexStatus;
use proptest::prelude::*;
use serde_json::{json, Value};

fn position() -> impl Strategy<Value = Value> {
    (-180.0f64..180.0, -90.0f64..90.0).prop_map(|(x, y)| json!([x, y]))
}

fn ring() -> impl Strategy<Value = Value> {
    prop::collection::vec(position(), 1..12).prop_map(Value::Array)
}

fn polygon() -> impl Strategy<Value = Value> {
    prop::collection::vec(ring(), 1..4).prop_map(Value::Array)
}

/// Nested arrays whose leaves are never numbers.
fn non_numeric_coordinates() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        "[a-z]{0,4}".prop_map(Value::String),
        Just(json!({})),
    ];
    leaf.prop_recursive(4, 32, 5, |inner| {
        prop::collection::vec(inner, 0..5).prop_map(Value::Array)
    })
    .prop_map(|value| match value {
        Value::Array(_) => value,
        other => json!([other]),
    })
}

fn shaped_kind() -> impl Strategy<Value = GeometryKind> {
    prop_oneof![
        Just(GeometryKind::Point),
        Just(GeometryKind::MultiPoint),
        Just(GeometryKind::LineString),
        Just(GeometryKind::MultiLineString),
        Just(GeometryKind::Polygon),
        Just(GeometryKind::MultiPolygon),
    ]
}

fn heavy(vertex_estimate: u64, feature_index: usize) -> HeavyFeature {
    HeavyFeature {
        group_id: "g".to_string(),
        group: "g".to_string(),
        file: "f.geojson".to_string(),
        feature_index,
        geometry_type: "Polygon".to_string(),
        vertex_estimate,
        shape_count: Some(vertex_estimate),
        walked_count: vertex_estimate,
        status: VertexStatus::Complete,
        bbox: None,
        span: None,
    }
}

proptest! {
    #[test]
    fn polygon_shape_count_matches_walker(coords in polygon()) {
        let estimate = vertex_estimate(&coords, &GeometryKind::Polygon);
        prop_assert_eq!(estimate.shape_count, Some(estimate.walked_count));
        prop_assert_eq!(estimate.count, coordinate_pairs(&coords).count() as u64);
        prop_assert_eq!(estimate.status, VertexStatus::Complete);
    }

    #[test]
    fn multipolygon_shape_count_matches_walker(
        polygons in prop::collection::vec(polygon(), 1..4)
    ) {
        let coords = Value::Array(polygons);
        let estimate = vertex_estimate(&coords, &GeometryKind::MultiPolygon);
        prop_assert!(!estimate.divergent());
        prop_assert_eq!(estimate.count, estimate.walked_count);
    }

    #[test]
    fn geometries_without_pairs_estimate_zero(
        coords in non_numeric_coordinates(),
        kind in shaped_kind(),
    ) {
        let estimate = vertex_estimate(&coords, &kind);
        prop_assert_eq!(estimate.walked_count, 0);
        prop_assert_eq!(estimate.count, 0);
        let geometry = json!({"type": kind.name(), "coordinates": coords});
        prop_assert!(bounding_box(&geometry).is_none());
    }

    #[test]
    fn headline_never_exceeds_walker(coords in polygon(), kind in shaped_kind()) {
        let estimate = vertex_estimate(&coords, &kind);
        prop_assert!(estimate.count <= estimate.walked_count);
    }

    #[test]
    fn bbox_contains_every_pair(coords in polygon()) {
        let geometry = json!({"type": "Polygon", "coordinates": coords});
        let bbox = bounding_box(&geometry).unwrap();
        for (x, y) in coordinate_pairs(&geometry["coordinates"]) {
            prop_assert!(bbox.min_x <= x && x <= bbox.max_x);
            prop_assert!(bbox.min_y <= y && y <= bbox.max_y);
        }
        let span = bbox_span(&bbox);
        prop_assert!(span.width_km >= 0.0 && span.height_km >= 0.0);
    }

    #[test]
    fn degenerate_bbox_spans_nothing(x in -180.0f64..180.0, y in -89.0f64..89.0) {
        let span = bbox_span(&BoundingBox::from_pair((x, y)));
        prop_assert_eq!(span.width_km, 0.0);
        prop_assert_eq!(span.height_km, 0.0);
    }

    #[test]
    fn ranking_is_descending_and_stable(estimates in prop::collection::vec(0u64..6, 0..40)) {
        let mut features: Vec<HeavyFeature> = estimates
            .iter()
            .enumerate()
            .map(|(index, estimate)| heavy(*estimate, index))
            .collect();
        rank_features(&mut features);

        for pair in features.windows(2) {
            prop_assert!(pair[0].vertex_estimate >= pair[1].vertex_estimate);
            if pair[0].vertex_estimate == pair[1].vertex_estimate {
                prop_assert!(pair[0].feature_index < pair[1].feature_index);
            }
        }
    }
}

#[test]
fn empty_coordinates_have_no_bbox_and_zero_estimate() {
    let geometry = json!({"type": "MultiPolygon", "coordinates": []});
    assert!(bounding_box(&geometry).is_none());
    assert_eq!(vertex_estimate(&geometry["coordinates"], &GeometryKind::MultiPolygon).count, 0);
}
