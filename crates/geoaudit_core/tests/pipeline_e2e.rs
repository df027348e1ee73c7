//! End-to-end audits over temporary filesystem catalogs.

use geoaudit_core::{AuditConfig, AuditPipeline, FailureKind, FileState, ManifestLocation, SourceMode};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_json(path: &Path, value: &Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

fn audit(root: &Path, manifest: &Value) -> geoaudit_core::AuditReport {
    let manifest_path = root.join("groups.json");
    write_json(&manifest_path, manifest);

    let pipeline = AuditPipeline::new(
        AuditConfig::default(),
        SourceMode::Filesystem {
            root: root.to_path_buf(),
        },
    )
    .unwrap();
    let location = ManifestLocation::Path(manifest_path);
    let manifest = pipeline.load_manifest(&location).unwrap();
    pipeline.run(&manifest, &location.label())
}

fn ring(n: usize) -> Value {
    Value::Array((0..n).map(|i| json!([-70.0 + i as f64 * 0.01, -33.0])).collect())
}

#[test]
fn missing_local_file_fails_the_audit() {
    let temp = TempDir::new().unwrap();
    let report = audit(temp.path(), &json!([{"id": "a", "files": ["missing.geojson"]}]));

    assert_eq!(report.counters.total_files, 1);
    assert_eq!(report.counters.missing, 1);
    assert_eq!(report.counters.ok, 0);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, FailureKind::MissingFile);
    assert_eq!(report.failures[0].reference, "missing.geojson");
    assert!(report.failures[0]
        .target
        .as_deref()
        .is_some_and(|t| t.ends_with("missing.geojson")));
    assert!(!report.passed);
}

#[test]
fn single_polygon_with_closed_ring() {
    let temp = TempDir::new().unwrap();
    write_json(
        &temp.path().join("capas/ramsar.geojson"),
        &json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"nombre": "Humedal"},
                "geometry": {"type": "Polygon", "coordinates": [[
                    [-71.0, -33.0], [-70.0, -33.0], [-70.0, -32.0], [-71.0, -32.0], [-71.0, -33.0]
                ]]}
            }]
        }),
    );

    let report = audit(
        temp.path(),
        &json!({"groups": [{"id": "ramsar", "label": "Sitios Ramsar", "files": ["capas/ramsar.geojson"]}]}),
    );

    assert_eq!(report.counters.ok, 1);
    assert_eq!(report.counters.total_features, 1);
    assert_eq!(report.groups[0].max_vertex_estimate, 5);
    assert_eq!(report.top_features[0].vertex_estimate, 5);
    assert_eq!(report.top_features[0].group, "Sitios Ramsar");
    assert_eq!(report.files[0].geometry_types.get("Polygon"), Some(&1));
    assert!(report.passed);
}

#[test]
fn multipolygon_counts_every_ring() {
    let temp = TempDir::new().unwrap();
    write_json(
        &temp.path().join("multi.geojson"),
        &json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {"type": "MultiPolygon", "coordinates": [[ring(4)], [ring(6), ring(3)]]}
            }]
        }),
    );

    let report = audit(temp.path(), &json!([{"id": "m", "files": ["multi.geojson"]}]));
    assert_eq!(report.top_features[0].vertex_estimate, 13);
    assert_eq!(report.top_features[0].walked_count, 13);
    assert_eq!(report.counters.divergent_features, 0);
}

#[test]
fn heavy_features_rank_across_files_with_stable_ties() {
    let temp = TempDir::new().unwrap();
    let polygon = |n: usize| json!({"type": "Feature", "geometry": {"type": "Polygon", "coordinates": [ring(n)]}});
    write_json(
        &temp.path().join("a.geojson"),
        &json!({"type": "FeatureCollection", "features": [polygon(10), polygon(30)]}),
    );
    write_json(
        &temp.path().join("b.geojson"),
        &json!({"type": "FeatureCollection", "features": [polygon(30), polygon(5)]}),
    );

    let report = audit(
        temp.path(),
        &json!([{"id": "a", "files": ["a.geojson"]}, {"id": "b", "files": ["b.geojson"]}]),
    );

    let ranked: Vec<(String, usize, u64)> = report
        .ranked_features
        .iter()
        .map(|f| (f.group_id.clone(), f.feature_index, f.vertex_estimate))
        .collect();
    assert_eq!(
        ranked,
        vec![
            ("a".to_string(), 1, 30),
            ("b".to_string(), 0, 30),
            ("a".to_string(), 0, 10),
            ("b".to_string(), 1, 5),
        ]
    );
}

#[test]
fn relative_references_resolve_against_root_not_manifest_cwd() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("site");
    write_json(
        &root.join("data/a.geojson"),
        &json!({"type": "FeatureCollection", "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [1, 2]}}
        ]}),
    );

    let report = audit(&root, &json!([{"id": "x", "files": ["./data/../data/a.geojson", " data/a.geojson "]}]));
    assert_eq!(report.counters.ok, 2);
    assert!(report
        .advisories
        .iter()
        .any(|a| a.kind == geoaudit_core::AdvisoryKind::ParentTraversal));
}

#[cfg(unix)]
#[test]
fn parent_segments_follow_symlinked_directories() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("site");
    let shared = temp.path().join("shared/layers");
    write_json(
        &temp.path().join("shared/a.geojson"),
        &json!({"type": "FeatureCollection", "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [1, 2]}}
        ]}),
    );
    fs::create_dir_all(&shared).unwrap();
    fs::create_dir_all(&root).unwrap();
    std::os::unix::fs::symlink(&shared, root.join("link")).unwrap();

    // `link/..` is `shared/`, not `site/`.
    let report = audit(&root, &json!([{"id": "s", "files": ["link/../a.geojson"]}]));
    assert_eq!(report.counters.ok, 1, "failures: {:?}", report.failures);
    assert_eq!(report.files[0].state, FileState::Scanned);
}

#[test]
fn degraded_features_do_not_fail() {
    let temp = TempDir::new().unwrap();
    write_json(
        &temp.path().join("d.geojson"),
        &json!({"type": "FeatureCollection", "features": [
            {"type": "Feature", "geometry": null, "properties": {}},
            {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[0, 0], [1, 1]]}}
        ]}),
    );

    let report = audit(temp.path(), &json!([{"id": "d", "files": ["d.geojson"]}]));
    assert!(report.passed);
    assert_eq!(report.counters.degraded_features, 1);
    assert_eq!(report.files[0].state, FileState::Scanned);
    assert_eq!(report.files[0].geometry_types.get("None"), Some(&1));
    assert!(report
        .advisories
        .iter()
        .any(|a| a.kind == geoaudit_core::AdvisoryKind::DegradedFeatures));
}

#[test]
fn bom_prefixed_layer_is_parsed() {
    let temp = TempDir::new().unwrap();
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(br#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"Point","coordinates":[0,0]}}]}"#);
    fs::write(temp.path().join("bom.geojson"), bytes).unwrap();

    let report = audit(temp.path(), &json!([{"id": "bom", "files": ["bom.geojson"]}]));
    assert_eq!(report.counters.ok, 1);
}

#[test]
fn report_serializes_to_json() {
    let temp = TempDir::new().unwrap();
    let report = audit(temp.path(), &json!([{"id": "a", "files": ["nope.geojson"]}]));
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["counters"]["missing"], 1);
    assert_eq!(value["failures"][0]["kind"], "missing_file");
    assert_eq!(value["failures"][0]["state"], "MISSING");
    assert_eq!(value["settings"]["mode"], "fs");
    assert!(value.get("ranked_features").is_none());
    assert!(value["span_method"].as_str().unwrap().contains("111.32"));
}
