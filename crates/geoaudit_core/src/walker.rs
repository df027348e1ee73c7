//! Coordinate walker
//!
//! Flattens arbitrarily nested GeoJSON coordinate arrays into `(x, y)` pairs.
//! A node is a terminal pair when it is an array of length >= 2 whose first
//! two elements are numbers; any third (elevation) component is ignored.
//! Every other array is descended into, and non-array nodes are skipped, so
//! no nesting depth is assumed for a given geometry type.
//!
//! Both iterators keep an explicit stack instead of recursing, and they are
//! `Clone`: a clone replays the remaining pairs without touching the original.

use serde_json::Value;
use std::slice;

/// A longitude/latitude (or x/y) pair.
pub type Pair = (f64, f64);

/// Interpret `value` as a terminal coordinate pair.
pub fn as_pair(value: &Value) -> Option<Pair> {
    let items = value.as_array()?;
    if items.len() < 2 {
        return None;
    }
    match (&items[0], &items[1]) {
        (Value::Number(x), Value::Number(y)) => Some((x.as_f64()?, y.as_f64()?)),
        _ => None,
    }
}

/// Lazy sequence of pairs under a raw coordinate value.
#[derive(Debug, Clone)]
pub struct CoordinatePairs<'a> {
    root: Option<&'a Value>,
    stack: Vec<slice::Iter<'a, Value>>,
}

/// Walk a raw `coordinates` value.
pub fn coordinate_pairs(coordinates: &Value) -> CoordinatePairs<'_> {
    CoordinatePairs {
        root: Some(coordinates),
        stack: Vec::new(),
    }
}

impl<'a> CoordinatePairs<'a> {
    /// Returns the pair itself, or descends into `node` if it is a list.
    fn visit(&mut self, node: &'a Value) -> Option<Pair> {
        if let Some(pair) = as_pair(node) {
            return Some(pair);
        }
        if let Value::Array(items) = node {
            self.stack.push(items.iter());
        }
        None
    }
}

impl<'a> Iterator for CoordinatePairs<'a> {
    type Item = Pair;

    fn next(&mut self) -> Option<Pair> {
        if let Some(root) = self.root.take() {
            if let Some(pair) = self.visit(root) {
                return Some(pair);
            }
        }

        while let Some(top) = self.stack.last_mut() {
            match top.next() {
                Some(node) => {
                    if let Some(pair) = self.visit(node) {
                        return Some(pair);
                    }
                }
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }
}

/// Lazy sequence of pairs under a geometry object.
///
/// `GeometryCollection` members are visited in declaration order, including
/// nested collections; every other geometry contributes its `coordinates`.
#[derive(Debug, Clone)]
pub struct GeometryPairs<'a> {
    pending: Vec<&'a Value>,
    current: Option<CoordinatePairs<'a>>,
}

/// Walk a geometry object (anything with `type` and `coordinates`).
pub fn geometry_pairs(geometry: &Value) -> GeometryPairs<'_> {
    GeometryPairs {
        pending: vec![geometry],
        current: None,
    }
}

impl<'a> Iterator for GeometryPairs<'a> {
    type Item = Pair;

    fn next(&mut self) -> Option<Pair> {
        loop {
            if let Some(current) = self.current.as_mut() {
                if let Some(pair) = current.next() {
                    return Some(pair);
                }
                self.current = None;
            }

            let geometry = self.pending.pop()?;
            if geometry.get("type").and_then(Value::as_str) == Some("GeometryCollection") {
                if let Some(members) = geometry.get("geometries").and_then(Value::as_array) {
                    self.pending.extend(members.iter().rev());
                }
            } else if let Some(coordinates) = geometry.get("coordinates") {
                self.current = Some(coordinate_pairs(coordinates));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_point_yields_single_pair() {
        let coords = json!([-70.5, -33.4]);
        let pairs: Vec<Pair> = coordinate_pairs(&coords).collect();
        assert_eq!(pairs, vec![(-70.5, -33.4)]);
    }

    #[test]
    fn test_elevation_is_ignored() {
        let coords = json!([[1.0, 2.0, 300.0], [3, 4, 5]]);
        let pairs: Vec<Pair> = coordinate_pairs(&coords).collect();
        assert_eq!(pairs, vec![(1.0, 2.0), (3.0, 4.0)]);
    }

    #[test]
    fn test_polygon_and_multipolygon_depths() {
        let polygon = json!([[[0, 0], [1, 0], [1, 1], [0, 0]]]);
        assert_eq!(coordinate_pairs(&polygon).count(), 4);

        let multi = json!([
            [[[0, 0], [1, 0], [1, 1], [0, 0]]],
            [[[5, 5], [6, 5], [6, 6], [5, 5]], [[5.2, 5.2], [5.4, 5.2], [5.2, 5.2]]]
        ]);
        assert_eq!(coordinate_pairs(&multi).count(), 11);
    }

    #[test]
    fn test_malformed_nodes_are_skipped() {
        let coords = json!([[[0, 0], "oops", null, [1], [2, "x"], [3, 3]], 7, {"a": 1}]);
        let pairs: Vec<Pair> = coordinate_pairs(&coords).collect();
        assert_eq!(pairs, vec![(0.0, 0.0), (3.0, 3.0)]);
    }

    #[test]
    fn test_empty_and_null_yield_nothing() {
        assert_eq!(coordinate_pairs(&json!([])).count(), 0);
        assert_eq!(coordinate_pairs(&json!(null)).count(), 0);
        assert_eq!(coordinate_pairs(&json!([[[]]])).count(), 0);
    }

    #[test]
    fn test_geometry_collection_recurses_members() {
        let geometry = json!({
            "type": "GeometryCollection",
            "geometries": [
                {"type": "Point", "coordinates": [1, 1]},
                {"type": "GeometryCollection", "geometries": [
                    {"type": "LineString", "coordinates": [[2, 2], [3, 3]]}
                ]},
                {"type": "Polygon", "coordinates": [[[4, 4], [5, 4], [4, 4]]]}
            ]
        });
        let pairs: Vec<Pair> = geometry_pairs(&geometry).collect();
        assert_eq!(
            pairs,
            vec![(1.0, 1.0), (2.0, 2.0), (3.0, 3.0), (4.0, 4.0), (5.0, 4.0), (4.0, 4.0)]
        );
    }

    #[test]
    fn test_geometry_without_coordinates_is_empty() {
        assert_eq!(geometry_pairs(&json!({"type": "Polygon"})).count(), 0);
        assert_eq!(geometry_pairs(&json!(null)).count(), 0);
        assert_eq!(
            geometry_pairs(&json!({"type": "GeometryCollection", "geometries": "nope"})).count(),
            0
        );
    }

    #[test]
    fn test_walk_is_restartable() {
        let coords = json!([[0, 0], [1, 1], [2, 2]]);
        let mut walk = coordinate_pairs(&coords);
        assert_eq!(walk.next(), Some((0.0, 0.0)));

        let replay: Vec<Pair> = walk.clone().collect();
        let rest: Vec<Pair> = walk.collect();
        assert_eq!(replay, rest);
        assert_eq!(coordinate_pairs(&coords).count(), 3);
    }
}
