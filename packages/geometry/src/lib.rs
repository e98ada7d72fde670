#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometry normalization for alert areas.
//!
//! Alert areas arrive from the spatial database in several shapes: WKT
//! polygon text, `GeoJSON`-like objects, or bare coordinate arrays. This
//! crate classifies them into [`RawAreaGeometry`] and reduces any of them
//! to a single representative [`LngLat`] for map markers and camera
//! targets.
//!
//! Everything here is best-effort: unusable input degrades to `None`,
//! never to an error or a partial point.

pub mod polygon;
pub mod raw;
pub mod wkt;

use serde::{Deserialize, Serialize};

pub use polygon::to_geojson_polygon;
pub use raw::RawAreaGeometry;
pub use wkt::parse_ring;

/// A longitude/latitude pair in WGS84 degrees.
///
/// Serialized as a `[lng, lat]` array. Ranges are not enforced: values
/// outside `[-180, 180]` / `[-90, 90]` pass through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LngLat {
    /// Longitude.
    pub lng: f64,
    /// Latitude.
    pub lat: f64,
}

impl LngLat {
    /// Creates a new point.
    #[must_use]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Creates a point only if both components are finite.
    #[must_use]
    pub const fn from_finite(lng: f64, lat: f64) -> Option<Self> {
        if lng.is_finite() && lat.is_finite() {
            Some(Self { lng, lat })
        } else {
            None
        }
    }
}

impl From<[f64; 2]> for LngLat {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self { lng, lat }
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(point: LngLat) -> Self {
        [point.lng, point.lat]
    }
}

impl From<LngLat> for geo::Coord<f64> {
    fn from(point: LngLat) -> Self {
        geo::coord! { x: point.lng, y: point.lat }
    }
}

impl std::fmt::Display for LngLat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.lng, self.lat)
    }
}

/// Arithmetic mean of the longitudes and latitudes in `ring`.
///
/// This is a planar vertex average, not an area-weighted or geodesic
/// centroid. A closed ring (first point repeated at the end) counts that
/// point twice. Returns `None` for an empty ring or when the mean is not
/// finite.
#[must_use]
pub fn centroid(ring: &[LngLat]) -> Option<LngLat> {
    if ring.is_empty() {
        return None;
    }

    // Running mean: stays finite for coordinates whose sum would overflow.
    let (lng, lat) = ring
        .iter()
        .enumerate()
        .fold((0.0_f64, 0.0_f64), |(lng, lat), (i, p)| {
            #[allow(clippy::cast_precision_loss)]
            let n = (i + 1) as f64;
            (lng + (p.lng - lng) / n, lat + (p.lat - lat) / n)
        });

    let mean = LngLat::from_finite(lng, lat);
    if mean.is_none() {
        log::warn!("Ring centroid is not finite, discarding");
    }
    mean
}

/// Reduces any area geometry to one representative point.
///
/// Polygons and rings yield their [`centroid`]; points and bare pairs are
/// returned verbatim. Absent input, unparseable WKT, empty rings and
/// unrecognized shapes all yield `None`.
#[must_use]
pub fn extract_representative_point(raw: Option<&RawAreaGeometry>) -> Option<LngLat> {
    let raw = raw?;

    match raw {
        RawAreaGeometry::Wkt(text) => {
            let ring = parse_ring(text);
            if ring.is_empty() {
                log::warn!("No usable coordinates in WKT geometry");
            }
            centroid(&ring)
        }
        RawAreaGeometry::Polygon(outer) | RawAreaGeometry::Ring(outer) => centroid(outer),
        RawAreaGeometry::Point(point) | RawAreaGeometry::Pair(point) => Some(*point),
        RawAreaGeometry::Unrecognized(value) => {
            log::warn!("Unrecognized area geometry shape, skipping: {value}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn assert_close(actual: LngLat, lng: f64, lat: f64) {
        assert!(
            (actual.lng - lng).abs() < TOLERANCE && (actual.lat - lat).abs() < TOLERANCE,
            "expected [{lng}, {lat}], got {actual}"
        );
    }

    #[test]
    fn centroid_of_triangle_is_vertex_mean() {
        let ring = [
            LngLat::new(85.0, 27.0),
            LngLat::new(85.2, 27.0),
            LngLat::new(85.1, 27.3),
        ];
        assert_close(centroid(&ring).unwrap(), 85.1, 27.1);
    }

    #[test]
    fn centroid_of_huge_coordinates_stays_finite() {
        let raw = RawAreaGeometry::Wkt("POLYGON((1e308 10, 1e308 20, 1e308 30))".to_string());
        let point = extract_representative_point(Some(&raw)).unwrap();
        assert!(point.lng.is_finite());
        assert_close(point, 1e308, 20.0);
    }

    #[test]
    fn centroid_that_overflows_is_none() {
        let ring = [
            LngLat::new(-f64::MAX, 0.0),
            LngLat::new(f64::MAX, 0.0),
            LngLat::new(f64::MAX, 0.0),
        ];
        assert_eq!(centroid(&ring), None);
    }

    #[test]
    fn centroid_of_empty_ring_is_none() {
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn centroid_is_order_independent() {
        let forward = [
            LngLat::new(1.0, 2.0),
            LngLat::new(3.0, 5.0),
            LngLat::new(-2.0, 8.0),
        ];
        let mut reversed = forward;
        reversed.reverse();
        let expected = centroid(&forward).unwrap();
        assert_close(centroid(&reversed).unwrap(), expected.lng, expected.lat);
    }

    #[test]
    fn wkt_point_is_mean_of_parsed_pairs() {
        let raw = RawAreaGeometry::Wkt("POLYGON((85 27, 85.2 27, 85.1 27.3))".to_string());
        assert_close(extract_representative_point(Some(&raw)).unwrap(), 85.1, 27.1);
    }

    #[test]
    fn wkt_drops_invalid_pairs_before_averaging() {
        let raw = RawAreaGeometry::Wkt("polygon((10 20, abc 5, 30 40))".to_string());
        assert_close(extract_representative_point(Some(&raw)).unwrap(), 20.0, 30.0);
    }

    #[test]
    fn geojson_point_is_returned_verbatim() {
        let value = serde_json::json!({ "type": "Point", "coordinates": [70.1, 31.2] });
        let raw = RawAreaGeometry::from_json(&value).unwrap();
        let point = extract_representative_point(Some(&raw)).unwrap();
        assert_eq!(point, LngLat::new(70.1, 31.2));
    }

    #[test]
    fn geojson_polygon_uses_outer_ring_only() {
        let value = serde_json::json!({
            "type": "Polygon",
            "coordinates": [
                [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]],
                [[100.0, 100.0], [101.0, 100.0], [101.0, 101.0]]
            ]
        });
        let raw = RawAreaGeometry::from_json(&value).unwrap();
        assert_close(extract_representative_point(Some(&raw)).unwrap(), 2.0, 2.0);
    }

    #[test]
    fn bare_coordinates_are_handled() {
        let ring = serde_json::json!({ "coordinates": [[1.0, 1.0], [3.0, 3.0]] });
        let raw = RawAreaGeometry::from_json(&ring).unwrap();
        assert_close(extract_representative_point(Some(&raw)).unwrap(), 2.0, 2.0);

        let pair = serde_json::json!({ "coordinates": [12.5, -8.25] });
        let raw = RawAreaGeometry::from_json(&pair).unwrap();
        assert_eq!(
            extract_representative_point(Some(&raw)),
            Some(LngLat::new(12.5, -8.25))
        );
    }

    #[test]
    fn malformed_inputs_yield_none() {
        let inputs = [
            serde_json::json!(""),
            serde_json::json!("POLYGON((85 27, 85.2 27"),
            serde_json::json!("POLYGON((north east, south west))"),
            serde_json::json!({ "type": "Polygon" }),
            serde_json::json!({ "type": "Point", "coordinates": [1.0] }),
            serde_json::json!({ "type": "Polygon", "coordinates": [[]] }),
            serde_json::json!(42),
            serde_json::json!([]),
        ];

        for input in &inputs {
            let raw = RawAreaGeometry::from_json(input);
            assert!(
                extract_representative_point(raw.as_ref()).is_none(),
                "expected no point for {input}"
            );
        }
    }

    #[test]
    fn absent_geometry_yields_none() {
        assert!(extract_representative_point(None).is_none());
        assert!(RawAreaGeometry::from_json(&serde_json::Value::Null).is_none());
    }

    #[test]
    fn out_of_range_values_pass_through() {
        let raw = RawAreaGeometry::Pair(LngLat::new(200.0, -95.0));
        assert_eq!(
            extract_representative_point(Some(&raw)),
            Some(LngLat::new(200.0, -95.0))
        );
    }

    #[test]
    fn lng_lat_serializes_as_array() {
        let json = serde_json::to_value(LngLat::new(85.324, 27.7172)).unwrap();
        assert_eq!(json, serde_json::json!([85.324, 27.7172]));

        let parsed: LngLat = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, LngLat::new(85.324, 27.7172));
    }
}
