//! Conversion of parsed rings into `GeoJSON` polygons for map overlays.

use geo::{LineString, Polygon};
use geojson::{Feature, GeoJson, Geometry};

use crate::LngLat;

/// Builds a `GeoJSON` polygon feature from an outer ring.
///
/// The ring is closed if its last point differs from its first, since
/// `GeoJSON` requires closed linear rings. Returns `None` for rings with
/// fewer than three points.
#[must_use]
pub fn to_geojson_polygon(ring: &[LngLat]) -> Option<GeoJson> {
    if ring.len() < 3 {
        return None;
    }

    let exterior: LineString<f64> = ring.iter().copied().map(geo::Coord::from).collect();
    let polygon = Polygon::new(exterior, vec![]);

    let feature = Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(&polygon))),
        id: None,
        properties: None,
        foreign_members: None,
    };

    Some(GeoJson::Feature(feature))
}
