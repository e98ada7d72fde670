//! Classification of raw area geometry payloads.
//!
//! The spatial database hands back place geometry as whatever JSON the
//! row happened to store. [`RawAreaGeometry::from_json`] sorts that into
//! one variant per concrete shape so downstream code can match on it
//! exhaustively instead of probing the value.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{LngLat, parse_ring};

/// A raw area geometry, classified by shape.
///
/// Coordinates inside the structured variants have already been parsed;
/// pairs that were not two finite numbers are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RawAreaGeometry {
    /// WKT text, expected to be `POLYGON((lng lat, ...))`. Parsed lazily.
    Wkt(String),
    /// Outer ring of a `GeoJSON` `Polygon` object.
    Polygon(Vec<LngLat>),
    /// A `GeoJSON` `Point` object.
    Point(LngLat),
    /// A list of coordinate pairs, bare or under an untyped `coordinates`.
    Ring(Vec<LngLat>),
    /// A single coordinate pair, bare or under an untyped `coordinates`.
    Pair(LngLat),
    /// Anything else, kept verbatim.
    Unrecognized(Value),
}

impl RawAreaGeometry {
    /// Classifies a JSON geometry payload.
    ///
    /// Returns `None` for JSON `null` (no geometry at all). Every other
    /// value classifies to some variant, falling back to
    /// [`RawAreaGeometry::Unrecognized`].
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        let classified = match value {
            Value::Null => return None,
            Value::String(text) => Some(Self::Wkt(text.clone())),
            Value::Object(map) => Self::from_object(map),
            Value::Array(items) => Self::from_coordinates(items),
            Value::Bool(_) | Value::Number(_) => None,
        };

        Some(classified.unwrap_or_else(|| Self::Unrecognized(value.clone())))
    }

    /// Classifies geometry given as text.
    ///
    /// Text that parses as JSON is classified with [`Self::from_json`];
    /// anything else is taken to be WKT. Blank text is absent.
    #[must_use]
    pub fn from_text(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => Self::from_json(&value),
            Err(_) => Some(Self::Wkt(trimmed.to_string())),
        }
    }

    fn from_object(map: &serde_json::Map<String, Value>) -> Option<Self> {
        let coordinates = map.get("coordinates")?;
        let kind = map.get("type").and_then(Value::as_str);

        match kind {
            Some(kind) if kind.eq_ignore_ascii_case("Polygon") => {
                let outer = coordinates
                    .as_array()
                    .and_then(|rings| rings.first())
                    .and_then(Value::as_array)
                    .map(|ring| parse_positions(ring))
                    .unwrap_or_default();
                if !outer.is_empty() {
                    return Some(Self::Polygon(outer));
                }
            }
            Some(kind) if kind.eq_ignore_ascii_case("Point") => {
                if let Some(point) = parse_position(coordinates) {
                    return Some(Self::Point(point));
                }
            }
            _ => {}
        }

        Self::from_coordinates(coordinates.as_array()?)
    }

    fn from_coordinates(items: &[Value]) -> Option<Self> {
        if items.first().is_some_and(Value::is_array) {
            return Some(Self::Ring(parse_positions(items)));
        }

        if items.len() == 2 {
            return parse_components(&items[0], &items[1]).map(Self::Pair);
        }

        None
    }

    /// Returns the polygon ring this geometry describes, if it has one.
    ///
    /// Points, pairs and unrecognized shapes have no polygon. Rings with
    /// fewer than three points cannot enclose an area and are rejected.
    #[must_use]
    pub fn polygon_ring(&self) -> Option<Vec<LngLat>> {
        let ring = match self {
            Self::Wkt(text) => parse_ring(text),
            Self::Polygon(ring) | Self::Ring(ring) => ring.clone(),
            Self::Point(_) | Self::Pair(_) | Self::Unrecognized(_) => return None,
        };

        (ring.len() >= 3).then_some(ring)
    }
}

fn parse_positions(items: &[Value]) -> Vec<LngLat> {
    items.iter().filter_map(parse_position).collect()
}

fn parse_position(value: &Value) -> Option<LngLat> {
    match value.as_array()?.as_slice() {
        [lng, lat] => parse_components(lng, lat),
        _ => None,
    }
}

fn parse_components(lng: &Value, lat: &Value) -> Option<LngLat> {
    LngLat::from_finite(parse_number(lng)?, parse_number(lat)?)
}

fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
