//! WKT polygon ring parsing.

use std::sync::LazyLock;

use regex::Regex;

use crate::LngLat;

/// Captures the coordinate list of the first `POLYGON((...))` in the
/// text. Only a single ring without nested parentheses is accepted, so
/// holes and multipolygons do not match.
static POLYGON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)POLYGON\s*\(\(([^()]*)\)\)").unwrap_or_else(|_| unreachable!())
});

/// Parses the outer ring of a WKT `POLYGON((lng lat, lng lat, ...))`.
///
/// Matching is case-insensitive and whitespace-tolerant, and a leading
/// `SRID=...;` prefix is ignored. Each comma-separated pair must hold
/// exactly two finite numbers or it is dropped. Ring order is preserved.
///
/// Returns an empty vector when the text does not look like a polygon or
/// when no pair survives; callers treat empty as "no usable geometry".
#[must_use]
pub fn parse_ring(text: &str) -> Vec<LngLat> {
    let Some(caps) = POLYGON_RE.captures(text) else {
        return Vec::new();
    };
    let Some(body) = caps.get(1) else {
        return Vec::new();
    };

    body.as_str().split(',').filter_map(parse_pair).collect()
}

fn parse_pair(pair: &str) -> Option<LngLat> {
    let mut tokens = pair.split_whitespace();
    let lng = tokens.next()?.parse::<f64>().ok()?;
    let lat = tokens.next()?.parse::<f64>().ok()?;

    if tokens.next().is_some() {
        return None;
    }

    LngLat::from_finite(lng, lat)
}
