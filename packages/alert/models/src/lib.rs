#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Alert taxonomy types, raw alert records, and the display view model.
//!
//! Raw records mirror the nested rows returned by the alert database
//! (alert → alert areas → place, alert → source document). They are
//! loosely typed on purpose: every field except the ID may be missing,
//! and taxonomy values are kept as text until the transformer maps them
//! onto the enums defined here.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reach_geometry::{LngLat, RawAreaGeometry};
use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// How severe an alert is. Ordered: `Extreme > Severe > Moderate > Minor > Unknown`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum AlertSeverity {
    /// Severity not given or not recognized
    Unknown = 0,
    /// Minimal to no known threat to life or property
    Minor = 1,
    /// Possible threat to life or property
    Moderate = 2,
    /// Significant threat to life or property
    Severe = 3,
    /// Extraordinary threat to life or property
    Extreme = 4,
}

impl AlertSeverity {
    /// Parses a severity label, falling back to [`Self::Unknown`].
    #[must_use]
    pub fn parse_or_unknown(label: Option<&str>) -> Self {
        label
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(Self::Unknown)
    }

    /// Returns all variants, most severe first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Extreme,
            Self::Severe,
            Self::Moderate,
            Self::Minor,
            Self::Unknown,
        ]
    }
}

/// How soon responsive action should be taken.
/// Ordered: `Immediate > Expected > Future > Past > Unknown`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum AlertUrgency {
    /// Urgency not given or not recognized
    Unknown = 0,
    /// Responsive action is no longer required
    Past = 1,
    /// Responsive action should be taken in the near future
    Future = 2,
    /// Responsive action should be taken soon (within the next hour)
    Expected = 3,
    /// Responsive action should be taken immediately
    Immediate = 4,
}

impl AlertUrgency {
    /// Parses an urgency label, falling back to [`Self::Unknown`].
    #[must_use]
    pub fn parse_or_unknown(label: Option<&str>) -> Self {
        label
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(Self::Unknown)
    }
}

/// Hazard category of an alert.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum AlertCategory {
    /// Geophysical (landslide, earthquake)
    Geo,
    /// Meteorological (flood, storm, heavy rainfall)
    Met,
    /// General emergency and public safety
    Safety,
    /// Law enforcement, military, homeland and local/private security
    Security,
    /// Rescue and recovery
    Rescue,
    /// Fire suppression and rescue
    Fire,
    /// Medical and public health (including air quality)
    Health,
    /// Pollution and other environmental
    Env,
    /// Public and private transportation
    Transport,
    /// Utility, telecommunication, other non-transport infrastructure
    Infra,
    /// Chemical, biological, radiological, nuclear or high-yield explosive
    #[serde(rename = "CBRNE")]
    #[strum(serialize = "CBRNE")]
    Cbrne,
    /// Other events
    Other,
    /// Category not given or not recognized
    Unknown,
}

impl AlertCategory {
    /// Parses a category label, falling back to [`Self::Unknown`].
    #[must_use]
    pub fn parse_or_unknown(label: Option<&str>) -> Self {
        label
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(Self::Unknown)
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Geo,
            Self::Met,
            Self::Safety,
            Self::Security,
            Self::Rescue,
            Self::Fire,
            Self::Health,
            Self::Env,
            Self::Transport,
            Self::Infra,
            Self::Cbrne,
            Self::Other,
            Self::Unknown,
        ]
    }
}

/// Parses a stored timestamp.
///
/// Accepts RFC 3339, and also naive date-times and bare dates as returned
/// for `timestamp`/`date` columns, which are taken to be UTC.
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Unparseable timestamps become `None` instead of failing the row.
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let Some(text) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let parsed = parse_timestamp(&text);
    if parsed.is_none() {
        log::warn!("Unparseable timestamp {text:?}, treating as absent");
    }
    Ok(parsed)
}

/// An alert row with its nested document and areas, as fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAlert {
    /// Alert ID.
    pub id: String,
    /// Event name, used as the display title.
    pub event: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Category label (e.g. `"Met"`).
    pub category: Option<String>,
    /// Severity label (e.g. `"Severe"`).
    pub severity: Option<String>,
    /// Urgency label (e.g. `"Expected"`).
    pub urgency: Option<String>,
    /// Recommended action.
    pub instruction: Option<String>,
    /// Start of the alert's validity.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub effective_from: Option<DateTime<Utc>>,
    /// End of the alert's validity.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub effective_until: Option<DateTime<Utc>>,
    /// The document the alert was extracted from.
    #[serde(default, alias = "documents")]
    pub document: Option<RawDocument>,
    /// Areas the alert applies to, in database order.
    #[serde(default)]
    pub alert_areas: Vec<RawAlertArea>,
}

/// The source document an alert was extracted from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDocument {
    /// Document ID.
    pub id: Option<String>,
    /// Issuing agency label (e.g. `"NDMA"`, `"NEOC"`, `"PMD"`).
    pub source: Option<String>,
    /// Where the document was published.
    pub url: Option<String>,
    /// Document title.
    pub title: Option<String>,
    /// When the document was posted.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub posted_date: Option<DateTime<Utc>>,
}

/// One area an alert applies to, with optional per-area overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAlertArea {
    /// The referenced place.
    #[serde(default, alias = "places")]
    pub place: Option<RawPlace>,
    /// Area-specific start of validity.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub specific_effective_from: Option<DateTime<Utc>>,
    /// Area-specific end of validity.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub specific_effective_until: Option<DateTime<Utc>>,
    /// Area-specific severity label.
    pub specific_severity: Option<String>,
    /// Area-specific urgency label.
    pub specific_urgency: Option<String>,
    /// Area-specific instruction.
    pub specific_instruction: Option<String>,
}

/// A named place with its stored geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPlace {
    /// Place ID.
    pub id: Option<String>,
    /// Place name.
    pub name: Option<String>,
    /// Geometry in whatever shape the database stored it: WKT text, a
    /// `GeoJSON`-like object, or a bare coordinate array.
    #[serde(default, alias = "geometry")]
    pub polygon: serde_json::Value,
}

impl RawPlace {
    /// Classifies the stored geometry. `None` when the place has none.
    #[must_use]
    pub fn geometry(&self) -> Option<RawAreaGeometry> {
        RawAreaGeometry::from_json(&self.polygon)
    }
}

/// Where a view model's representative point came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointOrigin {
    /// Derived from the alert area's geometry.
    Geometry,
    /// The configured fallback location; the alert had no usable geometry.
    Fallback,
}

/// A display-ready alert.
///
/// Built once per fetch from a [`RawAlert`] and its first area, and
/// replaced wholesale on the next fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertViewModel {
    /// Alert ID.
    pub id: String,
    /// Display title (the event name).
    pub title: String,
    /// Description text.
    pub description: String,
    /// Name of the first area's place.
    pub location: String,
    /// Start of validity.
    pub effective_from: Option<DateTime<Utc>>,
    /// End of validity.
    pub effective_until: Option<DateTime<Utc>>,
    /// Hazard category.
    pub category: AlertCategory,
    /// Severity.
    pub severity: AlertSeverity,
    /// Urgency.
    pub urgency: AlertUrgency,
    /// Recommended action.
    pub instruction: String,
    /// Issuing agency label.
    pub source: String,
    /// Representative point for the marker and camera.
    pub point: LngLat,
    /// Whether [`Self::point`] is real or the fallback location.
    pub point_origin: PointOrigin,
    /// Names of every place the alert covers.
    pub place_names: Vec<String>,
    /// The first area's geometry, kept for polygon highlighting.
    pub polygon: Option<RawAreaGeometry>,
}

impl AlertViewModel {
    /// Returns `true` if the point was derived from real geometry.
    #[must_use]
    pub fn has_located_point(&self) -> bool {
        self.point_origin == PointOrigin::Geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_with_and_without_offset_parse() {
        let expected = "2024-10-10T14:30:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(parse_timestamp("2024-10-10T14:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-10-10T20:15:00+05:45"), Some(expected));
        assert_eq!(parse_timestamp("2024-10-10T14:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-10-10 14:30:00.000"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-10-10"),
            "2024-10-10T00:00:00Z".parse::<DateTime<Utc>>().ok()
        );
        assert_eq!(parse_timestamp("next tuesday"), None);
    }

    #[test]
    fn raw_alert_tolerates_naive_and_bad_timestamps() {
        let alert: RawAlert = serde_json::from_value(serde_json::json!({
            "id": "1",
            "effective_from": "2024-10-10T14:30:00",
            "effective_until": "soon",
            "alert_areas": [{ "specific_effective_from": null }]
        }))
        .unwrap();

        assert_eq!(
            alert.effective_from,
            "2024-10-10T14:30:00Z".parse::<DateTime<Utc>>().ok()
        );
        assert_eq!(alert.effective_until, None);
        assert_eq!(alert.alert_areas[0].specific_effective_from, None);
        assert!(alert.event.is_none());
    }

    #[test]
    fn severity_orders_extreme_highest() {
        assert!(AlertSeverity::Extreme > AlertSeverity::Severe);
        assert!(AlertSeverity::Severe > AlertSeverity::Moderate);
        assert!(AlertSeverity::Moderate > AlertSeverity::Minor);
        assert!(AlertSeverity::Minor > AlertSeverity::Unknown);
    }

    #[test]
    fn urgency_orders_immediate_highest() {
        assert!(AlertUrgency::Immediate > AlertUrgency::Expected);
        assert!(AlertUrgency::Expected > AlertUrgency::Future);
        assert!(AlertUrgency::Future > AlertUrgency::Unknown);
    }

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!(
            AlertSeverity::parse_or_unknown(Some(" severe ")),
            AlertSeverity::Severe
        );
        assert_eq!(
            AlertUrgency::parse_or_unknown(Some("IMMEDIATE")),
            AlertUrgency::Immediate
        );
        assert_eq!(
            AlertCategory::parse_or_unknown(Some("cbrne")),
            AlertCategory::Cbrne
        );
        assert_eq!(AlertCategory::Cbrne.to_string(), "CBRNE");
    }

    #[test]
    fn unknown_labels_fall_back() {
        assert_eq!(
            AlertSeverity::parse_or_unknown(Some("catastrophic")),
            AlertSeverity::Unknown
        );
        assert_eq!(AlertUrgency::parse_or_unknown(None), AlertUrgency::Unknown);
        assert_eq!(
            AlertCategory::parse_or_unknown(Some("")),
            AlertCategory::Unknown
        );
    }

    #[test]
    fn raw_alert_deserializes_nested_rows() {
        let alert: RawAlert = serde_json::from_value(serde_json::json!({
            "id": "a1",
            "event": "Flood Warning",
            "severity": "Severe",
            "effective_from": "2024-10-10T14:30:00Z",
            "documents": { "source": "NDMA" },
            "alert_areas": [
                { "places": { "name": "Kathmandu", "polygon": "POLYGON((85 27, 85.2 27, 85.1 27.3))" } }
            ]
        }))
        .unwrap();

        assert_eq!(alert.document.unwrap().source.as_deref(), Some("NDMA"));
        let place = alert.alert_areas[0].place.as_ref().unwrap();
        assert_eq!(place.name.as_deref(), Some("Kathmandu"));
        assert!(matches!(place.geometry(), Some(RawAreaGeometry::Wkt(_))));
    }

    #[test]
    fn place_without_geometry_has_none() {
        let place: RawPlace = serde_json::from_value(serde_json::json!({ "name": "X" })).unwrap();
        assert!(place.geometry().is_none());
    }
}
